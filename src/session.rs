use std::{collections::HashMap, sync::Arc};
use tokio::sync::RwLock;

/// Чего бот ждёт от пользователя следующим сообщением.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MenuState {
    #[default]
    Idle,
    AwaitingSearchTerm,
    AwaitingGenre,
    AwaitingActor,
    AwaitingFavorite,
    AwaitingLocation,
}

/// user_id -> состояние меню. Живёт до перезапуска процесса.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<u64, MenuState>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, user_id: u64) -> MenuState {
        self.inner.read().await.get(&user_id).copied().unwrap_or_default()
    }

    pub async fn set(&self, user_id: u64, state: MenuState) {
        let mut guard = self.inner.write().await;
        if state == MenuState::Idle {
            guard.remove(&user_id);
        } else {
            guard.insert(user_id, state);
        }
    }

    /// Забрать состояние, вернув пользователя в Idle.
    pub async fn take(&self, user_id: u64) -> MenuState {
        self.inner.write().await.remove(&user_id).unwrap_or_default()
    }
}
