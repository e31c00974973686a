use serde::{Deserialize, Serialize};
use std::{collections::HashMap, path::PathBuf, sync::Arc};
use tokio::fs;
use tokio::sync::{Mutex, RwLock};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoriteMovie {
    pub id: u64,
    pub title: String,
    pub release_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct FileState {
    version: u32,
    // user_id -> избранное в порядке добавления
    users: HashMap<u64, Vec<FavoriteMovie>>,
}

/// Избранное пользователей. Без пути живёт только в памяти.
#[derive(Clone)]
pub struct FavoritesStore {
    inner: Arc<RwLock<FileState>>,
    // один писатель файла за раз: общий .tmp и порядок снапшотов
    flush_guard: Arc<Mutex<()>>,
    path: Option<PathBuf>,
}

impl FavoritesStore {
    pub fn in_memory() -> Self {
        Self {
            inner: Arc::new(RwLock::new(FileState { version: 1, ..Default::default() })),
            flush_guard: Arc::new(Mutex::new(())),
            path: None,
        }
    }

    pub async fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        let state = if fs::try_exists(&path).await.unwrap_or(false) {
            let data = fs::read(&path).await?;
            match serde_json::from_slice::<FileState>(&data) {
                Ok(mut s) => { if s.version == 0 { s.version = 1; } s }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "favorites file is corrupt, starting empty");
                    FileState { version: 1, ..Default::default() }
                }
            }
        } else {
            FileState { version: 1, ..Default::default() }
        };
        tracing::info!(path = %path.display(), users = state.users.len(), "favorites loaded");
        Ok(Self { inner: Arc::new(RwLock::new(state)), flush_guard: Arc::new(Mutex::new(())), path: Some(path) })
    }

    pub async fn list(&self, user_id: u64) -> Vec<FavoriteMovie> {
        let guard = self.inner.read().await;
        guard.users.get(&user_id).cloned().unwrap_or_default()
    }

    /// true — добавили, false — уже был в избранном.
    pub async fn add(&self, user_id: u64, m: FavoriteMovie) -> anyhow::Result<bool> {
        let added = {
            let mut guard = self.inner.write().await;
            let entry = guard.users.entry(user_id).or_default();
            if entry.iter().any(|x| x.id == m.id) {
                false
            } else {
                entry.push(m);
                true
            }
        };
        if added { self.flush().await?; }
        Ok(added)
    }

    pub async fn remove(&self, user_id: u64, movie_id: u64) -> anyhow::Result<bool> {
        let removed = {
            let mut guard = self.inner.write().await;
            match guard.users.get_mut(&user_id) {
                Some(list) => {
                    let before = list.len();
                    list.retain(|m| m.id != movie_id);
                    let removed = list.len() < before;
                    if list.is_empty() {
                        guard.users.remove(&user_id);
                    }
                    removed
                }
                None => false,
            }
        };
        if removed { self.flush().await?; }
        Ok(removed)
    }

    async fn flush(&self) -> anyhow::Result<()> {
        let Some(path) = &self.path else { return Ok(()) };
        // снапшот, запись и rename — под одним flush_guard
        let _flushing = self.flush_guard.lock().await;
        let snapshot = {
            let guard = self.inner.read().await;
            serde_json::to_vec_pretty(&*guard)?
        };
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, &snapshot).await?;
        fs::rename(&tmp, path).await?;
        Ok(())
    }
}
