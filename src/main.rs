mod api;
mod callback;
mod cinema;
mod config;
mod dispatch;
mod error;
mod format;
mod session;
mod storage;
mod tg;
mod tmdb;

use anyhow::Context;
use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::prelude::*;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // без токенов работать нечем — падаем сразу с понятным сообщением
    let cfg = config::Config::from_env().context("configuration error")?;

    let movies = api::MovieClient::from_config(&cfg).context("failed to build HTTP client")?;
    let favorites = match &cfg.favorites_path {
        Some(path) => storage::FavoritesStore::open(path).await?,
        None => storage::FavoritesStore::in_memory(),
    };

    let bot = Bot::new(cfg.bot_token.clone());
    let me = bot.get_me().await.context("could not reach Telegram with BOT_TOKEN")?;
    let username = me.username.clone().unwrap_or_default();
    tracing::info!(bot = %username, "authorized");

    let app = dispatch::App::new(Arc::new(movies), favorites).with_bot_username(username);
    match app.preload_genres().await {
        Ok(n) => tracing::info!(genres = n, "genres preloaded"),
        Err(e) => tracing::warn!(error = %e, "could not preload genres, will retry on demand"),
    }

    tg::run(bot, Arc::new(app)).await;
    Ok(())
}
