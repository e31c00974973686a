use crate::api::MovieApi;
use crate::callback::{Callback, MenuAction, MovieButton};
use crate::error::{BotError, BotResult};
use crate::format::{self, Reply};
use crate::session::{MenuState, SessionStore};
use crate::storage::{FavoriteMovie, FavoritesStore};
use crate::tmdb::Genre;
use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use teloxide::utils::command::{BotCommands, ParseError};
use tokio::sync::OnceCell;

const MAX_QUERY_CHARS: usize = 100;

/* ====== Команды ====== */
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "snake_case", description = "Commands:")]
pub enum Command {
    #[command(description = "main menu")]
    Start,
    #[command(description = "how to use the bot")]
    Help,
    #[command(description = "find movies by title", parse_with = rest_of_line)]
    Search(String),
    #[command(description = "recommendations by genre", parse_with = rest_of_line)]
    Genre(String),
    #[command(description = "movies with an actor or actress", parse_with = rest_of_line)]
    Actor(String),
    #[command(description = "movies trending today")]
    Trending,
    #[command(description = "add a movie to your favorites", parse_with = rest_of_line)]
    Favorite(String),
    #[command(description = "show your favorites")]
    Favorites,
    #[command(description = "cinemas near you", parse_with = rest_of_line)]
    NearestCinema(String),
    #[command(description = "cancel the current action")]
    Cancel,
}

fn rest_of_line(input: String) -> Result<(String,), ParseError> {
    Ok((input.trim().to_string(),))
}

/// Разобрать команду. `WrongBotName` — команда адресована другому боту в группе.
pub fn parse_command(text: &str, bot_username: &str) -> Result<Command, ParseError> {
    match Command::parse(text, bot_username) {
        // "/trending please" — аргументы у команды без аргументов просто отбрасываем
        Err(e @ ParseError::TooManyArguments { .. }) => match text.split_whitespace().next() {
            Some(word) => Command::parse(word, bot_username),
            None => Err(e),
        },
        other => other,
    }
}

/// Состояние бота на время жизни процесса: клиенты, избранное, сессии.
pub struct App {
    api: Arc<dyn MovieApi>,
    favorites: FavoritesStore,
    sessions: SessionStore,
    genres: OnceCell<Vec<Genre>>,
    bot_username: String,
}

impl App {
    pub fn new(api: Arc<dyn MovieApi>, favorites: FavoritesStore) -> Self {
        Self {
            api,
            favorites,
            sessions: SessionStore::new(),
            genres: OnceCell::new(),
            bot_username: String::new(),
        }
    }

    pub fn with_bot_username(mut self, username: impl Into<String>) -> Self {
        self.bot_username = username.into();
        self
    }

    /// Загрузить таблицу жанров заранее, чтобы списки фильмов показывали названия жанров.
    pub async fn preload_genres(&self) -> BotResult<usize> {
        self.genre_table().await.map(|g| g.len())
    }

    /* ====== Входящие события ====== */

    pub async fn on_text(&self, user: u64, text: &str) -> Vec<Reply> {
        let text = text.trim();
        let result = if text.starts_with('/') {
            match parse_command(text, &self.bot_username) {
                Ok(cmd) => {
                    tracing::info!(user, ?cmd, "command");
                    self.sessions.set(user, MenuState::Idle).await;
                    self.run_command(user, cmd).await
                }
                // чужая команда: молчим и состояние не трогаем
                Err(ParseError::WrongBotName(bot)) => {
                    tracing::debug!(user, bot = %bot, "command for another bot");
                    return Vec::new();
                }
                Err(_) => {
                    tracing::info!(user, text, "unknown command");
                    Ok(vec![format::not_understood()])
                }
            }
        } else {
            self.on_free_text(user, text).await
        };
        respond(user, result)
    }

    pub async fn on_location(&self, user: u64, lat: f64, lon: f64) -> Vec<Reply> {
        self.sessions.set(user, MenuState::Idle).await;
        respond(user, self.nearest_cinema(Some((lat, lon))).await.map(|r| vec![r]))
    }

    pub async fn on_callback(&self, user: u64, data: &str) -> Vec<Reply> {
        let Some(cb) = Callback::parse(data) else {
            tracing::warn!(user, data, "unknown callback");
            return vec![format::not_understood()];
        };
        tracing::info!(user, ?cb, "callback");
        self.sessions.set(user, MenuState::Idle).await;
        let result = match cb {
            Callback::Menu(action) => self.run_menu(user, action).await,
            Callback::Detail(id) => self.details(id).await.map(|r| vec![r]),
            Callback::Save(id) => self.save_favorite(user, id).await.map(|r| vec![r]),
            Callback::Genre(id) => self.movies_of_genre_id(id).await.map(|r| vec![r]),
            Callback::Unfavorite(id) => self.remove_favorite(user, id).await,
            Callback::FavoritesPage(page) => self.favorites_page(user, page).await.map(|r| vec![r]),
        };
        respond(user, result)
    }

    /* ====== Таблица обработчиков ====== */

    async fn run_command(&self, user: u64, cmd: Command) -> BotResult<Vec<Reply>> {
        let reply = match cmd {
            Command::Start => format::welcome(),
            Command::Help => format::help(),
            Command::Search(q) if q.is_empty() => self.wait_for(user, MenuState::AwaitingSearchTerm).await?,
            Command::Search(q) => self.search(&q).await?,
            Command::Genre(g) if g.is_empty() => self.wait_for(user, MenuState::AwaitingGenre).await?,
            Command::Genre(g) => self.movies_of_genre(&g).await?,
            Command::Actor(a) if a.is_empty() => self.wait_for(user, MenuState::AwaitingActor).await?,
            Command::Actor(a) => self.actor(&a).await?,
            Command::Trending => self.trending().await?,
            Command::Favorite(t) if t.is_empty() => self.wait_for(user, MenuState::AwaitingFavorite).await?,
            Command::Favorite(t) => self.favorite_search(&t).await?,
            Command::Favorites => self.show_favorites(user).await?,
            Command::NearestCinema(arg) if arg.is_empty() => self.wait_for(user, MenuState::AwaitingLocation).await?,
            Command::NearestCinema(arg) => self.nearest_cinema(Some(parse_coordinates(&arg)?)).await?,
            Command::Cancel => format::cancelled(),
        };
        Ok(vec![reply])
    }

    async fn run_menu(&self, user: u64, action: MenuAction) -> BotResult<Vec<Reply>> {
        let reply = match action {
            MenuAction::Main => format::main_menu(),
            MenuAction::Help => format::help(),
            MenuAction::Search => self.wait_for(user, MenuState::AwaitingSearchTerm).await?,
            MenuAction::Actor => self.wait_for(user, MenuState::AwaitingActor).await?,
            MenuAction::Favorite => self.wait_for(user, MenuState::AwaitingFavorite).await?,
            MenuAction::Genres => self.wait_for(user, MenuState::AwaitingGenre).await?,
            MenuAction::Cinema => self.wait_for(user, MenuState::AwaitingLocation).await?,
            MenuAction::Trending => self.trending().await?,
            MenuAction::Favorites => self.show_favorites(user).await?,
        };
        Ok(vec![reply])
    }

    /// Перевести пользователя в ожидание ввода и вернуть подсказку.
    async fn wait_for(&self, user: u64, state: MenuState) -> BotResult<Reply> {
        let reply = match state {
            MenuState::Idle => return Ok(format::main_menu()),
            MenuState::AwaitingSearchTerm => format::prompt_search(),
            MenuState::AwaitingActor => format::prompt_actor(),
            MenuState::AwaitingFavorite => format::prompt_favorite(),
            MenuState::AwaitingLocation => format::location_request(),
            MenuState::AwaitingGenre => format::genre_menu(self.genre_table().await?),
        };
        self.sessions.set(user, state).await;
        Ok(reply)
    }

    /* ====== Свободный текст ====== */

    async fn on_free_text(&self, user: u64, text: &str) -> BotResult<Vec<Reply>> {
        let state = self.sessions.take(user).await;
        let result = match state {
            MenuState::Idle => return self.route_keywords(user, text).await,
            MenuState::AwaitingSearchTerm => self.search(text).await,
            MenuState::AwaitingGenre => self.movies_of_genre(text).await,
            MenuState::AwaitingActor => self.actor(text).await,
            MenuState::AwaitingFavorite => self.favorite_search(text).await,
            MenuState::AwaitingLocation => match parse_coordinates(text) {
                Ok(loc) => self.nearest_cinema(Some(loc)).await,
                Err(e) => Err(e),
            },
        };
        // на кривой ввод даём ещё попытку
        if matches!(result, Err(BotError::InvalidInput(_))) {
            self.sessions.set(user, state).await;
        }
        result.map(|r| vec![r])
    }

    async fn route_keywords(&self, user: u64, text: &str) -> BotResult<Vec<Reply>> {
        let lower = text.to_lowercase();
        let rest = |keys: &[&str]| -> Option<String> {
            keys.iter().find(|k| lower.contains(*k)).map(|k| lower.replacen(k, "", 1).trim().to_string())
        };

        let reply = if let Some(q) = rest(&["search movie", "find movie"]) {
            if q.is_empty() { self.wait_for(user, MenuState::AwaitingSearchTerm).await? } else { self.search(&q).await? }
        } else if let Some(q) = rest(&["search actor", "find actor"]) {
            if q.is_empty() { self.wait_for(user, MenuState::AwaitingActor).await? } else { self.actor(&q).await? }
        } else if let Some(q) = rest(&["add to favorites", "add favorite"]) {
            if q.is_empty() { self.wait_for(user, MenuState::AwaitingFavorite).await? } else { self.favorite_search(&q).await? }
        } else if lower.contains("trending") || lower.contains("popular") {
            self.trending().await?
        } else if lower.contains("favorite") || lower.contains("favourite") {
            self.show_favorites(user).await?
        } else if let Some(g) = rest(&["genre"]) {
            if g.is_empty() { self.wait_for(user, MenuState::AwaitingGenre).await? } else { self.movies_of_genre(&g).await? }
        } else if lower.contains("cinema") {
            self.wait_for(user, MenuState::AwaitingLocation).await?
        } else if lower.contains("help") {
            format::help()
        } else if lower.contains("menu") || lower.contains("start") {
            format::welcome()
        } else {
            format::not_understood()
        };
        Ok(vec![reply])
    }

    /* ====== Операции ====== */

    pub async fn search(&self, title: &str) -> BotResult<Reply> {
        let title = validate_query(title, "Please enter a movie title, e.g. /search Inception")?;
        let movies = self.api.search_movies(title).await?;
        if movies.is_empty() {
            return Err(BotError::not_found(format!("No movies found for '{title}'.")));
        }
        Ok(format::movie_list("🎬 Movies found:", &movies, self.known_genres(), MovieButton::Detail))
    }

    pub async fn trending(&self) -> BotResult<Reply> {
        let movies = self.api.trending().await?;
        if movies.is_empty() {
            return Err(BotError::not_found("No trending movies right now."));
        }
        Ok(format::movie_list("🎬 Trending today:", &movies, self.known_genres(), MovieButton::Detail))
    }

    pub async fn movies_of_genre(&self, name: &str) -> BotResult<Reply> {
        let name = validate_query(name, "Please enter a genre name, e.g. /genre comedy")?;
        let genres = self.genre_table().await?;
        let Some(genre) = genres.iter().find(|g| g.name.eq_ignore_ascii_case(name)) else {
            let available: Vec<&str> = genres.iter().map(|g| g.name.as_str()).collect();
            return Err(BotError::invalid_input(format!(
                "Genre '{name}' not found. Available genres: {}",
                available.join(", ")
            )));
        };
        self.movies_for(genre).await
    }

    async fn movies_of_genre_id(&self, id: u64) -> BotResult<Reply> {
        let genres = self.genre_table().await?;
        let genre = genres
            .iter()
            .find(|g| g.id == id)
            .ok_or_else(|| BotError::not_found("That genre is no longer available."))?;
        self.movies_for(genre).await
    }

    async fn movies_for(&self, genre: &Genre) -> BotResult<Reply> {
        let movies = self.api.movies_by_genre(genre.id).await?;
        if movies.is_empty() {
            return Err(BotError::not_found(format!("No movie recommendations for genre '{}'.", genre.name)));
        }
        let heading = format!("🎬 Movie recommendations for genre '{}':", genre.name);
        Ok(format::movie_list(&heading, &movies, self.known_genres(), MovieButton::Detail))
    }

    pub async fn actor(&self, name: &str) -> BotResult<Reply> {
        let name = validate_query(name, "Please enter an actor's name, e.g. /actor Tom Cruise")?;
        let people = self.api.search_actor(name).await?;
        let person = people
            .first()
            .ok_or_else(|| BotError::not_found(format!("No actor or actress found for '{name}'.")))?;
        Ok(format::actor(person))
    }

    pub async fn details(&self, movie_id: u64) -> BotResult<Reply> {
        let d = self.api.movie_details(movie_id).await?;
        Ok(format::movie_details(&d))
    }

    /// Поиск для избранного: те же результаты, но кнопки сохраняют фильм.
    pub async fn favorite_search(&self, title: &str) -> BotResult<Reply> {
        let title = validate_query(title, "Please enter a movie title, e.g. /favorite Inception")?;
        let movies = self.api.search_movies(title).await?;
        if movies.is_empty() {
            return Err(BotError::not_found(format!("No movies found for '{title}'.")));
        }
        Ok(format::movie_list("🎬 Select the movie you want to save:", &movies, self.known_genres(), MovieButton::Save))
    }

    pub async fn save_favorite(&self, user: u64, movie_id: u64) -> BotResult<Reply> {
        let d = self.api.movie_details(movie_id).await?;
        let added = self
            .favorites
            .add(user, FavoriteMovie { id: d.id, title: d.title.clone(), release_date: d.release_date.clone() })
            .await?;
        tracing::info!(user, movie_id, added, "favorite saved");
        Ok(format::favorite_saved(&d.title, added))
    }

    pub async fn show_favorites(&self, user: u64) -> BotResult<Reply> {
        self.favorites_page(user, 0).await
    }

    async fn favorites_page(&self, user: u64, page: usize) -> BotResult<Reply> {
        let list = self.favorites.list(user).await;
        if list.is_empty() {
            return Err(BotError::not_found(
                "You don't have any favorite movies yet. Add one with /favorite <title>.",
            ));
        }
        Ok(format::favorites(&list, page))
    }

    pub async fn remove_favorite(&self, user: u64, movie_id: u64) -> BotResult<Vec<Reply>> {
        let removed = self.favorites.remove(user, movie_id).await?;
        let mut replies = vec![format::favorite_removed(removed)];
        let list = self.favorites.list(user).await;
        if !list.is_empty() {
            replies.push(format::favorites(&list, 0));
        }
        Ok(replies)
    }

    pub async fn nearest_cinema(&self, location: Option<(f64, f64)>) -> BotResult<Reply> {
        let (lat, lon) = location.ok_or_else(|| BotError::invalid_input(LOCATION_HINT))?;
        check_coordinates(lat, lon)?;
        let cinemas = self.api.nearby_cinemas(lat, lon).await?;
        if cinemas.is_empty() {
            return Err(BotError::not_found(format::no_cinemas_message(lat, lon)));
        }
        Ok(format::cinemas(&cinemas, lat, lon))
    }

    /* ====== Жанры ====== */

    async fn genre_table(&self) -> BotResult<&[Genre]> {
        let genres = self
            .genres
            .get_or_try_init(|| async {
                let genres = self.api.genres().await?;
                tracing::info!(count = genres.len(), "genre table loaded");
                Ok::<_, BotError>(genres)
            })
            .await?;
        Ok(genres.as_slice())
    }

    fn known_genres(&self) -> &[Genre] {
        self.genres.get().map(Vec::as_slice).unwrap_or(&[])
    }

    #[cfg(test)]
    async fn state_of(&self, user: u64) -> MenuState {
        self.sessions.get(user).await
    }
}

/// Ошибки ловим здесь и превращаем в сообщение пользователю.
fn respond(user: u64, result: BotResult<Vec<Reply>>) -> Vec<Reply> {
    match result {
        Ok(replies) => replies,
        Err(e) => {
            match &e {
                BotError::ExternalApi(_) | BotError::Storage(_) => tracing::error!(user, error = %e, "handler failed"),
                BotError::InvalidInput(_) | BotError::NotFound(_) => tracing::info!(user, error = %e, "handler declined"),
            }
            vec![format::error(&e)]
        }
    }
}

fn validate_query<'a>(q: &'a str, hint: &str) -> BotResult<&'a str> {
    let q = q.trim();
    if q.is_empty() {
        return Err(BotError::invalid_input(hint));
    }
    if q.chars().count() > MAX_QUERY_CHARS {
        return Err(BotError::invalid_input(format!("That's too long, keep it under {MAX_QUERY_CHARS} characters.")));
    }
    Ok(q)
}

const LOCATION_HINT: &str =
    "Send your location with the 📍 button, or type coordinates like /nearest_cinema -6.2, 106.8";

static COORDS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(-?\d{1,3}(?:\.\d+)?)\s*[,;\s]\s*(-?\d{1,3}(?:\.\d+)?)\s*$").expect("valid regex")
});

/// «lat, lon» / «lat lon» / «lat;lon».
pub fn parse_coordinates(text: &str) -> BotResult<(f64, f64)> {
    let caps = COORDS_RE.captures(text).ok_or_else(|| BotError::invalid_input(LOCATION_HINT))?;
    let lat: f64 = caps[1].parse().map_err(|_| BotError::invalid_input(LOCATION_HINT))?;
    let lon: f64 = caps[2].parse().map_err(|_| BotError::invalid_input(LOCATION_HINT))?;
    check_coordinates(lat, lon)?;
    Ok((lat, lon))
}

fn check_coordinates(lat: f64, lon: f64) -> BotResult<()> {
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(BotError::invalid_input(format!(
            "Coordinates out of range: latitude must be within ±90 and longitude within ±180. {LOCATION_HINT}"
        )));
    }
    Ok(())
}
