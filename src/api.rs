use crate::cinema::{Cinema, CinemaClient};
use crate::config::Config;
use crate::error::BotResult;
use crate::tmdb::{Genre, Movie, MovieDetails, Person, TmdbClient};
use async_trait::async_trait;

/// Всё, что боту нужно от внешних сервисов. Каждый метод — один HTTP-запрос.
#[async_trait]
pub trait MovieApi: Send + Sync {
    async fn search_movies(&self, title: &str) -> BotResult<Vec<Movie>>;
    async fn trending(&self) -> BotResult<Vec<Movie>>;
    async fn genres(&self) -> BotResult<Vec<Genre>>;
    async fn movies_by_genre(&self, genre_id: u64) -> BotResult<Vec<Movie>>;
    async fn search_actor(&self, name: &str) -> BotResult<Vec<Person>>;
    async fn movie_details(&self, id: u64) -> BotResult<MovieDetails>;
    async fn nearby_cinemas(&self, lat: f64, lon: f64) -> BotResult<Vec<Cinema>>;
}

#[derive(Clone)]
pub struct MovieClient {
    tmdb: TmdbClient,
    cinemas: CinemaClient,
}

impl MovieClient {
    pub fn new(tmdb: TmdbClient, cinemas: CinemaClient) -> Self {
        Self { tmdb, cinemas }
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(cfg.http_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let tmdb = TmdbClient::new(
            cfg.tmdb_api_key.clone(),
            cfg.tmdb_base_url.clone(),
            cfg.tmdb_language.clone(),
            http.clone(),
        );
        let cinemas = CinemaClient::new(cfg.overpass_url.clone(), cfg.cinema_radius_m, http);
        Ok(Self::new(tmdb, cinemas))
    }
}

#[async_trait]
impl MovieApi for MovieClient {
    async fn search_movies(&self, title: &str) -> BotResult<Vec<Movie>> {
        self.tmdb.search_movies(title).await
    }

    async fn trending(&self) -> BotResult<Vec<Movie>> {
        self.tmdb.trending().await
    }

    async fn genres(&self) -> BotResult<Vec<Genre>> {
        self.tmdb.genres().await
    }

    async fn movies_by_genre(&self, genre_id: u64) -> BotResult<Vec<Movie>> {
        self.tmdb.movies_by_genre(genre_id).await
    }

    async fn search_actor(&self, name: &str) -> BotResult<Vec<Person>> {
        self.tmdb.search_person(name).await
    }

    async fn movie_details(&self, id: u64) -> BotResult<MovieDetails> {
        self.tmdb.movie_details(id).await
    }

    async fn nearby_cinemas(&self, lat: f64, lon: f64) -> BotResult<Vec<Cinema>> {
        self.cinemas.nearby(lat, lon).await
    }
}
