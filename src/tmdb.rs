use crate::error::{BotError, BotResult};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};

pub const IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p/w500";

#[derive(Clone)]
pub struct TmdbClient {
    api_key: String,
    base_url: String,
    language: String,
    http: Client,
}

impl TmdbClient {
    pub fn new(api_key: String, base_url: impl Into<String>, language: impl Into<String>, http: Client) -> Self {
        Self {
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            language: language.into(),
            http,
        }
    }

    /// Поиск фильмов по названию; записи без названия отбрасываются.
    pub async fn search_movies(&self, title: &str) -> BotResult<Vec<Movie>> {
        let data: PageResp<Movie> = self
            .get_json("search/movie", &[("query", title), ("include_adult", "false"), ("page", "1")])
            .await?;
        Ok(with_titles(data.results))
    }

    pub async fn trending(&self) -> BotResult<Vec<Movie>> {
        let data: PageResp<Movie> = self.get_json("trending/movie/day", &[]).await?;
        Ok(with_titles(data.results))
    }

    pub async fn genres(&self) -> BotResult<Vec<Genre>> {
        let data: GenresResp = self.get_json("genre/movie/list", &[]).await?;
        Ok(data.genres)
    }

    pub async fn movies_by_genre(&self, genre_id: u64) -> BotResult<Vec<Movie>> {
        let id = genre_id.to_string();
        let data: PageResp<Movie> = self
            .get_json("discover/movie", &[("with_genres", id.as_str()), ("page", "1")])
            .await?;
        Ok(with_titles(data.results))
    }

    pub async fn search_person(&self, name: &str) -> BotResult<Vec<Person>> {
        let data: PageResp<Person> = self
            .get_json("search/person", &[("query", name), ("include_adult", "false"), ("page", "1")])
            .await?;
        Ok(data
            .results
            .into_iter()
            .map(|mut p| {
                p.known_for.retain(|m| !m.title.trim().is_empty());
                p
            })
            .collect())
    }

    /// Детали фильма вместе с актёрами и видео одним запросом.
    pub async fn movie_details(&self, id: u64) -> BotResult<MovieDetails> {
        let path = format!("movie/{id}");
        let resp = self
            .request(&path, &[("append_to_response", "credits,videos")])
            .send()
            .await?;
        if resp.status() == StatusCode::NOT_FOUND {
            return Err(BotError::not_found("Movie details not found."));
        }
        decode(resp, &path).await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> BotResult<T> {
        let resp = self.request(path, query).send().await?;
        decode(resp, path).await
    }

    fn request(&self, path: &str, query: &[(&str, &str)]) -> RequestBuilder {
        let url = format!("{}/{}", self.base_url, path);
        tracing::debug!(%url, "tmdb request");
        let req = self.http.get(url).query(&[("language", self.language.as_str())]).query(query);
        // v4 read-access token — это JWT, всё остальное считаем ключом v3
        if self.api_key.starts_with("eyJ") {
            req.bearer_auth(&self.api_key)
        } else {
            req.query(&[("api_key", self.api_key.as_str())])
        }
    }
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response, path: &str) -> BotResult<T> {
    let status = resp.status();
    if !status.is_success() {
        tracing::warn!(%status, path, "tmdb returned an error status");
        return Err(BotError::ExternalApi(format!("tmdb {path}: HTTP {status}")));
    }
    resp.json::<T>().await.map_err(|e| {
        tracing::warn!(error = %e, path, "tmdb response could not be decoded");
        BotError::ExternalApi(format!("tmdb {path}: {e}"))
    })
}

fn with_titles(mut movies: Vec<Movie>) -> Vec<Movie> {
    movies.retain(|m| !m.title.trim().is_empty());
    movies
}

/* ======= DTOs ======= */

#[derive(Deserialize, Debug)]
struct PageResp<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Deserialize, Debug)]
struct GenresResp {
    #[serde(default)]
    genres: Vec<Genre>,
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct Genre {
    pub id: u64,
    pub name: String,
}

/// Элемент списка: поиск, тренды, жанры, known_for у актёров.
/// У сериалов в known_for вместо `title` приходит `name`.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct Movie {
    pub id: u64,
    #[serde(default, alias = "name")]
    pub title: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub genre_ids: Vec<u64>,
}

impl Movie {
    pub fn year(&self) -> Option<&str> {
        year_of(self.release_date.as_deref())
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Person {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub profile_path: Option<String>,
    #[serde(default)]
    pub known_for_department: Option<String>,
    #[serde(default)]
    pub known_for: Vec<Movie>,
}

impl Person {
    pub fn profile_url(&self) -> Option<String> {
        self.profile_path.as_ref().map(|p| format!("{IMAGE_BASE_URL}{p}"))
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct MovieDetails {
    pub id: u64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub runtime: Option<u32>,
    #[serde(default)]
    pub genres: Vec<Genre>,
    #[serde(default)]
    pub credits: Option<Credits>,
    #[serde(default)]
    pub videos: Option<Videos>,
}

impl MovieDetails {
    pub fn year(&self) -> Option<&str> {
        year_of(self.release_date.as_deref())
    }

    pub fn top_cast(&self, n: usize) -> Vec<&CastMember> {
        self.credits.as_ref().map(|c| c.cast.iter().take(n).collect()).unwrap_or_default()
    }

    /// Лучший трейлер на YouTube: сначала официальные, затем Trailer → Teaser → прочее.
    pub fn best_trailer_url(&self) -> Option<String> {
        let videos = self.videos.as_ref()?;
        let mut candidates: Vec<&Video> = videos
            .results
            .iter()
            .filter(|v| v.site.eq_ignore_ascii_case("YouTube"))
            .collect();
        candidates.sort_by_key(|v| {
            let official = if v.official.unwrap_or(false) { 0 } else { 1 };
            let typ = match v.r#type.as_str() { "Trailer" => 0, "Teaser" => 1, _ => 2 };
            (official, typ)
        });
        candidates.first().map(|v| format!("https://www.youtube.com/watch?v={}", v.key))
    }
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Credits {
    #[serde(default)]
    pub cast: Vec<CastMember>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CastMember {
    pub name: String,
    #[serde(default)]
    pub character: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct Videos {
    #[serde(default)]
    pub results: Vec<Video>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Video {
    pub key: String,
    pub site: String,
    pub r#type: String,
    #[serde(default)]
    pub official: Option<bool>,
}

fn year_of(date: Option<&str>) -> Option<&str> {
    date.and_then(|d| d.get(..4)).filter(|y| !y.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, key: &str) -> TmdbClient {
        TmdbClient::new(key.to_string(), server.uri(), "en-US", Client::new())
    }

    #[tokio::test]
    async fn search_returns_only_titled_movies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/movie"))
            .and(query_param("query", "Inception"))
            .and(query_param("api_key", "v3key"))
            .and(query_param("language", "en-US"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "page": 1,
                "results": [
                    { "id": 27205, "title": "Inception", "release_date": "2010-07-15",
                      "vote_average": 8.4, "genre_ids": [28, 878] },
                    { "id": 1, "title": "" },
                    { "id": 2, "title": "Inception: The Cobol Job", "release_date": "" }
                ]
            })))
            .mount(&server)
            .await;

        let movies = client(&server, "v3key").search_movies("Inception").await.unwrap();
        assert_eq!(movies.len(), 2);
        assert!(movies.iter().all(|m| !m.title.is_empty()));
        assert_eq!(movies[0].year(), Some("2010"));
        assert_eq!(movies[1].year(), None);
    }

    #[tokio::test]
    async fn read_access_token_goes_in_the_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/trending/movie/day"))
            .and(header("authorization", "Bearer eyJtoken"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [
                { "id": 7, "title": "Dune" }
            ]})))
            .mount(&server)
            .await;

        let movies = client(&server, "eyJtoken").trending().await.unwrap();
        assert_eq!(movies[0].title, "Dune");
    }

    #[tokio::test]
    async fn error_status_is_an_external_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/genre/movie/list"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client(&server, "bad").genres().await.unwrap_err();
        assert!(matches!(err, BotError::ExternalApi(_)));
    }

    #[tokio::test]
    async fn unreachable_server_is_an_external_api_error() {
        let tmdb = TmdbClient::new("k".into(), "http://127.0.0.1:9", "en-US", Client::new());
        let err = tmdb.trending().await.unwrap_err();
        assert!(matches!(err, BotError::ExternalApi(_)));
    }

    #[tokio::test]
    async fn slow_server_times_out_as_external_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/trending/movie/day"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "results": [] }))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let http = Client::builder().timeout(Duration::from_millis(50)).build().unwrap();
        let tmdb = TmdbClient::new("k".into(), server.uri(), "en-US", http);
        let err = tmdb.trending().await.unwrap_err();
        let BotError::ExternalApi(msg) = err else { panic!("expected ExternalApi, got {err:?}") };
        assert!(msg.contains("timed out"), "{msg}");
    }

    #[tokio::test]
    async fn details_include_cast_and_trailer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movie/27205"))
            .and(query_param("append_to_response", "credits,videos"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 27205,
                "title": "Inception",
                "release_date": "2010-07-15",
                "vote_average": 8.4,
                "runtime": 148,
                "genres": [{ "id": 28, "name": "Action" }],
                "credits": { "cast": [
                    { "name": "Leonardo DiCaprio", "character": "Cobb" },
                    { "name": "Joseph Gordon-Levitt", "character": "Arthur" }
                ]},
                "videos": { "results": [
                    { "key": "teaser1", "site": "YouTube", "type": "Teaser", "official": true },
                    { "key": "fan", "site": "YouTube", "type": "Trailer", "official": false },
                    { "key": "main", "site": "YouTube", "type": "Trailer", "official": true },
                    { "key": "vim", "site": "Vimeo", "type": "Trailer", "official": true }
                ]}
            })))
            .mount(&server)
            .await;

        let d = client(&server, "k").movie_details(27205).await.unwrap();
        assert_eq!(d.year(), Some("2010"));
        assert_eq!(d.top_cast(1).len(), 1);
        assert_eq!(d.top_cast(5)[1].name, "Joseph Gordon-Levitt");
        assert_eq!(d.best_trailer_url().as_deref(), Some("https://www.youtube.com/watch?v=main"));
    }

    #[tokio::test]
    async fn missing_movie_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/movie/999"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server, "k").movie_details(999).await.unwrap_err();
        assert!(matches!(err, BotError::NotFound(_)));
    }

    #[tokio::test]
    async fn person_known_for_accepts_tv_names() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/person"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "results": [{
                "id": 500,
                "name": "Tom Cruise",
                "profile_path": "/tc.jpg",
                "known_for_department": "Acting",
                "known_for": [
                    { "id": 954, "title": "Mission: Impossible", "release_date": "1996-05-22" },
                    { "id": 1399, "name": "Some Show", "media_type": "tv" }
                ]
            }]})))
            .mount(&server)
            .await;

        let people = client(&server, "k").search_person("tom cruise").await.unwrap();
        assert_eq!(people[0].known_for.len(), 2);
        assert_eq!(people[0].known_for[1].title, "Some Show");
        assert_eq!(people[0].profile_url().as_deref(), Some("https://image.tmdb.org/t/p/w500/tc.jpg"));
    }
}
