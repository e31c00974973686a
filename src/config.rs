use std::{path::PathBuf, time::Duration};
use thiserror::Error;

pub const DEFAULT_TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";
pub const DEFAULT_OVERPASS_URL: &str = "https://overpass-api.de/api/interpreter";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} is missing (set it in the environment or in .env)")]
    Missing(&'static str),
    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bot_token: String,
    pub tmdb_api_key: String,
    pub tmdb_base_url: String,
    pub tmdb_language: String,
    pub overpass_url: String,
    /// `None` — избранное только в памяти.
    pub favorites_path: Option<PathBuf>,
    pub http_timeout: Duration,
    pub cinema_radius_m: u32,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bot_token = get("BOT_TOKEN")
            .or_else(|| get("TELOXIDE_TOKEN"))
            .ok_or(ConfigError::Missing("BOT_TOKEN"))?;
        let tmdb_api_key = get("TMDB_API_KEY").ok_or(ConfigError::Missing("TMDB_API_KEY"))?;

        // FAVORITES_PATH="" отключает файл; без переменной — файл по умолчанию
        let favorites_path = match lookup("FAVORITES_PATH") {
            Some(p) if p.trim().is_empty() => None,
            Some(p) => Some(PathBuf::from(p.trim())),
            None => Some(PathBuf::from("favorites.json")),
        };

        let http_timeout = Duration::from_secs(parse_num(&get, "HTTP_TIMEOUT_SECS", 10u64)?);
        let cinema_radius_m = parse_num(&get, "CINEMA_RADIUS_M", 10_000u32)?;

        Ok(Self {
            bot_token,
            tmdb_api_key,
            tmdb_base_url: get("TMDB_BASE_URL").unwrap_or_else(|| DEFAULT_TMDB_BASE_URL.to_string()),
            tmdb_language: get("TMDB_LANGUAGE").unwrap_or_else(|| "en-US".to_string()),
            overpass_url: get("OVERPASS_URL").unwrap_or_else(|| DEFAULT_OVERPASS_URL.to_string()),
            favorites_path,
            http_timeout,
            cinema_radius_m,
        })
    }
}

fn parse_num<T, G>(get: &G, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr + PartialOrd + Default,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(name) else { return Ok(default) };
    let value = raw.parse::<T>().map_err(|e| ConfigError::Invalid {
        name,
        value: raw.clone(),
        reason: e.to_string(),
    })?;
    if value <= T::default() {
        return Err(ConfigError::Invalid { name, value: raw, reason: "must be positive".into() });
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn both_credentials_are_required() {
        let err = Config::from_lookup(lookup(&[("TMDB_API_KEY", "k")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("BOT_TOKEN"));

        let err = Config::from_lookup(lookup(&[("BOT_TOKEN", "t")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("TMDB_API_KEY"));

        let err = Config::from_lookup(lookup(&[("BOT_TOKEN", "  "), ("TMDB_API_KEY", "k")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("BOT_TOKEN"));
    }

    #[test]
    fn defaults_apply() {
        let cfg = Config::from_lookup(lookup(&[("TELOXIDE_TOKEN", "t"), ("TMDB_API_KEY", "k")])).unwrap();
        assert_eq!(cfg.bot_token, "t");
        assert_eq!(cfg.tmdb_base_url, DEFAULT_TMDB_BASE_URL);
        assert_eq!(cfg.tmdb_language, "en-US");
        assert_eq!(cfg.favorites_path, Some(PathBuf::from("favorites.json")));
        assert_eq!(cfg.http_timeout, Duration::from_secs(10));
        assert_eq!(cfg.cinema_radius_m, 10_000);
    }

    #[test]
    fn overrides_and_bad_numbers() {
        let cfg = Config::from_lookup(lookup(&[
            ("BOT_TOKEN", "t"),
            ("TMDB_API_KEY", "k"),
            ("FAVORITES_PATH", ""),
            ("HTTP_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();
        assert_eq!(cfg.favorites_path, None);
        assert_eq!(cfg.http_timeout, Duration::from_secs(3));

        let err = Config::from_lookup(lookup(&[
            ("BOT_TOKEN", "t"),
            ("TMDB_API_KEY", "k"),
            ("CINEMA_RADIUS_M", "far"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "CINEMA_RADIUS_M", .. }));
    }
}
