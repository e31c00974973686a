use crate::error::{BotError, BotResult};
use reqwest::Client;
use serde::Deserialize;

/// Сколько кинотеатров показываем.
pub const MAX_CINEMAS: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct Cinema {
    pub name: String,
    pub address: Option<String>,
    pub distance_km: f64,
    pub lat: f64,
    pub lon: f64,
}

/// Поиск кинотеатров рядом с точкой через Overpass API (OpenStreetMap).
#[derive(Clone)]
pub struct CinemaClient {
    url: String,
    radius_m: u32,
    http: Client,
}

impl CinemaClient {
    pub fn new(url: impl Into<String>, radius_m: u32, http: Client) -> Self {
        Self { url: url.into(), radius_m, http }
    }

    pub async fn nearby(&self, lat: f64, lon: f64) -> BotResult<Vec<Cinema>> {
        let query = format!(
            "[out:json][timeout:15];nwr[\"amenity\"=\"cinema\"](around:{},{},{});out center 50;",
            self.radius_m, lat, lon
        );
        tracing::debug!(lat, lon, radius_m = self.radius_m, "overpass request");
        let resp = self.http.post(&self.url).form(&[("data", query)]).send().await?;
        let status = resp.status();
        if !status.is_success() {
            tracing::warn!(%status, "overpass returned an error status");
            return Err(BotError::ExternalApi(format!("overpass: HTTP {status}")));
        }
        let data: OverpassResp = resp
            .json()
            .await
            .map_err(|e| BotError::ExternalApi(format!("overpass: {e}")))?;

        let mut cinemas: Vec<Cinema> = data
            .elements
            .into_iter()
            .filter_map(|el| el.into_cinema(lat, lon))
            .collect();
        cinemas.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
        cinemas.truncate(MAX_CINEMAS);
        Ok(cinemas)
    }
}

/// Ссылка на поиск кинотеатров в Google Maps вокруг точки.
pub fn maps_search_link(lat: f64, lon: f64) -> String {
    format!("https://www.google.com/maps/search/{}/@{lat},{lon},15z", urlencoding::encode("cinema"))
}

pub fn maps_place_link(c: &Cinema) -> String {
    format!(
        "https://www.google.com/maps/search/?api=1&query={}",
        urlencoding::encode(&format!("{},{}", c.lat, c.lon))
    )
}

/// Расстояние по большому кругу, км.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}

/* ======= DTOs ======= */

#[derive(Deserialize, Debug)]
struct OverpassResp {
    #[serde(default)]
    elements: Vec<Element>,
}

#[derive(Deserialize, Debug)]
struct Element {
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<Center>,
    #[serde(default)]
    tags: std::collections::HashMap<String, String>,
}

#[derive(Deserialize, Debug)]
struct Center {
    lat: f64,
    lon: f64,
}

impl Element {
    fn into_cinema(self, from_lat: f64, from_lon: f64) -> Option<Cinema> {
        // у node координаты свои, у way/relation — center
        let (lat, lon) = match (self.lat, self.lon, &self.center) {
            (Some(lat), Some(lon), _) => (lat, lon),
            (_, _, Some(c)) => (c.lat, c.lon),
            _ => return None,
        };
        let name = self.tags.get("name").filter(|n| !n.trim().is_empty())?.clone();
        Some(Cinema {
            name,
            address: address_from_tags(&self.tags),
            distance_km: haversine_km(from_lat, from_lon, lat, lon),
            lat,
            lon,
        })
    }
}

fn address_from_tags(tags: &std::collections::HashMap<String, String>) -> Option<String> {
    if let Some(full) = tags.get("addr:full") {
        return Some(full.clone());
    }
    let street = match (tags.get("addr:street"), tags.get("addr:housenumber")) {
        (Some(s), Some(n)) => Some(format!("{s} {n}")),
        (Some(s), None) => Some(s.clone()),
        _ => None,
    };
    let parts: Vec<String> = [street, tags.get("addr:city").cloned()].into_iter().flatten().collect();
    if parts.is_empty() { None } else { Some(parts.join(", ")) }
}
