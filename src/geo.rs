//! Coordinates, great-circle distance, and geocoding.
//!
//! Geocoding is an injected capability: the checkout flow takes any
//! [`Geocoder`] so the delivery geofence can be exercised without a live
//! mapping service.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Mean equatorial radius used by common mapping libraries, in kilometres.
const EARTH_RADIUS_KM: f64 = 6_378.137;

/// A WGS-84 latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinate {
    #[must_use]
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// True when both components are finite and within the WGS-84 ranges.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Great-circle (haversine) distance between two points, in kilometres.
#[must_use]
pub fn haversine_km(a: Coordinate, b: Coordinate) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Why an address could not be turned into a coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeocodeError {
    /// The service answered but found nothing for the address.
    NotFound,
    /// The service could not be reached or returned an unusable answer.
    Unavailable(String),
}

impl fmt::Display for GeocodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "address not found"),
            Self::Unavailable(reason) => write!(f, "geocoder unavailable: {reason}"),
        }
    }
}

impl std::error::Error for GeocodeError {}

/// Resolves addresses to coordinates and measures distances.
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn resolve_coordinates(&self, address: &str) -> Result<Coordinate, GeocodeError>;

    /// Distance in kilometres; haversine unless the implementation knows better.
    fn distance_km(&self, a: Coordinate, b: Coordinate) -> f64 {
        haversine_km(a, b)
    }
}

/// A fixed address book, matched case-insensitively on trimmed input.
#[derive(Debug, Clone, Default)]
pub struct StaticGeocoder {
    entries: HashMap<String, Coordinate>,
}

impl StaticGeocoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_address(mut self, address: &str, at: Coordinate) -> Self {
        self.entries.insert(normalize(address), at);
        self
    }
}

#[async_trait]
impl Geocoder for StaticGeocoder {
    async fn resolve_coordinates(&self, address: &str) -> Result<Coordinate, GeocodeError> {
        self.entries
            .get(&normalize(address))
            .copied()
            .ok_or(GeocodeError::NotFound)
    }
}

fn normalize(address: &str) -> String {
    address.trim().to_lowercase()
}

/// One result from a Nominatim-style search.
#[derive(Debug, Deserialize)]
struct SearchHit {
    lat: String,
    lon: String,
}

/// Geocoder backed by a Nominatim-compatible `search` endpoint.
///
/// Issues `GET <url>?q=<address>&format=json&limit=1` and reads the first
/// hit's `lat`/`lon`.
pub struct HttpGeocoder {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpGeocoder {
    #[must_use]
    pub fn new(client: reqwest::Client, url: &str, timeout: Duration) -> Self {
        Self {
            client,
            url: url.to_string(),
            timeout,
        }
    }
}

#[async_trait]
impl Geocoder for HttpGeocoder {
    async fn resolve_coordinates(&self, address: &str) -> Result<Coordinate, GeocodeError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("q", address), ("format", "json"), ("limit", "1")])
            .header("User-Agent", concat!("eazymart/", env!("CARGO_PKG_VERSION")))
            .timeout(self.timeout)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| GeocodeError::Unavailable(e.to_string()))?;

        let hits: Vec<SearchHit> = response
            .json()
            .await
            .map_err(|e| GeocodeError::Unavailable(e.to_string()))?;
        let hit = hits.into_iter().next().ok_or(GeocodeError::NotFound)?;

        let lat = hit
            .lat
            .parse::<f64>()
            .map_err(|e| GeocodeError::Unavailable(format!("bad latitude: {e}")))?;
        let lng = hit
            .lon
            .parse::<f64>()
            .map_err(|e| GeocodeError::Unavailable(format!("bad longitude: {e}")))?;

        let point = Coordinate { lat, lng };
        if !point.is_valid() {
            return Err(GeocodeError::Unavailable(format!(
                "coordinate out of range: {lat},{lng}"
            )));
        }
        debug!(address, lat, lng, "resolved delivery address");
        Ok(point)
    }
}
