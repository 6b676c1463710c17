//! Reverse geocoding: GPS coordinate → short place name.
//!
//! [`Geocoder::resolve`] consults the [`LocationCache`] first and only goes
//! to the network on a miss. The remote client is built lazily on the first
//! miss, so a run fully served by the cache never opens a connection.
//!
//! When the remote call fails, the displayed place falls back to the raw
//! `lat/lon` string. That fallback is not cached, so a later run with
//! network access retries the lookup.

use crate::cache::{self, KEY_PRECISION, LocationCache};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

pub const DEFAULT_ENDPOINT: &str = "https://nominatim.openstreetmap.org/reverse";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("request failed: {0}")]
    Http(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed response: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no place found")]
    NoResult,
}

/// A remote reverse-geocoding service.
pub trait ReverseGeocoder {
    /// Full address for a coordinate at the given zoom (detail) level.
    fn reverse(&self, latitude: f64, longitude: f64, zoom: u8) -> Result<String, GeocodeError>;
}

impl<T: ReverseGeocoder + ?Sized> ReverseGeocoder for Box<T> {
    fn reverse(&self, latitude: f64, longitude: f64, zoom: u8) -> Result<String, GeocodeError> {
        (**self).reverse(latitude, longitude, zoom)
    }
}

#[derive(Deserialize)]
struct ReverseResponse {
    display_name: Option<String>,
    error: Option<String>,
}

/// Client for the Nominatim `/reverse` API.
pub struct NominatimClient {
    agent: ureq::Agent,
    endpoint: String,
    user_agent: String,
}

impl NominatimClient {
    pub fn new(endpoint: &str, user_agent: &str) -> Self {
        debug!(endpoint, "connecting reverse geocoder");
        Self {
            agent: ureq::AgentBuilder::new().timeout(REQUEST_TIMEOUT).build(),
            endpoint: endpoint.to_string(),
            user_agent: user_agent.to_string(),
        }
    }
}

impl ReverseGeocoder for NominatimClient {
    fn reverse(&self, latitude: f64, longitude: f64, zoom: u8) -> Result<String, GeocodeError> {
        let response = self
            .agent
            .get(&self.endpoint)
            .set("User-Agent", &self.user_agent)
            .query("format", "json")
            .query("lat", &latitude.to_string())
            .query("lon", &longitude.to_string())
            .query("zoom", &zoom.to_string())
            .call()
            .map_err(|e| GeocodeError::Http(e.to_string()))?;
        let body: ReverseResponse = serde_json::from_str(&response.into_string()?)?;
        if let Some(error) = body.error {
            debug!(latitude, longitude, "geocoder returned error: {}", error);
            return Err(GeocodeError::NoResult);
        }
        body.display_name.ok_or(GeocodeError::NoResult)
    }
}

/// First comma-separated segment of an address, trimmed.
pub fn place_name(address: &str) -> Option<String> {
    address
        .split(',')
        .next()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Displayed place when no name can be resolved.
pub fn fallback_name(latitude: f64, longitude: f64) -> String {
    format!(
        "{:.*}/{:.*}",
        KEY_PRECISION, latitude, KEY_PRECISION, longitude
    )
}

/// Cache-first resolver with a lazily constructed remote client.
pub struct Geocoder<G> {
    client: Option<G>,
    connect: Box<dyn Fn() -> G>,
    remote_lookups: u32,
}

impl<G: ReverseGeocoder> Geocoder<G> {
    /// `connect` runs at most once, on the first cache miss.
    pub fn new(connect: impl Fn() -> G + 'static) -> Self {
        Self {
            client: None,
            connect: Box::new(connect),
            remote_lookups: 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    /// Number of remote requests made so far.
    pub fn remote_lookups(&self) -> u32 {
        self.remote_lookups
    }

    pub fn resolve(
        &mut self,
        cache: &mut LocationCache,
        latitude: f64,
        longitude: f64,
        zoom: u8,
    ) -> String {
        let key = cache::coordinate_key(latitude, longitude);
        if let Some(name) = cache.get(&key, zoom) {
            return name.to_string();
        }

        let client = self.client.get_or_insert_with(|| (self.connect)());
        self.remote_lookups += 1;
        match client.reverse(latitude, longitude, zoom).map(|a| place_name(&a)) {
            Ok(Some(name)) => {
                debug!(%key, zoom, %name, "geocoded");
                cache.insert_if_absent(&key, zoom, &name);
                name
            }
            Ok(None) => {
                warn!(%key, "geocoder returned an empty address");
                fallback_name(latitude, longitude)
            }
            Err(e) => {
                warn!(%key, "reverse geocoding failed: {}", e);
                fallback_name(latitude, longitude)
            }
        }
    }
}

/// Geocoder over any boxed client; what the pipeline holds.
pub type DynGeocoder = Geocoder<Box<dyn ReverseGeocoder>>;

impl DynGeocoder {
    pub fn nominatim(endpoint: &str, user_agent: &str) -> Self {
        let endpoint = endpoint.to_string();
        let user_agent = user_agent.to_string();
        Self::new(move || {
            Box::new(NominatimClient::new(&endpoint, &user_agent)) as Box<dyn ReverseGeocoder>
        })
    }
}
