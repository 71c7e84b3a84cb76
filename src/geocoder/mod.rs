//! Address lookup for requests that name a place instead of coordinates.

pub mod cache;
pub mod nominatim;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::GeoPoint;

pub use cache::CachedGeocoder;
pub use nominatim::NominatimGeocoder;

#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("no match for address `{0}`")]
    NotFound(String),

    #[error("geocoding service rate limit exceeded")]
    RateLimited,

    #[error("geocoding service returned HTTP {0}")]
    Status(u16),

    #[error("unexpected geocoder response: {0}")]
    Parse(String),

    #[error("geocoding request failed: {0}")]
    Http(#[from] reqwest::Error),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn geocode(&self, address: &str) -> Result<GeoPoint, GeocodeError>;
}
