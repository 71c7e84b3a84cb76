//! Nominatim / OpenStreetMap free-form search client.
//!
//! The public instance allows one request per second and requires an
//! identifying User-Agent. See <https://nominatim.org/release-docs/develop/api/Search/>

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{GeocodeError, Geocoder};
use crate::config::GeocoderConfig;
use crate::domain::GeoPoint;

#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: reqwest::Client,
    base_url: String,
    city_suffix: String,
}

impl NominatimGeocoder {
    pub fn new(cfg: &GeocoderConfig) -> Result<Self, GeocodeError> {
        let client = reqwest::Client::builder()
            .user_agent(cfg.user_agent.as_str())
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: cfg.base_url.clone(),
            city_suffix: cfg.city_suffix.clone(),
        })
    }

    /// Scope the query to the service city unless the caller already did.
    fn query_for(&self, address: &str) -> String {
        let address = address.trim();
        let suffix = self.city_suffix.trim_start_matches([',', ' ']);
        if suffix.is_empty() || address.to_lowercase().ends_with(&suffix.to_lowercase()) {
            address.to_string()
        } else {
            format!("{address}{}", self.city_suffix)
        }
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, address: &str) -> Result<GeoPoint, GeocodeError> {
        let query = self.query_for(address);
        debug!(%query, "geocoding address");

        let resp = self
            .client
            .get(&self.base_url)
            .query(&[("q", query.as_str()), ("format", "jsonv2"), ("limit", "1")])
            .send()
            .await?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::RateLimited);
        }
        if !status.is_success() {
            return Err(GeocodeError::Status(status.as_u16()));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| GeocodeError::Parse(e.to_string()))?;
        parse_response(&body)?.ok_or_else(|| GeocodeError::NotFound(address.trim().to_string()))
    }
}

fn coordinate(value: &Value, field: &str) -> Result<f64, GeocodeError> {
    let parsed = match &value[field] {
        Value::String(s) => s.parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    parsed.ok_or_else(|| GeocodeError::Parse(format!("missing {field} in Nominatim response")))
}

/// First hit of a Nominatim search, `None` when there were no hits.
fn parse_response(body: &Value) -> Result<Option<GeoPoint>, GeocodeError> {
    let results = body
        .as_array()
        .ok_or_else(|| GeocodeError::Parse("Nominatim response is not an array".to_string()))?;

    let Some(first) = results.first() else {
        return Ok(None);
    };

    Ok(Some(GeoPoint::new(
        coordinate(first, "lat")?,
        coordinate(first, "lon")?,
    )))
}
