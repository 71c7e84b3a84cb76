use anyhow::{Context, Result};
use chrono_tz::Tz;
use figment::{providers::{Env, Format, Serialized, Toml}, Figment};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::BoundingBox;
use crate::ml::ArtifactPaths;

pub const DEFAULT_CONFIG_FILE: &str = "config/default.toml";
pub const ENV_PREFIX: &str = "PRECOG__";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub artifacts: ArtifactsConfig,
    pub bounds: BoundsConfig,
    pub geocoder: GeocoderConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
    pub request_timeout_secs: u64,
    /// IANA zone used when a request carries no timestamp
    pub timezone: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            enable_cors: true,
            request_timeout_secs: 30,
            timezone: "America/Toronto".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.host, self.port))
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.timezone
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("invalid server.timezone `{}`: {}", self.timezone, e))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactsConfig {
    pub dir: PathBuf,
    pub model_file: String,
    pub scaler_file: String,
    /// Load at startup and exit if that fails
    pub preload: bool,
}

impl Default for ArtifactsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("models"),
            model_file: "model.json".to_string(),
            scaler_file: "scaler.json".to_string(),
            preload: true,
        }
    }
}

impl ArtifactsConfig {
    pub fn paths(&self) -> ArtifactPaths {
        ArtifactPaths::in_dir(&self.dir, &self.model_file, &self.scaler_file)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoundsConfig {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
}

impl Default for BoundsConfig {
    fn default() -> Self {
        let b = BoundingBox::TORONTO;
        Self {
            lat_min: b.lat_min,
            lat_max: b.lat_max,
            lon_min: b.lon_min,
            lon_max: b.lon_max,
        }
    }
}

impl BoundsConfig {
    pub fn to_bounding_box(&self) -> Result<BoundingBox> {
        if !(self.lat_min < self.lat_max && self.lon_min < self.lon_max) {
            anyhow::bail!(
                "empty bounding box: lat {}..{}, lon {}..{}",
                self.lat_min,
                self.lat_max,
                self.lon_min,
                self.lon_max
            );
        }
        Ok(BoundingBox {
            lat_min: self.lat_min,
            lat_max: self.lat_max,
            lon_min: self.lon_min,
            lon_max: self.lon_max,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub enabled: bool,
    pub base_url: String,
    /// Appended to every address before lookup
    pub city_suffix: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub cache_capacity: usize,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "https://nominatim.openstreetmap.org/search".to_string(),
            city_suffix: ", Toronto".to_string(),
            user_agent: concat!("precog-matrix/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout_secs: 10,
            cache_capacity: 1024,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Defaults, then the TOML file if present, then `PRECOG__` env vars.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let figment = Figment::from(Serialized::defaults(Config::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        let cfg: Config = figment.extract().context("failed to load configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        self.server.socket_addr()?;
        self.server.timezone()?;
        self.bounds.to_bounding_box()?;
        if self.artifacts.model_file.is_empty() || self.artifacts.scaler_file.is_empty() {
            anyhow::bail!("artifacts.model_file and artifacts.scaler_file must be set");
        }
        Ok(())
    }
}
