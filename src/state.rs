use std::sync::Arc;

use anyhow::{Context, Result};
use chrono_tz::Tz;
use tracing::{info, warn};

use crate::config::Config;
use crate::features::FeatureBuilder;
use crate::geocoder::{CachedGeocoder, Geocoder, NominatimGeocoder};
use crate::ml::{InferenceEngine, ModelContext};

/// Shared, read-only request context.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub engine: InferenceEngine,
    pub geocoder: Option<Arc<dyn Geocoder>>,
    pub timezone: Tz,
}

impl AppState {
    /// Builds the production state. With `artifacts.preload` set, a failed
    /// artifact load is returned as an error.
    pub async fn new(cfg: Config) -> Result<Self> {
        let context = Arc::new(ModelContext::new(cfg.artifacts.paths()));
        if cfg.artifacts.preload {
            context
                .preload()
                .await
                .context("failed to load model artifacts")?;
        } else {
            warn!("artifact preload disabled; the first prediction will load them");
        }

        let geocoder: Option<Arc<dyn Geocoder>> = if cfg.geocoder.enabled {
            let nominatim = NominatimGeocoder::new(&cfg.geocoder)
                .context("failed to build geocoding client")?;
            info!(
                base_url = %cfg.geocoder.base_url,
                cache_capacity = cfg.geocoder.cache_capacity,
                "address geocoding enabled"
            );
            Some(Arc::new(CachedGeocoder::new(
                nominatim,
                cfg.geocoder.cache_capacity,
            )))
        } else {
            info!("address geocoding disabled");
            None
        };

        Self::from_parts(cfg, context, geocoder)
    }

    pub fn from_parts(
        cfg: Config,
        context: Arc<ModelContext>,
        geocoder: Option<Arc<dyn Geocoder>>,
    ) -> Result<Self> {
        let bounds = cfg.bounds.to_bounding_box()?;
        let timezone = cfg.server.timezone()?;
        Ok(Self {
            engine: InferenceEngine::new(FeatureBuilder::new(bounds), context),
            cfg: Arc::new(cfg),
            geocoder,
            timezone,
        })
    }

    pub fn context(&self) -> &Arc<ModelContext> {
        self.engine.context()
    }
}
