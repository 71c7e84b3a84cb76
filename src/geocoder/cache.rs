use std::num::NonZeroUsize;

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use tracing::debug;

use super::{GeocodeError, Geocoder};
use crate::domain::GeoPoint;

/// Bounded LRU in front of another geocoder. Failures are never cached.
pub struct CachedGeocoder<G> {
    inner: G,
    cache: Mutex<LruCache<String, GeoPoint>>,
}

impl<G: Geocoder> CachedGeocoder<G> {
    pub fn new(inner: G, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn len(&self) -> usize {
        self.cache.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.lock().is_empty()
    }

    fn key(address: &str) -> String {
        address.trim().to_lowercase()
    }
}

#[async_trait]
impl<G: Geocoder> Geocoder for CachedGeocoder<G> {
    async fn geocode(&self, address: &str) -> Result<GeoPoint, GeocodeError> {
        let key = Self::key(address);
        let cached = self.cache.lock().get(&key).copied();
        if let Some(point) = cached {
            debug!(address = %key, "geocode cache hit");
            return Ok(point);
        }

        let point = self.inner.geocode(address).await?;
        self.cache.lock().put(key, point);
        Ok(point)
    }
}
