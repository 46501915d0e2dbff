//! Coordinates to place name, with a per-session cache
//!
//! Cache keys are the exact `"lat,lon"` text of the coordinate pair; there is
//! no rounding, so only identical coordinates hit. Only successful lookups are
//! cached, which lets a later call retry once the geocoder is reachable again.
//! The cache lock is never held across an await, so slow lookups for one
//! coordinate never block another.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

use super::geocoder::Geocoder;
use crate::error::LocationError;

/// Cache key for a coordinate pair
pub fn cache_key(lat: f64, lon: f64) -> String {
    format!("{},{}", lat, lon)
}

/// Latitude within -90..=90 and longitude within -180..=180
pub fn in_bounds(lat: f64, lon: f64) -> bool {
    (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon)
}

pub struct LocationResolver {
    geocoder: Arc<dyn Geocoder>,
    cache: Mutex<HashMap<String, String>>,
}

impl LocationResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self {
            geocoder,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub async fn resolve(&self, lat: f64, lon: f64) -> Result<String, LocationError> {
        if !in_bounds(lat, lon) {
            return Err(LocationError::OutOfBounds { lat, lon });
        }

        let key = cache_key(lat, lon);
        if let Some(name) = self.lookup(&key) {
            debug!(key = %key, "Location cache hit");
            return Ok(name);
        }

        let candidates = self.geocoder.reverse(lat, lon).await.map_err(|e| {
            warn!(key = %key, error = %e, "Geocoder failed");
            LocationError::Geocoder(e.to_string())
        })?;

        let name = candidates
            .first()
            .map(|address| address.place_name())
            .ok_or_else(|| LocationError::NotFound(key.clone()))?;

        debug!(key = %key, name = %name, "Location resolved");
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, name.clone());

        Ok(name)
    }

    /// Cached name for the coordinate, without any I/O
    pub fn cached(&self, lat: f64, lon: f64) -> Option<String> {
        self.lookup(&cache_key(lat, lon))
    }

    pub fn cache_len(&self) -> usize {
        self.cache.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    fn lookup(&self, key: &str) -> Option<String> {
        self.cache
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
    }
}

impl std::fmt::Debug for LocationResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocationResolver")
            .field("cached", &self.cache_len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeGeocoder;
    use std::time::Duration;

    #[tokio::test]
    async fn test_second_call_is_cache_hit() {
        let geocoder = Arc::new(FakeGeocoder::named("Bandung, Indonesia"));
        let resolver = LocationResolver::new(geocoder.clone());

        assert_eq!(resolver.resolve(-6.9, 107.6).await.unwrap(), "Bandung, Indonesia");
        assert_eq!(resolver.resolve(-6.9, 107.6).await.unwrap(), "Bandung, Indonesia");
        assert_eq!(geocoder.calls(), 1);
        assert_eq!(resolver.cached(-6.9, 107.6).as_deref(), Some("Bandung, Indonesia"));

        // Nearby but not identical is a different key
        resolver.resolve(-6.90001, 107.6).await.unwrap();
        assert_eq!(geocoder.calls(), 2);
    }

    #[tokio::test]
    async fn test_out_of_bounds_skips_geocoder() {
        let geocoder = Arc::new(FakeGeocoder::named("anywhere"));
        let resolver = LocationResolver::new(geocoder.clone());

        assert!(matches!(
            resolver.resolve(91.0, 0.0).await,
            Err(LocationError::OutOfBounds { .. })
        ));
        assert!(matches!(
            resolver.resolve(0.0, 181.0).await,
            Err(LocationError::OutOfBounds { .. })
        ));
        assert_eq!(geocoder.calls(), 0);

        // Edges are valid
        assert!(resolver.resolve(90.0, -180.0).await.is_ok());
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let geocoder = Arc::new(FakeGeocoder::named("Surabaya, Indonesia"));
        let resolver = LocationResolver::new(geocoder.clone());

        geocoder.set_offline(true);
        assert!(matches!(
            resolver.resolve(-7.25, 112.75).await,
            Err(LocationError::Geocoder(_))
        ));

        geocoder.set_offline(false);
        geocoder.set_empty(true);
        assert!(matches!(
            resolver.resolve(-7.25, 112.75).await,
            Err(LocationError::NotFound(_))
        ));
        assert_eq!(resolver.cache_len(), 0);

        geocoder.set_empty(false);
        assert_eq!(resolver.resolve(-7.25, 112.75).await.unwrap(), "Surabaya, Indonesia");
        assert_eq!(geocoder.calls(), 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_slow_lookup_does_not_block_others() {
        let geocoder = Arc::new(FakeGeocoder::named("Somewhere"));
        geocoder.delay_for(1.0, 1.0, Duration::from_secs(5));
        let resolver = Arc::new(LocationResolver::new(geocoder.clone()));

        let slow = {
            let resolver = resolver.clone();
            tokio::spawn(async move { resolver.resolve(1.0, 1.0).await })
        };

        let fast = tokio::time::timeout(Duration::from_secs(1), resolver.resolve(2.0, 2.0)).await;
        assert_eq!(fast.unwrap().unwrap(), "Somewhere");

        slow.abort();
    }
}
