//! ZIP → location resolution with a write-once in-memory cache.
//!
//! The cache is seeded with the roster's own ZIPs, so searching from a
//! trainer's ZIP never touches the network. Misses go to the [`Geocoder`]
//! exactly once per call; successful answers are memoized for the life of the
//! resolver, failures are not.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::GeocodeError;
use crate::types::{Candidate, LocationRecord};
use crate::zipcode::is_valid_zip;

/// External ZIP lookup service.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Look up `zip`. `Ok(None)` means the service knows no place for it.
    async fn lookup(&self, zip: &str) -> Result<Option<LocationRecord>, GeocodeError>;
}

/// Resolves ZIP codes, consulting the cache before the geocoder.
///
/// Clones share the same cache.
#[derive(Clone)]
pub struct LocationResolver {
    geocoder: Arc<dyn Geocoder>,
    cache: Arc<RwLock<HashMap<String, LocationRecord>>>,
}

impl LocationResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self {
            geocoder,
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Create a resolver whose cache already knows every candidate's ZIP.
    pub fn seeded(geocoder: Arc<dyn Geocoder>, candidates: &[Candidate]) -> Self {
        let cache: HashMap<String, LocationRecord> = candidates
            .iter()
            .map(|c| (c.zip.clone(), c.location()))
            .collect();
        Self {
            geocoder,
            cache: Arc::new(RwLock::new(cache)),
        }
    }

    /// Cached record for `zip`, if any. Never touches the network.
    pub async fn cached(&self, zip: &str) -> Option<LocationRecord> {
        self.cache.read().await.get(zip).cloned()
    }

    /// Number of ZIPs currently cached.
    pub async fn cached_len(&self) -> usize {
        self.cache.read().await.len()
    }

    /// Resolve `zip` to a location, or `None` if it cannot be resolved.
    pub async fn resolve(&self, zip: &str) -> Option<LocationRecord> {
        if !is_valid_zip(zip) {
            return None;
        }

        if let Some(hit) = self.cached(zip).await {
            tracing::debug!(zip, "location cache hit");
            return Some(hit);
        }

        match self.geocoder.lookup(zip).await {
            Ok(Some(record)) => {
                let mut cache = self.cache.write().await;
                // Another lookup for the same ZIP may have finished first; keep its record.
                let stored = cache.entry(zip.to_string()).or_insert(record);
                tracing::info!(zip, city = %stored.city, state = %stored.state, "resolved ZIP");
                Some(stored.clone())
            }
            Ok(None) => {
                tracing::info!(zip, "geocoder returned no places");
                None
            }
            Err(e) => {
                tracing::warn!(zip, error = %e, "geocoder lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Geocoder that counts calls and answers from a fixed reply.
    struct CountingGeocoder {
        calls: AtomicUsize,
        reply: Option<LocationRecord>,
        fail: bool,
    }

    impl CountingGeocoder {
        fn answering(reply: Option<LocationRecord>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                reply,
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                reply: None,
                fail: true,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Geocoder for CountingGeocoder {
        async fn lookup(&self, zip: &str) -> Result<Option<LocationRecord>, GeocodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(GeocodeError::InvalidCoordinate {
                    zip: zip.to_string(),
                    value: "NaN".to_string(),
                });
            }
            Ok(self.reply.clone())
        }
    }

    fn beverly_hills() -> LocationRecord {
        LocationRecord {
            lat: 34.0901,
            lon: -118.4065,
            city: "Beverly Hills".to_string(),
            state: "CA".to_string(),
        }
    }

    #[tokio::test]
    async fn test_second_resolve_is_cache_hit() {
        let geocoder = CountingGeocoder::answering(Some(beverly_hills()));
        let resolver = LocationResolver::new(geocoder.clone());

        let first = resolver.resolve("90210").await;
        let second = resolver.resolve("90210").await;

        assert_eq!(first, Some(beverly_hills()));
        assert_eq!(second, first);
        assert_eq!(geocoder.calls(), 1);
    }

    #[tokio::test]
    async fn test_seeded_zip_skips_geocoder() {
        let geocoder = CountingGeocoder::answering(Some(beverly_hills()));
        let roster = crate::types::default_roster();
        let resolver = LocationResolver::seeded(geocoder.clone(), &roster);

        let record = resolver.resolve("19103").await.unwrap();
        assert_eq!(record.state, "PA");
        assert_eq!(geocoder.calls(), 0);
        assert_eq!(resolver.cached_len().await, 5);
    }

    #[tokio::test]
    async fn test_not_found_is_not_cached() {
        let geocoder = CountingGeocoder::answering(None);
        let resolver = LocationResolver::new(geocoder.clone());

        assert_eq!(resolver.resolve("00501").await, None);
        assert_eq!(resolver.resolve("00501").await, None);
        assert_eq!(geocoder.calls(), 2);
        assert_eq!(resolver.cached("00501").await, None);
    }

    #[tokio::test]
    async fn test_errors_degrade_to_not_found() {
        let geocoder = CountingGeocoder::failing();
        let resolver = LocationResolver::new(geocoder.clone());

        assert_eq!(resolver.resolve("30301").await, None);
        assert_eq!(geocoder.calls(), 1);
        assert_eq!(resolver.cached_len().await, 0);
    }

    #[tokio::test]
    async fn test_malformed_zip_never_calls_geocoder() {
        let geocoder = CountingGeocoder::answering(Some(beverly_hills()));
        let resolver = LocationResolver::new(geocoder.clone());

        assert_eq!(resolver.resolve("abc").await, None);
        assert_eq!(resolver.resolve("902101").await, None);
        assert_eq!(geocoder.calls(), 0);
    }
}
