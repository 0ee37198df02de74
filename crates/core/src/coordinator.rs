//! Cache-aside coordinator
//!
//! [`ReadThrough`] implements the read path a caller uses against an
//! opaque cache store plus an opaque origin: check the cache, collapse
//! concurrent misses through the stampede guard, fetch from the origin,
//! populate the cache with a jittered TTL, return the value.
//!
//! Keys populated in the same burst must not expire in lockstep:
//! synchronized TTLs turn into synchronized mass-expiry, which without
//! the guard multiplies into synchronized origin storms. [`TtlPolicy`]
//! draws an independent random offset for every population event.

use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{debug, info, warn};

use crate::error::{CacheStoreError, OriginError, ReadError};
use crate::singleflight::{FlightError, FlightGroup, FlightStats};
use crate::store::{CacheStore, OriginStore};

/// TTL selection for cache population.
///
/// The effective TTL for each population event is `base + jitter`, with
/// the jitter drawn uniformly from `[0, max_jitter]` per event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    base: Duration,
    max_jitter: Duration,
}

impl TtlPolicy {
    /// Policy with the conventional jitter bound of a third of the base.
    pub fn new(base: Duration) -> Self {
        Self { base, max_jitter: base / 3 }
    }

    /// Policy with an explicit jitter bound.
    pub const fn with_jitter(base: Duration, max_jitter: Duration) -> Self {
        Self { base, max_jitter }
    }

    /// Policy without jitter. Every population event gets exactly `base`.
    pub const fn fixed(base: Duration) -> Self {
        Self { base, max_jitter: Duration::ZERO }
    }

    /// The base TTL.
    pub const fn base(&self) -> Duration {
        self.base
    }

    /// The upper jitter bound.
    pub const fn max_jitter(&self) -> Duration {
        self.max_jitter
    }

    /// Draws the TTL for one population event.
    pub fn effective_ttl(&self) -> Duration {
        if self.max_jitter.is_zero() {
            return self.base;
        }
        let max_ms = u64::try_from(self.max_jitter.as_millis()).unwrap_or(u64::MAX);
        let jitter_ms = rand::thread_rng().gen_range(0..=max_ms);
        self.base + Duration::from_millis(jitter_ms)
    }
}

/// Outcome of a bulk warm-up pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WarmSummary {
    /// Keys successfully fetched and written to the cache.
    pub populated: usize,

    /// Keys skipped because the origin fetch or cache write failed.
    pub failed: usize,
}

/// Cache-aside read coordinator with stampede protection.
///
/// Reads check the cache first; misses are collapsed per key through a
/// [`FlightGroup`] so at most one origin fetch per key is in flight at
/// any instant, system-wide. The winning fetch populates the cache with
/// a jittered TTL; failures propagate to every caller of the wave and
/// are never cached.
///
/// An unavailable cache store degrades reads into misses instead of
/// failing them: availability is prioritized over hit rate.
pub struct ReadThrough<K, V>
where
    K: Eq + Hash + Clone + Display + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    cache: Arc<dyn CacheStore<K, V>>,
    origin: Arc<dyn OriginStore<K, V>>,
    flights: FlightGroup<K, V, OriginError>,
    ttl: TtlPolicy,
}

impl<K, V> ReadThrough<K, V>
where
    K: Eq + Hash + Clone + Display + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a coordinator over the given collaborators.
    pub fn new(
        cache: Arc<dyn CacheStore<K, V>>,
        origin: Arc<dyn OriginStore<K, V>>,
        ttl: TtlPolicy,
    ) -> Self {
        Self { cache, origin, flights: FlightGroup::new(), ttl }
    }

    /// Reads a value, cache-aside.
    ///
    /// Fast path: a live cache entry is returned without contacting the
    /// origin. On miss (or cache outage), the read goes through the
    /// stampede guard; the leader of the wave loads from the origin and
    /// populates the cache once with `base + jitter`. Origin failures
    /// propagate and are not cached.
    pub async fn read(&self, key: K) -> Result<V, ReadError> {
        match self.cache.get(&key).await {
            Ok(Some(value)) => {
                debug!(%key, "cache hit");
                return Ok(value);
            }
            Ok(None) => debug!(%key, "cache miss"),
            Err(error) => {
                warn!(%key, %error, "cache store unavailable, treating read as a miss");
            }
        }

        let cache = Arc::clone(&self.cache);
        let origin = Arc::clone(&self.origin);
        let ttl_policy = self.ttl;
        let loader_key = key.clone();

        let outcome = self
            .flights
            .fetch_once(key.clone(), move || async move {
                let value = origin.load(&loader_key).await?;
                let ttl = ttl_policy.effective_ttl();
                match cache.set(&loader_key, value.clone(), ttl).await {
                    Ok(()) => debug!(key = %loader_key, ttl_ms = ttl.as_millis() as u64, "cache populated"),
                    Err(error) => {
                        warn!(key = %loader_key, %error, "cache population failed after origin fetch");
                    }
                }
                Ok(value)
            })
            .await;

        match outcome {
            Ok(value) => Ok(value),
            Err(FlightError::Loader(source)) => {
                Err(ReadError::OriginUnavailable { key: key.to_string(), source })
            }
            Err(FlightError::Abandoned) => Err(ReadError::FetchAbandoned { key: key.to_string() }),
        }
    }

    /// Removes a key from the cache store.
    pub async fn invalidate(&self, key: &K) -> Result<bool, CacheStoreError> {
        self.cache.delete(key).await
    }

    /// Bulk warm-up: fetches every key from the origin and populates the
    /// cache, drawing an independent jittered TTL per key so the warmed
    /// set does not mass-expire.
    ///
    /// Best-effort: per-key failures are logged and counted, never fatal.
    pub async fn warm<I>(&self, keys: I) -> WarmSummary
    where
        I: IntoIterator<Item = K>,
    {
        let mut summary = WarmSummary::default();

        for key in keys {
            match self.origin.load(&key).await {
                Ok(value) => {
                    let ttl = self.ttl.effective_ttl();
                    match self.cache.set(&key, value, ttl).await {
                        Ok(()) => summary.populated += 1,
                        Err(error) => {
                            warn!(%key, %error, "warm-up cache write failed");
                            summary.failed += 1;
                        }
                    }
                }
                Err(error) => {
                    warn!(%key, %error, "warm-up origin fetch failed");
                    summary.failed += 1;
                }
            }
        }

        info!(populated = summary.populated, failed = summary.failed, "cache warm-up finished");
        summary
    }

    /// The TTL policy in effect.
    pub const fn ttl_policy(&self) -> TtlPolicy {
        self.ttl
    }

    /// Snapshot of stampede-guard activity.
    pub fn flight_stats(&self) -> FlightStats {
        self.flights.stats()
    }

    /// Number of origin fetches currently in flight.
    pub fn in_flight(&self) -> usize {
        self.flights.in_flight()
    }
}
