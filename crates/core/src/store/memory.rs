//! In-memory TTL store
//!
//! A [`CacheStore`] backed by a `tokio::sync::RwLock<HashMap>` with a
//! per-entry expiry deadline chosen at write time. Expired entries are
//! removed lazily when read and eagerly by [`InMemoryTtlStore::purge_expired`].
//!
//! The store stands in for an external TTL-capable cache service in tests
//! and the load harness; a fault toggle lets callers simulate that
//! service becoming unreachable.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::stats::{StatsCollector, StoreStats};
use super::CacheStore;
use crate::error::CacheStoreError;
use crate::testing::{Clock, SystemClock};

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// In-memory key-value store honoring a per-entry TTL.
///
/// Cheap to clone; clones share the same storage, stats, and fault
/// toggle.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use herdgate_core::store::{CacheStore, InMemoryTtlStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), herdgate_core::error::CacheStoreError> {
///     let store: InMemoryTtlStore<String, String> = InMemoryTtlStore::new();
///     store.set(&"city1".to_string(), "data".to_string(), Duration::from_secs(10)).await?;
///     assert!(store.get(&"city1".to_string()).await?.is_some());
///     Ok(())
/// }
/// ```
pub struct InMemoryTtlStore<K, V, C = SystemClock>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock + Clone,
{
    storage: Arc<RwLock<HashMap<K, Entry<V>>>>,
    stats: StatsCollector,
    unavailable: Arc<AtomicBool>,
    clock: C,
}

impl<K, V> InMemoryTtlStore<K, V, SystemClock>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates a new store using the system clock.
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl<K, V> Default for InMemoryTtlStore<K, V, SystemClock>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, C> InMemoryTtlStore<K, V, C>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock + Clone,
{
    /// Creates a new store with the given clock.
    pub fn with_clock(clock: C) -> Self {
        Self {
            storage: Arc::new(RwLock::new(HashMap::new())),
            stats: StatsCollector::new(),
            unavailable: Arc::new(AtomicBool::new(false)),
            clock,
        }
    }

    /// Simulates the backing service going down (or recovering).
    ///
    /// While unavailable, every operation fails with
    /// [`CacheStoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Returns the current number of entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.storage.read().await.len()
    }

    /// Returns `true` if the store holds no entries.
    pub async fn is_empty(&self) -> bool {
        self.storage.read().await.is_empty()
    }

    /// Removes all expired entries and returns how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut storage = self.storage.write().await;

        let expired: Vec<K> = storage
            .iter()
            .filter(|(_, entry)| entry.expires_at <= now)
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired {
            storage.remove(key);
            self.stats.record_expiration();
        }

        expired.len()
    }

    /// Returns a snapshot of store activity.
    ///
    /// Uses a non-blocking read for the size; if the lock is held the
    /// size is reported as 0 in the snapshot.
    pub fn stats(&self) -> StoreStats {
        let size = self.storage.try_read().map(|s| s.len()).unwrap_or(0);
        self.stats.snapshot(size)
    }

    fn check_available(&self) -> Result<(), CacheStoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(CacheStoreError::unavailable("simulated outage"))
        } else {
            Ok(())
        }
    }
}

impl<K, V, C> Clone for InMemoryTtlStore<K, V, C>
where
    K: Eq + Hash + Clone,
    V: Clone,
    C: Clock + Clone,
{
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
            stats: self.stats.clone(),
            unavailable: Arc::clone(&self.unavailable),
            clock: self.clock.clone(),
        }
    }
}

#[async_trait]
impl<K, V, C> CacheStore<K, V> for InMemoryTtlStore<K, V, C>
where
    K: Eq + Hash + Clone + Send + Sync,
    V: Clone + Send + Sync,
    C: Clock + Clone,
{
    async fn get(&self, key: &K) -> Result<Option<V>, CacheStoreError> {
        self.check_available()?;

        // Fast path under the read lock; expired entries need the write
        // lock for removal.
        {
            let storage = self.storage.read().await;
            match storage.get(key) {
                Some(entry) if entry.expires_at > self.clock.now() => {
                    self.stats.record_hit();
                    return Ok(Some(entry.value.clone()));
                }
                Some(_) => {}
                None => {
                    self.stats.record_miss();
                    return Ok(None);
                }
            }
        }

        let mut storage = self.storage.write().await;
        // Re-check: another writer may have refreshed the entry.
        match storage.get(key) {
            Some(entry) if entry.expires_at > self.clock.now() => {
                self.stats.record_hit();
                Ok(Some(entry.value.clone()))
            }
            Some(_) => {
                storage.remove(key);
                self.stats.record_expiration();
                self.stats.record_miss();
                Ok(None)
            }
            None => {
                self.stats.record_miss();
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &K, value: V, ttl: Duration) -> Result<(), CacheStoreError> {
        self.check_available()?;

        let expires_at = self.clock.now() + ttl;
        let mut storage = self.storage.write().await;
        storage.insert(key.clone(), Entry { value, expires_at });
        self.stats.record_insert();
        Ok(())
    }

    async fn delete(&self, key: &K) -> Result<bool, CacheStoreError> {
        self.check_available()?;

        let now = self.clock.now();
        let mut storage = self.storage.write().await;
        Ok(storage.remove(key).is_some_and(|entry| entry.expires_at > now))
    }
}
