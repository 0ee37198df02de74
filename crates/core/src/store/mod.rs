//! Store adapters for the cache-aside read layer
//!
//! Two collaborator seams, specified as async traits:
//!
//! - [`CacheStore`]: a TTL-capable key-value cache. Expiry is honored
//!   store-side, so an expired entry is indistinguishable from a miss.
//! - [`OriginStore`]: the slow backing source of truth.
//!
//! Both are assumed safe for concurrent access from many callers. The
//! crate ships an in-memory TTL store ([`InMemoryTtlStore`]) and a
//! simulated slow origin ([`SlowTable`]) so the read layer can be
//! exercised without external services.

mod memory;
mod origin;
mod stats;

use std::time::Duration;

use async_trait::async_trait;

pub use memory::InMemoryTtlStore;
pub use origin::{SlowTable, SlowTableConfig};
pub use stats::StoreStats;

use crate::error::{CacheStoreError, OriginError};

/// A TTL-capable key-value cache, accessed cache-aside.
///
/// The coordinator owns population and invalidation; the store owns
/// expiry. Implementations must treat an expired entry exactly like an
/// absent one.
#[async_trait]
pub trait CacheStore<K, V>: Send + Sync
where
    K: Send + Sync,
    V: Send + Sync,
{
    /// Look up a key. `Ok(None)` covers both "never written" and
    /// "written but expired".
    async fn get(&self, key: &K) -> Result<Option<V>, CacheStoreError>;

    /// Write a value with the effective TTL chosen by the caller.
    async fn set(&self, key: &K, value: V, ttl: Duration) -> Result<(), CacheStoreError>;

    /// Remove a key. Returns whether a live entry was present.
    async fn delete(&self, key: &K) -> Result<bool, CacheStoreError>;
}

/// The slow backing source of truth behind the cache.
///
/// May take non-trivial time per lookup. Implementations are expected to
/// eventually return or fail; the stampede guard does not impose a
/// timeout on top (layer `tokio::time::timeout` around the adapter if
/// one is needed).
#[async_trait]
pub trait OriginStore<K, V>: Send + Sync
where
    K: Send + Sync,
    V: Send + Sync,
{
    /// Fetch the authoritative value for a key.
    async fn load(&self, key: &K) -> Result<V, OriginError>;
}
