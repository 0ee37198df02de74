//! Store statistics and metrics tracking
//!
//! Atomic counters for cache store activity, used to observe hit rates
//! and expiry churn without locks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Snapshot of cache store activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Current number of live entries.
    pub size: usize,

    /// Total number of successful get operations.
    pub hits: u64,

    /// Total number of failed get operations (absent or expired).
    pub misses: u64,

    /// Total number of set operations.
    pub inserts: u64,

    /// Total number of entries removed because their TTL elapsed.
    pub expirations: u64,
}

impl StoreStats {
    /// Hit rate over all accesses, in `[0, 1]`.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Total number of access operations (hits + misses).
    pub fn total_accesses(&self) -> u64 {
        self.hits + self.misses
    }
}

/// Thread-safe collector behind [`StoreStats`].
///
/// Clones share the same counters.
#[derive(Debug)]
pub(crate) struct StatsCollector {
    hits: Arc<AtomicU64>,
    misses: Arc<AtomicU64>,
    inserts: Arc<AtomicU64>,
    expirations: Arc<AtomicU64>,
}

impl Clone for StatsCollector {
    fn clone(&self) -> Self {
        Self {
            hits: Arc::clone(&self.hits),
            misses: Arc::clone(&self.misses),
            inserts: Arc::clone(&self.inserts),
            expirations: Arc::clone(&self.expirations),
        }
    }
}

impl StatsCollector {
    pub(crate) fn new() -> Self {
        Self {
            hits: Arc::new(AtomicU64::new(0)),
            misses: Arc::new(AtomicU64::new(0)),
            inserts: Arc::new(AtomicU64::new(0)),
            expirations: Arc::new(AtomicU64::new(0)),
        }
    }

    pub(crate) fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_insert(&self) {
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_expiration(&self) {
        self.expirations.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, size: usize) -> StoreStats {
        StoreStats {
            size,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for store::stats.
    use super::*;

    /// Validates `StoreStats::hit_rate` behavior for the mixed access
    /// scenario.
    ///
    /// Assertions:
    /// - Ensures `(stats.hit_rate() - 0.8).abs() < 1e-10` evaluates to true.
    /// - Confirms `stats.total_accesses()` equals `100`.
    #[test]
    fn test_hit_rate_calculation() {
        let stats = StoreStats { hits: 80, misses: 20, ..Default::default() };

        assert!((stats.hit_rate() - 0.8).abs() < 1e-10);
        assert_eq!(stats.total_accesses(), 100);
    }

    /// Validates `StoreStats::hit_rate` behavior for the no accesses
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms `stats.hit_rate()` equals `0.0`.
    #[test]
    fn test_hit_rate_no_accesses() {
        let stats = StoreStats::default();
        assert_eq!(stats.hit_rate(), 0.0);
    }

    /// Validates `StatsCollector` behavior for the record and snapshot
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms each recorded operation appears in the snapshot.
    /// - Confirms `stats.size` equals the supplied size.
    #[test]
    fn test_collector_records_operations() {
        let collector = StatsCollector::new();

        collector.record_hit();
        collector.record_miss();
        collector.record_insert();
        collector.record_expiration();

        let stats = collector.snapshot(3);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.inserts, 1);
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.size, 3);
    }

    /// Validates `StatsCollector::clone` behavior for the shared counters
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms both clones observe the combined hit count.
    #[test]
    fn test_collector_clones_share_counters() {
        let collector = StatsCollector::new();
        collector.record_hit();

        let clone = collector.clone();
        clone.record_hit();

        assert_eq!(collector.snapshot(0).hits, 2);
        assert_eq!(clone.snapshot(0).hits, 2);
    }
}
