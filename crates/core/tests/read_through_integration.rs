//! Integration tests for the cache-aside read layer
//!
//! Exercises the coordinator, stampede guard, and stores together:
//! at-most-one-fetch under concurrency, TTL expiry with jitter, and
//! failure fan-out without negative caching.

use std::sync::Arc;
use std::time::Duration;

use herdgate_core::coordinator::{ReadThrough, TtlPolicy};
use herdgate_core::error::ReadError;
use herdgate_core::metrics::OriginCallCounter;
use herdgate_core::store::{InMemoryTtlStore, SlowTable, SlowTableConfig};
use herdgate_core::testing::MockClock;

fn reader_with_origin(
    latency: Duration,
    failure_rate: f64,
    ttl: TtlPolicy,
) -> (Arc<ReadThrough<String, String>>, Arc<OriginCallCounter>) {
    let counter = Arc::new(OriginCallCounter::new());
    let cache: InMemoryTtlStore<String, String> = InMemoryTtlStore::new();
    let origin =
        SlowTable::with_config(SlowTableConfig { latency, failure_rate }, Arc::clone(&counter));
    let reader = Arc::new(ReadThrough::new(Arc::new(cache), Arc::new(origin), ttl));
    (reader, counter)
}

/// Verifies the core stampede invariant: many concurrent cold readers of
/// one key produce exactly one origin fetch, and all observe its value.
///
/// # Test Steps
/// 1. Build a reader over a slow origin (50ms per lookup)
/// 2. Spawn 32 tasks that read the same cold key concurrently
/// 3. Verify every task received the same value
/// 4. Verify the origin was called exactly once
#[tokio::test(start_paused = true)]
async fn test_concurrent_cold_reads_hit_origin_once() {
    let (reader, counter) = reader_with_origin(
        Duration::from_millis(50),
        0.0,
        TtlPolicy::new(Duration::from_secs(60)),
    );

    let mut handles = vec![];
    for _ in 0..32 {
        let reader = Arc::clone(&reader);
        handles.push(tokio::spawn(async move { reader.read("city1".to_string()).await }));
    }

    let mut values = vec![];
    for handle in handles {
        let result = handle.await.unwrap_or(Err(ReadError::FetchAbandoned {
            key: "city1".to_string(),
        }));
        values.push(result.unwrap_or_default());
    }

    assert_eq!(counter.total(), 1, "origin must be hit exactly once for the wave");
    let first = values[0].clone();
    assert!(!first.is_empty());
    assert!(values.iter().all(|value| *value == first), "all callers share one result");

    let stats = reader.flight_stats();
    assert_eq!(stats.leads, 1);
    assert_eq!(stats.joins, 31);
}

/// Verifies that origin load tracks distinct keys, not total reads, when
/// a burst of readers fans out over a small keyspace.
///
/// # Test Steps
/// 1. Spawn 200 readers spread over 10 keys, all cold
/// 2. Verify origin calls equal the number of distinct keys
#[tokio::test(start_paused = true)]
async fn test_origin_load_tracks_distinct_keys() {
    let (reader, counter) = reader_with_origin(
        Duration::from_millis(20),
        0.0,
        TtlPolicy::new(Duration::from_secs(60)),
    );

    let mut handles = vec![];
    for i in 0..200 {
        let reader = Arc::clone(&reader);
        let key = format!("city{}", i % 10);
        handles.push(tokio::spawn(async move { reader.read(key).await }));
    }
    for handle in handles {
        assert!(handle
            .await
            .unwrap_or(Err(ReadError::FetchAbandoned { key: String::new() }))
            .is_ok());
    }

    assert_eq!(counter.total(), 10, "one origin fetch per distinct key");
}

/// Verifies failure fan-out and the no-negative-caching property through
/// the full read path.
///
/// # Test Steps
/// 1. Point the reader at an origin that always fails
/// 2. Issue 8 concurrent reads for one cold key
/// 3. Verify all callers fail, from a single origin call
/// 4. Verify a subsequent read retries the origin (second call)
#[tokio::test(start_paused = true)]
async fn test_failed_wave_drains_and_retries() {
    let (reader, counter) = reader_with_origin(
        Duration::from_millis(20),
        1.0,
        TtlPolicy::new(Duration::from_secs(60)),
    );

    let mut handles = vec![];
    for _ in 0..8 {
        let reader = Arc::clone(&reader);
        handles.push(tokio::spawn(async move { reader.read("city1".to_string()).await }));
    }
    for handle in handles {
        let result =
            handle.await.unwrap_or(Ok(String::new()));
        assert!(matches!(result, Err(ReadError::OriginUnavailable { .. })));
    }
    assert_eq!(counter.total(), 1, "one failing fetch serves the whole wave");

    // The failure was not cached: the next read goes back to the origin.
    let retry = reader.read("city1".to_string()).await;
    assert!(matches!(retry, Err(ReadError::OriginUnavailable { .. })));
    assert_eq!(counter.total(), 2);
    assert_eq!(reader.in_flight(), 0);
}

/// Verifies TTL correctness end to end with a deterministic clock: a
/// fresh entry is a hit, an expired entry triggers exactly one refetch.
///
/// # Test Steps
/// 1. Use a mock clock shared by the cache store
/// 2. Read a key (one origin call), read again (hit, still one call)
/// 3. Advance past base TTL + jitter bound
/// 4. Read again and verify exactly one new origin call
#[tokio::test(start_paused = true)]
async fn test_ttl_expiry_refetches_exactly_once() {
    let clock = MockClock::new();
    let counter = Arc::new(OriginCallCounter::new());
    let cache: InMemoryTtlStore<String, String, MockClock> =
        InMemoryTtlStore::with_clock(clock.clone());
    let origin = SlowTable::with_config(
        SlowTableConfig { latency: Duration::from_millis(5), failure_rate: 0.0 },
        Arc::clone(&counter),
    );
    let reader = ReadThrough::new(
        Arc::new(cache),
        Arc::new(origin),
        TtlPolicy::with_jitter(Duration::from_secs(10), Duration::from_secs(3)),
    );

    assert!(reader.read("city1".to_string()).await.is_ok());
    assert!(reader.read("city1".to_string()).await.is_ok());
    assert_eq!(counter.total(), 1, "fresh entry is served from cache");

    // Past base + max jitter, the entry must be gone.
    clock.advance(Duration::from_secs(14));

    assert!(reader.read("city1".to_string()).await.is_ok());
    assert_eq!(counter.total(), 2, "expired entry triggers one refetch");
}

/// Verifies that warm-up populated keys expire spread out, not in
/// lockstep: at the base TTL boundary some keys are still live, and past
/// the jitter bound all are gone.
///
/// # Test Steps
/// 1. Warm 50 keys with a jittered policy (base 10s, jitter up to 3s)
/// 2. Advance the clock to exactly the base TTL
/// 3. Verify not every key expired at once
/// 4. Advance past base + max jitter and verify all expired
#[tokio::test(start_paused = true)]
async fn test_warmed_keys_do_not_mass_expire() {
    let clock = MockClock::new();
    let counter = Arc::new(OriginCallCounter::new());
    let cache: InMemoryTtlStore<String, String, MockClock> =
        InMemoryTtlStore::with_clock(clock.clone());
    let origin = SlowTable::with_config(
        SlowTableConfig { latency: Duration::from_millis(1), failure_rate: 0.0 },
        Arc::clone(&counter),
    );
    let reader = ReadThrough::new(
        Arc::new(cache.clone()),
        Arc::new(origin),
        TtlPolicy::with_jitter(Duration::from_secs(10), Duration::from_secs(3)),
    );

    let keys: Vec<String> = (1..=50).map(|id| format!("city{id}")).collect();
    let summary = reader.warm(keys).await;
    assert_eq!(summary.populated, 50);

    clock.advance(Duration::from_secs(10));
    let expired_at_base = cache.purge_expired().await;
    assert!(expired_at_base < 50, "jitter must spread expiry past the base TTL");

    clock.advance(Duration::from_secs(4));
    cache.purge_expired().await;
    assert!(cache.is_empty().await, "all entries expire within base + max jitter");
}

/// Verifies that reads for different keys proceed independently: a slow
/// fetch for one key does not serialize a fetch for another.
///
/// # Test Steps
/// 1. Start a read for key A against a 100ms origin
/// 2. Concurrently read key B
/// 3. Verify both complete and the origin was called once per key
#[tokio::test(start_paused = true)]
async fn test_keys_do_not_block_each_other() {
    let (reader, counter) = reader_with_origin(
        Duration::from_millis(100),
        0.0,
        TtlPolicy::new(Duration::from_secs(60)),
    );

    let a = {
        let reader = Arc::clone(&reader);
        tokio::spawn(async move { reader.read("cityA".to_string()).await })
    };
    let b = {
        let reader = Arc::clone(&reader);
        tokio::spawn(async move { reader.read("cityB".to_string()).await })
    };

    let (a, b) = tokio::join!(a, b);
    assert!(a.unwrap_or(Err(ReadError::FetchAbandoned { key: String::new() })).is_ok());
    assert!(b.unwrap_or(Err(ReadError::FetchAbandoned { key: String::new() })).is_ok());
    assert_eq!(counter.total(), 2);
}
