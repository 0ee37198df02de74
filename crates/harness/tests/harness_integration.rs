//! Integration tests for the load harness
//!
//! Runs short real-time load cycles against the full read layer and
//! checks liveness, error recording, and the stampede scenario.

use std::sync::Arc;
use std::time::Duration;

use herdgate_core::coordinator::{ReadThrough, TtlPolicy};
use herdgate_core::metrics::OriginCallCounter;
use herdgate_core::store::{InMemoryTtlStore, SlowTable, SlowTableConfig};
use herdgate_harness::{HarnessConfig, LoadHarness};

fn reader(
    latency: Duration,
    failure_rate: f64,
    ttl: TtlPolicy,
) -> (Arc<ReadThrough<String, String>>, Arc<OriginCallCounter>) {
    let counter = Arc::new(OriginCallCounter::new());
    let cache: InMemoryTtlStore<String, String> = InMemoryTtlStore::new();
    let origin =
        SlowTable::with_config(SlowTableConfig { latency, failure_rate }, Arc::clone(&counter));
    (Arc::new(ReadThrough::new(Arc::new(cache), Arc::new(origin), ttl)), counter)
}

/// Verifies harness liveness: a short run with 8 workers terminates
/// within the duration plus a bounded grace period and yields exactly one
/// report per worker.
///
/// # Test Steps
/// 1. Run 8 workers for 200ms against a 5ms origin
/// 2. Verify 8 worker reports, each with at least one request
/// 3. Verify the run drained within duration + grace
#[tokio::test(flavor = "multi_thread")]
async fn test_run_terminates_with_one_report_per_worker() -> Result<(), herdgate_harness::ConfigError>
{
    let (reader, _) = reader(
        Duration::from_millis(5),
        0.0,
        TtlPolicy::new(Duration::from_secs(60)),
    );

    let config = HarnessConfig::builder()
        .workers(8)
        .duration(Duration::from_millis(200))
        .keyspace(50)
        .build();
    let harness = LoadHarness::new(config)?;

    let report = harness.run(reader).await;

    assert_eq!(report.workers.len(), 8);
    for (index, worker) in report.workers.iter().enumerate() {
        assert_eq!(worker.worker, index);
        assert!(worker.requests >= 1, "worker {index} issued no requests");
    }
    assert!(
        report.elapsed < Duration::from_millis(200) + Duration::from_secs(2),
        "run must drain within the grace period, took {:?}",
        report.elapsed
    );
    Ok(())
}

/// Verifies eager rejection of misconfiguration: zero workers, zero
/// duration, and zero keyspace each fail before any work starts.
#[test]
fn test_misconfiguration_is_rejected_eagerly() {
    assert!(LoadHarness::new(HarnessConfig::builder().workers(0).build()).is_err());
    assert!(LoadHarness::new(HarnessConfig::builder().duration(Duration::ZERO).build()).is_err());
    assert!(LoadHarness::new(HarnessConfig::builder().keyspace(0).build()).is_err());
}

/// Verifies that per-call failures are recorded without aborting any
/// worker: against an always-failing origin, every worker keeps issuing
/// reads until its deadline and reports its errors.
///
/// # Test Steps
/// 1. Run 4 workers for 150ms against an origin with failure rate 1.0
/// 2. Verify the run completes with all 4 reports
/// 3. Verify every request failed and the last error was captured
#[tokio::test(flavor = "multi_thread")]
async fn test_worker_records_failures_without_aborting(
) -> Result<(), herdgate_harness::ConfigError> {
    let (reader, _) = reader(
        Duration::from_millis(2),
        1.0,
        TtlPolicy::new(Duration::from_secs(60)),
    );

    let config = HarnessConfig::builder()
        .workers(4)
        .duration(Duration::from_millis(150))
        .keyspace(10)
        .build();
    let harness = LoadHarness::new(config)?;

    let report = harness.run(reader).await;

    assert_eq!(report.workers.len(), 4);
    assert!(report.total_requests() > 0);
    assert_eq!(report.total_errors(), report.total_requests());
    assert!((report.error_rate() - 1.0).abs() < 1e-10);
    for worker in &report.workers {
        assert!(worker.requests > 1, "a failing origin must not stop the worker loop");
        assert!(worker.last_error.is_some());
    }
    Ok(())
}

/// Verifies the stampede scenario end to end: with protection in place,
/// origin calls are bounded by the keyspace touched, far below total
/// reads issued.
///
/// # Test Steps
/// 1. Run 16 workers for 300ms over a 10-key space, TTL far beyond the
///    run, 20ms origin latency
/// 2. Verify total reads far exceed the keyspace
/// 3. Verify origin calls never exceed the keyspace
#[tokio::test(flavor = "multi_thread")]
async fn test_origin_load_stays_bounded_under_pressure(
) -> Result<(), herdgate_harness::ConfigError> {
    let (reader, counter) = reader(
        Duration::from_millis(20),
        0.0,
        TtlPolicy::new(Duration::from_secs(60)),
    );

    let config = HarnessConfig::builder()
        .workers(16)
        .duration(Duration::from_millis(300))
        .keyspace(10)
        .build();
    let harness = LoadHarness::new(config)?;

    let report = harness.run(Arc::clone(&reader)).await;

    let origin_calls = counter.total();
    assert!(origin_calls <= 10, "origin calls ({origin_calls}) must be bounded by the keyspace");
    assert!(
        report.total_requests() > origin_calls,
        "reads issued ({}) should exceed origin calls ({origin_calls})",
        report.total_requests()
    );
    let flights = reader.flight_stats();
    assert!(flights.leads <= 10);
    Ok(())
}
