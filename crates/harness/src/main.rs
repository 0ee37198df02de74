//! loadgen - drive synthetic read pressure at the herdgate read layer
//!
//! Wires an in-memory TTL store, a simulated slow origin, the cache-aside
//! coordinator, and the QPS metronome, then runs the configured number of
//! workers for the configured duration. Watch the `herdgate::qps` log
//! target: with stampede protection in place, origin QPS stays near the
//! distinct-key expiry rate instead of tracking total read volume.
//!
//! Configuration comes from the environment (a `.env` file is honored):
//! `HERDGATE_WORKERS`, `HERDGATE_DURATION_SECS`, `HERDGATE_KEYSPACE`,
//! `HERDGATE_PREWARM`, `HERDGATE_ORIGIN_LATENCY_MS`,
//! `HERDGATE_BASE_TTL_SECS`.

use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use herdgate_core::coordinator::{ReadThrough, TtlPolicy};
use herdgate_core::metrics::{OriginCallCounter, QpsMonitor};
use herdgate_core::store::{InMemoryTtlStore, SlowTable, SlowTableConfig};
use herdgate_harness::{key_for, HarnessConfig, LoadHarness};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn env_or<T>(name: &str, default: T) -> T
where
    T: FromStr + Display + Copy,
    T::Err: Display,
{
    match std::env::var(name) {
        Ok(raw) => match raw.parse() {
            Ok(value) => value,
            Err(error) => {
                warn!(%name, %raw, %error, default = %default, "ignoring unparseable variable");
                default
            }
        },
        Err(_) => default,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging first so .env loading is visible.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match dotenvy::dotenv() {
        Ok(path) => info!(?path, "loaded .env"),
        Err(error) => info!(%error, "no .env file loaded"),
    }

    let config = HarnessConfig::builder()
        .workers(env_or("HERDGATE_WORKERS", 8usize))
        .duration(Duration::from_secs(env_or("HERDGATE_DURATION_SECS", 30u64)))
        .keyspace(env_or("HERDGATE_KEYSPACE", 1000u64))
        .prewarm(env_or("HERDGATE_PREWARM", false))
        .build();
    let harness = LoadHarness::new(config).context("harness configuration rejected")?;

    let origin_latency = Duration::from_millis(env_or("HERDGATE_ORIGIN_LATENCY_MS", 50u64));
    let base_ttl = Duration::from_secs(env_or("HERDGATE_BASE_TTL_SECS", 10u64));

    let counter = Arc::new(OriginCallCounter::new());
    let cache: InMemoryTtlStore<String, String> = InMemoryTtlStore::new();
    let origin = SlowTable::with_config(
        SlowTableConfig { latency: origin_latency, failure_rate: 0.0 },
        Arc::clone(&counter),
    );
    let reader = Arc::new(ReadThrough::new(
        Arc::new(cache),
        Arc::new(origin),
        TtlPolicy::new(base_ttl),
    ));

    let monitor = QpsMonitor::spawn(Arc::clone(&counter), Duration::from_secs(1));

    if harness.config().prewarm {
        let keyspace = harness.config().keyspace;
        let summary = reader.warm((1..=keyspace).map(key_for)).await;
        info!(populated = summary.populated, failed = summary.failed, "pre-warm complete");
    }

    let report = harness.run(Arc::clone(&reader)).await;

    for worker in &report.workers {
        info!(
            worker = worker.worker,
            requests = worker.requests,
            errors = worker.errors,
            last_error = worker.last_error.as_deref().unwrap_or("-"),
            "worker report"
        );
    }
    let flights = reader.flight_stats();
    info!(
        total_requests = report.total_requests(),
        total_errors = report.total_errors(),
        origin_calls = counter.total(),
        dedup_joins = flights.joins,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "run summary"
    );

    monitor.shutdown().await;
    Ok(())
}
