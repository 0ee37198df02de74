//! Load-generation harness for the herdgate read layer.
//!
//! Drives many concurrent virtual clients against a
//! [`ReadThrough`](herdgate_core::coordinator::ReadThrough) coordinator
//! for a bounded duration, collecting per-worker completion and error
//! status. Used to observe whether stampede protection keeps origin load
//! bounded as read concurrency grows.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use herdgate_core::coordinator::{ReadThrough, TtlPolicy};
//! use herdgate_core::metrics::OriginCallCounter;
//! use herdgate_core::store::{InMemoryTtlStore, SlowTable, SlowTableConfig};
//! use herdgate_harness::{HarnessConfig, LoadHarness};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), herdgate_harness::ConfigError> {
//!     let counter = Arc::new(OriginCallCounter::new());
//!     let cache: InMemoryTtlStore<String, String> = InMemoryTtlStore::new();
//!     let origin = SlowTable::with_config(
//!         SlowTableConfig { latency: Duration::from_millis(1), failure_rate: 0.0 },
//!         Arc::clone(&counter),
//!     );
//!     let reader = Arc::new(ReadThrough::new(
//!         Arc::new(cache),
//!         Arc::new(origin),
//!         TtlPolicy::new(Duration::from_secs(10)),
//!     ));
//!
//!     let config = HarnessConfig::builder()
//!         .workers(2)
//!         .duration(Duration::from_millis(50))
//!         .keyspace(10)
//!         .build();
//!     let harness = LoadHarness::new(config)?;
//!     let report = harness.run(reader).await;
//!     assert_eq!(report.workers.len(), 2);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

mod config;
mod report;
mod worker;

use std::sync::Arc;

use herdgate_core::coordinator::ReadThrough;
use tokio::time::Instant;
use tracing::{info, warn};

pub use config::{ConfigError, HarnessConfig, HarnessConfigBuilder};
pub use report::{HarnessReport, WorkerReport};
pub use worker::key_for;

/// Bounded-duration load generator.
///
/// Spawns a fixed pool of workers and lets each self-terminate on its
/// wall-clock deadline. Nothing is forcibly cancelled: the run drains by
/// awaiting every worker, so a call in flight at the deadline adds
/// bounded extra latency, never an abort.
#[derive(Debug)]
pub struct LoadHarness {
    config: HarnessConfig,
}

impl LoadHarness {
    /// Creates a harness, rejecting misconfiguration before any work
    /// starts.
    pub fn new(config: HarnessConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// The validated configuration.
    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Runs the full load generation cycle and aggregates the outcome.
    ///
    /// Worker failures (including a panicked worker task) are recorded in
    /// that worker's report; they never abort the run.
    pub async fn run(&self, reader: Arc<ReadThrough<String, String>>) -> HarnessReport {
        let started = Instant::now();
        let deadline = started + self.config.duration;
        info!(
            workers = self.config.workers,
            duration_ms = self.config.duration.as_millis() as u64,
            keyspace = self.config.keyspace,
            "load run starting"
        );

        let mut handles = Vec::with_capacity(self.config.workers);
        for worker in 0..self.config.workers {
            let reader = Arc::clone(&reader);
            let keyspace = self.config.keyspace;
            handles.push(tokio::spawn(worker::worker_loop(worker, reader, keyspace, deadline)));
        }

        let mut workers = Vec::with_capacity(handles.len());
        for (worker, handle) in handles.into_iter().enumerate() {
            match handle.await {
                Ok(report) => workers.push(report),
                Err(error) => {
                    warn!(worker, %error, "worker task did not complete");
                    let mut report = WorkerReport::new(worker);
                    report.errors = 1;
                    report.last_error = Some(error.to_string());
                    workers.push(report);
                }
            }
        }

        let report = HarnessReport { workers, elapsed: started.elapsed() };
        info!(
            total_requests = report.total_requests(),
            total_errors = report.total_errors(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "load run complete"
        );
        report
    }
}
