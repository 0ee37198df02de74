//! Virtual-client worker loop
//!
//! Each worker hammers the coordinator with uniformly random keys until
//! its wall-clock budget elapses, recording failures instead of aborting
//! on them. There is no request-rate target: observed throughput is an
//! emergent property of worker count and per-call latency.

use std::sync::Arc;

use herdgate_core::coordinator::ReadThrough;
use rand::Rng;
use tokio::time::Instant;
use tracing::debug;

use crate::report::WorkerReport;

/// Stable mapping from a numeric entity id to its cache key.
pub fn key_for(id: u64) -> String {
    format!("city{id}")
}

/// Runs one virtual client until `deadline`.
///
/// A call already in progress when the deadline passes is allowed to
/// complete; the loop re-checks the clock between calls only.
pub(crate) async fn worker_loop(
    worker: usize,
    reader: Arc<ReadThrough<String, String>>,
    keyspace: u64,
    deadline: Instant,
) -> WorkerReport {
    let mut report = WorkerReport::new(worker);
    debug!(worker, "worker started");

    while Instant::now() < deadline {
        let id = rand::thread_rng().gen_range(1..=keyspace);
        report.requests += 1;
        if let Err(error) = reader.read(key_for(id)).await {
            report.errors += 1;
            report.last_error = Some(error.to_string());
        }
    }

    debug!(worker, requests = report.requests, errors = report.errors, "worker finished");
    report
}
