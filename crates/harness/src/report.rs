//! Run reporting
//!
//! One [`WorkerReport`] per virtual client, aggregated into a
//! [`HarnessReport`] when the run drains.

use std::time::Duration;

/// Per-worker record of a load run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerReport {
    /// Worker index within the run.
    pub worker: usize,

    /// Reads issued before the deadline.
    pub requests: u64,

    /// Reads that returned an error. Individual failures never abort the
    /// worker.
    pub errors: u64,

    /// The most recent error observed, if any.
    pub last_error: Option<String>,
}

impl WorkerReport {
    /// Creates an empty report for a worker.
    pub fn new(worker: usize) -> Self {
        Self { worker, ..Self::default() }
    }
}

/// Aggregated outcome of a load run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HarnessReport {
    /// One report per worker, in spawn order.
    pub workers: Vec<WorkerReport>,

    /// Wall time from first spawn to last drain.
    pub elapsed: Duration,
}

impl HarnessReport {
    /// Total reads issued across all workers.
    pub fn total_requests(&self) -> u64 {
        self.workers.iter().map(|worker| worker.requests).sum()
    }

    /// Total failed reads across all workers.
    pub fn total_errors(&self) -> u64 {
        self.workers.iter().map(|worker| worker.errors).sum()
    }

    /// Fraction of reads that failed, in `[0, 1]`.
    pub fn error_rate(&self) -> f64 {
        let requests = self.total_requests();
        if requests == 0 {
            0.0
        } else {
            self.total_errors() as f64 / requests as f64
        }
    }
}
