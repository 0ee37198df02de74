//! Origin-call accounting and the QPS metronome
//!
//! The origin-call counter is the sole observability signal used to judge
//! whether stampede protection works: with protection on, origin calls
//! stay bounded as read concurrency grows; without it they scale with
//! read volume.
//!
//! [`QpsMonitor`] reports the per-interval rate in the background,
//! independently of request traffic, and is explicitly cancellable.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Process-wide counter of origin lookups.
///
/// Incremented lock-free by every origin call; read-and-reset by the
/// metronome once per reporting interval. A separate cumulative total is
/// kept for whole-run assertions.
#[derive(Debug, Default)]
pub struct OriginCallCounter {
    interval: AtomicU64,
    total: AtomicU64,
}

impl OriginCallCounter {
    /// Creates a counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one origin lookup.
    pub fn increment(&self) {
        self.interval.fetch_add(1, Ordering::Relaxed);
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    /// Atomically reads and resets the current interval count.
    pub fn take(&self) -> u64 {
        self.interval.swap(0, Ordering::Relaxed)
    }

    /// Cumulative origin lookups since process start. Never reset.
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }
}

/// One reading published by the metronome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QpsSample {
    /// Reporting interval sequence number, starting at 1.
    pub tick: u64,

    /// Origin calls observed during this interval.
    pub calls: u64,

    /// Cumulative origin calls at the time of the reading.
    pub cumulative: u64,
}

/// Periodic reporter of origin-call rate.
///
/// Spawns a background task that read-and-resets the counter every
/// period, logs the rate, and publishes a [`QpsSample`] for observers.
/// Lifecycle spans the process by default but is explicitly cancellable
/// via [`QpsMonitor::shutdown`].
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// use herdgate_core::metrics::{OriginCallCounter, QpsMonitor};
///
/// #[tokio::main]
/// async fn main() {
///     let counter = Arc::new(OriginCallCounter::new());
///     let monitor = QpsMonitor::spawn(Arc::clone(&counter), Duration::from_secs(1));
///     counter.increment();
///     monitor.shutdown().await;
/// }
/// ```
#[derive(Debug)]
pub struct QpsMonitor {
    cancel: CancellationToken,
    task: JoinHandle<()>,
    samples: watch::Receiver<QpsSample>,
}

impl QpsMonitor {
    /// Starts the metronome on the given counter and reporting period.
    pub fn spawn(counter: Arc<OriginCallCounter>, period: Duration) -> Self {
        let cancel = CancellationToken::new();
        let (sample_tx, sample_rx) = watch::channel(QpsSample::default());
        let token = cancel.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first interval tick completes immediately; skip it so
            // every published sample covers a full period.
            ticker.tick().await;

            let mut tick = 0u64;
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {
                        tick += 1;
                        let calls = counter.take();
                        let cumulative = counter.total();
                        info!(target: "herdgate::qps", tick, calls, cumulative, "origin QPS");
                        let _ = sample_tx.send(QpsSample { tick, calls, cumulative });
                    }
                }
            }
        });

        Self { cancel, task, samples: sample_rx }
    }

    /// The most recently published sample.
    pub fn latest(&self) -> QpsSample {
        self.samples.borrow().clone()
    }

    /// A receiver that observes every future sample.
    pub fn subscribe(&self) -> watch::Receiver<QpsSample> {
        self.samples.clone()
    }

    /// Stops the metronome and waits for its task to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }
}
