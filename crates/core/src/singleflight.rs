//! Stampede guard: per-key deduplication of concurrent fetches
//!
//! [`FlightGroup::fetch_once`] guarantees at most one concurrent
//! execution of a loader per key across all callers. The first caller to
//! miss becomes the leader and runs the loader; every concurrent caller
//! for the same key joins the existing in-flight fetch and observes the
//! leader's result, success or failure alike.
//!
//! The check-or-create step is a single atomic insert-if-absent on the
//! in-flight map. Checking and inserting as two separate steps is the
//! canonical race that lets two callers both conclude "no fetch exists"
//! and both hit the origin; this module exists to make that impossible.
//!
//! Failures are published to the current wave of waiters and then
//! forgotten: the in-flight token is removed before the result goes out,
//! so the next caller starts a fresh fetch.

use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;
use tokio::sync::watch;
use tracing::debug;

type Published<V, E> = Option<Result<V, E>>;

/// Failure modes of a deduplicated fetch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FlightError<E>
where
    E: std::error::Error,
{
    /// The loader itself failed; every caller of the wave receives the
    /// same error.
    #[error(transparent)]
    Loader(E),

    /// The leader went away (was cancelled) before publishing a result.
    /// The token is gone, so retrying starts a fresh fetch.
    #[error("in-flight fetch abandoned before a result was published")]
    Abandoned,
}

/// Snapshot of deduplication activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlightStats {
    /// Fetches that ran a loader (one per wave).
    pub leads: u64,

    /// Callers that joined an existing in-flight fetch instead of
    /// loading themselves.
    pub joins: u64,

    /// Loader executions that ended in failure.
    pub failures: u64,
}

#[derive(Debug)]
struct FlightStatsCollector {
    leads: Arc<AtomicU64>,
    joins: Arc<AtomicU64>,
    failures: Arc<AtomicU64>,
}

impl FlightStatsCollector {
    fn new() -> Self {
        Self {
            leads: Arc::new(AtomicU64::new(0)),
            joins: Arc::new(AtomicU64::new(0)),
            failures: Arc::new(AtomicU64::new(0)),
        }
    }

    fn record_lead(&self) {
        self.leads.fetch_add(1, Ordering::Relaxed);
    }

    fn record_join(&self) {
        self.joins.fetch_add(1, Ordering::Relaxed);
    }

    fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> FlightStats {
        FlightStats {
            leads: self.leads.load(Ordering::Relaxed),
            joins: self.joins.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

/// Per-key singleflight group.
///
/// Maintains a map from key to the in-flight fetch for that key. Reads
/// for different keys never block each other; concurrent reads for the
/// same key collapse into one loader execution.
///
/// # Examples
///
/// ```
/// use herdgate_core::error::OriginError;
/// use herdgate_core::singleflight::FlightGroup;
///
/// #[tokio::main]
/// async fn main() {
///     let group: FlightGroup<String, String, OriginError> = FlightGroup::new();
///     let value = group
///         .fetch_once("city1".to_string(), || async { Ok("data".to_string()) })
///         .await;
///     assert_eq!(value.as_deref(), Ok("data"));
/// }
/// ```
#[derive(Debug)]
pub struct FlightGroup<K, V, E>
where
    K: Eq + Hash + Clone,
{
    in_flight: DashMap<K, watch::Receiver<Published<V, E>>>,
    stats: FlightStatsCollector,
}

impl<K, V, E> Default for FlightGroup<K, V, E>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, E> FlightGroup<K, V, E>
where
    K: Eq + Hash + Clone,
{
    /// Creates an empty group.
    pub fn new() -> Self {
        Self { in_flight: DashMap::new(), stats: FlightStatsCollector::new() }
    }

    /// Number of fetches currently in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Snapshot of deduplication counters.
    pub fn stats(&self) -> FlightStats {
        self.stats.snapshot()
    }
}

impl<K, V, E> FlightGroup<K, V, E>
where
    K: Eq + Hash + Clone + std::fmt::Display,
    V: Clone,
    E: Clone + std::error::Error,
{
    /// Runs `loader` at most once concurrently for `key`.
    ///
    /// The caller that wins the insert-if-absent race executes `loader`
    /// exclusively and publishes the outcome; everyone else awaits that
    /// outcome. The in-flight token is removed before publication, so a
    /// failed wave drains completely and the next caller retries the
    /// origin rather than observing a cached failure.
    ///
    /// Cancellation of the leader removes the token as well; waiters of
    /// that wave observe [`FlightError::Abandoned`].
    pub async fn fetch_once<F, Fut>(&self, key: K, loader: F) -> Result<V, FlightError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<V, E>>,
    {
        let publisher = match self.in_flight.entry(key.clone()) {
            Entry::Occupied(entry) => {
                let receiver = entry.get().clone();
                // Release the shard lock before awaiting.
                drop(entry);
                self.stats.record_join();
                debug!(%key, "joining in-flight fetch");
                return Self::await_published(receiver).await;
            }
            Entry::Vacant(entry) => {
                let (sender, receiver) = watch::channel(None);
                entry.insert(receiver);
                sender
            }
        };

        self.stats.record_lead();
        debug!(%key, "leading fetch");

        let unregister = Unregister { group: self, key: &key };
        let result = loader().await;
        // Token out of the map first, then publish: a failure is visible
        // only to the wave that waited on it.
        drop(unregister);

        if result.is_err() {
            self.stats.record_failure();
        }
        let _ = publisher.send(Some(result.clone()));
        result.map_err(FlightError::Loader)
    }

    async fn await_published(
        mut receiver: watch::Receiver<Published<V, E>>,
    ) -> Result<V, FlightError<E>> {
        let published = receiver
            .wait_for(Option::is_some)
            .await
            .map_err(|_| FlightError::Abandoned)?
            .clone();
        match published {
            Some(Ok(value)) => Ok(value),
            Some(Err(error)) => Err(FlightError::Loader(error)),
            // Unreachable: the predicate above only accepts Some.
            None => Err(FlightError::Abandoned),
        }
    }
}

/// Removes the in-flight token when the leader finishes or is dropped
/// mid-flight.
struct Unregister<'a, K, V, E>
where
    K: Eq + Hash + Clone,
{
    group: &'a FlightGroup<K, V, E>,
    key: &'a K,
}

impl<K, V, E> Drop for Unregister<'_, K, V, E>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        self.group.in_flight.remove(self.key);
    }
}
