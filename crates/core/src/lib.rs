//! Cache-aside read layer with TTL jitter and stampede protection.
//!
//! The crate coordinates concurrent cache misses against a slow origin
//! store so that duplicate origin work stays bounded under pressure:
//!
//! - [`store`]: the collaborator seams (TTL-capable cache store, slow
//!   origin) plus in-memory implementations for tests and load runs.
//! - [`singleflight`]: the stampede guard — at most one in-flight origin
//!   fetch per key, with all concurrent callers sharing the one result.
//! - [`coordinator`]: cache-aside read-through with jittered TTLs so
//!   bulk-populated keys do not mass-expire in lockstep.
//! - [`metrics`]: the origin-call counter and the periodic QPS
//!   metronome that reports it.
//! - [`testing`]: clock abstraction for deterministic TTL tests.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use herdgate_core::coordinator::{ReadThrough, TtlPolicy};
//! use herdgate_core::metrics::OriginCallCounter;
//! use herdgate_core::store::{InMemoryTtlStore, SlowTable};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), herdgate_core::error::ReadError> {
//!     let counter = Arc::new(OriginCallCounter::new());
//!     let cache: InMemoryTtlStore<String, String> = InMemoryTtlStore::new();
//!     let origin = SlowTable::new(Arc::clone(&counter));
//!
//!     let reader = ReadThrough::new(
//!         Arc::new(cache),
//!         Arc::new(origin),
//!         TtlPolicy::new(Duration::from_secs(10)),
//!     );
//!
//!     let value = reader.read("city1".to_string()).await?;
//!     assert!(value.starts_with("cityData"));
//!     assert_eq!(counter.total(), 1);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod coordinator;
pub mod error;
pub mod metrics;
pub mod singleflight;
pub mod store;
pub mod testing;

// Re-export commonly used types for convenience
pub use coordinator::{ReadThrough, TtlPolicy, WarmSummary};
pub use error::{CacheStoreError, OriginError, ReadError};
pub use metrics::{OriginCallCounter, QpsMonitor, QpsSample};
pub use singleflight::{FlightError, FlightGroup, FlightStats};
pub use store::{CacheStore, InMemoryTtlStore, OriginStore, SlowTable, SlowTableConfig};
