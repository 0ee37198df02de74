//! Simulated slow origin store
//!
//! Stands in for a costly backing lookup (a database read) in tests and
//! the load harness. Every invocation increments the shared
//! [`OriginCallCounter`], which is the signal the metronome reports and
//! the stampede tests assert on.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::debug;

use super::OriginStore;
use crate::error::OriginError;
use crate::metrics::OriginCallCounter;

const PAYLOAD_PREFIX: &str = "cityData";
const PAYLOAD_SUFFIX_LEN: usize = 6;

/// Tuning for the simulated origin.
#[derive(Debug, Clone)]
pub struct SlowTableConfig {
    /// Per-lookup latency.
    pub latency: Duration,

    /// Probability in `[0, 1]` that a lookup fails with
    /// [`OriginError::Unavailable`]. Values outside the range are
    /// clamped.
    pub failure_rate: f64,
}

impl Default for SlowTableConfig {
    fn default() -> Self {
        Self { latency: Duration::from_millis(50), failure_rate: 0.0 }
    }
}

/// Simulated slow origin producing `"cityData"`-prefixed payloads.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use herdgate_core::metrics::OriginCallCounter;
/// use herdgate_core::store::{OriginStore, SlowTable};
///
/// #[tokio::main]
/// async fn main() -> Result<(), herdgate_core::error::OriginError> {
///     let counter = Arc::new(OriginCallCounter::new());
///     let origin = SlowTable::new(Arc::clone(&counter));
///     let value = origin.load(&"city1".to_string()).await?;
///     assert!(value.starts_with("cityData"));
///     assert_eq!(counter.total(), 1);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SlowTable {
    config: SlowTableConfig,
    counter: Arc<OriginCallCounter>,
}

impl SlowTable {
    /// Creates a simulated origin with default latency and no failures.
    pub fn new(counter: Arc<OriginCallCounter>) -> Self {
        Self::with_config(SlowTableConfig::default(), counter)
    }

    /// Creates a simulated origin with explicit tuning.
    pub fn with_config(mut config: SlowTableConfig, counter: Arc<OriginCallCounter>) -> Self {
        config.failure_rate = config.failure_rate.clamp(0.0, 1.0);
        Self { config, counter }
    }

    fn payload() -> String {
        let suffix: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(PAYLOAD_SUFFIX_LEN)
            .map(char::from)
            .collect();
        format!("{PAYLOAD_PREFIX}{suffix}")
    }
}

#[async_trait]
impl OriginStore<String, String> for SlowTable {
    async fn load(&self, key: &String) -> Result<String, OriginError> {
        self.counter.increment();
        debug!(%key, latency_ms = self.config.latency.as_millis() as u64, "origin lookup");

        tokio::time::sleep(self.config.latency).await;

        let fail = self.config.failure_rate > 0.0
            && rand::thread_rng().gen_bool(self.config.failure_rate);
        if fail {
            return Err(OriginError::unavailable("simulated origin failure"));
        }

        Ok(Self::payload())
    }
}
