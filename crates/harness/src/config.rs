//! Harness configuration and validation
//!
//! Misconfiguration is the only fatal condition in a load run, and it is
//! rejected eagerly — before any worker spawns or any store is touched.

use std::time::Duration;

use thiserror::Error;

/// Configuration validation failure.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A configuration value is out of range.
    #[error("invalid harness configuration: {message}")]
    Invalid {
        /// What was wrong with the configuration.
        message: String,
    },
}

/// Load-run configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Number of concurrent virtual clients.
    pub workers: usize,

    /// Wall-clock budget per worker.
    pub duration: Duration,

    /// Keys are drawn uniformly from `city1..=city{keyspace}`.
    pub keyspace: u64,

    /// Whether to bulk-populate the keyspace before the run.
    pub prewarm: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self { workers: 8, duration: Duration::from_secs(30), keyspace: 1000, prewarm: false }
    }
}

impl HarnessConfig {
    /// Create a new configuration builder.
    pub fn builder() -> HarnessConfigBuilder {
        HarnessConfigBuilder::default()
    }

    /// Rejects configurations under which a run cannot make progress.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid { message: "workers must be > 0".to_string() });
        }
        if self.duration.is_zero() {
            return Err(ConfigError::Invalid { message: "duration must be > 0".to_string() });
        }
        if self.keyspace == 0 {
            return Err(ConfigError::Invalid { message: "keyspace must be > 0".to_string() });
        }
        Ok(())
    }
}

/// Builder for [`HarnessConfig`] with a fluent API.
#[derive(Debug, Default)]
pub struct HarnessConfigBuilder {
    config: HarnessConfig,
}

impl HarnessConfigBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of concurrent workers.
    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    /// Set the wall-clock budget per worker.
    pub fn duration(mut self, duration: Duration) -> Self {
        self.config.duration = duration;
        self
    }

    /// Set the key-space size.
    pub fn keyspace(mut self, keyspace: u64) -> Self {
        self.config.keyspace = keyspace;
        self
    }

    /// Enable or disable pre-warming the keyspace.
    pub fn prewarm(mut self, prewarm: bool) -> Self {
        self.config.prewarm = prewarm;
        self
    }

    /// Build the configuration. Validation happens when the harness is
    /// constructed.
    pub fn build(self) -> HarnessConfig {
        self.config
    }
}
