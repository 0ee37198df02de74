//! Time abstraction for testability
//!
//! Provides a trait-based approach to time operations so TTL expiry can be
//! tested deterministically without relying on actual time passage.
//!
//! # Examples
//!
//! ```
//! use std::time::Duration;
//!
//! use herdgate_core::testing::{Clock, MockClock, SystemClock};
//!
//! // Use the system clock in production
//! let clock = SystemClock;
//! let now = clock.now();
//!
//! // Use the mock clock in tests
//! let mock = MockClock::new();
//! let start = mock.now();
//! mock.advance(Duration::from_secs(5));
//! assert_eq!(mock.now().duration_since(start), Duration::from_secs(5));
//! ```

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Trait for time operations to enable testing
pub trait Clock: Send + Sync {
    /// Get the current instant (monotonic time)
    ///
    /// Returns a monotonic timestamp suitable for measuring durations and
    /// computing expiry deadlines.
    fn now(&self) -> Instant;
}

/// Real system clock implementation
///
/// Uses the actual system clock for time operations. Use this in
/// production code.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Mock clock for deterministic testing
///
/// Allows tests to control time manually: advancing the clock expires TTL
/// entries without actually waiting.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    elapsed: Arc<Mutex<Duration>>,
}

impl MockClock {
    /// Create a new mock clock
    ///
    /// The clock starts at the current real time but only moves when
    /// [`MockClock::advance`] is called.
    pub fn new() -> Self {
        Self { start: Instant::now(), elapsed: Arc::new(Mutex::new(Duration::ZERO)) }
    }

    /// Advance the mock clock by the given duration
    ///
    /// All clones of this clock observe the advancement.
    pub fn advance(&self, duration: Duration) {
        if let Ok(mut elapsed) = self.elapsed.lock() {
            *elapsed += duration;
        }
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        let elapsed = self.elapsed.lock().map(|e| *e).unwrap_or(Duration::ZERO);
        self.start + elapsed
    }
}
