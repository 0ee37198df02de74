//! Testing utilities
//!
//! Deterministic time control for TTL behavior under test.

mod time;

pub use time::{Clock, MockClock, SystemClock};
