//! Error types for the cache-aside read layer
//!
//! Module-specific errors compose rather than duplicate: store adapters
//! report [`CacheStoreError`] / [`OriginError`], the coordinator wraps
//! origin failures into [`ReadError`] for its callers. Origin failures are
//! fanned out verbatim to every waiter of the same in-flight fetch, so the
//! variants that cross the stampede guard are `Clone`.

use thiserror::Error;

/// Errors reported by an origin (backing) store lookup.
///
/// Cloneable so a single failed fetch can be delivered to every caller
/// that joined the in-flight wave for that key.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OriginError {
    /// The origin could not serve the lookup.
    #[error("origin unavailable: {reason}")]
    Unavailable {
        /// Human-readable description of the failure.
        reason: String,
    },

    /// The origin has no value for the requested key.
    #[error("origin has no record for `{key}`")]
    NotFound {
        /// The key that was requested.
        key: String,
    },
}

impl OriginError {
    /// Convenience constructor for [`OriginError::Unavailable`].
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable { reason: reason.into() }
    }

    /// Whether retrying the lookup could reasonably succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Unavailable { .. } => true,
            Self::NotFound { .. } => false,
        }
    }
}

/// Errors reported by a cache store adapter.
///
/// The coordinator never surfaces these to callers: an unavailable cache
/// degrades every read into a miss instead of failing it.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheStoreError {
    /// The cache store could not be reached.
    #[error("cache store unavailable: {reason}")]
    Unavailable {
        /// Human-readable description of the failure.
        reason: String,
    },
}

impl CacheStoreError {
    /// Convenience constructor for [`CacheStoreError::Unavailable`].
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable { reason: reason.into() }
    }
}

/// Errors surfaced by [`ReadThrough::read`](crate::coordinator::ReadThrough::read).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReadError {
    /// The origin fetch behind this read failed.
    ///
    /// Delivered identically to the leader and every co-waiter of the
    /// in-flight fetch. Never cached.
    #[error("origin lookup for `{key}` failed")]
    OriginUnavailable {
        /// The key whose fetch failed.
        key: String,
        /// The underlying origin failure.
        #[source]
        source: OriginError,
    },

    /// The in-flight fetch for this key went away before publishing a
    /// result (its leader was cancelled mid-flight).
    #[error("in-flight fetch for `{key}` was abandoned before completing")]
    FetchAbandoned {
        /// The key whose fetch was abandoned.
        key: String,
    },
}

impl ReadError {
    /// Whether retrying the read could reasonably succeed.
    ///
    /// Abandoned fetches always warrant a retry: the in-flight token is
    /// removed when its leader vanishes, so the next read starts fresh.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::OriginUnavailable { source, .. } => source.is_retryable(),
            Self::FetchAbandoned { .. } => true,
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for error.
    use super::*;

    /// Validates `OriginError::unavailable` behavior for the display
    /// formatting scenario.
    ///
    /// Assertions:
    /// - Confirms the rendered message embeds the failure reason.
    #[test]
    fn test_origin_error_display() {
        let error = OriginError::unavailable("connection refused");
        assert_eq!(error.to_string(), "origin unavailable: connection refused");
    }

    /// Validates `OriginError::is_retryable` behavior for both variants.
    ///
    /// Assertions:
    /// - Ensures `Unavailable` is retryable.
    /// - Ensures `NotFound` is not retryable.
    #[test]
    fn test_origin_error_retryability() {
        assert!(OriginError::unavailable("flaky").is_retryable());
        assert!(!OriginError::NotFound { key: "city1".to_string() }.is_retryable());
    }

    /// Validates `ReadError::is_retryable` behavior for the wrapped origin
    /// failure scenario.
    ///
    /// Assertions:
    /// - Ensures a wrapped retryable origin error stays retryable.
    /// - Ensures an abandoned fetch is retryable.
    #[test]
    fn test_read_error_retryability() {
        let read_error = ReadError::OriginUnavailable {
            key: "city7".to_string(),
            source: OriginError::unavailable("timeout"),
        };
        assert!(read_error.is_retryable());
        assert!(ReadError::FetchAbandoned { key: "city7".to_string() }.is_retryable());
    }

    /// Validates `ReadError::OriginUnavailable` behavior for the error source
    /// chain scenario.
    ///
    /// Assertions:
    /// - Confirms `std::error::Error::source` exposes the origin failure.
    #[test]
    fn test_read_error_source_chain() {
        use std::error::Error;

        let read_error = ReadError::OriginUnavailable {
            key: "city7".to_string(),
            source: OriginError::unavailable("timeout"),
        };
        let source = read_error.source().map(|source| source.to_string());
        assert_eq!(source.as_deref(), Some("origin unavailable: timeout"));
    }
}
