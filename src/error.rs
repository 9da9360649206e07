//! Error types for the shardlru library.
//!
//! ## Key Components
//!
//! - [`ConfigError`]: Returned when construction parameters are invalid
//!   (zero capacity, non-positive or non-finite load factor).
//! - [`InvariantError`]: Returned by
//!   [`ShardedLru::check_invariants`](crate::policy::sharded_lru::ShardedLru::check_invariants)
//!   when the bucket table and the global index disagree.
//!
//! Cache operations themselves never fail: a miss is `None`, and exceeding
//! capacity is corrected by the next eviction pass.
//!
//! ## Example Usage
//!
//! ```
//! use shardlru::builder::ShardedLruBuilder;
//! use shardlru::error::ConfigError;
//!
//! let ok = ShardedLruBuilder::new(100).load_factor(0.5).try_build::<u64, u64>();
//! assert!(ok.is_ok());
//!
//! let bad: Result<_, ConfigError> = ShardedLruBuilder::new(0).try_build::<u64, u64>();
//! assert!(bad.unwrap_err().to_string().contains("capacity"));
//! ```

use std::fmt;

// ---------------------------------------------------------------------------
// ConfigError
// ---------------------------------------------------------------------------

/// Error returned when cache configuration parameters are invalid.
///
/// Produced by [`ShardedLruBuilder::try_build`](crate::builder::ShardedLruBuilder::try_build)
/// and the `try_*` constructors on
/// [`ShardedLru`](crate::policy::sharded_lru::ShardedLru).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError(String);

impl ConfigError {
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid cache configuration: {}", self.0)
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// InvariantError
// ---------------------------------------------------------------------------

/// Error describing the first structural inconsistency found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantError(String);

impl InvariantError {
    #[inline]
    pub fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }

    #[inline]
    pub fn message(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InvariantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cache invariant violated: {}", self.0)
    }
}

impl std::error::Error for InvariantError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_display_prefixes_message() {
        let err = ConfigError::new("capacity must be > 0");
        assert_eq!(
            err.to_string(),
            "invalid cache configuration: capacity must be > 0"
        );
        assert_eq!(err.message(), "capacity must be > 0");
    }

    #[test]
    fn invariant_display_prefixes_message() {
        let err = InvariantError::new("bucket 3 is empty");
        assert_eq!(err.to_string(), "cache invariant violated: bucket 3 is empty");
        assert_eq!(err.message(), "bucket 3 is empty");
    }

    #[test]
    fn both_implement_std_error() {
        fn assert_error<T: std::error::Error + Send + Sync + 'static>() {}
        assert_error::<ConfigError>();
        assert_error::<InvariantError>();
    }
}
