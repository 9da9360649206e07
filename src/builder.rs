//! Builder for [`ShardedLru`] caches.
//!
//! Collects the capacity, load factor, flush slack and flush mode, validates
//! them once, and constructs the cache.
//!
//! ## Options
//!
//! | Option           | Type        | Default       | Meaning                                  |
//! |------------------|-------------|---------------|------------------------------------------|
//! | `capacity`       | `usize`     | required      | Target number of live entries            |
//! | `load_factor`    | `f32`       | 0.75          | Table length is `ceil(capacity / lf)`    |
//! | `min_flush_size` | `usize`     | 100           | Overshoot tolerated before evicting      |
//! | `flush_mode`     | `FlushMode` | `Synchronous` | Where eviction passes run                |
//!
//! ## Example
//!
//! ```rust
//! use shardlru::builder::{FlushMode, ShardedLruBuilder};
//!
//! let cache = ShardedLruBuilder::new(1_000)
//!     .load_factor(0.5)
//!     .min_flush_size(10)
//!     .flush_mode(FlushMode::Synchronous)
//!     .build::<u64, String>();
//!
//! cache.put(1, "hello".to_string());
//! assert_eq!(cache.get(&1), Some("hello".to_string()));
//! assert_eq!(cache.table_len(), 2_000);
//! ```

use std::hash::Hash;

use crate::ds::hash_table::{MAX_TABLE_LEN, checked_len_for};
use crate::error::ConfigError;
use crate::policy::sharded_lru::{DEFAULT_LOAD_FACTOR, DEFAULT_MIN_FLUSH_SIZE, ShardedLru};

pub use crate::policy::sharded_lru::FlushMode;

/// Builder for creating [`ShardedLru`] instances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShardedLruBuilder {
    capacity: usize,
    load_factor: f32,
    min_flush_size: usize,
    flush_mode: FlushMode,
}

impl ShardedLruBuilder {
    /// Create a new builder with the specified capacity and default options.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            load_factor: DEFAULT_LOAD_FACTOR,
            min_flush_size: DEFAULT_MIN_FLUSH_SIZE,
            flush_mode: FlushMode::default(),
        }
    }

    /// Sets the table sizing factor. Smaller values mean more, smaller buckets.
    pub fn load_factor(mut self, load_factor: f32) -> Self {
        self.load_factor = load_factor;
        self
    }

    /// Sets how far `len` may exceed `capacity` before a pass is triggered.
    pub fn min_flush_size(mut self, min_flush_size: usize) -> Self {
        self.min_flush_size = min_flush_size;
        self
    }

    pub fn flush_mode(mut self, flush_mode: FlushMode) -> Self {
        self.flush_mode = flush_mode;
        self
    }

    /// Checks the options without building.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::new("capacity must be greater than zero"));
        }
        if !self.load_factor.is_finite() || self.load_factor <= 0.0 {
            return Err(ConfigError::new(format!(
                "load factor must be a positive finite number, got {}",
                self.load_factor
            )));
        }
        if checked_len_for(self.capacity, self.load_factor).is_none() {
            return Err(ConfigError::new(format!(
                "capacity {} with load factor {} needs a table longer than {} slots",
                self.capacity, self.load_factor, MAX_TABLE_LEN
            )));
        }
        Ok(())
    }

    /// Builds the cache, returning an error for invalid options.
    ///
    /// # Example
    ///
    /// ```rust
    /// use shardlru::builder::ShardedLruBuilder;
    ///
    /// let err = ShardedLruBuilder::new(10)
    ///     .load_factor(f32::NAN)
    ///     .try_build::<u64, u64>()
    ///     .unwrap_err();
    /// assert!(err.message().contains("load factor"));
    /// ```
    pub fn try_build<K, V>(self) -> Result<ShardedLru<K, V>, ConfigError>
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        self.validate()?;
        Ok(ShardedLru::from_parts(
            self.capacity,
            self.load_factor,
            self.min_flush_size,
            self.flush_mode,
        ))
    }

    /// Builds the cache.
    ///
    /// # Panics
    ///
    /// Panics if the options are invalid; see [`try_build`](Self::try_build).
    pub fn build<K, V>(self) -> ShardedLru<K, V>
    where
        K: Eq + Hash + Clone + Send + Sync + 'static,
        V: Clone + Send + Sync + 'static,
    {
        match self.try_build() {
            Ok(cache) => cache,
            Err(err) => panic!("{err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_constants() {
        let cache = ShardedLruBuilder::new(10).build::<u64, String>();
        assert_eq!(cache.capacity(), 10);
        assert_eq!(cache.load_factor(), DEFAULT_LOAD_FACTOR);
        assert_eq!(cache.min_flush_size(), DEFAULT_MIN_FLUSH_SIZE);
        assert_eq!(cache.flush_mode(), FlushMode::Synchronous);
    }

    #[test]
    fn table_length_follows_load_factor() {
        let cache = ShardedLruBuilder::new(5).build::<u64, u64>();
        assert_eq!(cache.table_len(), 7);

        let cache = ShardedLruBuilder::new(5).load_factor(10.0).build::<u64, u64>();
        assert_eq!(cache.table_len(), 1);

        let cache = ShardedLruBuilder::new(100).load_factor(1.0).build::<u64, u64>();
        assert_eq!(cache.table_len(), 100);
    }

    #[test]
    fn rejects_zero_capacity() {
        let err = ShardedLruBuilder::new(0).try_build::<u64, u64>().unwrap_err();
        assert!(err.message().contains("capacity"));
    }

    #[test]
    fn rejects_bad_load_factors() {
        for lf in [0.0, -1.0, f32::NAN, f32::INFINITY] {
            let result = ShardedLruBuilder::new(10).load_factor(lf).try_build::<u64, u64>();
            assert!(result.is_err(), "load factor {lf} accepted");
        }
    }

    #[test]
    fn rejects_load_factors_that_overflow_the_table() {
        let err = ShardedLruBuilder::new(10)
            .load_factor(1e-30)
            .try_build::<u64, u64>()
            .unwrap_err();
        assert!(err.message().contains("table"), "{err}");

        let err = ShardedLruBuilder::new(usize::MAX)
            .try_build::<u64, u64>()
            .unwrap_err();
        assert!(err.message().contains("table"), "{err}");

        // Small but sane factors still build.
        let cache = ShardedLruBuilder::new(10).load_factor(0.25).build::<u64, u64>();
        assert_eq!(cache.table_len(), 40);
    }

    #[test]
    #[should_panic(expected = "capacity")]
    fn build_panics_on_invalid_options() {
        let _ = ShardedLruBuilder::new(0).build::<u64, u64>();
    }

    #[test]
    fn background_mode_is_applied() {
        let cache = ShardedLruBuilder::new(10)
            .flush_mode(FlushMode::Background)
            .build::<u64, u64>();
        assert_eq!(cache.flush_mode(), FlushMode::Background);
        cache.put(1, 1);
        assert_eq!(cache.get(&1), Some(1));
    }

    #[test]
    fn capacity_enforced_with_zero_slack() {
        let cache = ShardedLruBuilder::new(2).min_flush_size(0).build::<u64, String>();

        cache.put(1, "one".to_string());
        cache.put(2, "two".to_string());
        cache.put(3, "three".to_string());

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains_key(&1));
        assert!(cache.contains_key(&2));
        assert!(cache.contains_key(&3));
    }
}
