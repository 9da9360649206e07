//! shardlru: a concurrent key-value cache with approximate LRU eviction.
//!
//! Entries are spread over a fixed table of independently locked buckets.
//! Reads lock one bucket; writes also take a cache-wide index lock. Once the
//! cache grows past `capacity + min_flush_size`, an eviction pass removes the
//! globally oldest entries, either inline or on a background worker.
//!
//! ```
//! use shardlru::ShardedLru;
//!
//! let cache = ShardedLru::new(1_000);
//! cache.put("alpha", 1);
//! assert_eq!(cache.get("alpha"), Some(1));
//! assert_eq!(cache.remove("alpha"), Some(1));
//! assert!(cache.is_empty());
//! ```
//!
//! See [`policy::sharded_lru`] for the design and locking rules.

pub mod builder;
pub mod ds;
pub mod error;
pub mod policy;

#[cfg(feature = "metrics")]
pub mod metrics;

pub mod prelude;
pub mod traits;

pub use builder::ShardedLruBuilder;
pub use error::{ConfigError, InvariantError};
pub use policy::sharded_lru::{FlushMode, ShardedLru};
