pub use crate::builder::{FlushMode, ShardedLruBuilder};
pub use crate::ds::{Bucket, Entry, HashTable, OldestK, SlotSelector, TouchClock};
pub use crate::error::{ConfigError, InvariantError};
#[cfg(feature = "metrics")]
pub use crate::metrics::exporter::PrometheusTextExporter;
#[cfg(feature = "metrics")]
pub use crate::metrics::snapshot::ShardedLruMetricsSnapshot;
#[cfg(feature = "metrics")]
pub use crate::metrics::traits::{MetricsExporter, MetricsSnapshotProvider};
pub use crate::policy::sharded_lru::ShardedLru;
pub use crate::traits::{ConcurrentCache, ConcurrentMap};
