//! Optional operation counters (feature `metrics`).
//!
//! Recording, snapshotting and export are split into small traits, see
//! [`traits`]. The cache records into [`metrics_impl::ShardedLruMetrics`]
//! with relaxed atomics, so recording never takes a lock.

pub mod exporter;
pub mod metrics_impl;
pub mod snapshot;
pub mod traits;
