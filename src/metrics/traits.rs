//! # Metrics Trait Hierarchy
//!
//! Recording, snapshotting and export are separate responsibilities.
//!
//! ```text
//!            ┌─────────────────────────────┐
//!            │     CoreMetricsRecorder     │
//!            │  get_hit/get_miss/insert    │
//!            │  update/remove/clear        │
//!            └──────────────┬──────────────┘
//!                           │
//!                           ▼
//!            ┌─────────────────────────────┐
//!            │ ShardedLruMetricsRecorder   │
//!            │  flush trigger/coalesce     │
//!            │  eviction pass/evicted      │
//!            │  bucket recompute           │
//!            └─────────────────────────────┘
//!
//!   Consumption (decoupled from recording):
//!   ┌──────────────────────────────┐    ┌──────────────────────────────┐
//!   │ MetricsSnapshotProvider<S>   │    │ MetricsExporter<S>           │
//!   │ (tests, diagnostics)         │    │ (production monitoring)      │
//!   └──────────────────────────────┘    └──────────────────────────────┘
//! ```
//!
//! Recorders take `&self`: the cache is shared between threads and records
//! from both the lock-free read path and the write path.

/// Counters common to any cache.
pub trait CoreMetricsRecorder {
    fn record_get_hit(&self);
    fn record_get_miss(&self);
    fn record_insert_new(&self);
    fn record_insert_update(&self);
    fn record_remove(&self);
    fn record_clear(&self);
}

/// Counters specific to the bucket-sharded LRU.
pub trait ShardedLruMetricsRecorder: CoreMetricsRecorder {
    /// An insertion crossed the flush threshold.
    fn record_flush_trigger(&self);
    /// A background trigger found a pass already running.
    fn record_flush_coalesced(&self);
    /// One eviction pass finished.
    fn record_eviction_pass(&self);
    fn record_evicted_entries(&self, count: u64);
    /// A dirty bucket rescanned its entries for the oldest stamp.
    fn record_bucket_recompute(&self);
}

/// Produce a point-in-time snapshot.
pub trait MetricsSnapshotProvider<S> {
    fn snapshot(&self) -> S;
}

/// Publish snapshots to a monitoring sink.
pub trait MetricsExporter<S> {
    fn export(&self, snapshot: &S);
}
