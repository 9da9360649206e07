use std::sync::atomic::{AtomicU64, Ordering};

use crate::metrics::snapshot::ShardedLruMetricsSnapshot;
use crate::metrics::traits::{CoreMetricsRecorder, ShardedLruMetricsRecorder};

/// Atomic counters backing [`ShardedLruMetricsSnapshot`].
#[derive(Debug, Default)]
pub struct ShardedLruMetrics {
    get_hits: AtomicU64,
    get_misses: AtomicU64,
    insert_new: AtomicU64,
    insert_updates: AtomicU64,
    removes: AtomicU64,
    clears: AtomicU64,
    flush_triggers: AtomicU64,
    flush_coalesced: AtomicU64,
    eviction_passes: AtomicU64,
    evicted_entries: AtomicU64,
    bucket_recomputes: AtomicU64,
}

impl ShardedLruMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copies the counters; gauges are left at zero for the caller to fill.
    pub fn counters(&self) -> ShardedLruMetricsSnapshot {
        let get_hits = self.get_hits.load(Ordering::Relaxed);
        let get_misses = self.get_misses.load(Ordering::Relaxed);
        let insert_new = self.insert_new.load(Ordering::Relaxed);
        let insert_updates = self.insert_updates.load(Ordering::Relaxed);
        ShardedLruMetricsSnapshot {
            get_calls: get_hits + get_misses,
            get_hits,
            get_misses,
            insert_calls: insert_new + insert_updates,
            insert_new,
            insert_updates,
            removes: self.removes.load(Ordering::Relaxed),
            clears: self.clears.load(Ordering::Relaxed),
            flush_triggers: self.flush_triggers.load(Ordering::Relaxed),
            flush_coalesced: self.flush_coalesced.load(Ordering::Relaxed),
            eviction_passes: self.eviction_passes.load(Ordering::Relaxed),
            evicted_entries: self.evicted_entries.load(Ordering::Relaxed),
            bucket_recomputes: self.bucket_recomputes.load(Ordering::Relaxed),
            cache_len: 0,
            capacity: 0,
            occupied_buckets: 0,
        }
    }

    #[inline]
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl CoreMetricsRecorder for ShardedLruMetrics {
    fn record_get_hit(&self) {
        Self::bump(&self.get_hits);
    }

    fn record_get_miss(&self) {
        Self::bump(&self.get_misses);
    }

    fn record_insert_new(&self) {
        Self::bump(&self.insert_new);
    }

    fn record_insert_update(&self) {
        Self::bump(&self.insert_updates);
    }

    fn record_remove(&self) {
        Self::bump(&self.removes);
    }

    fn record_clear(&self) {
        Self::bump(&self.clears);
    }
}

impl ShardedLruMetricsRecorder for ShardedLruMetrics {
    fn record_flush_trigger(&self) {
        Self::bump(&self.flush_triggers);
    }

    fn record_flush_coalesced(&self) {
        Self::bump(&self.flush_coalesced);
    }

    fn record_eviction_pass(&self) {
        Self::bump(&self.eviction_passes);
    }

    fn record_evicted_entries(&self, count: u64) {
        self.evicted_entries.fetch_add(count, Ordering::Relaxed);
    }

    fn record_bucket_recompute(&self) {
        Self::bump(&self.bucket_recomputes);
    }
}
