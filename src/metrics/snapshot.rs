/// Point-in-time copy of a [`ShardedLru`](crate::policy::sharded_lru::ShardedLru)'s counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ShardedLruMetricsSnapshot {
    pub get_calls: u64,
    pub get_hits: u64,
    pub get_misses: u64,

    pub insert_calls: u64,
    pub insert_new: u64,
    pub insert_updates: u64,

    pub removes: u64,
    pub clears: u64,

    pub flush_triggers: u64,
    pub flush_coalesced: u64, // background triggers dropped while a pass ran
    pub eviction_passes: u64,
    pub evicted_entries: u64,
    pub bucket_recomputes: u64,

    // gauges captured at snapshot time
    pub cache_len: usize,
    pub capacity: usize,
    pub occupied_buckets: usize,
}

impl ShardedLruMetricsSnapshot {
    /// Fraction of `get` calls that hit, or 0.0 before the first call.
    pub fn hit_ratio(&self) -> f64 {
        if self.get_calls == 0 {
            0.0
        } else {
            self.get_hits as f64 / self.get_calls as f64
        }
    }
}
