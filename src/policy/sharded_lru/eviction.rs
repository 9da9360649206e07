//! Batch eviction of the globally oldest entries.
//!
//! ## Algorithm
//!
//! ```text
//!   while len > capacity + slack:
//!       lock global index
//!       k = len - capacity
//!       for entry in index:                 O(n log k)
//!           OldestK.offer(entry.last_touch, entry)
//!       for victim in OldestK:
//!           index.remove(victim.key)
//!           table[victim.slot].remove(victim.key)   (drops emptied bucket)
//!       unlock
//! ```
//!
//! The index lock is released between iterations, so inserts that land
//! while a pass is in progress are picked up by the re-check. A call with
//! slack 0 always leaves `len <= capacity` unless writers race it.
//!
//! Each iteration runs through `Core::write_index`: if a key's `Hash` or
//! `Eq` panics between the two removals, the table is resynchronized with
//! the index before the panic reaches the caller or the flush worker.

use std::hash::Hash;
use std::sync::Arc;

use tracing::debug;

use super::Core;
use crate::ds::OldestK;
#[cfg(feature = "metrics")]
use crate::metrics::traits::ShardedLruMetricsRecorder;

impl<K, V> Core<K, V>
where
    K: Eq + Hash,
{
    /// Removes the oldest entries until `len <= capacity + slack`, bringing
    /// size down to `capacity` on each iteration. Returns the number removed.
    pub(crate) fn evict_excess(&self, slack: usize) -> usize {
        let threshold = self.capacity.saturating_add(slack);
        let mut removed = 0;
        let mut iterations = 0;

        loop {
            let pass = self.write_index(|index| {
                let len = index.len();
                if len <= threshold {
                    return None;
                }
                let excess = len - self.capacity;

                let mut victims = OldestK::new(excess);
                for entry in index.values() {
                    victims.offer_with(entry.last_touch(), || Arc::clone(entry));
                }

                let mut dropped = 0;
                for (_, victim) in victims.into_oldest() {
                    index.remove(victim.key());
                    self.table.remove_from_slot(victim.slot(), victim.key());
                    dropped += 1;
                }
                Some(dropped)
            });
            match pass {
                Some(dropped) => {
                    removed += dropped;
                    iterations += 1;
                },
                None => break,
            }
        }

        if iterations > 0 {
            #[cfg(feature = "metrics")]
            {
                self.metrics.record_eviction_pass();
                self.metrics.record_evicted_entries(removed as u64);
            }
            debug!(
                removed,
                iterations,
                capacity = self.capacity,
                len = self.len(),
                "eviction pass finished"
            );
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use crate::builder::ShardedLruBuilder;
    use crate::policy::sharded_lru::ShardedLru;

    fn filled(capacity: usize, slack: usize, count: u32) -> ShardedLru<u32, u32> {
        let cache = ShardedLruBuilder::new(capacity)
            .min_flush_size(slack)
            .build::<u32, u32>();
        for key in 0..count {
            cache.put(key, key);
        }
        cache
    }

    #[test]
    fn nothing_removed_within_threshold() {
        let cache = filled(10, 5, 15);
        assert_eq!(cache.len(), 15);
        assert_eq!(cache.core.evict_excess(5), 0);
        assert_eq!(cache.len(), 15);
    }

    #[test]
    fn removes_exactly_the_excess() {
        let cache = filled(10, 5, 15);
        assert_eq!(cache.core.evict_excess(0), 5);
        assert_eq!(cache.len(), 10);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn removes_oldest_first() {
        let cache = filled(10, 100, 20);
        // Renew the first five.
        for key in 0..5 {
            assert_eq!(cache.get(&key), Some(key));
        }
        assert_eq!(cache.core.evict_excess(0), 10);
        for key in 0..5 {
            assert!(cache.contains_key(&key), "renewed key {} evicted", key);
        }
        for key in 5..15 {
            assert!(!cache.contains_key(&key), "stale key {} survived", key);
        }
        for key in 15..20 {
            assert!(cache.contains_key(&key));
        }
    }

    #[test]
    fn emptied_buckets_are_dropped() {
        let cache = filled(1, 100, 50);
        assert_eq!(cache.core.evict_excess(0), 49);
        assert_eq!(cache.occupied_buckets(), 1);
        assert!(cache.contains_key(&49));
        cache.check_invariants().unwrap();
    }
}
