//! Concurrent cache with approximate LRU eviction over bucket-sharded
//! recency tracking.
//!
//! ## Architecture
//!
//! ```text
//!   ┌───────────────────────────────────────────────────────────────────────┐
//!   │                         ShardedLru<K, V>                              │
//!   │                                                                       │
//!   │   core: Arc<Core>                                                     │
//!   │   ┌───────────────────────────────────────────────────────────────┐   │
//!   │   │ index: Mutex<FxHashMap<K, Arc<Entry>>>   (cache-wide lock)    │   │
//!   │   │                                                               │   │
//!   │   │ table: HashTable                                              │   │
//!   │   │   [Mutex<Option<Bucket>>; ceil(capacity / load_factor)]       │   │
//!   │   │                                                               │   │
//!   │   │ clock: TouchClock      (strictly increasing stamps)           │   │
//!   │   └───────────────────────────────────────────────────────────────┘   │
//!   │                                                                       │
//!   │   flush: FlushTrigger    Synchronous | Background(worker)             │
//!   └───────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every entry lives in exactly one bucket and in the global index, and the
//! two are only changed together while the index lock is held.
//!
//! ## Locking
//!
//! | Operation                        | Index lock | Slot lock     |
//! |----------------------------------|------------|---------------|
//! | `get`, `peek`, `get_with`        | no         | one slot      |
//! | `put`, `remove`                  | yes        | one slot      |
//! | eviction pass                    | yes        | victim slots  |
//! | `clear`                          | yes        | all, in turn  |
//! | `contains_key`, snapshots        | yes        | no            |
//!
//! Locks are always taken index first, then slot, so the read path (slot
//! only) cannot deadlock against writers.
//!
//! Every `get` and `put` also draws a stamp from the shared
//! [`TouchClock`](crate::ds::TouchClock), a CAS on one atomic. Reads of
//! distinct slots therefore still share one contended cache line.
//!
//! `len` reads an atomic copy of the index size and takes no lock.
//!
//! ## Eviction
//!
//! After a `put` adds a new key, the cache checks
//! `len > capacity + min_flush_size`. If so, the configured
//! [`FlushMode`] either evicts inline or wakes the background worker. An
//! eviction pass removes the `len - capacity` entries with the oldest
//! last-touch stamps across the whole cache (see [`eviction`]).
//!
//! Each bucket also keeps a lazily recomputed "oldest stamp in this bucket"
//! hint: touches only mark the bucket dirty and the minimum is rescanned on
//! the next read ([`ShardedLru::oldest_touch`]).
//!
//! ## Example Usage
//!
//! ```
//! use shardlru::ShardedLru;
//!
//! let cache = ShardedLru::with_flush_size(5, 0);
//! for i in 1..=5 {
//!     cache.put(format!("K{i}"), i);
//! }
//! // Reading K1 renews it, so K2 is now the oldest.
//! assert_eq!(cache.get("K1"), Some(1));
//! cache.put("K6".to_string(), 6);
//!
//! assert_eq!(cache.len(), 5);
//! assert_eq!(cache.get("K2"), None);
//! assert_eq!(cache.get("K1"), Some(1));
//! ```
//!
//! ## Thread Safety
//!
//! `ShardedLru` is `Send + Sync`; share it with `Arc`. Values are returned
//! by clone; use [`get_with`](ShardedLru::get_with) to inspect a value in
//! place.

pub mod eviction;
pub mod flush;

use std::borrow::Borrow;
use std::fmt;
use std::hash::Hash;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::warn;

use crate::builder::ShardedLruBuilder;
use crate::ds::hash_table::len_for;
use crate::ds::{Entry, HashTable, TouchClock};
use crate::error::{ConfigError, InvariantError};
#[cfg(feature = "metrics")]
use crate::metrics::metrics_impl::ShardedLruMetrics;
#[cfg(feature = "metrics")]
use crate::metrics::snapshot::ShardedLruMetricsSnapshot;
#[cfg(feature = "metrics")]
use crate::metrics::traits::{
    CoreMetricsRecorder, MetricsSnapshotProvider, ShardedLruMetricsRecorder,
};
use crate::traits::{ConcurrentCache, ConcurrentMap};

pub use flush::FlushMode;
use flush::FlushTrigger;

/// Default table sizing factor.
pub const DEFAULT_LOAD_FACTOR: f32 = 0.75;
/// Default eviction slack.
pub const DEFAULT_MIN_FLUSH_SIZE: usize = 100;

type Index<K, V> = FxHashMap<K, Arc<Entry<K, V>>>;

/// State shared between the cache handle and the background worker.
pub(crate) struct Core<K, V> {
    pub(crate) capacity: usize,
    pub(crate) min_flush_size: usize,
    load_factor: f32,
    clock: TouchClock,
    table: HashTable<K, V>,
    index: Mutex<Index<K, V>>,
    /// `index.len()` as of the last write, readable without the lock.
    len: AtomicUsize,
    #[cfg(feature = "metrics")]
    pub(crate) metrics: ShardedLruMetrics,
}

impl<K, V> Core<K, V>
where
    K: Eq + Hash,
{
    fn new(capacity: usize, load_factor: f32, min_flush_size: usize) -> Self {
        Self {
            capacity,
            min_flush_size,
            load_factor,
            clock: TouchClock::new(),
            table: HashTable::new(len_for(capacity, load_factor)),
            index: Mutex::new(FxHashMap::with_capacity_and_hasher(
                capacity.saturating_add(min_flush_size).min(1 << 20),
                Default::default(),
            )),
            len: AtomicUsize::new(0),
            #[cfg(feature = "metrics")]
            metrics: ShardedLruMetrics::new(),
        }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Runs a structural write under the cache-wide lock.
    ///
    /// If `f` unwinds (a panicking `Hash`, `Eq` or `Drop` in user types), the
    /// bucket table and the index are resynchronized before the panic
    /// continues, so the cache stays consistent for later callers.
    pub(crate) fn write_index<R>(&self, f: impl FnOnce(&mut Index<K, V>) -> R) -> R {
        let mut index = self.index.lock();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(&mut *index)));
        if outcome.is_err() {
            self.resync(&mut index);
        }
        self.len.store(index.len(), Ordering::Release);
        match outcome {
            Ok(result) => result,
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    /// Drops bucket entries the index no longer holds and index entries no
    /// bucket holds. Matches by entry identity, so no key is hashed.
    fn resync(&self, index: &mut Index<K, V>) {
        let indexed: FxHashSet<*const Entry<K, V>> = index.values().map(Arc::as_ptr).collect();
        let orphaned = self
            .table
            .retain_entries(|entry| indexed.contains(&Arc::as_ptr(entry)));

        let mut bucketed: FxHashSet<*const Entry<K, V>> = FxHashSet::default();
        self.table
            .for_each_bucket(|bucket| bucketed.extend(bucket.entries().map(Arc::as_ptr)));
        let before = index.len();
        index.retain(|_, entry| bucketed.contains(&Arc::as_ptr(entry)));
        let unindexed = before - index.len();

        warn!(
            orphaned,
            unindexed,
            len = index.len(),
            "write panicked; bucket table resynchronized with the index"
        );
    }

    /// Inserts or replaces without running the flush trigger.
    pub(crate) fn insert(&self, key: K, value: V) -> Option<V>
    where
        K: Clone,
    {
        self.write_index(|index| {
            let slot = self.table.slot_for(&key);
            let stamp = self.clock.now();
            self.table.with_bucket_mut(slot, |bucket| {
                if let Some(entry) = bucket.touch(&key, stamp) {
                    return Some(entry.replace_value(value));
                }
                let entry = Arc::new(Entry::new(key.clone(), value, slot, stamp));
                bucket.insert(Arc::clone(&entry));
                index.insert(key, entry);
                None
            })
        })
    }

    fn remove_entry<Q>(&self, key: &Q) -> Option<Arc<Entry<K, V>>>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.write_index(|index| {
            let slot = self.table.slot_for(key);
            let entry = self.table.remove_from_slot(slot, key)?;
            index.remove(key);
            Some(entry)
        })
    }

    fn clear(&self) {
        self.write_index(|index| {
            index.clear();
            self.table.clear();
        });
    }

    #[inline]
    pub(crate) fn over_threshold(&self) -> bool {
        self.len() > self.capacity.saturating_add(self.min_flush_size)
    }
}

/// Bucket-sharded approximate-LRU cache.
///
/// See the [module documentation](self) for the design.
pub struct ShardedLru<K, V> {
    core: Arc<Core<K, V>>,
    flush: FlushTrigger,
}

impl<K, V> ShardedLru<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a cache with the default load factor and flush slack,
    /// flushing synchronously.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        ShardedLruBuilder::new(capacity).build()
    }

    /// Creates a cache with a custom load factor.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0 or `load_factor` is not a positive finite number.
    pub fn with_load_factor(capacity: usize, load_factor: f32) -> Self {
        ShardedLruBuilder::new(capacity)
            .load_factor(load_factor)
            .build()
    }

    /// Creates a cache with a custom flush slack.
    ///
    /// # Example
    ///
    /// ```
    /// use shardlru::ShardedLru;
    ///
    /// let cache = ShardedLru::with_flush_size(3, 0);
    /// for i in 0..4 {
    ///     cache.put(i, i);
    /// }
    /// assert_eq!(cache.len(), 3);
    /// ```
    pub fn with_flush_size(capacity: usize, min_flush_size: usize) -> Self {
        ShardedLruBuilder::new(capacity)
            .min_flush_size(min_flush_size)
            .build()
    }

    /// Creates a cache that evicts on a background worker.
    pub fn background(capacity: usize) -> Self {
        ShardedLruBuilder::new(capacity)
            .flush_mode(FlushMode::Background)
            .build()
    }

    /// Fallible constructor taking every option.
    pub fn try_new(
        capacity: usize,
        load_factor: f32,
        min_flush_size: usize,
        mode: FlushMode,
    ) -> Result<Self, ConfigError> {
        ShardedLruBuilder::new(capacity)
            .load_factor(load_factor)
            .min_flush_size(min_flush_size)
            .flush_mode(mode)
            .try_build()
    }

    /// Builds from already validated options.
    pub(crate) fn from_parts(
        capacity: usize,
        load_factor: f32,
        min_flush_size: usize,
        mode: FlushMode,
    ) -> Self {
        let core = Arc::new(Core::new(capacity, load_factor, min_flush_size));
        let flush = FlushTrigger::new(mode, &core);
        Self { core, flush }
    }
}

impl<K, V> ShardedLru<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Returns the value for `key`, renewing its recency.
    ///
    /// Only the key's slot is locked.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.get_with(key, V::clone)
    }

    /// Returns the value for `key` without renewing its recency.
    pub fn peek<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let slot = self.core.table.slot_for(key);
        self.core
            .table
            .with_bucket(slot, |bucket| bucket.get(key).map(|entry| entry.value()))
            .flatten()
    }

    /// Inserts or replaces the value for `key`, returning the previous value.
    ///
    /// Adding a new key may trigger an eviction pass.
    pub fn put(&self, key: K, value: V) -> Option<V> {
        let core = &*self.core;
        match core.insert(key, value) {
            Some(previous) => {
                #[cfg(feature = "metrics")]
                core.metrics.record_insert_update();
                Some(previous)
            },
            None => {
                #[cfg(feature = "metrics")]
                core.metrics.record_insert_new();
                self.flush.after_insert(core);
                None
            },
        }
    }

    /// Removes `key`, returning its value.
    pub fn remove<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let core = &*self.core;
        let entry = core.remove_entry(key)?;
        #[cfg(feature = "metrics")]
        core.metrics.record_remove();
        Some(Entry::into_value(entry).unwrap_or_else(|shared| shared.value()))
    }

    /// Applies [`put`](Self::put) to each pair. Not atomic across pairs.
    pub fn put_all<I>(&self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in pairs {
            self.put(key, value);
        }
    }

    /// Returns `true` if some entry holds `value`. Scans every entry.
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        let index = self.core.index.lock();
        index
            .values()
            .any(|entry| entry.with_value(|held| held == value))
    }

    /// Snapshot of all keys. O(n) under the cache-wide lock.
    pub fn keys(&self) -> Vec<K> {
        self.core.index.lock().keys().cloned().collect()
    }

    /// Snapshot of all values. O(n) under the cache-wide lock.
    pub fn values(&self) -> Vec<V> {
        self.core
            .index
            .lock()
            .values()
            .map(|entry| entry.value())
            .collect()
    }

    /// Snapshot of all pairs. O(n) under the cache-wide lock.
    pub fn entries(&self) -> Vec<(K, V)> {
        self.core
            .index
            .lock()
            .values()
            .map(|entry| (entry.key().clone(), entry.value()))
            .collect()
    }
}

impl<K, V> ShardedLru<K, V>
where
    K: Eq + Hash,
{
    /// Runs `f` on the value for `key` while its slot is locked, renewing
    /// its recency.
    ///
    /// # Example
    ///
    /// ```
    /// use shardlru::ShardedLru;
    ///
    /// let cache = ShardedLru::new(10);
    /// cache.put("k", vec![1, 2, 3]);
    /// assert_eq!(cache.get_with("k", |v| v.len()), Some(3));
    /// ```
    ///
    /// # Deadlocks
    ///
    /// `f` runs while the key's slot lock and the value's mutex are held.
    /// Calling back into this cache from `f` deadlocks whenever the call
    /// needs that slot or that value: `get`, `put` or `remove` on any key in
    /// the slot, `clear`, `flush`, `oldest_touch`, and the `values` or
    /// `entries` snapshots. Calls that take the index lock (`contains_key`,
    /// `keys`) can deadlock against a concurrent writer, which holds the
    /// index and waits for this slot. Only `len`, `is_empty` and the
    /// configuration getters are safe. Keep `f` short and copy out what you
    /// need.
    pub fn get_with<Q, R>(&self, key: &Q, f: impl FnOnce(&V) -> R) -> Option<R>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let core = &*self.core;
        let slot = core.table.slot_for(key);
        let found = core
            .table
            .with_bucket(slot, |bucket| {
                let stamp = core.clock.now();
                bucket.touch(key, stamp).map(|entry| entry.with_value(f))
            })
            .flatten();

        #[cfg(feature = "metrics")]
        {
            if found.is_some() {
                core.metrics.record_get_hit();
            } else {
                core.metrics.record_get_miss();
            }
        }
        found
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.core.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if `key` is present. Does not renew recency.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.core.index.lock().contains_key(key)
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.core.clear();
        #[cfg(feature = "metrics")]
        self.core.metrics.record_clear();
    }

    /// Evicts the oldest entries until `len() <= capacity()`, ignoring the
    /// flush slack. Returns the number of entries removed.
    ///
    /// # Example
    ///
    /// ```
    /// use shardlru::ShardedLru;
    ///
    /// let cache = ShardedLru::with_flush_size(10, 100);
    /// for i in 0..25 {
    ///     cache.put(i, i);
    /// }
    /// assert_eq!(cache.len(), 25);
    /// assert_eq!(cache.flush(), 15);
    /// assert_eq!(cache.len(), 10);
    /// ```
    pub fn flush(&self) -> usize {
        self.core.evict_excess(0)
    }

    /// `true` while a background eviction pass is scheduled or running.
    /// Always `false` for synchronous caches.
    pub fn is_flush_running(&self) -> bool {
        self.flush.is_running()
    }

    /// Smallest last-touch stamp across all buckets, or `None` when empty.
    ///
    /// Buckets touched since the previous call rescan their entries; the
    /// rest answer from their cached hint.
    pub fn oldest_touch(&self) -> Option<u64> {
        let mut oldest: Option<u64> = None;
        self.core.table.for_each_bucket(|bucket| {
            let (stamp, _recomputed) = bucket.oldest_touch_recomputed();
            #[cfg(feature = "metrics")]
            {
                if _recomputed {
                    self.core.metrics.record_bucket_recompute();
                }
            }
            oldest = Some(oldest.map_or(stamp, |o| o.min(stamp)));
        });
        oldest
    }

    /// Number of table slots currently holding a bucket.
    pub fn occupied_buckets(&self) -> usize {
        self.core.table.occupied()
    }

    /// Soft maximum number of live entries.
    pub fn capacity(&self) -> usize {
        self.core.capacity
    }

    pub fn min_flush_size(&self) -> usize {
        self.core.min_flush_size
    }

    pub fn load_factor(&self) -> f32 {
        self.core.load_factor
    }

    pub fn flush_mode(&self) -> FlushMode {
        self.flush.mode()
    }

    /// Number of slots in the bucket table.
    pub fn table_len(&self) -> usize {
        self.core.table.slot_count()
    }

    /// Verifies that the bucket table and the global index agree.
    ///
    /// Takes the cache-wide lock for the duration of the check.
    pub fn check_invariants(&self) -> Result<(), InvariantError> {
        let index = self.core.index.lock();
        let mut bucketed = 0usize;
        let mut failure: Option<InvariantError> = None;

        self.core.table.for_each_bucket(|bucket| {
            if failure.is_some() {
                return;
            }
            if bucket.is_empty() {
                failure = Some(InvariantError::new(format!(
                    "empty bucket left in slot {}",
                    bucket.slot()
                )));
                return;
            }
            if !bucket.is_dirty() && bucket.cached_oldest_touch() != bucket.scan_oldest() {
                failure = Some(InvariantError::new(format!(
                    "clean bucket in slot {} caches oldest stamp {} but holds {}",
                    bucket.slot(),
                    bucket.cached_oldest_touch(),
                    bucket.scan_oldest()
                )));
                return;
            }
            for entry in bucket.entries() {
                bucketed += 1;
                if entry.slot() != bucket.slot() {
                    failure = Some(InvariantError::new(format!(
                        "entry names slot {} but sits in slot {}",
                        entry.slot(),
                        bucket.slot()
                    )));
                    return;
                }
                match index.get(entry.key()) {
                    Some(indexed) if Arc::ptr_eq(indexed, entry) => {},
                    _ => {
                        failure = Some(InvariantError::new(format!(
                            "entry in slot {} missing from global index",
                            bucket.slot()
                        )));
                        return;
                    },
                }
            }
        });

        if let Some(err) = failure {
            return Err(err);
        }
        if bucketed != index.len() {
            return Err(InvariantError::new(format!(
                "global index holds {} entries but buckets hold {}",
                index.len(),
                bucketed
            )));
        }
        if self.core.len() != index.len() {
            return Err(InvariantError::new(format!(
                "cached length {} differs from index length {}",
                self.core.len(),
                index.len()
            )));
        }
        Ok(())
    }
}

#[cfg(feature = "metrics")]
impl<K, V> ShardedLru<K, V>
where
    K: Eq + Hash,
{
    /// Counters plus current gauges.
    pub fn metrics_snapshot(&self) -> ShardedLruMetricsSnapshot {
        ShardedLruMetricsSnapshot {
            cache_len: self.len(),
            capacity: self.capacity(),
            occupied_buckets: self.occupied_buckets(),
            ..self.core.metrics.counters()
        }
    }
}

#[cfg(feature = "metrics")]
impl<K, V> MetricsSnapshotProvider<ShardedLruMetricsSnapshot> for ShardedLru<K, V>
where
    K: Eq + Hash,
{
    fn snapshot(&self) -> ShardedLruMetricsSnapshot {
        self.metrics_snapshot()
    }
}

impl<K, V> fmt::Debug for ShardedLru<K, V>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShardedLru")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("min_flush_size", &self.min_flush_size())
            .field("flush_mode", &self.flush_mode())
            .finish_non_exhaustive()
    }
}

impl<K, V> Extend<(K, V)> for &ShardedLru<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        self.put_all(iter);
    }
}

impl<K, V> ConcurrentMap<K, V> for ShardedLru<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone + PartialEq,
{
    fn len(&self) -> usize {
        ShardedLru::len(self)
    }

    fn contains_key(&self, key: &K) -> bool {
        ShardedLru::contains_key(self, key)
    }

    fn contains_value(&self, value: &V) -> bool {
        ShardedLru::contains_value(self, value)
    }

    fn get(&self, key: &K) -> Option<V> {
        ShardedLru::get(self, key)
    }

    fn put(&self, key: K, value: V) -> Option<V> {
        ShardedLru::put(self, key, value)
    }

    fn remove(&self, key: &K) -> Option<V> {
        ShardedLru::remove(self, key)
    }

    fn clear(&self) {
        ShardedLru::clear(self)
    }

    fn keys(&self) -> Vec<K> {
        ShardedLru::keys(self)
    }

    fn values(&self) -> Vec<V> {
        ShardedLru::values(self)
    }

    fn entries(&self) -> Vec<(K, V)> {
        ShardedLru::entries(self)
    }
}

impl<K, V> ConcurrentCache for ShardedLru<K, V>
where
    K: Send + Sync,
    V: Send + Sync,
{
}

#[cfg(test)]
mod tests {
    use super::flush::Trigger;
    use super::*;

    mod basic_behavior {
        use super::*;

        #[test]
        fn new_cache_is_empty() {
            let cache: ShardedLru<u32, u32> = ShardedLru::new(10);
            assert!(cache.is_empty());
            assert_eq!(cache.capacity(), 10);
            assert_eq!(cache.min_flush_size(), DEFAULT_MIN_FLUSH_SIZE);
            assert_eq!(cache.load_factor(), DEFAULT_LOAD_FACTOR);
            assert_eq!(cache.flush_mode(), FlushMode::Synchronous);
            assert_eq!(cache.table_len(), 14);
            assert_eq!(cache.oldest_touch(), None);
        }

        #[test]
        fn get_with_may_read_len_while_writers_hold_the_index() {
            use std::sync::atomic::AtomicBool;
            use std::thread;

            let cache = Arc::new(ShardedLru::<u32, u32>::with_flush_size(10_000, 0));
            cache.put(0, 0);
            let done = Arc::new(AtomicBool::new(false));
            let writer = {
                let cache = Arc::clone(&cache);
                let done = Arc::clone(&done);
                thread::spawn(move || {
                    let mut key = 1;
                    while !done.load(Ordering::Acquire) {
                        cache.put(key % 5_000 + 1, key);
                        key += 1;
                    }
                })
            };

            for _ in 0..10_000 {
                let seen = cache.get_with(&0, |_| cache.len());
                assert!(seen.is_some_and(|len| len >= 1));
            }
            done.store(true, Ordering::Release);
            writer.join().unwrap();
            cache.check_invariants().unwrap();
        }

        #[test]
        fn put_returns_previous_value() {
            let cache = ShardedLru::new(10);
            assert_eq!(cache.put("a", 1), None);
            assert_eq!(cache.put("a", 2), Some(1));
            assert_eq!(cache.get("a"), Some(2));
            assert_eq!(cache.len(), 1);
        }

        #[test]
        fn remove_is_idempotent() {
            let cache = ShardedLru::new(10);
            cache.put(1, "one");
            assert_eq!(cache.remove(&1), Some("one"));
            assert_eq!(cache.remove(&1), None);
            assert_eq!(cache.get(&1), None);
            assert!(cache.is_empty());
            assert_eq!(cache.occupied_buckets(), 0);
        }

        #[test]
        fn peek_does_not_renew() {
            let cache = ShardedLru::with_flush_size(2, 0);
            cache.put(1, 1);
            cache.put(2, 2);
            assert_eq!(cache.peek(&1), Some(1));
            cache.put(3, 3);
            assert!(!cache.contains_key(&1));
            assert_eq!(cache.peek(&1), None);
        }

        #[test]
        fn absent_key_and_value_are_distinct_from_missing() {
            let cache: ShardedLru<Option<&str>, Option<u32>> = ShardedLru::new(10);
            assert_eq!(cache.put(None, None), None);
            assert!(cache.contains_key(&None::<&str>));
            assert_eq!(cache.get(&None::<&str>), Some(None));
            assert!(cache.contains_value(&None));
            assert_eq!(cache.get(&Some("x")), None);
        }

        #[test]
        fn snapshots_reflect_contents() {
            let cache = ShardedLru::new(10);
            cache.put_all([(1, "a"), (2, "b"), (3, "c")]);
            let mut keys = cache.keys();
            keys.sort_unstable();
            assert_eq!(keys, vec![1, 2, 3]);
            let mut values = cache.values();
            values.sort_unstable();
            assert_eq!(values, vec!["a", "b", "c"]);
            let mut entries = cache.entries();
            entries.sort_unstable();
            assert_eq!(entries, vec![(1, "a"), (2, "b"), (3, "c")]);
        }

        #[test]
        fn extend_puts_each_pair() {
            let cache = ShardedLru::new(10);
            (&cache).extend((0..4).map(|i| (i, i * 10)));
            assert_eq!(cache.len(), 4);
            assert_eq!(cache.get(&3), Some(30));
        }

        #[test]
        fn debug_shows_configuration() {
            let cache: ShardedLru<u8, u8> = ShardedLru::with_flush_size(4, 2);
            let text = format!("{:?}", cache);
            assert!(text.contains("capacity: 4"));
            assert!(text.contains("min_flush_size: 2"));
            assert!(text.contains("Synchronous"));
        }
    }

    mod recency {
        use super::*;

        #[test]
        fn touch_marks_bucket_for_lazy_recompute() {
            let cache = ShardedLru::new(10);
            cache.put("a", 1);
            let first = cache.oldest_touch().unwrap();

            cache.put("b", 2);
            assert_eq!(cache.oldest_touch(), Some(first));

            cache.get("a");
            let renewed = cache.oldest_touch().unwrap();
            assert!(renewed > first);
            cache.check_invariants().unwrap();
        }

        #[test]
        fn update_renews_entry() {
            let cache = ShardedLru::with_flush_size(2, 0);
            cache.put(1, "a");
            cache.put(2, "b");
            cache.put(1, "a2");
            cache.put(3, "c");
            assert_eq!(cache.get(&1), Some("a2"));
            assert_eq!(cache.get(&2), None);
        }
    }

    mod flushing {
        use super::*;

        #[test]
        fn synchronous_trigger_reports_evictions() {
            let cache = ShardedLru::with_flush_size(3, 1);
            for i in 0..4 {
                cache.put(i, i);
            }
            assert_eq!(cache.len(), 4);
            // One more crosses capacity + slack.
            cache.put(4, 4);
            assert_eq!(cache.len(), 3);
            assert_eq!(cache.flush.after_insert(&*cache.core), Trigger::NotNeeded);
        }

        #[test]
        fn flush_ignores_slack() {
            let cache = ShardedLru::with_flush_size(5, 100);
            for i in 0..50 {
                cache.put(i, i);
            }
            assert_eq!(cache.flush(), 45);
            assert_eq!(cache.len(), 5);
            assert_eq!(cache.flush(), 0);
        }

        #[test]
        fn clear_drops_everything() {
            let cache = ShardedLru::new(10);
            for i in 0..10 {
                cache.put(i, i);
            }
            cache.clear();
            assert!(cache.is_empty());
            assert_eq!(cache.occupied_buckets(), 0);
            for i in 0..10 {
                assert_eq!(cache.get(&i), None);
            }
            cache.check_invariants().unwrap();
        }
    }

    #[cfg(feature = "metrics")]
    mod metrics {
        use super::*;

        #[test]
        fn counters_follow_operations() {
            let cache = ShardedLru::with_flush_size(2, 0);
            cache.put(1, 1);
            cache.put(1, 2);
            cache.put(2, 2);
            cache.put(3, 3);
            cache.get(&3);
            cache.get(&99);
            cache.remove(&3);
            cache.clear();

            let snapshot = cache.metrics_snapshot();
            assert_eq!(snapshot.insert_new, 3);
            assert_eq!(snapshot.insert_updates, 1);
            assert_eq!(snapshot.get_hits, 1);
            assert_eq!(snapshot.get_misses, 1);
            assert_eq!(snapshot.removes, 1);
            assert_eq!(snapshot.clears, 1);
            assert_eq!(snapshot.flush_triggers, 1);
            assert_eq!(snapshot.eviction_passes, 1);
            assert_eq!(snapshot.evicted_entries, 1);
            assert_eq!(snapshot.cache_len, 0);
            assert_eq!(snapshot.capacity, 2);
        }

        #[test]
        fn bucket_recompute_counted_once_per_touch() {
            let cache = ShardedLru::new(10);
            cache.put("a", 1);
            cache.oldest_touch();
            cache.oldest_touch();
            assert_eq!(cache.metrics_snapshot().bucket_recomputes, 1);
        }
    }
}
