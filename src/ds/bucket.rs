//! Entries and the per-slot buckets that group them.
//!
//! ## Architecture
//!
//! ```text
//!   Bucket (slot 3)
//!   ┌────────────────────────────────────────────────────────┐
//!   │ entries: FxHashMap<K, Arc<Entry>>                      │
//!   │   "a" ─► Entry { value, last_touch: 120, slot: 3 }     │
//!   │   "q" ─► Entry { value, last_touch:  85, slot: 3 }     │
//!   │                                                        │
//!   │ oldest_touch: 85   dirty: false                        │
//!   └────────────────────────────────────────────────────────┘
//!
//!   touch("a") ──► last_touch = now; dirty = true   (no rescan)
//!   oldest_touch() while dirty ──► rescan, cache, dirty = false
//! ```
//!
//! An [`Entry`] is shared (`Arc`) between its bucket and the cache's global
//! index. Its `slot` field is a plain index naming the owning bucket, so the
//! eviction pass can reach the bucket without rehashing the key.
//!
//! ## Thread Safety
//!
//! `Bucket` is not synchronized on its own; the hash table guards each slot
//! with a mutex. `Entry` stamps are atomics and may be written by concurrent
//! readers of the same key (last write wins). Entry values sit behind their
//! own mutex so the global index can read them without taking slot locks.

use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

/// A cached key/value pair with its last-touch stamp.
#[derive(Debug)]
pub struct Entry<K, V> {
    key: K,
    value: Mutex<V>,
    last_touch: AtomicU64,
    slot: usize,
}

impl<K, V> Entry<K, V> {
    /// Creates an entry owned by the bucket at `slot`, touched at `stamp`.
    pub fn new(key: K, value: V, slot: usize, stamp: u64) -> Self {
        Self {
            key,
            value: Mutex::new(value),
            last_touch: AtomicU64::new(stamp),
            slot,
        }
    }

    #[inline]
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Slot index of the owning bucket.
    #[inline]
    pub fn slot(&self) -> usize {
        self.slot
    }

    #[inline]
    pub fn last_touch(&self) -> u64 {
        self.last_touch.load(Ordering::Relaxed)
    }

    /// Records an access at `stamp`. Does not update the bucket; see
    /// [`Bucket::touch`].
    #[inline]
    pub fn set_last_touch(&self, stamp: u64) {
        self.last_touch.store(stamp, Ordering::Relaxed);
    }

    /// Replaces the value and returns the previous one.
    pub fn replace_value(&self, value: V) -> V {
        std::mem::replace(&mut *self.value.lock(), value)
    }

    /// Runs `f` with a reference to the value.
    pub fn with_value<R>(&self, f: impl FnOnce(&V) -> R) -> R {
        f(&self.value.lock())
    }
}

impl<K, V: Clone> Entry<K, V> {
    /// Returns a clone of the value.
    pub fn value(&self) -> V {
        self.value.lock().clone()
    }
}

impl<K, V> Entry<K, V> {
    /// Consumes the entry if this is the last handle, returning its value.
    pub fn into_value(entry: Arc<Self>) -> Result<V, Arc<Self>> {
        Arc::try_unwrap(entry).map(|e| e.value.into_inner())
    }
}

/// All entries whose keys map to one table slot.
#[derive(Debug)]
pub struct Bucket<K, V> {
    slot: usize,
    entries: FxHashMap<K, Arc<Entry<K, V>>>,
    oldest_touch: u64,
    dirty: bool,
}

impl<K, V> Bucket<K, V>
where
    K: Eq + Hash,
{
    /// Creates an empty bucket for `slot`.
    pub fn new(slot: usize) -> Self {
        Self {
            slot,
            entries: FxHashMap::default(),
            oldest_touch: 0,
            dirty: false,
        }
    }

    #[inline]
    pub fn slot(&self) -> usize {
        self.slot
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&Arc<Entry<K, V>>>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        self.entries.get(key)
    }

    /// Adds a freshly created entry. The bucket's oldest stamp goes stale.
    pub fn insert(&mut self, entry: Arc<Entry<K, V>>)
    where
        K: Clone,
    {
        debug_assert_eq!(entry.slot(), self.slot);
        self.entries.insert(entry.key().clone(), entry);
        self.dirty = true;
    }

    pub fn remove<Q>(&mut self, key: &Q) -> Option<Arc<Entry<K, V>>>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let removed = self.entries.remove(key);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    /// Drops entries for which `keep` returns `false` without hashing keys.
    /// Returns the number dropped.
    pub fn retain_entries(&mut self, mut keep: impl FnMut(&Arc<Entry<K, V>>) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| keep(entry));
        let dropped = before - self.entries.len();
        if dropped > 0 {
            self.dirty = true;
        }
        dropped
    }

    /// Stamps the entry for `key` and marks the bucket's oldest stamp stale.
    ///
    /// The minimum is recomputed on the next [`oldest_touch`](Self::oldest_touch)
    /// call, so repeated touches of a hot bucket cost O(1) each.
    #[inline]
    pub fn touch<Q>(&mut self, key: &Q, stamp: u64) -> Option<&Arc<Entry<K, V>>>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let entry = self.entries.get(key)?;
        entry.set_last_touch(stamp);
        self.dirty = true;
        Some(entry)
    }

    /// Returns the smallest last-touch stamp in the bucket (0 when empty).
    ///
    /// Rescans the entries only when a touch or structural change happened
    /// since the previous call.
    pub fn oldest_touch(&mut self) -> u64 {
        if self.dirty {
            self.oldest_touch = self.scan_oldest();
            self.dirty = false;
        }
        self.oldest_touch
    }

    /// Like [`oldest_touch`](Self::oldest_touch) but reports whether a
    /// rescan happened.
    pub fn oldest_touch_recomputed(&mut self) -> (u64, bool) {
        let recomputed = self.dirty;
        (self.oldest_touch(), recomputed)
    }

    /// Cached stamp, possibly stale.
    #[inline]
    pub fn cached_oldest_touch(&self) -> u64 {
        self.oldest_touch
    }

    /// True minimum over the current entries, ignoring the cache.
    pub fn scan_oldest(&self) -> u64 {
        self.entries
            .values()
            .map(|entry| entry.last_touch())
            .min()
            .unwrap_or(0)
    }

    pub fn entries(&self) -> impl Iterator<Item = &Arc<Entry<K, V>>> {
        self.entries.values()
    }
}
