//! Fixed-size table of lazily created buckets.
//!
//! ## Architecture
//!
//! ```text
//!   slots: Box<[Mutex<Option<Bucket>>]>      len = ceil(capacity / load_factor)
//!
//!   ┌──────┬──────┬──────┬──────┬──────┬──────┐
//!   │ None │  B1  │ None │  B3  │  B4  │ None │
//!   └──────┴──┬───┴──────┴──┬───┴──┬───┴──────┘
//!             │             │      │
//!          {k1,k7}        {k3}   {k4,k9,k2}
//! ```
//!
//! Each slot carries its own mutex, which doubles as the bucket lock: a read
//! only locks the slot its key maps to. A bucket is created when the first
//! key lands in an empty slot and the slot returns to `None` when the
//! bucket's last entry is removed.
//!
//! ## Operations
//!
//! | Operation          | Description                               | Locks      |
//! |--------------------|-------------------------------------------|------------|
//! | `with_bucket`      | Run a closure on an existing bucket       | one slot   |
//! | `with_bucket_mut`  | Run a closure on a bucket, creating it    | one slot   |
//! | `remove_from_slot` | Remove a key, dropping an emptied bucket  | one slot   |
//! | `retain_entries`   | Filter entries by identity, no hashing    | all, 1 by 1 |
//! | `clear`            | Reset every slot to `None`                | all, 1 by 1 |

use std::borrow::Borrow;
use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::ds::bucket::{Bucket, Entry};
use crate::ds::slot::SlotSelector;

/// Longest table a cache may allocate.
pub const MAX_TABLE_LEN: usize = 1 << 28;

/// Table length for a capacity and load factor: `ceil(capacity / load_factor)`,
/// at least 1. Saturates for degenerate inputs; see [`checked_len_for`].
pub fn len_for(capacity: usize, load_factor: f32) -> usize {
    let len = (capacity as f64 / f64::from(load_factor)).ceil();
    if len.is_finite() && len >= 1.0 {
        len as usize
    } else {
        1
    }
}

/// Like [`len_for`], but `None` when the load factor is not a positive
/// finite number or the table would exceed [`MAX_TABLE_LEN`] slots.
pub fn checked_len_for(capacity: usize, load_factor: f32) -> Option<usize> {
    if !load_factor.is_finite() || load_factor <= 0.0 {
        return None;
    }
    let len = (capacity as f64 / f64::from(load_factor)).ceil();
    if len > MAX_TABLE_LEN as f64 {
        return None;
    }
    Some(len_for(capacity, load_factor))
}

/// Slot array of optional buckets.
#[derive(Debug)]
pub struct HashTable<K, V> {
    selector: SlotSelector,
    slots: Box<[Mutex<Option<Bucket<K, V>>>]>,
}

impl<K, V> HashTable<K, V>
where
    K: Eq + Hash,
{
    /// Creates a table with `len` empty slots (at least 1).
    pub fn new(len: usize) -> Self {
        let selector = SlotSelector::new(len);
        let slots = (0..selector.slot_count())
            .map(|_| Mutex::new(None))
            .collect();
        Self { selector, slots }
    }

    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn slot_for<Q>(&self, key: &Q) -> usize
    where
        Q: Hash + ?Sized,
    {
        self.selector.slot_for_key(key)
    }

    /// Runs `f` on the bucket at `slot` if one exists.
    pub fn with_bucket<R>(&self, slot: usize, f: impl FnOnce(&mut Bucket<K, V>) -> R) -> Option<R> {
        let mut guard = self.slots[slot].lock();
        guard.as_mut().map(f)
    }

    /// Runs `f` on the bucket at `slot`, creating an empty one first if needed.
    pub fn with_bucket_mut<R>(&self, slot: usize, f: impl FnOnce(&mut Bucket<K, V>) -> R) -> R {
        let mut guard = self.slots[slot].lock();
        let bucket = guard.get_or_insert_with(|| Bucket::new(slot));
        f(bucket)
    }

    /// Removes `key` from the bucket at `slot`, clearing the slot if the
    /// bucket becomes empty.
    pub fn remove_from_slot<Q>(&self, slot: usize, key: &Q) -> Option<Arc<Entry<K, V>>>
    where
        K: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let mut guard = self.slots[slot].lock();
        let bucket = guard.as_mut()?;
        let removed = bucket.remove(key);
        if bucket.is_empty() {
            *guard = None;
        }
        removed
    }

    /// Drops every bucket.
    pub fn clear(&self) {
        for slot in self.slots.iter() {
            *slot.lock() = None;
        }
    }

    /// Number of slots currently holding a bucket.
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.lock().is_some()).count()
    }

    /// Drops every entry for which `keep` returns `false`, then clears any
    /// slot whose bucket became empty. Returns the number of entries dropped.
    ///
    /// Keys are never hashed or compared.
    pub fn retain_entries(&self, mut keep: impl FnMut(&Arc<Entry<K, V>>) -> bool) -> usize {
        let mut dropped = 0;
        for slot in self.slots.iter() {
            let mut guard = slot.lock();
            let Some(bucket) = guard.as_mut() else {
                continue;
            };
            dropped += bucket.retain_entries(&mut keep);
            if bucket.is_empty() {
                *guard = None;
            }
        }
        dropped
    }

    /// Visits each occupied bucket in slot order, one slot lock at a time.
    pub fn for_each_bucket(&self, mut f: impl FnMut(&mut Bucket<K, V>)) {
        for slot in self.slots.iter() {
            if let Some(bucket) = slot.lock().as_mut() {
                f(bucket);
            }
        }
    }
}
