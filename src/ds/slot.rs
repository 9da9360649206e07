//! Key-to-slot mapping for the bucket table.
//!
//! [`SlotSelector`] turns any `Hash`able key into an index in `[0, slots)`.
//! Keys are hashed with the configured [`BuildHasher`] (FxHash by default),
//! folded to a signed 32-bit code, and reduced with `abs(code) % slots`.
//!
//! ```text
//!   key ──► hasher ──► u64 ──fold──► i32 code
//!                                        │
//!                      code == i32::MIN ? 0 : code
//!                                        │
//!                                        ▼
//!                              |code| % slots ──► slot index
//! ```
//!
//! The `i32::MIN` remap keeps `abs` from overflowing. Keys whose hash code is
//! 0 (for example `None` under FxHash) land in slot 0.
//!
//! ## Example Usage
//!
//! ```
//! use shardlru::ds::SlotSelector;
//!
//! let selector = SlotSelector::new(16);
//! let slot = selector.slot_for_key(&"user:123");
//! assert!(slot < 16);
//! assert_eq!(selector.slot_for_key(&"user:123"), slot);
//! ```

use std::hash::{BuildHasher, Hash};

use rustc_hash::FxBuildHasher;

/// Deterministic key-to-slot selector.
#[derive(Clone)]
pub struct SlotSelector<S = FxBuildHasher> {
    slots: usize,
    hasher: S,
}

impl<S> std::fmt::Debug for SlotSelector<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlotSelector")
            .field("slots", &self.slots)
            .finish_non_exhaustive()
    }
}

impl SlotSelector<FxBuildHasher> {
    /// Creates a selector over `slots` slots using FxHash.
    ///
    /// The slot count is clamped to at least 1.
    pub fn new(slots: usize) -> Self {
        Self::with_hasher(slots, FxBuildHasher)
    }
}

impl<S: BuildHasher> SlotSelector<S> {
    /// Creates a selector with a custom hasher.
    pub fn with_hasher(slots: usize, hasher: S) -> Self {
        Self {
            slots: slots.max(1),
            hasher,
        }
    }

    /// Returns the number of slots.
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slots
    }

    /// Returns the signed 32-bit hash code of `key`.
    #[inline]
    pub fn hash_code<K: Hash + ?Sized>(&self, key: &K) -> i32 {
        let full = self.hasher.hash_one(key);
        ((full >> 32) ^ full) as u32 as i32
    }

    /// Maps a key to its slot index.
    #[inline]
    pub fn slot_for_key<K: Hash + ?Sized>(&self, key: &K) -> usize {
        self.slot_for_code(self.hash_code(key))
    }

    /// Maps a precomputed hash code to its slot index.
    #[inline]
    pub fn slot_for_code(&self, code: i32) -> usize {
        let code = if code == i32::MIN { 0 } else { code };
        code.unsigned_abs() as usize % self.slots
    }
}
