//! Bounded selection of the `k` oldest items from a stream.
//!
//! Instead of sorting all `n` candidates, [`OldestK`] keeps a max-heap of at
//! most `k` items keyed by stamp. Each new item is pushed; when the heap
//! holds more than `k`, the youngest item is popped and discarded. After the
//! stream ends the heap holds exactly the `min(k, n)` oldest items seen.
//!
//! ## Architecture
//!
//! ```text
//!   k = 3, stream: 40 10 70 20 90 5
//!
//!   push 40   heap: [40]
//!   push 10   heap: [40 10]
//!   push 70   heap: [70 40 10]
//!   push 20   heap: [70 40 20 10] ─► pop 70 ─► [40 20 10]
//!   push 90   heap: [90 40 20 10] ─► pop 90 ─► [40 20 10]
//!   push 5    heap: [40 20 10 5]  ─► pop 40 ─► [20 10 5]
//!
//!   result: {5, 10, 20}
//! ```
//!
//! ## Operations
//!
//! | Operation     | Description                        | Complexity |
//! |---------------|------------------------------------|------------|
//! | `offer`       | Consider one item                  | O(log k)   |
//! | `offer_with`  | Same, building the item lazily     | O(log k)   |
//! | `youngest`    | Stamp of the youngest kept item    | O(1)       |
//! | `into_oldest` | Drain the kept items, oldest first | O(k log k) |
//!
//! Items with equal stamps are ordered arbitrarily.
//!
//! ## Example Usage
//!
//! ```
//! use shardlru::ds::OldestK;
//!
//! let mut oldest = OldestK::new(2);
//! for (stamp, name) in [(30, "c"), (10, "a"), (20, "b")] {
//!     oldest.offer(stamp, name);
//! }
//! let names: Vec<_> = oldest.into_oldest().into_iter().map(|(_, n)| n).collect();
//! assert_eq!(names, vec!["a", "b"]);
//! ```

use std::cmp::Ordering;
use std::collections::BinaryHeap;

struct Candidate<T> {
    stamp: u64,
    item: T,
}

impl<T> PartialEq for Candidate<T> {
    fn eq(&self, other: &Self) -> bool {
        self.stamp == other.stamp
    }
}

impl<T> Eq for Candidate<T> {}

impl<T> PartialOrd for Candidate<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Candidate<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.stamp.cmp(&other.stamp)
    }
}

/// Keeps the `k` smallest-stamped items offered to it.
pub struct OldestK<T> {
    limit: usize,
    heap: BinaryHeap<Candidate<T>>,
    offered: usize,
}

impl<T> OldestK<T> {
    /// Creates a selector that keeps at most `limit` items.
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            heap: BinaryHeap::with_capacity(limit.saturating_add(1).min(1 << 16)),
            offered: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Number of items offered so far.
    #[inline]
    pub fn offered(&self) -> usize {
        self.offered
    }

    /// Stamp of the youngest item currently kept.
    #[inline]
    pub fn youngest(&self) -> Option<u64> {
        self.heap.peek().map(|c| c.stamp)
    }

    /// Considers one item.
    pub fn offer(&mut self, stamp: u64, item: T) {
        self.offer_with(stamp, || item);
    }

    /// Considers one item, building it only if it is kept.
    pub fn offer_with(&mut self, stamp: u64, item: impl FnOnce() -> T) -> bool {
        self.offered += 1;
        if self.limit == 0 {
            return false;
        }
        // A full heap cannot accept anything younger than its youngest.
        if self.heap.len() == self.limit && self.youngest().is_some_and(|y| stamp >= y) {
            return false;
        }
        self.heap.push(Candidate {
            stamp,
            item: item(),
        });
        if self.heap.len() > self.limit {
            self.heap.pop();
        }
        true
    }

    /// Returns the kept items ordered oldest first.
    pub fn into_oldest(self) -> Vec<(u64, T)> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|c| (c.stamp, c.item))
            .collect()
    }
}

impl<T> std::fmt::Debug for OldestK<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OldestK")
            .field("limit", &self.limit)
            .field("len", &self.heap.len())
            .field("youngest", &self.youngest())
            .finish()
    }
}
