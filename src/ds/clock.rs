//! Strictly monotonic nanosecond stamps for recency tracking.
//!
//! Every touch of an entry records a stamp from the cache's [`TouchClock`].
//! Stamps are nanoseconds elapsed since the clock was created, forced to be
//! strictly increasing across all callers: two touches never share a stamp,
//! even when the underlying monotonic clock has coarser resolution than the
//! rate of calls.
//!
//! ## Cost
//!
//! [`TouchClock::now`] is a compare-and-swap loop on one `AtomicU64` shared
//! by the whole cache. Every `get` and `put` calls it, so under heavy
//! multi-core read traffic that cache line bounces between cores and CAS
//! retries grow with contention. Reads still take no cache-wide lock; the
//! clock is the one shared write on the read path.
//!
//! ## Example Usage
//!
//! ```
//! use shardlru::ds::TouchClock;
//!
//! let clock = TouchClock::new();
//! let a = clock.now();
//! let b = clock.now();
//! assert!(b > a);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Source of strictly increasing recency stamps.
#[derive(Debug)]
pub struct TouchClock {
    origin: Instant,
    last: AtomicU64,
}

impl TouchClock {
    /// Creates a clock whose stamps count from this instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            last: AtomicU64::new(0),
        }
    }

    /// Returns a stamp greater than every stamp previously returned.
    #[inline]
    pub fn now(&self) -> u64 {
        let elapsed = self.origin.elapsed().as_nanos() as u64;
        let mut last = self.last.load(Ordering::Relaxed);
        loop {
            let next = elapsed.max(last + 1);
            match self
                .last
                .compare_exchange_weak(last, next, Ordering::AcqRel, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(observed) => last = observed,
            }
        }
    }
}

impl Default for TouchClock {
    fn default() -> Self {
        Self::new()
    }
}
