//! # Cache Traits
//!
//! The map contract a shared cache offers to its callers, independent of how
//! it decides what to evict.
//!
//! ## Architecture
//!
//! ```text
//!   ┌─────────────────────────────────────────┐
//!   │          ConcurrentMap<K, V>            │
//!   │                                         │
//!   │  put(&, K, V) → Option<V>               │
//!   │  get(&, &K) → Option<V>                 │
//!   │  remove(&, &K) → Option<V>              │
//!   │  contains_key / contains_value          │
//!   │  len / is_empty / clear                 │
//!   │  keys / values / entries  (snapshots)   │
//!   │  put_all                                │
//!   └──────────────────┬──────────────────────┘
//!                      │ + Send + Sync
//!                      ▼
//!   ┌─────────────────────────────────────────┐
//!   │ ConcurrentCache (marker)                │
//!   └─────────────────────────────────────────┘
//! ```
//!
//! Every method takes `&self`: implementations synchronize internally, and
//! values are returned by clone because another thread may replace or evict
//! an entry as soon as the call returns.
//!
//! ## Semantics Under Eviction
//!
//! A cache may drop any entry at any time, so "put then get" is not
//! guaranteed to return the value. `len()` may transiently exceed the
//! configured capacity by the implementation's flush slack.

/// Map operations shared by thread-safe caches.
///
/// # Example
///
/// ```
/// use shardlru::traits::ConcurrentMap;
/// use shardlru::ShardedLru;
///
/// fn warm<C: ConcurrentMap<u64, String>>(cache: &C, data: &[(u64, &str)]) {
///     cache.put_all(data.iter().map(|(k, v)| (*k, v.to_string())));
/// }
///
/// let cache = ShardedLru::new(100);
/// warm(&cache, &[(1, "one"), (2, "two")]);
/// assert_eq!(ConcurrentMap::len(&cache), 2);
/// ```
pub trait ConcurrentMap<K, V> {
    /// Number of live entries.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn contains_key(&self, key: &K) -> bool;

    /// Returns `true` if any entry holds `value`. May be O(n).
    fn contains_value(&self, value: &V) -> bool;

    /// Returns a clone of the value and records the access.
    fn get(&self, key: &K) -> Option<V>;

    /// Inserts or replaces, returning the previous value.
    fn put(&self, key: K, value: V) -> Option<V>;

    fn remove(&self, key: &K) -> Option<V>;

    /// Inserts each pair in turn; not atomic as a whole.
    fn put_all<I>(&self, pairs: I)
    where
        I: IntoIterator<Item = (K, V)>,
        Self: Sized,
    {
        for (key, value) in pairs {
            self.put(key, value);
        }
    }

    fn clear(&self);

    /// Point-in-time copy of the keys.
    fn keys(&self) -> Vec<K>;

    /// Point-in-time copy of the values.
    fn values(&self) -> Vec<V>;

    /// Point-in-time copy of the pairs.
    fn entries(&self) -> Vec<(K, V)>;
}

/// Marker trait for caches that are safe to share across threads.
///
/// Usage: `fn serve<C: ConcurrentMap<K, V> + ConcurrentCache>(c: Arc<C>)`.
pub trait ConcurrentCache: Send + Sync {}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use super::*;

    /// Unbounded reference implementation for checking default methods.
    #[derive(Default)]
    struct MapOnly(Mutex<HashMap<u32, u32>>);

    impl ConcurrentMap<u32, u32> for MapOnly {
        fn len(&self) -> usize {
            self.0.lock().unwrap().len()
        }
        fn contains_key(&self, key: &u32) -> bool {
            self.0.lock().unwrap().contains_key(key)
        }
        fn contains_value(&self, value: &u32) -> bool {
            self.0.lock().unwrap().values().any(|v| v == value)
        }
        fn get(&self, key: &u32) -> Option<u32> {
            self.0.lock().unwrap().get(key).copied()
        }
        fn put(&self, key: u32, value: u32) -> Option<u32> {
            self.0.lock().unwrap().insert(key, value)
        }
        fn remove(&self, key: &u32) -> Option<u32> {
            self.0.lock().unwrap().remove(key)
        }
        fn clear(&self) {
            self.0.lock().unwrap().clear()
        }
        fn keys(&self) -> Vec<u32> {
            self.0.lock().unwrap().keys().copied().collect()
        }
        fn values(&self) -> Vec<u32> {
            self.0.lock().unwrap().values().copied().collect()
        }
        fn entries(&self) -> Vec<(u32, u32)> {
            self.0.lock().unwrap().iter().map(|(k, v)| (*k, *v)).collect()
        }
    }

    impl ConcurrentCache for MapOnly {}

    fn assert_concurrent<C: ConcurrentCache>(_: &C) {}

    #[test]
    fn default_put_all_and_is_empty() {
        let map = MapOnly::default();
        assert!(map.is_empty());
        map.put_all([(1, 10), (2, 20), (1, 11)]);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get(&1), Some(11));
        assert_concurrent(&map);
    }

    #[test]
    fn sharded_lru_is_a_concurrent_map() {
        let cache = crate::ShardedLru::<u32, u32>::new(10);
        assert_concurrent(&cache);
        ConcurrentMap::put(&cache, 1, 1);
        assert_eq!(ConcurrentMap::len(&cache), 1);
        assert!(ConcurrentMap::contains_value(&cache, &1));
    }
}
