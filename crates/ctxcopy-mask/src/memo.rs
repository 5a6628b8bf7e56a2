//! Size-bounded memoization owned by a single adapter instance

use lru::LruCache;
use std::borrow::Borrow;
use std::hash::Hash;
use std::num::NonZeroUsize;

/// Default number of entries kept per adapter pass
pub const DEFAULT_MEMO_CAPACITY: usize = 256;

/// LRU-backed cache of pure function results.
///
/// Entries are an optimization only: evicting one never changes the result
/// of a lookup, it just recomputes it.
#[derive(Debug)]
pub struct BoundedMemo<K: Hash + Eq, V> {
    cache: LruCache<K, V>,
    hits: u64,
    misses: u64,
}

impl<K: Hash + Eq, V: Clone> BoundedMemo<K, V> {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Return the cached value for `key`, computing and storing it on a miss
    pub fn get_or_insert_with<Q, F>(&mut self, key: &Q, compute: F) -> V
    where
        K: Borrow<Q>,
        Q: ToOwned<Owned = K> + Hash + Eq + ?Sized,
        F: FnOnce() -> V,
    {
        if let Some(value) = self.cache.get(key) {
            self.hits += 1;
            return value.clone();
        }

        self.misses += 1;
        let value = compute();
        self.cache.put(key.to_owned(), value.clone());
        value
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }

    /// (hits, misses) since creation
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

impl<K: Hash + Eq, V: Clone> Default for BoundedMemo<K, V> {
    fn default() -> Self {
        Self::new(DEFAULT_MEMO_CAPACITY)
    }
}
