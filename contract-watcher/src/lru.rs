use linked_hash_set::LinkedHashSet;
use std::{borrow::Borrow, hash::Hash, num::NonZeroUsize};

/// Bounded set that forgets its least recently inserted entry once `limit` is exceeded.
///
/// Only used to remember which schemas, tables and ledger columns are known to exist,
/// so a miss is always safe: it just costs one more existence check against the store.
#[derive(Debug, Clone)]
pub struct LruCache<T: Hash + Eq> {
    limit: NonZeroUsize,
    inner: LinkedHashSet<T>,
}

impl<T: Hash + Eq> LruCache<T> {
    pub fn new(limit: NonZeroUsize) -> Self {
        Self {
            inner: LinkedHashSet::new(),
            limit,
        }
    }

    /// Returns `true` if the entry was not cached before.
    /// Re-inserting a cached entry marks it as the most recent one.
    pub fn insert(&mut self, entry: T) -> bool {
        if self.inner.remove(&entry) {
            self.inner.insert(entry);
            return false;
        }

        self.inner.insert(entry);
        if self.inner.len() > self.limit.get() {
            self.inner.pop_front();
        }

        true
    }

    pub fn contains<Q: ?Sized>(&self, value: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Hash + Eq,
    {
        self.inner.contains(value)
    }
}

impl<T: Hash + Eq> Extend<T> for LruCache<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for entry in iter {
            self.insert(entry);
        }
    }
}

/// Builds a cache from a constant, non-zero capacity.
pub(crate) fn bounded<T: Hash + Eq>(limit: usize) -> LruCache<T> {
    LruCache::new(NonZeroUsize::new(limit).unwrap_or(NonZeroUsize::MIN))
}
