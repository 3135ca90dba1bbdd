//! Read cache for tree nodes and data blocks.
//!
//! A size-bounded LRU keyed by record index. Entries are added on read miss
//! and leave through eviction, or all at once when the storage is closed or
//! destroyed. While open, the log is append-only, so a cached record is never
//! stale as long as the caller keeps that contract.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;

/// Bounded index → record cache private to one storage instance
pub struct ReadCache<V> {
    inner: Mutex<LruCache<u64, V>>,
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub len: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> Option<f64> {
        let total = self.hits.saturating_add(self.misses);
        if total == 0 {
            return None;
        }
        Some(self.hits as f64 / total as f64)
    }
}

impl<V: Clone> ReadCache<V> {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            inserts: AtomicU64::new(0),
        }
    }

    /// Build a cache from an optional capacity; `None` or zero disables it.
    pub fn with_capacity(capacity: Option<usize>) -> Option<Self> {
        capacity.and_then(NonZeroUsize::new).map(Self::new)
    }

    pub fn get(&self, index: u64) -> Option<V> {
        let value = self.inner.lock().get(&index).cloned();
        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
        value
    }

    pub fn insert(&self, index: u64, value: V) {
        self.inner.lock().put(index, value);
        self.inserts.fetch_add(1, Ordering::Relaxed);
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            inserts: self.inserts.load(Ordering::Relaxed),
            len: self.len(),
        }
    }
}

impl<V> std::fmt::Debug for ReadCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("ReadCache")
            .field("len", &inner.len())
            .field("cap", &inner.cap())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_least_recent() {
        let cache = ReadCache::with_capacity(Some(2)).unwrap();
        cache.insert(1, "a");
        cache.insert(2, "b");
        assert_eq!(cache.get(1), Some("a"));

        cache.insert(3, "c");
        assert_eq!(cache.get(2), None);
        assert_eq!(cache.get(1), Some("a"));
        assert_eq!(cache.get(3), Some("c"));

        let stats = cache.stats();
        assert_eq!(stats.hits, 3);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.inserts, 3);
        assert_eq!(stats.len, 2);
        assert!(stats.hit_rate().unwrap() > 0.7);
    }

    #[test]
    fn test_clear_keeps_counters() {
        let cache = ReadCache::with_capacity(Some(4)).unwrap();
        cache.insert(1, "a");
        cache.get(1);

        cache.clear();

        assert!(cache.is_empty());
        assert_eq!(cache.get(1), None);
        let stats = cache.stats();
        assert_eq!((stats.hits, stats.misses, stats.inserts), (1, 1, 1));
    }

    #[test]
    fn test_disabled() {
        assert!(ReadCache::<u8>::with_capacity(None).is_none());
        assert!(ReadCache::<u8>::with_capacity(Some(0)).is_none());
    }
}
