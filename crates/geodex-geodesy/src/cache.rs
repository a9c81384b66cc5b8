//! Memoizing distance cache

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::constants::LRU_CACHE_SIZE;
use crate::traits::{DistanceStrategy, Result};

/// Cache key: the raw bits of `(lat1, lon1, lat2, lon2)`
type Key = [u64; 4];

/// Hit/miss counters for a [`Cached`] strategy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub len: usize,
    pub capacity: usize,
}

/// Wraps a strategy with a bounded LRU memo keyed by its four inputs.
///
/// Distances are pure functions of the inputs, so cached answers are exact.
/// Failed calculations are not cached.
pub struct Cached<S> {
    inner: S,
    store: Mutex<LruCache<Key, f64>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<S: DistanceStrategy> Cached<S> {
    pub fn new(inner: S) -> Self {
        Self::with_capacity(inner, LRU_CACHE_SIZE)
    }

    /// A capacity of zero is raised to one
    pub fn with_capacity(inner: S, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            store: Mutex::new(LruCache::new(capacity)),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn stats(&self) -> CacheStats {
        let store = self.store.lock();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            len: store.len(),
            capacity: store.cap().get(),
        }
    }

    pub fn clear(&self) {
        self.store.lock().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

impl<S: DistanceStrategy> DistanceStrategy for Cached<S> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn calculate(&self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> Result<f64> {
        let key = [lat1.to_bits(), lon1.to_bits(), lat2.to_bits(), lon2.to_bits()];
        if let Some(km) = self.store.lock().get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(*km);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let km = self.inner.calculate(lat1, lon1, lat2, lon2)?;
        self.store.lock().put(key, km);
        Ok(km)
    }
}

impl<S: std::fmt::Debug> std::fmt::Debug for Cached<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cached")
            .field("inner", &self.inner)
            .field("hits", &self.hits.load(Ordering::Relaxed))
            .field("misses", &self.misses.load(Ordering::Relaxed))
            .finish()
    }
}
