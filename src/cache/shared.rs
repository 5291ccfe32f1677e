//! Thread-safe chain handle
//!
//! Every chain operation mutates recency state, so the whole chain sits
//! behind one lock. Reads hand back clones rather than references into the
//! locked chain.

use std::hash::Hash;
use std::sync::Arc;

use parking_lot::Mutex;

use super::chain::CacheChain;
use super::metrics::MetricsSnapshot;
use super::store::{DurableStore, MemoryStore};
use crate::error::Result;

/// Cloneable, lock-protected [`CacheChain`]
pub struct SharedCacheChain<K, V, S = MemoryStore<K, V>> {
    inner: Arc<Mutex<CacheChain<K, V, S>>>,
}

impl<K, V, S> Clone for SharedCacheChain<K, V, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V, S> SharedCacheChain<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: DurableStore<K, V>,
{
    pub fn new(chain: CacheChain<K, V, S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(chain)),
        }
    }

    /// Read `key`, promoting it, and return a copy of the value
    pub fn get(&self, key: &K) -> Result<V> {
        self.inner.lock().get(key).cloned()
    }

    pub fn insert(&self, key: K, value: V) -> Result<()> {
        self.inner.lock().insert(key, value)
    }

    pub fn remove(&self, key: &K) -> Result<V> {
        self.inner.lock().remove(key)
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.inner.lock().contains_key(key)
    }

    pub fn open_bstore(&self) -> Result<()> {
        self.inner.lock().open_bstore()
    }

    pub fn close_bstore(&self) -> Result<()> {
        self.inner.lock().close_bstore()
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.lock().metrics()
    }

    /// Run `f` against the chain while holding the lock
    pub fn with<T, F>(&self, f: F) -> T
    where
        F: FnOnce(&mut CacheChain<K, V, S>) -> T,
    {
        let mut chain = self.inner.lock();
        f(&mut chain)
    }
}

// ===== Tests =====
