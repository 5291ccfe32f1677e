//! Cascade dry run
//!
//! Replays a cascade over a key-only shadow of the cache levels to learn
//! whether it would reach the terminal store. The chain uses this while the
//! store is closed, to fail with `BStoreClosed` before mutating anything.

use std::collections::VecDeque;

use super::level::CacheLevel;

struct ShadowLevel<'a, K> {
    capacity: usize,
    /// LRU first, MRU last
    keys: VecDeque<&'a K>,
}

/// Key-only copy of a chain's cache levels
pub(crate) struct CascadePlan<'a, K> {
    levels: Vec<ShadowLevel<'a, K>>,
}

impl<'a, K: Eq> CascadePlan<'a, K> {
    pub(crate) fn new<V>(levels: &'a [CacheLevel<K, V>]) -> Self
    where
        K: std::hash::Hash,
    {
        Self {
            levels: levels
                .iter()
                .map(|level| ShadowLevel {
                    capacity: level.capacity(),
                    keys: level.keys().collect(),
                })
                .collect(),
        }
    }

    /// Remove `key` from level `index` without demoting it
    pub(crate) fn remove(&mut self, index: usize, key: &K) {
        if let Some(level) = self.levels.get_mut(index) {
            level.keys.retain(|resident| *resident != key);
        }
    }

    /// Insert at `index`; true if any cascaded entry reaches the store
    pub(crate) fn insert(&mut self, index: usize, key: &'a K) -> bool {
        let Some(level) = self.levels.get_mut(index) else {
            return true;
        };
        level.keys.retain(|resident| *resident != key);
        level.keys.push_back(key);
        self.drain(index)
    }

    /// Shrink level `index`; true if any eviction reaches the store
    pub(crate) fn set_capacity(&mut self, index: usize, capacity: usize) -> bool {
        match self.levels.get_mut(index) {
            Some(level) => level.capacity = capacity,
            None => return false,
        }
        self.drain(index)
    }

    /// Evict the LRU key of level `index`; true if it reaches the store
    pub(crate) fn evict_lru(&mut self, index: usize) -> bool {
        match self.levels.get_mut(index).and_then(|level| level.keys.pop_front()) {
            Some(key) => self.demote_below(index, key),
            None => false,
        }
    }

    fn drain(&mut self, index: usize) -> bool {
        let mut reached = false;
        loop {
            let level = &mut self.levels[index];
            if level.keys.len() <= level.capacity {
                return reached;
            }
            match level.keys.pop_front() {
                Some(key) => reached |= self.demote_below(index, key),
                None => return reached,
            }
        }
    }

    fn demote_below(&mut self, index: usize, key: &'a K) -> bool {
        // Past the last level is the store
        self.insert(index + 1, key)
    }
}
