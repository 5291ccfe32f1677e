//! Store Endpoint - the cache-facing side of the durable store
//!
//! Wraps a [`DurableStore`] with a capacity bound and the eviction
//! negotiation the store runs with the cache levels above it when it is full.
//!
//! # Eviction negotiation
//!
//! A dirty entry demoted into a full store forces out another resident key:
//!
//! 1. Prefer a key whose nearest upstream copy is clean. That copy is
//!    identical to the stored one, so nothing is lost.
//! 2. Otherwise evict an arbitrary resident key.
//!
//! Either way the upstream copy (if any) becomes the only copy and is marked
//! dirty so it is written back when it is eventually evicted. A victim with
//! no upstream copy is lost.
//!
//! The endpoint never holds a reference to the levels above it. They are
//! lent to it per call through the [`Upstream`] trait, so the endpoint cannot
//! keep them alive and the chain that owns both decides their lifetime.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::marker::PhantomData;

use tracing::debug;

use super::entry::Entry;
use super::level::CacheLevel;
use super::store::DurableStore;
use crate::error::{Error, Result};

/// Dirty-notification channel from the store back to the cache levels above
/// it. Searches run top-down; the first level holding the key answers.
pub trait Upstream<K> {
    /// Dirty flag of the nearest upstream copy, `None` if no level holds it
    fn upstream_dirty(&self, key: &K) -> Option<bool>;

    /// Mark the nearest upstream copy dirty. Returns false if none exists.
    fn mark_upstream_dirty(&mut self, key: &K) -> bool;
}

impl<K: Hash + Eq, V> Upstream<K> for [CacheLevel<K, V>] {
    fn upstream_dirty(&self, key: &K) -> Option<bool> {
        self.iter().find_map(|level| level.is_dirty(key))
    }

    fn mark_upstream_dirty(&mut self, key: &K) -> bool {
        self.iter_mut().any(|level| level.mark_dirty(key))
    }
}

/// Upstream for an endpoint used on its own, without cache levels
#[derive(Debug, Clone, Copy, Default)]
pub struct Detached;

impl<K> Upstream<K> for Detached {
    fn upstream_dirty(&self, _key: &K) -> Option<bool> {
        None
    }

    fn mark_upstream_dirty(&mut self, _key: &K) -> bool {
        false
    }
}

/// What a demotion did to the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Demotion<K> {
    /// Entry was clean; the store already holds it
    Skipped,
    /// Entry written without evicting anything
    Written,
    /// Entry written after evicting `victim`
    Replaced {
        /// Key removed from the store
        victim: K,
        /// An upstream copy of `victim` existed and is now dirty
        upstream_flipped: bool,
    },
}

/// Capacity-bounded wrapper around a durable store
pub struct StoreEndpoint<K, V, S> {
    capacity: usize,
    store: S,
    _marker: PhantomData<fn() -> (K, V)>,
}

impl<K, V, S> StoreEndpoint<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: DurableStore<K, V>,
{
    /// Wrap `store`, bounding it to `capacity` keys
    pub fn new(store: S, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity { capacity });
        }
        Ok(Self {
            capacity,
            store,
            _marker: PhantomData,
        })
    }

    /// Maximum number of stored keys
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// True while the durable store is open
    pub fn is_open(&self) -> bool {
        self.store.is_open()
    }

    /// The wrapped store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Unwrap the store
    pub fn into_inner(self) -> S {
        self.store
    }

    /// Open the store and trim it to capacity. Returns the number of keys
    /// trimmed. Opening an open store is a no-op.
    pub fn open<U>(&mut self, upstream: &mut U) -> Result<usize>
    where
        U: Upstream<K> + ?Sized,
    {
        if self.store.is_open() {
            return Ok(0);
        }
        self.store.open()?;
        Ok(self.trim(upstream)?.len())
    }

    /// Close the store. Closing a closed store is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.store.is_open() {
            self.store.close()?;
        }
        Ok(())
    }

    /// Fetch a copy of the stored value; the store keeps its own copy
    pub fn fetch(&self, key: &K) -> Result<Option<V>> {
        self.store.get(key)
    }

    /// True if `key` is stored
    pub fn contains_key(&self, key: &K) -> Result<bool> {
        self.store.contains_key(key)
    }

    /// Number of stored keys
    pub fn len(&self) -> Result<usize> {
        self.store.len()
    }

    /// True if nothing is stored
    pub fn is_empty(&self) -> Result<bool> {
        self.store.is_empty()
    }

    /// Snapshot of the stored keys
    pub fn keys(&self) -> Result<Vec<K>> {
        self.store.keys()
    }

    /// Delete a stored key directly
    pub fn delete(&mut self, key: &K) -> Result<Option<V>> {
        self.store.delete(key)
    }

    /// Accept an entry evicted from the last cache level.
    ///
    /// Clean entries are dropped: the store already holds an identical copy.
    /// Dirty entries are written back, negotiating an eviction first if the
    /// store is full.
    pub fn demote<U>(&mut self, upstream: &mut U, key: K, entry: Entry<V>) -> Result<Demotion<K>>
    where
        U: Upstream<K> + ?Sized,
    {
        if !self.store.is_open() {
            return Err(Error::BStoreClosed);
        }
        if !entry.dirty {
            return Ok(Demotion::Skipped);
        }

        if self.store.len()? < self.capacity || self.store.contains_key(&key)? {
            self.store.set(key, entry.value)?;
            return Ok(Demotion::Written);
        }

        let outcome = match self.choose_victim(&*upstream)? {
            Some(victim) => {
                let upstream_flipped = self.evict(upstream, &victim)?;
                Demotion::Replaced {
                    victim,
                    upstream_flipped,
                }
            }
            None => Demotion::Written,
        };
        self.store.set(key, entry.value)?;
        Ok(outcome)
    }

    /// Change capacity. While open, excess keys are evicted right away with
    /// no preference; while closed the trim happens on the next `open`.
    /// Returns the evicted keys.
    pub fn set_capacity<U>(&mut self, upstream: &mut U, capacity: usize) -> Result<Vec<K>>
    where
        U: Upstream<K> + ?Sized,
    {
        if capacity == 0 {
            return Err(Error::InvalidCapacity { capacity });
        }
        self.capacity = capacity;
        if self.store.is_open() {
            self.trim(upstream)
        } else {
            Ok(Vec::new())
        }
    }

    /// Pick the key to evict from a full store
    fn choose_victim<U>(&self, upstream: &U) -> Result<Option<K>>
    where
        U: Upstream<K> + ?Sized,
    {
        let keys = self.store.keys()?;
        let mirrored = keys
            .iter()
            .position(|key| upstream.upstream_dirty(key) == Some(false));
        Ok(match mirrored {
            Some(index) => keys.into_iter().nth(index),
            None => keys.into_iter().next(),
        })
    }

    /// Remove `victim`, handing durability to its upstream copy
    fn evict<U>(&mut self, upstream: &mut U, victim: &K) -> Result<bool>
    where
        U: Upstream<K> + ?Sized,
    {
        self.store.delete(victim)?;
        let flipped = upstream.mark_upstream_dirty(victim);
        debug!(upstream_copy = flipped, "Evicted key from backing store");
        Ok(flipped)
    }

    /// Evict arbitrary keys until the store fits its capacity
    fn trim<U>(&mut self, upstream: &mut U) -> Result<Vec<K>>
    where
        U: Upstream<K> + ?Sized,
    {
        let excess = self.store.len()?.saturating_sub(self.capacity);
        if excess == 0 {
            return Ok(Vec::new());
        }

        let victims: Vec<K> = self.store.keys()?.into_iter().take(excess).collect();
        for victim in &victims {
            self.evict(upstream, victim)?;
        }
        debug!(trimmed = victims.len(), capacity = self.capacity, "Trimmed backing store");
        Ok(victims)
    }

    fn snapshot(&self) -> Option<HashMap<K, V>> {
        let keys = self.store.keys().ok()?;
        keys.into_iter()
            .map(|key| {
                let value = self.store.get(&key).ok()??;
                Some((key, value))
            })
            .collect()
    }
}

impl<K, V, S> PartialEq for StoreEndpoint<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone + PartialEq,
    S: DurableStore<K, V>,
{
    /// Same capacity and same stored `(key, value)` pairs. Dirty state is not
    /// tracked at the store. Two closed endpoints compare by capacity only.
    fn eq(&self, other: &Self) -> bool {
        self.capacity == other.capacity && self.snapshot() == other.snapshot()
    }
}

impl<K, V, S: fmt::Debug> fmt::Debug for StoreEndpoint<K, V, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreEndpoint")
            .field("capacity", &self.capacity)
            .field("store", &self.store)
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
