//! Cache Chain - the hierarchy of levels ending in an optional store
//!
//! Orchestrates lookups, cascading inserts and capacity changes across a
//! stack of [`CacheLevel`]s terminated either by nothing or by a
//! [`StoreEndpoint`].
//!
//! # Data movement
//!
//! ```text
//!   read(key)                         write(key, value)
//!      │                                   │
//!      ▼                                   ▼
//!   ┌──────────┐  promote to MRU      ┌──────────┐
//!   │ level 0  │◄─────────────┐       │ level 0  │── overflow (LRU) ──┐
//!   └──────────┘              │       └──────────┘                    ▼
//!   ┌──────────┐  hit: move   │       ┌──────────┐                    │
//!   │ level 1  │──────────────┤       │ level 1  │◄───────────────────┘
//!   └──────────┘              │       └──────────┘── overflow ──┐
//!   ┌──────────┐  hit: copy   │       ┌──────────┐              ▼
//!   │  store   │──────────────┘       │  store   │◄── dirty only: write back
//!   └──────────┘  (stays stored)      └──────────┘     clean: dropped
//! ```
//!
//! # Failure atomicity
//!
//! Store operations on an open store cannot fail halfway for the bundled
//! engines, so the only mid-cascade failure is a closed store. While the store
//! is closed each mutating operation first dry-runs its cascade (see
//! [`CascadePlan`]) and fails with `BStoreClosed` before touching anything if
//! the store would be reached.

use std::fmt;
use std::hash::Hash;

use tracing::{debug, info, trace, warn};

use super::endpoint::{Demotion, StoreEndpoint};
use super::entry::Entry;
use super::level::CacheLevel;
use super::metrics::{CacheMetrics, MetricsSnapshot};
use super::plan::CascadePlan;
use super::session::BStoreSession;
use super::store::{DurableStore, MemoryStore};
use super::tier::Tier;
use crate::config::ChainConfig;
use crate::error::{Error, Result};

/// The node directly below a cache level
pub enum LowerMem<'a, K, V, S> {
    /// Another cache level
    Cache(&'a CacheLevel<K, V>),
    /// The terminal store
    Store(&'a StoreEndpoint<K, V, S>),
}

impl<'a, K, V, S> LowerMem<'a, K, V, S> {
    /// True for the terminal store
    pub fn is_store(&self) -> bool {
        matches!(self, LowerMem::Store(_))
    }

    /// The cache level, if this is one
    pub fn as_cache(&self) -> Option<&'a CacheLevel<K, V>> {
        match self {
            LowerMem::Cache(level) => Some(level),
            LowerMem::Store(_) => None,
        }
    }

    /// The store endpoint, if this is one
    pub fn as_store(&self) -> Option<&'a StoreEndpoint<K, V, S>> {
        match self {
            LowerMem::Store(endpoint) => Some(endpoint),
            LowerMem::Cache(_) => None,
        }
    }
}

/// A hierarchy of LRU cache levels with an optional durable store at the end
pub struct CacheChain<K, V, S = MemoryStore<K, V>> {
    /// Cache levels, top (level 0) first; never empty
    levels: Vec<CacheLevel<K, V>>,
    /// Terminal store
    store: Option<StoreEndpoint<K, V, S>>,
    metrics: CacheMetrics,
}

impl<K, V> CacheChain<K, V, MemoryStore<K, V>>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    /// Build a chain with no terminal store. Entries evicted from the last
    /// level are discarded, dirty or not.
    pub fn in_memory(capacities: &[usize]) -> Result<Self> {
        Self::new(Self::build_levels(capacities)?, None)
    }
}

impl<K, V, S> CacheChain<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: DurableStore<K, V>,
{
    /// Assemble a chain from existing levels and an optional store
    pub fn new(levels: Vec<CacheLevel<K, V>>, store: Option<StoreEndpoint<K, V, S>>) -> Result<Self> {
        if levels.is_empty() {
            return Err(Error::EmptyChain);
        }
        let metrics = CacheMetrics::new(levels.len());
        Ok(Self {
            levels,
            store,
            metrics,
        })
    }

    /// Build a chain ending in `store`, bounded to `store_capacity` keys.
    /// The store starts closed.
    pub fn with_store(capacities: &[usize], store: S, store_capacity: usize) -> Result<Self> {
        let endpoint = StoreEndpoint::new(store, store_capacity)?;
        Self::new(Self::build_levels(capacities)?, Some(endpoint))
    }

    /// Build a chain from configuration. `store` is required exactly when
    /// the configuration declares one.
    pub fn from_config(config: &ChainConfig, store: Option<S>) -> Result<Self> {
        config.validate()?;
        match (&config.store, store) {
            (Some(store_config), Some(store)) => {
                Self::with_store(&config.levels, store, store_config.capacity)
            }
            (None, None) => Self::new(Self::build_levels(&config.levels)?, None),
            (Some(_), None) => Err(Error::Config(
                "configuration declares a store but none was supplied".to_string(),
            )),
            (None, Some(_)) => Err(Error::Config(
                "a store was supplied but the configuration declares none".to_string(),
            )),
        }
    }

    fn build_levels(capacities: &[usize]) -> Result<Vec<CacheLevel<K, V>>> {
        capacities.iter().map(|&capacity| CacheLevel::new(capacity)).collect()
    }

    // =========================================================================
    // Lookup
    // =========================================================================

    /// Read `key`, promoting it to the MRU slot of the top level.
    ///
    /// A hit at depth `d` moves the entry up with its dirty flag intact. A
    /// hit in the store copies the value up as clean and leaves the stored
    /// copy in place.
    pub fn get(&mut self, key: &K) -> Result<&V> {
        match self.position(key) {
            Some(depth) => {
                self.ensure_store_reachable(|plan| {
                    plan.remove(depth, key);
                    plan.insert(0, key)
                })?;
                self.metrics.record_level_hit(depth);
                if let Some(entry) = self.levels[depth].remove(key) {
                    if depth > 0 {
                        trace!(depth, dirty = entry.dirty, "Promoting entry to top level");
                        self.metrics.record_promotion();
                    }
                    self.insert_at(0, key.clone(), entry)?;
                }
            }
            None => {
                let value = match self.store.as_ref() {
                    Some(endpoint) => endpoint.fetch(key)?,
                    None => None,
                };
                let Some(value) = value else {
                    self.metrics.record_miss();
                    return Err(Error::CacheMiss);
                };
                trace!("Promoting stored value to top level");
                self.metrics.record_store_hit();
                self.metrics.record_promotion();
                self.insert_at(0, key.clone(), Entry::clean(value))?;
            }
        }
        self.levels[0].peek(key).ok_or(Error::CacheMiss)
    }

    /// Look at the nearest cached copy without promoting it. The store is
    /// not consulted.
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.levels.iter().find_map(|level| level.peek(key))
    }

    /// Look at the nearest cached entry, dirty flag included
    pub fn peek_entry(&self, key: &K) -> Option<&Entry<V>> {
        self.levels.iter().find_map(|level| level.peek_entry(key))
    }

    /// True if any cache level holds `key`. The store is not consulted.
    pub fn contains_key(&self, key: &K) -> bool {
        self.position(key).is_some()
    }

    /// Index of the first level holding `key`
    pub fn position(&self, key: &K) -> Option<usize> {
        self.levels.iter().position(|level| level.contains_key(key))
    }

    // =========================================================================
    // Write
    // =========================================================================

    /// Write `key` at the top level as a dirty entry, cascading evictions
    /// down the chain. A stale copy of `key` in a lower level is dropped so
    /// a key is cached in at most one level.
    pub fn insert(&mut self, key: K, value: V) -> Result<()> {
        let resident = self.position(&key);
        self.ensure_store_reachable(|plan| {
            if let Some(depth) = resident {
                plan.remove(depth, &key);
            }
            plan.insert(0, &key)
        })?;

        if let Some(depth) = resident.filter(|&depth| depth > 0) {
            self.levels[depth].remove(&key);
        }
        self.insert_at(0, key, Entry::dirty(value))
    }

    /// Insert every pair in order
    pub fn extend<I>(&mut self, entries: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        for (key, value) in entries {
            self.insert(key, value)?;
        }
        Ok(())
    }

    /// Return the value for `key`, writing `default()` first if it is
    /// absent from the whole chain
    pub fn get_or_insert_with<F>(&mut self, key: K, default: F) -> Result<&V>
    where
        F: FnOnce() -> V,
    {
        let found = match self.get(&key) {
            Ok(_) => true,
            Err(Error::CacheMiss) => false,
            Err(e) => return Err(e),
        };
        if !found {
            self.insert(key.clone(), default())?;
        }
        self.levels[0].peek(&key).ok_or(Error::CacheMiss)
    }

    // =========================================================================
    // Removal
    // =========================================================================

    /// Remove the nearest copy of `key`.
    ///
    /// Only the first cache level holding the key is touched. If no level
    /// holds it, the key is deleted from the store instead.
    pub fn remove(&mut self, key: &K) -> Result<V> {
        if let Some(depth) = self.position(key) {
            return self.levels[depth]
                .remove(key)
                .map(Entry::into_value)
                .ok_or(Error::CacheMiss);
        }
        match self.store.as_mut() {
            Some(endpoint) => endpoint.delete(key)?.ok_or(Error::CacheMiss),
            None => Err(Error::CacheMiss),
        }
    }

    /// Remove `key` from every level and the store. Returns true if any copy
    /// existed.
    pub fn purge(&mut self, key: &K) -> Result<bool> {
        if let Some(endpoint) = &self.store {
            if !endpoint.is_open() {
                return Err(Error::BStoreClosed);
            }
        }

        let mut found = false;
        for level in &mut self.levels {
            found |= level.remove(key).is_some();
        }
        if let Some(endpoint) = self.store.as_mut() {
            found |= endpoint.delete(key)?.is_some();
        }
        Ok(found)
    }

    /// Pop the LRU entry of level `index` and demote it to the next node.
    /// Returns the evicted key, or `None` if the level was empty.
    pub fn evict_lru(&mut self, index: usize) -> Result<Option<K>> {
        self.check_level(index)?;
        self.ensure_store_reachable(|plan| plan.evict_lru(index))?;

        match self.levels[index].pop_lru() {
            Some((key, entry)) => {
                self.demote_below(index, key.clone(), entry)?;
                Ok(Some(key))
            }
            None => Ok(None),
        }
    }

    /// Drop the contents of every cache level. The store is untouched, so
    /// unsynchronized dirty entries are lost.
    pub fn clear(&mut self) {
        for level in &mut self.levels {
            level.clear();
        }
    }

    // =========================================================================
    // Capacity
    // =========================================================================

    /// Capacity of level `index`
    pub fn level_capacity(&self, index: usize) -> Result<usize> {
        self.check_level(index)?;
        Ok(self.levels[index].capacity())
    }

    /// Resize level `index`. Shrinking evicts from the LRU end, demoting
    /// each victim exactly as an overflow would.
    pub fn set_level_capacity(&mut self, index: usize, capacity: usize) -> Result<()> {
        self.check_level(index)?;
        if capacity == 0 {
            return Err(Error::InvalidCapacity { capacity });
        }
        self.ensure_store_reachable(|plan| plan.set_capacity(index, capacity))?;

        let evicted = self.levels[index].set_capacity(capacity)?;
        debug!(level = index, capacity, evicted = evicted.len(), "Resized cache level");
        for (key, entry) in evicted {
            self.demote_below(index, key, entry)?;
        }
        Ok(())
    }

    /// Capacity of the terminal store
    pub fn store_capacity(&self) -> Result<usize> {
        self.store
            .as_ref()
            .map(StoreEndpoint::capacity)
            .ok_or(Error::NoBStore)
    }

    /// Resize the terminal store. Returns the keys evicted to fit; their
    /// cached copies, if any, are marked dirty.
    pub fn set_store_capacity(&mut self, capacity: usize) -> Result<Vec<K>> {
        let endpoint = self.store.as_mut().ok_or(Error::NoBStore)?;
        let evicted = endpoint.set_capacity(&mut self.levels[..], capacity)?;
        debug!(capacity, evicted = evicted.len(), "Resized backing store");
        Ok(evicted)
    }

    // =========================================================================
    // Store lifecycle
    // =========================================================================

    /// Open the terminal store, trimming it to capacity
    pub fn open_bstore(&mut self) -> Result<()> {
        let endpoint = self.store.as_mut().ok_or(Error::NoBStore)?;
        let trimmed = endpoint.open(&mut self.levels[..])?;
        info!(capacity = endpoint.capacity(), trimmed, "Opened backing store");
        Ok(())
    }

    /// Close the terminal store. Closing a closed store is a no-op.
    pub fn close_bstore(&mut self) -> Result<()> {
        let endpoint = self.store.as_mut().ok_or(Error::NoBStore)?;
        if endpoint.is_open() {
            endpoint.close()?;
            info!("Closed backing store");
        }
        Ok(())
    }

    /// True while the terminal store is open
    pub fn is_bstore_open(&self) -> Result<bool> {
        self.store
            .as_ref()
            .map(StoreEndpoint::is_open)
            .ok_or(Error::NoBStore)
    }

    /// Open the store for the lifetime of the returned guard
    pub fn session(&mut self) -> Result<BStoreSession<'_, K, V, S>> {
        self.open_bstore()?;
        Ok(BStoreSession::new(self))
    }

    /// Run `f` with the store open, closing it afterwards on every path.
    /// An error from `f` wins over an error from closing.
    pub fn with_bstore<T, F>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Self) -> Result<T>,
    {
        self.open_bstore()?;
        let result = f(self);
        let closed = self.close_bstore();
        match (result, closed) {
            (Ok(value), Ok(())) => Ok(value),
            (Err(e), _) => Err(e),
            (Ok(_), Err(e)) => Err(e),
        }
    }

    // =========================================================================
    // Structure
    // =========================================================================

    /// Number of cache levels
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// All cache levels, top first
    pub fn levels(&self) -> &[CacheLevel<K, V>] {
        &self.levels
    }

    /// Cache level `index`
    pub fn level(&self, index: usize) -> Option<&CacheLevel<K, V>> {
        self.levels.get(index)
    }

    /// The top level
    pub fn top(&self) -> &CacheLevel<K, V> {
        // Non-empty by construction
        &self.levels[0]
    }

    /// The terminal store, if any
    pub fn store(&self) -> Option<&StoreEndpoint<K, V, S>> {
        self.store.as_ref()
    }

    /// The node directly below level `index`: the next level, the store,
    /// or `None` at the end of an in-memory chain
    pub fn lower_mem(&self, index: usize) -> Result<Option<LowerMem<'_, K, V, S>>> {
        self.check_level(index)?;
        Ok(match self.levels.get(index + 1) {
            Some(level) => Some(LowerMem::Cache(level)),
            None => self.store.as_ref().map(LowerMem::Store),
        })
    }

    /// Every node of the chain, top first, store last
    pub fn tiers(&self) -> Vec<&dyn Tier<K, V>> {
        let mut tiers: Vec<&dyn Tier<K, V>> = self
            .levels
            .iter()
            .map(|level| level as &dyn Tier<K, V>)
            .collect();
        if let Some(endpoint) = &self.store {
            tiers.push(endpoint);
        }
        tiers
    }

    /// Entries resident across all cache levels
    pub fn len(&self) -> usize {
        self.levels.iter().map(CacheLevel::len).sum()
    }

    /// True if no cache level holds anything
    pub fn is_empty(&self) -> bool {
        self.levels.iter().all(CacheLevel::is_empty)
    }

    /// Counter snapshot
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Reset all counters
    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    // =========================================================================
    // Cascade
    // =========================================================================

    fn check_level(&self, index: usize) -> Result<()> {
        if index < self.levels.len() {
            Ok(())
        } else {
            Err(Error::LevelOutOfRange {
                index,
                levels: self.levels.len(),
            })
        }
    }

    /// Fail with `BStoreClosed` if the store is closed and the cascade
    /// described by `reaches` would demote into it
    fn ensure_store_reachable<'a, F>(&'a self, reaches: F) -> Result<()>
    where
        F: FnOnce(&mut CascadePlan<'a, K>) -> bool,
    {
        match &self.store {
            Some(endpoint) if !endpoint.is_open() => {
                let mut plan = CascadePlan::new(self.levels.as_slice());
                if reaches(&mut plan) {
                    Err(Error::BStoreClosed)
                } else {
                    Ok(())
                }
            }
            _ => Ok(()),
        }
    }

    fn insert_at(&mut self, index: usize, key: K, entry: Entry<V>) -> Result<()> {
        match self.levels[index].push(key, entry) {
            Some((victim, evicted)) => self.demote_below(index, victim, evicted),
            None => Ok(()),
        }
    }

    fn demote_below(&mut self, index: usize, key: K, entry: Entry<V>) -> Result<()> {
        let next = index + 1;
        if next < self.levels.len() {
            trace!(from = index, to = next, dirty = entry.dirty, "Demoting entry");
            self.metrics.record_demotion();
            return self.insert_at(next, key, entry);
        }

        let Some(endpoint) = self.store.as_mut() else {
            if entry.dirty {
                // No store below: the only copy is gone
                warn!(level = index, "Dropping dirty entry off the end of the chain");
                self.metrics.record_dropped_dirty();
            }
            return Ok(());
        };

        self.metrics.record_demotion();
        match endpoint.demote(&mut self.levels[..], key, entry)? {
            Demotion::Skipped => trace!("Dropped clean entry already held by the store"),
            Demotion::Written => {
                debug!("Wrote back dirty entry");
                self.metrics.record_write_back();
            }
            Demotion::Replaced {
                upstream_flipped, ..
            } => {
                debug!(upstream_flipped, "Wrote back dirty entry after store eviction");
                self.metrics.record_write_back();
                self.metrics.record_store_eviction(upstream_flipped);
            }
        }
        Ok(())
    }
}

impl<K, V, S> fmt::Debug for CacheChain<K, V, S>
where
    K: Hash + Eq + fmt::Debug,
    V: fmt::Debug,
    S: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheChain")
            .field("levels", &self.levels)
            .field("store", &self.store)
            .finish()
    }
}

impl<K, V, S> fmt::Display for CacheChain<K, V, S>
where
    K: Hash + Eq + Clone + fmt::Display,
    V: Clone + fmt::Display,
    S: DurableStore<K, V>,
{
    /// One line per node, top first
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "cascade dump:")?;
        for level in &self.levels {
            writeln!(f, "   {}", level)?;
        }
        if let Some(endpoint) = &self.store {
            let state = if endpoint.is_open() { "open" } else { "closed" };
            writeln!(f, "   StoreEndpoint(capacity={}, {})", endpoint.capacity(), state)?;
        }
        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================
