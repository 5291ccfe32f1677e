//! Cache Metrics Collection
//!
//! Counters for hits, misses and data movement across the chain.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Cache metrics collector
#[derive(Debug)]
pub struct CacheMetrics {
    // Lookups
    level_hits: Vec<AtomicU64>,
    store_hits: AtomicU64,
    misses: AtomicU64,

    // Data movement
    promotions: AtomicU64,
    demotions: AtomicU64,
    write_backs: AtomicU64,
    store_evictions: AtomicU64,
    dirty_flips: AtomicU64,
    dropped_dirty: AtomicU64,
}

impl CacheMetrics {
    /// Create a collector for a chain with `levels` cache levels
    pub fn new(levels: usize) -> Self {
        Self {
            level_hits: (0..levels).map(|_| AtomicU64::new(0)).collect(),
            store_hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            promotions: AtomicU64::new(0),
            demotions: AtomicU64::new(0),
            write_backs: AtomicU64::new(0),
            store_evictions: AtomicU64::new(0),
            dirty_flips: AtomicU64::new(0),
            dropped_dirty: AtomicU64::new(0),
        }
    }

    pub fn record_level_hit(&self, level: usize) {
        if let Some(counter) = self.level_hits.get(level) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_store_hit(&self) {
        self.store_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_promotion(&self) {
        self.promotions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_demotion(&self) {
        self.demotions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write_back(&self) {
        self.write_backs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_store_eviction(&self, upstream_flipped: bool) {
        self.store_evictions.fetch_add(1, Ordering::Relaxed);
        if upstream_flipped {
            self.dirty_flips.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// A dirty entry fell off a chain with no terminal store
    pub fn record_dropped_dirty(&self) {
        self.dropped_dirty.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a point-in-time snapshot of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            level_hits: self
                .level_hits
                .iter()
                .map(|counter| counter.load(Ordering::Relaxed))
                .collect(),
            store_hits: self.store_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            promotions: self.promotions.load(Ordering::Relaxed),
            demotions: self.demotions.load(Ordering::Relaxed),
            write_backs: self.write_backs.load(Ordering::Relaxed),
            store_evictions: self.store_evictions.load(Ordering::Relaxed),
            dirty_flips: self.dirty_flips.load(Ordering::Relaxed),
            dropped_dirty: self.dropped_dirty.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters
    pub fn reset(&self) {
        for counter in &self.level_hits {
            counter.store(0, Ordering::Relaxed);
        }
        self.store_hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.promotions.store(0, Ordering::Relaxed);
        self.demotions.store(0, Ordering::Relaxed);
        self.write_backs.store(0, Ordering::Relaxed);
        self.store_evictions.store(0, Ordering::Relaxed);
        self.dirty_flips.store(0, Ordering::Relaxed);
        self.dropped_dirty.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time view of [`CacheMetrics`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    /// Hits per cache level, top first
    pub level_hits: Vec<u64>,
    pub store_hits: u64,
    pub misses: u64,
    /// Entries moved to the top level by a read
    pub promotions: u64,
    /// Entries pushed one level down by overflow
    pub demotions: u64,
    /// Dirty entries persisted into the store
    pub write_backs: u64,
    /// Keys the store gave up to make room
    pub store_evictions: u64,
    /// Upstream copies marked dirty by a store eviction
    pub dirty_flips: u64,
    /// Dirty entries discarded at the bottom of a chain with no store
    pub dropped_dirty: u64,
}

impl MetricsSnapshot {
    /// Total lookups that found the key somewhere
    pub fn hits(&self) -> u64 {
        self.level_hits.iter().sum::<u64>() + self.store_hits
    }

    /// Hits over total lookups, 0.0 when nothing was looked up
    pub fn hit_ratio(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}
