//! CacheChain - Multi-Level Write-Back Cache
//!
//! A hierarchy of LRU cache levels, optionally terminated by a
//! capacity-bounded durable store. Writes allocate at the top level and are
//! written back only when evicted off the last level; reads promote entries
//! to the top.
//!
//! # Architecture
//!
//! ```text
//! CacheChain ─► CacheLevel 0 ─► CacheLevel 1 ─► ... ─► StoreEndpoint ─► DurableStore
//! ```
//!
//! # Features
//!
//! - Any number of levels with independent, resizable capacities
//! - Dirty tracking with write-back on eviction
//! - Store eviction that hands durability back to cached copies
//! - Explicit store open/close lifecycle with scoped sessions
//! - In-memory and JSON file stores
//! - Hit/miss and data-movement metrics
//!
//! # Modules
//!
//! - [`cache`] - Cache levels, store endpoint and chain orchestration
//! - [`config`] - YAML chain configuration
//! - [`error`] - Error types
//! - [`logging`] - Tracing subscriber setup
//!
//! # Example
//!
//! ```
//! use cachechain::{CacheChain, MemoryStore};
//!
//! let mut chain = CacheChain::with_store(&[1, 2], MemoryStore::new(), 3)?;
//! chain.open_bstore()?;
//! for (key, value) in [("a", 1), ("b", 2), ("c", 3), ("d", 4)] {
//!     chain.insert(key, value)?;
//! }
//! assert_eq!(*chain.get(&"a")?, 1);
//! chain.close_bstore()?;
//! # Ok::<(), cachechain::Error>(())
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use cache::{
    BStoreSession, CacheChain, CacheLevel, DurableStore, Entry, FileStore, LowerMem,
    MemoryStore, MetricsSnapshot, SharedCacheChain, StoreEndpoint,
};
pub use config::{ChainConfig, StoreConfig};
pub use error::{Error, Result};
