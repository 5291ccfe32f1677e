//! Multi-Level Write-Back Cache
//!
//! A stack of LRU cache levels in front of an optional capacity-bounded
//! durable store.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         CacheChain                           │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌────────────┐   ┌────────────┐         ┌────────────┐      │
//! │  │  Level 0   │──►│  Level 1   │──► ... ─►│  Level n   │      │
//! │  │ (LRU, top) │   │   (LRU)    │         │   (LRU)    │      │
//! │  └────────────┘   └────────────┘         └─────┬──────┘      │
//! │        ▲                                       │ dirty only  │
//! │        │ promote on read                       ▼             │
//! │        │                              ┌──────────────────┐   │
//! │        └──────────────────────────────│  StoreEndpoint   │   │
//! │                                       │ capacity + store │   │
//! │                                       └──────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Policies
//!
//! - Write-allocate: writes always land at the top level, marked dirty
//! - Write-back: a dirty entry reaches the store only when evicted from the
//!   last level; clean entries are dropped there
//! - Promotion: a read moves the entry to the MRU slot of the top level
//! - Store eviction: a full store gives up a key whose cached copy is clean
//!   if it has one, and marks that copy dirty so it is written back later

mod chain;
mod endpoint;
mod entry;
mod level;
mod metrics;
mod plan;
mod session;
mod shared;
mod tier;
pub mod store;

#[cfg(test)]
mod proptest;

pub use chain::{CacheChain, LowerMem};
pub use endpoint::{Demotion, Detached, StoreEndpoint, Upstream};
pub use entry::Entry;
pub use level::CacheLevel;
pub use metrics::{CacheMetrics, MetricsSnapshot};
pub use session::BStoreSession;
pub use shared::SharedCacheChain;
pub use store::{DurableStore, FileStore, MemoryStore};
pub use tier::Tier;

/// Level capacity used by [`ChainConfig::default`](crate::config::ChainConfig)
pub const DEFAULT_LEVEL_CAPACITY: usize = 10;
