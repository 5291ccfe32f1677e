//! Durable Store - the backing engine at the end of a chain
//!
//! A key-addressed persistent mapping with an explicit open/closed lifecycle.
//! The cache never looks inside the engine; it only drives it through
//! [`DurableStore`]. Capacity is owned by the
//! [`StoreEndpoint`](super::StoreEndpoint) wrapping the store, not by the
//! engine itself.
//!
//! # Implementations
//!
//! - [`MemoryStore`] - contents live in the store object and survive
//!   close/reopen
//! - [`FileStore`] - contents persisted as JSON records at a path

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::error::Result;

/// Capacity-agnostic durable mapping with an open/closed lifecycle.
///
/// Every data operation must fail with
/// [`Error::BStoreClosed`](crate::Error::BStoreClosed) while the store is
/// closed. `open` and `close` are idempotent.
pub trait DurableStore<K, V> {
    /// Make the store ready for data operations
    fn open(&mut self) -> Result<()>;

    /// Release the handle; data operations fail until reopened
    fn close(&mut self) -> Result<()>;

    /// True between `open` and `close`
    fn is_open(&self) -> bool;

    /// Fetch a copy of the value stored under `key`
    fn get(&self, key: &K) -> Result<Option<V>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&mut self, key: K, value: V) -> Result<()>;

    /// Delete `key`, returning its value if it was present
    fn delete(&mut self, key: &K) -> Result<Option<V>>;

    /// True if `key` is stored
    fn contains_key(&self, key: &K) -> Result<bool>;

    /// Number of stored keys
    fn len(&self) -> Result<usize>;

    /// Snapshot of the stored keys, in no particular order
    fn keys(&self) -> Result<Vec<K>>;

    /// True if nothing is stored
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}
