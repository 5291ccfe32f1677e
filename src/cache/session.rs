//! Scoped store sessions
//!
//! [`BStoreSession`] keeps a chain's terminal store open for as long as the
//! guard lives and closes it when the guard is dropped, on every exit path.

use std::hash::Hash;
use std::ops::{Deref, DerefMut};

use tracing::warn;

use super::chain::CacheChain;
use super::store::DurableStore;
use crate::error::Result;

/// Guard holding a chain's store open
pub struct BStoreSession<'a, K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: DurableStore<K, V>,
{
    chain: &'a mut CacheChain<K, V, S>,
    finished: bool,
}

impl<'a, K, V, S> BStoreSession<'a, K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: DurableStore<K, V>,
{
    /// Wrap a chain whose store is already open
    pub(crate) fn new(chain: &'a mut CacheChain<K, V, S>) -> Self {
        Self {
            chain,
            finished: false,
        }
    }

    /// Close the store now, surfacing any close error
    pub fn finish(mut self) -> Result<()> {
        self.finished = true;
        self.chain.close_bstore()
    }
}

impl<K, V, S> Deref for BStoreSession<'_, K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: DurableStore<K, V>,
{
    type Target = CacheChain<K, V, S>;

    fn deref(&self) -> &Self::Target {
        self.chain
    }
}

impl<K, V, S> DerefMut for BStoreSession<'_, K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: DurableStore<K, V>,
{
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.chain
    }
}

impl<K, V, S> Drop for BStoreSession<'_, K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: DurableStore<K, V>,
{
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        if let Err(e) = self.chain.close_bstore() {
            warn!(error = %e, "Failed to close backing store at end of session");
        }
    }
}

// ===== Tests =====
