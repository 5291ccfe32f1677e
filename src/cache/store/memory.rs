//! In-memory durable store, used for tests and pure in-process chains

use std::collections::HashMap;
use std::hash::Hash;

use super::DurableStore;
use crate::error::{Error, Result};

/// Durable store whose contents live in the object itself.
///
/// Closing only revokes access; the data is still there on the next `open`.
#[derive(Debug, Clone)]
pub struct MemoryStore<K, V> {
    data: HashMap<K, V>,
    open: bool,
}

impl<K, V> Default for MemoryStore<K, V> {
    fn default() -> Self {
        Self {
            data: HashMap::new(),
            open: false,
        }
    }
}

impl<K: Hash + Eq, V> MemoryStore<K, V> {
    /// Create an empty, closed store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a closed store pre-loaded with `entries`
    pub fn with_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            data: entries.into_iter().collect(),
            open: false,
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(Error::BStoreClosed)
        }
    }
}

impl<K: Hash + Eq + Clone, V: Clone> DurableStore<K, V> for MemoryStore<K, V> {
    fn open(&mut self) -> Result<()> {
        self.open = true;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.open = false;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn get(&self, key: &K) -> Result<Option<V>> {
        self.ensure_open()?;
        Ok(self.data.get(key).cloned())
    }

    fn set(&mut self, key: K, value: V) -> Result<()> {
        self.ensure_open()?;
        self.data.insert(key, value);
        Ok(())
    }

    fn delete(&mut self, key: &K) -> Result<Option<V>> {
        self.ensure_open()?;
        Ok(self.data.remove(key))
    }

    fn contains_key(&self, key: &K) -> Result<bool> {
        self.ensure_open()?;
        Ok(self.data.contains_key(key))
    }

    fn len(&self) -> Result<usize> {
        self.ensure_open()?;
        Ok(self.data.len())
    }

    fn keys(&self) -> Result<Vec<K>> {
        self.ensure_open()?;
        Ok(self.data.keys().cloned().collect())
    }
}
