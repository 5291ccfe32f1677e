//! Tier - the keyed-store capability shared by every node of a chain
//!
//! Both [`CacheLevel`] and [`StoreEndpoint`] expose the same read-side view:
//! a capacity, a resident count, membership and value lookup. Code that walks
//! a chain without caring which kind of node it is looking at works against
//! this trait.

use std::hash::Hash;

use super::endpoint::StoreEndpoint;
use super::level::CacheLevel;
use super::store::DurableStore;
use crate::error::Result;

/// Read-side view of one node in a chain
pub trait Tier<K, V> {
    /// Maximum number of resident keys
    fn capacity(&self) -> usize;

    /// Number of resident keys
    fn resident(&self) -> Result<usize>;

    /// True if `key` is resident
    fn holds(&self, key: &K) -> Result<bool>;

    /// Copy of the value resident under `key`
    fn value(&self, key: &K) -> Result<Option<V>>;
}

impl<K: Hash + Eq, V: Clone> Tier<K, V> for CacheLevel<K, V> {
    fn capacity(&self) -> usize {
        CacheLevel::capacity(self)
    }

    fn resident(&self) -> Result<usize> {
        Ok(self.len())
    }

    fn holds(&self, key: &K) -> Result<bool> {
        Ok(self.contains_key(key))
    }

    fn value(&self, key: &K) -> Result<Option<V>> {
        Ok(self.peek(key).cloned())
    }
}

impl<K, V, S> Tier<K, V> for StoreEndpoint<K, V, S>
where
    K: Hash + Eq + Clone,
    V: Clone,
    S: DurableStore<K, V>,
{
    fn capacity(&self) -> usize {
        StoreEndpoint::capacity(self)
    }

    fn resident(&self) -> Result<usize> {
        self.len()
    }

    fn holds(&self, key: &K) -> Result<bool> {
        self.contains_key(key)
    }

    fn value(&self, key: &K) -> Result<Option<V>> {
        self.fetch(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::endpoint::Detached;
    use crate::cache::entry::Entry;
    use crate::cache::store::MemoryStore;

    fn describe<T: Tier<u32, &'static str>>(tier: &T, key: u32) -> (usize, usize, bool, Option<&'static str>) {
        (
            tier.capacity(),
            tier.resident().unwrap(),
            tier.holds(&key).unwrap(),
            tier.value(&key).unwrap(),
        )
    }

    #[test]
    fn test_level_and_endpoint_share_the_view() {
        let mut level = CacheLevel::new(2).unwrap();
        level.push(1, Entry::dirty("one"));

        let mut endpoint = StoreEndpoint::new(MemoryStore::with_entries([(1, "one")]), 3).unwrap();
        endpoint.open(&mut Detached).unwrap();

        assert_eq!(describe(&level, 1), (2, 1, true, Some("one")));
        assert_eq!(describe(&endpoint, 1), (3, 1, true, Some("one")));
        assert_eq!(describe(&level, 9).3, None);
    }

    #[test]
    fn test_closed_endpoint_view_fails() {
        let endpoint: StoreEndpoint<u32, &str, _> =
            StoreEndpoint::new(MemoryStore::new(), 1).unwrap();
        assert!(Tier::resident(&endpoint).is_err());
    }
}
