//! Cache Level - one LRU tier of the hierarchy
//!
//! A capacity-bounded mapping of key to [`Entry`], ordered by recency:
//! least-recently-used first, most-recently-used last.
//!
//! # Design
//!
//! - Backed by an unbounded `lru::LruCache`; the level enforces its own
//!   capacity so that overflow victims are handed back to the caller instead
//!   of being silently dropped
//! - Mutators return whatever they push out, and the owning chain decides
//!   where those entries go next

use std::fmt;
use std::hash::Hash;

use lru::LruCache;

use super::entry::Entry;
use crate::error::{Error, Result};

/// One LRU-ordered level of a cache chain
pub struct CacheLevel<K, V> {
    /// Maximum resident entries (>= 1)
    capacity: usize,
    /// Slots in recency order
    slots: LruCache<K, Entry<V>>,
}

impl<K: Hash + Eq, V> CacheLevel<K, V> {
    /// Create an empty level
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity { capacity });
        }
        Ok(Self {
            capacity,
            slots: LruCache::unbounded(),
        })
    }

    /// Create a level pre-populated with dirty entries, oldest first.
    ///
    /// Entries beyond capacity are discarded from the LRU end.
    pub fn with_entries<I>(capacity: usize, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut level = Self::new(capacity)?;
        for (key, value) in entries {
            level.push(key, Entry::dirty(value));
        }
        Ok(level)
    }

    /// Maximum number of resident entries
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of resident entries
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True if no entries are resident
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// True if `key` is resident at this level
    pub fn contains_key(&self, key: &K) -> bool {
        self.slots.contains(key)
    }

    /// Look at a value without touching recency
    pub fn peek(&self, key: &K) -> Option<&V> {
        self.slots.peek(key).map(|entry| &entry.value)
    }

    /// Look at an entry without touching recency
    pub fn peek_entry(&self, key: &K) -> Option<&Entry<V>> {
        self.slots.peek(key)
    }

    /// Dirty flag of a resident key, `None` if absent
    pub fn is_dirty(&self, key: &K) -> Option<bool> {
        self.slots.peek(key).map(|entry| entry.dirty)
    }

    /// Mark a resident entry dirty. Returns false if the key is absent.
    pub fn mark_dirty(&mut self, key: &K) -> bool {
        match self.slots.peek_mut(key) {
            Some(entry) => {
                entry.mark_dirty();
                true
            }
            None => false,
        }
    }

    /// Key that would be evicted next
    pub fn lru_key(&self) -> Option<&K> {
        self.slots.peek_lru().map(|(key, _)| key)
    }

    /// Append an entry at the MRU position, replacing any existing slot for
    /// the same key. Returns the LRU entry pushed out by overflow, if any.
    pub fn push(&mut self, key: K, entry: Entry<V>) -> Option<(K, Entry<V>)> {
        // An existing slot is replaced in place, so it never counts twice
        self.slots.push(key, entry);
        self.pop_overflow()
    }

    /// Remove a key, returning its entry
    pub fn remove(&mut self, key: &K) -> Option<Entry<V>> {
        self.slots.pop(key)
    }

    /// Remove and return the least-recently-used entry
    pub fn pop_lru(&mut self) -> Option<(K, Entry<V>)> {
        self.slots.pop_lru()
    }

    /// Change capacity, returning evicted entries in eviction (LRU) order
    pub fn set_capacity(&mut self, capacity: usize) -> Result<Vec<(K, Entry<V>)>> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity { capacity });
        }
        self.capacity = capacity;

        let mut evicted = Vec::new();
        while let Some(victim) = self.pop_overflow() {
            evicted.push(victim);
        }
        Ok(evicted)
    }

    /// Drop every resident entry
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Iterate entries from least- to most-recently used
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (&K, &Entry<V>)> + '_ {
        self.slots.iter().rev()
    }

    /// Keys from least- to most-recently used
    pub fn keys(&self) -> impl Iterator<Item = &K> + '_ {
        self.iter().map(|(key, _)| key)
    }

    /// Values from least- to most-recently used
    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.iter().map(|(_, entry)| &entry.value)
    }

    fn pop_overflow(&mut self) -> Option<(K, Entry<V>)> {
        if self.slots.len() > self.capacity {
            self.slots.pop_lru()
        } else {
            None
        }
    }
}

impl<K: Hash + Eq + Clone, V: Clone> Clone for CacheLevel<K, V> {
    fn clone(&self) -> Self {
        Self {
            capacity: self.capacity,
            slots: self.slots.clone(),
        }
    }
}

impl<K: Hash + Eq, V: PartialEq> PartialEq for CacheLevel<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.capacity == other.capacity
            && self.len() == other.len()
            && self.iter().eq(other.iter())
    }
}

impl<K: Hash + Eq + fmt::Debug, V: fmt::Debug> fmt::Debug for CacheLevel<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheLevel")
            .field("capacity", &self.capacity)
            .field("entries", &self.iter().collect::<Vec<_>>())
            .finish()
    }
}

impl<K: Hash + Eq + fmt::Display, V: fmt::Display> fmt::Display for CacheLevel<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CacheLevel: [")?;
        for (i, (key, entry)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "({}, {})", key, entry)?;
        }
        write!(f, "]")
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn fruit() -> CacheLevel<&'static str, i32> {
        CacheLevel::with_entries(10, [("blueberry", 1), ("cherry", 3), ("strawberry", 2)])
            .unwrap()
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert!(matches!(
            CacheLevel::<u32, u32>::new(0),
            Err(Error::InvalidCapacity { capacity: 0 })
        ));
    }

    #[test]
    fn test_push_orders_lru_to_mru() {
        let mut level = CacheLevel::new(3).unwrap();
        level.push("foo", Entry::dirty(1));
        level.push("bar", Entry::dirty(2));
        level.push("foo", Entry::dirty(3));

        let keys: Vec<_> = level.keys().copied().collect();
        assert_eq!(keys, vec!["bar", "foo"]);
        assert_eq!(level.peek(&"foo"), Some(&3));
        assert_eq!(level.len(), 2);
    }

    #[test]
    fn test_push_returns_overflow_victim() {
        let mut level = CacheLevel::new(2).unwrap();
        assert!(level.push('a', Entry::dirty(1)).is_none());
        assert!(level.push('b', Entry::clean(2)).is_none());

        let victim = level.push('c', Entry::dirty(3));
        assert_eq!(victim, Some(('a', Entry::dirty(1))));
        assert_eq!(level.len(), 2);
        assert_eq!(level.lru_key(), Some(&'b'));
    }

    #[test]
    fn test_replacing_key_at_capacity_does_not_evict() {
        let mut level = CacheLevel::new(2).unwrap();
        level.push('a', Entry::dirty(1));
        level.push('b', Entry::dirty(2));
        assert!(level.push('a', Entry::dirty(10)).is_none());
        assert_eq!(level.keys().copied().collect::<Vec<_>>(), vec!['b', 'a']);
    }

    #[test]
    fn test_peek_does_not_touch_recency() {
        let level = fruit();
        assert_eq!(level.peek(&"blueberry"), Some(&1));
        assert_eq!(level.lru_key(), Some(&"blueberry"));
    }

    #[test]
    fn test_dirty_tracking() {
        let mut level = CacheLevel::new(4).unwrap();
        level.push(1, Entry::clean("x"));
        assert_eq!(level.is_dirty(&1), Some(false));
        assert!(level.mark_dirty(&1));
        assert_eq!(level.is_dirty(&1), Some(true));
        assert!(!level.mark_dirty(&2));
        assert_eq!(level.is_dirty(&2), None);
    }

    #[test]
    fn test_remove_and_pop_lru() {
        let mut level = fruit();
        assert_eq!(level.remove(&"cherry"), Some(Entry::dirty(3)));
        assert_eq!(level.remove(&"cherry"), None);
        assert_eq!(level.pop_lru(), Some(("blueberry", Entry::dirty(1))));
        assert_eq!(level.len(), 1);
    }

    #[test]
    fn test_set_capacity_evicts_in_lru_order() {
        let mut level = CacheLevel::with_entries(
            6,
            [("foo", 1), ("bar", 2), ("blueberry", 1), ("cherry", 3), ("strawberry", 2)],
        )
        .unwrap();

        assert!(level.set_capacity(5).unwrap().is_empty());

        let evicted = level.set_capacity(3).unwrap();
        let keys: Vec<_> = evicted.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["foo", "bar"]);
        assert_eq!(level.capacity(), 3);
        assert_eq!(
            level.keys().copied().collect::<Vec<_>>(),
            vec!["blueberry", "cherry", "strawberry"]
        );
    }

    #[test]
    fn test_set_capacity_zero_leaves_level_untouched() {
        let mut level = fruit();
        assert!(level.set_capacity(0).is_err());
        assert_eq!(level.capacity(), 10);
        assert_eq!(level.len(), 3);
    }

    #[test]
    fn test_equality() {
        let same = CacheLevel::with_entries(
            10,
            [("blueberry", 1), ("cherry", 3), ("strawberry", 2)],
        )
        .unwrap();
        assert_eq!(fruit(), same);

        let reordered = CacheLevel::with_entries(
            10,
            [("cherry", 3), ("blueberry", 1), ("strawberry", 2)],
        )
        .unwrap();
        assert_ne!(fruit(), reordered);

        let bigger = CacheLevel::with_entries(
            20,
            [("blueberry", 1), ("cherry", 3), ("strawberry", 2)],
        )
        .unwrap();
        assert_ne!(fruit(), bigger);

        let mut clean = fruit();
        let (key, entry) = clean.pop_lru().unwrap();
        clean.push(key, Entry::clean(entry.value));
        let mut dirty = fruit();
        let (key, entry) = dirty.pop_lru().unwrap();
        dirty.push(key, entry);
        assert_ne!(clean, dirty);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            fruit().to_string(),
            "CacheLevel: [(blueberry, (True, 1)), (cherry, (True, 3)), (strawberry, (True, 2))]"
        );
    }

    #[test]
    fn test_clear_and_values() {
        let mut level = fruit();
        assert_eq!(level.values().copied().collect::<Vec<_>>(), vec![1, 3, 2]);
        level.clear();
        assert!(level.is_empty());
    }
}
