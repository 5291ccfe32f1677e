//! Property-Based Tests for the Cache Chain
//!
//! Drives chains with random operation sequences and checks the structural
//! invariants after every step.
//!
//! # Test Properties
//!
//! 1. **Capacity**: no level or store ever holds more than its capacity
//! 2. **Uniqueness**: a key is cached in at most one level
//! 3. **Mirroring**: a clean cached entry always matches the stored value
//! 4. **Durability**: with room in the store, the last write always wins
//! 5. **LRU order**: a level keeps the most recently used keys, oldest first
//! 6. **Clean demotion**: dropping a clean entry never touches the store

#![cfg(test)]

use std::collections::{HashMap, HashSet};

use proptest::prelude::*;

use super::endpoint::{Demotion, Detached, StoreEndpoint};
use super::entry::Entry;
use super::store::MemoryStore;
use super::CacheChain;
use crate::error::Error;

type Chain = CacheChain<u8, u32>;

#[derive(Debug, Clone)]
enum Op {
    Insert(u8, u32),
    Get(u8),
    Remove(u8),
    Evict(usize),
    Resize(usize, usize),
    ResizeStore(usize),
}

// =============================================================================
// Property Strategies
// =============================================================================

/// Level capacities for a chain of 1-3 levels
fn levels_strategy() -> impl Strategy<Value = Vec<usize>> {
    prop::collection::vec(1usize..=4, 1..=3)
}

fn op_strategy(keys: u8) -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..keys, any::<u32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        3 => (0..keys).prop_map(Op::Get),
        1 => (0..keys).prop_map(Op::Remove),
        1 => (0usize..3).prop_map(Op::Evict),
        1 => (0usize..3, 1usize..=4).prop_map(|(i, c)| Op::Resize(i, c)),
        1 => (1usize..=6).prop_map(Op::ResizeStore),
    ]
}

/// Operations that never discard data on purpose
fn lossless_op_strategy(keys: u8) -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0..keys, any::<u32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        3 => (0..keys).prop_map(Op::Get),
        1 => (0usize..3).prop_map(Op::Evict),
        1 => (0usize..3, 1usize..=4).prop_map(|(i, c)| Op::Resize(i, c)),
    ]
}

fn apply(chain: &mut Chain, op: &Op) -> Result<(), Error> {
    let outcome = match *op {
        Op::Insert(k, v) => chain.insert(k, v),
        Op::Get(k) => chain.get(&k).map(|_| ()),
        Op::Remove(k) => chain.remove(&k).map(|_| ()),
        Op::Evict(i) => chain.evict_lru(i).map(|_| ()),
        Op::Resize(i, c) => chain.set_level_capacity(i, c),
        Op::ResizeStore(c) => chain.set_store_capacity(c).map(|_| ()),
    };
    match outcome {
        Err(Error::CacheMiss) | Err(Error::LevelOutOfRange { .. }) => Ok(()),
        other => other,
    }
}

fn check_structure(chain: &Chain) -> Result<(), TestCaseError> {
    let mut seen = HashSet::new();
    for (index, level) in chain.levels().iter().enumerate() {
        prop_assert!(
            level.len() <= level.capacity(),
            "level {} holds {} > {}", index, level.len(), level.capacity()
        );
        for key in level.keys() {
            prop_assert!(seen.insert(*key), "key {} cached twice", key);
        }
    }

    if let Some(endpoint) = chain.store() {
        prop_assert!(endpoint.len()? <= endpoint.capacity());
        for level in chain.levels() {
            for (key, entry) in level.iter() {
                if !entry.dirty {
                    prop_assert_eq!(endpoint.fetch(key)?, Some(entry.value));
                }
            }
        }
    }
    Ok(())
}

// =============================================================================
// Structural Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: capacity, uniqueness and mirroring hold after every step.
    #[test]
    fn prop_structure_holds(
        levels in levels_strategy(),
        store_capacity in 1usize..=6,
        ops in prop::collection::vec(op_strategy(12), 1..80),
    ) {
        let mut chain = Chain::with_store(&levels, MemoryStore::new(), store_capacity)?;
        chain.open_bstore()?;

        for op in &ops {
            apply(&mut chain, op)?;
            check_structure(&chain)?;
        }
    }

    /// Property: in-memory chains keep capacity and uniqueness too.
    #[test]
    fn prop_in_memory_structure_holds(
        levels in levels_strategy(),
        ops in prop::collection::vec(lossless_op_strategy(12), 1..80),
    ) {
        let mut chain = Chain::in_memory(&levels)?;
        for op in &ops {
            apply(&mut chain, op)?;
            check_structure(&chain)?;
        }
    }

    /// Property: a closed store either accepts an operation untouched by the
    /// cascade or rejects it without any change to the chain.
    #[test]
    fn prop_closed_store_rejections_are_atomic(
        levels in levels_strategy(),
        warmup in prop::collection::vec(lossless_op_strategy(10), 0..30),
        ops in prop::collection::vec(lossless_op_strategy(10), 1..30),
    ) {
        let mut chain = Chain::with_store(&levels, MemoryStore::new(), 10)?;
        chain.open_bstore()?;
        for op in &warmup {
            apply(&mut chain, op)?;
        }
        chain.close_bstore()?;

        for op in &ops {
            let before: Vec<_> = chain.levels().to_vec();
            match apply(&mut chain, op) {
                Err(Error::BStoreClosed) => {
                    prop_assert!(chain.levels() == &before[..]);
                }
                other => other?,
            }
        }
    }
}

// =============================================================================
// Durability Properties
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    /// Property: while every key fits in the store, each read returns the
    /// value most recently written.
    #[test]
    fn prop_last_write_wins(
        levels in levels_strategy(),
        ops in prop::collection::vec(lossless_op_strategy(8), 1..100),
    ) {
        let mut chain = Chain::with_store(&levels, MemoryStore::new(), 8)?;
        chain.open_bstore()?;
        let mut model: HashMap<u8, u32> = HashMap::new();

        for op in &ops {
            match *op {
                Op::Insert(k, v) => {
                    chain.insert(k, v)?;
                    model.insert(k, v);
                }
                Op::Get(k) => match model.get(&k) {
                    Some(expected) => {
                        prop_assert_eq!(chain.get(&k)?, expected);
                    }
                    None => {
                        prop_assert!(matches!(chain.get(&k), Err(Error::CacheMiss)));
                    }
                },
                _ => apply(&mut chain, op)?,
            }
        }

        for (key, value) in &model {
            prop_assert_eq!(chain.get(key)?, value);
        }
    }

    /// Property: a read leaves the key alone at the MRU end of the top level.
    #[test]
    fn prop_read_promotes_to_top(
        levels in levels_strategy(),
        writes in prop::collection::vec((0u8..12, any::<u32>()), 1..40),
        pick in any::<prop::sample::Index>(),
    ) {
        let mut chain = Chain::with_store(&levels, MemoryStore::new(), 16)?;
        chain.open_bstore()?;
        for (k, v) in &writes {
            chain.insert(*k, *v)?;
        }

        let key = writes[pick.index(writes.len())].0;
        chain.get(&key)?;

        prop_assert_eq!(chain.top().keys().last(), Some(&key));
        prop_assert_eq!(chain.position(&key), Some(0));
    }

    /// Property: a single level keeps the `capacity` most recent distinct
    /// keys, least recent first.
    #[test]
    fn prop_level_keeps_recent_keys(
        capacity in 1usize..=6,
        keys in prop::collection::vec(0u8..16, 1..60),
    ) {
        let mut chain = Chain::in_memory(&[capacity])?;
        let mut recency: Vec<u8> = Vec::new();
        for key in &keys {
            chain.insert(*key, 0)?;
            recency.retain(|k| k != key);
            recency.push(*key);
        }

        let expected: Vec<u8> = recency.iter().rev().take(capacity).rev().copied().collect();
        let actual: Vec<u8> = chain.top().keys().copied().collect();
        prop_assert_eq!(actual, expected);
    }

    /// Property: demoting a clean entry never writes, evicts or flips.
    #[test]
    fn prop_clean_demotion_leaves_store_alone(
        stored in prop::collection::hash_map(0u8..16, any::<u32>(), 1..8),
        key in 0u8..32,
        value in any::<u32>(),
    ) {
        let capacity = stored.len();
        let mut endpoint = StoreEndpoint::new(MemoryStore::with_entries(stored.clone()), capacity)?;
        endpoint.open(&mut Detached)?;

        let outcome = endpoint.demote(&mut Detached, key, Entry::clean(value))?;
        prop_assert!(matches!(outcome, Demotion::Skipped));

        prop_assert_eq!(endpoint.len()?, stored.len());
        for (k, v) in &stored {
            prop_assert_eq!(endpoint.fetch(k)?, Some(*v));
        }
    }
}
