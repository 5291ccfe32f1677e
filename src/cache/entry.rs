//! Cache Entry Types
//!
//! A value paired with its write-back state.

use std::fmt;

/// A cached value and its dirty flag.
///
/// Dirty means the copy may differ from the durable one (if any) and must be
/// written back before it can be discarded. An entry is owned by exactly one
/// level slot; promotion and demotion move it, never share it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry<V> {
    /// Cached value
    pub value: V,
    /// Unsynchronized with the durable store
    pub dirty: bool,
}

impl<V> Entry<V> {
    /// Create an entry with an explicit dirty flag
    pub fn new(value: V, dirty: bool) -> Self {
        Self { value, dirty }
    }

    /// A fresh write, not yet persisted
    pub fn dirty(value: V) -> Self {
        Self::new(value, true)
    }

    /// A copy known to match the durable store
    pub fn clean(value: V) -> Self {
        Self::new(value, false)
    }

    /// Flag this entry as the only remaining copy
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Consume the entry, returning the value
    pub fn into_value(self) -> V {
        self.value
    }

    /// Split into `(dirty, value)`
    pub fn into_parts(self) -> (bool, V) {
        (self.dirty, self.value)
    }
}

impl<V: fmt::Display> fmt::Display for Entry<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Python-era dump format kept for log readability
        let dirty = if self.dirty { "True" } else { "False" };
        write!(f, "({}, {})", dirty, self.value)
    }
}

// =============================================================================
// Tests
// =============================================================================
