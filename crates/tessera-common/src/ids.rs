//! ID types for entities.

use serde::{Deserialize, Serialize};

/// Unique identifier for an entity in the game world.
///
/// Stable across save/load; it is the link between a serialized entity
/// record and its rebuilt runtime proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(u64);

impl EntityId {
    /// Null/invalid entity ID.
    pub const NULL: Self = Self(0);

    /// Creates an entity ID from a raw value (for deserialization).
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Checks if this is a valid (non-null) entity ID.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::NULL
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out entity IDs for one world.
///
/// Owned (and persisted) by the world that uses it, so separate worlds and
/// separate tests never share a counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    /// Creates an allocator whose first ID is `#1`.
    #[must_use]
    pub const fn new() -> Self {
        Self { next: 1 }
    }

    /// Returns a fresh, never-before-issued ID.
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.wrapping_add(1).max(1);
        id
    }

    /// Ensures IDs issued later never collide with `id`.
    pub fn observe(&mut self, id: EntityId) {
        if id.0 >= self.next {
            self.next = id.0.wrapping_add(1).max(1);
        }
    }

    /// The ID the next call to [`allocate`](Self::allocate) returns.
    #[must_use]
    pub const fn peek(&self) -> EntityId {
        EntityId(self.next)
    }
}

impl Default for EntityIdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_sequence() {
        let mut ids = EntityIdAllocator::new();
        let a = ids.allocate();
        let b = ids.allocate();
        assert!(a.is_valid());
        assert_ne!(a, b);
        assert_eq!(b.raw(), a.raw() + 1);
    }

    #[test]
    fn test_allocators_are_independent() {
        let mut first = EntityIdAllocator::new();
        let mut second = EntityIdAllocator::new();
        assert_eq!(first.allocate(), second.allocate());
    }

    #[test]
    fn test_observe_skips_past_loaded_ids() {
        let mut ids = EntityIdAllocator::new();
        ids.observe(EntityId::from_raw(41));
        assert_eq!(ids.allocate(), EntityId::from_raw(42));

        ids.observe(EntityId::from_raw(3));
        assert_eq!(ids.peek(), EntityId::from_raw(43));
    }

    #[test]
    fn test_null_id() {
        assert!(!EntityId::NULL.is_valid());
        assert_eq!(EntityId::default(), EntityId::NULL);
    }
}
