//! # Entity Management
//!
//! Entities are lightweight identifiers consisting of:
//! - An index into the sparse side of component stores
//! - A generation counter for safe reuse
//!
//! A destroyed entity's index is recycled, but its generation is bumped
//! first, so a handle kept past `destroy` is detected as dead instead of
//! silently aliasing the new occupant.

use std::fmt;

use tracing::warn;

/// Unique identifier for an entity.
///
/// The ID is split into two parts:
/// - Lower 32 bits: Index into component lookup tables
/// - Upper 32 bits: Generation counter for detecting stale references
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Entity(u64);

impl Entity {
    /// Null/invalid entity.
    pub const NULL: Self = Self(u64::MAX);

    /// Creates an entity from index and generation.
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64))
    }

    /// Returns the index portion of the handle.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Returns the generation portion of the handle.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }

    /// Checks if this is the null handle.
    #[inline]
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.0 == u64::MAX
    }

    /// Raw 64-bit value.
    #[inline]
    #[must_use]
    pub const fn to_bits(self) -> u64 {
        self.0
    }
}

impl Default for Entity {
    fn default() -> Self {
        Self::NULL
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_null() {
            f.write_str("Entity(NULL)")
        } else {
            write!(f, "Entity({}v{})", self.index(), self.generation())
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Allocates entity handles and tracks which are alive.
///
/// Slot `i` is alive when `alive[i]` is set; its current handle is
/// `Entity::new(i, generations[i])`.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    /// Current generation of every slot ever allocated.
    generations: Vec<u32>,
    /// Liveness of every slot.
    alive: Vec<bool>,
    /// Free list of slot indices for reuse (LIFO).
    free_indices: Vec<u32>,
    /// Number of currently alive entities.
    alive_count: usize,
}

impl EntityRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry with room for `capacity` slots before reallocating.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            generations: Vec::with_capacity(capacity),
            alive: Vec::with_capacity(capacity),
            free_indices: Vec::with_capacity(capacity),
            alive_count: 0,
        }
    }

    /// Allocates a new entity and marks it alive.
    ///
    /// # Panics
    ///
    /// Panics if more than `u32::MAX - 1` slots are requested.
    pub fn create(&mut self) -> Entity {
        let index = if let Some(index) = self.free_indices.pop() {
            self.alive[index as usize] = true;
            index
        } else {
            let next = self.generations.len();
            // u32::MAX is reserved for the null handle's index.
            assert!(next < u32::MAX as usize, "entity index space exhausted");
            let index = next as u32;
            self.generations.push(0);
            self.alive.push(true);
            index
        };

        self.alive_count += 1;
        Entity::new(index, self.generations[index as usize])
    }

    /// Marks an entity dead and recycles its slot.
    ///
    /// Returns `false` (and warns) if the handle was null, stale or already
    /// dead.
    pub fn destroy(&mut self, entity: Entity) -> bool {
        if !self.alive(entity) {
            warn!(%entity, "failed to destroy an entity: entity is not alive");
            return false;
        }

        let idx = entity.index() as usize;
        self.alive[idx] = false;
        // Invalidate every outstanding handle to this slot.
        self.generations[idx] = self.generations[idx].wrapping_add(1);
        self.free_indices.push(entity.index());
        self.alive_count -= 1;
        true
    }

    /// Checks if an entity is alive.
    #[inline]
    #[must_use]
    pub fn alive(&self, entity: Entity) -> bool {
        if entity.is_null() {
            return false;
        }
        let idx = entity.index() as usize;
        idx < self.generations.len()
            && self.alive[idx]
            && self.generations[idx] == entity.generation()
    }

    /// Number of currently alive entities.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.alive_count
    }

    /// Checks if no entity is alive.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.alive_count == 0
    }

    /// Iterates over all alive entities in slot order.
    pub fn iter_alive(&self) -> impl Iterator<Item = Entity> + '_ {
        self.alive
            .iter()
            .zip(&self.generations)
            .enumerate()
            .filter(|(_, (alive, _))| **alive)
            .map(|(idx, (_, &generation))| Entity::new(idx as u32, generation))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_roundtrip() {
        let e = Entity::new(12345, 67890);
        assert_eq!(e.index(), 12345);
        assert_eq!(e.generation(), 67890);
        assert!(!e.is_null());
        assert!(Entity::default().is_null());
    }

    #[test]
    fn test_create_destroy() {
        let mut registry = EntityRegistry::new();

        let e1 = registry.create();
        let e2 = registry.create();
        assert!(registry.alive(e1));
        assert!(registry.alive(e2));
        assert_eq!(registry.len(), 2);

        assert!(registry.destroy(e1));
        assert!(!registry.alive(e1));
        assert!(registry.alive(e2));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_recycled_slot_gets_new_generation() {
        let mut registry = EntityRegistry::new();

        let old = registry.create();
        registry.destroy(old);
        let new = registry.create();

        assert_eq!(new.index(), old.index()); // Same slot
        assert_ne!(new.generation(), old.generation()); // Different generation
        assert!(registry.alive(new));
        assert!(!registry.alive(old));
    }

    #[test]
    fn test_double_destroy_is_rejected() {
        let mut registry = EntityRegistry::new();
        let e = registry.create();
        assert!(registry.destroy(e));
        assert!(!registry.destroy(e));
        assert!(!registry.destroy(Entity::NULL));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_iter_alive() {
        let mut registry = EntityRegistry::with_capacity(8);
        let a = registry.create();
        let b = registry.create();
        let c = registry.create();
        registry.destroy(b);

        let alive: Vec<_> = registry.iter_alive().collect();
        assert_eq!(alive, vec![a, c]);
    }
}
