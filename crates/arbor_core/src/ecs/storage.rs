//! # Component Storage
//!
//! Dense component storage keyed by entity.
//!
//! The storage uses a dense array strategy:
//! - Component payloads live in one contiguous, hole-free `Vec`
//! - A sparse table maps entity index → dense index, O(1) lookup
//! - A reverse table maps dense index → owning entity
//! - Removal swaps the last element into the hole and fixes both tables
//!
//! ```text
//! lookup:  [ 2, -, 0, 1 ]      (by entity index)
//! data:    [ C, D, A ]         (dense)
//! holders: [ e2, e3, e0 ]      (by dense index)
//! ```

use std::collections::HashSet;
use std::fmt;

use super::entity::Entity;
use crate::error::{EcsError, EcsResult};

/// Callback fired with each payload as it leaves the store.
pub type DestructionCallback<T> = Box<dyn FnMut(&T)>;

/// Position of a component payload inside its store's dense array.
///
/// Only valid until the next removal from the same store: swap-removal can
/// relocate any element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ComponentInstance(usize);

impl ComponentInstance {
    /// The instance returned for entities without data.
    pub const INVALID: Self = Self(usize::MAX);

    /// Checks if this instance addresses data.
    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != usize::MAX
    }

    /// Dense array index.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

impl Default for ComponentInstance {
    fn default() -> Self {
        Self::INVALID
    }
}

/// Dense storage for one component type.
///
/// This storage guarantees:
/// - O(1) add, remove and lookup by entity
/// - Hole-free iteration over [`raw_data`](Self::raw_data)
/// - `lookup[holders[i].index()] == i` for every dense index `i`
///
/// # Type Parameters
///
/// * `T` - The component payload
///
/// # Example
///
/// ```rust,ignore
/// let mut holder: ComponentDataHolder<Health> = ComponentDataHolder::new();
/// holder.add(entity, Health(100))?;
/// for hp in holder.raw_data_mut() { hp.0 -= 1; }
/// ```
pub struct ComponentDataHolder<T> {
    /// The dense array of payloads.
    data: Vec<T>,
    /// Entity index → dense index (`ComponentInstance::INVALID` when absent).
    lookup: Vec<ComponentInstance>,
    /// Dense index → owning entity.
    holders: Vec<Entity>,
    /// Fired with every payload that leaves the store.
    destruction_callback: Option<DestructionCallback<T>>,
}

impl<T> Default for ComponentDataHolder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for ComponentDataHolder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentDataHolder")
            .field("data", &self.data)
            .field("holders", &self.holders)
            .finish_non_exhaustive()
    }
}

impl<T> ComponentDataHolder<T> {
    /// Creates an empty store.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            data: Vec::new(),
            lookup: Vec::new(),
            holders: Vec::new(),
            destruction_callback: None,
        }
    }

    /// Creates an empty store sized for `capacity` payloads.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            lookup: Vec::with_capacity(capacity),
            holders: Vec::with_capacity(capacity),
            destruction_callback: None,
        }
    }

    /// Installs the callback fired with each payload on removal or clear.
    ///
    /// Used to release resources the payload refers to but does not own.
    pub fn set_destruction_callback(&mut self, callback: impl FnMut(&T) + 'static) {
        self.destruction_callback = Some(Box::new(callback));
    }

    /// Number of stored payloads.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Checks if the store is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Checks if `entity` owns data here.
    ///
    /// A stale handle whose slot was recycled does not match.
    #[inline]
    #[must_use]
    pub fn contains(&self, entity: Entity) -> bool {
        self.lookup(entity).is_valid()
    }

    /// Dense position of `entity`'s data, or [`ComponentInstance::INVALID`].
    #[inline]
    #[must_use]
    pub fn lookup(&self, entity: Entity) -> ComponentInstance {
        if entity.is_null() {
            return ComponentInstance::INVALID;
        }
        match self.lookup.get(entity.index() as usize) {
            Some(&inst) if inst.is_valid() && self.holders[inst.0] == entity => inst,
            _ => ComponentInstance::INVALID,
        }
    }

    /// Appends data for `entity`.
    ///
    /// # Errors
    ///
    /// [`EcsError::ComponentExists`] if the entity already has data here,
    /// [`EcsError::DeadEntity`] for the null handle.
    pub fn add(&mut self, entity: Entity, value: T) -> EcsResult<ComponentInstance> {
        if entity.is_null() {
            return Err(EcsError::DeadEntity(entity));
        }
        if self.contains(entity) {
            return Err(EcsError::ComponentExists(entity));
        }

        let slot = entity.index() as usize;
        if self.lookup.len() <= slot {
            self.lookup.resize(slot + 1, ComponentInstance::INVALID);
        }

        let inst = ComponentInstance(self.data.len());
        self.lookup[slot] = inst;
        self.data.push(value);
        self.holders.push(entity);

        Ok(inst)
    }

    /// Removes and returns `entity`'s data.
    ///
    /// The last element is swapped into the vacated slot, and the moved
    /// entity's lookup entry is rewritten before this returns.
    ///
    /// # Errors
    ///
    /// [`EcsError::ComponentMissing`] if the entity has no data here.
    pub fn remove(&mut self, entity: Entity) -> EcsResult<T> {
        let inst = self.lookup(entity);
        if !inst.is_valid() {
            return Err(EcsError::ComponentMissing(entity));
        }
        debug_assert!(!self.data.is_empty(), "removing from an empty store");

        let idx = inst.0;
        self.lookup[entity.index() as usize] = ComponentInstance::INVALID;

        // Swap the tail into the hole, then pop.
        let removed = self.data.swap_remove(idx);
        self.holders.swap_remove(idx);

        if idx < self.data.len() {
            let moved = self.holders[idx];
            self.lookup[moved.index() as usize] = ComponentInstance(idx);
        }

        if let Some(callback) = self.destruction_callback.as_mut() {
            callback(&removed);
        }

        Ok(removed)
    }

    /// Removes every listed entity that has data here.
    ///
    /// Call only at a frame boundary, never while another system holds
    /// positions into [`raw_data`](Self::raw_data).
    ///
    /// Returns the number of payloads evicted.
    pub fn clean_step(&mut self, deleted: &HashSet<Entity>) -> usize {
        deleted
            .iter()
            .filter(|&&entity| self.remove(entity).is_ok())
            .count()
    }

    /// Drops every payload, firing the destruction callback for each.
    pub fn clear(&mut self) {
        if let Some(callback) = self.destruction_callback.as_mut() {
            for value in &self.data {
                callback(value);
            }
        }
        self.data.clear();
        self.lookup.clear();
        self.holders.clear();
    }

    /// Data for `entity`, if any.
    #[inline]
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<&T> {
        let inst = self.lookup(entity);
        inst.is_valid().then(|| &self.data[inst.0])
    }

    /// Mutable data for `entity`, if any.
    #[inline]
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        let inst = self.lookup(entity);
        if inst.is_valid() {
            Some(&mut self.data[inst.0])
        } else {
            None
        }
    }

    /// Data at a dense position obtained from [`lookup`](Self::lookup).
    ///
    /// # Panics
    ///
    /// Panics if `inst` is invalid or out of range.
    #[inline]
    #[must_use]
    pub fn instance_data(&self, inst: ComponentInstance) -> &T {
        debug_assert!(inst.is_valid(), "dereferencing an invalid component instance");
        &self.data[inst.0]
    }

    /// Mutable data at a dense position obtained from [`lookup`](Self::lookup).
    ///
    /// # Panics
    ///
    /// Panics if `inst` is invalid or out of range.
    #[inline]
    pub fn instance_data_mut(&mut self, inst: ComponentInstance) -> &mut T {
        debug_assert!(inst.is_valid(), "dereferencing an invalid component instance");
        &mut self.data[inst.0]
    }

    /// Entity owning the data at a dense position.
    #[inline]
    #[must_use]
    pub fn holder(&self, inst: ComponentInstance) -> Option<Entity> {
        self.holders.get(inst.0).copied()
    }

    /// The dense payload array, for bulk per-frame iteration.
    #[inline]
    #[must_use]
    pub fn raw_data(&self) -> &[T] {
        &self.data
    }

    /// Mutable dense payload array.
    #[inline]
    pub fn raw_data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Owning entities, parallel to [`raw_data`](Self::raw_data).
    #[inline]
    #[must_use]
    pub fn holders(&self) -> &[Entity] {
        &self.holders
    }

    /// Iterates over `(entity, data)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.holders.iter().copied().zip(self.data.iter())
    }

    /// Iterates mutably over `(entity, data)` pairs in dense order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.holders.iter().copied().zip(self.data.iter_mut())
    }
}

impl<T> Drop for ComponentDataHolder<T> {
    fn drop(&mut self) {
        self.clear();
    }
}
