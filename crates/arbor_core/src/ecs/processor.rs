//! # Component Processors
//!
//! A processor owns the storage and behaviour of one component type.
//! The [`World`](super::World) only talks to processors through this trait
//! when tearing entities down or driving a frame.

use std::any::Any;
use std::collections::HashSet;

use super::entity::Entity;

/// Lifecycle contract every engine or user processor implements.
///
/// # Example
///
/// ```rust,ignore
/// struct HealthProcessor { data: ComponentDataHolder<u32> }
///
/// impl ComponentProcessor for HealthProcessor {
///     fn has(&self, e: Entity) -> bool { self.data.contains(e) }
///     fn add(&mut self, e: Entity) { let _ = self.data.add(e, 100); }
///     fn remove(&mut self, e: Entity) { let _ = self.data.remove(e); }
///     fn as_any(&self) -> &dyn Any { self }
///     fn as_any_mut(&mut self) -> &mut dyn Any { self }
/// }
/// ```
pub trait ComponentProcessor: Any {
    /// Checks if the processor holds data for `entity`.
    fn has(&self, entity: Entity) -> bool;

    /// Attaches the component with its default payload.
    ///
    /// Adding twice is misuse: implementations warn and do nothing.
    fn add(&mut self, entity: Entity);

    /// Detaches the component, restoring any invariants the processor
    /// maintains across entities before the payload is evicted.
    fn remove(&mut self, entity: Entity);

    /// Per-frame bookkeeping.
    fn update(&mut self, _dt: f32) {}

    /// Evicts a batch of entities at a frame boundary.
    fn clean_step(&mut self, deleted: &HashSet<Entity>) {
        for &entity in deleted {
            if self.has(entity) {
                self.remove(entity);
            }
        }
    }

    /// Upcast for typed lookup.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for typed lookup.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Rigid-body simulation feeding world transforms into the scene graph.
///
/// Called once per unpaused frame, before any user code runs. The
/// implementation pushes transforms for root bodies through
/// [`SceneGraphProcessor::set_world_transform`](crate::scene::SceneGraphProcessor::set_world_transform).
pub trait PhysicsStep {
    /// Advances the simulation by `dt` seconds.
    fn step(&mut self, dt: f32, scene: &mut crate::scene::SceneGraphProcessor);
}
