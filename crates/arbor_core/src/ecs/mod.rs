//! # Entity Component System
//!
//! Entities are bare handles; each component type lives in the dense store
//! of the processor that owns it.
//!
//! ## Design Philosophy
//!
//! - Components are stored in hole-free arrays for cache-friendly iteration
//! - Entity handles carry a generation so stale handles are detected
//! - Processors restore their own cross-entity invariants on removal
//! - The [`World`] decides destruction and update order

mod entity;
mod processor;
mod storage;
mod world;

pub use entity::{Entity, EntityRegistry};
pub use processor::{ComponentProcessor, PhysicsStep};
pub use storage::{ComponentDataHolder, ComponentInstance, DestructionCallback};
pub use world::World;
