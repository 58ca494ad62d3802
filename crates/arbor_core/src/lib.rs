//! # Arbor Core
//!
//! Entity storage and the scene-graph transform hierarchy built on it.
//!
//! - [`ComponentDataHolder`]: dense per-component storage with O(1)
//!   add/remove/lookup through swap-removal
//! - [`SceneGraphProcessor`]: parent/child graph with eagerly propagated
//!   world transforms
//! - [`World`]: entity lifecycle, processor registry and frame order
//!
//! ## Example
//!
//! ```rust,ignore
//! use arbor_core::World;
//! use glam::Vec3;
//!
//! let mut world = World::new();
//! let a = world.spawn();
//! let b = world.spawn();
//! world.scene_graph_mut().attach_child(a, b);
//! world.scene_graph_mut().set_position(a, Vec3::X);
//! assert_eq!(world.scene_graph().world_position(b), Some(Vec3::X));
//! ```
//!
//! The crate logs through `tracing` and never installs a subscriber.

#![warn(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod loader;
pub mod scene;
pub mod tags;
pub mod time;

pub use config::WorldConfig;
pub use ecs::{
    ComponentDataHolder, ComponentInstance, ComponentProcessor, Entity, EntityRegistry,
    PhysicsStep, World,
};
pub use error::{ConfigError, EcsError, EcsResult, LoadError};
pub use loader::{ComponentDescription, ComponentLoader, EntityDescription, EntityLoader};
pub use scene::SceneGraphProcessor;
pub use tags::TagProcessor;
pub use time::{ListenerId, TimeManager};
