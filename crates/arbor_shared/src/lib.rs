//! # Arbor Shared
//!
//! Value types used by the scene core and by the systems that feed it or
//! read from it (physics, rendering, entity loading).
//!
//! ## Rule
//!
//! This crate knows nothing about entities or storage. If a type needs an
//! `Entity`, it belongs in `arbor_core`.

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod constants;
pub mod math;

pub use constants::{DEFAULT_ENTITY_CAPACITY, DEFAULT_MAX_FRAME_DELTA, MAX_INITIAL_CAPACITY};
pub use glam::{Mat4, Quat, Vec3};
pub use math::{
    euler_degrees_from_quat, matrices_as_bytes, quat_from_axis_degrees, quat_from_euler_degrees,
    RigidTransform, Transform,
};
