//! # Engine Constants
//!
//! Defaults shared by the world configuration and its collaborators.

use glam::Vec3;

// =============================================================================
// WORLD DEFAULTS
// =============================================================================

/// Entity slots reserved when a world is created.
pub const DEFAULT_ENTITY_CAPACITY: usize = 1024;

/// Largest up-front reservation a config may request. Worlds still grow
/// past it on demand.
pub const MAX_INITIAL_CAPACITY: usize = 1 << 24;

/// Largest game-time step a single frame may advance (seconds).
pub const DEFAULT_MAX_FRAME_DELTA: f32 = 0.1;

// =============================================================================
// AXES
// =============================================================================

/// Local right axis.
pub const AXIS_RIGHT: Vec3 = Vec3::X;

/// Local up axis, also the yaw axis.
pub const AXIS_UP: Vec3 = Vec3::Y;

/// Local forward axis (right-handed, looking down -Z).
pub const AXIS_FORWARD: Vec3 = Vec3::NEG_Z;

/// Pitch rotates around +X.
pub const AXIS_PITCH: Vec3 = Vec3::X;

/// Yaw rotates around +Y.
pub const AXIS_YAW: Vec3 = Vec3::Y;

/// Roll rotates around +Z.
pub const AXIS_ROLL: Vec3 = Vec3::Z;
