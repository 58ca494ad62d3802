//! Transform types shared between the scene graph and its collaborators.
//!
//! These are the canonical representations handed to the renderer (world
//! matrices), received from physics (rigid world transforms) and authored by
//! the entity loader (local position/orientation/scale).

use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Position, orientation and scale plus their combined matrix.
///
/// `combined` is only meaningful once [`Transform::rebuild_combined`] (or a
/// composition) has run; the scene graph tracks that with its dirty flag.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    /// `Translate * Rotate * Scale`.
    pub combined: Mat4,
    /// Orientation as a unit quaternion.
    pub orientation: Quat,
    /// Translation.
    pub position: Vec3,
    /// Per-axis scale.
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    /// No translation, no rotation, unit scale.
    pub const IDENTITY: Self = Self {
        combined: Mat4::IDENTITY,
        orientation: Quat::IDENTITY,
        position: Vec3::ZERO,
        scale: Vec3::ONE,
    };

    /// Creates a transform from its parts and builds the combined matrix.
    #[must_use]
    pub fn new(position: Vec3, orientation: Quat, scale: Vec3) -> Self {
        let mut transform = Self {
            combined: Mat4::IDENTITY,
            orientation,
            position,
            scale,
        };
        transform.rebuild_combined();
        transform
    }

    /// Translation-only transform.
    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY, Vec3::ONE)
    }

    /// Recomputes `combined` as `Translate * Rotate * Scale`.
    ///
    /// The order is fixed: scale is applied first, translation last.
    #[inline]
    pub fn rebuild_combined(&mut self) {
        self.combined = Mat4::from_translation(self.position)
            * Mat4::from_quat(self.orientation)
            * Mat4::from_scale(self.scale);
    }

    /// Composes `local` under `self` (the parent's world transform).
    ///
    /// The matrix is a true product. Orientation is composed from the
    /// quaternions directly so it never drifts from the matrix decomposition.
    /// Scale is multiplied per axis, which is exact only for axis-aligned,
    /// non-skewed scale chains.
    #[inline]
    #[must_use]
    pub fn compose(&self, local: &Self) -> Self {
        let combined = self.combined * local.combined;
        Self {
            combined,
            orientation: self.orientation * local.orientation,
            position: combined.w_axis.truncate(),
            scale: self.scale * local.scale,
        }
    }
}

/// World transform authored by a rigid-body simulation.
///
/// Rigid bodies carry no scale; the scene graph reuses the entity's own
/// local scale when applying one of these.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RigidTransform {
    /// World-space origin.
    pub position: Vec3,
    /// World-space orientation.
    pub orientation: Quat,
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            orientation: Quat::IDENTITY,
        }
    }
}

impl RigidTransform {
    /// Creates a rigid transform.
    #[must_use]
    pub const fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// The rotation+translation matrix, without scale.
    #[inline]
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation, self.position)
    }
}

/// Converts Euler angles in degrees (x = pitch, y = yaw, z = roll) to a
/// quaternion composed as `Z * Y * X`.
#[must_use]
pub fn quat_from_euler_degrees(degrees: Vec3) -> Quat {
    Quat::from_euler(
        EulerRot::ZYX,
        degrees.z.to_radians(),
        degrees.y.to_radians(),
        degrees.x.to_radians(),
    )
}

/// Inverse of [`quat_from_euler_degrees`].
#[must_use]
pub fn euler_degrees_from_quat(orientation: Quat) -> Vec3 {
    let (z, y, x) = orientation.to_euler(EulerRot::ZYX);
    Vec3::new(x.to_degrees(), y.to_degrees(), z.to_degrees())
}

/// Normalized rotation of `degrees` around `axis`.
///
/// A zero axis yields the identity rotation.
#[must_use]
pub fn quat_from_axis_degrees(axis: Vec3, degrees: f32) -> Quat {
    let axis = axis.normalize_or_zero();
    if axis == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    Quat::from_axis_angle(axis, degrees.to_radians()).normalize()
}

/// Reinterprets a run of matrices as raw bytes for buffer upload.
#[inline]
#[must_use]
pub fn matrices_as_bytes(matrices: &[Mat4]) -> &[u8] {
    bytemuck::cast_slice(matrices)
}
