//! Transform component and heading helpers.
//!
//! Models face +Z. A yaw of `θ` radians around +Y gives the ground-plane
//! heading `(sin θ, 0, cos θ)`; positive yaw turns left.

use glam::{Mat4, Quat, Vec3};

/// A 3D transform representing position, rotation, and scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Position, yaw around +Y and a uniform scale.
    pub fn from_position_yaw_scale(position: Vec3, yaw: f32, scale: f32) -> Self {
        Self {
            position,
            rotation: Quat::from_rotation_y(yaw),
            scale: Vec3::splat(scale),
        }
    }

    /// Create the model matrix for this transform.
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Model-space forward (+Z) in world space.
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    /// Rotate around the world Y axis (yaw).
    pub fn rotate_y(&mut self, angle: f32) {
        self.rotation = Quat::from_rotation_y(angle) * self.rotation;
    }
}

/// Ground-plane heading for a yaw angle.
pub fn heading(yaw: f32) -> Vec3 {
    Vec3::new(yaw.sin(), 0.0, yaw.cos())
}

/// Rotation that keeps `yaw` while tilting model +Y onto `up`.
pub fn align_to_ground(yaw: f32, up: Vec3) -> Quat {
    let up = up.normalize_or(Vec3::Y);
    let tilt = Quat::from_rotation_arc(Vec3::Y, up);
    tilt * Quat::from_rotation_y(yaw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaw_rotation_matches_heading() {
        let yaw = 0.7;
        let t = Transform::from_position_yaw_scale(Vec3::ZERO, yaw, 1.0);
        assert!((t.forward() - heading(yaw)).length() < 1e-5);
    }

    #[test]
    fn flat_ground_alignment_is_pure_yaw() {
        let q = align_to_ground(0.4, Vec3::Y);
        assert!(q.angle_between(Quat::from_rotation_y(0.4)) < 1e-4);
    }
}
