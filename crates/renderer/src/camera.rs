//! Look-at camera used for the main and reflection passes.

use glam::{Mat4, Vec3};

/// Perspective camera with configurable FOV and clipping planes.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Field of view in degrees.
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Aspect ratio (width / height).
    pub aspect: f32,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 5.0, -10.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_degrees: 60.0,
            near: 0.1,
            far: 1000.0,
            aspect: 16.0 / 9.0,
        }
    }
}

impl Camera {
    pub fn new(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            target,
            ..Default::default()
        }
    }

    /// Update aspect ratio (call on window resize).
    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn look_at(&mut self, position: Vec3, target: Vec3) {
        self.position = position;
        self.target = target;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or(Vec3::Z)
    }

    /// Mirror image of this camera below the horizontal plane `y = height`.
    pub fn reflected(&self, height: f32) -> Self {
        let mirror = |p: Vec3| Vec3::new(p.x, 2.0 * height - p.y, p.z);
        Self {
            position: mirror(self.position),
            target: mirror(self.target),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reflection_mirrors_about_the_plane() {
        let camera = Camera::new(Vec3::new(1.0, 5.0, 2.0), Vec3::new(0.0, 1.0, 0.0));
        let mirrored = camera.reflected(1.0);
        assert_eq!(mirrored.position, Vec3::new(1.0, -3.0, 2.0));
        assert_eq!(mirrored.target, Vec3::new(0.0, 1.0, 0.0));
        assert!((mirrored.forward().y + camera.forward().y).abs() < 1e-6);
    }

    #[test]
    fn zero_height_resize_keeps_aspect_finite() {
        let mut camera = Camera::default();
        camera.set_aspect(800, 0);
        assert!(camera.aspect.is_finite());
        camera.set_aspect(800, 400);
        assert_eq!(camera.aspect, 2.0);
    }
}
