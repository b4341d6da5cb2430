//! Chase camera that follows the player, with mouse orbit and scroll zoom.

use engine_core::{heading, Vec2, Vec3};
use renderer::Camera;
use terrain::Terrain;

const ORBIT_SENSITIVITY: f32 = 0.005;
const ZOOM_STEP: f32 = 0.9;
const MIN_PITCH: f32 = 0.05;
const MAX_PITCH: f32 = 1.4;
/// Closest the eye may get to the ground.
const GROUND_CLEARANCE: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct FollowCamera {
    pub distance: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Elevation above the horizon, radians.
    pub pitch: f32,
    /// Orbit around the player relative to its heading, radians.
    pub orbit: f32,
    /// Look-at point above the player's origin.
    pub target_height: f32,
}

impl Default for FollowCamera {
    fn default() -> Self {
        Self {
            distance: 12.0,
            min_distance: 4.0,
            max_distance: 60.0,
            pitch: 0.35,
            orbit: 0.0,
            target_height: 1.5,
        }
    }
}

impl FollowCamera {
    /// Apply one frame of orbit drag (pixels) and scroll (lines).
    pub fn handle_input(&mut self, orbit_delta: Vec2, scroll: f32) {
        self.orbit -= orbit_delta.x * ORBIT_SENSITIVITY;
        self.pitch = (self.pitch + orbit_delta.y * ORBIT_SENSITIVITY).clamp(MIN_PITCH, MAX_PITCH);
        if scroll != 0.0 {
            self.distance = (self.distance * ZOOM_STEP.powf(scroll)).clamp(self.min_distance, self.max_distance);
        }
    }

    /// Eye position behind a player at `target` facing `yaw`.
    pub fn eye(&self, target: Vec3, yaw: f32) -> Vec3 {
        let behind = -heading(yaw + self.orbit);
        let (sin, cos) = self.pitch.sin_cos();
        self.focus(target) + behind * cos * self.distance + Vec3::Y * sin * self.distance
    }

    fn focus(&self, target: Vec3) -> Vec3 {
        target + Vec3::Y * self.target_height
    }

    /// Point `camera` at the player, keeping the eye above the terrain.
    pub fn apply(&self, camera: &mut Camera, target: Vec3, yaw: f32, terrain: &Terrain) {
        let mut eye = self.eye(target, yaw);
        eye.y = eye.y.max(terrain.get_height(eye.x, eye.z) + GROUND_CLEARANCE);
        camera.look_at(eye, self.focus(target));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eye_sits_behind_and_above_the_player() {
        let rig = FollowCamera::default();
        let eye = rig.eye(Vec3::ZERO, 0.0);
        // Heading at yaw 0 is +Z, so the camera trails on -Z.
        assert!(eye.z < 0.0);
        assert!(eye.y > rig.target_height);
        assert!(eye.x.abs() < 1e-5);
        let dist = (eye - Vec3::Y * rig.target_height).length();
        assert!((dist - rig.distance).abs() < 1e-4);
    }

    #[test]
    fn zoom_and_pitch_stay_in_range() {
        let mut rig = FollowCamera::default();
        rig.handle_input(Vec2::ZERO, 100.0);
        assert_eq!(rig.distance, rig.min_distance);
        rig.handle_input(Vec2::ZERO, -100.0);
        assert_eq!(rig.distance, rig.max_distance);
        rig.handle_input(Vec2::new(0.0, 10_000.0), 0.0);
        assert_eq!(rig.pitch, MAX_PITCH);
    }

    #[test]
    fn camera_never_goes_underground() {
        let terrain = Terrain::flat(100.0, 17).unwrap();
        let mut rig = FollowCamera::default();
        rig.pitch = MIN_PITCH;
        rig.target_height = -5.0;
        let mut camera = Camera::default();
        rig.apply(&mut camera, Vec3::ZERO, 0.0, &terrain);
        assert!(camera.position.y >= GROUND_CLEARANCE - 1e-6);
    }
}
