//! Arcade vehicle model.

use engine_core::DriveInput;

use crate::VehicleConfig;

/// Key → speed model.
///
/// Throttle sets the forward speed directly, brake sets the reverse speed.
/// With neither held the speed decays exponentially. Turning scales with
/// speed so a stationary car cannot pivot.
#[derive(Debug, Clone, Default)]
pub struct BasicModel {
    /// Signed speed along the heading, world units per second.
    pub speed: f32,
}

impl BasicModel {
    /// Advance one step. Returns the yaw change and the distance travelled
    /// along the (new) heading.
    pub fn step(&mut self, input: &DriveInput, config: &VehicleConfig, dt: f32) -> (f32, f32) {
        let max = config.move_speed;
        let drive = input.throttle - input.brake;
        if drive.abs() > f32::EPSILON {
            self.speed = max * drive;
        } else {
            self.speed *= (-config.basic_friction * dt).exp();
            if self.speed.abs() < 0.01 {
                self.speed = 0.0;
            }
        }
        self.speed = self.speed.clamp(-max, max);

        let speed_ratio = if max > 0.0 { self.speed / max } else { 0.0 };
        let yaw_delta = config.rotation_speed * input.steer * speed_ratio * dt;
        (yaw_delta, self.speed * dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held(throttle: f32, brake: f32, steer: f32) -> DriveInput {
        DriveInput { throttle, brake, steer, handbrake: false }
    }

    /// Holding throttle for minutes never exceeds the configured top speed.
    #[test]
    fn speed_is_bounded() {
        let config = VehicleConfig::default();
        let mut model = BasicModel::default();
        for _ in 0..10_000 {
            model.step(&held(1.0, 0.0, 0.0), &config, 1.0 / 60.0);
            assert!(model.speed.abs() <= config.move_speed);
        }
    }

    #[test]
    fn release_decays_without_reversing() {
        let config = VehicleConfig::default();
        let mut model = BasicModel { speed: config.move_speed };
        for _ in 0..600 {
            model.step(&DriveInput::default(), &config, 1.0 / 60.0);
            assert!(model.speed >= 0.0);
        }
        assert_eq!(model.speed, 0.0);
    }

    #[test]
    fn stationary_car_does_not_pivot() {
        let config = VehicleConfig::default();
        let mut model = BasicModel::default();
        let (yaw, dist) = model.step(&held(0.0, 0.0, 1.0), &config, 0.1);
        assert_eq!(yaw, 0.0);
        assert_eq!(dist, 0.0);
    }

    #[test]
    fn reversing_flips_the_turn() {
        let config = VehicleConfig::default();
        let mut model = BasicModel::default();
        let (forward_yaw, _) = model.step(&held(1.0, 0.0, 1.0), &config, 0.1);
        let (reverse_yaw, _) = model.step(&held(0.0, 1.0, 1.0), &config, 0.1);
        assert!(forward_yaw > 0.0);
        assert!(reverse_yaw < 0.0);
    }
}
