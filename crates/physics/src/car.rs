//! Physics vehicle model.
//!
//! A bicycle-style 2D car: axle loads shift with longitudinal acceleration,
//! each axle produces a lateral force from its slip angle (linear up to the
//! tyre grip limit), and the imbalance between axles becomes yaw torque.
//! Everything here is in metres and seconds; [`crate::Vehicle`] converts to
//! world units.

use engine_core::DriveInput;
use glam::Vec2;

use crate::VehicleConfig;

/// Steering speed reduction never goes beyond this speed (m/s).
const SAFE_STEER_MAX_SPEED: f32 = 250.0;
/// Speed at which steering would be fully suppressed (m/s).
const SAFE_STEER_ZERO_SPEED: f32 = 280.0;

#[derive(Debug, Clone, Default)]
pub struct CarModel {
    /// Ground-plane velocity, world axes.
    pub velocity: Vec2,
    /// Acceleration in car space: x forward, y left.
    pub accel_c: Vec2,
    pub yaw_rate: f32,
    /// Filtered steering wheel position in `[-1, 1]`.
    pub wheel: f32,
    /// Steering after the speed reduction, in `[-1, 1]`.
    pub steer: f32,
    pub steer_angle: f32,
    pub abs_velocity: f32,
}

/// Zero-preserving sign.
fn sign(v: f32) -> f32 {
    if v > 0.0 {
        1.0
    } else if v < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Move the steering wheel towards `input` at a finite rate and return it
/// to centre when released.
pub fn filter_steering(wheel: f32, input: f32, config: &VehicleConfig, dt: f32) -> f32 {
    if input.abs() > 0.001 {
        (wheel + input * dt * config.steer_rate).clamp(-1.0, 1.0)
    } else if wheel > 0.0 {
        (wheel - dt * config.steer_return).max(0.0)
    } else {
        (wheel + dt * config.steer_return).min(0.0)
    }
}

/// Effective steering for a filtered wheel position at the given speed.
/// Faster cars get less steering lock.
pub fn smooth_steering(wheel: f32, abs_velocity: f32) -> f32 {
    let speed = abs_velocity.min(SAFE_STEER_MAX_SPEED);
    wheel * (1.0 - speed / SAFE_STEER_ZERO_SPEED)
}

impl CarModel {
    /// Integrate one step. `yaw` is updated in place; returns the
    /// displacement in metres.
    pub fn step(&mut self, input: &DriveInput, config: &VehicleConfig, yaw: &mut f32, dt: f32) -> Vec2 {
        self.wheel = filter_steering(self.wheel, input.steer, config, dt);
        self.steer = smooth_steering(self.wheel, self.abs_velocity);
        self.steer_angle = self.steer * config.max_steer;

        let forward = Vec2::new(yaw.sin(), yaw.cos());
        let left = Vec2::new(yaw.cos(), -yaw.sin());
        let v_long = self.velocity.dot(forward);
        let v_lat = self.velocity.dot(left);

        let wheel_base = config.wheel_base();
        let shift = config.weight_transfer * self.accel_c.x * config.cg_height / wheel_base;
        let axle_weight_front =
            config.mass * (config.cg_to_rear_axle / wheel_base * config.gravity - shift);
        let axle_weight_rear =
            config.mass * (config.cg_to_front_axle / wheel_base * config.gravity + shift);

        let yaw_speed_front = config.cg_to_front_axle * self.yaw_rate;
        let yaw_speed_rear = -config.cg_to_rear_axle * self.yaw_rate;
        let slip_front = (v_lat + yaw_speed_front).atan2(v_long.abs()) - sign(v_long) * self.steer_angle;
        let slip_rear = (v_lat + yaw_speed_rear).atan2(v_long.abs());

        let ebrake = if input.handbrake { 1.0 } else { 0.0 };
        let grip_front = config.tire_grip;
        let grip_rear = config.tire_grip * (1.0 - ebrake * (1.0 - config.lock_grip));
        let friction_front =
            (-config.corner_stiffness_front * slip_front).clamp(-grip_front, grip_front) * axle_weight_front;
        let friction_rear =
            (-config.corner_stiffness_rear * slip_rear).clamp(-grip_rear, grip_rear) * axle_weight_rear;

        let brake = (input.brake * config.brake_force + ebrake * config.ebrake_force).min(config.brake_force);
        let coast = if input.throttle > 0.0 { 0.0 } else { config.coast_force };
        let traction = input.throttle * config.engine_force - (brake + coast) * sign(v_long);

        let drag_long = -config.roll_resist * v_long - config.air_resist * v_long * v_long.abs();
        let drag_lat = -config.roll_resist * v_lat - config.air_resist * v_lat * v_lat.abs();

        let force_long = drag_long + traction;
        let force_lat = drag_lat + self.steer_angle.cos() * friction_front + friction_rear;
        self.accel_c = Vec2::new(force_long / config.mass, force_lat / config.mass);

        let accel = forward * self.accel_c.x + left * self.accel_c.y;
        let next = self.velocity + accel * dt;
        // Braking forces may stop the car but never push it backwards.
        if input.throttle <= 0.0 && v_long * next.dot(forward) < 0.0 {
            self.velocity = left * next.dot(left);
        } else {
            self.velocity = next;
        }
        self.abs_velocity = self.velocity.length();

        let mut torque = friction_front * config.cg_to_front_axle - friction_rear * config.cg_to_rear_axle;
        if self.abs_velocity < config.stop_speed && input.throttle <= 0.0 {
            self.velocity = Vec2::ZERO;
            self.abs_velocity = 0.0;
            self.yaw_rate = 0.0;
            torque = 0.0;
        }

        self.yaw_rate += torque / config.inertia() * dt;
        *yaw += self.yaw_rate * dt;
        self.velocity * dt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 1.0 / 120.0;

    fn run(model: &mut CarModel, input: DriveInput, seconds: f32, yaw: &mut f32) {
        let config = VehicleConfig::default();
        for _ in 0..(seconds / DT) as usize {
            model.step(&input, &config, yaw, DT);
        }
    }

    /// Coasting from speed ends at rest, and the car never rolls backwards
    /// on the way there.
    #[test]
    fn coasting_stops_without_reversal() {
        let config = VehicleConfig::default();
        let mut yaw: f32 = 0.3;
        let forward = Vec2::new(yaw.sin(), yaw.cos());
        let mut model = CarModel { velocity: forward * 20.0, ..Default::default() };
        for _ in 0..(30.0 / DT) as usize {
            model.step(&DriveInput::default(), &config, &mut yaw, DT);
            assert!(model.velocity.dot(forward) >= 0.0);
        }
        assert!(model.abs_velocity < 1e-3);
    }

    #[test]
    fn braking_at_rest_does_not_reverse() {
        let mut yaw = 0.0;
        let mut model = CarModel::default();
        let brake = DriveInput { brake: 1.0, ..Default::default() };
        run(&mut model, brake, 2.0, &mut yaw);
        assert_eq!(model.velocity, Vec2::ZERO);
    }

    #[test]
    fn steering_left_turns_left() {
        let mut yaw = 0.0;
        let mut model = CarModel::default();
        let throttle = DriveInput { throttle: 1.0, ..Default::default() };
        run(&mut model, throttle, 2.0, &mut yaw);
        assert!(model.abs_velocity > 5.0);
        let turning = DriveInput { throttle: 0.5, steer: 1.0, ..Default::default() };
        run(&mut model, turning, 0.5, &mut yaw);
        assert!(yaw > 0.0, "yaw {yaw}");
    }

    #[test]
    fn smooth_steering_stays_in_range() {
        let config = VehicleConfig::default();
        let mut wheel = 0.0;
        for _ in 0..200 {
            wheel = filter_steering(wheel, 1.0, &config, 0.05);
            let steer = smooth_steering(wheel, 400.0);
            assert!((-1.0..=1.0).contains(&wheel));
            assert!((0.0..=1.0).contains(&steer));
        }
        assert_eq!(wheel, 1.0);
        // Release returns the wheel to centre without overshoot.
        for _ in 0..200 {
            wheel = filter_steering(wheel, 0.0, &config, 0.05);
            assert!(wheel >= 0.0);
        }
        assert_eq!(wheel, 0.0);
    }
}
