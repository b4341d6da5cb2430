//! Vehicle front end shared by both control modes.

use engine_core::{heading, DriveInput, Vec3};
use glam::Vec2;

use crate::{BasicModel, CarModel, VehicleConfig};

/// Handling model, chosen once when the vehicle is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    Basic,
    Physics,
}

#[derive(Debug, Clone)]
enum Dynamics {
    Basic(BasicModel),
    Physics(CarModel),
}

/// A drivable vehicle in the ground plane.
#[derive(Debug, Clone)]
pub struct Vehicle {
    config: VehicleConfig,
    dynamics: Dynamics,
    /// Ground position, world `(x, z)`.
    position: Vec2,
    /// Heading angle around +Y.
    yaw: f32,
    input: DriveInput,
}

impl Vehicle {
    pub fn new(mode: ControlMode, config: VehicleConfig, position: Vec2, yaw: f32) -> Self {
        let dynamics = match mode {
            ControlMode::Basic => Dynamics::Basic(BasicModel::default()),
            ControlMode::Physics => Dynamics::Physics(CarModel::default()),
        };
        log::debug!("Vehicle ready: {:?} mode at {} facing {:.2}", mode, position, yaw);
        Self {
            config,
            dynamics,
            position,
            yaw,
            input: DriveInput::default(),
        }
    }

    pub fn mode(&self) -> ControlMode {
        match self.dynamics {
            Dynamics::Basic(_) => ControlMode::Basic,
            Dynamics::Physics(_) => ControlMode::Physics,
        }
    }

    pub fn config(&self) -> &VehicleConfig {
        &self.config
    }

    /// Advance by `dt` seconds with the given controls. Returns `true` if
    /// the vehicle moved or turned.
    pub fn update(&mut self, input: DriveInput, dt: f32) -> bool {
        self.input = input.clamped();
        if dt <= 0.0 {
            return false;
        }
        let start = (self.position, self.yaw);

        match &mut self.dynamics {
            Dynamics::Basic(model) => {
                let (yaw_delta, distance) = model.step(&self.input, &self.config, dt);
                self.yaw += yaw_delta;
                let dir = heading(self.yaw);
                self.position += Vec2::new(dir.x, dir.z) * distance;
            }
            Dynamics::Physics(model) => {
                let substeps = (dt / self.config.max_substep.max(1e-4)).ceil().max(1.0) as u32;
                let h = dt / substeps as f32;
                for _ in 0..substeps {
                    let metres = model.step(&self.input, &self.config, &mut self.yaw, h);
                    self.position += metres * self.config.world_scale;
                }
            }
        }

        start != (self.position, self.yaw)
    }

    /// Ground position, world `(x, z)`.
    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Unit heading in world space (y = 0).
    pub fn direction(&self) -> Vec3 {
        heading(self.yaw)
    }

    /// Keep the vehicle inside `[min, max]`; hitting the edge stops it.
    pub fn confine(&mut self, min: Vec2, max: Vec2) -> bool {
        let clamped = self.position.clamp(min, max);
        if clamped == self.position {
            return false;
        }
        self.position = clamped;
        self.stop();
        true
    }

    /// Bring the vehicle to rest immediately.
    pub fn stop(&mut self) {
        match &mut self.dynamics {
            Dynamics::Basic(model) => model.speed = 0.0,
            Dynamics::Physics(model) => {
                model.velocity = Vec2::ZERO;
                model.abs_velocity = 0.0;
                model.yaw_rate = 0.0;
                model.accel_c = Vec2::ZERO;
            }
        }
    }

    pub fn throttle(&self) -> f32 {
        self.input.throttle
    }

    pub fn brake(&self) -> f32 {
        self.input.brake
    }

    /// Steering currently applied, after any filtering.
    pub fn steer(&self) -> f32 {
        match &self.dynamics {
            Dynamics::Basic(_) => self.input.steer,
            Dynamics::Physics(model) => model.steer,
        }
    }

    pub fn handbrake(&self) -> bool {
        self.input.handbrake
    }

    /// Speed in world units per second.
    pub fn abs_velocity(&self) -> f32 {
        match &self.dynamics {
            Dynamics::Basic(model) => model.speed.abs(),
            Dynamics::Physics(model) => model.abs_velocity * self.config.world_scale,
        }
    }

    /// Signed speed along the heading, world units per second.
    pub fn forward_speed(&self) -> f32 {
        match &self.dynamics {
            Dynamics::Basic(model) => model.speed,
            Dynamics::Physics(model) => {
                let dir = self.direction();
                model.velocity.dot(Vec2::new(dir.x, dir.z)) * self.config.world_scale
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One second of full throttle in basic mode covers exactly
    /// `move_speed` units along the starting heading.
    #[test]
    fn basic_forward_one_second() {
        let config = VehicleConfig::default();
        let yaw = 0.9;
        let mut vehicle = Vehicle::new(ControlMode::Basic, config.clone(), Vec2::ZERO, yaw);
        let input = DriveInput { throttle: 1.0, ..Default::default() };
        for _ in 0..60 {
            assert!(vehicle.update(input, 1.0 / 60.0));
        }
        let dir = heading(yaw);
        let expected = Vec2::new(dir.x, dir.z) * config.move_speed;
        assert!((vehicle.position() - expected).length() < 1e-3);
    }

    #[test]
    fn physics_mode_settles_with_no_input() {
        let mut vehicle = Vehicle::new(ControlMode::Physics, VehicleConfig::default(), Vec2::ZERO, 0.0);
        let go = DriveInput { throttle: 1.0, ..Default::default() };
        for _ in 0..180 {
            vehicle.update(go, 1.0 / 60.0);
        }
        assert!(vehicle.forward_speed() > 1.0);
        for _ in 0..(60 * 30) {
            vehicle.update(DriveInput::default(), 1.0 / 60.0);
            assert!(vehicle.forward_speed() >= 0.0);
        }
        assert!(vehicle.abs_velocity() < 1e-3);
        assert!(!vehicle.update(DriveInput::default(), 1.0 / 60.0));
    }

    #[test]
    fn mode_is_fixed_at_construction() {
        let vehicle = Vehicle::new(ControlMode::Physics, VehicleConfig::default(), Vec2::ZERO, 0.0);
        assert_eq!(vehicle.mode(), ControlMode::Physics);
    }

    #[test]
    fn confine_stops_at_the_edge() {
        let mut vehicle = Vehicle::new(ControlMode::Basic, VehicleConfig::default(), Vec2::new(9.9, 0.0), std::f32::consts::FRAC_PI_2);
        let input = DriveInput { throttle: 1.0, ..Default::default() };
        vehicle.update(input, 0.1);
        assert!(vehicle.confine(Vec2::splat(-10.0), Vec2::splat(10.0)));
        assert_eq!(vehicle.position().x, 10.0);
        assert_eq!(vehicle.abs_velocity(), 0.0);
    }
}
