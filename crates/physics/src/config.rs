//! Vehicle tuning constants. Loaded as part of the game config.

use serde::{Deserialize, Serialize};

/// Tuning for both vehicle models.
///
/// The physics half is expressed in SI units (kg, m, N) and converted to
/// world units through `world_scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VehicleConfig {
    /// Basic mode top speed in world units per second.
    pub move_speed: f32,
    /// Basic mode yaw rate at top speed, radians per second.
    pub rotation_speed: f32,
    /// Basic mode exponential speed decay rate (1/s) once keys are released.
    pub basic_friction: f32,

    pub mass: f32,
    pub inertia_scale: f32,
    /// Centre of gravity to front axle.
    pub cg_to_front_axle: f32,
    /// Centre of gravity to rear axle.
    pub cg_to_rear_axle: f32,
    pub cg_height: f32,
    pub gravity: f32,
    /// Peak lateral friction coefficient.
    pub tire_grip: f32,
    /// Fraction of rear grip left with a locked (handbraked) rear axle.
    pub lock_grip: f32,
    pub engine_force: f32,
    pub brake_force: f32,
    pub ebrake_force: f32,
    /// Longitudinal force opposing motion while coasting.
    pub coast_force: f32,
    pub weight_transfer: f32,
    /// Front wheel lock angle, radians.
    pub max_steer: f32,
    pub corner_stiffness_front: f32,
    pub corner_stiffness_rear: f32,
    pub air_resist: f32,
    pub roll_resist: f32,
    /// Below this speed (m/s) with no throttle the car snaps to rest.
    pub stop_speed: f32,
    /// Steering wheel travel per second while a steer key is held.
    pub steer_rate: f32,
    /// Steering return rate per second once released.
    pub steer_return: f32,
    /// World units per simulated metre.
    pub world_scale: f32,
    /// Upper bound on one integration step, seconds.
    pub max_substep: f32,
}

impl Default for VehicleConfig {
    fn default() -> Self {
        Self {
            move_speed: 10.0,
            rotation_speed: 1.8,
            basic_friction: 3.0,

            mass: 1200.0,
            inertia_scale: 1.0,
            cg_to_front_axle: 1.25,
            cg_to_rear_axle: 1.25,
            cg_height: 0.55,
            gravity: 9.81,
            tire_grip: 2.0,
            lock_grip: 0.7,
            engine_force: 8000.0,
            brake_force: 12000.0,
            ebrake_force: 4800.0,
            coast_force: 1800.0,
            weight_transfer: 0.2,
            max_steer: 0.6,
            corner_stiffness_front: 5.0,
            corner_stiffness_rear: 5.2,
            air_resist: 2.5,
            roll_resist: 8.0,
            stop_speed: 0.5,
            steer_rate: 2.0,
            steer_return: 1.0,
            world_scale: 0.35,
            max_substep: 1.0 / 120.0,
        }
    }
}

impl VehicleConfig {
    pub fn wheel_base(&self) -> f32 {
        self.cg_to_front_axle + self.cg_to_rear_axle
    }

    pub fn inertia(&self) -> f32 {
        self.mass * self.inertia_scale
    }
}
