//! The player's car: an entity driven by a vehicle model over the terrain.

use engine_core::{align_to_ground, DriveInput, Vec2, Vec3};
use physics::{ControlMode, Vehicle, VehicleConfig};
use terrain::Terrain;

use crate::entity::Entity;

/// Keeps the car inside the perimeter fence.
const FENCE_MARGIN: f32 = 2.5;

pub struct Player {
    pub entity: Entity,
    vehicle: Vehicle,
}

impl Player {
    /// Place the car at `start` facing `yaw`, resting on the terrain.
    pub fn new(entity: Entity, mode: ControlMode, config: VehicleConfig, start: Vec2, yaw: f32, terrain: &Terrain) -> Self {
        let mut player = Self {
            entity,
            vehicle: Vehicle::new(mode, config, start, yaw),
        };
        player.settle(terrain);
        player
    }

    /// Advance the car by `dt`. Returns `true` if it moved.
    pub fn update(&mut self, input: DriveInput, dt: f32, terrain: &Terrain) -> bool {
        let moved = self.vehicle.update(input, dt);
        let (min, max) = terrain.bounds();
        if self.vehicle.confine(min + Vec2::splat(FENCE_MARGIN), max - Vec2::splat(FENCE_MARGIN)) {
            log::debug!("Player stopped at the fence");
        }
        if moved {
            self.settle(terrain);
        }
        moved
    }

    /// Put the car on the ground under its vehicle position, tilted to the slope.
    fn settle(&mut self, terrain: &Terrain) {
        let p = self.vehicle.position();
        self.entity.transform.position = Vec3::new(p.x, 0.0, p.y);
        self.entity.set_rotation(align_to_ground(self.vehicle.yaw(), terrain.normal_at(p.x, p.y)));
        self.entity.place_bottom_edge(terrain.get_height(p.x, p.y));
    }

    pub fn mode(&self) -> ControlMode {
        self.vehicle.mode()
    }

    pub fn position(&self) -> Vec3 {
        self.entity.position()
    }

    /// Unit heading in the ground plane.
    pub fn direction(&self) -> Vec3 {
        self.vehicle.direction()
    }

    pub fn yaw(&self) -> f32 {
        self.vehicle.yaw()
    }

    pub fn throttle(&self) -> f32 {
        self.vehicle.throttle()
    }

    pub fn brake(&self) -> f32 {
        self.vehicle.brake()
    }

    pub fn steer(&self) -> f32 {
        self.vehicle.steer()
    }

    pub fn abs_velocity(&self) -> f32 {
        self.vehicle.abs_velocity()
    }

    /// Whether the car should be kicking up dust this frame.
    pub fn raises_dust(&self) -> bool {
        self.abs_velocity() > 5.0
            || self.throttle() > 0.1
            || (self.mode() == ControlMode::Basic && self.brake() > 0.1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::heading;
    use renderer::ModelId;

    fn car() -> Entity {
        Entity::new(ModelId(0), (Vec3::new(-1.0, 0.0, -2.0), Vec3::new(1.0, 1.5, 2.0)))
    }

    #[test]
    fn basic_mode_drives_move_speed_in_one_second() {
        let terrain = Terrain::flat(200.0, 65).unwrap();
        let config = VehicleConfig::default();
        let yaw = 5.0 * std::f32::consts::PI / 8.0;
        let mut player = Player::new(car(), ControlMode::Basic, config.clone(), Vec2::ZERO, yaw, &terrain);
        let start = player.position();

        let forward = DriveInput { throttle: 1.0, ..Default::default() };
        for _ in 0..100 {
            assert!(player.update(forward, 0.01, &terrain));
        }

        let expected = start + heading(yaw) * config.move_speed;
        assert!((player.position() - expected).length() < 1e-3, "{} vs {}", player.position(), expected);
        assert!((player.direction() - heading(yaw)).length() < 1e-6);
        assert_eq!(player.position().y, 0.0);
    }

    #[test]
    fn idle_player_reports_no_movement() {
        let terrain = Terrain::flat(200.0, 65).unwrap();
        let mut player = Player::new(car(), ControlMode::Physics, VehicleConfig::default(), Vec2::ZERO, 0.0, &terrain);
        assert!(!player.update(DriveInput::default(), 1.0 / 60.0, &terrain));
        assert!(!player.raises_dust());
    }

    #[test]
    fn fence_keeps_the_car_on_the_map() {
        let terrain = Terrain::flat(40.0, 9).unwrap();
        let mut player = Player::new(car(), ControlMode::Basic, VehicleConfig::default(), Vec2::ZERO, 0.0, &terrain);
        let forward = DriveInput { throttle: 1.0, ..Default::default() };
        for _ in 0..300 {
            player.update(forward, 1.0 / 60.0, &terrain);
        }
        assert!(player.position().z <= 20.0 - FENCE_MARGIN + 1e-4);
    }

    #[test]
    fn braking_raises_dust_only_in_basic_mode() {
        let terrain = Terrain::flat(200.0, 65).unwrap();
        let brake = DriveInput { brake: 1.0, ..Default::default() };

        let mut basic = Player::new(car(), ControlMode::Basic, VehicleConfig::default(), Vec2::ZERO, 0.0, &terrain);
        basic.update(brake, 1.0 / 60.0, &terrain);
        assert!(basic.raises_dust());

        let mut physics = Player::new(car(), ControlMode::Physics, VehicleConfig::default(), Vec2::ZERO, 0.0, &terrain);
        physics.update(brake, 1.0 / 60.0, &terrain);
        assert!(!physics.raises_dust());
    }
}
