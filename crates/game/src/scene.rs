//! The driving scene: terrain, the player's car, props, lights, dust and the
//! chase camera, stepped once per frame.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4, PI};
use std::iter;

use engine_core::{Cone, Light, Vec2, Vec3};
use input::InputState;
use physics::ControlMode;
use rand::prelude::*;
use renderer::{Camera, FrameScene, InstanceBatch, ModelId, ParticleInstance, WaterSurface};
use terrain::{Terrain, TerrainConfig, Track};

use crate::assets::{pixel_to_ground, SUN_DIRECTION};
use crate::camera_rig::FollowCamera;
use crate::config::GameConfig;
use crate::entity::Entity;
use crate::particles::{ParticleManager, ParticleSystem};
use crate::player::Player;

const CONE_COUNT: usize = 19;
const WATER_LEVEL: f32 = 0.4;
const FENCE_INSET: f32 = 1.0;
const STUMP_SCALE: f32 = 0.5;

const CAR_LENGTH: f32 = 4.0;
const TREE_HEIGHT: f32 = 6.5;
const STUMP_HEIGHT: f32 = 0.7;
const CONE_HEIGHT: f32 = 0.8;
const FENCE_HEIGHT: f32 = 1.2;

const HEADLIGHT_COLOR: Vec3 = Vec3::new(0.8, 0.8, 0.4);
const HEADLIGHT_RANGE: f32 = 10.0;

/// Fixed layout used with a loaded heightmap, in map pixels.
const CLASSIC_START: (Vec2, f32) = (Vec2::new(555.0, 751.0), 5.0 * PI / 8.0);
const CLASSIC_WATER: (Vec2, Vec2) = (Vec2::new(650.0, 826.0), Vec2::new(100.0, 50.0));
const CLASSIC_CONES: [Vec2; CONE_COUNT] = [
    Vec2::new(263.0, 262.0),
    Vec2::new(226.0, 250.0),
    Vec2::new(209.0, 273.0),
    Vec2::new(213.0, 299.0),
    Vec2::new(342.0, 717.0),
    Vec2::new(329.0, 734.0),
    Vec2::new(326.0, 751.0),
    Vec2::new(354.0, 755.0),
    Vec2::new(372.0, 754.0),
    Vec2::new(750.0, 400.0),
    Vec2::new(765.0, 396.0),
    Vec2::new(748.0, 381.0),
    Vec2::new(828.0, 480.0),
    Vec2::new(842.0, 476.0),
    Vec2::new(854.0, 478.0),
    Vec2::new(852.0, 500.0),
    Vec2::new(852.0, 521.0),
    Vec2::new(842.0, 547.0),
    Vec2::new(772.0, 402.0),
];

/// Where the car starts, where cones go and where the water lies, in map pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct Landmarks {
    pub start: Vec2,
    pub start_yaw: f32,
    pub cones: Vec<Vec2>,
    pub water_center: Vec2,
    /// Water extent in world units.
    pub water_size: Vec2,
}

impl Landmarks {
    /// Layout following a generated track and pond.
    pub fn from_track(track: &Track, config: &TerrainConfig) -> Self {
        let (start, start_yaw) = track.start();
        let (water_center, water_size) = match config.pond {
            Some((centre, radius)) => (centre, Vec2::splat(2.2 * radius / config.map_size * config.size)),
            None => (Vec2::ZERO, Vec2::ZERO),
        };
        Self {
            start,
            start_yaw,
            cones: track.cones(CONE_COUNT),
            water_center,
            water_size,
        }
    }

    /// Hand-placed layout for the stock heightmap.
    pub fn classic() -> Self {
        Self {
            start: CLASSIC_START.0,
            start_yaw: CLASSIC_START.1,
            cones: CLASSIC_CONES.to_vec(),
            water_center: CLASSIC_WATER.0,
            water_size: CLASSIC_WATER.1,
        }
    }

    pub fn water(&self, terrain: &Terrain) -> Option<WaterSurface> {
        if self.water_size.min_element() <= 0.0 {
            return None;
        }
        let centre = pixel_to_ground(terrain, self.water_center);
        Some(WaterSurface::new(Vec3::new(centre.x, WATER_LEVEL, centre.y), self.water_size))
    }
}

/// A registered model and its model-space bounds.
#[derive(Debug, Clone, Copy)]
pub struct ModelRef {
    pub id: ModelId,
    pub bounds: (Vec3, Vec3),
}

impl ModelRef {
    fn size(&self) -> Vec3 {
        self.bounds.1 - self.bounds.0
    }

    /// Entity scaled so its bounds are `height` tall.
    fn with_height(&self, height: f32) -> Entity {
        Entity::new(self.id, self.bounds).scaled(height / self.size().y.max(f32::EPSILON))
    }

    /// Entity scaled so its bounds are `length` long along Z.
    fn with_length(&self, length: f32) -> Entity {
        Entity::new(self.id, self.bounds).scaled(length / self.size().z.max(f32::EPSILON))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ModelSet {
    pub car: ModelRef,
    pub tree: ModelRef,
    pub stump: ModelRef,
    pub cone: ModelRef,
    pub fence: ModelRef,
}

pub struct Scene {
    pub terrain: Terrain,
    pub player: Player,
    /// Static props: trees, stumps, cones and fences.
    pub props: Vec<Entity>,
    /// Sun first, then the headlight.
    pub lights: Vec<Light>,
    pub water: Option<WaterSurface>,
    pub camera: Camera,
    pub rig: FollowCamera,
    dust: ParticleSystem,
    particles: ParticleManager,
    time: f32,
}

impl Scene {
    pub fn new(
        config: &GameConfig,
        mode: ControlMode,
        terrain: Terrain,
        landmarks: &Landmarks,
        models: &ModelSet,
        seed: u64,
    ) -> Self {
        let start = pixel_to_ground(&terrain, landmarks.start);
        let player = Player::new(
            models.car.with_length(CAR_LENGTH),
            mode,
            config.vehicle.clone(),
            start,
            landmarks.start_yaw,
            &terrain,
        );
        let water = landmarks.water(&terrain);

        let mut rng = StdRng::seed_from_u64(seed);
        let mut props = scatter_vegetation(&terrain, models, water.as_ref(), config.prop_count, &mut rng);
        props.extend(landmarks.cones.iter().map(|&pixel| {
            let p = pixel_to_ground(&terrain, pixel);
            models.cone.with_height(CONE_HEIGHT).at(Vec3::new(p.x, 0.0, p.y))
        }));
        props.extend(perimeter_fence(&terrain, models.fence));
        for prop in &mut props {
            let p = prop.position();
            prop.place_bottom_edge(terrain.get_height(p.x, p.z));
        }
        log::info!("Placed {} props", props.len());

        let sun = Light::directional(SUN_DIRECTION, 0.1, 0.7, 1.0);
        let headlight = Light::spot(
            headlight_position(&player),
            HEADLIGHT_COLOR,
            Cone {
                direction: player.direction(),
                angle: FRAC_PI_4,
                radius: HEADLIGHT_RANGE,
            },
        );

        let mut camera = Camera {
            fov_degrees: 45.0,
            near: 0.5,
            far: 800.0,
            ..Camera::default()
        };
        camera.set_aspect(config.window_width, config.window_height);
        let rig = FollowCamera::default();
        rig.apply(&mut camera, player.position(), player.yaw(), &terrain);

        Self {
            terrain,
            player,
            props,
            lights: vec![sun, headlight],
            water,
            camera,
            rig,
            dust: ParticleSystem::new(30.0, 3.0, 0.5, 0.5, seed ^ 0xD057),
            particles: ParticleManager::new(),
            time: 0.0,
        }
    }

    /// Step the simulation by `dt` seconds.
    pub fn update(&mut self, input: &InputState, dt: f32) {
        self.time += dt;
        self.rig.handle_input(input.orbit_delta(), input.scroll());

        if self.player.update(input.drive_input(), dt, &self.terrain) {
            log::trace!(
                "throttle {:.2} brake {:.2} steer {:.2} speed {:.2}",
                self.player.throttle(),
                self.player.brake(),
                self.player.steer(),
                self.player.abs_velocity()
            );
            let position = headlight_position(&self.player);
            let headlight = &mut self.lights[1];
            headlight.set_position(position);
            headlight.set_cone_direction(self.player.direction());
        }

        self.particles.update(dt);
        if self.player.raises_dust() {
            let behind = self.player.position() - self.player.direction();
            self.dust.generate_particles(behind, dt, &mut self.particles);
        }

        self.rig
            .apply(&mut self.camera, self.player.position(), self.player.yaw(), &self.terrain);
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.camera.set_aspect(width, height);
    }

    /// Props plus the car, grouped for instanced drawing.
    pub fn batches(&self) -> Vec<InstanceBatch> {
        InstanceBatch::collect(self.props.iter().chain(iter::once(&self.player.entity)))
    }

    pub fn particle_instances(&self) -> Vec<ParticleInstance> {
        self.particles.instances(self.camera.position)
    }

    pub fn particle_count(&self) -> usize {
        self.particles.len()
    }

    /// Borrow everything the renderer needs for this frame.
    pub fn frame<'a>(&'a self, batches: &'a [InstanceBatch], particles: &'a [ParticleInstance]) -> FrameScene<'a> {
        FrameScene {
            camera: &self.camera,
            lights: &self.lights,
            focus: self.player.position(),
            batches,
            particles,
            time: self.time,
        }
    }
}

/// Front of the car, just above the bumper.
fn headlight_position(player: &Player) -> Vec3 {
    player.position() + player.direction() * (CAR_LENGTH / 2.0) + Vec3::Y * 0.6
}

fn under_water(water: Option<&WaterSurface>, terrain: &Terrain, p: Vec2) -> bool {
    water.is_some_and(|w| {
        let half = w.size / 2.0;
        let inside = (p.x - w.center.x).abs() <= half.x && (p.y - w.center.z).abs() <= half.y;
        inside && terrain.get_height(p.x, p.y) < w.height()
    })
}

/// Trees and half-size stumps at random spots, none standing in the water.
fn scatter_vegetation(
    terrain: &Terrain,
    models: &ModelSet,
    water: Option<&WaterSurface>,
    count: usize,
    rng: &mut StdRng,
) -> Vec<Entity> {
    let mut props = Vec::with_capacity(count);
    let map = terrain.map_size();
    for _ in 0..count * 4 {
        if props.len() >= count {
            break;
        }
        let p = pixel_to_ground(terrain, Vec2::new(rng.gen_range(0.0..map), rng.gen_range(0.0..map)));
        if under_water(water, terrain, p) {
            continue;
        }
        let prop = if rng.gen_bool(0.5) {
            models.tree.with_height(TREE_HEIGHT)
        } else {
            let stump = models.stump.with_height(STUMP_HEIGHT);
            let scale = stump.transform.scale.x * STUMP_SCALE;
            stump.scaled(scale)
        };
        props.push(prop.at(Vec3::new(p.x, 0.0, p.y)).rotated_y(rng.gen_range(0.0..std::f32::consts::TAU)));
    }
    props
}

/// Fence panels end to end along all four edges of the map.
fn perimeter_fence(terrain: &Terrain, fence: ModelRef) -> Vec<Entity> {
    let template = fence.with_height(FENCE_HEIGHT);
    let spacing = template.extent().x;
    if spacing <= f32::EPSILON {
        return Vec::new();
    }
    // Panel origin relative to the centre of its bounds, along the panel.
    let offset = (fence.bounds.0.x + fence.bounds.1.x) / 2.0 * template.transform.scale.x;
    let (min, max) = terrain.bounds();
    let (lo, hi) = (min + Vec2::splat(FENCE_INSET), max - Vec2::splat(FENCE_INSET));
    let panels = ((hi.x - lo.x) / spacing).floor() as usize;

    let mut fences = Vec::with_capacity(panels * 4);
    for i in 0..panels {
        let along = lo.x + spacing * (i as f32 + 0.5) - offset;
        for z in [lo.y, hi.y] {
            fences.push(template.clone().at(Vec3::new(along, 0.0, z)));
        }
        for x in [lo.x, hi.x] {
            fences.push(template.clone().at(Vec3::new(x, 0.0, along)).rotated_y(-FRAC_PI_2));
        }
    }
    fences
}

#[cfg(test)]
mod tests {
    use super::*;
    use renderer::Drawable;

    fn models() -> ModelSet {
        let unit = |id: u32, size: Vec3| ModelRef {
            id: ModelId(id),
            bounds: (Vec3::new(-size.x / 2.0, 0.0, -size.z / 2.0), Vec3::new(size.x / 2.0, size.y, size.z / 2.0)),
        };
        ModelSet {
            car: unit(0, Vec3::new(1.8, 1.4, 4.0)),
            tree: unit(1, Vec3::new(3.0, 6.5, 3.0)),
            stump: unit(2, Vec3::new(1.2, 0.7, 1.2)),
            cone: unit(3, Vec3::new(0.7, 0.8, 0.7)),
            fence: unit(4, Vec3::new(2.0, 1.2, 0.2)),
        }
    }

    fn landmarks() -> Landmarks {
        Landmarks {
            start: Vec2::new(200.0, 200.0),
            start_yaw: 0.0,
            cones: vec![Vec2::new(100.0, 100.0), Vec2::new(300.0, 300.0)],
            water_center: Vec2::new(200.0, 300.0),
            water_size: Vec2::new(40.0, 20.0),
        }
    }

    fn scene(mode: ControlMode) -> Scene {
        let config = GameConfig {
            prop_count: 50,
            ..GameConfig::default()
        };
        Scene::new(&config, mode, Terrain::flat(400.0, 65).unwrap(), &landmarks(), &models(), 7)
    }

    #[test]
    fn scene_places_every_prop_on_the_ground() {
        let scene = scene(ControlMode::Basic);
        // 50 vegetation + 2 cones + 4 sides of 199 fence panels.
        assert_eq!(scene.props.len(), 50 + 2 + 4 * 199);
        for prop in &scene.props {
            let lowest = prop.model_matrix().transform_point3(prop.bounds.0);
            assert!(lowest.y.abs() < 1e-4, "prop floating at {}", lowest.y);
        }
        assert_eq!(scene.player.position(), Vec3::ZERO);
    }

    #[test]
    fn no_vegetation_stands_in_the_water() {
        let scene = scene(ControlMode::Basic);
        let water = scene.water.unwrap();
        assert_eq!(water.center, Vec3::new(0.0, WATER_LEVEL, 100.0));
        for prop in &scene.props[..50] {
            let p = prop.position();
            let inside = (p.x - water.center.x).abs() <= 20.0 && (p.z - water.center.z).abs() <= 10.0;
            assert!(!inside);
        }
    }

    #[test]
    fn headlight_follows_the_car() {
        let mut scene = scene(ControlMode::Basic);
        let mut input = InputState::new();
        input.process_keyboard(winit::keyboard::KeyCode::KeyW, winit::event::ElementState::Pressed);
        for _ in 0..30 {
            scene.update(&input, 1.0 / 30.0);
        }
        let car = scene.player.position();
        assert!(car.z > 1.0);
        let headlight = scene.lights[1];
        assert!((headlight.position.truncate() - headlight_position(&scene.player)).length() < 1e-5);
        assert_eq!(headlight.cone.unwrap().direction, scene.player.direction());
        assert!(scene.particle_count() > 0);
    }

    #[test]
    fn batches_include_the_car() {
        let scene = scene(ControlMode::Physics);
        let batches = scene.batches();
        let car = batches.iter().find(|b| b.model == ModelId(0)).unwrap();
        assert_eq!(car.instances.len(), 1);
        let total: usize = batches.iter().map(|b| b.instances.len()).sum();
        assert_eq!(total, scene.props.len() + 1);
    }

    #[test]
    fn classic_layout_has_a_lake() {
        let terrain = Terrain::flat(400.0, 65).unwrap();
        let water = Landmarks::classic().water(&terrain).unwrap();
        assert_eq!(water.size, Vec2::new(100.0, 50.0));
        assert_eq!(water.height(), WATER_LEVEL);
    }
}
