//! Frame orchestration: shadow depth, optional water reflection, then colour.

use engine_core::Light;
use glam::{Vec3, Vec4};
use terrain::{Terrain, TextureData};

use crate::camera::Camera;
use crate::error::RenderError;
use crate::framebuffer::{DepthSource, FrameBuffer, RenderTarget, ShadowMap, ShadowSettings};
use crate::model::{InstanceBatch, Model, ModelData, ModelId};
use crate::pass::{frame_passes, PassKind, PassTracker};
use crate::renderers::{
    EntityRenderer, ParticleRenderer, SharedLayouts, SkyRenderer, TerrainRenderer, WaterRenderer, WaterSurface,
};
use crate::shader::{UniformBuffer, UniformLoader, ViewUniform, NO_CLIP_PLANE};
use crate::vertex::ParticleInstance;

const MAX_PARTICLES: u32 = 4096;

#[derive(Debug, Clone, Copy)]
pub struct RenderSettings {
    pub shadows: ShadowSettings,
    pub water_reflections: bool,
    pub clear_color: wgpu::Color,
    /// Surface texture repeats across the terrain.
    pub terrain_tiling: f32,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            shadows: ShadowSettings::default(),
            water_reflections: true,
            clear_color: wgpu::Color {
                r: 0.55,
                g: 0.7,
                b: 0.9,
                a: 1.0,
            },
            terrain_tiling: 64.0,
        }
    }
}

/// Static scene content uploaded once.
pub struct SceneAssets<'a> {
    pub terrain: &'a Terrain,
    pub sky_faces: &'a [TextureData; 6],
    pub particle_sprite: &'a TextureData,
    pub water: Option<WaterSurface>,
}

/// What changes every frame.
pub struct FrameScene<'a> {
    pub camera: &'a Camera,
    pub lights: &'a [Light],
    /// Point the shadow frustum follows, normally the player.
    pub focus: Vec3,
    pub batches: &'a [InstanceBatch],
    pub particles: &'a [ParticleInstance],
    pub time: f32,
}

/// Uniform buffer + bind group for one pass's view. Each pass gets its own
/// slot because queued buffer writes all land before the submit.
struct ViewSlot {
    uniform: UniformBuffer<ViewUniform>,
    bind_group: wgpu::BindGroup,
}

impl ViewSlot {
    fn new(device: &wgpu::Device, layout: &wgpu::BindGroupLayout, label: &str) -> Self {
        let uniform = UniformBuffer::new(device, label, &ViewUniform::default());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform.binding(),
            }],
        });
        Self { uniform, bind_group }
    }
}

/// Camera view uniform for a colour pass.
fn color_view_uniform<S>(camera: &Camera, lights: &[Light], shadow: &S, clip_plane: Vec4) -> ViewUniform
where
    S: UniformLoader<ViewUniform> + ?Sized,
{
    let mut uniform = ViewUniform::default();
    uniform.load(camera).load(lights).load(shadow).set_clip_plane(clip_plane);
    uniform
}

/// Light-space view uniform for the depth pass.
fn depth_view_uniform<D: DepthSource + ?Sized>(source: &D) -> ViewUniform {
    let mut uniform = ViewUniform::default();
    uniform.set_matrices(source.light_view(), source.light_projection());
    uniform
}

/// Direction towards the first directional light.
fn sun_direction(lights: &[Light]) -> Option<Vec3> {
    lights.iter().find(|l| l.is_directional()).map(Light::direction)
}

pub struct RenderManager {
    settings: RenderSettings,
    shared: SharedLayouts,
    light_view: ViewSlot,
    reflection_view: ViewSlot,
    main_view: ViewSlot,
    shadow_map: ShadowMap,
    shadow_bind_group: wgpu::BindGroup,
    reflection: Option<FrameBuffer>,
    terrain: TerrainRenderer,
    entities: EntityRenderer,
    water: Option<WaterRenderer>,
    sky: SkyRenderer,
    particles: ParticleRenderer,
    tracker: PassTracker,
}

impl RenderManager {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        color_format: wgpu::TextureFormat,
        (width, height): (u32, u32),
        settings: RenderSettings,
        assets: SceneAssets<'_>,
    ) -> Result<Self, RenderError> {
        let shared = SharedLayouts::new(device, color_format)?;

        // A disabled shadow map still backs the shadow bind group.
        let shadow_settings = if settings.shadows.enabled {
            settings.shadows
        } else {
            ShadowSettings { size: 1, ..settings.shadows }
        };
        let shadow_map = ShadowMap::new(device, shadow_settings, Vec3::Y);
        let shadow_bind_group = Self::create_shadow_bind_group(device, &shared, &shadow_map);

        let terrain = TerrainRenderer::new(device, queue, &shared, assets.terrain, settings.terrain_tiling)?;
        let entities = EntityRenderer::new(device, &shared)?;
        let sky = SkyRenderer::new(device, queue, &shared, assets.sky_faces)?;
        let particles = ParticleRenderer::new(device, queue, &shared, assets.particle_sprite, MAX_PARTICLES)?;

        let mut water = assets
            .water
            .map(|surface| WaterRenderer::new(device, queue, &shared, surface))
            .transpose()?;
        let reflection = match &mut water {
            Some(water) if settings.water_reflections => {
                let framebuffer = FrameBuffer::with_color(device, width, height, color_format, "Water Reflection");
                water.set_reflection(device, framebuffer.color());
                Some(framebuffer)
            }
            _ => None,
        };

        log::info!(
            "Render manager ready: shadows {} ({}px), water {}, reflections {}",
            settings.shadows.enabled,
            shadow_map.texture_size(),
            water.is_some(),
            reflection.is_some()
        );

        Ok(Self {
            light_view: ViewSlot::new(device, &shared.view, "Light View"),
            reflection_view: ViewSlot::new(device, &shared.view, "Reflection View"),
            main_view: ViewSlot::new(device, &shared.view, "Main View"),
            tracker: PassTracker::new(settings.shadows.enabled),
            settings,
            shared,
            shadow_map,
            shadow_bind_group,
            reflection,
            terrain,
            entities,
            water,
            sky,
            particles,
        })
    }

    fn create_shadow_bind_group(device: &wgpu::Device, shared: &SharedLayouts, shadow_map: &ShadowMap) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Shadow Bind Group"),
            layout: &shared.shadow,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(shadow_map.depth_view()),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(shadow_map.depth_sampler()),
                },
            ],
        })
    }

    pub fn settings(&self) -> &RenderSettings {
        &self.settings
    }

    pub fn add_model(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, data: &ModelData) -> ModelId {
        self.entities.add_model(device, queue, data)
    }

    pub fn model(&self, id: ModelId) -> Option<&Model> {
        self.entities.model(id)
    }

    pub fn water(&self) -> Option<&WaterSurface> {
        self.water.as_ref().map(WaterRenderer::surface)
    }

    /// Passes begun during the last frame.
    pub fn last_passes(&self) -> &[PassKind] {
        self.tracker.history()
    }

    /// Resize window-sized off-screen targets.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        if let (Some(reflection), Some(water)) = (&mut self.reflection, &mut self.water) {
            *reflection = FrameBuffer::with_color(device, width, height, self.shared.color_format, "Water Reflection");
            water.set_reflection(device, reflection.color());
        }
    }

    /// Record every pass of the frame into `encoder`.
    pub fn render(
        &mut self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: RenderTarget<'_>,
        scene: &FrameScene<'_>,
    ) -> Result<(), RenderError> {
        self.tracker.begin_frame();
        if let Some(sun) = sun_direction(scene.lights) {
            self.shadow_map.set_light_direction(sun);
        }
        self.entities.prepare(queue, scene.batches);
        self.particles.prepare(queue, scene.particles);

        let passes = frame_passes(self.settings.shadows.enabled, self.reflection.is_some());
        for pass in passes {
            self.tracker.begin(pass)?;
            match pass {
                PassKind::ShadowDepth => self.depth_pass(queue, encoder, scene.focus),
                PassKind::Reflection => self.reflection_pass(queue, encoder, scene),
                PassKind::Main => self.main_pass(queue, encoder, target, scene),
            }
            self.tracker.end(pass)?;
        }
        Ok(())
    }

    fn depth_pass(&mut self, queue: &wgpu::Queue, encoder: &mut wgpu::CommandEncoder, focus: Vec3) {
        let mut pass = self.shadow_map.bind(encoder, focus);
        self.light_view.uniform.write(queue, &depth_view_uniform(&self.shadow_map));
        self.terrain.render_depth(&mut pass, &self.light_view.bind_group);
        self.entities.render_depth(&mut pass, &self.light_view.bind_group);
    }

    fn reflection_pass(&self, queue: &wgpu::Queue, encoder: &mut wgpu::CommandEncoder, scene: &FrameScene<'_>) {
        let (Some(framebuffer), Some(water)) = (&self.reflection, &self.water) else {
            return;
        };
        let Some(target) = framebuffer.target() else {
            return;
        };
        let surface = water.surface();
        let camera = scene.camera.reflected(surface.height());
        let uniform = color_view_uniform(&camera, scene.lights, &self.shadow_map, surface.reflection_clip_plane());
        self.reflection_view.uniform.write(queue, &uniform);

        let view = &self.reflection_view.bind_group;
        self.sky.render(encoder, target, view, self.settings.clear_color);
        self.terrain.render(encoder, target, view, &self.shadow_bind_group);
        self.entities.render(encoder, target, view, &self.shadow_bind_group);
    }

    fn main_pass(
        &self,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        target: RenderTarget<'_>,
        scene: &FrameScene<'_>,
    ) {
        let uniform = color_view_uniform(scene.camera, scene.lights, &self.shadow_map, NO_CLIP_PLANE);
        self.main_view.uniform.write(queue, &uniform);

        let view = &self.main_view.bind_group;
        self.sky.render(encoder, target, view, self.settings.clear_color);
        self.terrain.render(encoder, target, view, &self.shadow_bind_group);
        self.entities.render(encoder, target, view, &self.shadow_bind_group);
        if let Some(water) = &self.water {
            water.update(queue, scene.time, self.reflection.is_some());
            water.render(encoder, target, view, &self.shadow_bind_group);
        }
        self.particles.render(encoder, target, view);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::Cone;
    use glam::Mat4;

    struct FixedShadow;

    impl UniformLoader<ViewUniform> for FixedShadow {
        fn load_into(&self, uniform: &mut ViewUniform) {
            uniform.depth_bias_pv = Mat4::from_scale(Vec3::splat(2.0)).to_cols_array_2d();
            uniform.shadow = [1.0, 0.002, 1024.0, 0.0];
        }
    }

    fn lights() -> Vec<Light> {
        vec![
            Light::spot(
                Vec3::new(0.0, 2.0, 0.0),
                Vec3::new(0.8, 0.8, 0.4),
                Cone {
                    direction: Vec3::Z,
                    angle: std::f32::consts::FRAC_PI_4,
                    radius: 10.0,
                },
            ),
            Light::directional(Vec3::new(-25.0, 50.0, 60.0), 0.1, 0.7, 1.0),
        ]
    }

    #[test]
    fn sun_is_the_first_directional_light() {
        let sun = sun_direction(&lights()).unwrap();
        assert!((sun - Vec3::new(-25.0, 50.0, 60.0).normalize()).length() < 1e-6);
        assert!(sun_direction(&lights()[..1]).is_none());
    }

    #[test]
    fn color_view_carries_camera_lights_shadow_and_clip_plane() {
        let camera = Camera::new(Vec3::new(0.0, 5.0, -10.0), Vec3::ZERO);
        let plane = Vec4::new(0.0, 1.0, 0.0, -0.4);
        let uniform = color_view_uniform(&camera, &lights(), &FixedShadow, plane);

        assert_eq!(uniform.view, camera.view_matrix().to_cols_array_2d());
        assert_eq!(uniform.light_count(), 2);
        assert!(uniform.shadows_enabled());
        assert_eq!(uniform.shadow[1], 0.002);
        assert_eq!(uniform.clip_plane, plane.to_array());
    }

    #[test]
    fn main_view_keeps_the_no_op_clip_plane() {
        let camera = Camera::default();
        let uniform = color_view_uniform(&camera, &[], &FixedShadow, NO_CLIP_PLANE);
        assert_eq!(uniform.clip_plane, [0.0, 0.0, 0.0, 1.0]);
        assert_eq!(uniform.light_count(), 0);
    }
}
