//! Shader programs and their uniform contracts.
//!
//! Every colour program shares [`ViewUniform`] at bind group 0. The layouts
//! here must match the structs in `shaders/common.wgsl`.

use std::marker::PhantomData;

use bytemuck::{Pod, Zeroable};
use engine_core::Light;
use glam::{Mat4, Vec4};
use wgpu::util::DeviceExt;

use crate::camera::Camera;

/// Upper bound of the light array in every colour program.
pub const MAX_LIGHTS: usize = 8;

/// Clip plane that never discards anything.
pub const NO_CLIP_PLANE: Vec4 = Vec4::new(0.0, 0.0, 0.0, 1.0);

/// Default shadow comparison epsilon.
pub const DEFAULT_SHADOW_BIAS: f32 = 0.0015;

/// One light as the shaders see it.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct LightRaw {
    pub position: [f32; 4],
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    /// xyz = cone direction, w = cone half-angle (0 = no cone).
    pub cone: [f32; 4],
    /// x = attenuation radius (0 = unattenuated).
    pub falloff: [f32; 4],
}

impl From<&Light> for LightRaw {
    fn from(light: &Light) -> Self {
        let (cone, falloff) = match light.cone {
            Some(cone) => (
                cone.direction.normalize_or_zero().extend(cone.angle).to_array(),
                [cone.radius, 0.0, 0.0, 0.0],
            ),
            None => ([0.0; 4], [0.0; 4]),
        };
        Self {
            position: light.position.to_array(),
            ambient: light.ambient.extend(0.0).to_array(),
            diffuse: light.diffuse.extend(0.0).to_array(),
            specular: light.specular.extend(0.0).to_array(),
            cone,
            falloff,
        }
    }
}

/// Per-pass view uniform (group 0 of every program).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct ViewUniform {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub inv_view: [[f32; 4]; 4],
    pub depth_bias_pv: [[f32; 4]; 4],
    pub clip_plane: [f32; 4],
    /// x = shadows enabled, y = comparison epsilon, z = shadow map size.
    pub shadow: [f32; 4],
    pub light_count: [u32; 4],
    pub lights: [LightRaw; MAX_LIGHTS],
}

impl Default for ViewUniform {
    fn default() -> Self {
        let identity = Mat4::IDENTITY.to_cols_array_2d();
        Self {
            view: identity,
            projection: identity,
            inv_view: identity,
            depth_bias_pv: identity,
            clip_plane: NO_CLIP_PLANE.to_array(),
            shadow: [0.0, DEFAULT_SHADOW_BIAS, 1.0, 0.0],
            light_count: [0; 4],
            lights: [LightRaw::zeroed(); MAX_LIGHTS],
        }
    }
}

impl ViewUniform {
    /// Load one uniform source; chainable.
    pub fn load<L: UniformLoader<Self> + ?Sized>(&mut self, source: &L) -> &mut Self {
        source.load_into(self);
        self
    }

    /// Use `view`/`projection` directly as the camera, as the depth pass does.
    pub fn set_matrices(&mut self, view: Mat4, projection: Mat4) -> &mut Self {
        self.view = view.to_cols_array_2d();
        self.projection = projection.to_cols_array_2d();
        self.inv_view = view.inverse().to_cols_array_2d();
        self
    }

    pub fn set_clip_plane(&mut self, plane: Vec4) -> &mut Self {
        self.clip_plane = plane.to_array();
        self
    }

    pub fn set_shadow_bias(&mut self, epsilon: f32) -> &mut Self {
        self.shadow[1] = epsilon;
        self
    }

    pub fn shadows_enabled(&self) -> bool {
        self.shadow[0] > 0.5
    }

    pub fn light_count(&self) -> usize {
        self.light_count[0] as usize
    }
}

/// A source of values for a uniform block.
///
/// Implementors write the part of `U` they own and leave the rest untouched.
pub trait UniformLoader<U> {
    fn load_into(&self, uniform: &mut U);
}

impl UniformLoader<ViewUniform> for Camera {
    fn load_into(&self, uniform: &mut ViewUniform) {
        uniform.set_matrices(self.view_matrix(), self.projection_matrix());
    }
}

impl UniformLoader<ViewUniform> for [Light] {
    fn load_into(&self, uniform: &mut ViewUniform) {
        if self.len() > MAX_LIGHTS {
            log::debug!("{} lights in scene, only the first {MAX_LIGHTS} are shaded", self.len());
        }
        let count = self.len().min(MAX_LIGHTS);
        for (slot, light) in uniform.lights.iter_mut().zip(self.iter()) {
            *slot = LightRaw::from(light);
        }
        for slot in &mut uniform.lights[count..] {
            *slot = LightRaw::zeroed();
        }
        uniform.light_count = [count as u32, 0, 0, 0];
    }
}

/// Surface material of an entity component.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MaterialUniform {
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    /// x = shininess, y = emission.
    pub params: [f32; 4],
}

/// Terrain program parameters.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct TerrainUniform {
    /// x = surface texture repeats across the terrain.
    pub params: [f32; 4],
}

impl TerrainUniform {
    pub fn new(tiling: f32) -> Self {
        Self {
            params: [tiling, 0.0, 0.0, 0.0],
        }
    }
}

/// Water program parameters.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct WaterUniform {
    pub model: [[f32; 4]; 4],
    /// rgb = tint, a = opacity.
    pub color: [f32; 4],
    /// x = time, y = reflection texture valid, z = wave strength, w = shininess.
    pub params: [f32; 4],
}

/// A typed uniform buffer.
pub struct UniformBuffer<T: Pod> {
    pub buffer: wgpu::Buffer,
    _marker: PhantomData<T>,
}

impl<T: Pod> UniformBuffer<T> {
    pub fn new(device: &wgpu::Device, label: &str, value: &T) -> Self {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::bytes_of(value),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        Self {
            buffer,
            _marker: PhantomData,
        }
    }

    pub fn write(&self, queue: &wgpu::Queue, value: &T) {
        queue.write_buffer(&self.buffer, 0, bytemuck::bytes_of(value));
    }

    pub fn binding(&self) -> wgpu::BindingResource<'_> {
        self.buffer.as_entire_binding()
    }
}

/// The WGSL programs. Each starts with `common.wgsl`; lit programs add
/// `lighting.wgsl` (shadow map bindings and the light loop).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderKind {
    Depth,
    Terrain,
    Entity,
    Water,
    Sky,
    Particle,
}

impl ShaderKind {
    pub const ALL: [ShaderKind; 6] = [
        ShaderKind::Depth,
        ShaderKind::Terrain,
        ShaderKind::Entity,
        ShaderKind::Water,
        ShaderKind::Sky,
        ShaderKind::Particle,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ShaderKind::Depth => "Depth Shader",
            ShaderKind::Terrain => "Terrain Shader",
            ShaderKind::Entity => "Entity Shader",
            ShaderKind::Water => "Water Shader",
            ShaderKind::Sky => "Sky Shader",
            ShaderKind::Particle => "Particle Shader",
        }
    }

    pub fn source(self) -> &'static str {
        match self {
            ShaderKind::Depth => concat!(include_str!("shaders/common.wgsl"), include_str!("shaders/depth.wgsl")),
            ShaderKind::Terrain => concat!(
                include_str!("shaders/common.wgsl"),
                include_str!("shaders/lighting.wgsl"),
                include_str!("shaders/terrain.wgsl")
            ),
            ShaderKind::Entity => concat!(
                include_str!("shaders/common.wgsl"),
                include_str!("shaders/lighting.wgsl"),
                include_str!("shaders/entity.wgsl")
            ),
            ShaderKind::Water => concat!(
                include_str!("shaders/common.wgsl"),
                include_str!("shaders/lighting.wgsl"),
                include_str!("shaders/water.wgsl")
            ),
            ShaderKind::Sky => concat!(include_str!("shaders/common.wgsl"), include_str!("shaders/sky.wgsl")),
            ShaderKind::Particle => concat!(include_str!("shaders/common.wgsl"), include_str!("shaders/particle.wgsl")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::{Cone, Vec3};

    fn sun() -> Light {
        Light::directional(Vec3::new(-25.0, 50.0, 60.0), 0.1, 0.7, 1.0)
    }

    #[test]
    fn uniform_sizes_match_wgsl() {
        assert_eq!(std::mem::size_of::<LightRaw>(), 96);
        assert_eq!(std::mem::size_of::<ViewUniform>(), 4 * 64 + 3 * 16 + MAX_LIGHTS * 96);
        assert_eq!(std::mem::size_of::<MaterialUniform>() % 16, 0);
        assert_eq!(std::mem::size_of::<WaterUniform>() % 16, 0);
    }

    #[test]
    fn extra_lights_are_truncated() {
        let lights = vec![sun(); MAX_LIGHTS + 3];
        let mut uniform = ViewUniform::default();
        uniform.load(lights.as_slice());
        assert_eq!(uniform.light_count(), MAX_LIGHTS);
    }

    #[test]
    fn fewer_lights_clear_stale_slots() {
        let mut uniform = ViewUniform::default();
        uniform.load(vec![sun(); 4].as_slice());
        uniform.load([sun()].as_slice());
        assert_eq!(uniform.light_count(), 1);
        assert_eq!(uniform.lights[1], LightRaw::zeroed());
    }

    #[test]
    fn spot_cone_is_packed() {
        let light = Light::spot(
            Vec3::ZERO,
            Vec3::new(0.8, 0.8, 0.4),
            Cone { direction: Vec3::new(0.0, 0.0, 2.0), angle: 0.78, radius: 10.0 },
        );
        let raw = LightRaw::from(&light);
        assert_eq!(raw.position[3], 1.0);
        assert_eq!(raw.cone, [0.0, 0.0, 1.0, 0.78]);
        assert_eq!(raw.falloff[0], 10.0);
    }

    #[test]
    fn camera_loads_inverse_view() {
        let camera = Camera::new(Vec3::new(3.0, 4.0, 5.0), Vec3::ZERO);
        let mut uniform = ViewUniform::default();
        uniform.load(&camera);
        let inv = Mat4::from_cols_array_2d(&uniform.inv_view);
        assert!(inv.transform_point3(Vec3::ZERO).distance(camera.position) < 1e-4);
    }
}
