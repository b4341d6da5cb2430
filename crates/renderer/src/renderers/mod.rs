//! One renderer per drawable category.
//!
//! Each colour `render` call records its own wgpu render pass against the
//! given target, so pipeline and bind group state never leaks from one
//! category into the next. Shadow casters also provide `render_depth`,
//! drawn into the already open shadow pass with the light's view bound.

mod entity;
mod particle;
mod sky;
mod terrain;
mod water;

pub use entity::EntityRenderer;
pub use particle::ParticleRenderer;
pub use sky::SkyRenderer;
pub use terrain::TerrainRenderer;
pub use water::{WaterRenderer, WaterSurface};

use crate::error::RenderError;
use crate::pipeline::{create_shadow_bind_group_layout, create_shader_module, create_view_bind_group_layout};
use crate::shader::ShaderKind;

/// Layouts and modules every renderer builds against.
pub struct SharedLayouts {
    pub view: wgpu::BindGroupLayout,
    pub shadow: wgpu::BindGroupLayout,
    /// Light-space depth program shared by all shadow casters.
    pub depth_module: wgpu::ShaderModule,
    pub color_format: wgpu::TextureFormat,
}

impl SharedLayouts {
    pub fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat) -> Result<Self, RenderError> {
        Ok(Self {
            view: create_view_bind_group_layout(device),
            shadow: create_shadow_bind_group_layout(device),
            depth_module: create_shader_module(device, ShaderKind::Depth)?,
            color_format,
        })
    }
}
