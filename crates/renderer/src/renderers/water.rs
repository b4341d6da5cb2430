use glam::{Mat4, Vec2, Vec3, Vec4};

use super::SharedLayouts;
use crate::error::RenderError;
use crate::framebuffer::RenderTarget;
use crate::mesh::{Mesh, MeshData};
use crate::pipeline::{create_color_pipeline, create_shader_module, create_water_bind_group_layout, ColorPipelineOptions};
use crate::shader::{ShaderKind, UniformBuffer, WaterUniform};
use crate::texture::Texture;
use crate::vertex::Vertex;

/// A flat rectangular water plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaterSurface {
    pub center: Vec3,
    /// Extent along world x and z.
    pub size: Vec2,
    /// rgb = tint, a = opacity.
    pub color: Vec4,
    pub wave_strength: f32,
    pub shininess: f32,
}

impl WaterSurface {
    /// Blue-green water centred at `center`.
    pub fn new(center: Vec3, size: Vec2) -> Self {
        Self {
            center,
            size,
            color: Vec4::new(0.1, 0.3, 0.4, 0.7),
            wave_strength: 0.1,
            shininess: 64.0,
        }
    }

    pub fn height(&self) -> f32 {
        self.center.y
    }

    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_translation(self.center) * Mat4::from_scale(Vec3::new(self.size.x, 1.0, self.size.y))
    }

    /// Plane that keeps everything above the water, for the reflection pass.
    pub fn reflection_clip_plane(&self) -> Vec4 {
        Vec4::new(0.0, 1.0, 0.0, -self.height())
    }
}

/// Transparent water that mixes its own shading with the reflection texture.
pub struct WaterRenderer {
    pipeline: wgpu::RenderPipeline,
    layout: wgpu::BindGroupLayout,
    plane: Mesh,
    surface: WaterSurface,
    uniform: UniformBuffer<WaterUniform>,
    bind_group: wgpu::BindGroup,
    placeholder: Texture,
}

impl WaterRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        shared: &SharedLayouts,
        surface: WaterSurface,
    ) -> Result<Self, RenderError> {
        let module = create_shader_module(device, ShaderKind::Water)?;
        let layout = create_water_bind_group_layout(device);
        let pipeline = create_color_pipeline(
            device,
            "Water Pipeline",
            &module,
            &[&shared.view, &shared.shadow, &layout],
            &[Vertex::layout()],
            shared.color_format,
            ColorPipelineOptions::transparent(),
        )?;
        let uniform = UniformBuffer::new(device, "Water Uniform", &Self::uniform_for(&surface, 0.0, false));
        let placeholder = Texture::white_pixel(device, queue);
        let bind_group = Self::create_bind_group(device, &layout, &uniform, &placeholder);
        Ok(Self {
            pipeline,
            layout,
            plane: MeshData::plane().upload(device, "Water Plane"),
            surface,
            uniform,
            bind_group,
            placeholder,
        })
    }

    fn uniform_for(surface: &WaterSurface, time: f32, reflection: bool) -> WaterUniform {
        WaterUniform {
            model: surface.model_matrix().to_cols_array_2d(),
            color: surface.color.to_array(),
            params: [
                time,
                if reflection { 1.0 } else { 0.0 },
                surface.wave_strength,
                surface.shininess,
            ],
        }
    }

    fn create_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        uniform: &UniformBuffer<WaterUniform>,
        reflection: &Texture,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Water Bind Group"),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform.binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&reflection.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&reflection.sampler),
                },
            ],
        })
    }

    pub fn surface(&self) -> &WaterSurface {
        &self.surface
    }

    /// Point the water at a (new) reflection texture, or the placeholder when `None`.
    pub fn set_reflection(&mut self, device: &wgpu::Device, reflection: Option<&Texture>) {
        let texture = reflection.unwrap_or(&self.placeholder);
        self.bind_group = Self::create_bind_group(device, &self.layout, &self.uniform, texture);
    }

    pub fn update(&self, queue: &wgpu::Queue, time: f32, reflection: bool) {
        self.uniform.write(queue, &Self::uniform_for(&self.surface, time, reflection));
    }

    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: RenderTarget<'_>,
        view: &wgpu::BindGroup,
        shadow: &wgpu::BindGroup,
    ) {
        let mut pass = target.begin_pass(encoder, "Water Pass", None);
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, view, &[]);
        pass.set_bind_group(1, shadow, &[]);
        pass.set_bind_group(2, &self.bind_group, &[]);
        self.plane.draw(&mut pass, 0..1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_plane_keeps_points_above_the_water() {
        let surface = WaterSurface::new(Vec3::new(10.0, 0.4, -5.0), Vec2::new(50.0, 20.0));
        let plane = surface.reflection_clip_plane();
        assert!(plane.dot(Vec4::new(0.0, 2.0, 0.0, 1.0)) > 0.0);
        assert!(plane.dot(Vec4::new(0.0, -1.0, 0.0, 1.0)) < 0.0);
        let corner = surface.model_matrix().transform_point3(Vec3::new(0.5, 0.0, 0.5));
        assert_eq!(corner, Vec3::new(35.0, 0.4, 5.0));
    }
}
