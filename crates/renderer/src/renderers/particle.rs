use terrain::TextureData;
use wgpu::util::DeviceExt;

use super::SharedLayouts;
use crate::error::RenderError;
use crate::framebuffer::RenderTarget;
use crate::pipeline::{
    create_color_pipeline, create_shader_module, create_texture_bind_group, create_texture_bind_group_layout,
    ColorPipelineOptions,
};
use crate::shader::ShaderKind;
use crate::texture::Texture;
use crate::vertex::{particle_corner_layout, ParticleInstance};

const QUAD_CORNERS: [[f32; 2]; 6] = [
    [-0.5, -0.5],
    [0.5, -0.5],
    [0.5, 0.5],
    [0.5, 0.5],
    [-0.5, 0.5],
    [-0.5, -0.5],
];

/// Alpha-blended camera-facing sprites.
pub struct ParticleRenderer {
    pipeline: wgpu::RenderPipeline,
    corners: wgpu::Buffer,
    instance_buffer: wgpu::Buffer,
    capacity: u32,
    count: u32,
    bind_group: wgpu::BindGroup,
    _texture: Texture,
}

impl ParticleRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        shared: &SharedLayouts,
        sprite: &TextureData,
        capacity: u32,
    ) -> Result<Self, RenderError> {
        let module = create_shader_module(device, ShaderKind::Particle)?;
        let layout = create_texture_bind_group_layout(device, wgpu::TextureViewDimension::D2, "Particle Bind Group Layout");
        let pipeline = create_color_pipeline(
            device,
            "Particle Pipeline",
            &module,
            &[&shared.view, &layout],
            &[particle_corner_layout(), ParticleInstance::layout()],
            shared.color_format,
            ColorPipelineOptions::transparent(),
        )?;
        let texture = Texture::from_data(device, queue, sprite, false, "Particle Sprite");
        let bind_group = create_texture_bind_group(device, &layout, &texture, "Particle Bind Group");
        let corners = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Particle Corners"),
            contents: bytemuck::cast_slice(&QUAD_CORNERS),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let capacity = capacity.max(1);
        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Particle Instance Buffer"),
            size: (std::mem::size_of::<ParticleInstance>() * capacity as usize) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        Ok(Self {
            pipeline,
            corners,
            instance_buffer,
            capacity,
            count: 0,
            bind_group,
            _texture: texture,
        })
    }

    /// Upload this frame's particles, dropping any beyond capacity.
    pub fn prepare(&mut self, queue: &wgpu::Queue, particles: &[ParticleInstance]) {
        let count = particles.len().min(self.capacity as usize);
        if count > 0 {
            queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&particles[..count]));
        }
        self.count = count as u32;
    }

    pub fn render(&self, encoder: &mut wgpu::CommandEncoder, target: RenderTarget<'_>, view: &wgpu::BindGroup) {
        if self.count == 0 {
            return;
        }
        let mut pass = target.begin_pass(encoder, "Particle Pass", None);
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, view, &[]);
        pass.set_bind_group(1, &self.bind_group, &[]);
        pass.set_vertex_buffer(0, self.corners.slice(..));
        pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
        pass.draw(0..QUAD_CORNERS.len() as u32, 0..self.count);
    }
}
