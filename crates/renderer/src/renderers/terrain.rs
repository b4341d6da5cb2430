use terrain::{Terrain, TEXTURE_BLEND, TEXTURE_COUNT, TEXTURE_DIRT, TEXTURE_GRASS, TEXTURE_MUD, TEXTURE_ROAD};

use super::SharedLayouts;
use crate::error::RenderError;
use crate::framebuffer::RenderTarget;
use crate::mesh::Mesh;
use crate::pipeline::{
    create_color_pipeline, create_depth_pipeline, create_shader_module, create_terrain_bind_group_layout,
    ColorPipelineOptions,
};
use crate::shader::{ShaderKind, TerrainUniform, UniformBuffer};
use crate::texture::Texture;
use crate::vertex::terrain_vertex_layout;

/// Draws the heightfield mesh with the blend-mapped surface textures.
pub struct TerrainRenderer {
    pipeline: wgpu::RenderPipeline,
    depth_pipeline: wgpu::RenderPipeline,
    mesh: Mesh,
    bind_group: wgpu::BindGroup,
    _uniform: UniformBuffer<TerrainUniform>,
    _textures: Vec<Texture>,
}

impl TerrainRenderer {
    /// `tiling` is how often the surface textures repeat across the terrain.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        shared: &SharedLayouts,
        terrain: &Terrain,
        tiling: f32,
    ) -> Result<Self, RenderError> {
        let module = create_shader_module(device, ShaderKind::Terrain)?;
        let layout = create_terrain_bind_group_layout(device);
        let pipeline = create_color_pipeline(
            device,
            "Terrain Pipeline",
            &module,
            &[&shared.view, &shared.shadow, &layout],
            &[terrain_vertex_layout()],
            shared.color_format,
            ColorPipelineOptions::default(),
        )?;
        let depth_pipeline = create_depth_pipeline(
            device,
            "Terrain Depth Pipeline",
            &shared.depth_module,
            &shared.view,
            "vs_terrain",
            &[terrain_vertex_layout()],
        )?;

        let data = terrain.mesh_data();
        let mesh = Mesh::new(device, "Terrain Mesh", &data.vertices, &data.indices);

        // Fixed binding order: blend map, grass, road, dirt, mud.
        let mut textures = Vec::with_capacity(TEXTURE_COUNT);
        for index in [TEXTURE_BLEND, TEXTURE_GRASS, TEXTURE_ROAD, TEXTURE_DIRT, TEXTURE_MUD] {
            let label = format!("Terrain Texture {index}");
            let texture = match terrain.texture(index) {
                Some(data) if index == TEXTURE_BLEND => Texture::from_data_linear(device, queue, data, &label),
                Some(data) => Texture::from_data(device, queue, data, true, &label),
                None => Texture::white_pixel(device, queue),
            };
            textures.push(texture);
        }

        let uniform = UniformBuffer::new(device, "Terrain Uniform", &TerrainUniform::new(tiling));
        let mut entries = vec![wgpu::BindGroupEntry {
            binding: 0,
            resource: uniform.binding(),
        }];
        for (i, texture) in textures.iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: 1 + i as u32,
                resource: wgpu::BindingResource::TextureView(&texture.view),
            });
        }
        entries.push(wgpu::BindGroupEntry {
            binding: 6,
            resource: wgpu::BindingResource::Sampler(&textures[TEXTURE_GRASS].sampler),
        });
        entries.push(wgpu::BindGroupEntry {
            binding: 7,
            resource: wgpu::BindingResource::Sampler(&textures[TEXTURE_BLEND].sampler),
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Terrain Bind Group"),
            layout: &layout,
            entries: &entries,
        });

        Ok(Self {
            pipeline,
            depth_pipeline,
            mesh,
            bind_group,
            _uniform: uniform,
            _textures: textures,
        })
    }

    /// Draw into the open shadow pass; `view` holds the light matrices.
    pub fn render_depth(&self, pass: &mut wgpu::RenderPass<'_>, view: &wgpu::BindGroup) {
        pass.set_pipeline(&self.depth_pipeline);
        pass.set_bind_group(0, view, &[]);
        self.mesh.draw(pass, 0..1);
    }

    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: RenderTarget<'_>,
        view: &wgpu::BindGroup,
        shadow: &wgpu::BindGroup,
    ) {
        let mut pass = target.begin_pass(encoder, "Terrain Pass", None);
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, view, &[]);
        pass.set_bind_group(1, shadow, &[]);
        pass.set_bind_group(2, &self.bind_group, &[]);
        self.mesh.draw(&mut pass, 0..1);
    }
}
