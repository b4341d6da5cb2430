use glam::Vec3;
use terrain::TextureData;

use super::SharedLayouts;
use crate::error::RenderError;
use crate::framebuffer::RenderTarget;
use crate::mesh::{Mesh, MeshData};
use crate::pipeline::{
    create_color_pipeline, create_shader_module, create_texture_bind_group, create_texture_bind_group_layout,
    ColorPipelineOptions,
};
use crate::shader::ShaderKind;
use crate::texture::Texture;
use crate::vertex::Vertex;

/// Cube-mapped sky drawn on the far plane. It opens the colour pass and clears it.
pub struct SkyRenderer {
    pipeline: wgpu::RenderPipeline,
    cube: Mesh,
    bind_group: wgpu::BindGroup,
    _texture: Texture,
}

impl SkyRenderer {
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        shared: &SharedLayouts,
        faces: &[TextureData; 6],
    ) -> Result<Self, RenderError> {
        let module = create_shader_module(device, ShaderKind::Sky)?;
        let layout = create_texture_bind_group_layout(device, wgpu::TextureViewDimension::Cube, "Sky Bind Group Layout");
        let pipeline = create_color_pipeline(
            device,
            "Sky Pipeline",
            &module,
            &[&shared.view, &layout],
            &[Vertex::layout()],
            shared.color_format,
            ColorPipelineOptions {
                depth_write: false,
                depth_compare: wgpu::CompareFunction::LessEqual,
                cull_mode: None,
                ..Default::default()
            },
        )?;
        let texture = Texture::cube_from_faces(device, queue, faces, "Sky Cube");
        let bind_group = create_texture_bind_group(device, &layout, &texture, "Sky Bind Group");
        let cube = MeshData::cuboid(Vec3::splat(2.0)).upload(device, "Sky Cube");
        Ok(Self {
            pipeline,
            cube,
            bind_group,
            _texture: texture,
        })
    }

    /// Clear the target and draw the sky behind everything else.
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: RenderTarget<'_>,
        view: &wgpu::BindGroup,
        clear: wgpu::Color,
    ) {
        let mut pass = target.begin_pass(encoder, "Sky Pass", Some(clear));
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, view, &[]);
        pass.set_bind_group(1, &self.bind_group, &[]);
        self.cube.draw(&mut pass, 0..1);
    }
}
