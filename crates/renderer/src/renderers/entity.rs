use std::ops::Range;

use super::SharedLayouts;
use crate::error::RenderError;
use crate::framebuffer::RenderTarget;
use crate::model::{InstanceBatch, Model, ModelComponent, ModelData, ModelId};
use crate::pipeline::{
    create_color_pipeline, create_depth_pipeline, create_material_bind_group_layout, create_shader_module,
    ColorPipelineOptions,
};
use crate::shader::ShaderKind;
use crate::vertex::{InstanceData, Vertex};

const DEFAULT_MAX_INSTANCES: u32 = 4096;

/// Batch ready to draw: model, shadow flag and its slice of the instance buffer.
#[derive(Debug, Clone)]
struct PreparedBatch {
    model: ModelId,
    casts_shadow: bool,
    instances: Range<u32>,
}

/// Instanced, material-lit models (props, vehicle, fences).
pub struct EntityRenderer {
    pipeline: wgpu::RenderPipeline,
    depth_pipeline: wgpu::RenderPipeline,
    material_layout: wgpu::BindGroupLayout,
    models: Vec<Model>,
    instance_buffer: wgpu::Buffer,
    max_instances: u32,
    prepared: Vec<PreparedBatch>,
}

impl EntityRenderer {
    pub fn new(device: &wgpu::Device, shared: &SharedLayouts) -> Result<Self, RenderError> {
        let module = create_shader_module(device, ShaderKind::Entity)?;
        let material_layout = create_material_bind_group_layout(device);
        let pipeline = create_color_pipeline(
            device,
            "Entity Pipeline",
            &module,
            &[&shared.view, &shared.shadow, &material_layout],
            &[Vertex::layout(), InstanceData::layout()],
            shared.color_format,
            ColorPipelineOptions::default(),
        )?;
        let depth_pipeline = create_depth_pipeline(
            device,
            "Entity Depth Pipeline",
            &shared.depth_module,
            &shared.view,
            "vs_entity",
            &[Vertex::layout(), InstanceData::layout()],
        )?;

        let max_instances = DEFAULT_MAX_INSTANCES;
        let instance_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Entity Instance Buffer"),
            size: (std::mem::size_of::<InstanceData>() * max_instances as usize) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        Ok(Self {
            pipeline,
            depth_pipeline,
            material_layout,
            models: Vec::new(),
            instance_buffer,
            max_instances,
            prepared: Vec::new(),
        })
    }

    /// Upload a model and return its id.
    pub fn add_model(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, data: &ModelData) -> ModelId {
        let components = data
            .components
            .iter()
            .enumerate()
            .map(|(i, c)| ModelComponent::upload(device, queue, &self.material_layout, c, &format!("{} #{i}", data.name)))
            .collect();
        let id = ModelId(self.models.len() as u32);
        self.models.push(Model {
            name: data.name.clone(),
            components,
            bounds: data.bounds().unwrap_or_default(),
        });
        log::debug!("Registered model {:?} as {id:?}", data.name);
        id
    }

    pub fn model(&self, id: ModelId) -> Option<&Model> {
        self.models.get(id.0 as usize)
    }

    /// Write this frame's instances once; every pass of the frame reuses them.
    pub fn prepare(&mut self, queue: &wgpu::Queue, batches: &[InstanceBatch]) {
        self.prepared.clear();
        let mut offset = 0u32;
        for batch in batches {
            if self.model(batch.model).is_none() {
                log::warn!("Skipping batch for unknown model {:?}", batch.model);
                continue;
            }
            let count = (batch.instances.len() as u32).min(self.max_instances - offset);
            if count == 0 {
                continue;
            }
            let byte_offset = (offset as usize * std::mem::size_of::<InstanceData>()) as u64;
            queue.write_buffer(
                &self.instance_buffer,
                byte_offset,
                bytemuck::cast_slice(&batch.instances[..count as usize]),
            );
            self.prepared.push(PreparedBatch {
                model: batch.model,
                casts_shadow: batch.casts_shadow,
                instances: offset..offset + count,
            });
            offset += count;
        }
        if batches.iter().map(|b| b.instances.len()).sum::<usize>() > offset as usize {
            log::warn!("Instance buffer full, drew {offset} of the requested entities");
        }
    }

    fn draw_batches(&self, pass: &mut wgpu::RenderPass<'_>, shadow_casters_only: bool, bind_materials: bool) {
        pass.set_vertex_buffer(1, self.instance_buffer.slice(..));
        for batch in &self.prepared {
            if shadow_casters_only && !batch.casts_shadow {
                continue;
            }
            let Some(model) = self.model(batch.model) else {
                continue;
            };
            for component in &model.components {
                if bind_materials {
                    pass.set_bind_group(2, &component.material_bind_group, &[]);
                }
                component.mesh.draw(pass, batch.instances.clone());
            }
        }
    }

    /// Draw shadow casters into the open shadow pass.
    pub fn render_depth(&self, pass: &mut wgpu::RenderPass<'_>, view: &wgpu::BindGroup) {
        pass.set_pipeline(&self.depth_pipeline);
        pass.set_bind_group(0, view, &[]);
        self.draw_batches(pass, true, false);
    }

    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        target: RenderTarget<'_>,
        view: &wgpu::BindGroup,
        shadow: &wgpu::BindGroup,
    ) {
        if self.prepared.is_empty() {
            return;
        }
        let mut pass = target.begin_pass(encoder, "Entity Pass", None);
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, view, &[]);
        pass.set_bind_group(1, shadow, &[]);
        self.draw_batches(&mut pass, false, true);
    }
}
