//! Models: mesh components with materials, OBJ loading and instance batching.

use std::collections::BTreeMap;
use std::path::Path;

use glam::{Mat4, Vec3};
use terrain::TextureData;

use crate::error::RenderError;
use crate::mesh::{Mesh, MeshData};
use crate::shader::{MaterialUniform, UniformBuffer, UniformLoader};
use crate::texture::Texture;
use crate::vertex::{InstanceData, Vertex};

/// Index of a model registered with the entity renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId(pub u32);

/// Phong material of one model component.
#[derive(Debug, Clone)]
pub struct Material {
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    pub shininess: f32,
    pub emission: f32,
    pub texture: Option<TextureData>,
}

impl Default for Material {
    fn default() -> Self {
        Self::color(Vec3::splat(0.8))
    }
}

impl Material {
    /// Untextured material of a single colour.
    pub fn color(color: Vec3) -> Self {
        Self {
            ambient: color,
            diffuse: color,
            specular: Vec3::splat(0.2),
            shininess: 16.0,
            emission: 0.0,
            texture: None,
        }
    }

    pub fn shiny(mut self, specular: f32, shininess: f32) -> Self {
        self.specular = Vec3::splat(specular);
        self.shininess = shininess;
        self
    }

    pub fn with_texture(mut self, texture: TextureData) -> Self {
        self.texture = Some(texture);
        self
    }
}

impl UniformLoader<MaterialUniform> for Material {
    fn load_into(&self, uniform: &mut MaterialUniform) {
        uniform.ambient = self.ambient.extend(1.0).to_array();
        uniform.diffuse = self.diffuse.extend(1.0).to_array();
        uniform.specular = self.specular.extend(1.0).to_array();
        uniform.params = [self.shininess, self.emission, 0.0, 0.0];
    }
}

/// CPU side of one model component.
#[derive(Debug, Clone)]
pub struct ComponentData {
    pub mesh: MeshData,
    pub material: Material,
}

/// CPU side of a model, ready for upload.
#[derive(Debug, Clone, Default)]
pub struct ModelData {
    pub name: String,
    pub components: Vec<ComponentData>,
}

impl ModelData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            components: Vec::new(),
        }
    }

    pub fn with_component(mut self, mesh: MeshData, material: Material) -> Self {
        self.components.push(ComponentData { mesh, material });
        self
    }

    /// Bounds over all components, `None` for an empty model.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        self.components
            .iter()
            .filter_map(|c| c.mesh.bounds())
            .reduce(|(lo, hi), (l, h)| (lo.min(l), hi.max(h)))
    }

    /// Load a Wavefront OBJ, one component per OBJ object.
    ///
    /// Material textures are resolved relative to the OBJ file.
    pub fn load_obj(path: &Path) -> Result<Self, RenderError> {
        let options = tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        };
        let (models, materials) = tobj::load_obj(path, &options).map_err(|source| RenderError::Model {
            path: path.to_path_buf(),
            source,
        })?;
        let materials = materials.unwrap_or_else(|err| {
            log::warn!("{}: no usable material library ({err}), using defaults", path.display());
            Vec::new()
        });
        let base = path.parent().unwrap_or_else(|| Path::new("."));

        let mut data = ModelData::new(path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default());
        for model in models {
            let mesh = obj_mesh(&model.mesh);
            let material = match model.mesh.material_id.and_then(|id| materials.get(id)) {
                Some(mat) => obj_material(mat, base)?,
                None => Material::default(),
            };
            data.components.push(ComponentData { mesh, material });
        }
        log::debug!("Loaded {} ({} components)", path.display(), data.components.len());
        Ok(data)
    }
}

fn obj_mesh(mesh: &tobj::Mesh) -> MeshData {
    let count = mesh.positions.len() / 3;
    let mut vertices: Vec<Vertex> = (0..count)
        .map(|i| {
            let position = [mesh.positions[i * 3], mesh.positions[i * 3 + 1], mesh.positions[i * 3 + 2]];
            let normal = if mesh.normals.len() >= (i + 1) * 3 {
                [mesh.normals[i * 3], mesh.normals[i * 3 + 1], mesh.normals[i * 3 + 2]]
            } else {
                [0.0; 3]
            };
            // OBJ v grows upwards, wgpu rows grow downwards.
            let tex_coords = if mesh.texcoords.len() >= (i + 1) * 2 {
                [mesh.texcoords[i * 2], 1.0 - mesh.texcoords[i * 2 + 1]]
            } else {
                [0.0; 2]
            };
            Vertex::new(position, normal, tex_coords)
        })
        .collect();

    if mesh.normals.is_empty() {
        let mut accum = vec![Vec3::ZERO; count];
        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let (pa, pb, pc) = (
                Vec3::from(vertices[a].position),
                Vec3::from(vertices[b].position),
                Vec3::from(vertices[c].position),
            );
            let n = (pb - pa).cross(pc - pa);
            for i in [a, b, c] {
                accum[i] += n;
            }
        }
        for (v, n) in vertices.iter_mut().zip(accum) {
            v.normal = n.normalize_or(Vec3::Y).into();
        }
    }

    MeshData {
        vertices,
        indices: mesh.indices.clone(),
    }
}

fn obj_material(mat: &tobj::Material, base: &Path) -> Result<Material, RenderError> {
    let diffuse = mat.diffuse.map(Vec3::from).unwrap_or(Vec3::splat(0.8));
    let texture = match &mat.diffuse_texture {
        Some(name) if !name.is_empty() => Some(TextureData::load(&base.join(name))?),
        _ => None,
    };
    Ok(Material {
        ambient: mat.ambient.map(Vec3::from).unwrap_or(diffuse),
        diffuse,
        specular: mat.specular.map(Vec3::from).unwrap_or(Vec3::ZERO),
        shininess: mat.shininess.unwrap_or(1.0).max(1.0),
        emission: 0.0,
        texture,
    })
}

/// Uploaded mesh with its material bind group.
pub struct ModelComponent {
    pub mesh: Mesh,
    pub material_bind_group: wgpu::BindGroup,
    _material: UniformBuffer<MaterialUniform>,
    _texture: Texture,
}

impl ModelComponent {
    pub fn upload(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        layout: &wgpu::BindGroupLayout,
        data: &ComponentData,
        label: &str,
    ) -> Self {
        let mut uniform = MaterialUniform {
            ambient: [0.0; 4],
            diffuse: [0.0; 4],
            specular: [0.0; 4],
            params: [0.0; 4],
        };
        data.material.load_into(&mut uniform);
        let material = UniformBuffer::new(device, label, &uniform);
        let texture = match &data.material.texture {
            Some(texture) => Texture::from_data(device, queue, texture, true, label),
            None => Texture::white_pixel(device, queue),
        };
        let material_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: material.binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(&texture.view),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&texture.sampler),
                },
            ],
        });
        Self {
            mesh: data.mesh.upload(device, label),
            material_bind_group,
            _material: material,
            _texture: texture,
        }
    }
}

/// A renderable model on the GPU.
pub struct Model {
    pub name: String,
    pub components: Vec<ModelComponent>,
    pub bounds: (Vec3, Vec3),
}

/// Anything the entity renderer can draw.
pub trait Drawable {
    fn model_id(&self) -> ModelId;
    fn model_matrix(&self) -> Mat4;
    fn casts_shadow(&self) -> bool {
        true
    }
}

/// Instances of one model drawn with a single call.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceBatch {
    pub model: ModelId,
    pub casts_shadow: bool,
    pub instances: Vec<InstanceData>,
}

impl InstanceBatch {
    /// Group drawables by model and shadow flag, in model order.
    pub fn collect<'a, D, I>(drawables: I) -> Vec<InstanceBatch>
    where
        D: Drawable + ?Sized + 'a,
        I: IntoIterator<Item = &'a D>,
    {
        let mut groups: BTreeMap<(ModelId, bool), Vec<InstanceData>> = BTreeMap::new();
        for drawable in drawables {
            groups
                .entry((drawable.model_id(), drawable.casts_shadow()))
                .or_default()
                .push(InstanceData::new(drawable.model_matrix()));
        }
        groups
            .into_iter()
            .map(|((model, casts_shadow), instances)| InstanceBatch {
                model,
                casts_shadow,
                instances,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Prop(u32, Vec3, bool);

    impl Drawable for Prop {
        fn model_id(&self) -> ModelId {
            ModelId(self.0)
        }

        fn model_matrix(&self) -> Mat4 {
            Mat4::from_translation(self.1)
        }

        fn casts_shadow(&self) -> bool {
            self.2
        }
    }

    #[test]
    fn batches_group_by_model_and_shadow() {
        let props = [
            Prop(2, Vec3::X, true),
            Prop(1, Vec3::Y, true),
            Prop(2, Vec3::Z, true),
            Prop(2, Vec3::ONE, false),
        ];
        let batches = InstanceBatch::collect(&props);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].model, ModelId(1));
        assert_eq!((batches[1].model, batches[1].casts_shadow), (ModelId(2), false));
        assert_eq!(batches[2].instances.len(), 2);
        assert_eq!(batches[2].instances[1], InstanceData::new(Mat4::from_translation(Vec3::Z)));
    }

    #[test]
    fn material_packs_shininess_and_emission() {
        let material = Material {
            emission: 0.5,
            ..Material::color(Vec3::new(1.0, 0.5, 0.0)).shiny(0.9, 64.0)
        };
        let mut uniform = MaterialUniform {
            ambient: [0.0; 4],
            diffuse: [0.0; 4],
            specular: [0.0; 4],
            params: [0.0; 4],
        };
        material.load_into(&mut uniform);
        assert_eq!(uniform.diffuse, [1.0, 0.5, 0.0, 1.0]);
        assert_eq!(uniform.params[..2], [64.0, 0.5]);
    }

    #[test]
    fn model_bounds_cover_all_components() {
        let model = ModelData::new("pair")
            .with_component(MeshData::cuboid(Vec3::ONE), Material::default())
            .with_component(
                MeshData::cuboid(Vec3::ONE).transformed(Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0))),
                Material::default(),
            );
        let (lo, hi) = model.bounds().unwrap();
        assert_eq!(lo.y, -0.5);
        assert_eq!(hi.y, 2.5);
    }

    #[test]
    fn obj_without_normals_gets_face_normals() {
        let mesh = tobj::Mesh {
            positions: vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, -1.0],
            indices: vec![0, 1, 2],
            ..Default::default()
        };
        let data = obj_mesh(&mesh);
        for v in &data.vertices {
            assert_eq!(v.normal, [0.0, 1.0, 0.0]);
        }
    }
}
