//! Mesh data structures and primitive generation.
//!
//! Primitives are built on the CPU as [`MeshData`] so they can be combined,
//! transformed and measured before [`MeshData::upload`] turns them into a
//! GPU [`Mesh`].

use std::f32::consts::TAU;

use glam::{Mat3, Mat4, Vec3};
use wgpu::util::DeviceExt;

use crate::vertex::Vertex;

/// A GPU mesh with vertex and index buffers.
pub struct Mesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub num_indices: u32,
}

impl Mesh {
    /// Create a mesh from any Pod vertex type and u32 indices.
    pub fn new<V: bytemuck::Pod>(device: &wgpu::Device, label: &str, vertices: &[V], indices: &[u32]) -> Self {
        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });

        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: bytemuck::cast_slice(indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        Self {
            vertex_buffer,
            index_buffer,
            num_indices: indices.len() as u32,
        }
    }

    pub fn draw<'a>(&self, pass: &mut wgpu::RenderPass<'a>, instances: std::ops::Range<u32>) {
        pass.set_vertex_buffer(0, self.vertex_buffer.slice(..));
        pass.set_index_buffer(self.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
        pass.draw_indexed(0..self.num_indices, 0, instances);
    }
}

/// CPU-side mesh data.
#[derive(Debug, Clone, Default)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn upload(&self, device: &wgpu::Device, label: &str) -> Mesh {
        Mesh::new(device, label, &self.vertices, &self.indices)
    }

    /// Axis-aligned bounds, `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        self.vertices.iter().fold(None, |acc, v| {
            let p = Vec3::from(v.position);
            Some(match acc {
                None => (p, p),
                Some((lo, hi)) => (lo.min(p), hi.max(p)),
            })
        })
    }

    /// Apply `matrix` to positions and its normal matrix to normals.
    pub fn transformed(mut self, matrix: Mat4) -> Self {
        let normal_matrix = Mat3::from_mat4(matrix).inverse().transpose();
        for v in &mut self.vertices {
            v.position = matrix.transform_point3(v.position.into()).into();
            v.normal = (normal_matrix * Vec3::from(v.normal)).normalize_or_zero().into();
        }
        self
    }

    /// Append another mesh.
    pub fn merge(mut self, other: MeshData) -> Self {
        let base = self.vertices.len() as u32;
        self.vertices.extend(other.vertices);
        self.indices.extend(other.indices.into_iter().map(|i| i + base));
        self
    }

    /// Axis-aligned box centred at the origin.
    pub fn cuboid(size: Vec3) -> Self {
        let h = size / 2.0;
        let faces: [(Vec3, Vec3, Vec3); 6] = [
            (Vec3::Z, Vec3::X, Vec3::Y),
            (-Vec3::Z, -Vec3::X, Vec3::Y),
            (Vec3::Y, Vec3::X, -Vec3::Z),
            (-Vec3::Y, Vec3::X, Vec3::Z),
            (Vec3::X, -Vec3::Z, Vec3::Y),
            (-Vec3::X, Vec3::Z, Vec3::Y),
        ];
        let mut mesh = MeshData::default();
        for (normal, u, v) in faces {
            let base = mesh.vertices.len() as u32;
            let centre = normal * h;
            let du = u * h;
            let dv = v * h;
            for (su, sv, uv) in [(-1.0, -1.0, [0.0, 1.0]), (1.0, -1.0, [1.0, 1.0]), (1.0, 1.0, [1.0, 0.0]), (-1.0, 1.0, [0.0, 0.0])] {
                let p = centre + du * su + dv * sv;
                mesh.vertices.push(Vertex::new(p.into(), normal.into(), uv));
            }
            mesh.indices.extend([base, base + 1, base + 2, base + 2, base + 3, base]);
        }
        mesh
    }

    /// Flat square in the XZ plane facing +Y, side 1, centred at the origin.
    pub fn plane() -> Self {
        let vertices = vec![
            Vertex::new([-0.5, 0.0, 0.5], [0.0, 1.0, 0.0], [0.0, 1.0]),
            Vertex::new([0.5, 0.0, 0.5], [0.0, 1.0, 0.0], [1.0, 1.0]),
            Vertex::new([0.5, 0.0, -0.5], [0.0, 1.0, 0.0], [1.0, 0.0]),
            Vertex::new([-0.5, 0.0, -0.5], [0.0, 1.0, 0.0], [0.0, 0.0]),
        ];
        Self {
            vertices,
            indices: vec![0, 1, 2, 2, 3, 0],
        }
    }

    /// Capped cylinder along +Y from `y = 0` to `y = height`.
    pub fn cylinder(radius: f32, height: f32, segments: u32) -> Self {
        Self::frustum(radius, radius, height, segments)
    }

    /// Cone along +Y with its base at `y = 0`.
    pub fn cone(radius: f32, height: f32, segments: u32) -> Self {
        Self::frustum(radius, 0.0, height, segments)
    }

    /// Truncated cone along +Y; bottom cap included, top cap when `top > 0`.
    pub fn frustum(bottom: f32, top: f32, height: f32, segments: u32) -> Self {
        let segments = segments.max(3);
        let mut mesh = MeshData::default();
        let slope = (bottom - top) / height.max(1e-6);

        for i in 0..=segments {
            let t = i as f32 / segments as f32;
            let (s, c) = (t * TAU).sin_cos();
            let normal = Vec3::new(c, slope, s).normalize();
            mesh.vertices.push(Vertex::new([c * bottom, 0.0, s * bottom], normal.into(), [t, 1.0]));
            mesh.vertices.push(Vertex::new([c * top, height, s * top], normal.into(), [t, 0.0]));
        }
        for i in 0..segments {
            let b0 = i * 2;
            let (t0, b1, t1) = (b0 + 1, b0 + 2, b0 + 3);
            mesh.indices.extend([b0, t0, b1, b1, t0, t1]);
        }

        let mut cap = |y: f32, radius: f32, normal: Vec3| {
            let centre = mesh.vertices.len() as u32;
            mesh.vertices.push(Vertex::new([0.0, y, 0.0], normal.into(), [0.5, 0.5]));
            for i in 0..=segments {
                let (s, c) = (i as f32 / segments as f32 * TAU).sin_cos();
                mesh.vertices.push(Vertex::new([c * radius, y, s * radius], normal.into(), [0.5 + c * 0.5, 0.5 + s * 0.5]));
            }
            for i in 0..segments {
                let (a, b) = (centre + 1 + i, centre + 2 + i);
                if normal.y > 0.0 {
                    mesh.indices.extend([centre, b, a]);
                } else {
                    mesh.indices.extend([centre, a, b]);
                }
            }
        };
        cap(0.0, bottom, -Vec3::Y);
        if top > 0.0 {
            cap(height, top, Vec3::Y);
        }
        mesh
    }

    /// UV sphere centred at the origin.
    pub fn sphere(radius: f32, rings: u32, segments: u32) -> Self {
        let (rings, segments) = (rings.max(2), segments.max(3));
        let mut mesh = MeshData::default();
        for r in 0..=rings {
            let v = r as f32 / rings as f32;
            let phi = v * std::f32::consts::PI;
            for s in 0..=segments {
                let u = s as f32 / segments as f32;
                let theta = u * TAU;
                let n = Vec3::new(phi.sin() * theta.cos(), phi.cos(), phi.sin() * theta.sin());
                mesh.vertices.push(Vertex::new((n * radius).into(), n.into(), [u, v]));
            }
        }
        let row = segments + 1;
        for r in 0..rings {
            for s in 0..segments {
                let a = r * row + s;
                let b = a + row;
                mesh.indices.extend([a, a + 1, b, a + 1, b + 1, b]);
            }
        }
        mesh
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cuboid_bounds_match_size() {
        let (lo, hi) = MeshData::cuboid(Vec3::new(2.0, 1.0, 4.0)).bounds().unwrap();
        assert_eq!(lo, Vec3::new(-1.0, -0.5, -2.0));
        assert_eq!(hi, Vec3::new(1.0, 0.5, 2.0));
    }

    #[test]
    fn cone_stands_on_the_origin() {
        let (lo, hi) = MeshData::cone(0.5, 2.0, 12).bounds().unwrap();
        assert!((lo.y).abs() < 1e-6);
        assert!((hi.y - 2.0).abs() < 1e-6);
        assert!((hi.x - 0.5).abs() < 1e-5);
    }

    #[test]
    fn merge_offsets_indices() {
        let a = MeshData::plane();
        let b = MeshData::plane().transformed(Mat4::from_translation(Vec3::Y));
        let merged = a.merge(b);
        assert_eq!(merged.vertices.len(), 8);
        assert_eq!(*merged.indices.iter().max().unwrap(), 7);
        let (lo, hi) = merged.bounds().unwrap();
        assert_eq!((lo.y, hi.y), (0.0, 1.0));
    }

    #[test]
    fn indices_stay_in_range() {
        for mesh in [MeshData::sphere(1.0, 6, 8), MeshData::cylinder(1.0, 2.0, 9), MeshData::cuboid(Vec3::ONE)] {
            let n = mesh.vertices.len() as u32;
            assert!(mesh.indices.iter().all(|&i| i < n));
            assert_eq!(mesh.indices.len() % 3, 0);
        }
    }
}
