//! World-space terrain: heightfield placement, queries and mesh data.
//!
//! The terrain is a square of `size` world units centred on the origin.
//! Heights are bilinear inside each grid cell, which agrees with the
//! triangle mesh at every vertex and along every cell edge.

use std::path::Path;

use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

use crate::{
    BlendLayout, Heightfield, NoiseConfig, PixelGrid, TerrainError, TextureData, TextureGenerator,
    Track, TrackConfig,
};

/// Terrain texture slots, in shader binding order.
pub const TEXTURE_BLEND: usize = 0;
pub const TEXTURE_GRASS: usize = 1;
pub const TEXTURE_ROAD: usize = 2;
pub const TEXTURE_DIRT: usize = 3;
pub const TEXTURE_MUD: usize = 4;
pub const TEXTURE_COUNT: usize = 5;

/// Vertex for the terrain mesh.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct TerrainVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    /// `[0, 1]` across the whole terrain (blend map space).
    pub uv: [f32; 2],
}

#[derive(Debug, Clone)]
pub struct TerrainMesh {
    pub vertices: Vec<TerrainVertex>,
    pub indices: Vec<u32>,
}

/// Configuration for procedural terrain.
#[derive(Debug, Clone)]
pub struct TerrainConfig {
    /// Side length in world units.
    pub size: f32,
    /// Heightfield vertices per side.
    pub resolution: u32,
    pub max_height: f32,
    /// Side length of map pixel space (blend map / heightmap image).
    pub map_size: f32,
    /// Side length of the tiled surface textures.
    pub texture_size: u32,
    /// Side length of the generated blend map.
    pub blend_resolution: u32,
    pub noise: NoiseConfig,
    pub track: TrackConfig,
    /// Pond centre and radius in map pixels.
    pub pond: Option<(Vec2, f32)>,
    /// Height of the pond floor.
    pub pond_depth: f32,
}

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            size: 400.0,
            resolution: 257,
            max_height: 10.0,
            map_size: 1024.0,
            texture_size: 256,
            blend_resolution: 512,
            noise: NoiseConfig::default(),
            track: TrackConfig::default(),
            pond: Some((Vec2::splat(512.0), 70.0)),
            pond_depth: -1.5,
        }
    }
}

impl TerrainConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.noise.seed = seed;
        self.track.seed = seed;
        self
    }
}

/// Terrain plus the track painted into it.
pub struct GeneratedTerrain {
    pub terrain: Terrain,
    pub track: Track,
}

pub struct Terrain {
    size: f32,
    map_size: f32,
    /// World `(x, z)` of heightfield sample `(0, 0)`.
    origin: Vec2,
    heights: Heightfield,
    textures: Vec<TextureData>,
}

fn smooth_step(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

impl Terrain {
    /// `textures` are in slot order: blend map, grass, road, dirt, mud.
    pub fn new(size: f32, map_size: f32, heights: Heightfield, textures: [TextureData; TEXTURE_COUNT]) -> Self {
        Self {
            size,
            map_size,
            origin: Vec2::splat(-size / 2.0),
            heights,
            textures: textures.into(),
        }
    }

    /// Flat terrain at height 0 with plain textures.
    pub fn flat(size: f32, resolution: u32) -> Result<Self, TerrainError> {
        let plain = || TextureData::solid(1, 1, crate::Pixel::new(255, 255, 255, 255));
        Ok(Self::new(
            size,
            size,
            Heightfield::flat(resolution)?,
            [plain(), plain(), plain(), plain(), plain()],
        ))
    }

    /// Load a heightmap image and the five surface images.
    pub fn from_files(
        config: &TerrainConfig,
        heightmap: &Path,
        textures: [&Path; TEXTURE_COUNT],
    ) -> Result<Self, TerrainError> {
        let heights = Heightfield::from_image(heightmap, config.max_height)?;
        let map_size = heights.resolution() as f32;
        let [blend, grass, road, dirt, mud] = textures;
        Ok(Self::new(
            config.size,
            map_size,
            heights,
            [
                TextureData::load(blend)?,
                TextureData::load(grass)?,
                TextureData::load(road)?,
                TextureData::load(dirt)?,
                TextureData::load(mud)?,
            ],
        ))
    }

    /// Noise hills, a pond basin and a flattened race track.
    pub fn generate(config: &TerrainConfig) -> Result<GeneratedTerrain, TerrainError> {
        let mut heights = Heightfield::generate(config.resolution, config.max_height, &config.noise)?;
        let grid = PixelGrid::vertices(config.resolution, config.map_size);

        if let Some((centre, radius)) = config.pond {
            for z in 0..config.resolution {
                for x in 0..config.resolution {
                    let d = grid.point(x, z).distance(centre) / radius;
                    let t = smooth_step(0.6, 1.6, d);
                    let h = heights.get(x, z);
                    heights.set(x, z, config.pond_depth + (h - config.pond_depth) * t);
                }
            }
        }

        let track = Track::generate(&config.track);
        Self::flatten_track(&mut heights, &track, grid);

        let mut generator = TextureGenerator::new(config.noise.seed);
        let layout = BlendLayout {
            track: Some(&track),
            pond: config.pond,
            map_size: config.map_size,
        };
        let textures = [
            generator.blend_map(config.blend_resolution, &layout),
            generator.grass(config.texture_size),
            generator.road(config.texture_size),
            generator.dirt(config.texture_size),
            generator.mud(config.texture_size),
        ];

        let terrain = Self::new(config.size, config.map_size, heights, textures);
        let (lo, hi) = terrain.heights.min_max();
        log::info!(
            "Generated terrain {}u, {}² samples, heights {:.1}..{:.1}",
            config.size,
            config.resolution,
            lo,
            hi
        );
        Ok(GeneratedTerrain { terrain, track })
    }

    /// Pull heights near the centreline towards a smoothed road profile.
    fn flatten_track(heights: &mut Heightfield, track: &Track, grid: PixelGrid) {
        let to_grid = |p: Vec2| (p - Vec2::splat(grid.offset)) / grid.step;
        let mut profile: Vec<f32> = track
            .points()
            .iter()
            .map(|p| {
                let g = to_grid(*p);
                heights.sample(g.x, g.y)
            })
            .collect();

        let n = profile.len();
        for _ in 0..3 {
            let window = 8usize;
            profile = (0..n)
                .map(|i| {
                    let sum: f32 = (0..=2 * window).map(|k| profile[(i + n + k - window) % n]).sum();
                    sum / (2 * window + 1) as f32
                })
                .collect();
        }

        let hw = track.half_width();
        let field = track.stamp(grid, hw * 3.0);
        for z in 0..grid.rows {
            for x in 0..grid.cols {
                if let Some(hit) = field[(z * grid.cols + x) as usize] {
                    let w = 1.0 - smooth_step(hw * 1.2, hw * 3.0, hit.distance);
                    let h = heights.get(x, z);
                    heights.set(x, z, h + (profile[hit.segment] - h) * w);
                }
            }
        }
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn map_size(&self) -> f32 {
        self.map_size
    }

    /// Distance between neighbouring height samples.
    pub fn step(&self) -> f32 {
        self.size / (self.heights.resolution() - 1) as f32
    }

    pub fn heightfield(&self) -> &Heightfield {
        &self.heights
    }

    /// World `(x, z)` corners.
    pub fn bounds(&self) -> (Vec2, Vec2) {
        (self.origin, self.origin + Vec2::splat(self.size))
    }

    pub fn contains(&self, x: f32, z: f32) -> bool {
        let (min, max) = self.bounds();
        x >= min.x && x <= max.x && z >= min.y && z <= max.y
    }

    /// Terrain height at world `(x, z)`.
    ///
    /// Bilinear within the grid cell; positions outside the terrain are
    /// clamped to the nearest border sample.
    pub fn get_height(&self, x: f32, z: f32) -> f32 {
        let step = self.step();
        self.heights.sample((x - self.origin.x) / step, (z - self.origin.y) / step)
    }

    /// Surface normal from central differences of [`Self::get_height`].
    pub fn normal_at(&self, x: f32, z: f32) -> Vec3 {
        let e = self.step();
        let left = self.get_height(x - e, z);
        let right = self.get_height(x + e, z);
        let back = self.get_height(x, z - e);
        let front = self.get_height(x, z + e);
        Vec3::new(left - right, 2.0 * e, back - front).normalize()
    }

    /// World position (on the surface) of a map pixel.
    pub fn position_from_pixel(&self, px: f32, pz: f32) -> Vec3 {
        let x = self.origin.x + px / self.map_size * self.size;
        let z = self.origin.y + pz / self.map_size * self.size;
        Vec3::new(x, self.get_height(x, z), z)
    }

    /// Surface texture by slot: 0 blend map, 1 grass, 2 road, 3 dirt, 4 mud.
    pub fn texture(&self, index: usize) -> Option<&TextureData> {
        self.textures.get(index)
    }

    /// Vertex and index lists for rendering.
    pub fn mesh_data(&self) -> TerrainMesh {
        let res = self.heights.resolution();
        let step = self.step();
        let last = (res - 1) as f32;

        let mut vertices = Vec::with_capacity((res * res) as usize);
        for z in 0..res {
            for x in 0..res {
                vertices.push(TerrainVertex {
                    position: [
                        self.origin.x + x as f32 * step,
                        self.heights.get(x, z),
                        self.origin.y + z as f32 * step,
                    ],
                    normal: [0.0, 1.0, 0.0],
                    uv: [x as f32 / last, z as f32 / last],
                });
            }
        }

        let res = res as usize;
        let mut indices = Vec::with_capacity((res - 1) * (res - 1) * 6);
        for z in 0..(res - 1) {
            for x in 0..(res - 1) {
                let top_left = (z * res + x) as u32;
                let top_right = top_left + 1;
                let bottom_left = ((z + 1) * res + x) as u32;
                let bottom_right = bottom_left + 1;

                indices.extend([top_left, bottom_left, top_right]);
                indices.extend([top_right, bottom_left, bottom_right]);
            }
        }

        calculate_normals(&mut vertices, res);
        TerrainMesh { vertices, indices }
    }
}

/// Area-weighted vertex normals from the two triangles of every cell.
fn calculate_normals(vertices: &mut [TerrainVertex], resolution: usize) {
    let mut normals = vec![Vec3::ZERO; vertices.len()];

    for z in 0..(resolution - 1) {
        for x in 0..(resolution - 1) {
            let i0 = z * resolution + x;
            let i1 = i0 + 1;
            let i2 = (z + 1) * resolution + x;
            let i3 = i2 + 1;

            let v0: Vec3 = vertices[i0].position.into();
            let v1: Vec3 = vertices[i1].position.into();
            let v2: Vec3 = vertices[i2].position.into();
            let v3: Vec3 = vertices[i3].position.into();

            let n1 = (v2 - v0).cross(v1 - v0);
            normals[i0] += n1;
            normals[i1] += n1;
            normals[i2] += n1;

            let n2 = (v2 - v1).cross(v3 - v1);
            normals[i1] += n2;
            normals[i2] += n2;
            normals[i3] += n2;
        }
    }

    for (vertex, n) in vertices.iter_mut().zip(normals) {
        vertex.normal = n.normalize_or(Vec3::Y).into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;

    fn small_config() -> TerrainConfig {
        TerrainConfig {
            resolution: 65,
            texture_size: 8,
            blend_resolution: 32,
            ..Default::default()
        }
        .with_seed(42)
    }

    #[test]
    fn flat_terrain_is_zero_everywhere() {
        let terrain = Terrain::flat(100.0, 11).unwrap();
        assert_eq!(terrain.get_height(0.0, 0.0), 0.0);
        assert_eq!(terrain.get_height(37.3, -12.9), 0.0);
        assert!((terrain.normal_at(5.0, 5.0) - Vec3::Y).length() < 1e-6);
    }

    /// Neighbouring queries differ by at most the local grid slope times
    /// the distance between them.
    #[test]
    fn height_is_continuous() {
        let terrain = Terrain::generate(&small_config()).unwrap().terrain;
        let slope = terrain.heightfield().max_step() / terrain.step();
        let mut rng = StdRng::seed_from_u64(1);
        let half = terrain.size() / 2.0;
        for _ in 0..500 {
            let x = rng.gen_range(-half..half);
            let z = rng.gen_range(-half..half);
            let dx = rng.gen_range(-0.5..0.5);
            let dz = rng.gen_range(-0.5..0.5);
            let dh = (terrain.get_height(x + dx, z + dz) - terrain.get_height(x, z)).abs();
            assert!(dh <= slope * (f32::abs(dx) + f32::abs(dz)) + 1e-4);
        }
    }

    #[test]
    fn height_matches_mesh_at_vertices_and_edges() {
        let terrain = Terrain::generate(&small_config()).unwrap().terrain;
        let mesh = terrain.mesh_data();
        let res = terrain.heightfield().resolution() as usize;
        for (i, v) in mesh.vertices.iter().enumerate().step_by(7) {
            let [x, y, z] = v.position;
            assert!((terrain.get_height(x, z) - y).abs() < 1e-3, "vertex {i}");
            if i % res + 1 < res {
                let [nx, ny, _] = mesh.vertices[i + 1].position;
                let mid = terrain.get_height((x + nx) / 2.0, z);
                assert!((mid - (y + ny) / 2.0).abs() < 1e-3, "edge after vertex {i}");
            }
        }
    }

    #[test]
    fn outside_queries_clamp_to_border() {
        let terrain = Terrain::generate(&small_config()).unwrap().terrain;
        let (min, max) = terrain.bounds();
        assert!((terrain.get_height(-1e6, -1e6) - terrain.get_height(min.x, min.y)).abs() < 1e-4);
        assert!((terrain.get_height(1e6, 1e6) - terrain.get_height(max.x, max.y)).abs() < 1e-4);
        assert!((terrain.get_height(1e6, min.y) - terrain.get_height(max.x, min.y)).abs() < 1e-4);
    }

    #[test]
    fn pixels_map_onto_the_terrain_square() {
        let terrain = Terrain::flat(400.0, 5).unwrap();
        let p = terrain.position_from_pixel(0.0, 0.0);
        assert_eq!((p.x, p.z), (-200.0, -200.0));
        let c = terrain.position_from_pixel(200.0, 200.0);
        assert_eq!((c.x, c.z), (0.0, 0.0));
    }

    #[test]
    fn pond_floor_sits_below_the_water_line() {
        let config = small_config();
        let terrain = Terrain::generate(&config).unwrap().terrain;
        let Some((centre, _)) = config.pond else { unreachable!() };
        assert!(terrain.position_from_pixel(centre.x, centre.y).y < 0.0);
    }

    #[test]
    fn texture_slots() {
        let terrain = Terrain::generate(&small_config()).unwrap().terrain;
        assert_eq!(terrain.texture(TEXTURE_BLEND).map(|t| t.width), Some(32));
        assert_eq!(terrain.texture(TEXTURE_MUD).map(|t| t.width), Some(8));
        assert!(terrain.texture(TEXTURE_COUNT).is_none());
    }
}
