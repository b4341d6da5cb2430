//! Procedural textures for the terrain surface, particles and sky,
//! plus image loading into the same CPU-side format.

use std::path::Path;

use glam::{Vec2, Vec3};
use noise::{NoiseFn, Perlin};
use rand::prelude::*;

use crate::{PixelGrid, Track, TerrainError};

/// RGBA pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pixel {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Pixel {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn from_rgb(r: f32, g: f32, b: f32) -> Self {
        Self::from_rgba(r, g, b, 1.0)
    }

    pub fn from_rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        let q = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self {
            r: q(r),
            g: q(g),
            b: q(b),
            a: q(a),
        }
    }
}

/// CPU-side RGBA8 image.
#[derive(Debug, Clone)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Pixel>,
}

impl TextureData {
    pub fn new(width: u32, height: u32) -> Self {
        Self::solid(width, height, Pixel::new(0, 0, 0, 255))
    }

    pub fn solid(width: u32, height: u32, pixel: Pixel) -> Self {
        Self {
            width,
            height,
            pixels: vec![pixel; (width * height) as usize],
        }
    }

    /// Load any image the `image` crate can decode, converted to RGBA8.
    pub fn load(path: &Path) -> Result<Self, TerrainError> {
        let img = image::open(path)
            .map_err(|source| TerrainError::Image { path: path.to_path_buf(), source })?
            .to_rgba8();
        let (width, height) = img.dimensions();
        let pixels = img.pixels().map(|p| Pixel::new(p.0[0], p.0[1], p.0[2], p.0[3])).collect();
        Ok(Self { width, height, pixels })
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, pixel: Pixel) {
        if x < self.width && y < self.height {
            self.pixels[(y * self.width + x) as usize] = pixel;
        }
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> Pixel {
        if x < self.width && y < self.height {
            self.pixels[(y * self.width + x) as usize]
        } else {
            Pixel::new(0, 0, 0, 255)
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|p| [p.r, p.g, p.b, p.a]).collect()
    }
}

/// Direction through texel `(x, y)` of cube face `face`, in wgpu layer order
/// (+X, -X, +Y, -Y, +Z, -Z).
pub fn cube_face_direction(face: usize, x: u32, y: u32, size: u32) -> Vec3 {
    let u = 2.0 * (x as f32 + 0.5) / size as f32 - 1.0;
    let v = 2.0 * (y as f32 + 0.5) / size as f32 - 1.0;
    let dir = match face {
        0 => Vec3::new(1.0, -v, -u),
        1 => Vec3::new(-1.0, -v, u),
        2 => Vec3::new(u, 1.0, v),
        3 => Vec3::new(u, -1.0, -v),
        4 => Vec3::new(u, -v, 1.0),
        _ => Vec3::new(-u, -v, -1.0),
    };
    dir.normalize()
}

/// Where each terrain layer goes.
pub struct BlendLayout<'a> {
    pub track: Option<&'a Track>,
    /// Pond centre and radius in map pixels; gets a muddy shore.
    pub pond: Option<(Vec2, f32)>,
    pub map_size: f32,
}

/// Procedural texture generator
pub struct TextureGenerator {
    perlin: Perlin,
    rng: StdRng,
}

impl TextureGenerator {
    pub fn new(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        Self {
            perlin: Perlin::new(rng.gen()),
            rng,
        }
    }

    fn surface(&mut self, size: u32, base: Vec3, dark: Vec3, scale: f64, grain: f32) -> TextureData {
        let mut texture = TextureData::new(size, size);
        for y in 0..size {
            for x in 0..size {
                let u = x as f64 / size as f64;
                let v = y as f64 / size as f64;
                let blotch = self.tileable_fbm(u, v, scale, 4) as f32;
                let noise: f32 = self.rng.gen_range(-grain..=grain);
                let color = dark.lerp(base, blotch) * (1.0 + noise);
                texture.set_pixel(x, y, Pixel::from_rgb(color.x, color.y, color.z));
            }
        }
        texture
    }

    pub fn grass(&mut self, size: u32) -> TextureData {
        self.surface(size, Vec3::new(0.36, 0.55, 0.2), Vec3::new(0.18, 0.34, 0.1), 6.0, 0.08)
    }

    pub fn road(&mut self, size: u32) -> TextureData {
        self.surface(size, Vec3::new(0.42, 0.41, 0.4), Vec3::new(0.28, 0.27, 0.27), 12.0, 0.12)
    }

    pub fn dirt(&mut self, size: u32) -> TextureData {
        self.surface(size, Vec3::new(0.58, 0.45, 0.3), Vec3::new(0.4, 0.3, 0.19), 8.0, 0.1)
    }

    pub fn mud(&mut self, size: u32) -> TextureData {
        self.surface(size, Vec3::new(0.33, 0.25, 0.17), Vec3::new(0.2, 0.15, 0.1), 5.0, 0.05)
    }

    /// Blend map: red = road, green = dirt, blue = mud, remainder = grass.
    pub fn blend_map(&mut self, resolution: u32, layout: &BlendLayout) -> TextureData {
        let mut texture = TextureData::new(resolution, resolution);
        let grid = PixelGrid::texels(resolution, layout.map_size);
        let road_field = layout.track.map(|track| (track, track.stamp(grid, track.half_width() * 2.0)));

        for y in 0..resolution {
            for x in 0..resolution {
                let p = grid.point(x, y);
                let u = x as f64 / resolution as f64;
                let v = y as f64 / resolution as f64;

                let mut road = 0.0;
                let mut dirt = smooth_step(0.62, 0.75, self.tileable_fbm(u, v, 5.0, 3) as f32) * 0.7;
                let mut mud = 0.0;

                if let Some((track, field)) = &road_field {
                    if let Some(hit) = field[(y * resolution + x) as usize] {
                        let hw = track.half_width();
                        road = 1.0 - smooth_step(hw * 0.8, hw, hit.distance);
                        let shoulder = 1.0 - smooth_step(hw, hw * 1.8, hit.distance);
                        dirt = dirt.max(shoulder * (1.0 - road));
                    }
                }
                if let Some((center, radius)) = layout.pond {
                    let d = p.distance(center) / radius;
                    mud = 1.0 - smooth_step(1.0, 1.5, d);
                }

                let total = road + dirt + mud;
                if total > 1.0 {
                    road /= total;
                    dirt /= total;
                    mud /= total;
                }
                texture.set_pixel(x, y, Pixel::from_rgb(road, dirt, mud));
            }
        }
        texture
    }

    /// Soft round dust puff with alpha falloff.
    pub fn dust(&mut self, size: u32) -> TextureData {
        let mut texture = TextureData::new(size, size);
        let c = size as f32 / 2.0;
        for y in 0..size {
            for x in 0..size {
                let d = Vec2::new(x as f32 + 0.5 - c, y as f32 + 0.5 - c).length() / c;
                let noise = self.perlin.get([x as f64 * 0.2, y as f64 * 0.2]) as f32;
                let alpha = (1.0 - smooth_step(0.3, 1.0, d)) * (0.75 + 0.25 * noise);
                texture.set_pixel(x, y, Pixel::from_rgba(0.62, 0.53, 0.4, alpha));
            }
        }
        texture
    }

    /// One face of a gradient sky cube with a sun disc towards `sun`.
    pub fn sky_face(&self, face: usize, size: u32, sun: Vec3) -> TextureData {
        let mut texture = TextureData::new(size, size);
        let sun = sun.normalize_or(Vec3::Y);
        let zenith = Vec3::new(0.22, 0.42, 0.78);
        let horizon = Vec3::new(0.72, 0.82, 0.93);
        let ground = Vec3::new(0.5, 0.55, 0.56);
        for y in 0..size {
            for x in 0..size {
                let dir = cube_face_direction(face, x, y, size);
                let mut color = if dir.y >= 0.0 {
                    horizon.lerp(zenith, dir.y.sqrt())
                } else {
                    horizon.lerp(ground, (-dir.y * 4.0).min(1.0))
                };
                let facing = dir.dot(sun).max(0.0);
                color += Vec3::new(1.0, 0.9, 0.7) * facing.powf(64.0) * 0.6;
                if facing > 0.9992 {
                    color = Vec3::new(1.0, 0.98, 0.9);
                }
                texture.set_pixel(x, y, Pixel::from_rgb(color.x, color.y, color.z));
            }
        }
        texture
    }

    /// Periodic fBm in `[0, 1]` so repeated textures have no seams.
    fn tileable_fbm(&self, u: f64, v: f64, scale: f64, octaves: u32) -> f64 {
        use std::f64::consts::TAU;
        let mut value = 0.0;
        let mut amplitude = 0.5;
        let mut radius = scale / TAU;
        for _ in 0..octaves {
            let (su, cu) = (u * TAU).sin_cos();
            let (sv, cv) = (v * TAU).sin_cos();
            let sample = self.perlin.get([cu * radius, su * radius, cv * radius + sv * radius * 0.5]);
            value += amplitude * (sample * 0.5 + 0.5);
            amplitude *= 0.5;
            radius *= 2.0;
        }
        (value / (1.0 - amplitude * 2.0).max(0.5)).clamp(0.0, 1.0)
    }
}

fn smooth_step(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TrackConfig;

    #[test]
    fn cube_faces_point_outward() {
        let axes = [Vec3::X, -Vec3::X, Vec3::Y, -Vec3::Y, Vec3::Z, -Vec3::Z];
        for (face, axis) in axes.iter().enumerate() {
            let centre = cube_face_direction(face, 8, 8, 17);
            assert!(centre.dot(*axis) > 0.99, "face {face}");
        }
    }

    #[test]
    fn blend_map_marks_the_road_red() {
        let track = Track::generate(&TrackConfig::default());
        let mut generator = TextureGenerator::new(3);
        let layout = BlendLayout { track: Some(&track), pond: None, map_size: 1024.0 };
        let blend = generator.blend_map(128, &layout);
        // Texel under the first centreline point.
        let p = track.points()[0] / 1024.0 * 128.0;
        let px = blend.get_pixel(p.x as u32, p.y as u32);
        assert!(px.r > 200, "road weight {}", px.r);
        // Map centre is infield, far from the road.
        assert_eq!(blend.get_pixel(64, 64).r, 0);
    }
}
