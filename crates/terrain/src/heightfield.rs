//! Square grids of terrain heights.

use std::path::Path;

use noise::{NoiseFn, Perlin, Simplex};

use crate::TerrainError;

/// Derive a deterministic u32 noise seed from a world seed and an offset.
#[inline]
pub(crate) fn deterministic_noise_seed(seed: u64, offset: u64) -> u32 {
    ((seed.wrapping_add(offset))
        .wrapping_mul(0x9e3779b97f4a7c15_u64)
        .wrapping_add(offset.wrapping_mul(0x6c078965_u64))
        >> 32) as u32
}

/// Fractal noise parameters for procedural heights.
#[derive(Debug, Clone)]
pub struct NoiseConfig {
    /// Noise frequency per grid sample (lower = smoother).
    pub frequency: f64,
    pub octaves: u32,
    pub lacunarity: f64,
    pub persistence: f64,
    pub seed: u64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            frequency: 0.012,
            octaves: 4,
            lacunarity: 2.0,
            persistence: 0.5,
            seed: 0,
        }
    }
}

/// Row-major `resolution × resolution` heights; row index is the z axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Heightfield {
    resolution: u32,
    heights: Vec<f32>,
}

impl Heightfield {
    /// A flat field at height 0.
    pub fn flat(resolution: u32) -> Result<Self, TerrainError> {
        if resolution < 2 {
            return Err(TerrainError::Resolution(resolution));
        }
        Ok(Self {
            resolution,
            heights: vec![0.0; (resolution * resolution) as usize],
        })
    }

    /// Build from raw samples. `heights.len()` must be a square of at least 4.
    pub fn from_heights(heights: Vec<f32>) -> Result<Self, TerrainError> {
        let resolution = (heights.len() as f64).sqrt() as u32;
        if resolution < 2 || (resolution * resolution) as usize != heights.len() {
            return Err(TerrainError::Resolution(resolution));
        }
        Ok(Self { resolution, heights })
    }

    /// Load a grayscale heightmap. Black is 0, white is `max_height`.
    pub fn from_image(path: &Path, max_height: f32) -> Result<Self, TerrainError> {
        let img = image::open(path)
            .map_err(|source| TerrainError::Image { path: path.to_path_buf(), source })?
            .to_luma16();
        let (width, height) = img.dimensions();
        if width != height {
            return Err(TerrainError::NotSquare { path: path.to_path_buf(), width, height });
        }
        let heights = img
            .pixels()
            .map(|p| p.0[0] as f32 / u16::MAX as f32 * max_height)
            .collect();
        let field = Self::from_heights(heights)?;
        log::info!("Loaded heightmap {:?} ({}x{})", path, width, height);
        Ok(field)
    }

    /// Fractal Perlin/Simplex heights in `[0, max_height]`.
    pub fn generate(resolution: u32, max_height: f32, noise: &NoiseConfig) -> Result<Self, TerrainError> {
        let mut field = Self::flat(resolution)?;
        let perlin = Perlin::new(deterministic_noise_seed(noise.seed, 0));
        let simplex = Simplex::new(deterministic_noise_seed(noise.seed, 1));
        for z in 0..resolution {
            for x in 0..resolution {
                let h = fractal_noise(&perlin, &simplex, x as f64, z as f64, noise);
                field.set(x, z, h as f32 * max_height);
            }
        }
        Ok(field)
    }

    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    /// Height at grid sample `(x, z)`; indices are clamped to the grid.
    pub fn get(&self, x: u32, z: u32) -> f32 {
        let last = self.resolution - 1;
        let (x, z) = (x.min(last), z.min(last));
        self.heights[(z * self.resolution + x) as usize]
    }

    pub fn set(&mut self, x: u32, z: u32, height: f32) {
        if x < self.resolution && z < self.resolution {
            self.heights[(z * self.resolution + x) as usize] = height;
        }
    }

    /// Bilinear interpolation at fractional grid coordinates, clamped to the grid.
    pub fn sample(&self, gx: f32, gz: f32) -> f32 {
        let last = (self.resolution - 1) as f32;
        let gx = gx.clamp(0.0, last);
        let gz = gz.clamp(0.0, last);
        let x0 = (gx.floor() as u32).min(self.resolution - 2);
        let z0 = (gz.floor() as u32).min(self.resolution - 2);
        let fx = gx - x0 as f32;
        let fz = gz - z0 as f32;

        let h00 = self.get(x0, z0);
        let h10 = self.get(x0 + 1, z0);
        let h01 = self.get(x0, z0 + 1);
        let h11 = self.get(x0 + 1, z0 + 1);

        let near = h00 + (h10 - h00) * fx;
        let far = h01 + (h11 - h01) * fx;
        near + (far - near) * fz
    }

    pub fn min_max(&self) -> (f32, f32) {
        self.heights
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), &h| (lo.min(h), hi.max(h)))
    }

    /// Largest height difference between neighbouring samples.
    pub fn max_step(&self) -> f32 {
        let mut step = 0.0f32;
        for z in 0..self.resolution {
            for x in 0..self.resolution {
                let h = self.get(x, z);
                if x + 1 < self.resolution {
                    step = step.max((self.get(x + 1, z) - h).abs());
                }
                if z + 1 < self.resolution {
                    step = step.max((self.get(x, z + 1) - h).abs());
                }
            }
        }
        step
    }
}

/// Normalized to `[0, 1]`.
fn fractal_noise(perlin: &Perlin, simplex: &Simplex, x: f64, z: f64, config: &NoiseConfig) -> f64 {
    let mut value = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = config.frequency;
    let mut max_value = 0.0;

    for _ in 0..config.octaves {
        let perlin_sample = perlin.get([x * frequency, z * frequency]);
        let simplex_sample = simplex.get([x * frequency + 1000.0, z * frequency + 1000.0]);

        value += (perlin_sample * 0.7 + simplex_sample * 0.3) * amplitude;
        max_value += amplitude;

        amplitude *= config.persistence;
        frequency *= config.lacunarity;
    }

    ((value / max_value + 1.0) * 0.5).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Same seed must produce identical heights.
    #[test]
    fn generation_is_deterministic() {
        let noise = NoiseConfig { seed: 98765, ..Default::default() };
        let a = Heightfield::generate(33, 10.0, &noise).unwrap();
        let b = Heightfield::generate(33, 10.0, &noise).unwrap();
        assert_eq!(a, b);
        let other = Heightfield::generate(33, 10.0, &NoiseConfig { seed: 1, ..noise }).unwrap();
        assert_ne!(a, other);
    }

    #[test]
    fn generated_heights_stay_in_range() {
        let field = Heightfield::generate(33, 12.0, &NoiseConfig::default()).unwrap();
        let (lo, hi) = field.min_max();
        assert!(lo >= 0.0 && hi <= 12.0);
    }

    #[test]
    fn sample_hits_grid_values_exactly() {
        let field = Heightfield::from_heights(vec![0.0, 1.0, 2.0, 3.0]).unwrap();
        assert_eq!(field.sample(0.0, 0.0), 0.0);
        assert_eq!(field.sample(1.0, 0.0), 1.0);
        assert_eq!(field.sample(0.0, 1.0), 2.0);
        assert_eq!(field.sample(1.0, 1.0), 3.0);
        assert_eq!(field.sample(0.5, 0.5), 1.5);
        // Out of range clamps to the border.
        assert_eq!(field.sample(-4.0, 9.0), 2.0);
    }

    #[test]
    fn rejects_degenerate_sizes() {
        assert!(Heightfield::flat(1).is_err());
        assert!(Heightfield::from_heights(vec![0.0; 5]).is_err());
    }
}
