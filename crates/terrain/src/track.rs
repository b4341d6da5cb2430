//! Procedural race loop.
//!
//! The track lives in map pixel space (the same space as the blend map and
//! `Terrain::position_from_pixel`): pixel x runs along world +X, pixel y
//! along world +Z.

use std::f32::consts::TAU;

use glam::Vec2;
use rand::prelude::*;

#[derive(Debug, Clone)]
pub struct TrackConfig {
    /// Loop centre in map pixels.
    pub center: Vec2,
    /// Base radii of the loop along x and y.
    pub radius: Vec2,
    /// Relative radius variation (0 = plain ellipse).
    pub wobble: f32,
    /// Half the road width in map pixels.
    pub half_width: f32,
    /// Centreline sample count.
    pub samples: usize,
    pub seed: u64,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            center: Vec2::splat(512.0),
            radius: Vec2::new(340.0, 290.0),
            wobble: 0.16,
            half_width: 16.0,
            samples: 360,
            seed: 0,
        }
    }
}

/// Lattice of sample points in map pixel space: `offset + index * step`.
#[derive(Debug, Clone, Copy)]
pub struct PixelGrid {
    pub cols: u32,
    pub rows: u32,
    pub step: f32,
    pub offset: f32,
}

impl PixelGrid {
    /// Grid of heightfield vertices covering `[0, map_size]`.
    pub fn vertices(resolution: u32, map_size: f32) -> Self {
        Self {
            cols: resolution,
            rows: resolution,
            step: map_size / (resolution - 1).max(1) as f32,
            offset: 0.0,
        }
    }

    /// Grid of texel centres for a `resolution`² texture covering the map.
    pub fn texels(resolution: u32, map_size: f32) -> Self {
        let step = map_size / resolution.max(1) as f32;
        Self {
            cols: resolution,
            rows: resolution,
            step,
            offset: step * 0.5,
        }
    }

    pub fn point(&self, col: u32, row: u32) -> Vec2 {
        Vec2::new(
            self.offset + col as f32 * self.step,
            self.offset + row as f32 * self.step,
        )
    }
}

/// Nearest centreline hit for one grid cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackHit {
    /// Distance to the centreline in map pixels.
    pub distance: f32,
    /// Index of the segment start point.
    pub segment: usize,
}

/// Closed centreline loop.
#[derive(Debug, Clone)]
pub struct Track {
    points: Vec<Vec2>,
    half_width: f32,
}

fn segment_distance(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let t = if ab.length_squared() > 0.0 {
        ((p - a).dot(ab) / ab.length_squared()).clamp(0.0, 1.0)
    } else {
        0.0
    };
    p.distance(a + ab * t)
}

impl Track {
    pub fn generate(config: &TrackConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let phases: [f32; 4] = [rng.gen::<f32>() * TAU, rng.gen::<f32>() * TAU, rng.gen::<f32>() * TAU, rng.gen::<f32>() * TAU];

        let samples = config.samples.max(8);
        let points = (0..samples)
            .map(|i| {
                let theta = TAU * i as f32 / samples as f32;
                let wobble_x = 0.6 * (3.0 * theta + phases[0]).sin() + 0.4 * (5.0 * theta + phases[1]).sin();
                let wobble_y = 0.6 * (2.0 * theta + phases[2]).sin() + 0.4 * (4.0 * theta + phases[3]).sin();
                let rx = config.radius.x * (1.0 + config.wobble * wobble_x);
                let ry = config.radius.y * (1.0 + config.wobble * wobble_y);
                config.center + Vec2::new(theta.cos() * rx, theta.sin() * ry)
            })
            .collect();

        Self {
            points,
            half_width: config.half_width,
        }
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn half_width(&self) -> f32 {
        self.half_width
    }

    fn point(&self, i: isize) -> Vec2 {
        let n = self.points.len() as isize;
        self.points[i.rem_euclid(n) as usize]
    }

    fn tangent(&self, i: isize) -> Vec2 {
        (self.point(i + 1) - self.point(i - 1)).normalize_or_zero()
    }

    /// Starting pixel and the yaw that faces along the loop.
    pub fn start(&self) -> (Vec2, f32) {
        let t = self.tangent(0);
        (self.points[0], t.x.atan2(t.y))
    }

    /// Distance from `p` to the centreline, map pixels.
    pub fn distance_to(&self, p: Vec2) -> f32 {
        (0..self.points.len() as isize)
            .map(|i| segment_distance(p, self.point(i), self.point(i + 1)))
            .fold(f32::MAX, f32::min)
    }

    /// Nearest-segment field over `grid`, limited to cells within `reach`
    /// pixels of the centreline. Each segment only visits the cells in its
    /// padded bounding box.
    pub fn stamp(&self, grid: PixelGrid, reach: f32) -> Vec<Option<TrackHit>> {
        let mut field: Vec<Option<TrackHit>> = vec![None; (grid.cols * grid.rows) as usize];
        if grid.step <= 0.0 {
            return field;
        }
        let to_index = |v: f32, max: u32| (((v - grid.offset) / grid.step).max(0.0) as u32).min(max.saturating_sub(1));

        for i in 0..self.points.len() {
            let a = self.point(i as isize);
            let b = self.point(i as isize + 1);
            let lo = a.min(b) - Vec2::splat(reach);
            let hi = a.max(b) + Vec2::splat(reach);
            let (c0, c1) = (to_index(lo.x, grid.cols), to_index(hi.x + grid.step, grid.cols));
            let (r0, r1) = (to_index(lo.y, grid.rows), to_index(hi.y + grid.step, grid.rows));
            for row in r0..=r1 {
                for col in c0..=c1 {
                    let d = segment_distance(grid.point(col, row), a, b);
                    if d > reach {
                        continue;
                    }
                    let cell = &mut field[(row * grid.cols + col) as usize];
                    if cell.map_or(true, |hit| d < hit.distance) {
                        *cell = Some(TrackHit { distance: d, segment: i });
                    }
                }
            }
        }
        field
    }

    /// Cone positions at the sharpest corners, on the inside of each turn.
    pub fn cones(&self, count: usize) -> Vec<Vec2> {
        let n = self.points.len() as isize;
        let span = (n / 40).max(1);
        let turning: Vec<(usize, f32)> = (0..n)
            .map(|i| {
                let before = self.tangent(i - span);
                let after = self.tangent(i + span);
                (i as usize, before.angle_to(after).abs())
            })
            .collect();

        let mut ranked = turning.clone();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        let min_gap = (n as usize / (2 * count.max(1))).max(1);
        let mut chosen: Vec<usize> = Vec::new();
        for (i, _) in ranked {
            if chosen.len() >= count {
                break;
            }
            let far_enough = chosen.iter().all(|&c| {
                let d = c.abs_diff(i);
                d.min(n as usize - d) >= min_gap
            });
            if far_enough {
                chosen.push(i);
            }
        }

        chosen
            .into_iter()
            .map(|i| {
                let i = i as isize;
                let inward = (self.tangent(i + span) - self.tangent(i - span)).normalize_or_zero();
                self.point(i) + inward * self.half_width * 0.6
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cones_sit_on_the_road() {
        let track = Track::generate(&TrackConfig { seed: 7, ..Default::default() });
        let cones = track.cones(12);
        assert_eq!(cones.len(), 12);
        for cone in cones {
            assert!(track.distance_to(cone) <= track.half_width(), "cone {cone} off the road");
        }
    }

    #[test]
    fn start_faces_along_the_loop() {
        let track = Track::generate(&TrackConfig::default());
        let (start, yaw) = track.start();
        let ahead = start + Vec2::new(yaw.sin(), yaw.cos()) * 5.0;
        assert!(track.distance_to(ahead) < 1.0);
        let next = track.points()[1];
        assert!((next - start).dot(Vec2::new(yaw.sin(), yaw.cos())) > 0.0);
    }

    #[test]
    fn stamp_agrees_with_brute_force() {
        let track = Track::generate(&TrackConfig::default());
        let grid = PixelGrid::texels(64, 1024.0);
        let field = track.stamp(grid, 40.0);
        for row in (0..64).step_by(7) {
            for col in (0..64).step_by(5) {
                let p = grid.point(col, row);
                let exact = track.distance_to(p);
                match field[(row * 64 + col) as usize] {
                    Some(hit) => assert!((hit.distance - exact).abs() < 1e-3),
                    None => assert!(exact > 40.0 - 1e-3),
                }
            }
        }
    }
}
