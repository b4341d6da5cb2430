//! Dust kicked up behind the car.

use glam::{Vec3, Vec4};
use rand::prelude::*;
use renderer::ParticleInstance;

const GRAVITY: f32 = -9.81;

/// A single billboard particle.
#[derive(Debug, Clone)]
pub struct Particle {
    pub position: Vec3,
    pub velocity: Vec3,
    /// Multiplier on world gravity.
    pub gravity_effect: f32,
    pub life_length: f32,
    pub size: f32,
    pub elapsed: f32,
}

impl Particle {
    /// Step the particle. Returns `false` once it has expired.
    pub fn update(&mut self, dt: f32) -> bool {
        self.velocity.y += GRAVITY * self.gravity_effect * dt;
        self.position += self.velocity * dt;
        self.elapsed += dt;
        self.elapsed < self.life_length
    }

    /// Fraction of the lifetime used, in `[0, 1]`.
    pub fn age(&self) -> f32 {
        (self.elapsed / self.life_length.max(f32::EPSILON)).clamp(0.0, 1.0)
    }
}

/// Owns every live particle.
#[derive(Debug, Default)]
pub struct ParticleManager {
    particles: Vec<Particle>,
}

impl ParticleManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, particle: Particle) {
        self.particles.push(particle);
    }

    /// Advance all particles and drop the expired ones.
    pub fn update(&mut self, dt: f32) {
        self.particles.retain_mut(|p| p.update(dt));
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// Instances sorted back to front from `eye` for alpha blending. Particles
    /// grow and fade out with age.
    pub fn instances(&self, eye: Vec3) -> Vec<ParticleInstance> {
        let mut sorted: Vec<&Particle> = self.particles.iter().collect();
        sorted.sort_by(|a, b| b.position.distance_squared(eye).total_cmp(&a.position.distance_squared(eye)));
        sorted
            .into_iter()
            .map(|p| {
                let age = p.age();
                ParticleInstance {
                    position_size: p.position.extend(p.size * (1.0 + age)).to_array(),
                    color: Vec4::new(1.0, 1.0, 1.0, 1.0 - age).to_array(),
                }
            })
            .collect()
    }
}

/// Continuous emitter: `pps` particles per second at `speed`.
#[derive(Debug)]
pub struct ParticleSystem {
    pub pps: f32,
    pub speed: f32,
    pub gravity: f32,
    pub life_length: f32,
    pub size: f32,
    /// Fractional particle carried to the next frame.
    pending: f32,
    rng: StdRng,
}

impl ParticleSystem {
    pub fn new(pps: f32, speed: f32, gravity: f32, life_length: f32, seed: u64) -> Self {
        Self {
            pps,
            speed,
            gravity,
            life_length,
            size: 0.6,
            pending: 0.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Emit this frame's share of particles at `center`.
    pub fn generate_particles(&mut self, center: Vec3, dt: f32, manager: &mut ParticleManager) {
        self.pending += self.pps * dt;
        let count = self.pending.floor();
        self.pending -= count;
        for _ in 0..count as u32 {
            let particle = self.emit(center);
            manager.add(particle);
        }
    }

    fn emit(&mut self, center: Vec3) -> Particle {
        // Upper hemisphere, biased upwards.
        let angle = self.rng.gen::<f32>() * std::f32::consts::TAU;
        let rise = self.rng.gen_range(0.3f32..1.0);
        let flat = (1.0 - rise * rise).sqrt();
        let direction = Vec3::new(angle.cos() * flat, rise, angle.sin() * flat);
        Particle {
            position: center,
            velocity: direction * self.speed,
            gravity_effect: self.gravity,
            life_length: self.life_length * self.rng.gen_range(0.8..1.2),
            size: self.size,
            elapsed: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dust() -> ParticleSystem {
        ParticleSystem::new(30.0, 3.0, 0.5, 0.5, 11)
    }

    #[test]
    fn emission_rate_follows_pps() {
        let mut system = dust();
        let mut manager = ParticleManager::new();
        for _ in 0..10 {
            system.generate_particles(Vec3::ZERO, 1.0 / 30.0, &mut manager);
        }
        assert_eq!(manager.len(), 10);
        // Below one particle per frame the remainder carries over.
        let mut slow = dust();
        let mut manager = ParticleManager::new();
        slow.generate_particles(Vec3::ZERO, 0.02, &mut manager);
        assert!(manager.is_empty());
        slow.generate_particles(Vec3::ZERO, 0.02, &mut manager);
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn particles_expire() {
        let mut system = dust();
        let mut manager = ParticleManager::new();
        system.generate_particles(Vec3::ZERO, 1.0, &mut manager);
        assert_eq!(manager.len(), 30);
        manager.update(0.3);
        assert_eq!(manager.len(), 30);
        // Longest possible life is 1.2 * 0.5 s.
        manager.update(0.31);
        assert!(manager.is_empty());
    }

    #[test]
    fn instances_are_sorted_far_to_near_and_fade() {
        let mut manager = ParticleManager::new();
        for (z, elapsed) in [(1.0, 0.0), (5.0, 0.25), (3.0, 0.0)] {
            manager.add(Particle {
                position: Vec3::new(0.0, 0.0, z),
                velocity: Vec3::ZERO,
                gravity_effect: 0.0,
                life_length: 0.5,
                size: 1.0,
                elapsed,
            });
        }
        let instances = manager.instances(Vec3::ZERO);
        let depths: Vec<f32> = instances.iter().map(|i| i.position_size[2]).collect();
        assert_eq!(depths, vec![5.0, 3.0, 1.0]);
        assert_eq!(instances[0].color[3], 0.5);
        assert_eq!(instances[0].position_size[3], 1.5);
        assert_eq!(instances[2].color[3], 1.0);
    }
}
