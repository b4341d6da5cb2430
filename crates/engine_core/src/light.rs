//! Light sources.

use glam::{Vec3, Vec4};
use serde::{Deserialize, Serialize};

/// Spot-light cone.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cone {
    /// Direction the cone points in (world space, normalized on use).
    pub direction: Vec3,
    /// Half-angle of the cone in radians.
    pub angle: f32,
    /// Distance at which attenuation reaches zero.
    pub radius: f32,
}

/// A light source.
///
/// `position.w == 0` marks a directional light whose xyz is the direction
/// *towards* the light; `w == 1` is a positional light.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub position: Vec4,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular: Vec3,
    #[serde(default)]
    pub cone: Option<Cone>,
}

impl Light {
    /// Directional light shining from `towards_light` (need not be normalized).
    pub fn directional(towards_light: Vec3, ambient: f32, diffuse: f32, specular: f32) -> Self {
        Self {
            position: towards_light.extend(0.0),
            ambient: Vec3::splat(ambient),
            diffuse: Vec3::splat(diffuse),
            specular: Vec3::splat(specular),
            cone: None,
        }
    }

    /// Positional spot light.
    pub fn spot(position: Vec3, color: Vec3, cone: Cone) -> Self {
        Self {
            position: position.extend(1.0),
            ambient: Vec3::ZERO,
            diffuse: color,
            specular: color,
            cone: Some(cone),
        }
    }

    pub fn is_directional(&self) -> bool {
        self.position.w == 0.0
    }

    /// Normalized direction from the scene towards a directional light.
    pub fn direction(&self) -> Vec3 {
        self.position.truncate().normalize_or(Vec3::Y)
    }

    /// Move a positional light, keeping `w`.
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position.extend(self.position.w);
    }

    /// Re-aim the cone of a spot light; no-op for lights without a cone.
    pub fn set_cone_direction(&mut self, direction: Vec3) {
        if let Some(cone) = self.cone.as_mut() {
            cone.direction = direction;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn moving_a_spot_keeps_it_positional() {
        let mut light = Light::spot(
            Vec3::ZERO,
            Vec3::ONE,
            Cone { direction: -Vec3::Y, angle: 0.5, radius: 10.0 },
        );
        light.set_position(Vec3::new(1.0, 2.0, 3.0));
        light.set_cone_direction(Vec3::Z);
        assert!(!light.is_directional());
        assert_eq!(light.cone.map(|c| c.direction), Some(Vec3::Z));
    }
}
