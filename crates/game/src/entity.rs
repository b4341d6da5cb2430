//! Placed instances of a model.

use engine_core::{Quat, Transform, Vec3};
use renderer::{Drawable, ModelId};

/// A model placed in the world.
#[derive(Debug, Clone)]
pub struct Entity {
    pub model: ModelId,
    pub transform: Transform,
    /// Model-space bounds of the referenced model.
    pub bounds: (Vec3, Vec3),
    pub casts_shadow: bool,
}

impl Entity {
    pub fn new(model: ModelId, bounds: (Vec3, Vec3)) -> Self {
        Self {
            model,
            transform: Transform::default(),
            bounds,
            casts_shadow: true,
        }
    }

    pub fn at(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn scaled(mut self, scale: f32) -> Self {
        self.transform.scale = Vec3::splat(scale);
        self
    }

    pub fn rotated_y(mut self, angle: f32) -> Self {
        self.transform.rotate_y(angle);
        self
    }

    pub fn position(&self) -> Vec3 {
        self.transform.position
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.transform.rotation = rotation;
    }

    /// Lift or sink the entity so the bottom of its bounds rests at `height`.
    pub fn place_bottom_edge(&mut self, height: f32) {
        self.transform.position.y = height - self.bounds.0.y * self.transform.scale.y;
    }

    /// Size of the scaled bounds.
    pub fn extent(&self) -> Vec3 {
        (self.bounds.1 - self.bounds.0) * self.transform.scale
    }
}

impl Drawable for Entity {
    fn model_id(&self) -> ModelId {
        self.model
    }

    fn model_matrix(&self) -> engine_core::Mat4 {
        self.transform.to_matrix()
    }

    fn casts_shadow(&self) -> bool {
        self.casts_shadow
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terrain::Terrain;

    #[test]
    fn bottom_edge_rests_on_flat_ground() {
        let terrain = Terrain::flat(100.0, 33).unwrap();
        assert_eq!(terrain.get_height(0.0, 0.0), 0.0);

        // Box spanning y in [-1, 3], scaled by a half.
        let mut entity = Entity::new(ModelId(0), (Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 3.0, 1.0))).scaled(0.5);
        entity.place_bottom_edge(terrain.get_height(0.0, 0.0));
        assert_eq!(entity.position().y, 0.5);

        let lowest = entity.model_matrix().transform_point3(entity.bounds.0);
        assert!(lowest.y.abs() < 1e-6);
    }

    #[test]
    fn model_with_base_at_origin_sits_at_ground_height() {
        let mut entity = Entity::new(ModelId(1), (Vec3::new(-0.5, 0.0, -0.5), Vec3::new(0.5, 2.0, 0.5)))
            .at(Vec3::new(3.0, 10.0, 4.0));
        entity.place_bottom_edge(0.0);
        assert_eq!(entity.position(), Vec3::new(3.0, 0.0, 4.0));
        assert_eq!(entity.extent(), Vec3::new(1.0, 2.0, 1.0));
    }
}
