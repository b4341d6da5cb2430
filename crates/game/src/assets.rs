//! World content: models, terrain and textures, loaded from configured files
//! or generated when no file is configured.

use std::f32::consts::FRAC_PI_2;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use glam::{Mat4, Vec2, Vec3};
use renderer::{Material, MeshData, ModelData};
use terrain::{Terrain, TerrainConfig, TextureData, TextureGenerator, Track};

use crate::config::{AssetPaths, GameConfig};

const SKY_FACE_SIZE: u32 = 256;
const DUST_SIZE: u32 = 64;

/// CPU-side models of every prop type.
pub struct ModelLibrary {
    pub car: ModelData,
    pub tree: ModelData,
    pub stump: ModelData,
    pub cone: ModelData,
    pub fence: ModelData,
}

/// Everything loaded before the GPU is involved.
pub struct World {
    pub terrain: Terrain,
    /// Present when the terrain was generated.
    pub track: Option<Track>,
    pub terrain_config: TerrainConfig,
    pub sky_faces: [TextureData; 6],
    pub dust: TextureData,
    pub models: ModelLibrary,
}

/// Direction towards the sun, shared by the sky texture and the sun light.
pub const SUN_DIRECTION: Vec3 = Vec3::new(-25.0, 50.0, 60.0);

pub fn load_world(config: &GameConfig, seed: u64) -> Result<World> {
    let assets = &config.assets;
    let terrain_config = TerrainConfig::default().with_seed(seed);
    let (terrain, track) = load_terrain(assets, &terrain_config)?;
    let mut generator = TextureGenerator::new(seed);

    let sky_faces = match &assets.skybox {
        Some(paths) => load_faces(paths)?,
        None => [0, 1, 2, 3, 4, 5].map(|face| generator.sky_face(face, SKY_FACE_SIZE, SUN_DIRECTION)),
    };
    let dust = match &assets.dust {
        Some(path) => load_texture(path)?,
        None => generator.dust(DUST_SIZE),
    };
    let models = ModelLibrary {
        car: load_model(assets.car.as_deref(), car_model)?,
        tree: load_model(assets.tree.as_deref(), tree_model)?,
        stump: load_model(assets.stump.as_deref(), stump_model)?,
        cone: load_model(assets.cone.as_deref(), cone_model)?,
        fence: load_model(assets.fence.as_deref(), fence_model)?,
    };

    Ok(World {
        terrain,
        track,
        terrain_config,
        sky_faces,
        dust,
        models,
    })
}

fn load_terrain(assets: &AssetPaths, config: &TerrainConfig) -> Result<(Terrain, Option<Track>)> {
    match (&assets.heightmap, &assets.terrain_textures) {
        (Some(heightmap), Some(textures)) => {
            let terrain = Terrain::from_files(config, heightmap, textures.each_ref().map(|p| p.as_path()))
                .with_context(|| format!("Failed to load terrain from {}", heightmap.display()))?;
            log::info!("Loaded terrain heightmap {}", heightmap.display());
            Ok((terrain, None))
        }
        (Some(_), None) => bail!("assets.heightmap needs assets.terrain_textures as well"),
        (None, _) => {
            let generated = Terrain::generate(config)?;
            Ok((generated.terrain, Some(generated.track)))
        }
    }
}

fn load_texture(path: &Path) -> Result<TextureData> {
    TextureData::load(path).with_context(|| format!("Failed to load texture {}", path.display()))
}

fn load_faces(paths: &[std::path::PathBuf; 6]) -> Result<[TextureData; 6]> {
    let faces = paths.iter().map(|p| load_texture(p)).collect::<Result<Vec<_>>>()?;
    faces.try_into().map_err(|_| anyhow!("Sky box needs exactly six faces"))
}

fn load_model(path: Option<&Path>, generate: fn() -> ModelData) -> Result<ModelData> {
    match path {
        Some(path) => {
            let model = ModelData::load_obj(path).with_context(|| format!("Failed to load model {}", path.display()))?;
            if model.bounds().is_none() {
                bail!("Model {} has no geometry", path.display());
            }
            log::info!("Loaded model {} ({} components)", path.display(), model.components.len());
            Ok(model)
        }
        None => Ok(generate()),
    }
}

fn rgb(r: u8, g: u8, b: u8) -> Vec3 {
    Vec3::new(r as f32, g as f32, b as f32) / 255.0
}

/// Procedural models face +Z with their base at y = 0.
pub fn car_model() -> ModelData {
    let body = MeshData::cuboid(Vec3::new(1.8, 0.6, 4.0)).transformed(Mat4::from_translation(Vec3::new(0.0, 0.65, 0.0)));
    let cabin = MeshData::cuboid(Vec3::new(1.5, 0.5, 2.0)).transformed(Mat4::from_translation(Vec3::new(0.0, 1.2, -0.3)));
    let wheel = |x: f32, z: f32| {
        MeshData::cylinder(0.35, 0.3, 14)
            .transformed(Mat4::from_translation(Vec3::new(x, 0.35, z)) * Mat4::from_rotation_z(FRAC_PI_2) * Mat4::from_translation(Vec3::new(0.0, -0.15, 0.0)))
    };
    let wheels = wheel(-0.85, 1.3).merge(wheel(0.85, 1.3)).merge(wheel(-0.85, -1.3)).merge(wheel(0.85, -1.3));
    let lamp = |x: f32| MeshData::cuboid(Vec3::new(0.35, 0.15, 0.05)).transformed(Mat4::from_translation(Vec3::new(x, 0.75, 1.97)));

    ModelData::new("car")
        .with_component(body, Material::color(rgb(178, 34, 34)).shiny(0.9, 64.0))
        .with_component(cabin, Material::color(rgb(40, 50, 60)).shiny(1.0, 128.0))
        .with_component(wheels, Material::color(Vec3::splat(0.08)).shiny(0.1, 8.0))
        .with_component(
            lamp(-0.6).merge(lamp(0.6)),
            Material {
                emission: 1.0,
                ..Material::color(rgb(255, 250, 210))
            },
        )
}

pub fn tree_model() -> ModelData {
    let trunk = MeshData::cylinder(0.25, 2.0, 8);
    let foliage = MeshData::cone(1.6, 3.0, 10)
        .transformed(Mat4::from_translation(Vec3::Y * 1.5))
        .merge(MeshData::cone(1.2, 2.5, 10).transformed(Mat4::from_translation(Vec3::Y * 3.0)))
        .merge(MeshData::cone(0.8, 2.0, 10).transformed(Mat4::from_translation(Vec3::Y * 4.5)));
    ModelData::new("tree")
        .with_component(trunk, Material::color(rgb(92, 64, 40)))
        .with_component(foliage, Material::color(rgb(34, 90, 40)).shiny(0.05, 4.0))
}

pub fn stump_model() -> ModelData {
    let stump = MeshData::frustum(0.6, 0.45, 0.7, 12);
    let top = MeshData::cylinder(0.44, 0.01, 12).transformed(Mat4::from_translation(Vec3::Y * 0.7));
    ModelData::new("stump")
        .with_component(stump, Material::color(rgb(92, 64, 40)))
        .with_component(top, Material::color(rgb(196, 160, 110)))
}

pub fn cone_model() -> ModelData {
    let base = MeshData::cuboid(Vec3::new(0.7, 0.05, 0.7)).transformed(Mat4::from_translation(Vec3::Y * 0.025));
    let body = MeshData::frustum(0.35, 0.05, 0.8, 16);
    let stripe = MeshData::frustum(0.245, 0.205, 0.15, 16).transformed(Mat4::from_translation(Vec3::Y * 0.3));
    ModelData::new("cone")
        .with_component(base.merge(body), Material::color(rgb(255, 110, 20)).shiny(0.4, 16.0))
        .with_component(stripe, Material::color(Vec3::splat(0.95)))
}

/// One fence panel, two units long along X.
pub fn fence_model() -> ModelData {
    let post = |x: f32| MeshData::cylinder(0.08, 1.2, 6).transformed(Mat4::from_translation(Vec3::new(x, 0.0, 0.0)));
    let rail = |y: f32| MeshData::cuboid(Vec3::new(2.0, 0.1, 0.06)).transformed(Mat4::from_translation(Vec3::Y * y));
    ModelData::new("fence").with_component(
        post(-0.92).merge(post(0.92)).merge(rail(0.5)).merge(rail(1.0)),
        Material::color(rgb(140, 110, 80)),
    )
}

/// Map pixel to world `(x, z)`.
pub fn pixel_to_ground(terrain: &Terrain, pixel: Vec2) -> Vec2 {
    let p = terrain.position_from_pixel(pixel.x, pixel.y);
    Vec2::new(p.x, p.z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn procedural_models_stand_on_the_origin() {
        for model in [car_model(), tree_model(), stump_model(), cone_model(), fence_model()] {
            let (lo, hi) = model.bounds().unwrap();
            assert!(lo.y.abs() < 1e-4, "{} base at {}", model.name, lo.y);
            assert!(hi.y > 0.5, "{} height {}", model.name, hi.y);
        }
    }

    #[test]
    fn car_is_longer_than_it_is_wide() {
        let (lo, hi) = car_model().bounds().unwrap();
        let size = hi - lo;
        assert!((size.z - 4.0).abs() < 1e-3);
        assert!(size.x < size.z);
    }

    #[test]
    fn fence_panel_spans_two_units() {
        let (lo, hi) = fence_model().bounds().unwrap();
        assert!(((hi.x - lo.x) - 2.0).abs() < 1e-4);
    }

    #[test]
    fn missing_configured_model_is_an_error() {
        let result = load_model(Some(Path::new("does/not/exist.obj")), cone_model);
        assert!(result.is_err());
        assert_eq!(load_model(None, cone_model).unwrap().name, "cone");
    }
}
