//! Demo configuration (window, graphics, world, assets, vehicle). Loaded from config.ron at startup.

use std::path::{Path, PathBuf};

use physics::VehicleConfig;
use serde::{Deserialize, Serialize};

/// Optional asset files. Anything left unset is generated procedurally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetPaths {
    /// Grayscale heightmap; requires `terrain_textures` as well.
    pub heightmap: Option<PathBuf>,
    /// Blend map, grass, road, dirt, mud.
    pub terrain_textures: Option<[PathBuf; 5]>,
    /// +X, -X, +Y, -Y, +Z, -Z.
    pub skybox: Option<[PathBuf; 6]>,
    pub dust: Option<PathBuf>,
    pub car: Option<PathBuf>,
    pub tree: Option<PathBuf>,
    pub stump: Option<PathBuf>,
    pub cone: Option<PathBuf>,
    pub fence: Option<PathBuf>,
}

/// Persistent demo settings. Loaded from `config.ron` in the current directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Window width in logical pixels.
    #[serde(default = "default_window_width")]
    pub window_width: u32,
    /// Window height in logical pixels.
    #[serde(default = "default_window_height")]
    pub window_height: u32,
    #[serde(default = "default_true")]
    pub vsync: bool,
    #[serde(default = "default_shadow_map_size")]
    pub shadow_map_size: u32,
    /// Half width of the area around the player that casts shadows.
    #[serde(default = "default_shadow_extent")]
    pub shadow_extent: f32,
    /// Depth comparison epsilon against shadow acne.
    #[serde(default = "default_shadow_bias")]
    pub shadow_bias: f32,
    #[serde(default = "default_true")]
    pub shadows: bool,
    #[serde(default = "default_true")]
    pub water_reflections: bool,
    /// Frame delta cap in seconds; longer frames are simulated as this long.
    #[serde(default = "default_max_frame_delta")]
    pub max_frame_delta: f32,
    /// Seed for terrain, track and prop placement. `None` picks one at random.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Trees and stumps scattered over the map.
    #[serde(default = "default_prop_count")]
    pub prop_count: usize,
    #[serde(default)]
    pub assets: AssetPaths,
    #[serde(default)]
    pub vehicle: VehicleConfig,
}

fn default_window_width() -> u32 {
    1280
}
fn default_window_height() -> u32 {
    720
}
fn default_true() -> bool {
    true
}
fn default_shadow_map_size() -> u32 {
    4096
}
fn default_shadow_extent() -> f32 {
    60.0
}
fn default_shadow_bias() -> f32 {
    renderer::DEFAULT_SHADOW_BIAS
}
fn default_max_frame_delta() -> f32 {
    engine_core::DEFAULT_MAX_DELTA
}
fn default_prop_count() -> usize {
    250
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            window_width: default_window_width(),
            window_height: default_window_height(),
            vsync: default_true(),
            shadow_map_size: default_shadow_map_size(),
            shadow_extent: default_shadow_extent(),
            shadow_bias: default_shadow_bias(),
            shadows: default_true(),
            water_reflections: default_true(),
            max_frame_delta: default_max_frame_delta(),
            seed: None,
            prop_count: default_prop_count(),
            assets: AssetPaths::default(),
            vehicle: VehicleConfig::default(),
        }
    }
}

impl GameConfig {
    /// Load config from `path`. If the file is missing or invalid, returns default config.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(data) => Self::parse(&data).unwrap_or_else(|e| {
                log::warn!("Invalid config at {:?}: {}, using defaults", path, e);
                Self::default()
            }),
            Err(_) => {
                log::debug!("No config at {:?}, using defaults", path);
                Self::default()
            }
        }
    }

    pub fn parse(data: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(data)
    }

    pub fn shadow_settings(&self) -> renderer::ShadowSettings {
        renderer::ShadowSettings {
            size: self.shadow_map_size,
            half_extent: self.shadow_extent,
            bias: self.shadow_bias,
            enabled: self.shadows,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_is_all_defaults() {
        let config = GameConfig::parse("()").unwrap();
        assert_eq!(config, GameConfig::default());
        assert_eq!(config.prop_count, 250);
        assert_eq!(config.shadow_map_size, 4096);
        assert!(config.assets.car.is_none());
    }

    #[test]
    fn partial_config_keeps_other_defaults() {
        let config = GameConfig::parse(
            r#"(
                vsync: false,
                seed: Some(7),
                assets: (car: Some("res/car/car.obj")),
                vehicle: (move_speed: 14.0),
            )"#,
        )
        .unwrap();
        assert!(!config.vsync);
        assert_eq!(config.seed, Some(7));
        assert_eq!(config.assets.car, Some(PathBuf::from("res/car/car.obj")));
        assert_eq!(config.vehicle.move_speed, 14.0);
        assert_eq!(config.vehicle.mass, VehicleConfig::default().mass);
        assert_eq!(config.window_width, 1280);
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join(format!("terrain-drive-config-{}.ron", std::process::id()));
        std::fs::write(&path, "(window_width: \"wide\")").unwrap();
        let config = GameConfig::load_from(&path);
        std::fs::remove_file(&path).ok();
        assert_eq!(config, GameConfig::default());
    }
}
