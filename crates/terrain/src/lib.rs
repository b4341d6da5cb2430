//! Heightmap terrain for the driving demo.
//!
//! - [`Heightfield`]: square grid of heights, from an image or from noise
//! - [`Terrain`]: world placement, height/normal queries, mesh data, surface textures
//! - [`Track`]: procedural race loop painted into the blend map
//! - [`TextureGenerator`]: procedural surface, particle and sky textures

pub mod error;
pub mod heightfield;
pub mod terrain;
pub mod textures;
pub mod track;

pub use error::*;
pub use heightfield::*;
pub use terrain::*;
pub use textures::*;
pub use track::*;
