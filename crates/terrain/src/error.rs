use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TerrainError {
    #[error("failed to load image {path:?}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("heightfield needs at least 2x2 samples, got {0}")]
    Resolution(u32),
    #[error("heightmap {path:?} must be square, got {width}x{height}")]
    NotSquare { path: PathBuf, width: u32, height: u32 },
}
