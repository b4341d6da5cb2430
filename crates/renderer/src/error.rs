use std::path::PathBuf;

use thiserror::Error;

use crate::pass::PassKind;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    #[error("shader program {label} failed to build: {message}")]
    Shader { label: &'static str, message: String },
    #[error("{pass:?} pass out of order: {reason}")]
    PassOrder { pass: PassKind, reason: &'static str },
    #[error("failed to load model {path:?}: {source}")]
    Model {
        path: PathBuf,
        #[source]
        source: tobj::LoadError,
    },
    #[error(transparent)]
    Terrain(#[from] terrain::TerrainError),
}
