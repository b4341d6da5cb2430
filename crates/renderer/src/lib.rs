//! wgpu renderer for the terrain driving demo.
//!
//! [`Renderer`] owns the GPU context; [`RenderManager`] records the shadow
//! depth pass, the optional water reflection and the colour pass each frame.

pub mod camera;
pub mod error;
pub mod framebuffer;
pub mod mesh;
pub mod model;
pub mod pass;
pub mod pipeline;
pub mod render_manager;
pub mod renderer;
pub mod renderers;
pub mod shader;
pub mod texture;
pub mod vertex;

pub use camera::*;
pub use error::RenderError;
pub use framebuffer::*;
pub use mesh::*;
pub use model::*;
pub use pass::*;
pub use render_manager::*;
pub use renderer::*;
pub use renderers::{SharedLayouts, WaterSurface};
pub use shader::*;
pub use texture::*;
pub use vertex::*;
