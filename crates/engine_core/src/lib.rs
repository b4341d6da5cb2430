//! Core types shared by every crate of the terrain driving demo.
//!
//! - Transform and spatial helpers
//! - Frame timing with delta clamping
//! - Light sources (directional sun, positional cone lights)
//! - Driver control state

pub mod controls;
pub mod light;
pub mod time;
pub mod transform;

pub use controls::*;
pub use light::*;
pub use time::*;
pub use transform::*;

// Re-export commonly used types
pub use glam::{Mat3, Mat4, Quat, Vec2, Vec3, Vec4};
