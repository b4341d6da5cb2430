//! Vehicle dynamics for the driving demo.
//!
//! Two models share one [`Vehicle`] front end:
//! - [`BasicModel`]: arcade controls, key → speed, speed-scaled turning
//! - [`CarModel`]: 2D tyre model with weight transfer, slip angles and yaw torque
//!
//! Both work in the ground plane; world `(x, z)` maps to `Vec2(x, y)`.

pub mod basic;
pub mod car;
pub mod config;
pub mod vehicle;

pub use basic::*;
pub use car::*;
pub use config::*;
pub use vehicle::*;
