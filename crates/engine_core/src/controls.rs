//! Driver control state shared between input handling and vehicle models.

/// One frame of driver input, all values in their natural ranges.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriveInput {
    /// Throttle in `[0, 1]`.
    pub throttle: f32,
    /// Brake in `[0, 1]`. In basic mode this drives the car backwards.
    pub brake: f32,
    /// Steering in `[-1, 1]`, positive turns left.
    pub steer: f32,
    /// Handbrake (rear wheel lock).
    pub handbrake: bool,
}

impl DriveInput {
    /// Clamp every axis to its valid range.
    pub fn clamped(self) -> Self {
        Self {
            throttle: self.throttle.clamp(0.0, 1.0),
            brake: self.brake.clamp(0.0, 1.0),
            steer: self.steer.clamp(-1.0, 1.0),
            handbrake: self.handbrake,
        }
    }
}
