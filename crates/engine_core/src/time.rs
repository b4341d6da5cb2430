//! Time management for the frame loop.

use std::time::{Duration, Instant};

/// Longest frame delta handed to the simulation by default.
pub const DEFAULT_MAX_DELTA: f32 = 0.1;

/// Measures wall-clock frame deltas.
///
/// The raw delta is clamped to `max_delta` so a stalled frame (window drag,
/// debugger break) cannot teleport the vehicle across the map.
#[derive(Debug)]
pub struct Time {
    /// Time when the loop started.
    start_time: Instant,
    /// Time of the last frame.
    last_frame: Instant,
    /// Clamped duration of the last frame.
    delta: Duration,
    /// Total elapsed time since start.
    elapsed: Duration,
    /// Frame count since start.
    frame_count: u64,
    /// Upper bound applied to `delta`.
    max_delta: Duration,
}

impl Default for Time {
    fn default() -> Self {
        Self::new()
    }
}

impl Time {
    /// Create a new time manager with the default delta clamp.
    pub fn new() -> Self {
        Self::with_max_delta(DEFAULT_MAX_DELTA)
    }

    /// Create a time manager clamping deltas to `max_delta` seconds.
    pub fn with_max_delta(max_delta: f32) -> Self {
        let now = Instant::now();
        Self {
            start_time: now,
            last_frame: now,
            delta: Duration::ZERO,
            elapsed: Duration::ZERO,
            frame_count: 0,
            max_delta: Duration::from_secs_f32(max_delta.max(0.001)),
        }
    }

    /// Update timing at the start of a new frame.
    pub fn update(&mut self) {
        let now = Instant::now();
        self.advance(now - self.last_frame);
        self.last_frame = now;
        self.elapsed = now - self.start_time;
    }

    /// Feed an explicit frame duration (used by `update` and by tests).
    pub fn advance(&mut self, raw: Duration) {
        self.delta = raw.min(self.max_delta);
        self.frame_count += 1;
    }

    /// Get the delta time in seconds.
    pub fn delta_seconds(&self) -> f32 {
        self.delta.as_secs_f32()
    }

    /// Get total elapsed time in seconds.
    pub fn elapsed_seconds(&self) -> f32 {
        self.elapsed.as_secs_f32()
    }

    /// Get the current frame count.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_frames_are_clamped() {
        let mut time = Time::with_max_delta(0.05);
        time.advance(Duration::from_secs(2));
        assert!((time.delta_seconds() - 0.05).abs() < 1e-6);
        time.advance(Duration::from_millis(16));
        assert!((time.delta_seconds() - 0.016).abs() < 1e-6);
        assert_eq!(time.frame_count(), 2);
    }
}
