//! Keyboard and mouse state for the driving demo.
//!
//! The main loop owns one [`InputState`], feeds it window/device events and
//! hands it by reference to whoever needs to read controls.

use engine_core::DriveInput;
use glam::Vec2;
use std::collections::HashSet;

/// Manages input state for the current frame.
#[derive(Debug, Default)]
pub struct InputState {
    /// Keys currently held down.
    keys_held: HashSet<KeyCode>,
    /// Keys pressed this frame.
    keys_pressed: HashSet<KeyCode>,

    /// Mouse buttons currently held.
    mouse_held: HashSet<MouseButton>,

    /// Mouse position in window coordinates.
    mouse_position: Vec2,
    /// Mouse movement delta this frame.
    mouse_delta: Vec2,
    /// Accumulated raw mouse motion since the last `begin_frame`.
    accumulated_delta: Vec2,

    /// Scroll lines this frame, positive away from the user.
    scroll: f32,
    accumulated_scroll: f32,
}

impl InputState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear per-frame state. Call at the start of each frame.
    pub fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.mouse_delta = self.accumulated_delta;
        self.accumulated_delta = Vec2::ZERO;
        self.scroll = self.accumulated_scroll;
        self.accumulated_scroll = 0.0;
    }

    /// Process a keyboard event.
    pub fn process_keyboard(&mut self, key: KeyCode, state: ElementState) {
        match state {
            ElementState::Pressed => {
                if !self.keys_held.contains(&key) {
                    self.keys_pressed.insert(key);
                }
                self.keys_held.insert(key);
            }
            ElementState::Released => {
                self.keys_held.remove(&key);
            }
        }
    }

    /// Process a mouse button event.
    pub fn process_mouse_button(&mut self, button: MouseButton, state: ElementState) {
        match state {
            ElementState::Pressed => {
                self.mouse_held.insert(button);
            }
            ElementState::Released => {
                self.mouse_held.remove(&button);
            }
        }
    }

    /// Process raw mouse movement.
    pub fn process_mouse_motion(&mut self, delta: (f64, f64)) {
        self.accumulated_delta.x += delta.0 as f32;
        self.accumulated_delta.y += delta.1 as f32;
    }

    /// Process cursor position update.
    pub fn process_cursor_position(&mut self, position: (f64, f64)) {
        self.mouse_position = Vec2::new(position.0 as f32, position.1 as f32);
    }

    /// Process a scroll wheel step, in lines.
    pub fn process_scroll(&mut self, lines: f32) {
        self.accumulated_scroll += lines;
    }

    /// Drop every held key and button (focus lost).
    pub fn release_all(&mut self) {
        self.keys_held.clear();
        self.mouse_held.clear();
    }

    // Query methods

    /// Check if a key is currently held.
    pub fn is_key_held(&self, key: KeyCode) -> bool {
        self.keys_held.contains(&key)
    }

    /// Check if a key was pressed this frame.
    pub fn is_key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    /// Check if a mouse button is held.
    pub fn is_mouse_held(&self, button: MouseButton) -> bool {
        self.mouse_held.contains(&button)
    }

    /// Get the mouse position in window coordinates.
    pub fn mouse_position(&self) -> Vec2 {
        self.mouse_position
    }

    /// Get the mouse movement delta for this frame.
    pub fn mouse_delta(&self) -> Vec2 {
        self.mouse_delta
    }

    /// Mouse delta while the orbit button (left) is held, zero otherwise.
    pub fn orbit_delta(&self) -> Vec2 {
        if self.is_mouse_held(MouseButton::Left) {
            self.mouse_delta
        } else {
            Vec2::ZERO
        }
    }

    /// Scroll lines this frame.
    pub fn scroll(&self) -> f32 {
        self.scroll
    }

    fn any_held(&self, keys: &[KeyCode]) -> bool {
        keys.iter().any(|k| self.is_key_held(*k))
    }

    /// Current driving controls.
    ///
    /// W/Up throttle, S/Down brake, A/Left and D/Right steer, Space handbrake.
    pub fn drive_input(&self) -> DriveInput {
        let axis = |on: bool| if on { 1.0 } else { 0.0 };
        let left = axis(self.any_held(&[KeyCode::KeyA, KeyCode::ArrowLeft]));
        let right = axis(self.any_held(&[KeyCode::KeyD, KeyCode::ArrowRight]));
        DriveInput {
            throttle: axis(self.any_held(&[KeyCode::KeyW, KeyCode::ArrowUp])),
            brake: axis(self.any_held(&[KeyCode::KeyS, KeyCode::ArrowDown])),
            steer: left - right,
            handbrake: self.is_key_held(KeyCode::Space),
        }
    }

    /// Escape was pressed this frame.
    pub fn quit_requested(&self) -> bool {
        self.is_key_pressed(KeyCode::Escape)
    }
}

// Re-export for convenience
pub use winit::event::{ElementState, MouseButton};
pub use winit::keyboard::KeyCode;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opposite_steer_keys_cancel() {
        let mut input = InputState::new();
        input.process_keyboard(KeyCode::KeyA, ElementState::Pressed);
        assert_eq!(input.drive_input().steer, 1.0);
        input.process_keyboard(KeyCode::ArrowRight, ElementState::Pressed);
        assert_eq!(input.drive_input().steer, 0.0);
    }

    #[test]
    fn pressed_is_cleared_next_frame_but_held_remains() {
        let mut input = InputState::new();
        input.process_keyboard(KeyCode::KeyW, ElementState::Pressed);
        assert!(input.is_key_pressed(KeyCode::KeyW));
        input.begin_frame();
        assert!(!input.is_key_pressed(KeyCode::KeyW));
        assert_eq!(input.drive_input().throttle, 1.0);
    }

    #[test]
    fn scroll_and_motion_latch_on_begin_frame() {
        let mut input = InputState::new();
        input.process_scroll(2.0);
        input.process_mouse_motion((3.0, -1.0));
        assert_eq!(input.scroll(), 0.0);
        input.begin_frame();
        assert_eq!(input.scroll(), 2.0);
        assert_eq!(input.orbit_delta(), Vec2::ZERO);
        input.process_mouse_button(MouseButton::Left, ElementState::Pressed);
        assert_eq!(input.orbit_delta(), Vec2::new(3.0, -1.0));
    }
}
