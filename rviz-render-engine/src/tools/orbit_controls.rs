use bevy::log::debug;
use bevy::math::Vec2;
use constants::camera::{ORBIT_GESTURE_COEFFICIENT, PAN_GESTURE_DIVISOR};

use crate::engine::camera::OrbitCamera;
use crate::engine::selection::SelectionManager;

/// Decoded touch gestures.
///
/// Drag and pan deltas use the scroll-distance convention: previous
/// position minus current position, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    /// One-finger drag.
    Drag { distance: Vec2 },
    /// Two-finger drag of the gesture focus.
    Pan { distance: Vec2 },
    /// Pinch, `scale > 1` spreading the fingers.
    Pinch { scale: f32, focus_distance: Vec2 },
    DoubleTap,
    /// Release with velocity, in pixels per second.
    Fling { velocity: Vec2 },
    Tap { position: Vec2 },
}

/// Maps gestures onto the orbit camera and the selection manager.
pub struct OrbitCameraControls {
    enable_scrolling: bool,
}

impl Default for OrbitCameraControls {
    fn default() -> Self {
        Self {
            enable_scrolling: true,
        }
    }
}

impl OrbitCameraControls {
    pub fn set_scrolling_enabled(&mut self, enabled: bool) {
        self.enable_scrolling = enabled;
    }

    /// Apply `gesture`. Returns false when it was ignored because an overlay
    /// widget owns the touch.
    pub fn handle(
        &self,
        gesture: Gesture,
        camera: &mut OrbitCamera,
        selection: &mut SelectionManager,
    ) -> bool {
        if selection.control_manager().is_moving() {
            return false;
        }

        match gesture {
            Gesture::Drag { distance } => {
                let orbit = distance * ORBIT_GESTURE_COEFFICIENT;
                camera.move_orbit_position(orbit.x, orbit.y);
            }
            Gesture::Pan { distance } => {
                if self.enable_scrolling {
                    let pan = distance / PAN_GESTURE_DIVISOR;
                    camera.move_camera_screen_coordinates(pan.x, pan.y);
                }
            }
            Gesture::Pinch {
                scale,
                focus_distance,
            } => {
                if self.enable_scrolling {
                    let pan = focus_distance / PAN_GESTURE_DIVISOR;
                    camera.move_camera_screen_coordinates(pan.x, pan.y);
                }
                camera.zoom_camera(scale);
            }
            Gesture::DoubleTap => {
                if !self.enable_scrolling || selection.interactive_mode() {
                    return true;
                }
                camera.reset_target_frame();
                camera.reset_look_target();
                camera.reset_zoom();
            }
            Gesture::Fling { velocity } => {
                if !selection.interactive_mode() {
                    camera.fling_camera(velocity.x, velocity.y);
                }
            }
            Gesture::Tap { position } => {
                debug!("Tap at {}", position);
                selection.begin_selection_draw(position.x, position.y);
                return true;
            }
        }

        selection.signal_camera_moved(&camera.snapshot());
        true
    }
}
