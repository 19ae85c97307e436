//! Bevy preview application around the visualisation scene.
//!
//! The scene itself knows nothing about Bevy windows or input. This module
//! turns mouse input into the touch events and gestures the scene expects,
//! draws the wireframe canvas with gizmo lines, and mirrors the control
//! overlay and menus as UI nodes.

/// App construction, plugins and the per-frame systems.
///
/// Creates the app with the scene, the demo marker server and the JSON
/// bridge, for both native and WASM targets.
pub mod app_setup;

/// Non-send scene state, pointer bookkeeping and UI marker components.
pub mod app_state;

/// Platform-specific window configuration for native and WASM builds.
///
/// Configures canvas integration for web targets and vsync settings.
pub mod window_config;
