//! Compile-time defaults shared by the visualisation engine.
//!
//! Values are grouped by concern. Runtime overrides live in the engine's
//! `VisualizationConfig`, which is seeded from these constants.

pub mod camera;
pub mod coordinate_system;
pub mod interactive_markers;
pub mod render_settings;
pub mod selection;
