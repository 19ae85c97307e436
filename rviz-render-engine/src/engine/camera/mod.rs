//! Orbit camera, model matrix stack and viewport projection.
//!
//! The camera is the single owner of the view and model matrices for a
//! frame. Layers draw through it with balanced `push_m`/`pop_m` pairs;
//! ray casting reads a [`viewport::ViewSnapshot`] taken after `apply`.

/// Fixed-depth save/restore stack for the model matrix.
pub mod matrix_stack;

/// Orbit camera with fling inertia, panning, zoom and frame tracking.
pub mod orbit_camera;

/// Viewport sizing, projection, and screen/world conversions.
pub mod viewport;

pub use matrix_stack::ModelMatrixStack;
pub use orbit_camera::OrbitCamera;
pub use viewport::{ViewSnapshot, Viewport};
