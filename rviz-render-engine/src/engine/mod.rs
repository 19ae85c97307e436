//! Rendering core of the visualiser.
//!
//! ## Architecture
//!
//! ```text
//! VisualizationScene (scene)
//!   ├─> OrbitCamera (camera) ──reads──> TransformTree (transforms)
//!   ├─> SelectionManager (selection) ──owns──> InteractiveControlManager
//!   └─> Renderer (render) ──draws──> Layer stack onto a Canvas
//! ```
//!
//! `core` wraps all of this in a Bevy app for desktop and browser preview.

/// Orbit camera, model matrix stack and viewport projection.
pub mod camera;

/// Bevy preview app: input mapping, gizmo drawing and the overlay UI.
pub mod core;

/// Ray casting and numeric helpers.
pub mod geometry;

/// Snapshot-notified observer lists.
pub mod listeners;

/// Layers, canvases and the two-pass draw loop.
pub mod render;

/// Scene assembly, configuration and the built-in layers.
pub mod scene;

/// Colour-picking selection of drawn objects.
pub mod selection;

/// Frame transform tree, frame tracking and the tf listener.
pub mod transforms;
