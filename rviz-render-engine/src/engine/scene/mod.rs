//! Built-in layers and the scene that drives them.
//!
//! ## Architecture
//!
//! ```text
//! VisualizationScene
//!   ├─> OrbitCamera ─> matrix stacks, ViewSnapshot
//!   ├─> SelectionManager ─> InteractiveControlManager ─> ControlCommand channel
//!   ├─> Renderer
//!   │     ├─> GridLayer
//!   │     ├─> MapLayer (grid header frame)
//!   │     ├─> AxesLayer (fixed frame)
//!   │     ├─> TfFrameLayer (every known frame)
//!   │     ├─> PointCloud2Layer (cloud header frame)
//!   │     ├─> MarkerLayer
//!   │     └─> InteractiveMarkerLayer
//!   └─> TfListener ─> FrameTransformTree, FrameTracker
//! ```

/// Red/green/blue triad anchored to a frame.
pub mod axes;

/// Runtime configuration loaded from JSON.
pub mod config;

/// Reference grid in the ground plane.
pub mod grid;

/// Occupancy grids split into tiles.
pub mod map_layer;

/// Plain visualization markers keyed by namespace and id.
pub mod marker_layer;

/// Packed point clouds with flat or per-channel colouring.
pub mod point_cloud_layer;

/// Axes at every frame the tracker knows.
pub mod tf_frame_layer;

/// Touch entry points and the per-frame draw call.
pub mod visualization_scene;

pub use axes::AxesLayer;
pub use config::{ConfigError, VisualizationConfig};
pub use grid::GridLayer;
pub use map_layer::MapLayer;
pub use marker_layer::{MarkerLayer, MarkerTable};
pub use point_cloud_layer::{CloudColourMode, PointCloud2Layer};
pub use tf_frame_layer::TfFrameLayer;
pub use visualization_scene::VisualizationScene;
