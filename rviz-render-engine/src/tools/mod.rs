//! Ways the user acts on the scene, and the demo server that gives them
//! something to act on.
//!
//! ## Interaction Architecture
//!
//! Touches reach the scene as raw down/move/up events. A touch that lands
//! on an overlay widget belongs to the Interactive Control Manager until it
//! is released; anything else becomes a camera gesture, or a tap that
//! starts a pick.
//!
//! ```text
//! touch down/move/up
//!   ├─> on a widget ─> InteractiveControlManager ─> InteractiveObject (control)
//!   │                      └─> ControlCommand ─> UI overlay
//!   └─> elsewhere ─> OrbitCameraControls
//!                        ├─> drag / pan / pinch / fling ─> OrbitCamera
//!                        └─> tap ─> SelectionManager::begin_selection_draw
//! ```
//!
//! ### Widgets by Interaction Mode
//!
//! | Mode          | Widgets                         |
//! |---------------|---------------------------------|
//! | `ROTATE_AXIS` | angle dial                      |
//! | `MOVE_AXIS`   | 1-D pad, turned along the axis  |
//! | `MOVE_PLANE`  | 2-D pad                         |
//! | `MOVE_ROTATE` | angle dial and 2-D pad          |
//! | `MENU`        | none, a menu prompt instead     |
//!
//! ## Demo Server
//!
//! `DemoMarkerServer` publishes a fixed marker set over the same bus the
//! scene listens on, so the preview app runs without any middleware.

/// Overlay widgets, their command stream and touch hit-testing.
pub mod control_manager;

/// In-process interactive marker server with a small frame tree.
pub mod demo_server;

/// Server-defined markers with draggable controls and menus.
pub mod interactive_markers;

/// Gesture to camera mapping.
pub mod orbit_controls;
