//! Server-defined interactive markers.
//!
//! A marker server publishes markers, each a pose plus a list of controls
//! (move along an axis, move in a plane, rotate, open a menu). The client
//! draws them, lets the user grab a control through the selection manager
//! and drives it from the on-screen widgets, reporting every interaction
//! back to the server as feedback.
//!
//! ## Architecture
//!
//! ```text
//! bus: <root>/update_full, <root>/update
//!   └─> InteractiveMarkerSubscriptionManager (UpdateStreamMachine)
//!       └─> MarkerStore (Arc<Mutex>) ◀── ControlHandle ◀── SelectionManager
//!           └─> InteractiveMarker ─> InteractiveMarkerControl
//!               └─> MarkerFeedbackPublisher ─> bus: <root>/feedback
//! ```
//!
//! The store is the only state shared between the message-delivery path
//! and the render thread. Everything else here runs on the render thread.

/// Per-control geometry, picking and ray-cast manipulation.
pub mod control;

/// Geometry synthesised for controls that arrive without any.
pub mod control_marker;

/// Selection-manager handles onto controls living in the store.
pub mod handle;

/// Render layer and bus feedback publisher.
pub mod layer;

/// A marker: pose, controls, menu and buffered server updates.
pub mod marker;

pub mod menu;

/// Interaction and orientation modes and feedback event types.
pub mod modes;

/// Markers by name, shared with the message-delivery path.
pub mod store;

/// Snapshot and update stream synchronisation.
pub mod subscription;

pub use control::InteractiveMarkerControl;
pub use handle::ControlHandle;
pub use layer::{BusFeedbackPublisher, InteractiveMarkerLayer};
pub use marker::{InteractiveMarker, MarkerFeedbackPublisher};
pub use menu::{MenuItem, MenuPrompt};
pub use modes::{FeedbackType, InteractionMode, OrientationMode};
pub use store::{MarkerStore, SharedMarkerStore};
pub use subscription::{
    InteractiveMarkerSubscriptionManager, MarkerUpdateSink, StreamAction, StreamStage,
    UpdateStreamMachine,
};
