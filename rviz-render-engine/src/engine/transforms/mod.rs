//! Named coordinate frames and the transforms between them.
//!
//! ## Architecture
//!
//! ```text
//! /tf messages ──> TfListener ──┬─> FrameTransformTree (latest edge per child)
//!                               └─> FrameTracker (sorted frame names)
//!                                        │ new frame
//!                                        v
//!                                 FrameCheck re-evaluates its status
//! ```
//!
//! The render thread only ever queries the tree; the delivery path writes
//! it. Both sides go through the tree's lock.

/// Frame check status ("No transform from X to Y").
pub mod frame_check;

/// Registry of observed frame names with frame-added listeners.
pub mod frame_tracker;

/// `TransformTree` trait and its in-memory implementation.
pub mod frame_tree;

/// Feeds `/tf` traffic into the tree and the tracker.
pub mod tf_listener;

/// Rigid transform value type.
pub mod transform;

pub use frame_tracker::FrameTracker;
pub use frame_tree::{FrameTransformTree, TransformTree, transform_or_identity};
pub use transform::FrameTransform;
