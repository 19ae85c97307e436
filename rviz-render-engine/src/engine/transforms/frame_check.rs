use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use super::frame_tracker::FrameTracker;
use super::frame_tree::TransformTree;
use crate::engine::listeners::{ListenerId, Listeners};

/// Whether a layer's frame can currently be placed in the fixed frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameStatus {
    Ok,
    Missing { from: String, to: String },
}

impl fmt::Display for FrameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameStatus::Ok => write!(f, "OK"),
            FrameStatus::Missing { from, to } => write!(f, "No transform from {} to {}", from, to),
        }
    }
}

struct CheckState {
    frame: String,
    fixed_frame: String,
    status: FrameStatus,
}

/// Tracks the resolvability of one frame against the scene's fixed frame.
///
/// Re-evaluated whenever the fixed frame changes or a new frame shows up,
/// since either can turn a missing transform into an available one.
pub struct FrameCheck {
    tree: Arc<dyn TransformTree>,
    state: Mutex<CheckState>,
    /// Frame-added and fixed-frame listener ids while attached.
    subscriptions: Mutex<Option<(ListenerId, ListenerId)>>,
}

impl FrameCheck {
    pub fn new(tree: Arc<dyn TransformTree>, frame: &str, fixed_frame: &str) -> Arc<Self> {
        let check = Arc::new(Self {
            tree,
            state: Mutex::new(CheckState {
                frame: frame.to_string(),
                fixed_frame: fixed_frame.to_string(),
                status: FrameStatus::Ok,
            }),
            subscriptions: Mutex::new(None),
        });
        check.evaluate();
        check
    }

    /// Re-check on frame discovery and fixed-frame changes.
    pub fn attach(self: &Arc<Self>, tracker: &FrameTracker, fixed_frame_listeners: &Listeners<str>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let on_frame = weak.clone();
        let frame_id = tracker.add_frame_added_listener(move |_| {
            if let Some(check) = on_frame.upgrade() {
                check.evaluate();
            }
        });
        let fixed_id = fixed_frame_listeners.add(move |fixed: &str| {
            if let Some(check) = weak.upgrade() {
                check.set_fixed_frame(fixed);
            }
        });
        *self.subscriptions.lock() = Some((frame_id, fixed_id));
    }

    /// Undo [`FrameCheck::attach`].
    pub fn detach(&self, tracker: &FrameTracker, fixed_frame_listeners: &Listeners<str>) {
        if let Some((frame_id, fixed_id)) = self.subscriptions.lock().take() {
            tracker.remove_frame_added_listener(frame_id);
            fixed_frame_listeners.remove(fixed_id);
        }
    }

    pub fn set_frame(&self, frame: &str) {
        self.state.lock().frame = frame.to_string();
        self.evaluate();
    }

    pub fn set_fixed_frame(&self, fixed_frame: &str) {
        self.state.lock().fixed_frame = fixed_frame.to_string();
        self.evaluate();
    }

    pub fn status(&self) -> FrameStatus {
        self.state.lock().status.clone()
    }

    pub fn evaluate(&self) -> FrameStatus {
        let (frame, fixed) = {
            let state = self.state.lock();
            (state.frame.clone(), state.fixed_frame.clone())
        };
        let status = if self.tree.can_transform(&frame, &fixed) {
            FrameStatus::Ok
        } else {
            FrameStatus::Missing {
                from: frame,
                to: fixed,
            }
        };
        self.state.lock().status = status.clone();
        status
    }
}
