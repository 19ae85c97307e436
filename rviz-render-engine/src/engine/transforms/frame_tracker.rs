use std::collections::BTreeSet;

use bevy::log::info;
use constants::coordinate_system::normalise_frame_name;
use parking_lot::Mutex;

use crate::engine::listeners::{ListenerId, Listeners};
use crate::messages::geometry_msgs::TransformStamped;

/// Registry of every frame name seen in transform traffic.
///
/// Written from the message-delivery path, read from the render thread and
/// from UI code. Listeners hear about a name exactly once, the first time it
/// appears, and are called after the registry lock has been released.
#[derive(Default)]
pub struct FrameTracker {
    frames: Mutex<BTreeSet<String>>,
    listeners: Listeners<str>,
}

impl FrameTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record both ends of a stamped transform.
    pub fn receive_transform(&self, msg: &TransformStamped) {
        self.add_frame(&msg.child_frame_id);
        self.add_frame(&msg.header.frame_id);
    }

    /// Returns `true` if the frame had not been seen before.
    pub fn add_frame(&self, frame: &str) -> bool {
        let frame = normalise_frame_name(frame);
        if frame.is_empty() {
            return false;
        }

        let inserted = self.frames.lock().insert(frame.to_string());
        if inserted {
            info!("New frame available: {}", frame);
            self.listeners.notify(frame);
        }
        inserted
    }

    pub fn contains(&self, frame: &str) -> bool {
        self.frames.lock().contains(normalise_frame_name(frame))
    }

    /// Sorted snapshot of the known frames.
    pub fn available_frames(&self) -> Vec<String> {
        self.frames.lock().iter().cloned().collect()
    }

    pub fn add_frame_added_listener(
        &self,
        listener: impl Fn(&str) + Send + Sync + 'static,
    ) -> ListenerId {
        self.listeners.add(listener)
    }

    pub fn remove_frame_added_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::std_msgs::Header;
    use std::sync::Arc;

    #[test]
    fn notifies_once_per_new_frame() {
        let tracker = FrameTracker::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        tracker.add_frame_added_listener(move |frame| log.lock().push(frame.to_string()));

        let msg = TransformStamped {
            header: Header::with_frame("/world"),
            child_frame_id: "base_link".into(),
            ..Default::default()
        };
        tracker.receive_transform(&msg);
        tracker.receive_transform(&msg);

        assert_eq!(*seen.lock(), vec!["base_link".to_string(), "world".to_string()]);
        assert_eq!(tracker.available_frames(), vec!["base_link", "world"]);
    }

    #[test]
    fn listener_may_query_tracker() {
        let tracker = Arc::new(FrameTracker::new());
        let counts = Arc::new(Mutex::new(Vec::new()));
        let (inner, log) = (Arc::downgrade(&tracker), counts.clone());
        tracker.add_frame_added_listener(move |_| {
            if let Some(tracker) = inner.upgrade() {
                log.lock().push(tracker.available_frames().len());
            }
        });

        tracker.add_frame("map");
        tracker.add_frame("odom");
        assert_eq!(*counts.lock(), vec![1, 2]);
    }
}
