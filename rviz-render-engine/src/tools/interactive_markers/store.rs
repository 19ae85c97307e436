use std::collections::BTreeMap;
use std::sync::Arc;

use bevy::log::{debug, error, info};
use parking_lot::Mutex;

use super::marker::{InteractiveMarker, MarkerFeedbackPublisher};
use super::subscription::MarkerUpdateSink;
use crate::engine::selection::SelectableId;
use crate::messages::visualization_msgs::{
    InteractiveMarker as InteractiveMarkerMsg, InteractiveMarkerInit, InteractiveMarkerUpdate,
};

pub type SharedMarkerStore = Arc<Mutex<MarkerStore>>;

/// Every marker the server currently defines, by name.
///
/// Written from the message-delivery path, read and manipulated from the
/// render thread. Markers that leave the store hand their controls'
/// selectable ids to `retired` so the render thread can deregister them;
/// the store itself never touches the selection manager.
pub struct MarkerStore {
    markers: BTreeMap<String, InteractiveMarker>,
    retired: Vec<SelectableId>,
    clear_selection: bool,
    publisher: Arc<dyn MarkerFeedbackPublisher>,
}

impl MarkerStore {
    pub fn new(publisher: Arc<dyn MarkerFeedbackPublisher>) -> Self {
        Self {
            markers: BTreeMap::new(),
            retired: Vec::new(),
            clear_selection: false,
            publisher,
        }
    }

    pub fn shared(publisher: Arc<dyn MarkerFeedbackPublisher>) -> SharedMarkerStore {
        Arc::new(Mutex::new(Self::new(publisher)))
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&InteractiveMarker> {
        self.markers.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut InteractiveMarker> {
        self.markers.get_mut(name)
    }

    pub fn markers(&self) -> impl Iterator<Item = &InteractiveMarker> {
        self.markers.values()
    }

    pub fn markers_mut(&mut self) -> impl Iterator<Item = &mut InteractiveMarker> {
        self.markers.values_mut()
    }

    /// Selectable ids of controls that left the store since the last call.
    pub fn take_retired(&mut self) -> Vec<SelectableId> {
        std::mem::take(&mut self.retired)
    }

    /// Whether `clear` asked for the selection to be dropped since the
    /// last call.
    pub fn take_clear_selection(&mut self) -> bool {
        std::mem::take(&mut self.clear_selection)
    }

    fn retire(&mut self, mut marker: InteractiveMarker) {
        marker.release_controls();
        self.retired
            .extend(marker.controls().iter().map(|c| c.selectable_id()));
    }

    fn insert(&mut self, msg: &InteractiveMarkerMsg) {
        let marker = InteractiveMarker::from_message(msg, self.publisher.clone());
        if let Some(old) = self.markers.insert(msg.name.clone(), marker) {
            self.retire(old);
        }
    }

    fn remove_all(&mut self) {
        let markers = std::mem::take(&mut self.markers);
        for marker in markers.into_values() {
            self.retire(marker);
        }
    }

    /// Replace every marker with the contents of a full-state snapshot.
    pub fn receive_init(&mut self, init: &InteractiveMarkerInit) {
        self.remove_all();
        for msg in &init.markers {
            self.insert(msg);
        }
        info!(
            "Interactive marker snapshot from {} with {} markers",
            init.server_id,
            self.markers.len()
        );
    }

    /// Apply an incremental update: erases, then new markers, then poses.
    pub fn receive_update(&mut self, update: &InteractiveMarkerUpdate) {
        for name in &update.erases {
            match self.markers.remove(name) {
                Some(marker) => self.retire(marker),
                None => error!("Asked to erase unknown interactive marker {}", name),
            }
        }

        for msg in &update.markers {
            self.insert(msg);
        }

        for pose in &update.poses {
            match self.markers.get_mut(&pose.name) {
                Some(marker) => marker.update(pose),
                None => error!("Pose update for unknown interactive marker {}", pose.name),
            }
        }
        debug!(
            "Applied update {}: {} erased, {} added, {} poses",
            update.seq_num,
            update.erases.len(),
            update.markers.len(),
            update.poses.len()
        );
    }

    /// Drop every marker and ask the render thread to clear the selection.
    pub fn clear(&mut self) {
        self.remove_all();
        self.clear_selection = true;
    }
}

impl MarkerUpdateSink for Mutex<MarkerStore> {
    fn receive_init(&self, init: &InteractiveMarkerInit) {
        self.lock().receive_init(init);
    }

    fn receive_update(&self, update: &InteractiveMarkerUpdate) {
        self.lock().receive_update(update);
    }

    fn clear(&self) {
        self.lock().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::geometry_msgs::Point;
    use crate::messages::visualization_msgs::{
        InteractiveMarkerControl as ControlMsg, InteractiveMarkerPose,
    };
    use crate::tools::interactive_markers::marker::tests::{
        RecordingPublisher, control, marker_msg,
    };

    fn store() -> MarkerStore {
        MarkerStore::new(Arc::new(RecordingPublisher::default()))
    }

    fn init(names: &[&str]) -> InteractiveMarkerInit {
        InteractiveMarkerInit {
            server_id: "server".into(),
            seq_num: 1,
            markers: names
                .iter()
                .map(|n| marker_msg(n, vec![control("x", ControlMsg::MOVE_AXIS)]))
                .collect(),
        }
    }

    #[test]
    fn init_replaces_everything_and_retires_old_controls() {
        let mut store = store();
        store.receive_init(&init(&["a", "b"]));
        let old_id = store.get("a").unwrap().controls()[0].selectable_id();

        store.receive_init(&init(&["c"]));
        assert_eq!(store.len(), 1);
        assert!(store.get("c").is_some());

        let retired = store.take_retired();
        assert_eq!(retired.len(), 2);
        assert!(retired.contains(&old_id));
        assert!(store.take_retired().is_empty());
    }

    #[test]
    fn update_erases_before_adding_then_moves() {
        let mut store = store();
        store.receive_init(&init(&["a", "b"]));

        let mut pose = InteractiveMarkerPose {
            name: "c".into(),
            ..Default::default()
        };
        pose.header.frame_id = "world".into();
        pose.pose.position = Point {
            x: 4.0,
            y: 0.0,
            z: 0.0,
        };
        pose.pose.orientation.w = 1.0;
        let missing = InteractiveMarkerPose {
            name: "ghost".into(),
            ..Default::default()
        };

        store.receive_update(&InteractiveMarkerUpdate {
            seq_num: 2,
            update_type: InteractiveMarkerUpdate::UPDATE,
            erases: vec!["a".into(), "nobody".into()],
            markers: init(&["c"]).markers,
            poses: vec![pose, missing],
            ..Default::default()
        });

        assert!(store.get("a").is_none());
        assert!(store.get("b").is_some());
        let c = store.get("c").unwrap();
        assert_eq!(c.position().x, 4.0);
    }

    #[test]
    fn clear_requests_selection_reset() {
        let mut store = store();
        store.receive_init(&init(&["a"]));
        store.clear();
        assert!(store.is_empty());
        assert!(store.take_clear_selection());
        assert!(!store.take_clear_selection());
        assert_eq!(store.take_retired().len(), 1);
    }
}
