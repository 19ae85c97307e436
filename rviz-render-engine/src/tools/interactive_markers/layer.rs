use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use bevy::log::{debug, error, info};
use constants::interactive_markers::{CLIENT_ID_SUFFIX, FEEDBACK_SUFFIX};
use parking_lot::RwLock;

use super::control::InteractiveMarkerControl;
use super::handle::ControlHandle;
use super::marker::{InteractiveMarker, MarkerFeedbackPublisher};
use super::menu::MenuPrompt;
use super::modes::FeedbackType;
use super::store::{MarkerStore, SharedMarkerStore};
use super::subscription::{InteractiveMarkerSubscriptionManager, MarkerUpdateSink};
use crate::engine::render::{DrawContext, FrameContext, Layer, LayerCapabilities};
use crate::engine::selection::SelectableId;
use crate::messages::geometry_msgs::Point;
use crate::messages::std_msgs::{Header, Time};
use crate::messages::visualization_msgs::InteractiveMarkerFeedback;
use crate::messages::{BusError, LocalBus};

/// Publishes marker feedback on `<topic root>/feedback`.
pub struct BusFeedbackPublisher {
    bus: LocalBus,
    topic: RwLock<String>,
    client_id: String,
    seq: AtomicU32,
}

impl BusFeedbackPublisher {
    pub fn new(bus: LocalBus, topic_root: &str, node_name: &str) -> Self {
        Self {
            bus,
            topic: RwLock::new(format!("{topic_root}{FEEDBACK_SUFFIX}")),
            client_id: format!("{node_name}{CLIENT_ID_SUFFIX}"),
            seq: AtomicU32::new(0),
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn set_topic(&self, topic_root: &str) {
        *self.topic.write() = format!("{topic_root}{FEEDBACK_SUFFIX}");
    }
}

impl MarkerFeedbackPublisher for BusFeedbackPublisher {
    fn publish_feedback(
        &self,
        marker: &InteractiveMarker,
        control: &InteractiveMarkerControl,
        event: FeedbackType,
    ) {
        let pose = marker.pose();
        let mut header = Header::with_frame(marker.frame());
        header.seq = self.seq.fetch_add(1, Ordering::Relaxed);
        header.stamp = Time::now();

        let feedback = InteractiveMarkerFeedback {
            header,
            client_id: self.client_id.clone(),
            marker_name: marker.name().to_string(),
            control_name: control.name().to_string(),
            event_type: event.wire(),
            pose,
            menu_entry_id: marker.menu_selection(),
            mouse_point: Point::from(marker.position()),
            mouse_point_valid: true,
        };

        let topic = self.topic.read().clone();
        if let Err(e) = self.bus.publish(&topic, feedback) {
            error!("Could not publish marker feedback: {}", e);
        }
    }
}

/// Interactive markers served on one topic root.
///
/// Marker state arrives on the bus through the subscription manager and
/// lands in the shared store. On the render thread, `prepare` reconciles
/// the store with the selection manager: new controls get a pick colour,
/// controls that left the store give theirs back. The store lock is never
/// held while the selection manager runs, since deselecting calls back
/// into control handles that take it.
pub struct InteractiveMarkerLayer {
    store: SharedMarkerStore,
    publisher: Arc<BusFeedbackPublisher>,
    subscription: InteractiveMarkerSubscriptionManager,
    enabled: bool,
}

impl InteractiveMarkerLayer {
    pub fn new(bus: LocalBus, topic_root: &str, node_name: &str) -> Result<Self, BusError> {
        let publisher = Arc::new(BusFeedbackPublisher::new(bus.clone(), topic_root, node_name));
        let store = MarkerStore::shared(publisher.clone());
        let sink: Arc<dyn MarkerUpdateSink> = store.clone();
        let subscription = InteractiveMarkerSubscriptionManager::new(bus, topic_root, sink)?;
        info!("Interactive marker layer on {}", topic_root);

        Ok(Self {
            store,
            publisher,
            subscription,
            enabled: true,
        })
    }

    pub fn store(&self) -> &SharedMarkerStore {
        &self.store
    }

    pub fn subscription(&self) -> &InteractiveMarkerSubscriptionManager {
        &self.subscription
    }

    pub fn client_id(&self) -> &str {
        self.publisher.client_id()
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Follow another marker server. Existing markers stay until the new
    /// server's snapshot replaces them.
    pub fn set_topic(&self, topic_root: &str) {
        self.subscription.set_topic(topic_root);
        self.publisher.set_topic(topic_root);
    }

    /// Continue the menu the user opened on `marker`/`control`.
    pub fn select_menu_entry(&self, marker: &str, control: &str, id: u32) -> Option<MenuPrompt> {
        let mut store = self.store.lock();
        let Some(marker) = store.get_mut(marker) else {
            debug!("Menu entry for vanished marker {}", marker);
            return None;
        };
        marker.select_menu_entry(control, id)
    }

    /// Selectable controls without a pick colour yet, as `(marker, index, id)`.
    fn unregistered_controls(store: &MarkerStore) -> Vec<(String, usize, SelectableId)> {
        store
            .markers()
            .flat_map(|marker| {
                marker
                    .controls()
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| c.is_selectable() && c.pick_colour().is_none())
                    .map(|(i, c)| (marker.name().to_string(), i, c.selectable_id()))
            })
            .collect()
    }
}

impl Layer for InteractiveMarkerLayer {
    fn name(&self) -> &str {
        "Interactive Markers"
    }

    fn capabilities(&self) -> LayerCapabilities {
        LayerCapabilities::DRAWABLE | LayerCapabilities::SELECTABLE
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn prepare(&mut self, frame: &mut FrameContext<'_>) {
        #[cfg(target_arch = "wasm32")]
        self.subscription.check_watchdog(frame.now);

        let (retired, clear, pending) = {
            let mut store = self.store.lock();
            (
                store.take_retired(),
                store.take_clear_selection(),
                Self::unregistered_controls(&store),
            )
        };

        if clear {
            frame.selection.clear_selection();
        }
        for id in retired {
            frame.selection.remove_selectable(id);
        }
        if pending.is_empty() {
            return;
        }

        let colours: Vec<_> = pending
            .into_iter()
            .map(|(marker, index, id)| {
                let handle = ControlHandle::new(self.store.clone(), &marker, index, id);
                let colour = frame.selection.register_selectable(Arc::new(handle));
                (marker, index, id, colour)
            })
            .collect();

        let mut store = self.store.lock();
        for (marker, index, id, colour) in colours {
            let control = store
                .get_mut(&marker)
                .and_then(|m| m.controls_mut().get_mut(index))
                .filter(|c| c.selectable_id() == id);
            match control {
                Some(control) => control.set_pick_colour(Some(colour)),
                // Replaced between the two locks; the store already retired it.
                None => debug!("Control {}[{}] left before registration", marker, index),
            }
        }
    }

    fn draw(&self, ctx: &mut DrawContext<'_>) {
        let mut store = self.store.lock();
        for marker in store.markers_mut() {
            marker.draw(ctx);
        }
    }

    fn selection_draw(&self, ctx: &mut DrawContext<'_>) {
        let mut store = self.store.lock();
        for marker in store.markers_mut() {
            marker.selection_draw(ctx);
        }
    }
}

#[cfg(test)]
mod tests {
    use bevy::math::Vec3;
    use parking_lot::Mutex;
    use web_time::Instant;

    use super::*;
    use crate::engine::camera::OrbitCamera;
    use crate::engine::render::{LineCanvas, Renderer};
    use crate::engine::selection::SelectionManager;
    use crate::engine::transforms::FrameTransformTree;
    use crate::messages::geometry_msgs::{Quaternion, Vector3};
    use crate::messages::visualization_msgs::{
        InteractiveMarkerControl as ControlMsg, InteractiveMarkerInit, Marker,
    };
    use crate::tools::control_manager::{ControlWidget, InteractiveControlManager};
    use crate::tools::interactive_markers::marker::tests::{control, marker_msg};

    fn cube_plane_control() -> ControlMsg {
        let mut msg = control("plane", ControlMsg::MOVE_PLANE);
        let mut cube = Marker {
            marker_type: Marker::CUBE,
            scale: Vector3 {
                x: 1.0,
                y: 1.0,
                z: 1.0,
            },
            ..Default::default()
        };
        cube.pose.orientation = Quaternion {
            w: 1.0,
            ..Default::default()
        };
        msg.markers = vec![cube];
        msg
    }

    #[test]
    fn picked_control_drags_marker_and_reports_feedback() {
        let bus = LocalBus::new();
        let feedback = Arc::new(Mutex::new(Vec::<InteractiveMarkerFeedback>::new()));
        let sink = feedback.clone();
        let _feedback_sub = bus
            .subscribe("/im/feedback", 10, move |f: &InteractiveMarkerFeedback| {
                sink.lock().push(f.clone())
            })
            .unwrap();

        let layer = InteractiveMarkerLayer::new(bus.clone(), "/im", "viewer").unwrap();
        let store = layer.store().clone();
        bus.publish(
            "/im/update_full",
            InteractiveMarkerInit {
                seq_num: 1,
                markers: vec![marker_msg("box", vec![cube_plane_control()])],
                ..Default::default()
            },
        )
        .unwrap();
        bus.spin_once();
        assert_eq!(store.lock().len(), 1);

        let tree = Arc::new(FrameTransformTree::new());
        let mut camera = OrbitCamera::new(tree);
        camera.set_viewport_size(200, 200);
        let (controls, _commands) = InteractiveControlManager::new();
        let mut selection = SelectionManager::new(controls);
        let mut renderer = Renderer::default();
        renderer.add_layer(Box::new(layer));
        let mut canvas = LineCanvas::default();

        renderer.on_draw_frame(&mut camera, &mut selection, &mut canvas, Instant::now());
        assert_eq!(selection.registered_count(), 1);

        let centre = camera.snapshot().project(Vec3::ZERO).unwrap();
        selection.begin_selection_draw(centre.x + 3.0, centre.y + 7.0);
        renderer.on_draw_frame(&mut camera, &mut selection, &mut canvas, Instant::now());
        assert!(selection.interactive_mode());
        assert!(store.lock().get("box").unwrap().is_in_action());

        let view = camera.snapshot();
        let target = view.project(Vec3::new(0.0, 1.0, 0.0)).unwrap();
        selection
            .control_manager_mut()
            .on_translate(ControlWidget::Translate2D, target.x, target.y, &view);
        let position = store.lock().get("box").unwrap().position();
        assert!(position.abs_diff_eq(Vec3::new(0.0, 1.0, 0.0), 1e-3));

        bus.spin_once();
        let feedback = feedback.lock();
        let events: Vec<u8> = feedback.iter().map(|f| f.event_type).collect();
        assert_eq!(
            events,
            vec![
                InteractiveMarkerFeedback::MOUSE_DOWN,
                InteractiveMarkerFeedback::POSE_UPDATE
            ]
        );
        assert_eq!(feedback[0].client_id, "viewer/Interactive Markers");
        assert_eq!(feedback[1].header.seq, 1);
        assert!((feedback[1].pose.position.y - 1.0).abs() < 1e-3);
    }

    #[test]
    fn erased_markers_give_back_their_colours() {
        let bus = LocalBus::new();
        let mut layer = InteractiveMarkerLayer::new(bus, "/im", "viewer").unwrap();
        layer.store().lock().receive_init(&InteractiveMarkerInit {
            markers: vec![marker_msg("box", vec![cube_plane_control()])],
            ..Default::default()
        });

        let (controls, _commands) = InteractiveControlManager::new();
        let mut selection = SelectionManager::new(controls);
        let mut frame = FrameContext {
            selection: &mut selection,
            now: Instant::now(),
        };
        layer.prepare(&mut frame);
        assert_eq!(frame.selection.registered_count(), 1);

        layer.store().lock().clear();
        layer.prepare(&mut frame);
        assert_eq!(frame.selection.registered_count(), 0);
    }
}
