//! In-process interactive marker server for the preview app.
//!
//! Serves three markers on one topic root: a 6-DOF box with a move and a
//! rotate control per axis, a view-facing box dragged in the screen plane,
//! and a box with a two-level context menu. Pose feedback is echoed back
//! as pose updates, which is what keeps other clients (and this one after
//! a resync) in step with the drag.

use std::sync::Arc;

use bevy::log::{debug, error, info};
use bevy::math::{Quat, Vec3};
use constants::coordinate_system::DEFAULT_FIXED_FRAME;
use constants::interactive_markers::{FEEDBACK_SUFFIX, UPDATE_FULL_SUFFIX, UPDATE_SUFFIX};
use parking_lot::Mutex;

use crate::engine::transforms::tf_listener::TF_TOPIC;
use crate::messages::geometry_msgs::{Pose, Quaternion, Transform, TransformStamped, Vector3};
use crate::messages::std_msgs::{ColorRGBA, Header, Time};
use crate::messages::tf2_msgs::TFMessage;
use crate::messages::visualization_msgs::{
    InteractiveMarker, InteractiveMarkerControl as ControlMsg, InteractiveMarkerFeedback,
    InteractiveMarkerInit, InteractiveMarkerPose, InteractiveMarkerUpdate, Marker, MenuEntry,
};
use crate::messages::{BusError, LocalBus, Subscription};

const SERVER_ID: &str = "demo_marker_server";
const MARKER_FRAME: &str = "base_link";

struct ServerState {
    seq_num: u64,
    markers: Vec<InteractiveMarker>,
}

impl ServerState {
    /// Record a client's drag. Returns the update to broadcast, if any.
    fn handle_feedback(&mut self, feedback: &InteractiveMarkerFeedback) -> Option<InteractiveMarkerUpdate> {
        match feedback.event_type {
            InteractiveMarkerFeedback::POSE_UPDATE => {
                let Some(marker) = self.markers.iter_mut().find(|m| m.name == feedback.marker_name)
                else {
                    debug!("Feedback for unknown marker {}", feedback.marker_name);
                    return None;
                };
                marker.pose = feedback.pose;
                marker.header.frame_id = feedback.header.frame_id.clone();
                self.seq_num += 1;

                Some(InteractiveMarkerUpdate {
                    server_id: SERVER_ID.to_string(),
                    seq_num: self.seq_num,
                    update_type: InteractiveMarkerUpdate::UPDATE,
                    poses: vec![InteractiveMarkerPose {
                        header: marker.header.clone(),
                        pose: marker.pose,
                        name: marker.name.clone(),
                    }],
                    ..Default::default()
                })
            }
            InteractiveMarkerFeedback::MENU_SELECT => {
                info!(
                    "{} picked menu entry {} on {}",
                    feedback.client_id, feedback.menu_entry_id, feedback.marker_name
                );
                None
            }
            event => {
                debug!("Feedback {} on {}/{}", event, feedback.marker_name, feedback.control_name);
                None
            }
        }
    }

    fn snapshot(&self) -> InteractiveMarkerInit {
        InteractiveMarkerInit {
            server_id: SERVER_ID.to_string(),
            seq_num: self.seq_num,
            markers: self.markers.clone(),
        }
    }

    fn keep_alive(&self) -> InteractiveMarkerUpdate {
        InteractiveMarkerUpdate {
            server_id: SERVER_ID.to_string(),
            seq_num: self.seq_num,
            update_type: InteractiveMarkerUpdate::KEEP_ALIVE,
            ..Default::default()
        }
    }
}

pub struct DemoMarkerServer {
    bus: LocalBus,
    full_topic: String,
    update_topic: String,
    state: Arc<Mutex<ServerState>>,
    _feedback: Subscription,
}

impl DemoMarkerServer {
    pub fn start(bus: LocalBus, topic_root: &str) -> Result<Self, BusError> {
        let update_topic = format!("{topic_root}{UPDATE_SUFFIX}");
        let state = Arc::new(Mutex::new(ServerState {
            seq_num: 1,
            markers: vec![six_dof_marker(), view_facing_marker(), menu_marker()],
        }));

        let handler_state = state.clone();
        let handler_bus = bus.clone();
        let handler_topic = update_topic.clone();
        let feedback = bus.subscribe(
            &format!("{topic_root}{FEEDBACK_SUFFIX}"),
            100,
            move |feedback: &InteractiveMarkerFeedback| {
                let update = handler_state.lock().handle_feedback(feedback);
                if let Some(update) = update {
                    if let Err(e) = handler_bus.publish(&handler_topic, update) {
                        error!("Could not publish marker update: {}", e);
                    }
                }
            },
        )?;
        info!("Demo marker server on {}", topic_root);

        Ok(Self {
            bus,
            full_topic: format!("{topic_root}{UPDATE_FULL_SUFFIX}"),
            update_topic,
            state,
            _feedback: feedback,
        })
    }

    /// Periodic broadcast: the frame tree, the current snapshot for clients
    /// still synchronising, and a keep-alive.
    pub fn tick(&self) -> Result<(), BusError> {
        let (snapshot, keep_alive) = {
            let state = self.state.lock();
            (state.snapshot(), state.keep_alive())
        };
        self.bus.publish(TF_TOPIC, frame_tree())?;
        self.bus.publish(&self.full_topic, snapshot)?;
        self.bus.publish(&self.update_topic, keep_alive)?;
        Ok(())
    }

    pub fn seq_num(&self) -> u64 {
        self.state.lock().seq_num
    }

    pub fn marker_pose(&self, name: &str) -> Option<Pose> {
        self.state
            .lock()
            .markers
            .iter()
            .find(|m| m.name == name)
            .map(|m| m.pose)
    }
}

fn frame_tree() -> TFMessage {
    let link = |parent: &str, child: &str, offset: Vec3| TransformStamped {
        header: Header {
            stamp: Time::now(),
            ..Header::with_frame(parent)
        },
        child_frame_id: child.to_string(),
        transform: Transform {
            translation: Vector3::from(offset),
            rotation: Quaternion::from(Quat::IDENTITY),
        },
    };
    TFMessage {
        transforms: vec![
            link(DEFAULT_FIXED_FRAME, MARKER_FRAME, Vec3::ZERO),
            link(MARKER_FRAME, "sensor", Vec3::new(0.0, 0.0, 1.0)),
        ],
    }
}

fn grey_box(scale: f32) -> Marker {
    Marker {
        marker_type: Marker::CUBE,
        scale: Vector3::from(Vec3::splat(scale * 0.45)),
        color: ColorRGBA {
            r: 0.5,
            g: 0.5,
            b: 0.5,
            a: 1.0,
        },
        pose: Pose::new(Vec3::ZERO, Quat::IDENTITY),
        ..Default::default()
    }
}

fn base_marker(name: &str, description: &str, position: Vec3) -> InteractiveMarker {
    InteractiveMarker {
        header: Header::with_frame(MARKER_FRAME),
        pose: Pose::new(position, Quat::IDENTITY),
        name: name.to_string(),
        description: description.to_string(),
        scale: 1.0,
        ..Default::default()
    }
}

/// Control whose X axis is rotated onto `axis`.
fn axis_control(name: &str, mode: u8, w: f32, x: f32, y: f32, z: f32) -> ControlMsg {
    ControlMsg {
        name: name.to_string(),
        orientation: Quaternion::from(Quat::from_xyzw(x, y, z, w).normalize()),
        interaction_mode: mode,
        ..Default::default()
    }
}

fn six_dof_marker() -> InteractiveMarker {
    let mut marker = base_marker("simple_6dof", "Simple 6-DOF Control", Vec3::new(-3.0, 0.0, 0.0));
    marker.controls.push(ControlMsg {
        name: "box".to_string(),
        always_visible: true,
        markers: vec![grey_box(marker.scale)],
        ..Default::default()
    });
    for (axis, (x, y, z)) in [("x", (1.0, 0.0, 0.0)), ("z", (0.0, 1.0, 0.0)), ("y", (0.0, 0.0, 1.0))] {
        marker.controls.push(axis_control(
            &format!("rotate_{axis}"),
            ControlMsg::ROTATE_AXIS,
            1.0,
            x,
            y,
            z,
        ));
        marker.controls.push(axis_control(
            &format!("move_{axis}"),
            ControlMsg::MOVE_AXIS,
            1.0,
            x,
            y,
            z,
        ));
    }
    marker
}

fn view_facing_marker() -> InteractiveMarker {
    let mut marker = base_marker("view_facing", "View Facing 6-DOF", Vec3::new(0.0, 3.0, 0.0));
    marker.controls.push(ControlMsg {
        name: "move_plane".to_string(),
        orientation_mode: ControlMsg::VIEW_FACING,
        interaction_mode: ControlMsg::MOVE_PLANE,
        independent_marker_orientation: true,
        always_visible: true,
        markers: vec![grey_box(marker.scale)],
        ..Default::default()
    });
    marker
}

fn menu_marker() -> InteractiveMarker {
    let mut marker = base_marker("context_menu", "Context Menu", Vec3::new(3.0, 0.0, 0.0));
    let entry = |id: u32, parent_id: u32, title: &str| MenuEntry {
        id,
        parent_id,
        title: title.to_string(),
        ..Default::default()
    };
    marker.menu_entries = vec![
        entry(1, 0, "First Entry"),
        entry(2, 0, "Second Entry"),
        entry(3, 0, "Submenu"),
        entry(4, 3, "First Sub Entry"),
        entry(5, 3, "Second Sub Entry"),
    ];
    marker.controls.push(ControlMsg {
        name: "menu".to_string(),
        interaction_mode: ControlMsg::MENU,
        always_visible: true,
        markers: vec![grey_box(marker.scale)],
        ..Default::default()
    });
    marker
}
