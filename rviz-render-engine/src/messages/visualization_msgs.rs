use serde::{Deserialize, Serialize};

use super::Message;
use super::geometry_msgs::{Point, Pose, Vector3};
use super::std_msgs::{ColorRGBA, Duration, Header};

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct Marker {
    pub header: Header,
    pub ns: String,
    pub id: i32,
    #[serde(rename = "type")]
    pub marker_type: i32,
    pub action: i32,
    pub pose: Pose,
    pub scale: Vector3,
    pub color: ColorRGBA,
    pub lifetime: Duration,
    pub frame_locked: bool,
    pub points: Vec<Point>,
    pub colors: Vec<ColorRGBA>,
    pub text: String,
    pub mesh_resource: String,
    pub mesh_use_embedded_materials: bool,
}

impl Marker {
    pub const ARROW: i32 = 0;
    pub const CUBE: i32 = 1;
    pub const SPHERE: i32 = 2;
    pub const CYLINDER: i32 = 3;
    pub const LINE_STRIP: i32 = 4;
    pub const LINE_LIST: i32 = 5;
    pub const CUBE_LIST: i32 = 6;
    pub const SPHERE_LIST: i32 = 7;
    pub const POINTS: i32 = 8;
    pub const TEXT_VIEW_FACING: i32 = 9;
    pub const MESH_RESOURCE: i32 = 10;
    pub const TRIANGLE_LIST: i32 = 11;

    pub const ADD: i32 = 0;
    pub const MODIFY: i32 = 0;
    pub const DELETE: i32 = 2;
    pub const DELETEALL: i32 = 3;
}

impl Message for Marker {
    const TYPE_NAME: &'static str = "visualization_msgs/Marker";
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct MarkerArray {
    pub markers: Vec<Marker>,
}

impl Message for MarkerArray {
    const TYPE_NAME: &'static str = "visualization_msgs/MarkerArray";
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct MenuEntry {
    pub id: u32,
    pub parent_id: u32,
    pub title: String,
    pub command: String,
    pub command_type: u8,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct InteractiveMarkerControl {
    pub name: String,
    pub orientation: super::geometry_msgs::Quaternion,
    pub orientation_mode: u8,
    pub interaction_mode: u8,
    pub always_visible: bool,
    pub markers: Vec<Marker>,
    pub independent_marker_orientation: bool,
    pub description: String,
}

impl InteractiveMarkerControl {
    pub const INHERIT: u8 = 0;
    pub const FIXED: u8 = 1;
    pub const VIEW_FACING: u8 = 2;

    pub const NONE: u8 = 0;
    pub const MENU: u8 = 1;
    pub const BUTTON: u8 = 2;
    pub const MOVE_AXIS: u8 = 3;
    pub const MOVE_PLANE: u8 = 4;
    pub const ROTATE_AXIS: u8 = 5;
    pub const MOVE_ROTATE: u8 = 6;
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct InteractiveMarker {
    pub header: Header,
    pub pose: Pose,
    pub name: String,
    pub description: String,
    pub scale: f32,
    pub menu_entries: Vec<MenuEntry>,
    pub controls: Vec<InteractiveMarkerControl>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct InteractiveMarkerPose {
    pub header: Header,
    pub pose: Pose,
    pub name: String,
}

/// Full-state snapshot published on `<root>/update_full`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct InteractiveMarkerInit {
    pub server_id: String,
    pub seq_num: u64,
    pub markers: Vec<InteractiveMarker>,
}

impl Message for InteractiveMarkerInit {
    const TYPE_NAME: &'static str = "visualization_msgs/InteractiveMarkerInit";
}

/// Incremental update published on `<root>/update`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct InteractiveMarkerUpdate {
    pub server_id: String,
    pub seq_num: u64,
    #[serde(rename = "type")]
    pub update_type: u8,
    pub markers: Vec<InteractiveMarker>,
    pub poses: Vec<InteractiveMarkerPose>,
    pub erases: Vec<String>,
}

impl InteractiveMarkerUpdate {
    pub const KEEP_ALIVE: u8 = 0;
    pub const UPDATE: u8 = 1;
}

impl Message for InteractiveMarkerUpdate {
    const TYPE_NAME: &'static str = "visualization_msgs/InteractiveMarkerUpdate";
}

/// Client to server interaction report published on `<root>/feedback`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct InteractiveMarkerFeedback {
    pub header: Header,
    pub client_id: String,
    pub marker_name: String,
    pub control_name: String,
    pub event_type: u8,
    pub pose: Pose,
    pub menu_entry_id: u32,
    pub mouse_point: Point,
    pub mouse_point_valid: bool,
}

impl InteractiveMarkerFeedback {
    pub const KEEP_ALIVE: u8 = 0;
    pub const POSE_UPDATE: u8 = 1;
    pub const MENU_SELECT: u8 = 2;
    pub const BUTTON_CLICK: u8 = 3;
    pub const MOUSE_DOWN: u8 = 4;
    pub const MOUSE_UP: u8 = 5;
}

impl Message for InteractiveMarkerFeedback {
    const TYPE_NAME: &'static str = "visualization_msgs/InteractiveMarkerFeedback";
}
