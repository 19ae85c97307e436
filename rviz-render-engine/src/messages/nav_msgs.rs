use serde::{Deserialize, Serialize};

use super::Message;
use super::geometry_msgs::Pose;
use super::std_msgs::{Header, Time};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
#[serde(default)]
pub struct MapMetaData {
    pub map_load_time: Time,
    /// Cell edge length in metres.
    pub resolution: f32,
    pub width: u32,
    pub height: u32,
    /// Pose of cell (0, 0) in the map frame.
    pub origin: Pose,
}

/// Row-major occupancy values: 0 free, 100 occupied, -1 unknown.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct OccupancyGrid {
    pub header: Header,
    pub info: MapMetaData,
    pub data: Vec<i8>,
}

impl Message for OccupancyGrid {
    const TYPE_NAME: &'static str = "nav_msgs/OccupancyGrid";
}
