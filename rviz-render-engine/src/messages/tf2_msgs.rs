use serde::{Deserialize, Serialize};

use super::Message;
use super::geometry_msgs::TransformStamped;

/// Batch of stamped transforms as broadcast on `/tf`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(default)]
pub struct TFMessage {
    pub transforms: Vec<TransformStamped>,
}

impl Message for TFMessage {
    const TYPE_NAME: &'static str = "tf2_msgs/TFMessage";
}
