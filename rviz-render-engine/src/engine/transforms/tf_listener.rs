use std::sync::Arc;

use super::frame_tracker::FrameTracker;
use super::frame_tree::FrameTransformTree;
use crate::messages::tf2_msgs::TFMessage;
use crate::messages::{BusError, LocalBus, Subscription};

pub const TF_TOPIC: &str = "/tf";
const TF_QUEUE_DEPTH: usize = 100;

/// Keeps the transform tree and frame tracker fed from `/tf`.
pub struct TfListener {
    _subscription: Subscription,
}

impl TfListener {
    pub fn start(
        bus: &LocalBus,
        tree: Arc<FrameTransformTree>,
        tracker: Arc<FrameTracker>,
    ) -> Result<Self, BusError> {
        let subscription = bus.subscribe(TF_TOPIC, TF_QUEUE_DEPTH, move |msg: &TFMessage| {
            for transform in &msg.transforms {
                if tree.update(transform) {
                    tracker.receive_transform(transform);
                }
            }
        })?;
        Ok(Self {
            _subscription: subscription,
        })
    }
}
