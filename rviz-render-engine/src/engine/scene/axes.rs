use std::sync::Arc;

use bevy::color::LinearRgba;
use bevy::math::Vec3;
use constants::render_settings::AXES_LENGTH;

use crate::engine::listeners::Listeners;
use crate::engine::render::{DrawContext, Layer, LayerCapabilities, Shape};
use crate::engine::transforms::frame_check::{FrameCheck, FrameStatus};
use crate::engine::transforms::{FrameTracker, TransformTree};

/// X, Y and Z axes of `AXES_LENGTH` in red, green and blue.
pub(crate) fn axis_triad() -> [(Shape, LinearRgba); 3] {
    let axis = |direction: Vec3| Shape::LineList(vec![Vec3::ZERO, direction * AXES_LENGTH]);
    [
        (axis(Vec3::X), LinearRgba::RED),
        (axis(Vec3::Y), LinearRgba::GREEN),
        (axis(Vec3::Z), LinearRgba::BLUE),
    ]
}

/// Red/green/blue triad drawn at the origin of one frame.
pub struct AxesLayer {
    frame: String,
    axes: [(Shape, LinearRgba); 3],
    check: Option<Arc<FrameCheck>>,
}

impl AxesLayer {
    pub fn new(frame: &str) -> Self {
        Self {
            frame: frame.to_string(),
            axes: axis_triad(),
            check: None,
        }
    }

    /// Track whether the frame is resolvable against the fixed frame,
    /// re-evaluated as frames appear and the fixed frame changes.
    pub fn watch_frame(
        &mut self,
        tree: Arc<dyn TransformTree>,
        tracker: &FrameTracker,
        fixed_frame: &str,
        fixed_frame_listeners: &Listeners<str>,
    ) {
        let check = FrameCheck::new(tree, &self.frame, fixed_frame);
        check.attach(tracker, fixed_frame_listeners);
        self.check = Some(check);
    }

    /// `None` until [`AxesLayer::watch_frame`] was called.
    pub fn status(&self) -> Option<FrameStatus> {
        self.check.as_ref().map(|c| c.status())
    }
}

impl Layer for AxesLayer {
    fn name(&self) -> &str {
        "Axes"
    }

    fn capabilities(&self) -> LayerCapabilities {
        LayerCapabilities::DRAWABLE | LayerCapabilities::FRAME_ANCHORED
    }

    fn frame(&self) -> Option<&str> {
        Some(&self.frame)
    }

    fn draw(&self, ctx: &mut DrawContext<'_>) {
        for (shape, colour) in &self.axes {
            ctx.draw(shape, *colour);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::transforms::FrameTransformTree;
    use crate::messages::geometry_msgs::TransformStamped;
    use crate::messages::std_msgs::Header;

    #[test]
    fn status_follows_frame_discovery() {
        let tree = Arc::new(FrameTransformTree::new());
        let tracker = FrameTracker::default();
        let listeners = Listeners::<str>::default();
        let mut layer = AxesLayer::new("base_link");
        assert!(layer.status().is_none());

        layer.watch_frame(tree.clone(), &tracker, "world", &listeners);
        assert!(matches!(layer.status(), Some(FrameStatus::Missing { .. })));

        let link = TransformStamped {
            header: Header::with_frame("world"),
            child_frame_id: "base_link".into(),
            transform: Default::default(),
        };
        tree.update(&link);
        tracker.receive_transform(&link);
        assert_eq!(layer.status(), Some(FrameStatus::Ok));
    }
}
