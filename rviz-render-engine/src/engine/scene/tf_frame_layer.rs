use std::collections::BTreeSet;
use std::sync::Arc;

use bevy::color::LinearRgba;
use bevy::log::debug;
use bevy::math::Vec3;
use parking_lot::Mutex;

use super::axes::axis_triad;
use crate::engine::listeners::ListenerId;
use crate::engine::render::{DrawContext, Layer, LayerCapabilities, Shape};
use crate::engine::transforms::FrameTracker;

/// An axis triad at the origin of every frame seen in transform traffic.
///
/// Anchored once per frame inside [`Layer::draw`], so [`Layer::frame`]
/// stays `None`. Frames with no route to the fixed frame are skipped.
pub struct TfFrameLayer {
    tracker: Arc<FrameTracker>,
    frames: Arc<Mutex<BTreeSet<String>>>,
    listener: ListenerId,
    axes: [(Shape, LinearRgba); 3],
    scale: f32,
    enabled: bool,
}

impl TfFrameLayer {
    pub fn new(tracker: Arc<FrameTracker>) -> Self {
        let frames = Arc::new(Mutex::new(BTreeSet::new()));
        let sink = frames.clone();
        let listener = tracker.add_frame_added_listener(move |frame| {
            sink.lock().insert(frame.to_string());
        });
        // Frames seen before the listener went in.
        frames.lock().extend(tracker.available_frames());

        Self {
            tracker,
            frames,
            listener,
            axes: axis_triad(),
            scale: 1.0,
            enabled: true,
        }
    }

    pub fn frames(&self) -> Vec<String> {
        self.frames.lock().iter().cloned().collect()
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    /// Non-positive or non-finite scales are ignored.
    pub fn set_scale(&mut self, scale: f32) {
        if scale > 0.0 && scale.is_finite() {
            self.scale = scale;
        } else {
            debug!("Ignoring frame axes scale {}", scale);
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }
}

impl Drop for TfFrameLayer {
    fn drop(&mut self) {
        self.tracker.remove_frame_added_listener(self.listener);
    }
}

impl Layer for TfFrameLayer {
    fn name(&self) -> &str {
        "TF"
    }

    fn capabilities(&self) -> LayerCapabilities {
        LayerCapabilities::DRAWABLE | LayerCapabilities::FRAME_ANCHORED
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn draw(&self, ctx: &mut DrawContext<'_>) {
        let frames = self.frames.lock();
        for frame in frames.iter() {
            let Some(transform) = ctx.camera.frame_transform(frame) else {
                continue;
            };
            ctx.camera.push_m();
            ctx.camera.apply_transform(Some(&transform));
            ctx.camera.model_stack().scale(Vec3::splat(self.scale));
            for (shape, colour) in &self.axes {
                ctx.draw(shape, *colour);
            }
            ctx.camera.pop_m();
        }
    }
}

#[cfg(test)]
mod tests {
    use web_time::Instant;

    use super::*;
    use crate::engine::camera::OrbitCamera;
    use crate::engine::render::{LineCanvas, Renderer};
    use crate::engine::selection::SelectionManager;
    use crate::engine::transforms::FrameTransformTree;
    use crate::engine::transforms::tf_listener::TfListener;
    use crate::messages::LocalBus;
    use crate::messages::geometry_msgs::{Transform, TransformStamped, Vector3};
    use crate::messages::std_msgs::Header;
    use crate::messages::tf2_msgs::TFMessage;
    use crate::tools::control_manager::InteractiveControlManager;

    fn link(parent: &str, child: &str, x: f64) -> TransformStamped {
        TransformStamped {
            header: Header::with_frame(parent),
            child_frame_id: child.into(),
            transform: Transform {
                translation: Vector3 { x, y: 0.0, z: 0.0 },
                ..Default::default()
            },
        }
    }

    #[test]
    fn frames_follow_the_tracker() {
        let tracker = Arc::new(FrameTracker::new());
        tracker.add_frame("world");
        let layer = TfFrameLayer::new(tracker.clone());
        assert_eq!(layer.frames(), vec!["world"]);

        tracker.receive_transform(&link("world", "base_link", 1.0));
        assert_eq!(layer.frames(), vec!["base_link", "world"]);

        let seen = layer.frames.clone();
        drop(layer);
        tracker.add_frame("odom");
        assert!(!seen.lock().contains("odom"));
    }

    #[test]
    fn scale_rejects_degenerate_values() {
        let mut layer = TfFrameLayer::new(Arc::new(FrameTracker::new()));
        layer.set_scale(0.5);
        layer.set_scale(0.0);
        layer.set_scale(f32::NAN);
        assert_eq!(layer.scale(), 0.5);
    }

    #[test]
    fn each_resolvable_frame_gets_scaled_axes() {
        let bus = LocalBus::new();
        let tree = Arc::new(FrameTransformTree::new());
        let tracker = Arc::new(FrameTracker::new());
        let _tf = TfListener::start(&bus, tree.clone(), tracker.clone()).unwrap();
        bus.publish(
            "/tf",
            TFMessage {
                transforms: vec![link("world", "base_link", 2.0)],
            },
        )
        .unwrap();
        bus.spin_once();
        // Known but unconnected to the fixed frame.
        tracker.add_frame("orphan");

        let mut layer = TfFrameLayer::new(tracker.clone());
        layer.set_scale(0.5);
        let mut renderer = Renderer::default();
        renderer.add_layer(Box::new(layer));

        let mut camera = OrbitCamera::new(tree);
        camera.set_viewport_size(200, 200);
        let (controls, _commands) = InteractiveControlManager::new();
        let mut selection = SelectionManager::new(controls);
        let mut canvas = LineCanvas::default();
        renderer.on_draw_frame(&mut camera, &mut selection, &mut canvas, Instant::now());

        // world and base_link, three axes each.
        assert_eq!(canvas.lines().len(), 6);
        let has_x_axis = |start: Vec3, end: Vec3| {
            canvas.lines().iter().any(|line| {
                line.colour == LinearRgba::RED
                    && line.start.abs_diff_eq(start, 1e-5)
                    && line.end.abs_diff_eq(end, 1e-5)
            })
        };
        assert!(has_x_axis(Vec3::ZERO, Vec3::new(0.5, 0.0, 0.0)));
        assert!(has_x_axis(Vec3::new(2.0, 0.0, 0.0), Vec3::new(2.5, 0.0, 0.0)));
        assert_eq!(camera.model_stack().depth(), 0);
    }
}
