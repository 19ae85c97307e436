use std::sync::Arc;

use bevy::log::{debug, info};
use bevy::math::Vec2;
use constants::camera::TAP_SLOP_PX;
use crossbeam_channel::Receiver;
use web_time::Instant;

use super::axes::AxesLayer;
use super::config::VisualizationConfig;
use super::grid::GridLayer;
use super::map_layer::MapLayer;
use super::marker_layer::MarkerLayer;
use super::point_cloud_layer::PointCloud2Layer;
use super::tf_frame_layer::TfFrameLayer;
use crate::engine::camera::{OrbitCamera, ViewSnapshot};
use crate::engine::render::{Canvas, Renderer};
use crate::engine::selection::SelectionManager;
use crate::engine::transforms::tf_listener::TfListener;
use crate::engine::transforms::{FrameTracker, FrameTransformTree};
use crate::messages::{BusError, LocalBus};
use crate::tools::control_manager::{ControlCommand, InteractiveControlManager};
use crate::tools::interactive_markers::{InteractiveMarkerLayer, MenuPrompt, SharedMarkerStore};
use crate::tools::orbit_controls::{Gesture, OrbitCameraControls};

/// One finger on the surface.
#[derive(Debug, Clone, Copy)]
struct Touch {
    start: Vec2,
    last: Vec2,
    moved: bool,
    /// Touch began on an overlay widget, which owns it until release.
    on_widget: bool,
}

/// Everything one visualisation surface needs: camera, selection, layers
/// and the bus they listen on.
///
/// All methods run on the render thread. Message delivery happens in
/// [`VisualizationScene::spin`], so callers control when bus traffic lands.
pub struct VisualizationScene {
    config: VisualizationConfig,
    bus: LocalBus,
    tracker: Arc<FrameTracker>,
    _tf_listener: TfListener,
    camera: OrbitCamera,
    selection: SelectionManager,
    gestures: OrbitCameraControls,
    renderer: Renderer,
    marker_store: SharedMarkerStore,
    touch: Option<Touch>,
}

impl VisualizationScene {
    /// Build the scene and hand back the overlay command stream for the UI.
    pub fn new(
        config: VisualizationConfig,
        bus: LocalBus,
    ) -> Result<(Self, Receiver<ControlCommand>), BusError> {
        let tree = Arc::new(FrameTransformTree::new());
        let tracker = Arc::new(FrameTracker::new());
        let tf_listener = TfListener::start(&bus, tree.clone(), tracker.clone())?;

        let mut camera = OrbitCamera::new(tree.clone());
        camera.set_fixed_frame(&config.fixed_frame);
        if let Some(target) = &config.target_frame {
            camera.set_target_frame(target);
        }
        camera.set_display_offset(config.display_offset());

        let (controls, commands) = InteractiveControlManager::new();
        let selection = SelectionManager::new(controls);

        let mut axes = AxesLayer::new(camera.fixed_frame());
        axes.watch_frame(
            tree,
            &tracker,
            camera.fixed_frame(),
            camera.fixed_frame_listeners(),
        );
        let map = MapLayer::new(&bus, &config.map_topic)?;
        let cloud = PointCloud2Layer::new(&bus, &config.point_cloud_topic)?;
        let frames = TfFrameLayer::new(tracker.clone());
        let markers = MarkerLayer::new(&bus, &config.marker_topic)?;
        let interactive =
            InteractiveMarkerLayer::new(bus.clone(), &config.marker_topic_root, &config.node_name)?;
        let marker_store = interactive.store().clone();

        let mut renderer = Renderer::default();
        renderer.add_layer(Box::new(GridLayer::default()));
        renderer.add_layer(Box::new(map));
        renderer.add_layer(Box::new(axes));
        renderer.add_layer(Box::new(frames));
        renderer.add_layer(Box::new(cloud));
        renderer.add_layer(Box::new(markers));
        renderer.add_layer(Box::new(interactive));
        info!("Scene ready with layers {:?}", renderer.layer_names());

        let scene = Self {
            config,
            bus,
            tracker,
            _tf_listener: tf_listener,
            camera,
            selection,
            gestures: OrbitCameraControls::default(),
            renderer,
            marker_store,
            touch: None,
        };
        Ok((scene, commands))
    }

    pub fn config(&self) -> &VisualizationConfig {
        &self.config
    }

    pub fn bus(&self) -> &LocalBus {
        &self.bus
    }

    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.camera
    }

    pub fn selection(&self) -> &SelectionManager {
        &self.selection
    }

    pub fn marker_store(&self) -> &SharedMarkerStore {
        &self.marker_store
    }

    pub fn available_frames(&self) -> Vec<String> {
        self.tracker.available_frames()
    }

    pub fn set_viewport_size(&mut self, width: u32, height: u32) {
        self.camera.set_viewport_size(width, height);
    }

    pub fn set_fixed_frame(&mut self, frame: &str) {
        self.camera.set_fixed_frame(frame);
    }

    /// Deliver queued bus traffic.
    pub fn spin(&self) -> usize {
        self.bus.spin_once()
    }

    pub fn on_draw_frame(&mut self, canvas: &mut dyn Canvas, now: Instant) {
        self.renderer
            .on_draw_frame(&mut self.camera, &mut self.selection, canvas, now);
    }

    fn view(&self) -> ViewSnapshot {
        self.camera.snapshot()
    }

    pub fn on_touch_down(&mut self, point: Vec2) {
        let view = self.view();
        let on_widget = self
            .selection
            .control_manager_mut()
            .begin_widget_drag(point, &view);
        self.camera.stop_fling();
        self.touch = Some(Touch {
            start: point,
            last: point,
            moved: false,
            on_widget,
        });
    }

    pub fn on_touch_move(&mut self, point: Vec2) {
        let Some(mut touch) = self.touch else {
            return;
        };
        if touch.on_widget {
            let view = self.view();
            self.selection
                .control_manager_mut()
                .drag_widget(point, &view);
            return;
        }

        if !touch.moved && touch.start.distance(point) <= TAP_SLOP_PX {
            return;
        }
        touch.moved = true;
        let distance = touch.last - point;
        touch.last = point;
        self.touch = Some(touch);
        self.handle_gesture(Gesture::Drag { distance });
    }

    /// A release that never left the tap slop is a tap.
    pub fn on_touch_up(&mut self, point: Vec2) {
        let Some(touch) = self.touch.take() else {
            return;
        };
        if touch.on_widget {
            self.selection.control_manager_mut().end_widget_drag();
        } else if !touch.moved {
            self.handle_gesture(Gesture::Tap { position: point });
        }
    }

    /// Multi-touch and fling gestures decoded by the host.
    pub fn handle_gesture(&mut self, gesture: Gesture) -> bool {
        self.gestures
            .handle(gesture, &mut self.camera, &mut self.selection)
    }

    /// Continue a menu the user is walking. Returns the next level, which is
    /// also sent to the overlay.
    pub fn select_menu_entry(&mut self, prompt: &MenuPrompt, id: u32) -> Option<MenuPrompt> {
        let next = match self.marker_store.lock().get_mut(&prompt.marker_name) {
            Some(marker) => marker.select_menu_entry(&prompt.control_name, id),
            None => {
                debug!("Menu for vanished marker {}", prompt.marker_name);
                None
            }
        };

        let controls = self.selection.control_manager_mut();
        match &next {
            Some(level) => controls.show_menu(level.clone()),
            None => controls.dismiss_menu(),
        }
        next
    }

    /// Abandon an open menu without choosing anything.
    pub fn dismiss_menu(&mut self) {
        self.selection.control_manager_mut().dismiss_menu();
    }
}

#[cfg(test)]
mod tests {
    use bevy::math::Vec3;
    use parking_lot::Mutex;

    use super::*;
    use crate::engine::render::LineCanvas;
    use crate::messages::geometry_msgs::{Quaternion, Vector3};
    use crate::messages::visualization_msgs::{
        InteractiveMarker as MarkerMsg, InteractiveMarkerControl as ControlMsg,
        InteractiveMarkerFeedback, InteractiveMarkerInit, Marker, MenuEntry,
    };
    use crate::tools::control_manager::ControlWidget;
    use crate::tools::interactive_markers::marker::tests::{control, marker_msg};

    fn with_cube(mut msg: ControlMsg) -> ControlMsg {
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

    fn scene_with(
        markers: Vec<MarkerMsg>,
    ) -> (VisualizationScene, Receiver<ControlCommand>, LineCanvas) {
        let bus = LocalBus::new();
        let (mut scene, commands) =
            VisualizationScene::new(VisualizationConfig::default(), bus.clone()).unwrap();
        scene.set_viewport_size(200, 200);
        bus.publish(
            "/basic_controls/update_full",
            InteractiveMarkerInit {
                seq_num: 1,
                markers,
                ..Default::default()
            },
        )
        .unwrap();
        scene.spin();

        let mut canvas = LineCanvas::default();
        scene.on_draw_frame(&mut canvas, Instant::now());
        (scene, commands, canvas)
    }

    fn tap(scene: &mut VisualizationScene, canvas: &mut LineCanvas, point: Vec2) {
        scene.on_touch_down(point);
        scene.on_touch_move(point + Vec2::new(2.0, 0.0));
        scene.on_touch_up(point);
        scene.on_draw_frame(canvas, Instant::now());
    }

    #[test]
    fn tap_then_widget_drag_moves_the_marker() {
        let plane = with_cube(control("plane", ControlMsg::MOVE_PLANE));
        let (mut scene, commands, mut canvas) = scene_with(vec![marker_msg("box", vec![plane])]);

        let centre = scene.camera().snapshot().project(Vec3::ZERO).unwrap();
        tap(&mut scene, &mut canvas, centre + Vec2::new(3.0, 7.0));
        assert!(scene.selection().interactive_mode());
        assert!(
            commands
                .try_iter()
                .any(|c| c == ControlCommand::Show(ControlWidget::Translate2D))
        );

        let pad = scene
            .selection()
            .control_manager()
            .overlay()
            .widget(ControlWidget::Translate2D)
            .centre;
        let target = scene
            .camera()
            .snapshot()
            .project(Vec3::new(0.0, 1.0, 0.0))
            .unwrap();
        scene.on_touch_down(pad);
        scene.on_touch_move(target);
        assert!(scene.selection().control_manager().is_moving());
        scene.on_touch_up(target);
        assert!(!scene.selection().control_manager().is_moving());

        let position = scene.marker_store().lock().get("box").unwrap().position();
        assert!(position.abs_diff_eq(Vec3::new(0.0, 1.0, 0.0), 1e-3));
    }

    #[test]
    fn drag_outside_the_slop_orbits_instead_of_picking() {
        let (mut scene, _commands, _canvas) = scene_with(Vec::new());
        let (theta, phi) = scene.camera().angles();

        scene.on_touch_down(Vec2::new(100.0, 100.0));
        scene.on_touch_move(Vec2::new(140.0, 100.0));
        scene.on_touch_up(Vec2::new(140.0, 100.0));

        assert!(!scene.selection().is_selection_draw());
        let (new_theta, new_phi) = scene.camera().angles();
        assert_eq!(new_theta, theta);
        assert!((new_phi - phi + 10f32.to_radians()).abs() < 1e-5);
    }

    #[test]
    fn menu_levels_reach_the_overlay_and_the_leaf_is_published() {
        let mut marker = marker_msg(
            "menu",
            vec![with_cube(control("menu", ControlMsg::MENU))],
        );
        let entry = |id: u32, parent_id: u32, title: &str| MenuEntry {
            id,
            parent_id,
            title: title.into(),
            ..Default::default()
        };
        marker.menu_entries = vec![entry(1, 0, "Colour"), entry(2, 1, "Red")];

        let (mut scene, _commands, mut canvas) = scene_with(vec![marker]);
        let feedback = Arc::new(Mutex::new(Vec::<InteractiveMarkerFeedback>::new()));
        let sink = feedback.clone();
        let _feedback_sub = scene
            .bus()
            .subscribe(
                "/basic_controls/feedback",
                10,
                move |f: &InteractiveMarkerFeedback| sink.lock().push(f.clone()),
            )
            .unwrap();

        let centre = scene.camera().snapshot().project(Vec3::ZERO).unwrap();
        tap(&mut scene, &mut canvas, centre + Vec2::new(3.0, 7.0));
        let prompt = scene
            .selection()
            .control_manager()
            .overlay()
            .menu
            .clone()
            .unwrap();
        assert_eq!(prompt.items.len(), 1);
        assert!(!scene.selection().interactive_mode());

        let second = scene.select_menu_entry(&prompt, 1).unwrap();
        assert_eq!(second.items[0].id, 2);
        assert!(scene.select_menu_entry(&second, 2).is_none());
        assert!(scene.selection().control_manager().overlay().menu.is_none());

        scene.spin();
        let last = feedback.lock().last().cloned().unwrap();
        assert_eq!(last.event_type, InteractiveMarkerFeedback::MENU_SELECT);
        assert_eq!(last.menu_entry_id, 2);
    }
}
