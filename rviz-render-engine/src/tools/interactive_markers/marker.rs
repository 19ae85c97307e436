use std::sync::Arc;

use bevy::log::{debug, info};
use bevy::math::{Quat, Vec2, Vec3};

use super::control::InteractiveMarkerControl;
use super::menu::{MENU_ROOT, MenuItem, MenuPrompt, MenuStep, MenuTree};
use super::modes::{FeedbackType, InteractionMode};
use crate::engine::camera::ViewSnapshot;
use crate::engine::geometry::utility::correct_quaternion;
use crate::engine::render::DrawContext;
use crate::engine::selection::MouseDownOutcome;
use crate::messages::geometry_msgs::Pose;
use crate::messages::visualization_msgs::{
    InteractiveMarker as InteractiveMarkerMsg, InteractiveMarkerPose,
};

/// Where interaction feedback goes, normally the server's feedback topic.
pub trait MarkerFeedbackPublisher: Send + Sync {
    fn publish_feedback(
        &self,
        marker: &InteractiveMarker,
        control: &InteractiveMarkerControl,
        event: FeedbackType,
    );
}

/// A server-defined marker and its controls.
///
/// Server pose updates that arrive while one of the controls is being
/// dragged are held back, only the newest one kept, and applied when the
/// drag ends so the server never fights the user's finger.
pub struct InteractiveMarker {
    name: String,
    description: String,
    frame: String,
    scale: f32,
    position: Vec3,
    orientation: Quat,
    controls: Vec<InteractiveMarkerControl>,
    menu: MenuTree,
    menu_selection: u32,
    in_action: bool,
    latest_pose: Option<InteractiveMarkerPose>,
    selected: bool,
    publisher: Arc<dyn MarkerFeedbackPublisher>,
}

impl InteractiveMarker {
    pub fn from_message(msg: &InteractiveMarkerMsg, publisher: Arc<dyn MarkerFeedbackPublisher>) -> Self {
        let position = Vec3::from(&msg.pose.position);
        let orientation = correct_quaternion(Quat::from(&msg.pose.orientation));
        let controls = msg
            .controls
            .iter()
            .map(|c| InteractiveMarkerControl::from_message(c, position, orientation))
            .collect();
        let scale = if msg.scale <= 0.0 { 1.0 } else { msg.scale };
        info!("Created interactive marker {}", msg.name);

        Self {
            name: msg.name.clone(),
            description: msg.description.clone(),
            frame: msg.header.frame_id.clone(),
            scale,
            position,
            orientation,
            controls,
            menu: MenuTree::from_entries(&msg.menu_entries),
            menu_selection: MENU_ROOT,
            in_action: false,
            latest_pose: None,
            selected: false,
            publisher,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn frame(&self) -> &str {
        &self.frame
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    pub fn pose(&self) -> Pose {
        Pose::new(self.position, self.orientation)
    }

    pub fn controls(&self) -> &[InteractiveMarkerControl] {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut [InteractiveMarkerControl] {
        &mut self.controls
    }

    /// Entries directly under `id`; `0` is the top level.
    pub fn menu_children(&self, id: u32) -> &[MenuItem] {
        self.menu.children(id)
    }

    pub fn menu_selection(&self) -> u32 {
        self.menu_selection
    }

    pub fn is_in_action(&self) -> bool {
        self.in_action
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Apply a server pose, or hold it back while a control is in action.
    pub fn update(&mut self, pose: &InteractiveMarkerPose) {
        if self.in_action {
            self.latest_pose = Some(pose.clone());
            return;
        }
        self.orientation = correct_quaternion(Quat::from(&pose.pose.orientation));
        self.position = Vec3::from(&pose.pose.position);
        if self.frame != pose.header.frame_id {
            self.frame = pose.header.frame_id.clone();
        }
        self.update_controls();
    }

    /// Start or finish a drag. Finishing flushes the newest held-back pose.
    pub fn control_in_action(&mut self, in_action: bool) {
        self.in_action = in_action;
        if in_action {
            self.latest_pose = None;
        } else if let Some(pose) = self.latest_pose.take() {
            self.update(&pose);
        }
    }

    pub fn child_rotate(&mut self, delta: Quat) {
        self.orientation = (delta * self.orientation).normalize();
        self.update_controls();
    }

    pub fn child_translate(&mut self, position: Vec3) {
        self.position = position;
        self.update_controls();
    }

    fn update_controls(&mut self) {
        for control in &mut self.controls {
            control.set_parent_pose(self.position, self.orientation);
        }
    }

    fn publish(&self, index: usize, event: FeedbackType) {
        if let Some(control) = self.controls.get(index) {
            self.publisher.publish_feedback(self, control, event);
        }
    }

    /// Drop all drag state, for markers leaving the scene mid-gesture.
    pub fn release_controls(&mut self) {
        for control in &mut self.controls {
            control.end_action();
            control.set_selected(false);
        }
        self.in_action = false;
        self.latest_pose = None;
        self.selected = false;
    }

    /// Run `draw` on every control with the marker frame on the stack.
    fn with_frame(
        &mut self,
        ctx: &mut DrawContext<'_>,
        draw: impl Fn(&mut InteractiveMarkerControl, &mut DrawContext<'_>, f32),
    ) {
        ctx.camera.push_m();
        let transform = ctx.camera.frame_transform(&self.frame);
        ctx.camera.apply_transform(transform.as_ref());
        let scale = self.scale;
        for control in &mut self.controls {
            draw(control, ctx, scale);
        }
        ctx.camera.pop_m();
    }

    pub fn draw(&mut self, ctx: &mut DrawContext<'_>) {
        self.with_frame(ctx, |control, ctx, scale| control.draw(ctx, scale));
    }

    pub fn selection_draw(&mut self, ctx: &mut DrawContext<'_>) {
        self.with_frame(ctx, |control, ctx, scale| {
            control.selection_draw(ctx, scale)
        });
    }

    // Manipulation through control `index`.

    pub fn mouse_down(&mut self, index: usize, view: &ViewSnapshot) -> MouseDownOutcome {
        let Some(mode) = self.controls.get(index).map(|c| c.mode()) else {
            return MouseDownOutcome::Manipulating;
        };
        self.publish(index, FeedbackType::MouseDown);
        self.selected = true;

        if mode == InteractionMode::Menu {
            return MouseDownOutcome::Menu(self.open_menu(index, MENU_ROOT));
        }

        let orientation = self.orientation;
        if let Some(control) = self.controls.get_mut(index) {
            control.begin_action(orientation, view);
        }
        self.control_in_action(true);
        MouseDownOutcome::Manipulating
    }

    pub fn mouse_up(&mut self, index: usize) {
        self.publish(index, FeedbackType::MouseUp);
        self.selected = false;
        if let Some(control) = self.controls.get_mut(index) {
            control.end_action();
        }
        self.control_in_action(false);
    }

    pub fn rotate(&mut self, index: usize, d_theta_degrees: f32, view: &ViewSnapshot) {
        let Some(control) = self.controls.get_mut(index) else {
            return;
        };
        let Some(delta) = control.rotation_delta(d_theta_degrees, view) else {
            return;
        };
        self.child_rotate(delta);
        self.publish(index, FeedbackType::PoseUpdate);
    }

    pub fn translate_start(&mut self, index: usize, view: &ViewSnapshot) {
        if let Some(control) = self.controls.get_mut(index) {
            control.translate_start(view);
        }
    }

    pub fn translate(&mut self, index: usize, x: f32, y: f32, view: &ViewSnapshot) {
        let Some(target) = self
            .controls
            .get(index)
            .and_then(|c| c.translate_target(x, y, view))
        else {
            return;
        };
        self.child_translate(target);
        self.publish(index, FeedbackType::PoseUpdate);
    }

    pub fn screen_position(&self, index: usize, view: &ViewSnapshot) -> Option<Vec2> {
        self.controls.get(index)?.screen_position(view)
    }

    pub fn screen_motion_vector(&self, index: usize, view: &ViewSnapshot) -> Vec2 {
        self.controls
            .get(index)
            .map_or(Vec2::ZERO, |c| c.screen_motion_vector(view))
    }

    /// Next menu level below `parent`, or `None` once a leaf was chosen and
    /// reported.
    fn open_menu(&mut self, index: usize, parent: u32) -> Option<MenuPrompt> {
        match self.menu.step(parent) {
            MenuStep::Descend(items) => Some(MenuPrompt {
                marker_name: self.name.clone(),
                control_name: self
                    .controls
                    .get(index)
                    .map(|c| c.name().to_string())
                    .unwrap_or_default(),
                items,
            }),
            MenuStep::Selected(id) => {
                debug!("Menu entry {} chosen on {}", id, self.name);
                self.menu_selection = id;
                self.publish(index, InteractionMode::Menu.feedback_type());
                None
            }
        }
    }

    /// Continue a menu shown for the control named `control_name`.
    pub fn select_menu_entry(&mut self, control_name: &str, id: u32) -> Option<MenuPrompt> {
        let index = self
            .controls
            .iter()
            .position(|c| c.name() == control_name)
            .unwrap_or(0);
        self.open_menu(index, id)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::messages::geometry_msgs::{Point, Quaternion};
    use crate::messages::std_msgs::Header;
    use crate::messages::visualization_msgs::{InteractiveMarkerControl as ControlMsg, MenuEntry};

    /// Records feedback as `(control, event, menu entry)`.
    #[derive(Default)]
    pub(crate) struct RecordingPublisher {
        pub(crate) events: Mutex<Vec<(String, FeedbackType, u32)>>,
    }

    impl MarkerFeedbackPublisher for RecordingPublisher {
        fn publish_feedback(
            &self,
            marker: &InteractiveMarker,
            control: &InteractiveMarkerControl,
            event: FeedbackType,
        ) {
            self.events
                .lock()
                .push((control.name().to_string(), event, marker.menu_selection()));
        }
    }

    pub(crate) fn marker_msg(name: &str, controls: Vec<ControlMsg>) -> InteractiveMarkerMsg {
        InteractiveMarkerMsg {
            header: Header::with_frame("world"),
            name: name.into(),
            scale: 1.0,
            pose: Pose {
                position: Point::default(),
                orientation: Quaternion {
                    w: 1.0,
                    ..Default::default()
                },
            },
            controls,
            ..Default::default()
        }
    }

    pub(crate) fn control(name: &str, mode: u8) -> ControlMsg {
        ControlMsg {
            name: name.into(),
            interaction_mode: mode,
            orientation: Quaternion {
                w: 1.0,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn pose_at(x: f64, frame: &str) -> InteractiveMarkerPose {
        InteractiveMarkerPose {
            header: Header::with_frame(frame),
            name: "m".into(),
            pose: Pose {
                position: Point { x, y: 0.0, z: 0.0 },
                orientation: Quaternion {
                    w: 1.0,
                    ..Default::default()
                },
            },
        }
    }

    #[test]
    fn poses_during_a_drag_apply_last_write_wins() {
        let publisher = Arc::new(RecordingPublisher::default());
        let mut marker = InteractiveMarker::from_message(
            &marker_msg("m", vec![control("x", ControlMsg::MOVE_AXIS)]),
            publisher,
        );

        marker.control_in_action(true);
        marker.update(&pose_at(1.0, "world"));
        marker.update(&pose_at(2.0, "odom"));
        assert_eq!(marker.position(), Vec3::ZERO);

        marker.control_in_action(false);
        assert_eq!(marker.position(), Vec3::new(2.0, 0.0, 0.0));
        assert_eq!(marker.frame(), "odom");

        marker.update(&pose_at(3.0, "odom"));
        assert_eq!(marker.position(), Vec3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn invalid_scale_and_orientation_are_corrected() {
        let mut msg = marker_msg("m", Vec::new());
        msg.scale = -2.0;
        msg.pose.orientation = Quaternion::default();
        let marker = InteractiveMarker::from_message(&msg, Arc::new(RecordingPublisher::default()));
        assert_eq!(marker.scale(), 1.0);
        assert_eq!(marker.orientation(), Quat::IDENTITY);
    }

    #[test]
    fn menu_walks_levels_and_reports_leaf() {
        let publisher = Arc::new(RecordingPublisher::default());
        let mut msg = marker_msg("m", vec![control("menu", ControlMsg::MENU)]);
        msg.menu_entries = vec![
            MenuEntry {
                id: 1,
                parent_id: 0,
                title: "Colour".into(),
                ..Default::default()
            },
            MenuEntry {
                id: 2,
                parent_id: 1,
                title: "Red".into(),
                ..Default::default()
            },
        ];
        let mut marker = InteractiveMarker::from_message(&msg, publisher.clone());
        let view = crate::engine::camera::viewport::tests::top_down_view(Vec3::ZERO, 100, 100);
        assert_eq!(marker.menu_children(1)[0].title, "Red");
        assert!(marker.menu_children(2).is_empty());

        let MouseDownOutcome::Menu(Some(prompt)) = marker.mouse_down(0, &view) else {
            panic!("menu control should open a menu");
        };
        assert_eq!(prompt.items[0].title, "Colour");
        assert!(!marker.is_in_action());

        let next = marker.select_menu_entry("menu", 1).unwrap();
        assert_eq!(next.items[0].id, 2);
        assert!(marker.select_menu_entry("menu", 2).is_none());
        assert_eq!(marker.menu_selection(), 2);

        let events = publisher.events.lock();
        assert_eq!(events[0].1, FeedbackType::MouseDown);
        assert_eq!(*events.last().unwrap(), ("menu".to_string(), FeedbackType::MenuSelect, 2));
    }

    #[test]
    fn child_rotate_premultiplies() {
        let mut marker = InteractiveMarker::from_message(
            &marker_msg("m", Vec::new()),
            Arc::new(RecordingPublisher::default()),
        );
        marker.child_rotate(Quat::from_rotation_z(0.5));
        marker.child_rotate(Quat::from_rotation_x(0.25));
        let expected = Quat::from_rotation_x(0.25) * Quat::from_rotation_z(0.5);
        assert!(marker.orientation().abs_diff_eq(expected, 1e-6));
    }
}
