use bevy::color::LinearRgba;
use bevy::log::{debug, error};
use bevy::math::{Mat4, Quat, Vec2, Vec3};
use constants::interactive_markers::MIN_SCREEN_AXIS_LENGTH;

use super::control_marker::{auto_markers, selected_colour};
use super::modes::{InteractionMode, OrientationMode};
use crate::engine::camera::ViewSnapshot;
use crate::engine::geometry::Ray;
use crate::engine::geometry::utility::{contains_nan, correct_quaternion};
use crate::engine::render::{DrawContext, MarkerGeometry};
use crate::engine::selection::{SelectableId, SelectionColor};
use crate::messages::visualization_msgs::InteractiveMarkerControl as ControlMsg;

/// Matrices seen by the last draw of a control.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlCapture {
    /// Control space to world, including marker scale.
    pub model: Mat4,
    /// Marker frame to world.
    pub parent: Mat4,
}

impl ControlCapture {
    pub fn world_position(&self) -> Vec3 {
        self.model.w_axis.truncate()
    }

    pub fn world_x_axis(&self) -> Vec3 {
        self.model.x_axis.truncate().normalize_or_zero()
    }

    /// World point back into the marker frame.
    pub fn to_marker_frame(&self, world: Vec3) -> Vec3 {
        self.parent.inverse().transform_point3(world)
    }
}

/// The control X axis projected onto the screen at drag start.
#[derive(Debug, Clone, Copy, PartialEq)]
struct ScreenRay {
    start: Vec2,
    direction: Vec2,
}

/// One manipulable handle of an interactive marker.
///
/// The control only knows its own geometry and the last parent pose it
/// was given. Everything that changes the marker goes through
/// [`super::marker::InteractiveMarker`], which owns the controls.
pub struct InteractiveMarkerControl {
    name: String,
    description: String,
    mode: InteractionMode,
    orientation_mode: OrientationMode,
    orientation: Quat,
    x_axis: Vec3,
    /// Rotation axis in world space, resolved on mouse down.
    axis: Vec3,
    view_facing: bool,
    always_visible: bool,
    markers: Vec<MarkerGeometry>,

    draw_position: Vec3,
    draw_orientation: Quat,
    capture: Option<ControlCapture>,
    screen_ray: Option<ScreenRay>,

    selectable_id: SelectableId,
    pick_colour: Option<SelectionColor>,
    selected: bool,
    in_action: bool,
}

impl InteractiveMarkerControl {
    pub fn from_message(
        msg: &ControlMsg,
        parent_position: Vec3,
        parent_orientation: Quat,
    ) -> Self {
        let mode = InteractionMode::from_wire(msg.interaction_mode);
        let orientation_mode = OrientationMode::from_wire(msg.orientation_mode);
        let orientation = correct_quaternion(Quat::from(&msg.orientation));
        let view_facing =
            !msg.independent_marker_orientation && orientation_mode == OrientationMode::ViewFacing;

        let mut markers: Vec<MarkerGeometry> = msg
            .markers
            .iter()
            .filter_map(MarkerGeometry::from_message)
            .collect();
        if msg.markers.is_empty() {
            markers = auto_markers(mode, orientation);
        }
        debug!(
            "Created interactive marker control {} ({:?}, {} markers)",
            msg.name,
            mode,
            markers.len()
        );

        let mut control = Self {
            name: msg.name.clone(),
            description: msg.description.clone(),
            mode,
            orientation_mode,
            orientation,
            x_axis: orientation * Vec3::X,
            axis: orientation * Vec3::X,
            view_facing,
            always_visible: msg.always_visible,
            markers,
            draw_position: parent_position,
            draw_orientation: orientation,
            capture: None,
            screen_ray: None,
            selectable_id: SelectableId::allocate(),
            pick_colour: None,
            selected: false,
            in_action: false,
        };
        control.set_parent_pose(parent_position, parent_orientation);
        control
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn orientation_mode(&self) -> OrientationMode {
        self.orientation_mode
    }

    pub fn is_view_facing(&self) -> bool {
        self.view_facing
    }

    pub fn is_always_visible(&self) -> bool {
        self.always_visible
    }

    pub fn markers(&self) -> &[MarkerGeometry] {
        &self.markers
    }

    /// Controls without an interaction mode are scenery, never picked.
    pub fn is_selectable(&self) -> bool {
        self.mode != InteractionMode::None
    }

    pub fn selectable_id(&self) -> SelectableId {
        self.selectable_id
    }

    pub fn pick_colour(&self) -> Option<SelectionColor> {
        self.pick_colour
    }

    pub fn set_pick_colour(&mut self, colour: Option<SelectionColor>) {
        self.pick_colour = colour;
    }

    pub fn set_selected(&mut self, selected: bool) {
        self.selected = selected;
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn is_in_action(&self) -> bool {
        self.in_action
    }

    pub fn capture(&self) -> Option<ControlCapture> {
        self.capture
    }

    pub fn axis(&self) -> Vec3 {
        self.axis
    }

    pub fn set_parent_pose(&mut self, position: Vec3, orientation: Quat) {
        self.draw_position = position;
        if self.orientation_mode != OrientationMode::Fixed {
            self.draw_orientation = orientation * self.orientation;
        }
    }

    /// Rotation the geometry is drawn with. View-facing controls turn
    /// their X axis towards the camera.
    fn draw_rotation(&self, parent: Mat4, view: &ViewSnapshot) -> Quat {
        if !self.view_facing {
            return self.draw_orientation;
        }
        let world = parent.transform_point3(self.draw_position);
        let towards_camera = parent
            .inverse()
            .transform_vector3(view.camera_position - world)
            .normalize_or_zero();
        if towards_camera == Vec3::ZERO {
            return self.draw_orientation;
        }
        Quat::from_rotation_arc(Vec3::X, towards_camera)
    }

    fn place(&mut self, ctx: &mut DrawContext<'_>, scale: f32) {
        let parent = ctx.camera.model_matrix();
        let rotation = self.draw_rotation(parent, ctx.view);
        let stack = ctx.camera.model_stack();
        stack.translate(self.draw_position);
        stack.rotate(rotation);
        stack.scale(Vec3::splat(scale));
        self.capture = Some(ControlCapture {
            model: ctx.camera.model_matrix(),
            parent,
        });
    }

    /// Draw in the marker's frame, which the caller has already applied.
    pub fn draw(&mut self, ctx: &mut DrawContext<'_>, scale: f32) {
        ctx.camera.push_m();
        self.place(ctx, scale);
        let highlight = self.selected || self.in_action;
        for marker in &self.markers {
            let colour = if highlight {
                selected_colour()
            } else {
                marker.colour
            };
            ctx.camera.push_m();
            ctx.camera.model_stack().multiply(marker.transform);
            ctx.draw(&marker.shape, colour);
            ctx.camera.pop_m();
        }
        ctx.camera.pop_m();
    }

    /// Draw every marker in the control's flat pick colour.
    pub fn selection_draw(&mut self, ctx: &mut DrawContext<'_>, scale: f32) {
        let Some(colour) = self.pick_colour.filter(|_| self.is_selectable()) else {
            return;
        };
        let [r, g, b, a] = colour.to_rgba();
        let flat = LinearRgba::new(r, g, b, a);
        ctx.camera.push_m();
        self.place(ctx, scale);
        for marker in &self.markers {
            ctx.camera.push_m();
            ctx.camera.model_stack().multiply(marker.transform);
            ctx.draw(&marker.shape, flat);
            ctx.camera.pop_m();
        }
        ctx.camera.pop_m();
    }

    /// Arm the control. The rotation axis is fixed here, except for
    /// view-facing controls which re-derive it on every rotation.
    pub fn begin_action(&mut self, marker_orientation: Quat, view: &ViewSnapshot) {
        self.in_action = true;
        let parent = self.capture.map_or(Mat4::IDENTITY, |c| c.parent);
        self.axis = match self.orientation_mode {
            OrientationMode::Fixed => parent.transform_vector3(self.x_axis),
            OrientationMode::Inherit => parent.transform_vector3(marker_orientation * self.x_axis),
            OrientationMode::ViewFacing => self.world_position(parent) - view.camera_position,
        }
        .normalize_or(Vec3::X);
    }

    pub fn end_action(&mut self) {
        self.in_action = false;
        self.screen_ray = None;
    }

    fn world_position(&self, parent: Mat4) -> Vec3 {
        self.capture
            .map_or_else(|| parent.transform_point3(self.draw_position), |c| c.world_position())
    }

    /// Rotation of `d_theta_degrees` about the control axis, expressed in
    /// the marker frame. The axis is flipped to face away from the camera
    /// so a clockwise dial turn always looks clockwise.
    pub fn rotation_delta(&mut self, d_theta_degrees: f32, view: &ViewSnapshot) -> Option<Quat> {
        let parent = self.capture.map_or(Mat4::IDENTITY, |c| c.parent);
        let to_camera = view.camera_position - self.world_position(parent);
        if self.orientation_mode == OrientationMode::ViewFacing {
            self.axis = -to_camera;
        } else if self.axis.dot(to_camera) > 0.0 {
            debug!("Inverting rotation axis of {}", self.name);
            self.axis = -self.axis;
        }
        let local_axis = parent
            .inverse()
            .transform_vector3(self.axis)
            .normalize_or_zero();
        if local_axis == Vec3::ZERO {
            return None;
        }
        Some(Quat::from_axis_angle(local_axis, d_theta_degrees.to_radians()))
    }

    pub fn screen_position(&self, view: &ViewSnapshot) -> Option<Vec2> {
        let capture = self.capture?;
        view.project_with(view.view_projection() * capture.model, Vec3::ZERO)
    }

    /// Screen image of the control's unit X axis, zero when not on screen.
    pub fn screen_motion_vector(&self, view: &ViewSnapshot) -> Vec2 {
        let Some(capture) = self.capture else {
            return Vec2::ZERO;
        };
        let mvp = view.view_projection() * capture.model;
        match (
            view.project_with(mvp, Vec3::ZERO),
            view.project_with(mvp, Vec3::X),
        ) {
            (Some(start), Some(end)) => end - start,
            _ => Vec2::ZERO,
        }
    }

    /// Capture the screen-space axis a MOVE_AXIS drag slides along. Taken
    /// once per drag so the axis does not drift under perspective.
    pub fn translate_start(&mut self, view: &ViewSnapshot) {
        self.screen_ray = None;
        let Some(capture) = self.capture else {
            return;
        };
        let mvp = view.view_projection() * capture.model;
        let (Some(start), Some(end)) = (
            view.project_with(mvp, Vec3::ZERO),
            view.project_with(mvp, Vec3::X),
        ) else {
            return;
        };
        let direction = end - start;
        if direction.length() < MIN_SCREEN_AXIS_LENGTH {
            error!("Screen ray of {} too short, aborting axis move", self.name);
            return;
        }
        self.screen_ray = Some(ScreenRay {
            start,
            direction: direction.normalize(),
        });
    }

    /// New marker position, in the marker frame, for a touch at `(x, y)`.
    /// `None` leaves the marker where it is.
    pub fn translate_target(&self, x: f32, y: f32, view: &ViewSnapshot) -> Option<Vec3> {
        let capture = self.capture?;
        let touch = Vec2::new(x, y);
        let world = match self.mode {
            InteractionMode::MoveAxis => {
                let screen = self.screen_ray?;
                let along = (touch - screen.start).dot(screen.direction);
                let action_point = screen.start + screen.direction * along;
                let mouse = view.mouse_ray(action_point)?;
                if contains_nan(mouse.start) || contains_nan(mouse.direction) {
                    error!("Mouse ray for {} is not a number", self.name);
                    return None;
                }
                let axis = Ray::new(capture.world_position(), capture.world_x_axis());
                let Some(point) = axis.closest_point(&mouse) else {
                    error!("Rays are parallel or malformed, skipping move of {}", self.name);
                    return None;
                };
                point
            }
            InteractionMode::MovePlane | InteractionMode::MoveRotate => {
                let normal = if self.view_facing {
                    view.center_ray()?.direction
                } else {
                    capture.world_x_axis()
                };
                let mouse = view.mouse_ray(touch)?;
                mouse.intersect_plane(capture.world_position(), normal)?
            }
            _ => return None,
        };
        if contains_nan(world) {
            return None;
        }
        Some(capture.to_marker_frame(world))
    }
}
