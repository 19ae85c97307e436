use std::sync::Arc;

use bevy::log::info;
use bevy::math::{Mat4, Vec2, Vec3};
use constants::camera::{
    DEFAULT_ORBIT_RADIUS, DEFAULT_PHI, DEFAULT_THETA, FLING_DECAY, FLING_VELOCITY_DIVISOR,
    MAX_FLING_VELOCITY, MAX_THETA, MAX_TRANSLATE_SPEED, MIN_FLING_VELOCITY, MIN_THETA,
    TRANSLATION_SCALE_DIVISOR,
};
use constants::coordinate_system::{DEFAULT_FIXED_FRAME, UP_AXIS};

use super::matrix_stack::ModelMatrixStack;
use super::viewport::{ViewSnapshot, Viewport};
use crate::engine::geometry::utility::{angle_wrap, cap};
use crate::engine::listeners::{ListenerId, Listeners};
use crate::engine::transforms::{FrameTransform, TransformTree};
use crate::messages::std_msgs::Time;

/// Orbit camera orbiting a look-target on a sphere, plus the model matrix stack.
///
/// `theta` is the polar angle from +Z, `phi` the azimuth around it. The
/// camera renders everything relative to the fixed frame. When a target
/// frame is set the look-target follows it every frame and panning is
/// disabled.
pub struct OrbitCamera {
    stack: ModelMatrixStack,
    viewport: Viewport,
    view: Mat4,

    orbit_radius: f32,
    theta: f32,
    phi: f32,
    look_target: Vec3,
    location: Vec3,
    /// Fling velocity in degrees per frame, `x` for phi and `y` for theta.
    velocity: Vec2,
    translation_scale: f32,

    fixed_frame: String,
    /// Followed frame; the look target tracks its full translation.
    target_frame: Option<String>,
    tree: Arc<dyn TransformTree>,
    fixed_frame_listeners: Arc<Listeners<str>>,
    target_frame_listeners: Listeners<Option<String>>,
}

impl OrbitCamera {
    pub fn new(tree: Arc<dyn TransformTree>) -> Self {
        let mut camera = Self {
            stack: ModelMatrixStack::default(),
            viewport: Viewport::default(),
            view: Mat4::IDENTITY,
            orbit_radius: DEFAULT_ORBIT_RADIUS,
            theta: DEFAULT_THETA,
            phi: DEFAULT_PHI,
            look_target: Vec3::ZERO,
            location: Vec3::ZERO,
            velocity: Vec2::ZERO,
            translation_scale: DEFAULT_ORBIT_RADIUS / TRANSLATION_SCALE_DIVISOR,
            fixed_frame: DEFAULT_FIXED_FRAME.to_string(),
            target_frame: None,
            tree,
            fixed_frame_listeners: Arc::new(Listeners::default()),
            target_frame_listeners: Listeners::default(),
        };
        camera.update_location();
        camera.update_view();
        camera
    }

    /// Advance fling inertia, follow the target frame and rebuild the view.
    ///
    /// Called once per frame before any layer draws. Also resets the model
    /// matrix to identity.
    ///
    /// A followed target frame puts the look target on the frame's full,
    /// unscaled translation in the fixed frame.
    pub fn apply(&mut self) {
        self.velocity_update();

        if self.target_frame.is_some() {
            let followed = self
                .target_frame
                .as_deref()
                .and_then(|target| self.tree.lookup(target, &self.fixed_frame, Time::default()));
            if let Some(transform) = followed {
                self.look_target = transform.translation;
            }
            self.update_location();
        }

        self.update_view();
        self.stack.load_identity();
    }

    fn update_location(&mut self) {
        let (sin_theta, cos_theta) = self.theta.sin_cos();
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        self.location = self.look_target
            + self.orbit_radius * Vec3::new(sin_theta * cos_phi, sin_theta * sin_phi, cos_theta);
    }

    fn update_view(&mut self) {
        self.view = Mat4::look_at_rh(self.location, self.look_target, UP_AXIS);
    }

    fn velocity_update(&mut self) {
        if self.velocity != Vec2::ZERO {
            self.move_orbit_position(self.velocity.x, self.velocity.y);
            self.velocity *= FLING_DECAY;
        }
        if self.velocity.x.abs() < MIN_FLING_VELOCITY {
            self.velocity.x = 0.0;
        }
        if self.velocity.y.abs() < MIN_FLING_VELOCITY {
            self.velocity.y = 0.0;
        }
    }

    /// Start orbit inertia from a gesture velocity in pixels per second.
    pub fn fling_camera(&mut self, velocity_x: f32, velocity_y: f32) {
        self.velocity = Vec2::new(
            cap(-velocity_x / FLING_VELOCITY_DIVISOR, -MAX_FLING_VELOCITY, MAX_FLING_VELOCITY),
            cap(-velocity_y / FLING_VELOCITY_DIVISOR, -MAX_FLING_VELOCITY, MAX_FLING_VELOCITY),
        );
    }

    pub fn stop_fling(&mut self) {
        self.velocity = Vec2::ZERO;
    }

    pub fn is_flinging(&self) -> bool {
        self.velocity != Vec2::ZERO
    }

    /// Orbit by `d_phi` and `d_theta`, both in degrees.
    ///
    /// Stays available while a target frame is set; only panning is locked.
    pub fn move_orbit_position(&mut self, d_phi_degrees: f32, d_theta_degrees: f32) {
        self.phi = angle_wrap(self.phi + d_phi_degrees.to_radians());
        self.theta = cap(self.theta + d_theta_degrees.to_radians(), MIN_THETA, MAX_THETA);
        self.update_location();
    }

    /// Pan the look-target across the ground plane.
    ///
    /// Each delta is capped before scaling so a single jumpy touch event
    /// cannot throw the camera across the scene.
    pub fn move_camera_screen_coordinates(&mut self, dx: f32, dy: f32) {
        if self.target_frame.is_some() {
            return;
        }
        let dx = cap(dx, -MAX_TRANSLATE_SPEED, MAX_TRANSLATE_SPEED) * self.translation_scale;
        let dy = cap(dy, -MAX_TRANSLATE_SPEED, MAX_TRANSLATE_SPEED) * self.translation_scale;

        // Looking up from below the ground mirrors the forward axis
        let y_sign = if self.theta < std::f32::consts::FRAC_PI_2 { 1.0 } else { -1.0 };
        let (sin_phi, cos_phi) = self.phi.sin_cos();
        let direction = Vec3::new(
            sin_phi * dx - cos_phi * dy,
            y_sign * (-cos_phi * dx - sin_phi * dy),
            0.0,
        );

        self.look_target -= direction;
        self.update_location();
    }

    /// `factor > 1` moves closer.
    pub fn zoom_camera(&mut self, factor: f32) {
        if !(factor.is_finite() && factor > 0.0) {
            return;
        }
        self.orbit_radius /= factor;
        self.translation_scale = self.orbit_radius / TRANSLATION_SCALE_DIVISOR;
        self.update_location();
    }

    pub fn reset_zoom(&mut self) {
        self.orbit_radius = DEFAULT_ORBIT_RADIUS;
        self.translation_scale = DEFAULT_ORBIT_RADIUS / TRANSLATION_SCALE_DIVISOR;
        self.update_location();
    }

    pub fn reset_look_target(&mut self) {
        self.look_target = Vec3::ZERO;
        self.update_location();
    }

    /// Jump the look-target to an explicit point, dropping any target frame.
    pub fn set_look_target(&mut self, point: Vec3) {
        self.reset_target_frame();
        self.look_target = point;
        self.update_location();
    }

    pub fn set_orbit_angles(&mut self, theta: f32, phi: f32) {
        self.theta = cap(theta, MIN_THETA, MAX_THETA);
        self.phi = angle_wrap(phi);
        self.update_location();
    }

    // Frames

    pub fn fixed_frame(&self) -> &str {
        &self.fixed_frame
    }

    pub fn set_fixed_frame(&mut self, frame: &str) {
        let frame = if frame.is_empty() { DEFAULT_FIXED_FRAME } else { frame };
        if frame == self.fixed_frame {
            return;
        }
        info!("Fixed frame changed to {}", frame);
        self.fixed_frame = frame.to_string();
        self.fixed_frame_listeners.notify(frame);
    }

    pub fn reset_fixed_frame(&mut self) {
        self.set_fixed_frame(DEFAULT_FIXED_FRAME);
    }

    pub fn target_frame(&self) -> Option<&str> {
        self.target_frame.as_deref()
    }

    pub fn set_target_frame(&mut self, frame: &str) {
        self.target_frame = Some(frame.to_string());
        self.reset_look_target();
        self.target_frame_listeners.notify(&self.target_frame);
    }

    pub fn reset_target_frame(&mut self) {
        if self.target_frame.take().is_some() {
            self.target_frame_listeners.notify(&None);
        }
    }

    pub fn fixed_frame_listeners(&self) -> &Arc<Listeners<str>> {
        &self.fixed_frame_listeners
    }

    pub fn add_fixed_frame_listener(
        &self,
        listener: impl Fn(&str) + Send + Sync + 'static,
    ) -> ListenerId {
        self.fixed_frame_listeners.add(listener)
    }

    pub fn add_target_frame_listener(
        &self,
        listener: impl Fn(&Option<String>) + Send + Sync + 'static,
    ) -> ListenerId {
        self.target_frame_listeners.add(listener)
    }

    /// Transform from `frame` into the fixed frame, if the tree can resolve it.
    pub fn frame_transform(&self, frame: &str) -> Option<FrameTransform> {
        self.tree.lookup(frame, &self.fixed_frame, Time::default())
    }

    pub fn transform_tree(&self) -> &Arc<dyn TransformTree> {
        &self.tree
    }

    // Matrix stack

    pub fn push_m(&mut self) {
        self.stack.push();
    }

    pub fn pop_m(&mut self) {
        self.stack.pop();
    }

    pub fn apply_transform(&mut self, transform: Option<&FrameTransform>) {
        self.stack.apply_transform(transform);
    }

    pub fn model_stack(&mut self) -> &mut ModelMatrixStack {
        &mut self.stack
    }

    pub fn model_matrix(&self) -> Mat4 {
        self.stack.current()
    }

    // Viewport and view

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn set_viewport_size(&mut self, width: u32, height: u32) {
        self.viewport.resize(width, height);
    }

    pub fn set_display_offset(&mut self, offset: Vec2) {
        self.viewport.display_offset = offset;
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.view
    }

    pub fn location(&self) -> Vec3 {
        self.location
    }

    pub fn look_target(&self) -> Vec3 {
        self.look_target
    }

    pub fn orbit_radius(&self) -> f32 {
        self.orbit_radius
    }

    pub fn angles(&self) -> (f32, f32) {
        (self.theta, self.phi)
    }

    /// Matrices for ray casting, reflecting any gesture since the last
    /// `apply`.
    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            view: Mat4::look_at_rh(self.location, self.look_target, UP_AXIS),
            projection: self.viewport.projection(),
            viewport: self.viewport,
            camera_position: self.location,
            look_target: self.look_target,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::transforms::FrameTransformTree;
    use crate::messages::geometry_msgs::TransformStamped;
    use crate::messages::std_msgs::Header;
    use parking_lot::Mutex;

    fn camera() -> (OrbitCamera, Arc<FrameTransformTree>) {
        let tree = Arc::new(FrameTransformTree::new());
        (OrbitCamera::new(tree.clone()), tree)
    }

    #[test]
    fn theta_is_clamped_and_phi_wraps() {
        let (mut cam, _) = camera();
        cam.move_orbit_position(0.0, -720.0);
        assert_eq!(cam.angles().0, MIN_THETA);
        cam.move_orbit_position(0.0, 720.0);
        assert_eq!(cam.angles().0, MAX_THETA);

        cam.move_orbit_position(400.0, 0.0);
        let phi = cam.angles().1;
        assert!((0.0..std::f32::consts::TAU).contains(&phi));
    }

    #[test]
    fn location_sits_on_orbit_sphere() {
        let (mut cam, _) = camera();
        cam.set_look_target(Vec3::new(1.0, 2.0, 0.0));
        cam.zoom_camera(2.0);
        cam.apply();
        let distance = cam.location().distance(cam.look_target());
        assert!((distance - DEFAULT_ORBIT_RADIUS / 2.0).abs() < 1e-4);
    }

    #[test]
    fn fling_decays_to_rest() {
        let (mut cam, _) = camera();
        cam.fling_camera(-5000.0, 0.0);
        assert!(cam.is_flinging());
        let start_phi = cam.angles().1;
        for _ in 0..200 {
            cam.apply();
        }
        assert!(!cam.is_flinging());
        assert_ne!(cam.angles().1, start_phi);
    }

    #[test]
    fn target_frame_drives_look_target() {
        let (mut cam, tree) = camera();
        tree.update(&TransformStamped {
            header: Header::with_frame("world"),
            child_frame_id: "robot".into(),
            transform: crate::messages::geometry_msgs::Transform {
                translation: Vec3::new(3.0, -1.0, 0.0).into(),
                rotation: Default::default(),
            },
        });

        cam.set_target_frame("robot");
        cam.apply();
        assert!(cam.look_target().abs_diff_eq(Vec3::new(3.0, -1.0, 0.0), 1e-6));

        // Panning is disabled while following a frame
        cam.move_camera_screen_coordinates(0.1, 0.1);
        assert!(cam.look_target().abs_diff_eq(Vec3::new(3.0, -1.0, 0.0), 1e-6));

        // Orbiting still works
        let (_, phi) = cam.angles();
        cam.move_orbit_position(30.0, 0.0);
        assert!((cam.angles().1 - angle_wrap(phi + 30f32.to_radians())).abs() < 1e-5);
        assert!(cam.look_target().abs_diff_eq(Vec3::new(3.0, -1.0, 0.0), 1e-6));
    }

    #[test]
    fn fixed_frame_change_notifies_listeners() {
        let (mut cam, _) = camera();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = seen.clone();
        cam.add_fixed_frame_listener(move |frame| log.lock().push(frame.to_string()));

        cam.set_fixed_frame("map");
        cam.set_fixed_frame("map");
        cam.reset_fixed_frame();
        assert_eq!(*seen.lock(), vec!["map".to_string(), DEFAULT_FIXED_FRAME.to_string()]);
    }

    #[test]
    fn pan_moves_look_target_in_ground_plane() {
        let (mut cam, _) = camera();
        cam.move_camera_screen_coordinates(0.1, 0.0);
        assert!(cam.look_target().z.abs() < 1e-6);
        assert!(cam.look_target().length() > 0.0);
    }
}
