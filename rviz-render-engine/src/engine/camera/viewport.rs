use bevy::math::{Mat4, Vec2, Vec3, Vec4};
use constants::render_settings::{FAR_CLIP, FIELD_OF_VIEW_DEGREES, NEAR_CLIP};

use crate::engine::geometry::Ray;

/// Pixel size and projection parameters of the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
    pub fov_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Top-left corner of the viewport in touch coordinates.
    pub display_offset: Vec2,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl Viewport {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
            fov_degrees: FIELD_OF_VIEW_DEGREES,
            near: NEAR_CLIP,
            far: FAR_CLIP,
            display_offset: Vec2::ZERO,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width.max(1);
        self.height = height.max(1);
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width as f32, self.height as f32)
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// Perspective projection in the GL clip convention (NDC depth in [-1, 1]).
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh_gl(self.fov_degrees.to_radians(), self.aspect(), self.near, self.far)
    }
}

/// Everything ray casting needs to know about the camera for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewSnapshot {
    pub view: Mat4,
    pub projection: Mat4,
    pub viewport: Viewport,
    pub camera_position: Vec3,
    pub look_target: Vec3,
}

impl ViewSnapshot {
    pub fn view_projection(&self) -> Mat4 {
        self.projection * self.view
    }

    /// Unit vector from the camera towards its look-target.
    pub fn view_direction(&self) -> Vec3 {
        (self.look_target - self.camera_position).normalize_or(Vec3::NEG_Z)
    }

    /// Screen position (origin top-left, y down) of a clip-space point.
    pub fn clip_to_screen(&self, clip: Vec4) -> Option<Vec2> {
        if clip.w.abs() < f32::EPSILON {
            return None;
        }
        let size = self.viewport.size();
        let x = clip.x * size.x / (2.0 * clip.w) + size.x / 2.0;
        let y = size.y - (clip.y * size.y / (2.0 * clip.w) + size.y / 2.0);
        let screen = Vec2::new(x, y) + self.viewport.display_offset;
        screen.is_finite().then_some(screen)
    }

    /// Project a world point with the given model-view-projection matrix.
    pub fn project_with(&self, mvp: Mat4, point: Vec3) -> Option<Vec2> {
        self.clip_to_screen(mvp * point.extend(1.0))
    }

    pub fn project(&self, world: Vec3) -> Option<Vec2> {
        self.project_with(self.view_projection(), world)
    }

    /// Map a screen point at window depth `depth` (0 = near, 1 = far) back
    /// into world space. `None` if the view-projection is singular or the
    /// point lands at infinity.
    pub fn unproject(&self, screen: Vec2, depth: f32) -> Option<Vec3> {
        let view_projection = self.view_projection();
        if view_projection.determinant().abs() < f32::EPSILON * f32::EPSILON {
            return None;
        }
        let inverse = view_projection.inverse();

        let size = self.viewport.size();
        let local = screen - self.viewport.display_offset;
        let window_y = size.y - local.y;
        let ndc = Vec4::new(
            local.x / size.x * 2.0 - 1.0,
            window_y / size.y * 2.0 - 1.0,
            depth * 2.0 - 1.0,
            1.0,
        );

        let out = inverse * ndc;
        if out.w == 0.0 {
            return None;
        }
        let world = out.truncate() / out.w;
        world.is_finite().then_some(world)
    }

    /// Ray from the near plane through the far plane under a screen point.
    pub fn mouse_ray(&self, screen: Vec2) -> Option<Ray> {
        let start = self.unproject(screen, 0.0)?;
        let end = self.unproject(screen, 1.0)?;
        let direction = (end - start).normalize_or_zero();
        (direction != Vec3::ZERO).then(|| Ray::new(start, direction))
    }

    /// Ray through the centre of the viewport.
    pub fn center_ray(&self) -> Option<Ray> {
        self.mouse_ray(self.viewport.size() / 2.0 + self.viewport.display_offset)
    }
}
