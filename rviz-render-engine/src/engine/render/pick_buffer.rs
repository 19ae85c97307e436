use bevy::math::{Mat4, Vec2, Vec3};
use constants::render_settings::PICK_MIN_RADIUS_PX;

use super::shapes::Shape;
use crate::engine::camera::ViewSnapshot;
use crate::engine::selection::SelectionColor;

/// Single-pixel software pick buffer.
///
/// Stands in for the offscreen framebuffer of a GPU selection pass: only
/// the pixel under the touch point is ever read back, so only that pixel
/// is rasterised. Each drawn triangle covering the point competes on
/// window depth; the nearest one's flat colour wins. Line and point shapes
/// cover a small disc around each vertex instead.
#[derive(Debug, Default)]
pub struct PickBuffer {
    target: Option<(ViewSnapshot, Vec2)>,
    nearest: Option<(f32, SelectionColor)>,
}

/// Window-space vertex: screen position and depth in [0, 1].
#[derive(Debug, Clone, Copy)]
struct WindowPoint {
    screen: Vec2,
    depth: f32,
}

impl PickBuffer {
    pub fn begin(&mut self, view: ViewSnapshot, point: Vec2) {
        self.target = Some((view, point));
        self.nearest = None;
    }

    pub fn draw(&mut self, shape: &Shape, model: Mat4, colour: SelectionColor) {
        let Some((view, point)) = self.target else {
            return;
        };
        let mvp = view.view_projection() * model;
        let to_window = |v: Vec3| -> Option<WindowPoint> {
            let clip = mvp * v.extend(1.0);
            // Behind the eye or clipped by the near plane.
            if clip.w <= 0.0 || clip.z < -clip.w {
                return None;
            }
            Some(WindowPoint {
                screen: view.clip_to_screen(clip)?,
                depth: (clip.z / clip.w) * 0.5 + 0.5,
            })
        };

        for triangle in shape.triangles() {
            let [Some(a), Some(b), Some(c)] = triangle.map(to_window) else {
                continue;
            };
            if let Some(depth) = covered_depth(point, a, b, c) {
                self.offer(depth, colour);
            }
        }

        for vertex in shape.pick_points() {
            if let Some(w) = to_window(model.transform_point3(*vertex)) {
                if w.screen.distance(point) <= PICK_MIN_RADIUS_PX {
                    self.offer(w.depth, colour);
                }
            }
        }
    }

    fn offer(&mut self, depth: f32, colour: SelectionColor) {
        if self.nearest.is_none_or(|(best, _)| depth < best) {
            self.nearest = Some((depth, colour));
        }
    }

    pub fn result(&self) -> SelectionColor {
        self.nearest
            .map_or(SelectionColor::BACKGROUND, |(_, colour)| colour)
    }
}

/// Interpolated depth at `p` when the triangle covers it.
fn covered_depth(p: Vec2, a: WindowPoint, b: WindowPoint, c: WindowPoint) -> Option<f32> {
    let area = (b.screen - a.screen).perp_dot(c.screen - a.screen);
    if area.abs() < f32::EPSILON {
        return None;
    }
    let wa = (b.screen - p).perp_dot(c.screen - p) / area;
    let wb = (c.screen - p).perp_dot(a.screen - p) / area;
    let wc = 1.0 - wa - wb;
    if wa < 0.0 || wb < 0.0 || wc < 0.0 {
        return None;
    }
    Some(wa * a.depth + wb * b.depth + wc * c.depth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::camera::viewport::tests::top_down_view;

    #[test]
    fn nearest_surface_wins() {
        let view = top_down_view(Vec3::ZERO, 200, 200);
        let mut picker = PickBuffer::default();
        picker.begin(view, Vec2::new(103.0, 96.0));

        let low = SelectionColor::new(2, 1, 1);
        let high = SelectionColor::new(3, 1, 1);
        picker.draw(&Shape::Cube, Mat4::from_translation(Vec3::new(0.0, 0.0, -1.0)), low);
        picker.draw(&Shape::Cube, Mat4::from_translation(Vec3::new(0.0, 0.0, 1.0)), high);
        assert_eq!(picker.result(), high);
    }

    #[test]
    fn empty_space_reads_background() {
        let view = top_down_view(Vec3::ZERO, 200, 200);
        let mut picker = PickBuffer::default();
        picker.begin(view, Vec2::new(5.0, 5.0));
        picker.draw(&Shape::Cube, Mat4::IDENTITY, SelectionColor::new(2, 1, 1));
        assert_eq!(picker.result(), SelectionColor::BACKGROUND);
    }

    #[test]
    fn points_pick_by_proximity() {
        let view = top_down_view(Vec3::ZERO, 200, 200);
        let mut picker = PickBuffer::default();
        picker.begin(view, Vec2::new(101.0, 99.0));
        let colour = SelectionColor::new(9, 1, 1);
        picker.draw(&Shape::Points(vec![Vec3::ZERO]), Mat4::IDENTITY, colour);
        assert_eq!(picker.result(), colour);
    }
}
