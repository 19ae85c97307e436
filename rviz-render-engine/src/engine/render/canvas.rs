use bevy::color::{ColorToComponents, LinearRgba};
use bevy::math::{Mat4, Vec2, Vec3};

use super::pick_buffer::PickBuffer;
use super::shapes::Shape;
use crate::engine::camera::ViewSnapshot;
use crate::engine::selection::SelectionColor;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RenderPass {
    Normal,
    /// Flat pick colours only, resolved at a single touch point.
    Selection { point: Vec2 },
}

/// Drawing backend the renderer and layers talk to.
pub trait Canvas {
    fn begin_pass(&mut self, pass: RenderPass, view: &ViewSnapshot);

    /// Draw `shape` placed by `model` (shape space to world).
    fn draw_shape(&mut self, shape: &Shape, model: Mat4, colour: LinearRgba);

    fn end_pass(&mut self);

    /// Pick colour under the point of the last selection pass, background
    /// when nothing was drawn there.
    fn read_pixel(&self) -> SelectionColor;
}

/// World-space line segment produced by the normal pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldLine {
    pub start: Vec3,
    pub end: Vec3,
    pub colour: LinearRgba,
}

/// Wireframe canvas: the normal pass becomes a list of world lines for an
/// immediate-mode line renderer, the selection pass goes to a [`PickBuffer`].
#[derive(Default)]
pub struct LineCanvas {
    lines: Vec<WorldLine>,
    picker: PickBuffer,
    pass: Option<RenderPass>,
}

impl LineCanvas {
    pub fn lines(&self) -> &[WorldLine] {
        &self.lines
    }

    pub fn take_lines(&mut self) -> Vec<WorldLine> {
        std::mem::take(&mut self.lines)
    }
}

impl Canvas for LineCanvas {
    fn begin_pass(&mut self, pass: RenderPass, view: &ViewSnapshot) {
        match pass {
            RenderPass::Normal => self.lines.clear(),
            RenderPass::Selection { point } => self.picker.begin(*view, point),
        }
        self.pass = Some(pass);
    }

    fn draw_shape(&mut self, shape: &Shape, model: Mat4, colour: LinearRgba) {
        match self.pass {
            Some(RenderPass::Normal) => {
                self.lines
                    .extend(shape.outline().into_iter().map(|(a, b)| WorldLine {
                        start: model.transform_point3(a),
                        end: model.transform_point3(b),
                        colour,
                    }));
            }
            Some(RenderPass::Selection { .. }) => {
                self.picker.draw(shape, model, SelectionColor::from_rgba(colour.to_f32_array()));
            }
            None => {}
        }
    }

    fn end_pass(&mut self) {
        self.pass = None;
    }

    fn read_pixel(&self) -> SelectionColor {
        self.picker.result()
    }
}
