use bevy::color::LinearRgba;
use bitflags::bitflags;
use web_time::Instant;

use super::canvas::{Canvas, RenderPass};
use super::shapes::Shape;
use crate::engine::camera::{OrbitCamera, ViewSnapshot};
use crate::engine::selection::SelectionManager;

bitflags! {
    /// What the renderer may do with a layer. Queried once, when the layer
    /// is added.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct LayerCapabilities: u8 {
        /// Takes part in the normal pass.
        const DRAWABLE = 1 << 0;
        /// Takes part in the selection pass.
        const SELECTABLE = 1 << 1;
        /// Drawn relative to [`Layer::frame`] instead of the fixed frame.
        const FRAME_ANCHORED = 1 << 2;
    }
}

/// Per-frame housekeeping access, before any drawing starts.
pub struct FrameContext<'a> {
    pub selection: &'a mut SelectionManager,
    pub now: Instant,
}

/// What a layer draws through during one pass.
pub struct DrawContext<'a> {
    pub camera: &'a mut OrbitCamera,
    pub canvas: &'a mut dyn Canvas,
    pub view: &'a ViewSnapshot,
    pub pass: RenderPass,
}

impl DrawContext<'_> {
    /// Draw `shape` under the current model matrix.
    pub fn draw(&mut self, shape: &Shape, colour: LinearRgba) {
        let model = self.camera.model_matrix();
        self.canvas.draw_shape(shape, model, colour);
    }

    pub fn is_selection_pass(&self) -> bool {
        matches!(self.pass, RenderPass::Selection { .. })
    }
}

pub trait Layer: Send {
    fn name(&self) -> &str;

    fn capabilities(&self) -> LayerCapabilities;

    /// Reference frame of a `FRAME_ANCHORED` layer.
    fn frame(&self) -> Option<&str> {
        None
    }

    fn is_enabled(&self) -> bool {
        true
    }

    fn prepare(&mut self, _frame: &mut FrameContext<'_>) {}

    fn draw(&self, ctx: &mut DrawContext<'_>);

    /// Draw in flat pick colours. Only called on `SELECTABLE` layers.
    fn selection_draw(&self, _ctx: &mut DrawContext<'_>) {}
}
