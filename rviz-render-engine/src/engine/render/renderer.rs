use bevy::log::debug;
use web_time::Instant;

use super::canvas::{Canvas, RenderPass};
use super::layer::{DrawContext, FrameContext, Layer, LayerCapabilities};
use crate::engine::camera::{OrbitCamera, ViewSnapshot};
use crate::engine::selection::SelectionManager;

struct RegisteredLayer {
    layer: Box<dyn Layer>,
    capabilities: LayerCapabilities,
}

/// Ordered layer list and the per-frame draw loop.
#[derive(Default)]
pub struct Renderer {
    layers: Vec<RegisteredLayer>,
}

impl Renderer {
    pub fn add_layer(&mut self, layer: Box<dyn Layer>) {
        let capabilities = layer.capabilities();
        debug!("Adding layer {} with {:?}", layer.name(), capabilities);
        self.layers.push(RegisteredLayer {
            layer,
            capabilities,
        });
    }

    pub fn layer_names(&self) -> Vec<&str> {
        self.layers.iter().map(|l| l.layer.name()).collect()
    }

    /// Run one frame: camera update, layer housekeeping, the selection pass
    /// when a pick is pending, then the normal pass.
    pub fn on_draw_frame(
        &mut self,
        camera: &mut OrbitCamera,
        selection: &mut SelectionManager,
        canvas: &mut dyn Canvas,
        now: Instant,
    ) {
        camera.apply();
        let view = camera.snapshot();

        let mut frame = FrameContext {
            selection: &mut *selection,
            now,
        };
        for entry in &mut self.layers {
            entry.layer.prepare(&mut frame);
        }

        if let Some(point) = selection.selection_coordinates() {
            let pass = RenderPass::Selection { point };
            self.draw_pass(camera, canvas, &view, pass, LayerCapabilities::SELECTABLE);
            let colour = canvas.read_pixel();
            debug!("Picked {:?} at {}", colour, point);
            selection.select_item_with_color(colour, &view);
        }

        self.draw_pass(
            camera,
            canvas,
            &view,
            RenderPass::Normal,
            LayerCapabilities::DRAWABLE,
        );
    }

    fn draw_pass(
        &self,
        camera: &mut OrbitCamera,
        canvas: &mut dyn Canvas,
        view: &ViewSnapshot,
        pass: RenderPass,
        required: LayerCapabilities,
    ) {
        canvas.begin_pass(pass, view);
        let mut ctx = DrawContext {
            camera,
            canvas,
            view,
            pass,
        };
        for entry in &self.layers {
            if !entry.capabilities.contains(required) || !entry.layer.is_enabled() {
                continue;
            }
            draw_layer(entry, &mut ctx);
        }
        ctx.canvas.end_pass();
    }
}

fn draw_layer(entry: &RegisteredLayer, ctx: &mut DrawContext<'_>) {
    let depth = ctx.camera.model_stack().depth();
    ctx.camera.push_m();
    if entry.capabilities.contains(LayerCapabilities::FRAME_ANCHORED) {
        if let Some(frame) = entry.layer.frame() {
            let transform = ctx.camera.frame_transform(frame);
            ctx.camera.apply_transform(transform.as_ref());
        }
    }
    if ctx.is_selection_pass() {
        entry.layer.selection_draw(ctx);
    } else {
        entry.layer.draw(ctx);
    }
    ctx.camera.pop_m();

    if ctx.camera.model_stack().depth() != depth {
        panic!(
            "layer {} left the model matrix stack unbalanced",
            entry.layer.name()
        );
    }
}
