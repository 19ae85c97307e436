//! Two-pass drawing of the layer stack.
//!
//! ## Architecture
//!
//! ```text
//! on_draw_frame
//!   ├─> camera.apply()                  view matrix, fling, target frame
//!   ├─> layer.prepare()                 selection registration, pruning
//!   ├─> [pick pending] selection pass   SELECTABLE layers, flat colours
//!   │       └─> read_pixel ─> SelectionManager::select_item_with_color
//!   └─> normal pass                     DRAWABLE layers
//! ```
//!
//! Every layer is drawn between a `push_m`/`pop_m` pair with its frame
//! transform applied, so a layer can never leak model matrix state into
//! the next one.

/// Drawing backend trait and the wireframe canvas.
pub mod canvas;

/// Layer trait and capability flags.
pub mod layer;

/// Single-pixel software rasteriser resolving selection passes.
pub mod pick_buffer;

/// Per-frame draw loop over the registered layers.
pub mod renderer;

/// Drawable primitives and marker message geometry.
pub mod shapes;

pub use canvas::{Canvas, LineCanvas, RenderPass, WorldLine};
pub use layer::{DrawContext, FrameContext, Layer, LayerCapabilities};
pub use renderer::Renderer;
pub use shapes::{MarkerGeometry, Shape};
