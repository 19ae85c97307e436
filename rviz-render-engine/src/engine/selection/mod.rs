//! Colour-keyed object picking.
//!
//! Every selectable object is drawn once per pick request in a unique flat
//! colour. Reading back the pixel under the touch point and looking the
//! colour up in the registry identifies the object. The
//! [`selection_manager::SelectionManager`] owns that registry, the current
//! selection, and the interactive control overlay driven by it.
//!
//! ## Pick Flow
//!
//! ```text
//! tap(x, y)
//!   └─> begin_selection_draw(x, y)
//!       └─> next frame: selection pass into offscreen buffer
//!           └─> read_pixel(x, y) ─> select_item_with_color(colour)
//!               ├─> hit:  deselect old, select new, mouse_down, show overlay
//!               └─> miss: deselect, hide overlay
//! ```

/// Pick colours and their generator.
pub mod color;

/// Capability traits implemented by pickable and manipulable objects.
pub mod selectable;

/// Registry, selection state and overlay coordination.
pub mod selection_manager;

pub use color::SelectionColor;
pub use selectable::{InteractiveObject, MouseDownOutcome, Selectable, SelectableId};
pub use selection_manager::SelectionManager;
