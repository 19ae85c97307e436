use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bevy::math::Vec2;

use crate::engine::camera::ViewSnapshot;
use crate::tools::interactive_markers::menu::MenuPrompt;
use crate::tools::interactive_markers::modes::InteractionMode;

/// Stable identity of a registered selectable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SelectableId(u64);

impl SelectableId {
    /// Allocate a process-unique id.
    pub fn allocate() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Something that can be picked by colour.
pub trait Selectable: Send + Sync {
    fn selectable_id(&self) -> SelectableId;

    /// Toggle the selected highlight.
    fn set_selected(&self, selected: bool);

    /// Manipulation handle, for objects that can be dragged or rotated.
    fn interactive_object(&self) -> Option<Arc<dyn InteractiveObject>> {
        None
    }

    /// Key/value description for a selection details panel.
    fn info(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }
}

/// What a press on an interactive object started.
#[derive(Debug, Clone, PartialEq)]
pub enum MouseDownOutcome {
    /// A drag or rotation gesture is armed.
    Manipulating,
    /// The object opened a menu instead. `None` when the menu had no
    /// entries and the selection was reported immediately.
    Menu(Option<MenuPrompt>),
}

/// Touch-driven manipulation of a selected object.
///
/// Screen coordinates use the touch convention: origin at the top-left,
/// y growing downwards, in pixels.
pub trait InteractiveObject: Send + Sync {
    fn interaction_mode(&self) -> InteractionMode;

    /// Where the object's origin currently sits on screen.
    fn screen_position(&self, view: &ViewSnapshot) -> Option<Vec2>;

    /// Screen-space image of the object's unit X axis.
    fn screen_motion_vector(&self, view: &ViewSnapshot) -> Vec2;

    fn mouse_down(&self, view: &ViewSnapshot) -> MouseDownOutcome;

    fn mouse_up(&self);

    fn rotate(&self, d_theta_degrees: f32, view: &ViewSnapshot);

    /// Capture whatever the following `translate` calls project against.
    fn translate_start(&self, view: &ViewSnapshot);

    /// Move towards the absolute touch point `(x, y)`.
    fn translate(&self, x: f32, y: f32, view: &ViewSnapshot);
}
