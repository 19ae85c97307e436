use std::collections::BTreeMap;
use std::sync::Arc;

use bevy::log::debug;
use bevy::math::Vec2;

use super::marker::InteractiveMarker;
use super::modes::InteractionMode;
use super::store::SharedMarkerStore;
use crate::engine::camera::ViewSnapshot;
use crate::engine::selection::{InteractiveObject, MouseDownOutcome, Selectable, SelectableId};

/// What the selection manager holds for one registered control.
///
/// A handle names its control by marker name, control index and
/// selectable id. Every call looks the control up again under the store
/// lock, and a handle whose control has been replaced or erased silently
/// does nothing.
#[derive(Clone)]
pub struct ControlHandle {
    store: SharedMarkerStore,
    marker: String,
    index: usize,
    id: SelectableId,
}

impl ControlHandle {
    pub fn new(store: SharedMarkerStore, marker: &str, index: usize, id: SelectableId) -> Self {
        Self {
            store,
            marker: marker.to_string(),
            index,
            id,
        }
    }

    pub fn marker_name(&self) -> &str {
        &self.marker
    }

    fn with_marker<R>(&self, f: impl FnOnce(&mut InteractiveMarker) -> R) -> Option<R> {
        let mut store = self.store.lock();
        let marker = store.get_mut(&self.marker)?;
        if marker.controls().get(self.index)?.selectable_id() != self.id {
            debug!("Stale handle for {}[{}]", self.marker, self.index);
            return None;
        }
        Some(f(marker))
    }
}

impl Selectable for ControlHandle {
    fn selectable_id(&self) -> SelectableId {
        self.id
    }

    fn set_selected(&self, selected: bool) {
        let index = self.index;
        self.with_marker(|marker| {
            if let Some(control) = marker.controls_mut().get_mut(index) {
                control.set_selected(selected);
            }
        });
    }

    fn interactive_object(&self) -> Option<Arc<dyn InteractiveObject>> {
        let interactive = self.interaction_mode() != InteractionMode::None;
        interactive.then(|| Arc::new(self.clone()) as Arc<dyn InteractiveObject>)
    }

    fn info(&self) -> BTreeMap<String, String> {
        let index = self.index;
        self.with_marker(|marker| {
            let mut info = BTreeMap::new();
            info.insert("Marker".to_string(), marker.name().to_string());
            info.insert("Frame".to_string(), marker.frame().to_string());
            if !marker.description().is_empty() {
                info.insert("Description".to_string(), marker.description().to_string());
            }
            if let Some(control) = marker.controls().get(index) {
                info.insert("Control".to_string(), control.name().to_string());
                info.insert("Mode".to_string(), format!("{:?}", control.mode()));
            }
            info
        })
        .unwrap_or_default()
    }
}

impl InteractiveObject for ControlHandle {
    fn interaction_mode(&self) -> InteractionMode {
        let index = self.index;
        self.with_marker(|marker| marker.controls().get(index).map(|c| c.mode()))
            .flatten()
            .unwrap_or(InteractionMode::None)
    }

    fn screen_position(&self, view: &ViewSnapshot) -> Option<Vec2> {
        self.with_marker(|marker| marker.screen_position(self.index, view))
            .flatten()
    }

    fn screen_motion_vector(&self, view: &ViewSnapshot) -> Vec2 {
        self.with_marker(|marker| marker.screen_motion_vector(self.index, view))
            .unwrap_or(Vec2::ZERO)
    }

    fn mouse_down(&self, view: &ViewSnapshot) -> MouseDownOutcome {
        self.with_marker(|marker| marker.mouse_down(self.index, view))
            .unwrap_or(MouseDownOutcome::Manipulating)
    }

    fn mouse_up(&self) {
        self.with_marker(|marker| marker.mouse_up(self.index));
    }

    fn rotate(&self, d_theta_degrees: f32, view: &ViewSnapshot) {
        self.with_marker(|marker| marker.rotate(self.index, d_theta_degrees, view));
    }

    fn translate_start(&self, view: &ViewSnapshot) {
        self.with_marker(|marker| marker.translate_start(self.index, view));
    }

    fn translate(&self, x: f32, y: f32, view: &ViewSnapshot) {
        self.with_marker(|marker| marker.translate(self.index, x, y, view));
    }
}
