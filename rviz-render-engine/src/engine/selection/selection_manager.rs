use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use bevy::log::debug;
use bevy::math::Vec2;
use constants::selection::COLOUR_CHUNK_SIZE;

use super::color::{ColorGenerator, SelectionColor};
use super::selectable::{InteractiveObject, MouseDownOutcome, Selectable, SelectableId};
use crate::engine::camera::ViewSnapshot;
use crate::tools::control_manager::InteractiveControlManager;

struct Registration {
    item: Arc<dyn Selectable>,
    colour: SelectionColor,
}

struct Selected {
    id: SelectableId,
    item: Arc<dyn Selectable>,
    interactive: Option<Arc<dyn InteractiveObject>>,
}

/// Pick-colour registry plus the current selection.
///
/// Lives on the render thread. Registration hands out colours from a FIFO
/// pool that is topped up `COLOUR_CHUNK_SIZE` colours at a time; removed
/// colours go to the back of the pool for reuse.
pub struct SelectionManager {
    pool: VecDeque<SelectionColor>,
    generator: ColorGenerator,
    forward: HashMap<SelectableId, Registration>,
    reverse: HashMap<SelectionColor, SelectableId>,
    pending_pick: Option<Vec2>,
    selected: Option<Selected>,
    controls: InteractiveControlManager,
}

impl SelectionManager {
    pub fn new(controls: InteractiveControlManager) -> Self {
        let mut manager = Self {
            pool: VecDeque::with_capacity(COLOUR_CHUNK_SIZE),
            generator: ColorGenerator::default(),
            forward: HashMap::new(),
            reverse: HashMap::new(),
            pending_pick: None,
            selected: None,
            controls,
        };
        manager.generate_colours(COLOUR_CHUNK_SIZE);
        manager
    }

    fn generate_colours(&mut self, count: usize) {
        for _ in 0..count {
            let colour = self.generator.next_color();
            self.pool.push_back(colour);
        }
    }

    fn next_colour(&mut self) -> SelectionColor {
        if self.pool.is_empty() {
            self.generate_colours(COLOUR_CHUNK_SIZE);
        }
        // Refilled above, never empty here.
        self.pool.pop_front().unwrap_or(SelectionColor::BACKGROUND)
    }

    /// Give `item` a unique pick colour. Registering twice returns the
    /// colour it already holds.
    pub fn register_selectable(&mut self, item: Arc<dyn Selectable>) -> SelectionColor {
        let id = item.selectable_id();
        if let Some(existing) = self.forward.get(&id) {
            return existing.colour;
        }
        let colour = self.next_colour();
        self.forward.insert(id, Registration { item, colour });
        self.reverse.insert(colour, id);
        colour
    }

    /// Drop the registration for `id` and recycle its colour. Returns the
    /// background colour for the caller to draw with from now on.
    pub fn remove_selectable(&mut self, id: SelectableId) -> SelectionColor {
        if self.selected.as_ref().is_some_and(|s| s.id == id) {
            self.deselect();
        }
        if let Some(registration) = self.forward.remove(&id) {
            self.reverse.remove(&registration.colour);
            self.pool.push_back(registration.colour);
        }
        SelectionColor::BACKGROUND
    }

    pub fn color_of(&self, id: SelectableId) -> Option<SelectionColor> {
        self.forward.get(&id).map(|r| r.colour)
    }

    pub fn registered_count(&self) -> usize {
        self.forward.len()
    }

    /// Request a selection pass on the next frame, reading back `(x, y)`.
    pub fn begin_selection_draw(&mut self, x: f32, y: f32) {
        self.pending_pick = Some(Vec2::new(x, y));
    }

    pub fn is_selection_draw(&self) -> bool {
        self.pending_pick.is_some()
    }

    pub fn selection_coordinates(&self) -> Option<Vec2> {
        self.pending_pick
    }

    /// Resolve a picked pixel. Always ends the pending selection pass.
    ///
    /// Returns false, after clearing the selection, when the colour belongs
    /// to nothing registered.
    pub fn select_item_with_color(&mut self, colour: SelectionColor, view: &ViewSnapshot) -> bool {
        self.pending_pick = None;

        let Some(id) = self.reverse.get(&colour).copied() else {
            self.deselect();
            return false;
        };
        if self.selected.as_ref().is_some_and(|s| s.id == id) {
            return true;
        }
        let Some(item) = self.forward.get(&id).map(|r| r.item.clone()) else {
            self.deselect();
            return false;
        };

        self.deselect();
        item.set_selected(true);
        let interactive = item.interactive_object();
        self.selected = Some(Selected {
            id,
            item,
            interactive: interactive.clone(),
        });

        if let Some(object) = interactive {
            self.controls.show_interactive_controller(object.clone(), view);
            if let Some(position) = object.screen_position(view) {
                self.controls.move_interactive_controller(position, view);
            }
            if let MouseDownOutcome::Menu(prompt) = object.mouse_down(view) {
                if let Some(prompt) = prompt {
                    self.controls.show_menu(prompt);
                }
                self.deselect();
            }
        }
        true
    }

    fn deselect(&mut self) {
        let Some(selected) = self.selected.take() else {
            return;
        };
        selected.item.set_selected(false);
        if let Some(object) = selected.interactive {
            object.mouse_up();
            self.controls.hide_interactive_controller();
        }
        debug!("Deselected {:?}", selected.id);
    }

    pub fn clear_selection(&mut self) {
        self.deselect();
    }

    pub fn selected_item(&self) -> Option<SelectableId> {
        self.selected.as_ref().map(|s| s.id)
    }

    pub fn selected_info(&self) -> Option<BTreeMap<String, String>> {
        self.selected.as_ref().map(|s| s.item.info())
    }

    /// Whether the current selection is being manipulated through the overlay.
    pub fn interactive_mode(&self) -> bool {
        self.selected.as_ref().is_some_and(|s| s.interactive.is_some())
    }

    /// Keep the overlay pinned to the selected object after the view changed.
    pub fn signal_camera_moved(&mut self, view: &ViewSnapshot) {
        let Some(object) = self.selected.as_ref().and_then(|s| s.interactive.clone()) else {
            return;
        };
        if let Some(position) = object.screen_position(view) {
            self.controls.move_interactive_controller(position, view);
        }
    }

    pub fn control_manager(&self) -> &InteractiveControlManager {
        &self.controls
    }

    pub fn control_manager_mut(&mut self) -> &mut InteractiveControlManager {
        &mut self.controls
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use bevy::math::Vec3;

    use super::*;
    use crate::engine::camera::viewport::tests::top_down_view;
    use crate::tools::control_manager::ControlWidget;
    use crate::tools::interactive_markers::menu::{MenuItem, MenuPrompt};
    use crate::tools::interactive_markers::modes::InteractionMode;

    struct Plain {
        id: SelectableId,
        selected: AtomicBool,
    }

    impl Plain {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                id: SelectableId::allocate(),
                selected: AtomicBool::new(false),
            })
        }
    }

    impl Selectable for Plain {
        fn selectable_id(&self) -> SelectableId {
            self.id
        }
        fn set_selected(&self, selected: bool) {
            self.selected.store(selected, Ordering::SeqCst);
        }
    }

    struct Handle {
        id: SelectableId,
        mode: InteractionMode,
        selected: AtomicBool,
        mouse_ups: Arc<AtomicUsize>,
        menu: Option<MenuPrompt>,
    }

    impl Handle {
        fn new(mode: InteractionMode, menu: Option<MenuPrompt>) -> Arc<Self> {
            Arc::new(Self {
                id: SelectableId::allocate(),
                mode,
                selected: AtomicBool::new(false),
                mouse_ups: Arc::new(AtomicUsize::new(0)),
                menu,
            })
        }

        fn mouse_ups(&self) -> usize {
            self.mouse_ups.load(Ordering::SeqCst)
        }
    }

    impl Selectable for Handle {
        fn selectable_id(&self) -> SelectableId {
            self.id
        }
        fn set_selected(&self, selected: bool) {
            self.selected.store(selected, Ordering::SeqCst);
        }
        fn interactive_object(&self) -> Option<Arc<dyn InteractiveObject>> {
            Some(Arc::new(HandleObject {
                mode: self.mode,
                menu: self.menu.clone(),
                mouse_ups: self.mouse_ups.clone(),
            }))
        }
    }

    struct HandleObject {
        mode: InteractionMode,
        menu: Option<MenuPrompt>,
        mouse_ups: Arc<AtomicUsize>,
    }

    impl InteractiveObject for HandleObject {
        fn interaction_mode(&self) -> InteractionMode {
            self.mode
        }
        fn screen_position(&self, _view: &ViewSnapshot) -> Option<Vec2> {
            Some(Vec2::new(80.0, 90.0))
        }
        fn screen_motion_vector(&self, _view: &ViewSnapshot) -> Vec2 {
            Vec2::X * 20.0
        }
        fn mouse_down(&self, _view: &ViewSnapshot) -> MouseDownOutcome {
            match self.mode {
                InteractionMode::Menu => MouseDownOutcome::Menu(self.menu.clone()),
                _ => MouseDownOutcome::Manipulating,
            }
        }
        fn mouse_up(&self) {
            self.mouse_ups.fetch_add(1, Ordering::SeqCst);
        }
        fn rotate(&self, _d_theta_degrees: f32, _view: &ViewSnapshot) {}
        fn translate_start(&self, _view: &ViewSnapshot) {}
        fn translate(&self, _x: f32, _y: f32, _view: &ViewSnapshot) {}
    }

    fn manager() -> SelectionManager {
        let (controls, _receiver) = InteractiveControlManager::new();
        SelectionManager::new(controls)
    }

    #[test]
    fn colours_are_unique_across_chunks() {
        let mut selection = manager();
        let mut seen = HashSet::new();
        let items: Vec<_> = (0..300).map(|_| Plain::new()).collect();
        for item in &items {
            let colour = selection.register_selectable(item.clone());
            assert_ne!(colour, SelectionColor::BACKGROUND);
            assert!(seen.insert(colour), "duplicate colour {colour:?}");
        }
        assert_eq!(selection.registered_count(), 300);
    }

    #[test]
    fn first_colour_is_just_above_grey_one() {
        let mut selection = manager();
        let colour = selection.register_selectable(Plain::new());
        assert_eq!(colour, SelectionColor::new(2, 1, 1));
    }

    #[test]
    fn removed_colour_is_reused_and_unmapped() {
        let mut selection = manager();
        let view = top_down_view(Vec3::ZERO, 100, 100);
        let first = Plain::new();
        let colour = selection.register_selectable(first.clone());

        assert_eq!(selection.remove_selectable(first.id), SelectionColor::BACKGROUND);
        assert!(!selection.select_item_with_color(colour, &view));
        assert_eq!(selection.color_of(first.id), None);

        // Drain the rest of the first chunk; the recycled colour comes next.
        let others: Vec<_> = (0..COLOUR_CHUNK_SIZE - 1).map(|_| Plain::new()).collect();
        for item in &others {
            assert_ne!(selection.register_selectable(item.clone()), colour);
        }
        assert_eq!(selection.register_selectable(Plain::new()), colour);
    }

    #[test]
    fn selection_round_trip() {
        let mut selection = manager();
        let view = top_down_view(Vec3::ZERO, 100, 100);
        let item = Plain::new();
        let colour = selection.register_selectable(item.clone());

        selection.begin_selection_draw(10.0, 20.0);
        assert!(selection.is_selection_draw());
        assert_eq!(selection.selection_coordinates(), Some(Vec2::new(10.0, 20.0)));

        assert!(selection.select_item_with_color(colour, &view));
        assert!(!selection.is_selection_draw());
        assert_eq!(selection.selected_item(), Some(item.id));
        assert!(item.selected.load(Ordering::SeqCst));
        assert!(!selection.interactive_mode());

        assert!(!selection.select_item_with_color(SelectionColor::new(9, 9, 9), &view));
        assert_eq!(selection.selected_item(), None);
        assert!(!item.selected.load(Ordering::SeqCst));
    }

    #[test]
    fn interactive_selection_drives_overlay() {
        let mut selection = manager();
        let view = top_down_view(Vec3::ZERO, 100, 100);
        let handle = Handle::new(InteractionMode::RotateAxis, None);
        let colour = selection.register_selectable(handle.clone());

        assert!(selection.select_item_with_color(colour, &view));
        assert!(selection.interactive_mode());
        let dial = selection.control_manager().overlay().widget(ControlWidget::AngleDial);
        assert!(dial.visible);
        assert_eq!(dial.centre, Vec2::new(80.0, 90.0));

        selection.clear_selection();
        assert_eq!(handle.mouse_ups(), 1);
        assert!(!selection.control_manager().overlay().widget(ControlWidget::AngleDial).visible);
    }

    #[test]
    fn picking_another_handle_releases_the_first() {
        let mut selection = manager();
        let view = top_down_view(Vec3::ZERO, 100, 100);
        let dial = Handle::new(InteractionMode::RotateAxis, None);
        let slider = Handle::new(InteractionMode::MoveAxis, None);
        let dial_colour = selection.register_selectable(dial.clone());
        let slider_colour = selection.register_selectable(slider.clone());

        assert!(selection.select_item_with_color(dial_colour, &view));
        assert!(dial.selected.load(Ordering::SeqCst));

        assert!(selection.select_item_with_color(slider_colour, &view));
        assert_eq!(dial.mouse_ups(), 1);
        assert!(!dial.selected.load(Ordering::SeqCst));
        assert!(slider.selected.load(Ordering::SeqCst));
        assert_eq!(slider.mouse_ups(), 0);
        assert_eq!(selection.selected_item(), Some(slider.id));
        assert!(selection.interactive_mode());

        let overlay = selection.control_manager().overlay();
        assert!(!overlay.widget(ControlWidget::AngleDial).visible);
        assert!(overlay.widget(ControlWidget::Translate1D).visible);
    }

    #[test]
    fn menu_press_shows_prompt_and_releases_selection() {
        let mut selection = manager();
        let view = top_down_view(Vec3::ZERO, 100, 100);
        let prompt = MenuPrompt {
            marker_name: "menu".into(),
            control_name: "button".into(),
            items: vec![MenuItem {
                id: 1,
                title: "Reset".into(),
            }],
        };
        let handle = Handle::new(InteractionMode::Menu, Some(prompt.clone()));
        let colour = selection.register_selectable(handle.clone());

        assert!(selection.select_item_with_color(colour, &view));
        assert_eq!(selection.selected_item(), None);
        assert_eq!(selection.control_manager().overlay().menu, Some(prompt));
    }
}
