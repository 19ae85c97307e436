//! On-screen manipulation widgets kept in lockstep with the 3D selection.
//!
//! ## Architecture
//!
//! The manager never touches UI objects. Every change it wants made to the
//! overlay is sent as a [`ControlCommand`] down a channel, in order, and the
//! thread owning the UI replays them through [`ControlOverlay::apply`]. The
//! manager replays the same commands into its own copy of the overlay so
//! it can hit-test touches without asking the UI.
//!
//! ```text
//! SelectionManager ──show/move/hide──▶ InteractiveControlManager
//!                                          │ ControlCommand (crossbeam)
//!                                          ▼
//!                                    UI owner: ControlOverlay::apply
//! ```

use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

use bevy::log::debug;
use bevy::math::{IVec2, Vec2};
use constants::interactive_markers::{
    ANGLE_DIAL_RADIUS_PX, MIN_MOTION_VECTOR_LENGTH, TRANSLATE_PAD_RADIUS_PX,
};
use crossbeam_channel::{Receiver, Sender};

use crate::engine::camera::ViewSnapshot;
use crate::engine::selection::InteractiveObject;
use crate::tools::interactive_markers::menu::MenuPrompt;
use crate::tools::interactive_markers::modes::InteractionMode;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlWidget {
    AngleDial,
    Translate1D,
    Translate2D,
}

impl ControlWidget {
    pub const ALL: [ControlWidget; 3] = [Self::AngleDial, Self::Translate1D, Self::Translate2D];

    fn index(self) -> usize {
        match self {
            Self::AngleDial => 0,
            Self::Translate1D => 1,
            Self::Translate2D => 2,
        }
    }

    pub fn radius(self) -> f32 {
        match self {
            Self::AngleDial => ANGLE_DIAL_RADIUS_PX,
            Self::Translate1D | Self::Translate2D => TRANSLATE_PAD_RADIUS_PX,
        }
    }
}

/// Instructions for whoever draws the overlay. Processed in send order.
#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    Show(ControlWidget),
    Hide(ControlWidget),
    HideAll,
    /// Centre the widget on `(x, y)` in touch coordinates.
    Move { widget: ControlWidget, x: i32, y: i32 },
    /// Draw angle of the 1-D pad, radians.
    SetTranslationAngle(f32),
    ShowMenu(MenuPrompt),
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WidgetState {
    pub visible: bool,
    pub centre: Vec2,
}

/// Visibility and placement of every widget, rebuilt from commands.
#[derive(Debug, Clone, Default)]
pub struct ControlOverlay {
    widgets: [WidgetState; 3],
    pub translation_angle: f32,
    pub menu: Option<MenuPrompt>,
}

impl ControlOverlay {
    pub fn apply(&mut self, command: &ControlCommand) {
        match command {
            ControlCommand::Show(widget) => self.widgets[widget.index()].visible = true,
            ControlCommand::Hide(widget) => self.widgets[widget.index()].visible = false,
            ControlCommand::HideAll => {
                for state in &mut self.widgets {
                    state.visible = false;
                }
            }
            ControlCommand::Move { widget, x, y } => {
                self.widgets[widget.index()].centre = Vec2::new(*x as f32, *y as f32);
            }
            ControlCommand::SetTranslationAngle(angle) => self.translation_angle = *angle,
            ControlCommand::ShowMenu(prompt) => self.menu = Some(prompt.clone()),
        }
    }

    pub fn widget(&self, widget: ControlWidget) -> WidgetState {
        self.widgets[widget.index()]
    }

    /// Topmost visible widget under a touch. Pads sit on top of the dial.
    pub fn hit_test(&self, point: Vec2) -> Option<ControlWidget> {
        [
            ControlWidget::Translate1D,
            ControlWidget::Translate2D,
            ControlWidget::AngleDial,
        ]
        .into_iter()
        .find(|widget| {
            let state = self.widget(*widget);
            state.visible && state.centre.distance(point) <= widget.radius()
        })
    }
}

/// A touch currently driving one of the widgets.
#[derive(Debug, Clone, Copy)]
struct WidgetDrag {
    widget: ControlWidget,
    last_angle: f32,
}

pub struct InteractiveControlManager {
    sender: Sender<ControlCommand>,
    overlay: ControlOverlay,
    mode: InteractionMode,
    active: Option<Arc<dyn InteractiveObject>>,
    last_position: Option<IVec2>,
    drag: Option<WidgetDrag>,
    moving: bool,
}

impl InteractiveControlManager {
    /// Create a manager and the receiving end of its command stream.
    pub fn new() -> (Self, Receiver<ControlCommand>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let manager = Self {
            sender,
            overlay: ControlOverlay::default(),
            mode: InteractionMode::None,
            active: None,
            last_position: None,
            drag: None,
            moving: false,
        };
        (manager, receiver)
    }

    fn send(&mut self, command: ControlCommand) {
        self.overlay.apply(&command);
        if self.sender.send(command).is_err() {
            debug!("Control overlay receiver gone, command only applied locally");
        }
    }

    /// Widgets the current mode puts on screen.
    fn widgets_for_mode(mode: InteractionMode) -> &'static [ControlWidget] {
        match mode {
            InteractionMode::RotateAxis => &[ControlWidget::AngleDial],
            InteractionMode::MoveAxis => &[ControlWidget::Translate1D],
            InteractionMode::MovePlane => &[ControlWidget::Translate2D],
            InteractionMode::MoveRotate => &[ControlWidget::AngleDial, ControlWidget::Translate2D],
            InteractionMode::Menu | InteractionMode::None => &[],
        }
    }

    fn update_translation_angle(&mut self, motion: Vec2) {
        if motion.length() > MIN_MOTION_VECTOR_LENGTH {
            self.send(ControlCommand::SetTranslationAngle(
                FRAC_PI_2 + motion.y.atan2(motion.x),
            ));
        }
    }

    pub fn show_interactive_controller(
        &mut self,
        object: Arc<dyn InteractiveObject>,
        view: &ViewSnapshot,
    ) {
        self.send(ControlCommand::HideAll);
        self.mode = object.interaction_mode();
        self.last_position = None;
        self.drag = None;
        if self.mode == InteractionMode::MoveAxis {
            self.update_translation_angle(object.screen_motion_vector(view));
        }
        self.active = Some(object);
        for widget in Self::widgets_for_mode(self.mode) {
            self.send(ControlCommand::Show(*widget));
        }
    }

    /// Centre the visible widgets on `position`. Sub-pixel moves are dropped.
    pub fn move_interactive_controller(&mut self, position: Vec2, view: &ViewSnapshot) {
        let rounded = position.round().as_ivec2();
        if self.last_position == Some(rounded) {
            return;
        }
        self.last_position = Some(rounded);

        if self.mode == InteractionMode::MoveAxis {
            if let Some(object) = self.active.clone() {
                self.update_translation_angle(object.screen_motion_vector(view));
            }
        }
        for widget in Self::widgets_for_mode(self.mode) {
            self.send(ControlCommand::Move {
                widget: *widget,
                x: rounded.x,
                y: rounded.y,
            });
        }
    }

    pub fn hide_interactive_controller(&mut self) {
        self.send(ControlCommand::HideAll);
        self.active = None;
        self.mode = InteractionMode::None;
        self.last_position = None;
        self.drag = None;
        self.moving = false;
    }

    pub fn show_menu(&mut self, prompt: MenuPrompt) {
        self.send(ControlCommand::ShowMenu(prompt));
    }

    /// Forget the menu once the UI has consumed or dismissed it.
    pub fn dismiss_menu(&mut self) {
        self.overlay.menu = None;
    }

    pub fn on_angle_change(&mut self, delta_degrees: f32, view: &ViewSnapshot) {
        let Some(object) = self.active.clone() else {
            return;
        };
        object.rotate(delta_degrees, view);
        if self.mode == InteractionMode::MoveRotate {
            self.send(ControlCommand::Hide(ControlWidget::Translate2D));
        }
        self.moving = true;
    }

    pub fn on_angle_released(&mut self) {
        if self.mode == InteractionMode::MoveRotate {
            self.send(ControlCommand::Show(ControlWidget::Translate2D));
        }
        self.moving = false;
    }

    pub fn on_translate_start(&mut self, widget: ControlWidget, view: &ViewSnapshot) {
        if widget != ControlWidget::Translate1D {
            return;
        }
        if let Some(object) = &self.active {
            object.translate_start(view);
        }
    }

    /// The pad hides while dragged so the object under it stays visible.
    pub fn on_translate(&mut self, widget: ControlWidget, x: f32, y: f32, view: &ViewSnapshot) {
        let Some(object) = self.active.clone() else {
            return;
        };
        self.moving = true;
        if self.overlay.widget(widget).visible {
            self.send(ControlCommand::Hide(widget));
        }
        object.translate(x, y, view);
    }

    pub fn on_translate_released(&mut self, widget: ControlWidget) {
        self.send(ControlCommand::Show(widget));
        self.moving = false;
    }

    /// Start driving a widget if `point` lands on one. Returns whether it did.
    pub fn begin_widget_drag(&mut self, point: Vec2, view: &ViewSnapshot) -> bool {
        if self.active.is_none() {
            return false;
        }
        let Some(widget) = self.overlay.hit_test(point) else {
            return false;
        };
        let centre = self.overlay.widget(widget).centre;
        self.drag = Some(WidgetDrag {
            widget,
            last_angle: dial_angle(centre, point),
        });
        if widget != ControlWidget::AngleDial {
            self.on_translate_start(widget, view);
        }
        true
    }

    pub fn drag_widget(&mut self, point: Vec2, view: &ViewSnapshot) {
        let Some(drag) = self.drag else {
            return;
        };
        match drag.widget {
            ControlWidget::AngleDial => {
                let angle = dial_angle(self.overlay.widget(drag.widget).centre, point);
                let delta = wrap_degrees(angle - drag.last_angle);
                self.drag = Some(WidgetDrag {
                    last_angle: angle,
                    ..drag
                });
                if delta != 0.0 {
                    self.on_angle_change(delta, view);
                }
            }
            widget => self.on_translate(widget, point.x, point.y, view),
        }
    }

    pub fn end_widget_drag(&mut self) {
        let Some(drag) = self.drag.take() else {
            return;
        };
        match drag.widget {
            ControlWidget::AngleDial => self.on_angle_released(),
            widget => self.on_translate_released(widget),
        }
    }

    pub fn is_dragging_widget(&self) -> bool {
        self.drag.is_some()
    }

    pub fn is_moving(&self) -> bool {
        self.moving
    }

    pub fn mode(&self) -> InteractionMode {
        self.mode
    }

    pub fn overlay(&self) -> &ControlOverlay {
        &self.overlay
    }
}

/// Counter-clockwise on screen is positive, so y is flipped.
fn dial_angle(centre: Vec2, point: Vec2) -> f32 {
    (-(point.y - centre.y)).atan2(point.x - centre.x).to_degrees()
}

fn wrap_degrees(delta: f32) -> f32 {
    let mut wrapped = delta % 360.0;
    if wrapped > 180.0 {
        wrapped -= 360.0;
    } else if wrapped <= -180.0 {
        wrapped += 360.0;
    }
    wrapped
}

#[cfg(test)]
mod tests {
    use std::f32::consts::PI;

    use super::*;
    use crate::engine::camera::viewport::tests::top_down_view;
    use crate::engine::selection::MouseDownOutcome;
    use bevy::math::Vec3;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recorder {
        rotations: Mutex<Vec<f32>>,
        translations: Mutex<Vec<(f32, f32)>>,
        starts: Mutex<usize>,
    }

    struct FakeObject {
        mode: InteractionMode,
        motion: Vec2,
        recorder: Arc<Recorder>,
    }

    impl InteractiveObject for FakeObject {
        fn interaction_mode(&self) -> InteractionMode {
            self.mode
        }
        fn screen_position(&self, _view: &ViewSnapshot) -> Option<Vec2> {
            Some(Vec2::new(100.0, 100.0))
        }
        fn screen_motion_vector(&self, _view: &ViewSnapshot) -> Vec2 {
            self.motion
        }
        fn mouse_down(&self, _view: &ViewSnapshot) -> MouseDownOutcome {
            MouseDownOutcome::Manipulating
        }
        fn mouse_up(&self) {}
        fn rotate(&self, d_theta_degrees: f32, _view: &ViewSnapshot) {
            self.recorder.rotations.lock().push(d_theta_degrees);
        }
        fn translate_start(&self, _view: &ViewSnapshot) {
            *self.recorder.starts.lock() += 1;
        }
        fn translate(&self, x: f32, y: f32, _view: &ViewSnapshot) {
            self.recorder.translations.lock().push((x, y));
        }
    }

    fn object(mode: InteractionMode, recorder: &Arc<Recorder>) -> Arc<dyn InteractiveObject> {
        Arc::new(FakeObject {
            mode,
            motion: Vec2::new(0.0, 40.0),
            recorder: recorder.clone(),
        })
    }

    #[test]
    fn move_rotate_shows_dial_and_plane_pad() {
        let view = top_down_view(Vec3::ZERO, 200, 200);
        let recorder = Arc::new(Recorder::default());
        let (mut icm, receiver) = InteractiveControlManager::new();

        icm.show_interactive_controller(object(InteractionMode::MoveRotate, &recorder), &view);
        icm.move_interactive_controller(Vec2::new(50.4, 60.0), &view);

        let commands: Vec<_> = receiver.try_iter().collect();
        assert_eq!(commands[0], ControlCommand::HideAll);
        assert!(commands.contains(&ControlCommand::Show(ControlWidget::AngleDial)));
        assert!(commands.contains(&ControlCommand::Show(ControlWidget::Translate2D)));
        assert!(commands.contains(&ControlCommand::Move {
            widget: ControlWidget::Translate2D,
            x: 50,
            y: 60
        }));

        let mut mirror = ControlOverlay::default();
        for command in &commands {
            mirror.apply(command);
        }
        assert!(mirror.widget(ControlWidget::AngleDial).visible);
        assert!(!mirror.widget(ControlWidget::Translate1D).visible);
        assert_eq!(mirror.widget(ControlWidget::Translate2D), icm.overlay().widget(ControlWidget::Translate2D));
    }

    #[test]
    fn unchanged_position_sends_nothing() {
        let view = top_down_view(Vec3::ZERO, 200, 200);
        let recorder = Arc::new(Recorder::default());
        let (mut icm, receiver) = InteractiveControlManager::new();
        icm.show_interactive_controller(object(InteractionMode::MovePlane, &recorder), &view);
        icm.move_interactive_controller(Vec2::new(10.0, 10.0), &view);
        let _ = receiver.try_iter().count();

        icm.move_interactive_controller(Vec2::new(10.2, 9.9), &view);
        assert_eq!(receiver.try_iter().count(), 0);
    }

    #[test]
    fn move_axis_sets_pad_angle_from_motion_vector() {
        let view = top_down_view(Vec3::ZERO, 200, 200);
        let recorder = Arc::new(Recorder::default());
        let (mut icm, _receiver) = InteractiveControlManager::new();
        icm.show_interactive_controller(object(InteractionMode::MoveAxis, &recorder), &view);
        assert!((icm.overlay().translation_angle - PI).abs() < 1e-5);
    }

    #[test]
    fn rotating_in_move_rotate_hides_then_restores_pad() {
        let view = top_down_view(Vec3::ZERO, 200, 200);
        let recorder = Arc::new(Recorder::default());
        let (mut icm, _receiver) = InteractiveControlManager::new();
        icm.show_interactive_controller(object(InteractionMode::MoveRotate, &recorder), &view);

        icm.on_angle_change(15.0, &view);
        assert!(icm.is_moving());
        assert!(!icm.overlay().widget(ControlWidget::Translate2D).visible);

        icm.on_angle_released();
        assert!(!icm.is_moving());
        assert!(icm.overlay().widget(ControlWidget::Translate2D).visible);
        assert_eq!(*recorder.rotations.lock(), vec![15.0]);
    }

    #[test]
    fn dragging_the_axis_pad_translates_the_object() {
        let view = top_down_view(Vec3::ZERO, 200, 200);
        let recorder = Arc::new(Recorder::default());
        let (mut icm, _receiver) = InteractiveControlManager::new();
        icm.show_interactive_controller(object(InteractionMode::MoveAxis, &recorder), &view);
        icm.move_interactive_controller(Vec2::new(100.0, 100.0), &view);

        assert!(!icm.begin_widget_drag(Vec2::new(0.0, 0.0), &view));
        assert!(icm.begin_widget_drag(Vec2::new(105.0, 100.0), &view));
        icm.drag_widget(Vec2::new(120.0, 100.0), &view);
        assert!(icm.is_moving());
        icm.end_widget_drag();

        assert!(!icm.is_moving());
        assert_eq!(*recorder.starts.lock(), 1);
        assert_eq!(*recorder.translations.lock(), vec![(120.0, 100.0)]);
        assert!(icm.overlay().widget(ControlWidget::Translate1D).visible);
    }

    #[test]
    fn dial_drag_reports_wrapped_degrees() {
        assert!((wrap_degrees(350.0) + 10.0).abs() < 1e-4);
        assert!((wrap_degrees(-190.0) - 170.0).abs() < 1e-4);
        let centre = Vec2::new(50.0, 50.0);
        assert!((dial_angle(centre, Vec2::new(50.0, 0.0)) - 90.0).abs() < 1e-4);
    }
}
