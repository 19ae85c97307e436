use bevy::prelude::*;
use crossbeam_channel::Receiver;

use crate::engine::render::LineCanvas;
use crate::engine::scene::VisualizationScene;
use crate::tools::control_manager::{ControlCommand, ControlOverlay, ControlWidget};
use crate::tools::demo_server::DemoMarkerServer;

/// The visualisation scene and what feeds it, owned by the main thread.
///
/// Held as a non-send resource: layers are `Send` but not `Sync`, and all
/// scene calls happen from the main schedule anyway.
pub struct PreviewState {
    pub scene: VisualizationScene,
    pub server: DemoMarkerServer,
    pub commands: Receiver<ControlCommand>,
    /// UI-side replay of the control command stream.
    pub overlay: ControlOverlay,
    pub canvas: LineCanvas,
    /// Menu buttons need rebuilding from `overlay.menu`.
    pub menu_dirty: bool,
}

/// Mouse state carried between frames to synthesise touch gestures.
#[derive(Resource, Default)]
pub struct PointerState {
    pub left_down: bool,
    pub last_cursor: Option<Vec2>,
    pub last_release_secs: Option<f64>,
}

#[derive(Resource)]
pub struct ServerTimer(pub Timer);

/// UI node mirroring one overlay widget.
#[derive(Component)]
pub struct OverlayWidget(pub ControlWidget);

#[derive(Component)]
pub struct MenuPanel;

#[derive(Component)]
pub struct MenuItemButton {
    pub id: u32,
}

#[derive(Component)]
pub struct FpsText;
