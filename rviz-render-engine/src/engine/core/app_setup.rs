use std::path::PathBuf;

use bevy::asset::AssetMetaCheck;
use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::input::mouse::{MouseScrollUnit, MouseWheel};
use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use constants::camera::{DOUBLE_CLICK_SECS, WHEEL_PIXELS_PER_LINE, WHEEL_ZOOM_BASE};
use constants::interactive_markers::DEMO_SERVER_PERIOD_SECS;
use constants::render_settings::{CLEAR_COLOUR, FAR_CLIP, FIELD_OF_VIEW_DEGREES, NEAR_CLIP};
use web_time::Instant;

use crate::engine::core::app_state::{
    FpsText, MenuItemButton, MenuPanel, OverlayWidget, PointerState, PreviewState, ServerTimer,
};
use crate::engine::core::window_config::create_window_config;
use crate::engine::render::LineCanvas;
use crate::engine::scene::{VisualizationConfig, VisualizationScene};
use crate::messages::{BusError, LocalBus};
use crate::rpc::web_bridge::WebBridgePlugin;
use crate::tools::control_manager::{ControlCommand, ControlOverlay, ControlWidget};
use crate::tools::demo_server::DemoMarkerServer;
use crate::tools::orbit_controls::Gesture;

/// Build the preview app. `config_path` points at an optional JSON
/// visualisation config; defaults apply when it is absent or unreadable.
pub fn create_app(config_path: Option<PathBuf>) -> Result<App, BusError> {
    let mut app = App::new();

    // Logging comes up with the default plugins, so load the config after.
    app.add_plugins(create_default_plugins())
        .add_plugins(FrameTimeDiagnosticsPlugin::default());

    let config = VisualizationConfig::load_or_default(config_path.as_deref());
    let bus = LocalBus::new();
    let (scene, commands) = VisualizationScene::new(config, bus.clone())?;
    let server = DemoMarkerServer::start(bus.clone(), &scene.config().marker_topic_root)?;

    let [r, g, b, a] = CLEAR_COLOUR;
    app.add_plugins(WebBridgePlugin::new(bus))
        .insert_resource(ClearColor(Color::srgba(r, g, b, a)))
        .insert_non_send_resource(PreviewState {
            scene,
            server,
            commands,
            overlay: ControlOverlay::default(),
            canvas: LineCanvas::default(),
            menu_dirty: false,
        })
        .init_resource::<PointerState>()
        .insert_resource(ServerTimer(Timer::from_seconds(
            DEMO_SERVER_PERIOD_SECS,
            TimerMode::Repeating,
        )))
        .add_systems(Startup, setup)
        .add_systems(
            Update,
            (
                tick_demo_server,
                spin_bus,
                handle_pointer_input,
                handle_menu_buttons,
                apply_overlay_commands,
                rebuild_menu,
                draw_scene,
                sync_bevy_camera,
            )
                .chain(),
        );

    // Add fps_text_update_system only for native builds.
    #[cfg(not(target_arch = "wasm32"))]
    {
        app.add_systems(Update, fps_text_update_system);
    }

    Ok(app)
}

fn create_default_plugins() -> impl PluginGroup {
    let window_config = WindowPlugin {
        primary_window: Some(create_window_config()),
        ..default()
    };

    let asset_config = AssetPlugin {
        meta_check: AssetMetaCheck::Never,
        ..default()
    };

    DefaultPlugins.set(window_config).set(asset_config)
}

fn setup(mut commands: Commands) {
    commands.spawn((
        Camera3d::default(),
        Projection::from(PerspectiveProjection {
            fov: FIELD_OF_VIEW_DEGREES.to_radians(),
            near: NEAR_CLIP,
            far: FAR_CLIP,
            ..default()
        }),
        Transform::default(),
    ));

    create_overlay(&mut commands);

    #[cfg(not(target_arch = "wasm32"))]
    {
        create_native_overlays(&mut commands);
    }
}

fn widget_size(widget: ControlWidget) -> Vec2 {
    let diameter = widget.radius() * 2.0;
    match widget {
        // Long side along the translation axis once rotated.
        ControlWidget::Translate1D => Vec2::new(diameter * 0.4, diameter),
        ControlWidget::AngleDial | ControlWidget::Translate2D => Vec2::splat(diameter),
    }
}

fn create_overlay(commands: &mut Commands) {
    commands
        .spawn(Node {
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            ..default()
        })
        .with_children(|parent| {
            for widget in ControlWidget::ALL {
                let size = widget_size(widget);
                let alpha = match widget {
                    ControlWidget::AngleDial => 0.25,
                    ControlWidget::Translate1D | ControlWidget::Translate2D => 0.45,
                };
                parent.spawn((
                    Node {
                        position_type: PositionType::Absolute,
                        width: Val::Px(size.x),
                        height: Val::Px(size.y),
                        border: UiRect::all(Val::Px(2.0)),
                        ..default()
                    },
                    BackgroundColor(Color::srgba(0.2, 0.6, 1.0, alpha)),
                    BorderColor(Color::srgba(0.8, 0.9, 1.0, 0.8)),
                    BorderRadius::MAX,
                    Visibility::Hidden,
                    OverlayWidget(widget),
                ));
            }

            parent.spawn((
                Node {
                    position_type: PositionType::Absolute,
                    top: Val::Px(12.0),
                    left: Val::Px(12.0),
                    flex_direction: FlexDirection::Column,
                    row_gap: Val::Px(4.0),
                    ..default()
                },
                MenuPanel,
            ));
        });
}

#[cfg(not(target_arch = "wasm32"))]
fn create_native_overlays(commands: &mut Commands) {
    commands
        .spawn(Node {
            width: Val::Percent(100.0),
            height: Val::Percent(100.0),
            ..default()
        })
        .with_children(|parent| {
            parent.spawn((
                Text::new("FPS: "),
                TextFont {
                    font_size: 16.0,
                    ..default()
                },
                TextColor(Color::srgb(1., 0., 0.)),
                Node {
                    position_type: PositionType::Absolute,
                    bottom: Val::Px(12.0),
                    right: Val::Px(12.0),
                    ..default()
                },
                FpsText,
            ));
        });
}

fn tick_demo_server(
    time: Res<Time>,
    mut timer: ResMut<ServerTimer>,
    state: NonSend<PreviewState>,
) {
    if !timer.0.tick(time.delta()).just_finished() {
        return;
    }
    if let Err(e) = state.server.tick() {
        error!("Demo server broadcast failed: {}", e);
    }
}

fn spin_bus(state: NonSend<PreviewState>) {
    let delivered = state.scene.spin();
    if delivered > 0 {
        trace!("Delivered {} bus messages", delivered);
    }
}

/// Left button drives the single touch, right drag pans, the wheel pinches
/// and a quick second click is a double tap.
fn handle_pointer_input(
    windows: Query<&Window, With<PrimaryWindow>>,
    buttons: Res<ButtonInput<MouseButton>>,
    mut wheel: EventReader<MouseWheel>,
    menu_buttons: Query<&Interaction, With<MenuItemButton>>,
    time: Res<Time>,
    mut pointer: ResMut<PointerState>,
    mut state: NonSendMut<PreviewState>,
) {
    let Ok(window) = windows.single() else {
        return;
    };
    let state = &mut *state;
    state
        .scene
        .set_viewport_size(window.width().round() as u32, window.height().round() as u32);

    for event in wheel.read() {
        let lines = match event.unit {
            MouseScrollUnit::Line => event.y,
            MouseScrollUnit::Pixel => event.y / WHEEL_PIXELS_PER_LINE,
        };
        state.scene.handle_gesture(Gesture::Pinch {
            scale: WHEEL_ZOOM_BASE.powf(lines),
            focus_distance: Vec2::ZERO,
        });
    }

    let Some(cursor) = window.cursor_position() else {
        return;
    };
    let over_menu = menu_buttons.iter().any(|i| *i != Interaction::None);

    if buttons.just_pressed(MouseButton::Left) && !over_menu {
        if state.overlay.menu.take().is_some() {
            state.scene.dismiss_menu();
            state.menu_dirty = true;
        }
        state.scene.on_touch_down(cursor);
        pointer.left_down = true;
    } else if pointer.left_down
        && buttons.pressed(MouseButton::Left)
        && pointer.last_cursor != Some(cursor)
    {
        state.scene.on_touch_move(cursor);
    }

    if pointer.left_down && buttons.just_released(MouseButton::Left) {
        state.scene.on_touch_up(cursor);
        pointer.left_down = false;

        let now = time.elapsed_secs_f64();
        if pointer
            .last_release_secs
            .is_some_and(|last| now - last < DOUBLE_CLICK_SECS)
        {
            state.scene.handle_gesture(Gesture::DoubleTap);
            pointer.last_release_secs = None;
        } else {
            pointer.last_release_secs = Some(now);
        }
    }

    if buttons.pressed(MouseButton::Right) {
        if let Some(last) = pointer.last_cursor {
            let distance = last - cursor;
            if distance != Vec2::ZERO {
                state.scene.handle_gesture(Gesture::Pan { distance });
            }
        }
    }

    pointer.last_cursor = Some(cursor);
}

fn handle_menu_buttons(
    interactions: Query<(&Interaction, &MenuItemButton), Changed<Interaction>>,
    mut state: NonSendMut<PreviewState>,
) {
    for (interaction, item) in &interactions {
        if *interaction != Interaction::Pressed {
            continue;
        }
        let Some(prompt) = state.overlay.menu.clone() else {
            continue;
        };
        // A deeper level arrives as a ShowMenu command; a leaf closes the menu.
        if state.scene.select_menu_entry(&prompt, item.id).is_none() {
            state.overlay.menu = None;
        }
        state.menu_dirty = true;
    }
}

/// Replay overlay commands and place the widget nodes to match.
fn apply_overlay_commands(
    mut state: NonSendMut<PreviewState>,
    mut widgets: Query<(&OverlayWidget, &mut Node, &mut Visibility, &mut Transform)>,
) {
    let state = &mut *state;
    for command in state.commands.try_iter() {
        if matches!(command, ControlCommand::ShowMenu(_)) {
            state.menu_dirty = true;
        }
        state.overlay.apply(&command);
    }

    for (widget, mut node, mut visibility, mut transform) in &mut widgets {
        let placement = state.overlay.widget(widget.0);
        let size = widget_size(widget.0);
        node.left = Val::Px(placement.centre.x - size.x / 2.0);
        node.top = Val::Px(placement.centre.y - size.y / 2.0);
        *visibility = if placement.visible {
            Visibility::Visible
        } else {
            Visibility::Hidden
        };
        if widget.0 == ControlWidget::Translate1D {
            transform.rotation = Quat::from_rotation_z(state.overlay.translation_angle);
        }
    }
}

fn rebuild_menu(
    mut commands: Commands,
    mut state: NonSendMut<PreviewState>,
    panels: Query<Entity, With<MenuPanel>>,
    items: Query<Entity, With<MenuItemButton>>,
) {
    if !state.menu_dirty {
        return;
    }
    state.menu_dirty = false;

    for item in &items {
        commands.entity(item).despawn();
    }
    let (Some(prompt), Ok(panel)) = (&state.overlay.menu, panels.single()) else {
        return;
    };

    commands.entity(panel).with_children(|parent| {
        for item in &prompt.items {
            parent
                .spawn((
                    Button,
                    Node {
                        padding: UiRect::axes(Val::Px(10.0), Val::Px(6.0)),
                        ..default()
                    },
                    BackgroundColor(Color::srgba(0.15, 0.15, 0.18, 0.9)),
                    MenuItemButton { id: item.id },
                ))
                .with_children(|button| {
                    button.spawn((
                        Text::new(item.title.clone()),
                        TextFont {
                            font_size: 16.0,
                            ..default()
                        },
                        TextColor(Color::WHITE),
                    ));
                });
        }
    });
}

fn draw_scene(mut gizmos: Gizmos, mut state: NonSendMut<PreviewState>) {
    let state = &mut *state;
    state.scene.on_draw_frame(&mut state.canvas, Instant::now());
    for line in state.canvas.lines() {
        gizmos.line(line.start, line.end, line.colour);
    }
}

/// Keep the Bevy camera on the scene camera's view.
fn sync_bevy_camera(
    state: NonSend<PreviewState>,
    mut cameras: Query<&mut Transform, With<Camera3d>>,
) {
    let view = state.scene.camera().snapshot();
    for mut transform in &mut cameras {
        *transform = Transform::from_matrix(view.view.inverse());
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn fps_text_update_system(
    diagnostics: Res<DiagnosticsStore>,
    mut query: Query<&mut Text, With<FpsText>>,
) {
    for mut text in &mut query {
        if let Some(fps) = diagnostics.get(&FrameTimeDiagnosticsPlugin::FPS) {
            if let Some(value) = fps.smoothed() {
                text.0 = format!("FPS: {value:.1}");
            }
        }
    }
}
