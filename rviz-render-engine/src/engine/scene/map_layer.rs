use std::sync::Arc;

use bevy::color::LinearRgba;
use bevy::log::{debug, warn};
use bevy::math::{Mat4, Quat, Vec3};
use constants::render_settings::{
    MAP_FREE_GREY, MAP_OCCUPIED_GREY, MAP_QUEUE_DEPTH, MAP_TILE_SIZE, MAP_UNKNOWN_GREY,
};
use parking_lot::Mutex;

use crate::engine::geometry::utility::correct_quaternion;
use crate::engine::render::{DrawContext, FrameContext, Layer, LayerCapabilities, Shape};
use crate::messages::nav_msgs::OccupancyGrid;
use crate::messages::{BusError, LocalBus, Subscription};

/// Grey level of one occupancy value: black when occupied, white when free
/// and mid grey for everything else, unknown included.
pub fn cell_grey(value: i8) -> u8 {
    match value {
        100 => MAP_OCCUPIED_GREY,
        0 => MAP_FREE_GREY,
        _ => MAP_UNKNOWN_GREY,
    }
}

/// A block of at most `MAP_TILE_SIZE` cells per side.
#[derive(Debug, Clone, PartialEq)]
pub struct MapTile {
    /// Tile column and row in the grid.
    pub column: u32,
    pub row: u32,
    pub width: u32,
    pub height: u32,
    /// Row-major grey levels.
    pub pixels: Vec<u8>,
}

impl MapTile {
    pub fn grey(&self, u: u32, v: u32) -> Option<u8> {
        if u >= self.width || v >= self.height {
            return None;
        }
        self.pixels.get((v * self.width + u) as usize).copied()
    }
}

/// Split a grid into tiles. Cells missing from a short `data` array count
/// as unknown.
pub fn tile_grid(grid: &OccupancyGrid) -> Vec<MapTile> {
    let (width, height) = (grid.info.width, grid.info.height);
    let mut tiles = Vec::new();
    for row in 0..height.div_ceil(MAP_TILE_SIZE) {
        for column in 0..width.div_ceil(MAP_TILE_SIZE) {
            let (x0, y0) = (column * MAP_TILE_SIZE, row * MAP_TILE_SIZE);
            let tile_width = (width - x0).min(MAP_TILE_SIZE);
            let tile_height = (height - y0).min(MAP_TILE_SIZE);
            let mut pixels = Vec::with_capacity((tile_width * tile_height) as usize);
            for v in y0..y0 + tile_height {
                for u in x0..x0 + tile_width {
                    let value = grid
                        .data
                        .get((v * width + u) as usize)
                        .copied()
                        .unwrap_or(-1);
                    pixels.push(cell_grey(value));
                }
            }
            tiles.push(MapTile {
                column,
                row,
                width: tile_width,
                height: tile_height,
                pixels,
            });
        }
    }
    tiles
}

struct DisplayedMap {
    frame: String,
    /// Grid cell space to map frame.
    origin: Mat4,
    resolution: f32,
    tiles: Vec<MapTile>,
    /// Tile borders and occupied cells, in cell units.
    outlines: Shape,
    occupied: Shape,
}

impl DisplayedMap {
    fn new(grid: &OccupancyGrid) -> Self {
        let info = &grid.info;
        let rotation = correct_quaternion(Quat::from(&info.origin.orientation));
        let origin = Mat4::from_rotation_translation(rotation, Vec3::from(&info.origin.position));
        let tiles = tile_grid(grid);

        let mut borders = Vec::new();
        let mut occupied = Vec::new();
        for tile in &tiles {
            let x0 = (tile.column * MAP_TILE_SIZE) as f32;
            let y0 = (tile.row * MAP_TILE_SIZE) as f32;
            let (x1, y1) = (x0 + tile.width as f32, y0 + tile.height as f32);
            let corners = [
                Vec3::new(x0, y0, 0.0),
                Vec3::new(x1, y0, 0.0),
                Vec3::new(x1, y1, 0.0),
                Vec3::new(x0, y1, 0.0),
            ];
            for i in 0..4 {
                borders.push(corners[i]);
                borders.push(corners[(i + 1) % 4]);
            }
            for v in 0..tile.height {
                for u in 0..tile.width {
                    if tile.grey(u, v) == Some(MAP_OCCUPIED_GREY) {
                        occupied.push(Vec3::new(x0 + u as f32 + 0.5, y0 + v as f32 + 0.5, 0.0));
                    }
                }
            }
        }

        Self {
            frame: grid.header.frame_id.clone(),
            origin,
            resolution: info.resolution,
            tiles,
            outlines: Shape::LineList(borders),
            occupied: Shape::Points(occupied),
        }
    }
}

/// Occupancy grid from one topic, drawn in its header frame at the pose of
/// the grid origin.
pub struct MapLayer {
    incoming: Arc<Mutex<Option<OccupancyGrid>>>,
    _subscription: Subscription,
    map: Option<DisplayedMap>,
    enabled: bool,
}

impl MapLayer {
    pub fn new(bus: &LocalBus, topic: &str) -> Result<Self, BusError> {
        let incoming = Arc::new(Mutex::new(None));
        let mailbox = incoming.clone();
        let subscription = bus.subscribe(topic, MAP_QUEUE_DEPTH, move |msg: &OccupancyGrid| {
            *mailbox.lock() = Some(msg.clone());
        })?;
        Ok(Self {
            incoming,
            _subscription: subscription,
            map: None,
            enabled: true,
        })
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn status(&self) -> &'static str {
        if self.map.is_some() {
            "OK"
        } else {
            "No map exists!"
        }
    }

    pub fn tiles(&self) -> &[MapTile] {
        self.map.as_ref().map_or(&[], |map| map.tiles.as_slice())
    }

    /// Map-frame centre of cell `(u, v)` of the current grid.
    pub fn cell_centre(&self, u: u32, v: u32) -> Option<Vec3> {
        let map = self.map.as_ref()?;
        let cell = Vec3::new(u as f32 + 0.5, v as f32 + 0.5, 0.0) * map.resolution;
        Some(map.origin.transform_point3(cell))
    }
}

impl Layer for MapLayer {
    fn name(&self) -> &str {
        "Map"
    }

    fn capabilities(&self) -> LayerCapabilities {
        LayerCapabilities::DRAWABLE | LayerCapabilities::FRAME_ANCHORED
    }

    fn frame(&self) -> Option<&str> {
        self.map.as_ref().map(|map| map.frame.as_str())
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn prepare(&mut self, _frame: &mut FrameContext<'_>) {
        let Some(grid) = self.incoming.lock().take() else {
            return;
        };
        let info = &grid.info;
        if info.resolution <= 0.0 || !info.resolution.is_finite() {
            warn!("Ignoring map with resolution {}", info.resolution);
            return;
        }
        debug!(
            "Map of {}x{} cells at {} m in {}",
            info.width, info.height, info.resolution, grid.header.frame_id
        );
        self.map = Some(DisplayedMap::new(&grid));
    }

    fn draw(&self, ctx: &mut DrawContext<'_>) {
        let Some(map) = &self.map else {
            return;
        };
        ctx.camera.push_m();
        let model = ctx.camera.model_stack();
        model.multiply(map.origin);
        model.multiply(Mat4::from_scale(Vec3::splat(map.resolution)));
        let grey = MAP_UNKNOWN_GREY as f32 / 255.0;
        ctx.draw(&map.outlines, LinearRgba::new(grey, grey, grey, 1.0));
        ctx.draw(&map.occupied, LinearRgba::BLACK);
        ctx.camera.pop_m();
    }
}
