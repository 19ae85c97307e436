/// Vertical field of view of the scene projection (degrees)
pub const FIELD_OF_VIEW_DEGREES: f32 = 45.0;

/// Near clipping plane distance (metres)
pub const NEAR_CLIP: f32 = 0.1;

/// Far clipping plane distance (metres)
pub const FAR_CLIP: f32 = 1000.0;

/// Depth of the model matrix save/restore stack
pub const MATRIX_STACK_DEPTH: usize = 16;

/// Background colour used by the normal draw pass (RGBA)
pub const CLEAR_COLOUR: [f32; 4] = [0.12, 0.12, 0.14, 1.0];

/// Grid layer extent, cells per side and cell size in metres
pub const GRID_CELL_COUNT: u32 = 10;
pub const GRID_CELL_SIZE: f32 = 1.0;
pub const GRID_COLOUR: [f32; 4] = [0.6, 0.6, 0.6, 0.5];

/// Length of axis triads drawn by the axes layer (metres)
pub const AXES_LENGTH: f32 = 1.0;

/// Radius of the disc a shape occupies in the software pick buffer (pixels)
pub const PICK_MIN_RADIUS_PX: f32 = 4.0;

/// Minimum interval between marker lifetime prune passes (milliseconds)
pub const MARKER_PRUNE_PERIOD_MS: u64 = 300;

/// Topic plain visualization markers arrive on, and its queue depth
pub const MARKER_TOPIC: &str = "/visualization_marker";
pub const MARKER_QUEUE_DEPTH: usize = 100;

/// Topic point clouds arrive on; only the newest cloud is kept
pub const POINT_CLOUD_TOPIC: &str = "/points";
pub const POINT_CLOUD_QUEUE_DEPTH: usize = 1;

/// Default flat colour of point cloud points (RGBA)
pub const POINT_CLOUD_COLOUR: [f32; 4] = [1.0, 1.0, 1.0, 1.0];

/// Grey levels a channel-coloured cloud is quantised into
pub const POINT_CLOUD_CHANNEL_BANDS: usize = 16;

/// Topic occupancy grids arrive on
pub const MAP_TOPIC: &str = "/map";
pub const MAP_QUEUE_DEPTH: usize = 1;

/// Cells per side of one map tile
pub const MAP_TILE_SIZE: u32 = 1024;

/// Grey levels of occupied, free and unknown map cells
pub const MAP_OCCUPIED_GREY: u8 = 0;
pub const MAP_FREE_GREY: u8 = 255;
pub const MAP_UNKNOWN_GREY: u8 = 127;
