/// Topic root used when no other interactive marker server is configured
pub const DEFAULT_TOPIC_ROOT: &str = "/basic_controls";

/// Suffix of the incremental update stream
pub const UPDATE_SUFFIX: &str = "/update";

/// Suffix of the full-state snapshot stream
pub const UPDATE_FULL_SUFFIX: &str = "/update_full";

/// Suffix of the feedback topic the client publishes on
pub const FEEDBACK_SUFFIX: &str = "/feedback";

/// Subscriber queue depth for both marker streams
pub const QUEUE_DEPTH: usize = 20;

/// Watchdog period of the update stream manager (milliseconds)
pub const WATCHDOG_PERIOD_MS: u64 = 1000;

/// Silence on the update stream longer than this forces a resync (milliseconds)
pub const UPDATE_TIMEOUT_MS: u64 = 1000;

/// Appended to the node name to form the feedback client id
pub const CLIENT_ID_SUFFIX: &str = "/Interactive Markers";

/// Default node name of the visualiser
pub const DEFAULT_NODE_NAME: &str = "rviz_render_engine";

/// Auto-generated ring geometry
pub const RING_INNER_RADIUS: f32 = 0.5;
pub const RING_OUTER_RADIUS: f32 = 0.65;
pub const RING_SEGMENTS: usize = 20;

/// Auto-generated arrow geometry, arrows sit at ±ARROW_OFFSET on X
pub const ARROW_OFFSET: f32 = 0.5;
pub const ARROW_SHAFT_DIAMETER: f32 = 0.08;
pub const ARROW_HEAD_DIAMETER: f32 = 0.15;
pub const ARROW_HEAD_LENGTH: f32 = 0.2;
pub const ARROW_LENGTH: f32 = 0.2;

/// Alpha of auto-generated control tints
pub const AUTO_TINT_ALPHA: f32 = 0.7;

/// Screen motion vectors shorter than this leave the 1-D pad angle unchanged (pixels)
pub const MIN_MOTION_VECTOR_LENGTH: f32 = 10.0;

/// A screen axis shorter than this cannot drive a MOVE_AXIS drag (pixels)
pub const MIN_SCREEN_AXIS_LENGTH: f32 = 0.5;

/// On-screen radius of the angle dial widget (pixels)
pub const ANGLE_DIAL_RADIUS_PX: f32 = 90.0;

/// On-screen radius of the 1-D and 2-D translate pads (pixels)
pub const TRANSLATE_PAD_RADIUS_PX: f32 = 45.0;

/// Demo server broadcast period.
pub const DEMO_SERVER_PERIOD_SECS: f32 = 0.5;
