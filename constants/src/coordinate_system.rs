use bevy::math::Vec3;

/// Frame the scene is rendered relative to when nothing else is configured
pub const DEFAULT_FIXED_FRAME: &str = "world";

/// Scene up axis. Frames follow the robotics convention (X forward, Z up).
pub const UP_AXIS: Vec3 = Vec3::Z;

/// Strip a single leading slash so "/base_link" and "base_link" name the same frame.
pub fn normalise_frame_name(frame: &str) -> &str {
    frame.strip_prefix('/').unwrap_or(frame)
}
