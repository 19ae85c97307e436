//! Ray casting and small numeric helpers used by control manipulation.

/// Rays, skew-line closest points and ray/plane intersection.
pub mod ray;

/// Clamping, angle wrapping and quaternion decomposition helpers.
pub mod utility;

pub use ray::Ray;
