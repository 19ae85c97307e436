use std::f32::consts::TAU;

use bevy::math::{EulerRot, Quat, Vec3};

/// Clamp `value` into `[min, max]`.
pub fn cap(value: f32, min: f32, max: f32) -> f32 {
    value.max(min).min(max)
}

/// Wrap an angle into `[0, 2π)`.
pub fn angle_wrap(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if wrapped >= TAU { 0.0 } else { wrapped }
}

/// Largest element, or `-∞` for an empty slice.
pub fn array_max(values: &[f32]) -> f32 {
    values.iter().copied().fold(f32::NEG_INFINITY, f32::max)
}

/// Smallest element, or `+∞` for an empty slice.
pub fn array_min(values: &[f32]) -> f32 {
    values.iter().copied().fold(f32::INFINITY, f32::min)
}

/// Rotation angle of a unit quaternion, in radians.
pub fn quaternion_angle(q: Quat) -> f32 {
    2.0 * cap(q.w, -1.0, 1.0).acos()
}

/// Rotation axis of a unit quaternion. Identity rotations report +X.
pub fn quaternion_axis(q: Quat) -> Vec3 {
    let s = (1.0 - q.w * q.w).max(0.0).sqrt();
    if s < 1e-6 {
        Vec3::X
    } else {
        Vec3::new(q.x, q.y, q.z) / s
    }
}

/// Roll (X), pitch (Y), yaw (Z) to a quaternion, applied in fixed-axis XYZ order.
pub fn rpy_to_quaternion(roll: f32, pitch: f32, yaw: f32) -> Quat {
    Quat::from_euler(EulerRot::ZYX, yaw, pitch, roll)
}

/// Replace an all-zero or non-finite quaternion with identity, normalise otherwise.
pub fn correct_quaternion(q: Quat) -> Quat {
    let length_squared = q.length_squared();
    if !length_squared.is_finite() || length_squared < 1e-12 {
        Quat::IDENTITY
    } else {
        q.normalize()
    }
}

pub fn contains_nan(v: Vec3) -> bool {
    v.is_nan()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn array_extremes_handle_negative_input() {
        let values = [-3.0, -1.5, -7.25];
        assert_eq!(array_max(&values), -1.5);
        assert_eq!(array_min(&values), -7.25);
        assert_eq!(array_max(&[]), f32::NEG_INFINITY);
    }

    #[test]
    fn angle_wrap_stays_in_range() {
        assert!((angle_wrap(-FRAC_PI_2) - 3.0 * FRAC_PI_2).abs() < 1e-5);
        assert!((angle_wrap(TAU + 0.25) - 0.25).abs() < 1e-5);
        assert!(angle_wrap(-1e-9) < TAU);
    }

    #[test]
    fn cap_clamps_both_ends() {
        assert_eq!(cap(5.0, 0.0, 1.0), 1.0);
        assert_eq!(cap(-5.0, 0.0, 1.0), 0.0);
        assert_eq!(cap(0.5, 0.0, 1.0), 0.5);
    }

    #[test]
    fn zero_quaternion_becomes_identity() {
        let corrected = correct_quaternion(Quat::from_xyzw(0.0, 0.0, 0.0, 0.0));
        assert_eq!(corrected, Quat::IDENTITY);

        let scaled = correct_quaternion(Quat::from_xyzw(0.0, 0.0, 0.0, 2.0));
        assert!(scaled.abs_diff_eq(Quat::IDENTITY, 1e-6));
    }

    #[test]
    fn axis_and_angle_recover_rotation() {
        let q = Quat::from_axis_angle(Vec3::Z, PI / 3.0);
        assert!((quaternion_angle(q) - PI / 3.0).abs() < 1e-5);
        assert!(quaternion_axis(q).abs_diff_eq(Vec3::Z, 1e-5));
    }

    #[test]
    fn yaw_rotates_about_z() {
        let q = rpy_to_quaternion(0.0, 0.0, FRAC_PI_2);
        assert!((q * Vec3::X).abs_diff_eq(Vec3::Y, 1e-5));
    }
}
