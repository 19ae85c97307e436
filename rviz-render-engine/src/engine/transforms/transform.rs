use bevy::math::{Mat4, Quat, Vec3};

use crate::engine::geometry::utility::correct_quaternion;
use crate::messages::geometry_msgs::{Pose, Transform as TransformMsg};

/// Rigid transform: rotation followed by translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameTransform {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Default for FrameTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl FrameTransform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    /// Build a transform, correcting degenerate rotations to identity.
    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation: correct_quaternion(rotation),
        }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self::new(translation, Quat::IDENTITY)
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.rotation, self.translation)
    }

    /// `self ∘ other`: apply `other` first, then `self`.
    pub fn compose(&self, other: &FrameTransform) -> FrameTransform {
        FrameTransform {
            translation: self.translation + self.rotation * other.translation,
            rotation: (self.rotation * other.rotation).normalize(),
        }
    }

    pub fn inverse(&self) -> FrameTransform {
        let rotation = self.rotation.inverse();
        FrameTransform {
            translation: -(rotation * self.translation),
            rotation,
        }
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation * point + self.translation
    }
}

impl From<&TransformMsg> for FrameTransform {
    fn from(msg: &TransformMsg) -> Self {
        Self::new(msg.translation.into(), msg.rotation.into())
    }
}

impl From<&Pose> for FrameTransform {
    fn from(pose: &Pose) -> Self {
        Self::new(pose.position.into(), pose.orientation.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn compose_then_inverse_is_identity() {
        let a = FrameTransform::new(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_z(FRAC_PI_2));
        let round_trip = a.compose(&a.inverse());
        assert!(round_trip.translation.abs_diff_eq(Vec3::ZERO, 1e-5));
        assert!(round_trip.rotation.abs_diff_eq(Quat::IDENTITY, 1e-5));
    }

    #[test]
    fn matrix_agrees_with_point_transform() {
        let t = FrameTransform::new(Vec3::new(0.5, 0.0, -1.0), Quat::from_rotation_x(0.3));
        let p = Vec3::new(1.0, -2.0, 0.25);
        assert!(t.to_matrix().transform_point3(p).abs_diff_eq(t.transform_point(p), 1e-5));
    }

    #[test]
    fn zero_rotation_is_corrected() {
        let t = FrameTransform::new(Vec3::X, Quat::from_xyzw(0.0, 0.0, 0.0, 0.0));
        assert_eq!(t.rotation, Quat::IDENTITY);
    }
}
