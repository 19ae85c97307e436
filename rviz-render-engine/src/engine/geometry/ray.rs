use bevy::math::Vec3;

/// Below this, lengths and denominators are treated as zero.
pub const RAY_EPSILON: f32 = 1e-6;

/// Half-line in world space. The direction is not required to be unit length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub start: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(start: Vec3, direction: Vec3) -> Self {
        Self { start, direction }
    }

    /// Ray through two points, starting at `from`.
    pub fn through(from: Vec3, to: Vec3) -> Self {
        Self {
            start: from,
            direction: to - from,
        }
    }

    pub fn point_at(&self, t: f32) -> Vec3 {
        self.start + self.direction * t
    }

    /// Point on this ray closest to `other` (skew-line formula).
    ///
    /// Returns `None` when either direction is degenerate or the rays are
    /// parallel, where the closest point is not unique.
    pub fn closest_point(&self, other: &Ray) -> Option<Vec3> {
        let p13 = self.start - other.start;
        let p43 = other.direction;
        let p21 = self.direction;

        if p43.length_squared() < RAY_EPSILON || p21.length_squared() < RAY_EPSILON {
            return None;
        }

        let d1343 = p13.dot(p43);
        let d4321 = p43.dot(p21);
        let d1321 = p13.dot(p21);
        let d4343 = p43.dot(p43);
        let d2121 = p21.dot(p21);

        let denom = d2121 * d4343 - d4321 * d4321;
        if denom.abs() < RAY_EPSILON {
            return None;
        }

        let numer = d1343 * d4321 - d1321 * d4343;
        let mua = numer / denom;
        Some(self.point_at(mua))
    }

    /// Parametric ray/plane intersection, `None` if the ray runs parallel to the plane.
    pub fn intersect_plane(&self, plane_point: Vec3, plane_normal: Vec3) -> Option<Vec3> {
        let denom = plane_normal.dot(self.direction);
        if denom.abs() < RAY_EPSILON {
            return None;
        }
        let t = plane_normal.dot(plane_point - self.start) / denom;
        let hit = self.point_at(t);
        (!hit.is_nan()).then_some(hit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closest_point_on_skew_lines() {
        let axis = Ray::new(Vec3::ZERO, Vec3::X);
        let other = Ray::new(Vec3::new(2.0, 1.0, 1.0), Vec3::Y);

        let point = axis.closest_point(&other).unwrap();
        assert!(point.abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn closest_point_for_oblique_rays() {
        // Axis along X through the origin, second ray descends onto x = 3, y = 2.
        let axis = Ray::new(Vec3::ZERO, Vec3::new(2.0, 0.0, 0.0));
        let other = Ray::through(Vec3::new(3.0, 2.0, 10.0), Vec3::new(3.0, 2.0, 0.0));

        let point = axis.closest_point(&other).unwrap();
        assert!(point.abs_diff_eq(Vec3::new(3.0, 0.0, 0.0), 1e-5));
    }

    #[test]
    fn parallel_rays_have_no_closest_point() {
        let axis = Ray::new(Vec3::ZERO, Vec3::X);
        let other = Ray::new(Vec3::new(0.0, 1.0, 0.0), Vec3::new(2.0, 0.0, 0.0));
        assert!(axis.closest_point(&other).is_none());
    }

    #[test]
    fn degenerate_direction_has_no_closest_point() {
        let axis = Ray::new(Vec3::ZERO, Vec3::ZERO);
        let other = Ray::new(Vec3::ONE, Vec3::Y);
        assert!(axis.closest_point(&other).is_none());
    }

    #[test]
    fn ray_meets_plane() {
        let ray = Ray::new(Vec3::new(1.0, 2.0, 10.0), Vec3::NEG_Z);
        let hit = ray.intersect_plane(Vec3::new(0.0, 0.0, 1.0), Vec3::Z).unwrap();
        assert!(hit.abs_diff_eq(Vec3::new(1.0, 2.0, 1.0), 1e-5));
    }

    #[test]
    fn ray_parallel_to_plane_misses() {
        let ray = Ray::new(Vec3::new(0.0, 0.0, 1.0), Vec3::X);
        assert!(ray.intersect_plane(Vec3::ZERO, Vec3::Z).is_none());
    }
}
