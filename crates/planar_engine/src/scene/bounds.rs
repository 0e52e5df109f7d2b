//! Bounding volumes and planes
//!
//! Spheres are the scene graph's bounding volume: cheap to transform, cheap
//! to test against a plane, and closed under merge.

use crate::foundation::math::{Mat4, Point3, Vec3, EPSILON, max_axis_scale};

/// Which side of a plane a volume lies on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneSide {
    /// Entirely on the side the normal points to
    Positive,
    /// Entirely on the opposite side
    Negative,
    /// Crosses the plane
    Straddling,
}

/// Plane defined by a unit normal and a constant: `dot(normal, x) = constant`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal
    pub normal: Vec3,
    /// Signed distance of the plane from the origin along the normal
    pub constant: f32,
}

impl Plane {
    /// Create a plane from a normal (normalized here) and a constant
    pub fn new(normal: Vec3, constant: f32) -> Self {
        Self { normal: normal.normalize(), constant }
    }

    /// Create a plane through `point` with the given normal
    pub fn from_point_normal(point: Point3, normal: Vec3) -> Self {
        let normal = normal.normalize();
        Self { normal, constant: normal.dot(&point.coords) }
    }

    /// Plane through three points, `n = normalize(cross(p1 - p0, p2 - p0))`.
    ///
    /// Returns `None` for collinear or coincident points.
    pub fn from_points(p0: Point3, p1: Point3, p2: Point3) -> Option<Self> {
        let normal = (p1 - p0).cross(&(p2 - p0));
        let length = normal.magnitude();
        if !length.is_finite() || length <= EPSILON {
            return None;
        }
        let normal = normal / length;
        Some(Self { normal, constant: normal.dot(&p0.coords) })
    }

    /// Signed distance from the plane to a point
    pub fn distance_to_point(&self, point: &Point3) -> f32 {
        self.normal.dot(&point.coords) - self.constant
    }

    /// Closest point of the plane to the origin
    pub fn origin(&self) -> Point3 {
        Point3::from(self.normal * self.constant)
    }

    /// Classify a sphere against this plane
    pub fn which_side(&self, sphere: &BoundingSphere) -> PlaneSide {
        let distance = self.distance_to_point(&sphere.center);
        if distance < -sphere.radius {
            PlaneSide::Negative
        } else if distance >= sphere.radius {
            PlaneSide::Positive
        } else {
            PlaneSide::Straddling
        }
    }
}

/// Bounding sphere
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    /// Center of the sphere
    pub center: Point3,
    /// Radius (never negative)
    pub radius: f32,
}

impl Default for BoundingSphere {
    fn default() -> Self {
        Self { center: Point3::origin(), radius: 0.0 }
    }
}

impl BoundingSphere {
    /// Create a new bounding sphere
    pub fn new(center: Point3, radius: f32) -> Self {
        Self { center, radius: radius.max(0.0) }
    }

    /// Sphere around a point cloud: centered on the average point, radius
    /// reaching the farthest point.
    pub fn from_points(points: &[Point3]) -> Self {
        if points.is_empty() {
            return Self::default();
        }
        let sum = points.iter().fold(Vec3::zeros(), |acc, p| acc + p.coords);
        #[allow(clippy::cast_precision_loss)]
        let center = Point3::from(sum / points.len() as f32);
        let radius = points
            .iter()
            .map(|p| (p - center).magnitude())
            .fold(0.0_f32, f32::max);
        Self { center, radius }
    }

    /// Check whether a point lies inside the sphere (with tolerance)
    pub fn contains_point(&self, point: &Point3, tolerance: f32) -> bool {
        (point - self.center).magnitude() <= self.radius + tolerance
    }

    /// Check whether another sphere lies entirely inside this one
    pub fn contains_sphere(&self, other: &BoundingSphere, tolerance: f32) -> bool {
        (other.center - self.center).magnitude() + other.radius <= self.radius + tolerance
    }

    /// Move the sphere into the space described by an affine matrix
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        Self {
            center: matrix.transform_point(&self.center),
            radius: self.radius * max_axis_scale(matrix),
        }
    }

    /// Smallest sphere containing both spheres
    pub fn merge(&self, other: &BoundingSphere) -> Self {
        let diff = other.center - self.center;
        let length_sqr = diff.magnitude_squared();
        let radius_diff = other.radius - self.radius;

        if radius_diff * radius_diff >= length_sqr {
            // One sphere already contains the other.
            return if radius_diff >= 0.0 { *other } else { *self };
        }

        let length = length_sqr.sqrt();
        let center = if length > EPSILON {
            let coeff = (length + radius_diff) / (2.0 * length);
            self.center + diff * coeff
        } else {
            self.center
        };
        Self {
            center,
            radius: 0.5 * (length + self.radius + other.radius),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn assert_merge_contains(a: BoundingSphere, b: BoundingSphere) {
        let merged = a.merge(&b);
        assert!(merged.contains_sphere(&a, 1e-4), "{merged:?} does not contain {a:?}");
        assert!(merged.contains_sphere(&b, 1e-4), "{merged:?} does not contain {b:?}");
    }

    #[test]
    fn test_merge_contains_both_spheres() {
        let cases = [
            (BoundingSphere::new(Point3::new(0.0, 0.0, 0.0), 1.0), BoundingSphere::new(Point3::new(5.0, 0.0, 0.0), 2.0)),
            (BoundingSphere::new(Point3::new(-3.0, 2.0, 1.0), 0.5), BoundingSphere::new(Point3::new(4.0, -1.0, 7.0), 3.0)),
            (BoundingSphere::new(Point3::new(1.0, 1.0, 1.0), 4.0), BoundingSphere::new(Point3::new(1.5, 1.0, 1.0), 0.25)),
            (BoundingSphere::new(Point3::new(2.0, 2.0, 2.0), 1.0), BoundingSphere::new(Point3::new(2.0, 2.0, 2.0), 1.0)),
            (BoundingSphere::new(Point3::new(0.0, 10.0, 0.0), 0.0), BoundingSphere::new(Point3::new(0.0, -10.0, 0.0), 0.0)),
        ];
        for (a, b) in cases {
            assert_merge_contains(a, b);
            assert_merge_contains(b, a);
        }
    }

    #[test]
    fn test_merge_is_minimal_for_disjoint_spheres() {
        let a = BoundingSphere::new(Point3::new(0.0, 0.0, 0.0), 1.0);
        let b = BoundingSphere::new(Point3::new(10.0, 0.0, 0.0), 1.0);
        let merged = a.merge(&b);
        assert_relative_eq!(merged.center, Point3::new(5.0, 0.0, 0.0), epsilon = 1e-5);
        assert_relative_eq!(merged.radius, 6.0, epsilon = 1e-5);
    }

    #[test]
    fn test_merge_returns_enclosing_sphere_unchanged() {
        let big = BoundingSphere::new(Point3::new(0.0, 0.0, 0.0), 10.0);
        let small = BoundingSphere::new(Point3::new(1.0, 0.0, 0.0), 1.0);
        assert_eq!(big.merge(&small), big);
        assert_eq!(small.merge(&big), big);
    }

    #[test]
    fn test_plane_from_points_and_sides() {
        let plane = Plane::from_points(
            Point3::new(0.0, 2.0, 0.0),
            Point3::new(0.0, 2.0, 1.0),
            Point3::new(1.0, 2.0, 0.0),
        )
        .unwrap();
        assert_relative_eq!(plane.normal, Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(plane.constant, 2.0, epsilon = 1e-6);

        let above = BoundingSphere::new(Point3::new(0.0, 5.0, 0.0), 1.0);
        let below = BoundingSphere::new(Point3::new(0.0, -5.0, 0.0), 1.0);
        let across = BoundingSphere::new(Point3::new(0.0, 2.5, 0.0), 1.0);
        assert_eq!(plane.which_side(&above), PlaneSide::Positive);
        assert_eq!(plane.which_side(&below), PlaneSide::Negative);
        assert_eq!(plane.which_side(&across), PlaneSide::Straddling);
    }

    #[test]
    fn test_point_sphere_on_plane_is_inside() {
        let plane = Plane::new(Vec3::y(), 0.0);
        let on_plane = BoundingSphere::new(Point3::new(3.0, 0.0, -1.0), 0.0);
        assert_eq!(plane.which_side(&on_plane), PlaneSide::Positive);

        let touching = BoundingSphere::new(Point3::new(0.0, -1.0, 0.0), 1.0);
        assert_eq!(plane.which_side(&touching), PlaneSide::Straddling);
    }

    #[test]
    fn test_collinear_points_have_no_plane() {
        let plane = Plane::from_points(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 1.0),
            Point3::new(2.0, 2.0, 2.0),
        );
        assert!(plane.is_none());
    }

    #[test]
    fn test_transformed_sphere_scales_radius() {
        let sphere = BoundingSphere::new(Point3::new(1.0, 0.0, 0.0), 1.0);
        let matrix = Mat4::new_translation(&Vec3::new(0.0, 3.0, 0.0)) * Mat4::new_scaling(2.0);
        let moved = sphere.transformed(&matrix);
        assert_relative_eq!(moved.center, Point3::new(2.0, 3.0, 0.0), epsilon = 1e-6);
        assert_relative_eq!(moved.radius, 2.0, epsilon = 1e-6);
    }
}
