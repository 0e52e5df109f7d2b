//! View frustum planes
//!
//! Planes are extracted from a combined projection-view matrix with the
//! Gribb-Hartmann row method, for clip spaces whose depth runs over [0, 1].
//! Every plane's normal points into the frustum, so a point is inside when
//! its signed distance to all six planes is non-negative.

use crate::foundation::math::{Mat4, Vec3, Vec4};
use crate::scene::bounds::{BoundingSphere, Plane, PlaneSide};

/// Index of each frustum plane in [`Frustum::planes`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrustumPlane {
    /// Left clip plane
    Left = 0,
    /// Right clip plane
    Right = 1,
    /// Bottom clip plane
    Bottom = 2,
    /// Top clip plane
    Top = 3,
    /// Near clip plane
    Near = 4,
    /// Far clip plane
    Far = 5,
}

/// Six inward-facing planes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frustum {
    /// Planes in [`FrustumPlane`] order
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Extract the frustum of a projection-view matrix
    pub fn from_matrix(projection_view: &Mat4) -> Self {
        let row = |i: usize| -> Vec4 { projection_view.row(i).transpose() };
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));

        let plane = |v: Vec4| -> Plane {
            let normal = Vec3::new(v.x, v.y, v.z);
            let length = normal.magnitude();
            Plane { normal: normal / length, constant: -v.w / length }
        };

        Self {
            planes: [
                plane(r3 + r0),
                plane(r3 - r0),
                plane(r3 + r1),
                plane(r3 - r1),
                plane(r2),
                plane(r3 - r2),
            ],
        }
    }

    /// Plane by name
    pub fn plane(&self, which: FrustumPlane) -> &Plane {
        &self.planes[which as usize]
    }

    /// True unless the sphere lies entirely outside one of the planes
    pub fn intersects_sphere(&self, sphere: &BoundingSphere) -> bool {
        self.planes
            .iter()
            .all(|plane| plane.which_side(sphere) != PlaneSide::Negative)
    }
}
