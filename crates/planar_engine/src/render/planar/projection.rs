//! Plane projection and reflection matrices
//!
//! All matrices act on column vectors (`M * [x; 1]`) in world space and are
//! meant to be installed as the camera's pre-view matrix.

use crate::foundation::math::{Mat4, Point3, Vec3};
use crate::scene::bounds::Plane;

/// Projection along `direction` onto `plane` (directional light shadows).
///
/// For a point `X` the result is `X - D * dot(N, X - P) / dot(N, D)` where
/// `P` is any point of the plane. `dot(N, D)` must be negative, meaning the
/// light shines onto the plane's positive side; otherwise the homogeneous
/// `w` is not positive and `None` is returned.
pub fn oblique_projection(plane: &Plane, direction: &Vec3) -> Option<Mat4> {
    let n = plane.normal;
    let d = direction;
    let n_dot_d = n.dot(d);
    if n_dot_d >= 0.0 {
        return None;
    }
    let n_dot_p = plane.constant;

    // [ D Nᵗ - (N·D) I   -(N·P) D ]
    // [ 0ᵗ               -(N·D)   ]
    #[rustfmt::skip]
    let matrix = Mat4::new(
        d.x * n.x - n_dot_d, d.x * n.y,           d.x * n.z,           -n_dot_p * d.x,
        d.y * n.x,           d.y * n.y - n_dot_d, d.y * n.z,           -n_dot_p * d.y,
        d.z * n.x,           d.z * n.y,           d.z * n.z - n_dot_d, -n_dot_p * d.z,
        0.0,                 0.0,                 0.0,                 -n_dot_d,
    );
    Some(matrix)
}

/// Central projection from `eye` onto `plane` (point and spot light shadows).
///
/// The eye must be strictly on the plane's positive side; otherwise the
/// projection would fold geometry through the light and `None` is returned.
pub fn perspective_projection_onto_plane(plane: &Plane, eye: &Point3) -> Option<Mat4> {
    let n = plane.normal;
    let e = eye.coords;
    let height = plane.distance_to_point(eye);
    if height <= 0.0 {
        return None;
    }
    let n_dot_p = plane.constant;
    let n_dot_e = n.dot(&e);

    // [ (N·(E-P)) I - E Nᵗ   (N·P) E ]
    // [ -Nᵗ                  N·E     ]
    #[rustfmt::skip]
    let matrix = Mat4::new(
        height - e.x * n.x, -e.x * n.y,          -e.x * n.z,          n_dot_p * e.x,
        -e.y * n.x,         height - e.y * n.y,  -e.y * n.z,          n_dot_p * e.y,
        -e.z * n.x,         -e.z * n.y,          height - e.z * n.z,  n_dot_p * e.z,
        -n.x,               -n.y,                -n.z,                n_dot_e,
    );
    Some(matrix)
}

/// Mirror reflection across `plane`: `R = I - 2 N Nᵗ`, translated by
/// `2 (N·P) N`. Its own inverse, with determinant -1.
#[rustfmt::skip]
pub fn reflection_matrix(plane: &Plane) -> Mat4 {
    let n = plane.normal;
    let offset = n * (2.0 * plane.constant);

    Mat4::new(
        1.0 - 2.0 * n.x * n.x, -2.0 * n.x * n.y,       -2.0 * n.x * n.z,       offset.x,
        -2.0 * n.y * n.x,      1.0 - 2.0 * n.y * n.y,  -2.0 * n.y * n.z,       offset.y,
        -2.0 * n.z * n.x,      -2.0 * n.z * n.y,       1.0 - 2.0 * n.z * n.z,  offset.z,
        0.0,                   0.0,                    0.0,                    1.0,
    )
}
