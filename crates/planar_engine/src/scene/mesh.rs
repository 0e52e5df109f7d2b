//! Triangle mesh data carried by mesh leaves

use crate::foundation::math::Point3;
use crate::scene::bounds::BoundingSphere;

/// Indexed triangle list in model space
#[derive(Debug, Clone, PartialEq)]
pub struct TriMesh {
    vertices: Vec<Point3>,
    indices: Vec<u32>,
}

impl TriMesh {
    /// Create a mesh. Trailing indices that do not form a full triangle are
    /// ignored, as are triangles referencing missing vertices.
    pub fn new(vertices: Vec<Point3>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    /// Axis-aligned square in the XZ plane at height `y`, facing +Y
    pub fn horizontal_quad(half_extent: f32, y: f32) -> Self {
        let e = half_extent;
        Self::new(
            vec![
                Point3::new(-e, y, -e),
                Point3::new(-e, y, e),
                Point3::new(e, y, e),
                Point3::new(e, y, -e),
            ],
            vec![0, 1, 2, 0, 2, 3],
        )
    }

    /// Axis-aligned cube centered on the origin
    pub fn cube(half_extent: f32) -> Self {
        let e = half_extent;
        let vertices = vec![
            Point3::new(-e, -e, -e),
            Point3::new(e, -e, -e),
            Point3::new(e, e, -e),
            Point3::new(-e, e, -e),
            Point3::new(-e, -e, e),
            Point3::new(e, -e, e),
            Point3::new(e, e, e),
            Point3::new(-e, e, e),
        ];
        let indices = vec![
            0, 2, 1, 0, 3, 2, // back
            4, 5, 6, 4, 6, 7, // front
            0, 4, 7, 0, 7, 3, // left
            1, 2, 6, 1, 6, 5, // right
            3, 7, 6, 3, 6, 2, // top
            0, 1, 5, 0, 5, 4, // bottom
        ];
        Self::new(vertices, indices)
    }

    /// Model-space vertices
    pub fn vertices(&self) -> &[Point3] {
        &self.vertices
    }

    /// Triangle index list
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Number of complete triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Model-space corners of triangle `index`
    pub fn triangle(&self, index: usize) -> Option<[Point3; 3]> {
        let base = index.checked_mul(3)?;
        let corners = self.indices.get(base..base + 3)?;
        let vertex = |i: u32| self.vertices.get(i as usize).copied();
        Some([vertex(corners[0])?, vertex(corners[1])?, vertex(corners[2])?])
    }

    /// Model-space bound of all vertices
    pub fn model_bound(&self) -> BoundingSphere {
        BoundingSphere::from_points(&self.vertices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quad_triangles() {
        let quad = TriMesh::horizontal_quad(1.0, 0.5);
        assert_eq!(quad.triangle_count(), 2);
        let [a, b, c] = quad.triangle(0).unwrap();
        assert_eq!(a, Point3::new(-1.0, 0.5, -1.0));
        assert_eq!(b, Point3::new(-1.0, 0.5, 1.0));
        assert_eq!(c, Point3::new(1.0, 0.5, 1.0));
        assert!(quad.triangle(2).is_none());
    }

    #[test]
    fn test_triangle_with_missing_vertex_is_none() {
        let mesh = TriMesh::new(vec![Point3::origin()], vec![0, 0, 7]);
        assert!(mesh.triangle(0).is_none());
    }

    #[test]
    fn test_cube_bound_reaches_corners() {
        let cube = TriMesh::cube(1.0);
        let bound = cube.model_bound();
        assert_eq!(bound.center, Point3::origin());
        assert!((bound.radius - 3.0_f32.sqrt()).abs() < 1e-5);
    }
}
