//! # 3D Camera
//!
//! Perspective camera with a pre-view matrix slot used by the planar
//! effects.
//!
//! ## Matrix chain
//! A vertex reaches clip space through `P × X × V × pre_view × world`:
//! - P = perspective projection with depth mapped to [0, 1]
//! - X = coordinate flip from Y-up view space to the Y-down clip convention
//! - V = look-at view matrix
//! - pre_view = world-space transform applied before viewing; identity
//!   except while shadow casters are flattened onto a plane or mirrored
//!   geometry is drawn

use crate::foundation::math::{utils, Mat4, Mat4Ext, Point3, Vec3};
use crate::scene::frustum::Frustum;

/// 3D camera for perspective projection
///
/// # Coordinate System
/// Right-handed Y-up world and view space. The coordinate flip X is applied
/// between view and projection, so view-space math stays conventional.
///
/// # Pre-view matrix
/// [`set_pre_view_matrix`](Self::set_pre_view_matrix) inserts a world-space
/// transform before the view matrix. Culling always uses the plain
/// view-projection, never the pre-view.
#[derive(Debug, Clone)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,

    /// Point the camera is looking at in world space
    pub target: Vec3,

    /// Up vector for camera orientation (typically [0, 1, 0])
    pub up: Vec3,

    /// Field of view angle in radians
    pub fov: f32,

    /// Aspect ratio (width / height)
    pub aspect: f32,

    /// Distance to near clipping plane
    pub near: f32,

    /// Distance to far clipping plane
    pub far: f32,

    pre_view: Option<Mat4>,
}

impl Camera {
    /// Create a new perspective camera with standard Y-up orientation
    ///
    /// # Arguments
    /// * `position` - Camera position in world space
    /// * `fov_degrees` - Vertical field of view in degrees
    /// * `aspect` - Aspect ratio (width / height) of the viewport
    /// * `near` - Distance to near clipping plane (must be > 0)
    /// * `far` - Distance to far clipping plane (must be > near)
    ///
    /// # Example
    /// ```rust
    /// use planar_engine::foundation::math::Vec3;
    /// use planar_engine::render::primitives::Camera;
    ///
    /// let camera = Camera::perspective(Vec3::new(0.0, 2.0, 5.0), 60.0, 16.0 / 9.0, 0.1, 100.0);
    /// assert!(camera.pre_view_matrix().is_none());
    /// ```
    pub fn perspective(position: Vec3, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            target: Vec3::zeros(),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov: utils::deg_to_rad(fov_degrees),
            aspect,
            near,
            far,
            pre_view: None,
        }
    }

    /// Update camera position in world space
    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        log::trace!("Camera position updated to: {:?}", position);
    }

    /// Update camera target (look-at point)
    pub fn set_target(&mut self, target: Vec3) {
        self.target = target;
        log::trace!("Camera target updated to: {:?}", target);
    }

    /// Set target point and up vector together
    ///
    /// The up vector doesn't need to be perpendicular to the view direction;
    /// the view matrix orthonormalizes it.
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        self.target = target;
        self.up = up;
        log::trace!("Camera look_at updated - target: {:?}, up: {:?}", target, up);
    }

    /// World-space eye position
    pub fn eye(&self) -> Point3 {
        Point3::from(self.position)
    }

    /// View matrix (world to camera space)
    pub fn get_view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.position, self.target, self.up)
    }

    /// Perspective projection matrix, depth mapped to [0, 1]
    pub fn get_projection_matrix(&self) -> Mat4 {
        Mat4::perspective(self.fov, self.aspect, self.near, self.far)
    }

    /// Combined `P × X × V`, without the pre-view matrix
    pub fn get_view_projection_matrix(&self) -> Mat4 {
        let view_matrix = self.get_view_matrix();
        let coord_transform = Mat4::vulkan_coordinate_transform();
        let projection_matrix = self.get_projection_matrix();

        projection_matrix * coord_transform * view_matrix
    }

    /// Combined `P × X × V × pre_view`, the matrix vertices are drawn with
    pub fn get_projection_view_matrix(&self) -> Mat4 {
        match self.pre_view {
            Some(pre_view) => self.get_view_projection_matrix() * pre_view,
            None => self.get_view_projection_matrix(),
        }
    }

    /// Install a world-space transform applied before the view matrix
    pub fn set_pre_view_matrix(&mut self, matrix: Mat4) {
        self.pre_view = Some(matrix);
    }

    /// Return to the plain view
    pub fn clear_pre_view_matrix(&mut self) {
        self.pre_view = None;
    }

    /// Pre-view matrix, if one is installed
    pub fn pre_view_matrix(&self) -> Option<&Mat4> {
        self.pre_view.as_ref()
    }

    /// Pre-view matrix, identity when none is installed
    pub fn pre_view_or_identity(&self) -> Mat4 {
        self.pre_view.unwrap_or_else(Mat4::identity)
    }

    /// Six inward-facing frustum planes of the plain view-projection
    pub fn frustum(&self) -> Frustum {
        Frustum::from_matrix(&self.get_view_projection_matrix())
    }
}

impl Default for Camera {
    /// Camera above and behind the origin, looking at it with a 45 degree
    /// field of view.
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 3.0, 3.0),
            target: Vec3::zeros(),
            up: Vec3::new(0.0, 1.0, 0.0),
            fov: std::f32::consts::FRAC_PI_4,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
            pre_view: None,
        }
    }
}
