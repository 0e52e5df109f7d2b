//! Scene nodes
//!
//! Nodes live in the [`SceneGraph`](crate::scene::SceneGraph) arena and refer
//! to each other through [`NodeId`] indices. A node is either a group, which
//! only organizes children, or a mesh leaf, which can be drawn.

use std::fmt;

use crate::foundation::math::{Mat4, Point3, Quat, Transform, Vec3};
use crate::render::effect::Effect;
use crate::scene::bounds::BoundingSphere;
use crate::scene::mesh::TriMesh;

slotmap::new_key_type! {
    /// Handle to a node in a scene graph
    pub struct NodeId;
}

/// How the culler treats a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CullingMode {
    /// Test the world bound against the active planes
    #[default]
    Dynamic,
    /// Always prune this subtree
    Always,
    /// Never prune this subtree and skip plane tests below it
    Never,
}

/// Per-frame hook that may change a node's local transform before the
/// world transform is recomputed
pub trait Controller: fmt::Debug {
    /// Update the local transform for `time` (seconds). Returns true when
    /// the transform changed.
    fn update(&mut self, time: f64, local: &mut Transform) -> bool;
}

/// Spins a node about a fixed axis at a constant rate
#[derive(Debug, Clone)]
pub struct SpinController {
    axis: nalgebra::Unit<Vec3>,
    radians_per_second: f32,
    base: Quat,
}

impl SpinController {
    /// Spin about `axis` starting from the `base` orientation
    pub fn new(axis: Vec3, radians_per_second: f32, base: Quat) -> Self {
        Self {
            axis: nalgebra::Unit::new_normalize(axis),
            radians_per_second,
            base,
        }
    }
}

impl Controller for SpinController {
    fn update(&mut self, time: f64, local: &mut Transform) -> bool {
        #[allow(clippy::cast_possible_truncation)]
        let angle = (time as f32) * self.radians_per_second;
        local.rotation = self.base * Quat::from_axis_angle(&self.axis, angle);
        true
    }
}

/// Drawable payload of a mesh leaf
#[derive(Debug, Clone)]
pub struct MeshLeaf {
    /// Model-space geometry
    pub mesh: TriMesh,
    /// Effect slot
    pub effect: Effect,
    /// Model-space bound, computed once from the vertices
    pub model_bound: BoundingSphere,
}

/// Node payload
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Interior node
    Group,
    /// Drawable leaf
    Mesh(MeshLeaf),
}

/// Access to a node's world bound
pub trait Bounded {
    /// World-space bound as of the last update pass
    fn world_bound(&self) -> BoundingSphere;
}

/// Access to a node's triangles
pub trait Triangulated {
    /// Number of triangles
    fn triangle_count(&self) -> usize;

    /// Triangle `index` in model space
    fn model_triangle(&self, index: usize) -> Option<[Point3; 3]>;

    /// Triangle `index` in world space
    fn world_triangle(&self, index: usize) -> Option<[Point3; 3]>;
}

/// A node of the scene graph
#[derive(Debug)]
pub struct SceneNode {
    pub(crate) name: String,
    pub(crate) kind: NodeKind,
    pub(crate) local: Transform,
    pub(crate) world: Mat4,
    pub(crate) world_bound: BoundingSphere,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) culling: CullingMode,
    pub(crate) controllers: Vec<Box<dyn Controller>>,
}

impl SceneNode {
    pub(crate) fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            local: Transform::identity(),
            world: Mat4::identity(),
            world_bound: BoundingSphere::default(),
            parent: None,
            children: Vec::new(),
            culling: CullingMode::Dynamic,
            controllers: Vec::new(),
        }
    }

    /// Node name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Node payload
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Local transform
    pub fn local(&self) -> &Transform {
        &self.local
    }

    /// World transform as of the last update pass
    pub fn world(&self) -> &Mat4 {
        &self.world
    }

    /// Parent node, if attached
    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    /// Children in draw order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Culling mode
    pub fn culling_mode(&self) -> CullingMode {
        self.culling
    }

    /// True for mesh leaves
    pub fn is_mesh(&self) -> bool {
        matches!(self.kind, NodeKind::Mesh(_))
    }

    /// Geometry of a mesh leaf
    pub fn mesh(&self) -> Option<&TriMesh> {
        match &self.kind {
            NodeKind::Mesh(leaf) => Some(&leaf.mesh),
            NodeKind::Group => None,
        }
    }

    /// Effect slot of a mesh leaf
    pub fn effect(&self) -> Option<&Effect> {
        match &self.kind {
            NodeKind::Mesh(leaf) => Some(&leaf.effect),
            NodeKind::Group => None,
        }
    }
}

impl Bounded for SceneNode {
    fn world_bound(&self) -> BoundingSphere {
        self.world_bound
    }
}

impl Triangulated for SceneNode {
    fn triangle_count(&self) -> usize {
        self.mesh().map_or(0, TriMesh::triangle_count)
    }

    fn model_triangle(&self, index: usize) -> Option<[Point3; 3]> {
        self.mesh()?.triangle(index)
    }

    fn world_triangle(&self, index: usize) -> Option<[Point3; 3]> {
        let [a, b, c] = self.model_triangle(index)?;
        Some([
            self.world.transform_point(&a),
            self.world.transform_point(&b),
            self.world.transform_point(&c),
        ])
    }
}
