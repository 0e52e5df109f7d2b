//! Scene graph, bounds and visibility culling

pub mod bounds;
pub mod culler;
pub mod frustum;
pub mod mesh;
pub mod node;
pub mod scene_graph;

pub use bounds::{BoundingSphere, Plane, PlaneSide};
pub use culler::{Culler, CullerError, VisibleEntry, VisibleSet, MAX_PLANES};
pub use frustum::{Frustum, FrustumPlane};
pub use mesh::TriMesh;
pub use node::{Bounded, Controller, CullingMode, MeshLeaf, NodeId, NodeKind, SceneNode, SpinController, Triangulated};
pub use scene_graph::{SceneError, SceneGraph};
