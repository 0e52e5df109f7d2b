//! Hierarchical visibility culling
//!
//! The culler walks a subtree against a set of planes and collects the mesh
//! leaves that may be visible. Each plane owns one bit of a mask; once a
//! node's bound lies fully on the inner side of a plane, that bit is cleared
//! for the whole subtree so descendants skip the test.

use thiserror::Error;

use crate::render::effect::Effect;
use crate::scene::bounds::{Plane, PlaneSide};
use crate::scene::frustum::Frustum;
use crate::scene::node::{Bounded, CullingMode, NodeId};
use crate::scene::scene_graph::{SceneError, SceneGraph};

/// Maximum number of simultaneously active planes
pub const MAX_PLANES: usize = 32;

/// Number of frustum planes at the front of the plane stack
pub const FRUSTUM_PLANES: usize = 6;

/// Culler errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CullerError {
    /// The plane stack is full
    #[error("Cannot push more than {MAX_PLANES} culling planes")]
    TooManyPlanes,
}

/// One entry of a visible set
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleEntry {
    /// Mesh leaf to draw
    pub node: NodeId,
    /// Effect replacing the leaf's own effect for this entry
    pub effect: Option<Effect>,
}

/// Ordered list of potentially visible mesh leaves for one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisibleSet {
    entries: Vec<VisibleEntry>,
}

impl VisibleSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a leaf
    pub fn insert(&mut self, node: NodeId, effect: Option<Effect>) {
        self.entries.push(VisibleEntry { node, effect });
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries in traversal order
    pub fn entries(&self) -> &[VisibleEntry] {
        &self.entries
    }

    /// Leaves in traversal order
    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.entries.iter().map(|entry| entry.node)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is visible
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when the leaf is in the set
    pub fn contains(&self, node: NodeId) -> bool {
        self.entries.iter().any(|entry| entry.node == node)
    }
}

/// Plane-stack visibility culler
#[derive(Debug, Clone)]
pub struct Culler {
    planes: Vec<Plane>,
    visible: VisibleSet,
}

impl Culler {
    /// Culler with the planes of `frustum` and no user planes
    pub fn new(frustum: &Frustum) -> Self {
        Self {
            planes: frustum.planes.to_vec(),
            visible: VisibleSet::new(),
        }
    }

    /// Replace the six frustum planes, keeping user planes
    pub fn set_frustum(&mut self, frustum: &Frustum) {
        self.planes[..FRUSTUM_PLANES].copy_from_slice(&frustum.planes);
    }

    /// Add a user culling plane; bounds entirely on its negative side are
    /// culled.
    pub fn push_plane(&mut self, plane: Plane) -> Result<(), CullerError> {
        if self.planes.len() >= MAX_PLANES {
            return Err(CullerError::TooManyPlanes);
        }
        self.planes.push(plane);
        Ok(())
    }

    /// Remove the most recently pushed user plane
    pub fn pop_plane(&mut self) -> Option<Plane> {
        if self.planes.len() > FRUSTUM_PLANES {
            self.planes.pop()
        } else {
            None
        }
    }

    /// Active planes, frustum first
    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    /// Result of the last [`compute_visible_set`](Self::compute_visible_set)
    pub fn visible_set(&self) -> &VisibleSet {
        &self.visible
    }

    /// Rebuild the visible set from the subtree at `root`.
    ///
    /// World bounds must be current, so run the scene update first.
    pub fn compute_visible_set(&mut self, scene: &SceneGraph, root: NodeId) -> Result<&VisibleSet, SceneError> {
        scene.node(root)?;
        self.visible.clear();
        let mask = if self.planes.len() == MAX_PLANES {
            u32::MAX
        } else {
            (1_u32 << self.planes.len()) - 1
        };
        self.cull_node(scene, root, mask);
        log::trace!("Culler kept {} of {} nodes", self.visible.len(), scene.len());
        Ok(&self.visible)
    }

    fn cull_node(&mut self, scene: &SceneGraph, id: NodeId, mut mask: u32) {
        let Ok(node) = scene.node(id) else {
            return;
        };
        match node.culling_mode() {
            CullingMode::Always => return,
            CullingMode::Never => mask = 0,
            CullingMode::Dynamic => {
                let bound = node.world_bound();
                for (index, plane) in self.planes.iter().enumerate() {
                    let bit = 1_u32 << index;
                    if mask & bit == 0 {
                        continue;
                    }
                    match plane.which_side(&bound) {
                        PlaneSide::Negative => return,
                        PlaneSide::Positive => mask &= !bit,
                        PlaneSide::Straddling => {}
                    }
                }
            }
        }

        if node.is_mesh() {
            self.visible.insert(id, None);
        }
        for &child in node.children() {
            self.cull_node(scene, child, mask);
        }
    }
}
