//! Scene graph arena and update traversal
//!
//! Nodes are stored in a slot map and linked by [`NodeId`]. Parent links are
//! plain ids and never own anything, so the structure cannot form reference
//! cycles, and child order (and therefore traversal order) is exactly the
//! order children were attached.
//!
//! # Update pass
//! [`SceneGraph::update`] walks every root top-down, running controllers and
//! recomputing `world = parent.world * local`, then recomputes world bounds
//! bottom-up as the merge of a node's own transformed model bound and all of
//! its children's world bounds. After the pass, every descendant's bound is
//! contained in its ancestors' bounds.

use slotmap::SlotMap;
use thiserror::Error;

use crate::foundation::math::{Mat4, Point3, Transform};
use crate::render::effect::Effect;
use crate::scene::bounds::BoundingSphere;
use crate::scene::mesh::TriMesh;
use crate::scene::node::{
    Bounded, Controller, CullingMode, MeshLeaf, NodeId, NodeKind, SceneNode, Triangulated,
};

/// Scene graph errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The id does not refer to a live node
    #[error("Unknown scene node: {0:?}")]
    UnknownNode(NodeId),

    /// Children can only be attached to group nodes
    #[error("Node '{0}' is not a group")]
    NotAGroup(String),

    /// The operation needs a mesh leaf
    #[error("Node '{0}' is not a mesh")]
    NotAMesh(String),

    /// The child already has a parent
    #[error("Node '{0}' already has a parent")]
    AlreadyParented(String),

    /// Attaching would make a node its own ancestor
    #[error("Attaching '{child}' under '{parent}' would create a cycle")]
    Cycle {
        /// Prospective parent
        parent: String,
        /// Prospective child
        child: String,
    },

    /// Triangle index past the end of the mesh
    #[error("Triangle {index} out of range for mesh '{node}'")]
    TriangleOutOfRange {
        /// Mesh name
        node: String,
        /// Requested triangle
        index: usize,
    },
}

/// Arena of scene nodes
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: SlotMap<NodeId, SceneNode>,
}

impl SceneGraph {
    /// Create an empty scene graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Create an unattached group node
    pub fn create_group(&mut self, name: impl Into<String>) -> NodeId {
        self.nodes.insert(SceneNode::new(name, NodeKind::Group))
    }

    /// Create an unattached mesh leaf
    pub fn create_mesh(&mut self, name: impl Into<String>, mesh: TriMesh, effect: Effect) -> NodeId {
        let model_bound = mesh.model_bound();
        let id = self.nodes.insert(SceneNode::new(
            name,
            NodeKind::Mesh(MeshLeaf { mesh, effect, model_bound }),
        ));
        self.nodes[id].world_bound = model_bound;
        id
    }

    /// Look up a node
    pub fn node(&self, id: NodeId) -> Result<&SceneNode, SceneError> {
        self.nodes.get(id).ok_or(SceneError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut SceneNode, SceneError> {
        self.nodes.get_mut(id).ok_or(SceneError::UnknownNode(id))
    }

    /// True when `id` refers to a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// First node with the given name
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|(_, node)| node.name == name)
            .map(|(id, _)| id)
    }

    /// True when `node` is `ancestor` or lies below it
    pub fn is_descendant_of(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.nodes.get(id).and_then(|n| n.parent);
        }
        false
    }

    /// Nodes without a parent
    pub fn roots(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, node)| node.parent.is_none())
            .map(|(id, _)| id)
            .collect()
    }

    /// Attach `child` as the last child of the group `parent`
    pub fn attach_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), SceneError> {
        let parent_node = self.node(parent)?;
        if !matches!(parent_node.kind, NodeKind::Group) {
            return Err(SceneError::NotAGroup(parent_node.name.clone()));
        }
        let child_node = self.node(child)?;
        if child_node.parent.is_some() {
            return Err(SceneError::AlreadyParented(child_node.name.clone()));
        }

        let mut ancestor = Some(parent);
        while let Some(current) = ancestor {
            if current == child {
                return Err(SceneError::Cycle {
                    parent: self.nodes[parent].name.clone(),
                    child: self.nodes[child].name.clone(),
                });
            }
            ancestor = self.nodes[current].parent;
        }

        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
        Ok(())
    }

    /// Detach a node from its parent, making it a root
    pub fn detach(&mut self, child: NodeId) -> Result<(), SceneError> {
        let Some(parent) = self.node(child)?.parent else {
            return Ok(());
        };
        self.nodes[parent].children.retain(|&id| id != child);
        self.nodes[child].parent = None;
        Ok(())
    }

    /// Detach and delete a node and all of its descendants.
    ///
    /// Returns the number of nodes removed.
    pub fn remove_subtree(&mut self, id: NodeId) -> Result<usize, SceneError> {
        self.detach(id)?;
        let mut pending = vec![id];
        let mut removed = 0;
        while let Some(current) = pending.pop() {
            if let Some(node) = self.nodes.remove(current) {
                pending.extend(node.children);
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Replace a node's local transform. Takes effect on the next update.
    pub fn set_local_transform(&mut self, id: NodeId, transform: Transform) -> Result<(), SceneError> {
        self.node_mut(id)?.local = transform;
        Ok(())
    }

    /// Change how the culler treats a node
    pub fn set_culling_mode(&mut self, id: NodeId, mode: CullingMode) -> Result<(), SceneError> {
        self.node_mut(id)?.culling = mode;
        Ok(())
    }

    /// Attach a controller, run on every update before the world transform
    pub fn add_controller(&mut self, id: NodeId, controller: Box<dyn Controller>) -> Result<(), SceneError> {
        self.node_mut(id)?.controllers.push(controller);
        Ok(())
    }

    /// Effect of a mesh leaf
    pub fn effect(&self, id: NodeId) -> Result<&Effect, SceneError> {
        let node = self.node(id)?;
        node.effect().ok_or_else(|| SceneError::NotAMesh(node.name.clone()))
    }

    /// Replace a mesh leaf's effect, returning the previous one
    pub fn set_effect(&mut self, id: NodeId, effect: Effect) -> Result<Effect, SceneError> {
        let node = self.node_mut(id)?;
        match &mut node.kind {
            NodeKind::Mesh(leaf) => Ok(std::mem::replace(&mut leaf.effect, effect)),
            NodeKind::Group => Err(SceneError::NotAMesh(node.name.clone())),
        }
    }

    /// World bound of a node as of the last update pass
    pub fn world_bound(&self, id: NodeId) -> Result<BoundingSphere, SceneError> {
        Ok(self.node(id)?.world_bound())
    }

    /// Triangle `index` of a mesh leaf in world space
    pub fn world_triangle(&self, id: NodeId, index: usize) -> Result<[Point3; 3], SceneError> {
        let node = self.mesh_node(id)?;
        node.world_triangle(index).ok_or_else(|| SceneError::TriangleOutOfRange {
            node: node.name.clone(),
            index,
        })
    }

    /// Triangle `index` of a mesh leaf in model space
    pub fn model_triangle(&self, id: NodeId, index: usize) -> Result<[Point3; 3], SceneError> {
        let node = self.mesh_node(id)?;
        node.model_triangle(index).ok_or_else(|| SceneError::TriangleOutOfRange {
            node: node.name.clone(),
            index,
        })
    }

    fn mesh_node(&self, id: NodeId) -> Result<&SceneNode, SceneError> {
        let node = self.node(id)?;
        if node.is_mesh() {
            Ok(node)
        } else {
            Err(SceneError::NotAMesh(node.name.clone()))
        }
    }

    /// Mesh leaves below (and including) `root`, in pre-order
    pub fn leaves(&self, root: NodeId) -> Result<Vec<NodeId>, SceneError> {
        self.node(root)?;
        let mut leaves = Vec::new();
        let mut pending = vec![root];
        while let Some(current) = pending.pop() {
            let node = &self.nodes[current];
            if node.is_mesh() {
                leaves.push(current);
            }
            pending.extend(node.children.iter().rev());
        }
        Ok(leaves)
    }

    /// Run the update pass over every root
    pub fn update(&mut self, time: f64) {
        for root in self.roots() {
            self.update_world_data(root, &Mat4::identity(), time);
        }
    }

    /// Update the subtree at `id` and refresh the bounds of its ancestors.
    ///
    /// Cheaper than [`update`](Self::update) when only this subtree changed.
    pub fn update_from(&mut self, id: NodeId, time: f64) -> Result<(), SceneError> {
        let parent_world = match self.node(id)?.parent {
            Some(parent) => self.nodes[parent].world,
            None => Mat4::identity(),
        };
        self.update_world_data(id, &parent_world, time);
        let mut ancestor = self.nodes[id].parent;
        while let Some(current) = ancestor {
            self.update_world_bound(current);
            ancestor = self.nodes[current].parent;
        }
        Ok(())
    }

    /// Recompute the bound of a single leaf and every ancestor's bound up to
    /// the root, without touching any other subtree.
    ///
    /// Only valid when this one leaf changed since the last full update and
    /// the tree structure did not; anything else needs a full update.
    pub fn propagate_bound_to_root(&mut self, leaf: NodeId) -> Result<(), SceneError> {
        let parent_world = match self.node(leaf)?.parent {
            Some(parent) => self.nodes[parent].world,
            None => Mat4::identity(),
        };
        let node = &mut self.nodes[leaf];
        node.world = parent_world * node.local.to_matrix();

        let mut current = Some(leaf);
        while let Some(id) = current {
            self.update_world_bound(id);
            current = self.nodes[id].parent;
        }
        Ok(())
    }

    fn update_world_data(&mut self, id: NodeId, parent_world: &Mat4, time: f64) {
        let node = &mut self.nodes[id];
        for controller in &mut node.controllers {
            controller.update(time, &mut node.local);
        }
        node.world = parent_world * node.local.to_matrix();
        let world = node.world;

        for index in 0..self.nodes[id].children.len() {
            let child = self.nodes[id].children[index];
            self.update_world_data(child, &world, time);
        }

        self.update_world_bound(id);
    }

    fn update_world_bound(&mut self, id: NodeId) {
        let node = &self.nodes[id];
        let mut bound = match &node.kind {
            NodeKind::Mesh(leaf) => Some(leaf.model_bound.transformed(&node.world)),
            NodeKind::Group => None,
        };
        for child in &node.children {
            let child_bound = self.nodes[*child].world_bound;
            bound = Some(match bound {
                Some(current) => current.merge(&child_bound),
                None => child_bound,
            });
        }
        let origin = node.world.transform_point(&Point3::origin());
        self.nodes[id].world_bound = bound.unwrap_or_else(|| BoundingSphere::new(origin, 0.0));
    }
}
