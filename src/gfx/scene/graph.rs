//! # Scene Graph
//!
//! Structure-of-arrays node store keyed by stable indices. Every per-node
//! property lives in its own column; a node id is an index into all of them.
//!
//! World transforms are derived data. Mutations mark a node dirty and
//! [`SceneGraph::update_world_transforms`] recomputes the dirty nodes and
//! their descendants in parent-before-child order.

use cgmath::{Matrix4, Quaternion, SquareMatrix, Vector3};

use crate::{
    error::{Result, ViewerError},
    math::Trs,
};

/// Stable node index
pub type NodeId = usize;

/// The authoritative local transform of a node
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LocalTransform {
    Trs(Trs),
    Matrix(Matrix4<f32>),
}

impl Default for LocalTransform {
    fn default() -> Self {
        LocalTransform::Trs(Trs::default())
    }
}

impl LocalTransform {
    pub fn to_matrix(&self) -> Matrix4<f32> {
        match self {
            LocalTransform::Trs(trs) => trs.to_matrix(),
            LocalTransform::Matrix(m) => *m,
        }
    }

    /// TRS view of the transform; matrices are decomposed
    pub fn to_trs(&self) -> Trs {
        match self {
            LocalTransform::Trs(trs) => *trs,
            LocalTransform::Matrix(m) => Trs::from_matrix(m),
        }
    }
}

/// Node description used to build a graph
#[derive(Debug, Clone, Default)]
pub struct NodeDesc {
    pub name: Option<String>,
    pub children: Vec<NodeId>,
    pub local: LocalTransform,
    pub mesh: Option<usize>,
    pub skin: Option<usize>,
    /// Punctual light attached to the node
    pub light: Option<usize>,
    pub weights: Option<Vec<f32>>,
}

/// Animatable per-node state, captured before an animation starts
#[derive(Debug, Clone, PartialEq)]
pub struct NodeState {
    pub local: LocalTransform,
    pub weights: Option<Vec<f32>>,
}

#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    names: Vec<Option<String>>,
    parents: Vec<Option<NodeId>>,
    children: Vec<Vec<NodeId>>,
    locals: Vec<LocalTransform>,
    worlds: Vec<Matrix4<f32>>,
    meshes: Vec<Option<usize>>,
    skins: Vec<Option<usize>>,
    lights: Vec<Option<usize>>,
    weights: Vec<Option<Vec<f32>>>,
    dirty: Vec<bool>,
    any_dirty: bool,
    /// Parent-before-child traversal order over every node
    order: Vec<NodeId>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from node descriptions
    ///
    /// Fails with `MalformedJson` when a child index is out of range, a node
    /// has two parents, or the hierarchy contains a cycle.
    pub fn from_nodes(nodes: Vec<NodeDesc>) -> Result<Self> {
        let count = nodes.len();
        let mut parents: Vec<Option<NodeId>> = vec![None; count];

        for (index, node) in nodes.iter().enumerate() {
            for &child in &node.children {
                if child >= count {
                    return Err(ViewerError::MalformedJson(format!(
                        "node {} references missing child {}",
                        index, child
                    )));
                }
                if child == index {
                    return Err(ViewerError::MalformedJson(format!(
                        "node {} is its own child",
                        index
                    )));
                }
                if let Some(previous) = parents[child] {
                    return Err(ViewerError::MalformedJson(format!(
                        "node {} has two parents ({} and {})",
                        child, previous, index
                    )));
                }
                parents[child] = Some(index);
            }
        }

        let mut graph = SceneGraph {
            names: Vec::with_capacity(count),
            parents,
            children: Vec::with_capacity(count),
            locals: Vec::with_capacity(count),
            worlds: vec![Matrix4::identity(); count],
            meshes: Vec::with_capacity(count),
            skins: Vec::with_capacity(count),
            lights: Vec::with_capacity(count),
            weights: Vec::with_capacity(count),
            dirty: vec![true; count],
            any_dirty: count > 0,
            order: Vec::with_capacity(count),
        };

        for node in nodes {
            graph.names.push(node.name);
            graph.children.push(node.children);
            graph.locals.push(node.local);
            graph.meshes.push(node.mesh);
            graph.skins.push(node.skin);
            graph.lights.push(node.light);
            graph.weights.push(node.weights);
        }

        graph.order = graph.compute_order()?;
        graph.update_world_transforms();
        Ok(graph)
    }

    // Every node has at most one parent here, so a cycle leaves its members
    // unreachable from any root.
    fn compute_order(&self) -> Result<Vec<NodeId>> {
        let mut order = Vec::with_capacity(self.len());
        let mut stack: Vec<NodeId> = self.roots().rev().collect();

        while let Some(node) = stack.pop() {
            order.push(node);
            stack.extend(self.children[node].iter().rev());
        }

        if order.len() != self.len() {
            return Err(ViewerError::MalformedJson(
                "node hierarchy contains a cycle".to_string(),
            ));
        }
        Ok(order)
    }

    pub fn len(&self) -> usize {
        self.locals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locals.is_empty()
    }

    pub fn contains(&self, node: NodeId) -> bool {
        node < self.len()
    }

    /// Nodes without a parent, in index order
    pub fn roots(&self) -> impl DoubleEndedIterator<Item = NodeId> + '_ {
        self.parents
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_none())
            .map(|(i, _)| i)
    }

    /// Iterates all nodes so that every parent precedes its children
    pub fn iter_parent_first(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.order.iter().copied()
    }

    /// Iterates `root` and its descendants, parent first
    pub fn iter_subtree(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children[node].iter().rev());
        }
        out
    }

    pub fn name(&self, node: NodeId) -> Option<&str> {
        self.names[node].as_deref()
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.parents[node]
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.children[node]
    }

    pub fn mesh(&self, node: NodeId) -> Option<usize> {
        self.meshes[node]
    }

    pub fn skin(&self, node: NodeId) -> Option<usize> {
        self.skins[node]
    }

    pub fn light(&self, node: NodeId) -> Option<usize> {
        self.lights[node]
    }

    pub fn weights(&self, node: NodeId) -> Option<&[f32]> {
        self.weights[node].as_deref()
    }

    pub fn local(&self, node: NodeId) -> &LocalTransform {
        &self.locals[node]
    }

    pub fn local_matrix(&self, node: NodeId) -> Matrix4<f32> {
        self.locals[node].to_matrix()
    }

    pub fn trs(&self, node: NodeId) -> Trs {
        self.locals[node].to_trs()
    }

    /// World transform as of the last [`SceneGraph::update_world_transforms`]
    pub fn world(&self, node: NodeId) -> Matrix4<f32> {
        self.worlds[node]
    }

    pub fn set_local(&mut self, node: NodeId, local: LocalTransform) {
        self.locals[node] = local;
        self.mark_dirty(node);
    }

    pub fn set_trs(&mut self, node: NodeId, trs: Trs) {
        self.set_local(node, LocalTransform::Trs(trs));
    }

    // The single-component setters decompose a matrix transform first so the
    // other two components survive.
    pub fn set_translation(&mut self, node: NodeId, translation: Vector3<f32>) {
        let mut trs = self.trs(node);
        trs.translation = translation;
        self.set_trs(node, trs);
    }

    pub fn set_rotation(&mut self, node: NodeId, rotation: Quaternion<f32>) {
        let mut trs = self.trs(node);
        trs.rotation = rotation;
        self.set_trs(node, trs);
    }

    pub fn set_scale(&mut self, node: NodeId, scale: Vector3<f32>) {
        let mut trs = self.trs(node);
        trs.scale = scale;
        self.set_trs(node, trs);
    }

    pub fn set_weights(&mut self, node: NodeId, weights: Vec<f32>) {
        self.weights[node] = Some(weights);
    }

    pub fn capture_state(&self, node: NodeId) -> NodeState {
        NodeState {
            local: self.locals[node],
            weights: self.weights[node].clone(),
        }
    }

    pub fn restore_state(&mut self, node: NodeId, state: &NodeState) {
        self.locals[node] = state.local;
        self.weights[node] = state.weights.clone();
        self.mark_dirty(node);
    }

    pub fn mark_dirty(&mut self, node: NodeId) {
        self.dirty[node] = true;
        self.any_dirty = true;
    }

    pub fn has_dirty(&self) -> bool {
        self.any_dirty
    }

    /// Recomputes world transforms for dirty nodes and their descendants
    ///
    /// Returns the number of nodes whose world transform was rewritten.
    pub fn update_world_transforms(&mut self) -> usize {
        if !self.any_dirty {
            return 0;
        }

        let mut recomputed = vec![false; self.len()];
        let mut count = 0;

        for &node in &self.order {
            let parent = self.parents[node];
            let parent_changed = parent.is_some_and(|p| recomputed[p]);
            if !(self.dirty[node] || parent_changed) {
                continue;
            }

            let local = self.locals[node].to_matrix();
            self.worlds[node] = match parent {
                Some(p) => self.worlds[p] * local,
                None => local,
            };
            self.dirty[node] = false;
            recomputed[node] = true;
            count += 1;
        }

        self.any_dirty = false;
        log::trace!("Recomputed {} world transforms", count);
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::ErrorKind, math::frobenius_distance};
    use cgmath::{Deg, Rotation3};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn node(children: Vec<NodeId>, translation: [f32; 3]) -> NodeDesc {
        NodeDesc {
            children,
            local: LocalTransform::Trs(Trs {
                translation: translation.into(),
                ..Trs::default()
            }),
            ..NodeDesc::default()
        }
    }

    #[test]
    fn test_world_is_parent_times_local() {
        let graph = SceneGraph::from_nodes(vec![
            node(vec![1], [1.0, 0.0, 0.0]),
            node(vec![2], [0.0, 2.0, 0.0]),
            node(vec![], [0.0, 0.0, 3.0]),
        ])
        .unwrap();

        let world = graph.world(2);
        assert_eq!(world.w.truncate(), Vector3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_order_is_parent_first() {
        let graph = SceneGraph::from_nodes(vec![
            node(vec![], [0.0; 3]),
            node(vec![0, 3], [0.0; 3]),
            node(vec![1], [0.0; 3]),
            node(vec![], [0.0; 3]),
        ])
        .unwrap();

        let order: Vec<_> = graph.iter_parent_first().collect();
        let pos = |n: NodeId| order.iter().position(|&o| o == n).unwrap();
        assert_eq!(order.len(), 4);
        assert!(pos(2) < pos(1));
        assert!(pos(1) < pos(0));
        assert!(pos(1) < pos(3));
    }

    #[test]
    fn test_rejects_cycles_and_shared_children() {
        let cycle = SceneGraph::from_nodes(vec![node(vec![1], [0.0; 3]), node(vec![0], [0.0; 3])]);
        assert_eq!(cycle.unwrap_err().kind(), ErrorKind::MalformedJson);

        let shared = SceneGraph::from_nodes(vec![
            node(vec![2], [0.0; 3]),
            node(vec![2], [0.0; 3]),
            node(vec![], [0.0; 3]),
        ]);
        assert_eq!(shared.unwrap_err().kind(), ErrorKind::MalformedJson);

        let dangling = SceneGraph::from_nodes(vec![node(vec![4], [0.0; 3])]);
        assert_eq!(dangling.unwrap_err().kind(), ErrorKind::MalformedJson);
    }

    #[test]
    fn test_dirty_update_only_touches_subtree() {
        let mut graph = SceneGraph::from_nodes(vec![
            node(vec![1], [0.0; 3]),
            node(vec![], [0.0; 3]),
            node(vec![], [0.0; 3]),
        ])
        .unwrap();
        assert_eq!(graph.update_world_transforms(), 0);

        graph.set_translation(0, Vector3::new(0.0, 5.0, 0.0));
        assert_eq!(graph.update_world_transforms(), 2);
        assert_eq!(graph.world(1).w.y, 5.0);
        assert_eq!(graph.world(2).w.y, 0.0);
    }

    #[test]
    fn test_random_hierarchy_world_transforms() {
        let mut rng = StdRng::seed_from_u64(7);
        let count = 40;
        let mut nodes: Vec<NodeDesc> = (0..count)
            .map(|_| NodeDesc {
                local: LocalTransform::Trs(Trs {
                    translation: Vector3::new(
                        rng.random_range(-2.0..2.0),
                        rng.random_range(-2.0..2.0),
                        rng.random_range(-2.0..2.0),
                    ),
                    rotation: Quaternion::from_angle_y(Deg(rng.random_range(0.0..360.0))),
                    scale: Vector3::new(1.0, rng.random_range(0.5..2.0), 1.0),
                }),
                ..NodeDesc::default()
            })
            .collect();
        for child in 1..count {
            let parent = rng.random_range(0..child);
            nodes[parent].children.push(child);
        }

        let graph = SceneGraph::from_nodes(nodes).unwrap();
        for n in graph.iter_parent_first() {
            let expected = match graph.parent(n) {
                Some(p) => graph.world(p) * graph.local_matrix(n),
                None => graph.local_matrix(n),
            };
            assert!(frobenius_distance(&graph.world(n), &expected) < 1e-5);
        }
    }

    #[test]
    fn test_capture_and_restore() {
        let mut graph = SceneGraph::from_nodes(vec![node(vec![], [1.0, 2.0, 3.0])]).unwrap();
        let saved = graph.capture_state(0);
        graph.set_translation(0, Vector3::new(9.0, 9.0, 9.0));
        graph.restore_state(0, &saved);
        graph.update_world_transforms();
        assert_eq!(graph.world(0).w.truncate(), Vector3::new(1.0, 2.0, 3.0));
    }
}
