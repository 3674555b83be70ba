//! Scene graph storage with arena-based nodes
//!
//! Nodes are stored in a generational arena and refer to each other by
//! [`NodeId`]. Children are owned by their parent through the ordered
//! `children` list; the `parent` link is a plain handle that never keeps a
//! subtree alive.

use crate::error::{CompositorError, Result};
use crate::types::{NodeId, NodeKind, SceneNode};
use slotmap::SlotMap;

/// Arena holding one or more node trees
#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: SlotMap<NodeId, SceneNode>,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            nodes: SlotMap::with_capacity_and_key(64),
        }
    }

    /// Insert a detached node and return its handle
    pub fn insert(&mut self, mut node: SceneNode) -> NodeId {
        node.parent = None;
        node.children.clear();
        node.mark_transform_dirty();
        self.nodes.insert(node)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id)
    }

    pub(crate) fn node(&self, id: NodeId) -> Result<&SceneNode> {
        self.nodes.get(id).ok_or(CompositorError::NodeNotFound(id))
    }

    /// Number of nodes stored, attached or not
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Iterate from the node's parent up to its root
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            graph: self,
            next: self.parent(id),
        }
    }

    /// Topmost ancestor, or the node itself when detached
    pub fn root_of(&self, id: NodeId) -> NodeId {
        self.ancestors(id).last().unwrap_or(id)
    }

    /// Append `child` to `parent`, detaching it from any previous parent first
    pub fn add(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.node(parent)?;
        self.node(child)?;
        if parent == child || self.ancestors(parent).any(|a| a == child) {
            return Err(CompositorError::WouldCycle { parent, child });
        }

        self.detach(child);

        if let Some(p) = self.nodes.get_mut(parent) {
            p.children.push(child);
        }
        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = Some(parent);
            c.mark_transform_dirty();
        }
        Ok(())
    }

    /// Remove `child` from `parent`
    ///
    /// Returns false and leaves the graph untouched when `child` is not a
    /// child of `parent`.
    pub fn remove(&mut self, parent: NodeId, child: NodeId) -> bool {
        let Some(p) = self.nodes.get_mut(parent) else {
            return false;
        };
        let Some(pos) = p.children.iter().position(|&c| c == child) else {
            return false;
        };
        p.children.remove(pos);

        if let Some(c) = self.nodes.get_mut(child) {
            c.parent = None;
            c.mark_transform_dirty();
        }
        true
    }

    /// Sever the node from its parent, returning the former parent
    pub fn detach(&mut self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        self.remove(parent, id);
        Some(parent)
    }

    /// Detach a subtree and free it from the arena
    ///
    /// Returns the number of nodes freed.
    pub fn prune(&mut self, id: NodeId) -> usize {
        if !self.contains(id) {
            return 0;
        }
        self.detach(id);

        let mut freed = 0;
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(next) {
                stack.extend(node.children);
                freed += 1;
            }
        }
        freed
    }

    /// Replace the order of a node's children
    ///
    /// `order` must be a permutation of the current children; anything else
    /// is ignored.
    pub fn reorder_children(&mut self, parent: NodeId, order: Vec<NodeId>) -> bool {
        let Some(p) = self.nodes.get_mut(parent) else {
            return false;
        };
        if order.len() != p.children.len() || !order.iter().all(|id| p.children.contains(id)) {
            return false;
        }
        p.children = order;
        true
    }

    /// Stable sort of a node's children by a float key
    pub fn sort_children_by_key<F>(&mut self, parent: NodeId, mut key: F)
    where
        F: FnMut(NodeId) -> f64,
    {
        let Some(p) = self.nodes.get_mut(parent) else {
            return;
        };
        let mut keyed: Vec<(f64, NodeId)> = p.children.iter().map(|&c| (key(c), c)).collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
        p.children = keyed.into_iter().map(|(_, id)| id).collect();
    }

    /// Pre-order walk including `root`
    pub fn traverse<F>(&self, root: NodeId, mut visit: F)
    where
        F: FnMut(NodeId, &SceneNode),
    {
        self.walk(root, false, |id, node| {
            visit(id, node);
            true
        });
    }

    /// Pre-order walk that skips invisible nodes together with their subtrees
    pub fn traverse_visible<F>(&self, root: NodeId, mut visit: F)
    where
        F: FnMut(NodeId, &SceneNode),
    {
        self.walk(root, true, |id, node| {
            visit(id, node);
            true
        });
    }

    /// Collect the subtree rooted at `root` in pre-order
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        self.traverse(root, |id, _| out.push(id));
        out
    }

    /// First node in depth-first order whose `id` matches
    pub fn object_by_id(&self, root: NodeId, id: &str) -> Option<NodeId> {
        self.find(root, |node| node.id.as_deref() == Some(id))
    }

    /// First node in depth-first order whose `name` matches
    pub fn object_by_name(&self, root: NodeId, name: &str) -> Option<NodeId> {
        self.find(root, |node| node.name.as_deref() == Some(name))
    }

    pub fn find<P>(&self, root: NodeId, mut predicate: P) -> Option<NodeId>
    where
        P: FnMut(&SceneNode) -> bool,
    {
        let mut found = None;
        self.walk(root, false, |id, node| {
            if predicate(node) {
                found = Some(id);
                return false;
            }
            true
        });
        found
    }

    /// Clone a node into a new detached node
    ///
    /// Groups clone their whole subtree; every other variant copies only
    /// its own values.
    pub fn clone_node(&mut self, id: NodeId) -> Result<NodeId> {
        let source = self.node(id)?;
        let copy = source.copy_detached();
        let deep = matches!(source.kind, NodeKind::Group);
        let children = if deep { source.children.clone() } else { Vec::new() };

        let new_id = self.insert(copy);
        for child in children {
            let cloned = self.clone_node(child)?;
            self.add(new_id, cloned)?;
        }
        Ok(new_id)
    }

    /// Depth-first walk; `visit` returning false stops the whole walk
    fn walk<F>(&self, root: NodeId, visible_only: bool, mut visit: F)
    where
        F: FnMut(NodeId, &SceneNode) -> bool,
    {
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            if visible_only && !node.visible {
                continue;
            }
            if !visit(id, node) {
                return;
            }
            stack.extend(node.children.iter().rev());
        }
    }
}

/// Iterator over a node's ancestors, nearest first
pub struct Ancestors<'a> {
    graph: &'a SceneGraph,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.graph.parent(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Mesh, Shape};

    fn chain(graph: &mut SceneGraph) -> (NodeId, NodeId, NodeId) {
        let root = graph.insert(SceneNode::scene(None));
        let child = graph.insert(SceneNode::object().with_name("child"));
        let grandchild = graph.insert(SceneNode::object().with_name("grandchild"));
        graph.add(root, child).unwrap();
        graph.add(child, grandchild).unwrap();
        (root, child, grandchild)
    }

    #[test]
    fn test_add_sets_parent() {
        let mut graph = SceneGraph::new();
        let (root, child, grandchild) = chain(&mut graph);

        assert_eq!(graph.children(root), &[child]);
        assert_eq!(graph.parent(grandchild), Some(child));
        assert_eq!(graph.root_of(grandchild), root);
    }

    #[test]
    fn test_reparent_leaves_single_owner() {
        let mut graph = SceneGraph::new();
        let parent1 = graph.insert(SceneNode::object());
        let parent2 = graph.insert(SceneNode::object());
        let child = graph.insert(SceneNode::object());

        graph.add(parent1, child).unwrap();
        graph.add(parent2, child).unwrap();

        assert!(graph.children(parent1).is_empty());
        assert_eq!(graph.children(parent2), &[child]);
        assert_eq!(graph.parent(child), Some(parent2));
    }

    #[test]
    fn test_readding_to_same_parent_moves_to_end() {
        let mut graph = SceneGraph::new();
        let parent = graph.insert(SceneNode::object());
        let a = graph.insert(SceneNode::object());
        let b = graph.insert(SceneNode::object());
        graph.add(parent, a).unwrap();
        graph.add(parent, b).unwrap();

        graph.add(parent, a).unwrap();
        assert_eq!(graph.children(parent), &[b, a]);
    }

    #[test]
    fn test_remove_non_child_is_noop() {
        let mut graph = SceneGraph::new();
        let (root, child, grandchild) = chain(&mut graph);

        assert!(!graph.remove(root, grandchild));
        assert_eq!(graph.children(root), &[child]);
        assert_eq!(graph.parent(grandchild), Some(child));
    }

    #[test]
    fn test_remove_keeps_node_addressable() {
        let mut graph = SceneGraph::new();
        let (root, child, _) = chain(&mut graph);

        assert!(graph.remove(root, child));
        assert!(graph.parent(child).is_none());
        assert!(graph.contains(child));
        assert_eq!(graph.children(child).len(), 1);
    }

    #[test]
    fn test_cycle_rejected() {
        let mut graph = SceneGraph::new();
        let (root, _, grandchild) = chain(&mut graph);

        assert_eq!(
            graph.add(grandchild, root),
            Err(CompositorError::WouldCycle {
                parent: grandchild,
                child: root
            })
        );
        assert_eq!(
            graph.add(root, root),
            Err(CompositorError::WouldCycle {
                parent: root,
                child: root
            })
        );
    }

    #[test]
    fn test_stale_handle_errors() {
        let mut graph = SceneGraph::new();
        let root = graph.insert(SceneNode::object());
        let gone = graph.insert(SceneNode::object());
        graph.prune(gone);

        assert_eq!(graph.add(root, gone), Err(CompositorError::NodeNotFound(gone)));
        assert!(graph.get(gone).is_none());
    }

    #[test]
    fn test_prune_frees_subtree() {
        let mut graph = SceneGraph::new();
        let (root, child, grandchild) = chain(&mut graph);

        assert_eq!(graph.prune(child), 2);
        assert!(graph.children(root).is_empty());
        assert!(!graph.contains(grandchild));
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_traverse_pre_order() {
        let mut graph = SceneGraph::new();
        let (root, child, grandchild) = chain(&mut graph);

        let mut visited = Vec::new();
        graph.traverse(root, |id, _| visited.push(id));
        assert_eq!(visited, vec![root, child, grandchild]);
    }

    #[test]
    fn test_traverse_sibling_order() {
        let mut graph = SceneGraph::new();
        let root = graph.insert(SceneNode::object());
        let a = graph.insert(SceneNode::object());
        let a1 = graph.insert(SceneNode::object());
        let b = graph.insert(SceneNode::object());
        graph.add(root, a).unwrap();
        graph.add(a, a1).unwrap();
        graph.add(root, b).unwrap();

        assert_eq!(graph.descendants(root), vec![root, a, a1, b]);
    }

    #[test]
    fn test_traverse_visible_prunes_hidden() {
        let mut graph = SceneGraph::new();
        let (root, child, _) = chain(&mut graph);
        graph.get_mut(child).unwrap().set_visible(false);

        let mut visited = Vec::new();
        graph.traverse_visible(root, |id, _| visited.push(id));
        assert_eq!(visited, vec![root]);
    }

    #[test]
    fn test_lookup_by_name_and_id() {
        let mut graph = SceneGraph::new();
        let (root, child, grandchild) = chain(&mut graph);
        graph.get_mut(grandchild).unwrap().name = Some("child".into());
        graph.get_mut(grandchild).unwrap().id = Some("deep".into());

        assert_eq!(graph.object_by_name(root, "child"), Some(child));
        assert_eq!(graph.object_by_id(root, "deep"), Some(grandchild));
        assert_eq!(graph.object_by_id(root, "missing"), None);
    }

    #[test]
    fn test_clone_object_is_shallow() {
        let mut graph = SceneGraph::new();
        let (_, child, _) = chain(&mut graph);

        let copy = graph.clone_node(child).unwrap();
        assert!(graph.children(copy).is_empty());
        assert!(graph.parent(copy).is_none());
        assert_eq!(graph.get(copy).unwrap().name.as_deref(), Some("child"));
    }

    #[test]
    fn test_clone_group_is_deep() {
        let mut graph = SceneGraph::new();
        let group = graph.insert(SceneNode::group().with_position(1.0, 2.0));
        let mesh = graph.insert(SceneNode::mesh(Mesh::new(Shape::Circle { radius: 4.0 })));
        let inner = graph.insert(SceneNode::group());
        let leaf = graph.insert(SceneNode::object().with_name("leaf"));
        graph.add(group, mesh).unwrap();
        graph.add(group, inner).unwrap();
        graph.add(inner, leaf).unwrap();

        let copy = graph.clone_node(group).unwrap();
        let copied = graph.descendants(copy);
        assert_eq!(copied.len(), 4);
        assert!(!copied.contains(&mesh));
        assert_eq!(graph.children(group).len(), 2);
        assert_eq!(graph.get(copied[3]).unwrap().name.as_deref(), Some("leaf"));
    }

    #[test]
    fn test_sort_children_by_key() {
        let mut graph = SceneGraph::new();
        let root = graph.insert(SceneNode::object());
        let ids: Vec<NodeId> = (0..3).map(|_| graph.insert(SceneNode::object())).collect();
        for &id in &ids {
            graph.add(root, id).unwrap();
        }

        let (a, b, c) = (ids[0], ids[1], ids[2]);
        graph.sort_children_by_key(root, |id| {
            if id == a {
                f64::INFINITY
            } else if id == b {
                2.0
            } else {
                1.0
            }
        });
        assert_eq!(graph.children(root), &[c, b, a]);
    }

    #[test]
    fn test_reorder_children_rejects_foreign_ids() {
        let mut graph = SceneGraph::new();
        let (root, child, grandchild) = chain(&mut graph);
        assert!(!graph.reorder_children(root, vec![grandchild]));
        assert_eq!(graph.children(root), &[child]);
    }
}
