//! Retained-object cache for reconciliation
//!
//! One manager is one reconciliation session: it maps stable keys to the
//! nodes created for them, records the desired paint order and tracks which
//! keys the current pass used. Everything not used is disposed at the end of
//! the pass.

use crate::scheduler::UpdateRegistry;
use canvas_compositor::{NodeId, SceneGraph};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct ObjectManager {
    objects: HashMap<String, NodeId>,
    render_order: HashMap<String, f64>,
    used_keys: HashSet<String>,
}

impl ObjectManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `key` as used in this pass with its paint order
    pub fn mark_key_used(&mut self, key: &str, order: f64) {
        self.used_keys.insert(key.to_string());
        self.render_order.insert(key.to_string(), order);
    }

    pub fn is_used(&self, key: &str) -> bool {
        self.used_keys.contains(key)
    }

    pub fn get_cached(&self, key: &str) -> Option<NodeId> {
        self.objects.get(key).copied()
    }

    pub fn cache(&mut self, key: &str, id: NodeId) {
        self.objects.insert(key.to_string(), id);
    }

    /// Drop a key from the cache without touching the graph
    pub fn uncache(&mut self, key: &str) -> Option<NodeId> {
        self.render_order.remove(key);
        self.objects.remove(key)
    }

    /// Must run before every pass, otherwise nothing is ever disposed
    pub fn clear_used_keys(&mut self) {
        self.used_keys.clear();
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.objects.keys().map(String::as_str)
    }

    /// Dispose every cached key not used in this pass
    ///
    /// Each stale node is detached and pruned with its subtree, and the key
    /// is dropped from the cache, the render order and `updates`. Returns
    /// the disposed keys, sorted.
    pub fn cleanup_unused_objects(
        &mut self,
        graph: &mut SceneGraph,
        updates: &mut UpdateRegistry,
    ) -> Vec<String> {
        let mut stale: Vec<String> = self
            .objects
            .keys()
            .filter(|key| !self.used_keys.contains(*key))
            .cloned()
            .collect();
        stale.sort();

        for key in &stale {
            updates.unregister(key);
            if let Some(id) = self.uncache(key) {
                // Already gone when an ancestor was pruned earlier in the loop
                if graph.contains(id) {
                    graph.detach(id);
                    graph.prune(id);
                }
            }
        }

        if !stale.is_empty() {
            log::debug!("disposed {} unused objects", stale.len());
        }
        stale
    }

    /// Order the scene's direct children by recorded render order
    pub fn sort_scene_children(&self, graph: &mut SceneGraph, scene: NodeId) {
        self.sort_children(graph, &[scene]);
    }

    /// Order the children of each of `parents` by recorded render order
    ///
    /// Children without a recorded order sort last, keeping their relative
    /// order.
    pub fn sort_children(&self, graph: &mut SceneGraph, parents: &[NodeId]) {
        let orders: HashMap<NodeId, f64> = self
            .objects
            .iter()
            .filter_map(|(key, &id)| self.render_order.get(key).map(|&order| (id, order)))
            .collect();

        for &parent in parents {
            graph.sort_children_by_key(parent, |child| {
                orders.get(&child).copied().unwrap_or(f64::INFINITY)
            });
        }
    }

    /// Forget everything; the graph is left untouched
    pub fn clear(&mut self) {
        self.objects.clear();
        self.render_order.clear();
        self.used_keys.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::FrameTime;
    use canvas_compositor::SceneNode;

    fn populated(keys: &[&str]) -> (ObjectManager, SceneGraph, NodeId) {
        let mut graph = SceneGraph::new();
        let scene = graph.insert(SceneNode::scene(None));
        let mut manager = ObjectManager::new();
        for (i, key) in keys.iter().enumerate() {
            let id = graph.insert(SceneNode::object().with_name(*key));
            graph.add(scene, id).unwrap();
            manager.mark_key_used(key, i as f64);
            manager.cache(key, id);
        }
        (manager, graph, scene)
    }

    #[test]
    fn test_cleanup_disposes_unused() {
        let (mut manager, mut graph, scene) = populated(&["a", "b", "c"]);
        let b = manager.get_cached("b").unwrap();
        let mut updates = UpdateRegistry::new();
        for key in ["a", "b", "c"] {
            updates.register(key, Box::new(|_: &mut SceneNode, _: FrameTime| Ok(())));
        }

        manager.clear_used_keys();
        manager.mark_key_used("a", 0.0);
        manager.mark_key_used("c", 1.0);
        let disposed = manager.cleanup_unused_objects(&mut graph, &mut updates);

        assert_eq!(disposed, vec!["b".to_string()]);
        assert_eq!(manager.len(), 2);
        assert!(manager.get_cached("b").is_none());
        assert!(!updates.contains("b"));
        assert_eq!(updates.len(), 2);
        assert!(!graph.children(scene).contains(&b));
        assert!(!graph.contains(b));
    }

    #[test]
    fn test_cleanup_without_clear_disposes_nothing() {
        let (mut manager, mut graph, _) = populated(&["a", "b"]);
        let mut updates = UpdateRegistry::new();
        assert!(manager
            .cleanup_unused_objects(&mut graph, &mut updates)
            .is_empty());
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_cleanup_handles_nested_stale_nodes() {
        let (mut manager, mut graph, _) = populated(&["a"]);
        let a = manager.get_cached("a").unwrap();
        let inner = graph.insert(SceneNode::object());
        graph.add(a, inner).unwrap();
        manager.cache("a/inner", inner);

        manager.clear_used_keys();
        let mut updates = UpdateRegistry::new();
        let disposed = manager.cleanup_unused_objects(&mut graph, &mut updates);

        assert_eq!(disposed, vec!["a".to_string(), "a/inner".to_string()]);
        assert!(manager.is_empty());
        assert!(!graph.contains(inner));
    }

    #[test]
    fn test_sort_scene_children() {
        let (mut manager, mut graph, scene) = populated(&["a", "b", "c"]);
        let stray = graph.insert(SceneNode::object());
        graph.add(scene, stray).unwrap();
        graph.reorder_children(
            scene,
            vec![
                stray,
                manager.get_cached("c").unwrap(),
                manager.get_cached("a").unwrap(),
                manager.get_cached("b").unwrap(),
            ],
        );

        manager.mark_key_used("c", 0.5);
        manager.sort_scene_children(&mut graph, scene);

        let expected = vec![
            manager.get_cached("a").unwrap(),
            manager.get_cached("c").unwrap(),
            manager.get_cached("b").unwrap(),
            stray,
        ];
        assert_eq!(graph.children(scene), expected.as_slice());
    }

    #[test]
    fn test_uncache_forgets_order() {
        let (mut manager, _, _) = populated(&["a"]);
        assert!(manager.uncache("a").is_some());
        assert!(manager.uncache("a").is_none());
        assert!(manager.is_used("a"));
        assert!(manager.is_empty());
    }
}
