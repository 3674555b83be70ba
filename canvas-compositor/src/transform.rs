//! Transform calculation and caching for scene nodes
//!
//! Local matrices are composed scale → rotation → translation with glam's
//! `Affine2`. World matrices are the product of every ancestor's local matrix
//! and are cached on each node behind a dirty flag.
//!
//! `world_transform` walks the ancestors directly and composes the same
//! products, so the walked transform and the cached `matrix_world` agree
//! after `update_matrix_world` has run on the subtree.

use crate::error::{CompositorError, Result};
use crate::scene::SceneGraph;
use crate::types::{NodeId, SceneNode};
use glam::{Affine2, Vec2};

/// Compose a local matrix from position, rotation (radians) and scale
pub fn compose_matrix(position: Vec2, rotation: f32, scale: Vec2) -> Affine2 {
    Affine2::from_scale_angle_translation(scale, rotation, position)
}

/// The node's local matrix as `update_matrix` would leave it
fn local_matrix(node: &SceneNode) -> Affine2 {
    if node.matrix_auto_update {
        compose_matrix(node.position, node.rotation, node.scale)
    } else {
        node.matrix
    }
}

/// Recompose `matrix` from position/rotation/scale
///
/// Skipped entirely when `matrix_auto_update` is false.
pub fn update_node_matrix(node: &mut SceneNode) {
    if !node.matrix_auto_update {
        return;
    }
    node.matrix = compose_matrix(node.position, node.rotation, node.scale);
    node.matrix_world_needs_update = true;
}

impl SceneGraph {
    /// Recompose the local matrix of a single node
    pub fn update_matrix(&mut self, id: NodeId) -> Result<()> {
        let node = self.get_mut(id).ok_or(CompositorError::NodeNotFound(id))?;
        update_node_matrix(node);
        Ok(())
    }

    /// Refresh world matrices for the subtree rooted at `id`
    ///
    /// A node recomputes its world matrix when dirty or forced; once it does,
    /// every descendant is forced in the same call.
    pub fn update_matrix_world(&mut self, id: NodeId, force: bool) -> Result<()> {
        if !self.contains(id) {
            return Err(CompositorError::NodeNotFound(id));
        }

        let mut stack = vec![(id, force)];
        while let Some((current, force)) = stack.pop() {
            let parent_world = self
                .parent(current)
                .and_then(|p| self.get(p))
                .map(|p| p.matrix_world);

            let Some(node) = self.get_mut(current) else {
                continue;
            };

            update_node_matrix(node);

            let mut force = force;
            if node.matrix_world_needs_update || force {
                node.matrix_world = match parent_world {
                    Some(parent) => parent * node.matrix,
                    None => node.matrix,
                };
                node.matrix_world_needs_update = false;
                force = true;
            }

            stack.extend(node.children.iter().rev().map(|&child| (child, force)));
        }
        Ok(())
    }

    /// World transform composed by walking the ancestors
    ///
    /// Does not read or touch the cached `matrix_world`.
    pub fn world_transform(&self, id: NodeId) -> Option<Affine2> {
        let mut transform = local_matrix(self.get(id)?);
        for ancestor in self.ancestors(id) {
            transform = local_matrix(self.get(ancestor)?) * transform;
        }
        Some(transform)
    }

    pub fn world_position(&self, id: NodeId) -> Option<Vec2> {
        self.world_transform(id).map(|t| t.translation)
    }

    pub fn world_rotation(&self, id: NodeId) -> Option<f32> {
        self.world_transform(id)
            .map(|t| t.to_scale_angle_translation().1)
    }

    pub fn world_scale(&self, id: NodeId) -> Option<Vec2> {
        self.world_transform(id)
            .map(|t| t.to_scale_angle_translation().0)
    }

    /// Map a point from node-local to world coordinates
    pub fn local_to_world(&self, id: NodeId, point: Vec2) -> Option<Vec2> {
        self.world_transform(id).map(|t| t.transform_point2(point))
    }

    /// Map a world point into node-local coordinates
    pub fn world_to_local(&self, id: NodeId, point: Vec2) -> Option<Vec2> {
        self.world_transform(id)
            .map(|t| t.inverse().transform_point2(point))
    }

    /// Rotate the node so its local +X axis points at `target` (world space)
    pub fn look_at(&mut self, id: NodeId, target: Vec2) -> Result<()> {
        let origin = self
            .world_position(id)
            .ok_or(CompositorError::NodeNotFound(id))?;
        let parent_rotation = self
            .parent(id)
            .and_then(|p| self.world_rotation(p))
            .unwrap_or(0.0);

        let direction = target - origin;
        if direction.length_squared() <= f32::EPSILON {
            return Ok(());
        }

        let node = self.get_mut(id).ok_or(CompositorError::NodeNotFound(id))?;
        node.set_rotation(direction.y.atan2(direction.x) - parent_rotation);
        Ok(())
    }
}
