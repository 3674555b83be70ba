//! Error types for scene graph operations

use crate::types::NodeId;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CompositorError {
    /// The handle is stale or belongs to another graph
    #[error("node {0:?} does not exist in this scene graph")]
    NodeNotFound(NodeId),

    /// Adding `child` under `parent` would make a node its own ancestor
    #[error("cannot add node {child:?} beneath itself or its descendant {parent:?}")]
    WouldCycle { parent: NodeId, child: NodeId },
}

pub type Result<T> = std::result::Result<T, CompositorError>;
