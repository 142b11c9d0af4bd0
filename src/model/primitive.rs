//! Either kind of taggable graph element.

use serde::{Deserialize, Serialize};
use super::{NodeId, WayId};

/// Reference to a node or a way. Selections and tag edits are expressed in these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PrimitiveId {
    Node(NodeId),
    Way(WayId),
}

impl PrimitiveId {
    pub fn as_way(self) -> Option<WayId> {
        match self {
            PrimitiveId::Way(id) => Some(id),
            PrimitiveId::Node(_) => None,
        }
    }
}

impl std::fmt::Display for PrimitiveId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrimitiveId::Node(id) => id.fmt(f),
            PrimitiveId::Way(id) => id.fmt(f),
        }
    }
}

impl From<NodeId> for PrimitiveId {
    fn from(id: NodeId) -> Self {
        PrimitiveId::Node(id)
    }
}

impl From<WayId> for PrimitiveId {
    fn from(id: WayId) -> Self {
        PrimitiveId::Way(id)
    }
}
