//! Way in the editing graph: an ordered chain of nodes with its own tags.

use serde::{Deserialize, Serialize};
use super::{NodeId, TagMap};

/// Opaque way identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WayId(pub u64);

impl std::fmt::Display for WayId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "w{}", self.0)
    }
}

/// A way in the editing graph: node -> node -> node ...
///
/// The first and last node may coincide, which makes the way closed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Way {
    pub id: WayId,
    pub nodes: Vec<NodeId>,
    pub tags: TagMap,
}

impl Way {
    pub fn new(id: WayId, nodes: impl IntoIterator<Item = NodeId>) -> Self {
        Self {
            id,
            nodes: nodes.into_iter().collect(),
            tags: TagMap::new(),
        }
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.tags.contains_key(key)
    }

    pub fn has_tag(&self, key: &str, value: &str) -> bool {
        self.get(key) == Some(value)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn first_node(&self) -> Option<NodeId> {
        self.nodes.first().copied()
    }

    pub fn last_node(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }

    pub fn is_closed(&self) -> bool {
        self.nodes.len() > 1 && self.first_node() == self.last_node()
    }
}
