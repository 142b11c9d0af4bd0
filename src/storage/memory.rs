//! In-memory graph backend.
//!
//! This is the reference implementation of `GraphBackend`.
//! It uses HashMaps protected by RwLock, plus a node → ways reverse index
//! that is kept current on every way mutation.
//!
//! ## Limitations
//!
//! - **Single-writer only**: per-collection locks mean multi-step mutations
//!   are NOT atomic. Atomicity of an edit comes from `tx::Transaction`
//!   undoing what it applied, not from the backend.
//! - **No relations**: splitting a way does not have to patch any relation
//!   memberships because there are none.
//!
//! Use this backend for:
//! - Testing the splitter end to end
//! - Embedding the splitter in tools that load their own data

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::model::*;
use crate::{Error, Result};
use super::{GraphBackend, ParentWays};

// ============================================================================
// MemoryBackend
// ============================================================================

/// In-memory editing graph.
pub struct MemoryBackend {
    inner: Arc<MemoryInner>,
}

struct MemoryInner {
    nodes: RwLock<HashMap<NodeId, Node>>,
    ways: RwLock<HashMap<WayId, Way>>,
    /// node_id → ways containing it (poor man's parent index)
    parents: RwLock<hashbrown::HashMap<NodeId, ParentWays>>,
    next_node_id: AtomicU64,
    next_way_id: AtomicU64,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MemoryInner {
                nodes: RwLock::new(HashMap::new()),
                ways: RwLock::new(HashMap::new()),
                parents: RwLock::new(hashbrown::HashMap::new()),
                next_node_id: AtomicU64::new(1),
                next_way_id: AtomicU64::new(1),
            }),
        }
    }

    /// Create a node with the given tags.
    pub fn create_node(&self, tags: TagMap) -> NodeId {
        let id = NodeId(self.inner.next_node_id.fetch_add(1, Ordering::Relaxed));
        self.inner.nodes.write().insert(id, Node { id, tags });
        id
    }

    /// Insert a node under its own id, replacing any node with that id.
    pub fn insert_node(&self, node: Node) {
        self.inner.next_node_id.fetch_max(node.id.0 + 1, Ordering::Relaxed);
        self.inner.nodes.write().insert(node.id, node);
    }

    pub fn way_count(&self) -> usize {
        self.inner.ways.read().len()
    }

    /// Copy of the whole graph, sorted by id.
    pub fn snapshot(&self) -> GraphSnapshot {
        let mut nodes: Vec<Node> = self.inner.nodes.read().values().cloned().collect();
        let mut ways: Vec<Way> = self.inner.ways.read().values().cloned().collect();
        nodes.sort_by_key(|n| n.id);
        ways.sort_by_key(|w| w.id);
        GraphSnapshot { nodes, ways }
    }

    /// Build a backend holding exactly the contents of `snapshot`.
    pub fn from_snapshot(snapshot: GraphSnapshot) -> Result<Self> {
        let backend = Self::new();
        for node in snapshot.nodes {
            backend.insert_node(node);
        }
        for way in snapshot.ways {
            backend.insert_way(way)?;
        }
        Ok(backend)
    }

    fn check_nodes_exist(&self, nodes: &[NodeId]) -> Result<()> {
        let known = self.inner.nodes.read();
        match nodes.iter().find(|id| !known.contains_key(*id)) {
            Some(missing) => Err(Error::NotFound(format!("Node {missing}"))),
            None => Ok(()),
        }
    }

    fn index_way(&self, id: WayId, nodes: &[NodeId]) {
        let mut parents = self.inner.parents.write();
        for node in nodes {
            let entry = parents.entry(*node).or_default();
            if !entry.contains(&id) {
                entry.push(id);
            }
        }
    }

    fn unindex_way(&self, id: WayId, nodes: &[NodeId]) {
        let mut parents = self.inner.parents.write();
        for node in nodes {
            if let Some(entry) = parents.get_mut(node) {
                entry.retain(|w| *w != id);
                if entry.is_empty() {
                    parents.remove(node);
                }
            }
        }
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// GraphSnapshot
// ============================================================================

/// Plain copy of a graph's contents. Equal snapshots mean equal graphs.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub nodes: Vec<Node>,
    pub ways: Vec<Way>,
}

// ============================================================================
// GraphBackend impl
// ============================================================================

impl GraphBackend for MemoryBackend {
    fn node(&self, id: NodeId) -> Result<Node> {
        self.inner.nodes.read().get(&id).cloned()
            .ok_or_else(|| Error::NotFound(format!("Node {id}")))
    }

    fn way(&self, id: WayId) -> Result<Way> {
        self.inner.ways.read().get(&id).cloned()
            .ok_or_else(|| Error::NotFound(format!("Way {id}")))
    }

    fn parent_ways(&self, node: NodeId) -> Result<ParentWays> {
        if !self.inner.nodes.read().contains_key(&node) {
            return Err(Error::NotFound(format!("Node {node}")));
        }
        Ok(self.inner.parents.read().get(&node).cloned().unwrap_or_default())
    }

    fn set_tags(&self, id: PrimitiveId, changes: &TagChanges) -> Result<TagChanges> {
        match id {
            PrimitiveId::Node(n) => {
                let mut nodes = self.inner.nodes.write();
                let node = nodes.get_mut(&n).ok_or_else(|| Error::NotFound(format!("Node {n}")))?;
                Ok(apply_changes(&mut node.tags, changes))
            }
            PrimitiveId::Way(w) => {
                let mut ways = self.inner.ways.write();
                let way = ways.get_mut(&w).ok_or_else(|| Error::NotFound(format!("Way {w}")))?;
                Ok(apply_changes(&mut way.tags, changes))
            }
        }
    }

    fn create_way(&self, nodes: Vec<NodeId>, tags: TagMap) -> Result<WayId> {
        self.check_nodes_exist(&nodes)?;
        let id = WayId(self.inner.next_way_id.fetch_add(1, Ordering::Relaxed));
        self.inner.ways.write().insert(id, Way { id, nodes: nodes.clone(), tags });
        self.index_way(id, &nodes);
        Ok(id)
    }

    fn insert_way(&self, way: Way) -> Result<()> {
        self.check_nodes_exist(&way.nodes)?;
        let (id, nodes) = (way.id, way.nodes.clone());
        match self.inner.ways.write().entry(id) {
            Entry::Occupied(_) => {
                return Err(Error::CommandFailed(format!("Way {id} already exists")));
            }
            Entry::Vacant(slot) => {
                slot.insert(way);
            }
        }
        self.inner.next_way_id.fetch_max(id.0 + 1, Ordering::Relaxed);
        self.index_way(id, &nodes);
        Ok(())
    }

    fn delete_way(&self, id: WayId) -> Result<Way> {
        let removed = self.inner.ways.write().remove(&id)
            .ok_or_else(|| Error::NotFound(format!("Way {id}")))?;
        self.unindex_way(id, &removed.nodes);
        Ok(removed)
    }

    fn set_way_nodes(&self, id: WayId, nodes: Vec<NodeId>) -> Result<Vec<NodeId>> {
        self.check_nodes_exist(&nodes)?;
        let old = {
            let mut ways = self.inner.ways.write();
            let way = ways.get_mut(&id).ok_or_else(|| Error::NotFound(format!("Way {id}")))?;
            std::mem::replace(&mut way.nodes, nodes.clone())
        };
        self.unindex_way(id, &old);
        self.index_way(id, &nodes);
        Ok(old)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn chain(db: &MemoryBackend, count: usize) -> Vec<NodeId> {
        (0..count).map(|_| db.create_node(TagMap::new())).collect()
    }

    #[test]
    fn test_create_and_get_way() {
        let db = MemoryBackend::new();
        let nodes = chain(&db, 3);
        let mut tags = TagMap::new();
        tags.insert("highway".into(), "footway".into());

        let id = db.create_way(nodes.clone(), tags).unwrap();
        let way = db.way(id).unwrap();
        assert_eq!(way.nodes, nodes);
        assert!(way.has_tag("highway", "footway"));
        assert_eq!(db.way_count(), 1);
    }

    #[test]
    fn test_way_with_unknown_node_is_rejected() {
        let db = MemoryBackend::new();
        let err = db.create_way(vec![NodeId(42)], TagMap::new()).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_parent_index_follows_mutations() {
        let db = MemoryBackend::new();
        let nodes = chain(&db, 4);
        let a = db.create_way(nodes[..3].to_vec(), TagMap::new()).unwrap();
        let b = db.create_way(nodes[2..].to_vec(), TagMap::new()).unwrap();

        assert_eq!(db.parent_ways(nodes[2]).unwrap().as_slice(), &[a, b]);

        db.set_way_nodes(a, nodes[..2].to_vec()).unwrap();
        assert_eq!(db.parent_ways(nodes[2]).unwrap().as_slice(), &[b]);

        db.delete_way(b).unwrap();
        assert!(db.parent_ways(nodes[3]).unwrap().is_empty());
    }

    #[test]
    fn test_closed_way_listed_once() {
        let db = MemoryBackend::new();
        let nodes = chain(&db, 3);
        let ring = db.create_way(vec![nodes[0], nodes[1], nodes[2], nodes[0]], TagMap::new()).unwrap();
        assert_eq!(db.parent_ways(nodes[0]).unwrap().as_slice(), &[ring]);
    }

    #[test]
    fn test_set_tags_returns_previous_values() {
        let db = MemoryBackend::new();
        let n = db.create_node(TagMap::new());
        let prev = db
            .set_tags(n.into(), &changes([("tactile_paving", Some("yes"))]))
            .unwrap();
        assert_eq!(prev.get("tactile_paving"), Some(&None));
        assert!(db.has_tag(n.into(), "tactile_paving", "yes").unwrap());

        db.set_tags(n.into(), &prev).unwrap();
        assert!(!db.has_key(n.into(), "tactile_paving").unwrap());
    }

    #[test]
    fn test_split_way_default() {
        let db = MemoryBackend::new();
        let nodes = chain(&db, 5);
        let mut tags = TagMap::new();
        tags.insert("surface".into(), "asphalt".into());
        let id = db.create_way(nodes.clone(), tags).unwrap();

        let pieces = db.split_way(id, &[nodes[1], nodes[3]]).unwrap();
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[0].id, id);
        assert_eq!(db.way_nodes(id).unwrap(), vec![nodes[0], nodes[1]]);
        assert_eq!(pieces[1].nodes, vec![nodes[1], nodes[2], nodes[3]]);
        for piece in &pieces {
            assert!(db.way(piece.id).unwrap().has_tag("surface", "asphalt"));
        }
        assert_eq!(db.parent_ways(nodes[1]).unwrap().as_slice(), &[id, pieces[1].id]);
    }

    #[test]
    fn test_insert_way_refuses_duplicate_id() {
        let db = MemoryBackend::new();
        let nodes = chain(&db, 2);
        let id = db.create_way(nodes.clone(), TagMap::new()).unwrap();
        assert!(db.insert_way(Way::new(id, nodes)).is_err());
    }

    #[test]
    fn test_reinserted_way_is_indexed_once() {
        let db = MemoryBackend::new();
        let nodes = chain(&db, 3);
        let other = chain(&db, 2);
        let id = db.create_way(nodes.clone(), TagMap::new()).unwrap();

        let removed = db.delete_way(id).unwrap();
        assert!(db.parent_ways(nodes[1]).unwrap().is_empty());
        db.insert_way(removed).unwrap();
        assert_eq!(db.parent_ways(nodes[1]).unwrap().as_slice(), &[id]);

        // a refused insert indexes nothing
        assert!(db.insert_way(Way::new(id, other.clone())).is_err());
        assert!(db.parent_ways(other[0]).unwrap().is_empty());
        assert_eq!(db.way_nodes(id).unwrap(), nodes);
    }

    #[test]
    fn test_snapshot_roundtrip() {
        let db = MemoryBackend::new();
        let nodes = chain(&db, 3);
        db.create_way(nodes, TagMap::new()).unwrap();

        let copy = MemoryBackend::from_snapshot(db.snapshot()).unwrap();
        assert_eq!(copy.snapshot(), db.snapshot());
        // ids keep counting past the restored ones
        assert_eq!(copy.create_node(TagMap::new()), NodeId(4));
    }
}
