//! # Graph Backend Trait
//!
//! This is THE contract between the crossing splitter and whatever editor
//! owns the data. Every read and write the splitter needs is defined here.
//!
//! ## Implementations
//!
//! | Backend | Module | Description |
//! |---------|--------|-------------|
//! | `MemoryBackend` | `memory` | In-memory for testing/embedding |
//!
//! Host editors implement `GraphBackend` over their own data set. The
//! splitter never mutates the graph except through these methods, and only
//! from inside a `tx::Transaction`.

pub mod memory;

use hashbrown::HashSet;
use smallvec::SmallVec;

use crate::model::*;
use crate::{Error, Result};

pub use memory::{GraphSnapshot, MemoryBackend};

/// Ways referencing one node. Almost always a handful, so kept inline.
pub type ParentWays = SmallVec<[WayId; 4]>;

// ============================================================================
// GraphBackend Trait
// ============================================================================

/// The graph contract.
///
/// Methods take `&self`; backends that mutate use interior mutability, the
/// way `MemoryBackend` does. Lookups of unknown ids return
/// `Error::NotFound`, never a default.
pub trait GraphBackend {
    // ========================================================================
    // Lookup
    // ========================================================================

    /// Get a node by ID.
    fn node(&self, id: NodeId) -> Result<Node>;

    /// Get a way by ID.
    fn way(&self, id: WayId) -> Result<Way>;

    /// Every way containing `node`, each listed once.
    ///
    /// This is the reverse index the host maintains; callers filter out the
    /// way they are standing on themselves.
    fn parent_ways(&self, node: NodeId) -> Result<ParentWays>;

    /// Ordered node list of a way.
    fn way_nodes(&self, id: WayId) -> Result<Vec<NodeId>> {
        Ok(self.way(id)?.nodes)
    }

    /// All tags of a primitive.
    fn tags(&self, id: PrimitiveId) -> Result<TagMap> {
        match id {
            PrimitiveId::Node(n) => Ok(self.node(n)?.tags),
            PrimitiveId::Way(w) => Ok(self.way(w)?.tags),
        }
    }

    /// Value of one tag.
    fn tag(&self, id: PrimitiveId, key: &str) -> Result<Option<String>> {
        Ok(self.tags(id)?.get(key).cloned())
    }

    fn has_key(&self, id: PrimitiveId, key: &str) -> Result<bool> {
        Ok(self.tag(id, key)?.is_some())
    }

    fn has_tag(&self, id: PrimitiveId, key: &str, value: &str) -> Result<bool> {
        Ok(self.tag(id, key)?.as_deref() == Some(value))
    }

    // ========================================================================
    // Primitive mutation
    // ========================================================================

    /// Apply tag edits to one primitive. Returns the previous value of every
    /// key touched, suitable for handing back to undo the edit.
    fn set_tags(&self, id: PrimitiveId, changes: &TagChanges) -> Result<TagChanges>;

    /// Create a way with a fresh id.
    fn create_way(&self, nodes: Vec<NodeId>, tags: TagMap) -> Result<WayId>;

    /// Insert a way under its own id. Fails if the id is taken.
    ///
    /// Used to bring back ways removed by an undo.
    fn insert_way(&self, way: Way) -> Result<()>;

    /// Remove a way and return it.
    fn delete_way(&self, id: WayId) -> Result<Way>;

    /// Replace a way's node list, returning the old one.
    fn set_way_nodes(&self, id: WayId, nodes: Vec<NodeId>) -> Result<Vec<NodeId>>;

    // ========================================================================
    // Splitting
    // ========================================================================

    /// Cut a way at every interior occurrence of `split_nodes`.
    ///
    /// Returns the resulting ways in path order. The first keeps the original
    /// id; the rest are new ways with a copy of the original tags. Adjacent
    /// pieces share their boundary node.
    ///
    /// Default: `split_chunks` plus `set_way_nodes` / `create_way`. On a
    /// failure half way through, everything already done is reverted.
    fn split_way(&self, id: WayId, split_nodes: &[NodeId]) -> Result<Vec<Way>> {
        let way = self.way(id)?;
        let mut chunks = split_chunks(&way, split_nodes)?.into_iter();
        let Some(first) = chunks.next() else {
            return Err(Error::SplitFailed { way: id, reason: "no pieces".into() });
        };

        let original_nodes = self.set_way_nodes(id, first.clone())?;
        let mut pieces = vec![Way { id, nodes: first, tags: way.tags.clone() }];

        for chunk in chunks {
            match self.create_way(chunk.clone(), way.tags.clone()) {
                Ok(new_id) => pieces.push(Way { id: new_id, nodes: chunk, tags: way.tags.clone() }),
                Err(e) => {
                    let created: Vec<WayId> = pieces.iter().skip(1).map(|w| w.id).collect();
                    revert_split(self, id, &created, original_nodes);
                    return Err(e);
                }
            }
        }

        Ok(pieces)
    }
}

/// Undo a split that got part of the way: drop the `created` pieces, last
/// first, then give `way` its `original_nodes` back.
///
/// Runs on an error path already, so failures are logged rather than returned.
pub fn revert_split<B: GraphBackend + ?Sized>(
    backend: &B,
    way: WayId,
    created: &[WayId],
    original_nodes: Vec<NodeId>,
) {
    for piece in created.iter().rev() {
        if let Err(e) = backend.delete_way(*piece) {
            tracing::error!(way = %way, piece = %piece, error = %e, "Could not remove split piece");
        }
    }
    if let Err(e) = backend.set_way_nodes(way, original_nodes) {
        tracing::error!(way = %way, error = %e, "Could not restore nodes of split way");
    }
}

// ============================================================================
// Split algorithm
// ============================================================================

/// Indices of `way.nodes` at which the way is cut by `split_nodes`.
///
/// Open ways are cut at interior positions only; an endpoint is no cut at
/// all. Closed ways may be cut anywhere on the ring, including the closing
/// node (reported as index 0, never as the last index).
pub fn cut_positions(way: &Way, split_nodes: &[NodeId]) -> Vec<usize> {
    if way.len() < 2 {
        return Vec::new();
    }
    let wanted: HashSet<NodeId> = split_nodes.iter().copied().collect();
    let range = if way.is_closed() { 0..way.len() - 1 } else { 1..way.len() - 1 };
    range.filter(|&i| wanted.contains(&way.nodes[i])).collect()
}

/// Compute the node lists a way is cut into.
///
/// Closed ways need at least two distinct cut nodes, otherwise the ring
/// would only be rotated.
pub fn split_chunks(way: &Way, split_nodes: &[NodeId]) -> Result<Vec<Vec<NodeId>>> {
    let fail = |reason: &str| Error::SplitFailed { way: way.id, reason: reason.into() };

    if way.len() < 2 {
        return Err(fail("way has fewer than two nodes"));
    }
    let cuts = cut_positions(way, split_nodes);

    if way.is_closed() {
        let ring = &way.nodes[..way.len() - 1];
        let distinct: HashSet<NodeId> = cuts.iter().map(|&i| ring[i]).collect();
        if distinct.len() < 2 {
            return Err(fail("closed way needs two or more split nodes"));
        }

        let n = ring.len();
        let chunks = cuts
            .iter()
            .enumerate()
            .map(|(k, &start)| {
                let end = cuts.get(k + 1).copied().unwrap_or(cuts[0] + n);
                (start..=end).map(|j| ring[j % n]).collect()
            })
            .collect();
        return Ok(chunks);
    }

    if cuts.is_empty() {
        return Err(fail("no split node inside the way"));
    }

    let mut chunks = Vec::with_capacity(cuts.len() + 1);
    let mut start = 0;
    for cut in cuts.into_iter().chain(std::iter::once(way.len() - 1)) {
        chunks.push(way.nodes[start..=cut].to_vec());
        start = cut;
    }
    Ok(chunks)
}
