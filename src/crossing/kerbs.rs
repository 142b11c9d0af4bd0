//! Finding roadway intersections along a sidewalk and the kerbs around them.

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::model::{NodeId, Way, WayId};
use crate::storage::{cut_positions, GraphBackend};
use crate::Result;
use super::is_roadway;

/// Where a sidewalk meets roads, and where it has to be cut because of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KerbPlan {
    pub way: WayId,
    /// Nodes just before and after each intersection, in discovery order.
    /// A node bordering two intersections shows up twice.
    pub kerbs: Vec<NodeId>,
    /// Nodes shared with a roadway, in path order, each once.
    pub intersections: Vec<NodeId>,
    /// Indices into the way's node list where it will actually be cut.
    pub split_positions: Vec<usize>,
}

impl KerbPlan {
    pub fn has_intersections(&self) -> bool {
        !self.intersections.is_empty()
    }
}

/// Does any way other than `way` carrying a roadway `highway` value contain `node`?
fn touches_roadway<B: GraphBackend + ?Sized>(backend: &B, way: WayId, node: NodeId) -> Result<bool> {
    for parent in backend.parent_ways(node)? {
        if parent == way {
            continue;
        }
        if is_roadway(backend.way(parent)?.get("highway")) {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Walk `way` and collect its roadway intersections and the kerbs to cut at.
///
/// The cut goes one node before and one node after each intersection, so the
/// intersection itself ends up inside a short crossing piece. An endpoint has
/// nothing beyond it, so no kerb is added on that side.
pub fn find_kerbs_around_intersections<B: GraphBackend + ?Sized>(
    backend: &B,
    way: &Way,
) -> Result<KerbPlan> {
    let node_count = way.nodes.len();
    let mut kerbs = Vec::new();
    let mut intersections = Vec::new();
    let mut seen = HashSet::new();

    for (i, &node) in way.nodes.iter().enumerate() {
        if !touches_roadway(backend, way.id, node)? {
            continue;
        }
        if seen.insert(node) {
            intersections.push(node);
        }
        if i != 0 {
            kerbs.push(way.nodes[i - 1]);
        }
        if i + 1 < node_count {
            kerbs.push(way.nodes[i + 1]);
        }
    }

    let split_positions = cut_positions(way, &kerbs);
    tracing::debug!(
        way = %way.id,
        intersections = ?intersections,
        kerbs = ?kerbs,
        split_positions = ?split_positions,
        "Intersections between sidewalk and roads"
    );

    Ok(KerbPlan { way: way.id, kerbs, intersections, split_positions })
}
