//! Deriving tags for the pieces of a split sidewalk.

use std::collections::BTreeSet;

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::model::{NodeId, TagChanges, Way, WayId};
use crate::storage::GraphBackend;
use crate::util::exactly_one;
use crate::Result;

/// Node tags shared by a crossing node and its crossing way.
pub const COPIED_NODE_KEYS: &[&str] = &["crossing", "crossing:island"];

/// What a piece of the sidewalk turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SegmentKind {
    /// No roadway intersection on it.
    Sidewalk,
    /// Exactly one roadway intersection on it.
    Crossing,
    /// Several intersections on one piece. Tagged as a crossing, but node
    /// tags are not copied since it is unclear which node to take them from.
    AmbiguousCrossing,
}

impl SegmentKind {
    pub fn is_crossing(self) -> bool {
        !matches!(self, SegmentKind::Sidewalk)
    }
}

/// Tag edits for one piece of the split sidewalk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentTagChange {
    pub way: WayId,
    pub nodes: Vec<NodeId>,
    pub kind: SegmentKind,
    /// Intersection nodes on this piece, in path order.
    pub crossings: Vec<NodeId>,
    pub changes: TagChanges,
}

/// Tag edits for a group of nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeTagChange {
    pub nodes: Vec<NodeId>,
    pub changes: TagChanges,
}

impl NodeTagChange {
    pub fn new(nodes: Vec<NodeId>, key: &str, value: &str) -> Self {
        let mut changes = TagChanges::new();
        changes.insert(key.to_string(), Some(value.to_string()));
        Self { nodes, changes }
    }
}

fn set(changes: &mut TagChanges, key: &str, value: Option<&str>) {
    changes.insert(key.to_string(), value.map(str::to_string));
}

/// Derive tag edits for every piece of a split sidewalk.
///
/// `pieces` are all ways the sidewalk was cut into, including the one that
/// kept the original id. Returns one change per piece, in order, plus the
/// node edits that go with them (tactile paving on crossing kerbs).
pub fn set_split_way_tags<B: GraphBackend + ?Sized>(
    backend: &B,
    pieces: &[Way],
    intersections: &[NodeId],
) -> Result<(Vec<SegmentTagChange>, Vec<NodeTagChange>)> {
    let intersections: HashSet<NodeId> = intersections.iter().copied().collect();
    let sidewalk: HashSet<WayId> = pieces.iter().map(|w| w.id).collect();
    let mut segments = Vec::with_capacity(pieces.len());
    let mut node_changes = Vec::new();

    for piece in pieces {
        let mut changes = TagChanges::new();
        set(&mut changes, "highway", Some("footway"));

        let mut seen = HashSet::new();
        let crossings: Vec<NodeId> = piece
            .nodes
            .iter()
            .copied()
            .filter(|n| intersections.contains(n) && seen.insert(*n))
            .collect();

        let kind = match crossings.len() {
            0 => SegmentKind::Sidewalk,
            1 => SegmentKind::Crossing,
            _ => SegmentKind::AmbiguousCrossing,
        };

        if kind == SegmentKind::Sidewalk {
            set(&mut changes, "footway", Some("sidewalk"));
        } else {
            set(&mut changes, "footway", Some("crossing"));

            if let Some(&crossing) = exactly_one(&crossings) {
                let node = backend.node(crossing)?;

                // tactile_paving=yes on the node means both kerbs have it; =no
                // doesn't reliably mean neither does.
                if node.has_tag("tactile_paving", "yes") {
                    if let (Some(first), Some(last)) = (piece.first_node(), piece.last_node()) {
                        let mut ends = vec![first];
                        if last != first {
                            ends.push(last);
                        }
                        node_changes.push(NodeTagChange::new(ends, "tactile_paving", "yes"));
                    }
                }

                for key in COPIED_NODE_KEYS {
                    if let Some(value) = node.get(key) {
                        set(&mut changes, key, Some(value));
                    }
                }
            }

            let surface = agreed_surface(backend, piece.id, &crossings, &sidewalk)?;
            set(&mut changes, "surface", surface.as_deref());
            set(&mut changes, "smoothness", None);
        }

        segments.push(SegmentTagChange {
            way: piece.id,
            nodes: piece.nodes.clone(),
            kind,
            crossings,
            changes,
        });
    }

    Ok((segments, node_changes))
}

/// The `surface` all ways meeting at `crossings` agree on, if they do.
///
/// Pieces of the sidewalk itself don't get a say. A way without `surface`
/// counts as disagreeing with any way that has one.
fn agreed_surface<B: GraphBackend + ?Sized>(
    backend: &B,
    piece: WayId,
    crossings: &[NodeId],
    sidewalk: &HashSet<WayId>,
) -> Result<Option<String>> {
    let mut intersecting = BTreeSet::new();
    for &crossing in crossings {
        for parent in backend.parent_ways(crossing)? {
            if !sidewalk.contains(&parent) {
                intersecting.insert(parent);
            }
        }
    }

    let mut surfaces = BTreeSet::new();
    for way in &intersecting {
        surfaces.insert(backend.way(*way)?.get("surface").map(str::to_owned));
    }
    let picked = exactly_one(&surfaces).cloned().flatten();
    tracing::debug!(
        way = %piece,
        intersecting = ?intersecting,
        surfaces = ?surfaces,
        picked = ?picked,
        "Crossing surface"
    );
    Ok(picked)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TagMap;
    use crate::storage::MemoryBackend;
    use pretty_assertions::assert_eq;

    fn tagged(pairs: &[(&str, &str)]) -> TagMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn road(db: &MemoryBackend, through: NodeId, tags: &[(&str, &str)]) -> WayId {
        let a = db.create_node(TagMap::new());
        db.create_way(vec![a, through], tagged(tags)).unwrap()
    }

    #[test]
    fn sidewalk_piece() {
        let db = MemoryBackend::new();
        let nodes: Vec<NodeId> = (0..2).map(|_| db.create_node(TagMap::new())).collect();
        let w = db.create_way(nodes, TagMap::new()).unwrap();
        let piece = db.way(w).unwrap();

        let (segments, node_changes) = set_split_way_tags(&db, &[piece], &[]).unwrap();
        assert_eq!(segments[0].kind, SegmentKind::Sidewalk);
        assert_eq!(segments[0].changes.len(), 2);
        assert_eq!(segments[0].changes["footway"].as_deref(), Some("sidewalk"));
        assert!(node_changes.is_empty());
    }

    #[test]
    fn crossing_piece_copies_node_tags() {
        let db = MemoryBackend::new();
        let kerb_a = db.create_node(TagMap::new());
        let crossing = db.create_node(tagged(&[
            ("crossing", "marked"),
            ("crossing:island", "no"),
            ("tactile_paving", "yes"),
        ]));
        let kerb_b = db.create_node(TagMap::new());
        let w = db.create_way(vec![kerb_a, crossing, kerb_b], TagMap::new()).unwrap();
        road(&db, crossing, &[("highway", "residential"), ("surface", "asphalt")]);

        let piece = db.way(w).unwrap();
        let (segments, node_changes) = set_split_way_tags(&db, &[piece], &[crossing]).unwrap();

        let seg = &segments[0];
        assert_eq!(seg.kind, SegmentKind::Crossing);
        assert_eq!(seg.crossings, vec![crossing]);
        assert_eq!(seg.changes["footway"].as_deref(), Some("crossing"));
        assert_eq!(seg.changes["crossing"].as_deref(), Some("marked"));
        assert_eq!(seg.changes["crossing:island"].as_deref(), Some("no"));
        assert_eq!(seg.changes["surface"].as_deref(), Some("asphalt"));
        assert_eq!(seg.changes["smoothness"], None);

        assert_eq!(node_changes, vec![NodeTagChange::new(vec![kerb_a, kerb_b], "tactile_paving", "yes")]);
    }

    #[test]
    fn absent_node_tags_are_not_copied() {
        let db = MemoryBackend::new();
        let a = db.create_node(TagMap::new());
        let crossing = db.create_node(tagged(&[("tactile_paving", "no")]));
        let b = db.create_node(TagMap::new());
        let w = db.create_way(vec![a, crossing, b], TagMap::new()).unwrap();
        road(&db, crossing, &[("highway", "primary")]);

        let (segments, node_changes) =
            set_split_way_tags(&db, &[db.way(w).unwrap()], &[crossing]).unwrap();
        assert!(!segments[0].changes.contains_key("crossing"));
        assert!(!segments[0].changes.contains_key("crossing:island"));
        assert!(node_changes.is_empty());
    }

    #[test]
    fn road_without_surface_clears_it() {
        let db = MemoryBackend::new();
        let a = db.create_node(TagMap::new());
        let crossing = db.create_node(TagMap::new());
        let b = db.create_node(TagMap::new());
        let w = db.create_way(vec![a, crossing, b], TagMap::new()).unwrap();
        road(&db, crossing, &[("highway", "primary"), ("surface", "asphalt")]);
        road(&db, crossing, &[("highway", "primary")]);

        let (segments, _) = set_split_way_tags(&db, &[db.way(w).unwrap()], &[crossing]).unwrap();
        assert_eq!(segments[0].changes["surface"], None);
    }

    #[test]
    fn two_crossings_skip_node_copying() {
        let db = MemoryBackend::new();
        let a = db.create_node(TagMap::new());
        let c1 = db.create_node(tagged(&[("crossing", "marked"), ("tactile_paving", "yes")]));
        let c2 = db.create_node(tagged(&[("crossing", "uncontrolled")]));
        let b = db.create_node(TagMap::new());
        let w = db.create_way(vec![a, c1, c2, b], TagMap::new()).unwrap();
        road(&db, c1, &[("highway", "secondary"), ("surface", "paving_stones")]);
        road(&db, c2, &[("highway", "secondary"), ("surface", "paving_stones")]);

        let (segments, node_changes) =
            set_split_way_tags(&db, &[db.way(w).unwrap()], &[c1, c2]).unwrap();
        let seg = &segments[0];
        assert_eq!(seg.kind, SegmentKind::AmbiguousCrossing);
        assert_eq!(seg.changes["footway"].as_deref(), Some("crossing"));
        assert!(!seg.changes.contains_key("crossing"));
        assert_eq!(seg.changes["surface"].as_deref(), Some("paving_stones"));
        assert!(node_changes.is_empty());
    }
}
