//! # Crossing splitter
//!
//! Select a sidewalk way and every stretch of it that crosses or ends at a
//! roadway becomes its own `footway=crossing` way; the rest becomes
//! `footway=sidewalk`.
//!
//! The sidewalk has to share nodes with the roads it crosses. Intersections
//! that exist only geometrically are not found.
//!
//! ```text
//! selection ─▶ find_kerbs_around_intersections ─▶ SplitWay ─▶ set_split_way_tags ─▶ ChangeTags…
//!              (read only)                        └──────────── one Transaction ───────────────┘
//! ```

pub mod kerbs;
pub mod segment_tags;

use serde::{Deserialize, Serialize};

use crate::command::{ChangeTags, SplitWay};
use crate::config::CrossingConfig;
use crate::model::{PrimitiveId, Way, WayId};
use crate::storage::GraphBackend;
use crate::tx::{CommittedChange, Transaction};
use crate::util::exactly_one;
use crate::{Error, Result};

pub use kerbs::{find_kerbs_around_intersections, KerbPlan};
pub use segment_tags::{
    set_split_way_tags, NodeTagChange, SegmentKind, SegmentTagChange, COPIED_NODE_KEYS,
};

/// Which values for the `highway` key mean cars will be driving here?
pub const ROADWAYS: &[&str] = &[
    "motorway", "motorway_link",
    "trunk", "trunk_link",
    "primary", "primary_link",
    "secondary", "secondary_link",
    "tertiary", "tertiary_link",
    "unclassified", "residential", "living_street",
];

pub fn is_roadway(highway: Option<&str>) -> bool {
    highway.is_some_and(|h| ROADWAYS.contains(&h))
}

// ============================================================================
// Eligibility
// ============================================================================

/// Untagged for `highway`, or already a footway.
pub fn could_be_sidewalk(way: &Way) -> bool {
    !way.has_key("highway") || way.has_tag("highway", "footway")
}

/// Every selected primitive is a way that could be a sidewalk.
pub fn all_could_be_sidewalks<B: GraphBackend + ?Sized>(
    backend: &B,
    selection: &[PrimitiveId],
) -> Result<bool> {
    for primitive in selection {
        let Some(id) = primitive.as_way() else {
            return Ok(false);
        };
        if !could_be_sidewalk(&backend.way(id)?) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Whether `make_crossings` is offered for this selection.
pub fn is_enabled<B: GraphBackend + ?Sized>(backend: &B, selection: &[PrimitiveId]) -> bool {
    selection.len() == 1 && all_could_be_sidewalks(backend, selection).unwrap_or(false)
}

/// The one sidewalk way in `selection`.
pub fn selected_sidewalk<B: GraphBackend + ?Sized>(
    backend: &B,
    selection: &[PrimitiveId],
) -> Result<WayId> {
    let Some(only) = exactly_one(selection) else {
        return Err(Error::InvalidSelection(format!(
            "expected one way, got {} primitives",
            selection.len()
        )));
    };
    let Some(id) = only.as_way() else {
        return Err(Error::InvalidSelection(format!("{only} is not a way")));
    };
    if !could_be_sidewalk(&backend.way(id)?) {
        return Err(Error::InvalidSelection(format!("{id} is already a non-footway highway")));
    }
    Ok(id)
}

// ============================================================================
// SplitPlan
// ============================================================================

/// Everything `make_crossings` decided: where to cut and how to tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitPlan {
    pub kerbs: KerbPlan,
    /// One entry per resulting piece, in path order.
    pub segments: Vec<SegmentTagChange>,
    pub node_changes: Vec<NodeTagChange>,
}

impl SplitPlan {
    pub fn segment(&self, way: WayId) -> Option<&SegmentTagChange> {
        self.segments.iter().find(|s| s.way == way)
    }

    pub fn crossings(&self) -> impl Iterator<Item = &SegmentTagChange> {
        self.segments.iter().filter(|s| s.kind.is_crossing())
    }

    /// The tag edits as commands, node edits first, then one per piece.
    pub fn change_requests(&self) -> Vec<ChangeTags> {
        let nodes = self
            .node_changes
            .iter()
            .map(|c| ChangeTags::new(c.nodes.iter().copied(), c.changes.clone()));
        let ways = self
            .segments
            .iter()
            .map(|s| ChangeTags::new([s.way], s.changes.clone()));
        nodes.chain(ways).collect()
    }
}

/// Result of a successful `make_crossings`.
#[derive(Debug)]
pub struct MadeCrossings {
    pub plan: SplitPlan,
    /// Put this on the host's undo stack.
    pub change: CommittedChange,
}

// ============================================================================
// Operation
// ============================================================================

fn display_name(way: &Way) -> String {
    match way.get("name") {
        Some(name) => format!("{name} ({})", way.id),
        None => way.id.to_string(),
    }
}

/// Split the selected sidewalk into sidewalk and crossing pieces and tag them.
///
/// Runs as one transaction: if the split or any tag edit fails, the graph is
/// left exactly as it was and the error is returned.
pub fn make_crossings<B: GraphBackend + ?Sized>(
    backend: &B,
    selection: &[PrimitiveId],
    config: &CrossingConfig,
) -> Result<MadeCrossings> {
    let way_id = selected_sidewalk(backend, selection)?;
    let way = backend.way(way_id)?;
    let kerbs = find_kerbs_around_intersections(backend, &way)?;

    let mut tx = Transaction::begin(backend);
    let pieces: Vec<Way> = tx
        .execute(SplitWay::new(way_id, kerbs.kerbs.clone()))?
        .as_split_way()
        .map(|split| split.pieces().to_vec())
        .unwrap_or_default();

    let (segments, tactile) = set_split_way_tags(backend, &pieces, &kerbs.intersections)?;

    let mut node_changes = Vec::with_capacity(tactile.len() + 1);
    if config.mark_intersection_nodes && kerbs.has_intersections() {
        node_changes.push(NodeTagChange::new(kerbs.intersections.clone(), "highway", "crossing"));
    }
    node_changes.extend(tactile);

    let plan = SplitPlan { kerbs, segments, node_changes };
    for request in plan.change_requests() {
        tx.execute(request)?;
    }

    let change = tx.commit(format!("Make crossings along sidewalk {}", display_name(&way)))?;
    tracing::debug!(
        way = %way_id,
        pieces = plan.segments.len(),
        crossings = plan.crossings().count(),
        "Made crossings"
    );
    Ok(MadeCrossings { plan, change })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{NodeId, TagMap};
    use crate::storage::MemoryBackend;

    fn tagged(pairs: &[(&str, &str)]) -> TagMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn way_with(db: &MemoryBackend, tags: &[(&str, &str)]) -> WayId {
        let nodes: Vec<NodeId> = (0..3).map(|_| db.create_node(TagMap::new())).collect();
        db.create_way(nodes, tagged(tags)).unwrap()
    }

    #[test]
    fn roadway_set() {
        assert_eq!(ROADWAYS.len(), 13);
        assert!(is_roadway(Some("residential")));
        assert!(is_roadway(Some("motorway_link")));
        assert!(!is_roadway(Some("service")));
        assert!(!is_roadway(Some("footway")));
        assert!(!is_roadway(None));
    }

    #[test]
    fn eligibility() {
        let db = MemoryBackend::new();
        let untagged = way_with(&db, &[]);
        let footway = way_with(&db, &[("highway", "footway")]);
        let primary = way_with(&db, &[("highway", "primary")]);
        let path = way_with(&db, &[("highway", "path")]);
        let node = db.create_node(TagMap::new());

        assert!(is_enabled(&db, &[untagged.into()]));
        assert!(is_enabled(&db, &[footway.into()]));
        assert!(!is_enabled(&db, &[primary.into()]));
        assert!(!is_enabled(&db, &[path.into()]));
        assert!(!is_enabled(&db, &[node.into()]));
        assert!(!is_enabled(&db, &[]));
        assert!(!is_enabled(&db, &[untagged.into(), footway.into()]));

        // the predicate itself works for several ways
        assert!(all_could_be_sidewalks(&db, &[untagged.into(), footway.into()]).unwrap());
        assert!(!all_could_be_sidewalks(&db, &[untagged.into(), primary.into()]).unwrap());
    }

    #[test]
    fn selection_errors() {
        let db = MemoryBackend::new();
        let primary = way_with(&db, &[("highway", "primary")]);
        let node = db.create_node(TagMap::new());

        let selections: [Vec<PrimitiveId>; 3] = [vec![], vec![primary.into()], vec![node.into()]];
        for selection in selections {
            assert!(matches!(
                selected_sidewalk(&db, &selection),
                Err(Error::InvalidSelection(_))
            ));
        }
        assert!(matches!(
            selected_sidewalk(&db, &[WayId(999).into()]),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn display_name_prefers_name_tag() {
        let named = Way::new(WayId(3), []).with_tag("name", "Main Street");
        assert_eq!(display_name(&named), "Main Street (w3)");
        assert_eq!(display_name(&Way::new(WayId(4), [])), "w4");
    }
}
