//! Cut a way into consecutive pieces.

use std::fmt;

use crate::model::{NodeId, Way, WayId};
use crate::storage::{revert_split, GraphBackend};
use crate::{Error, Result};

/// Split `way` at `split_nodes`, delegating the cut to `GraphBackend::split_way`.
#[derive(Debug, Clone)]
pub struct SplitWay {
    way: WayId,
    split_nodes: Vec<NodeId>,
    outcome: Option<SplitOutcome>,
    applied: bool,
}

#[derive(Debug, Clone)]
struct SplitOutcome {
    original_nodes: Vec<NodeId>,
    pieces: Vec<Way>,
}

impl SplitWay {
    pub fn new(way: WayId, split_nodes: Vec<NodeId>) -> Self {
        Self { way, split_nodes, outcome: None, applied: false }
    }

    /// Resulting ways in path order. Empty until executed.
    pub fn pieces(&self) -> &[Way] {
        self.outcome.as_ref().map_or(&[], |o| o.pieces.as_slice())
    }

    /// Ways created by the split, i.e. every piece but the original.
    pub fn new_ways(&self) -> impl Iterator<Item = &Way> {
        self.pieces().iter().filter(move |w| w.id != self.way)
    }

    pub fn execute<B: GraphBackend + ?Sized>(&mut self, backend: &B) -> Result<()> {
        if self.applied {
            return Err(Error::CommandFailed(format!("{self} already executed")));
        }
        match &self.outcome {
            None => {
                let original_nodes = backend.way_nodes(self.way)?;
                let pieces = backend.split_way(self.way, &self.split_nodes)?;
                tracing::debug!(way = %self.way, pieces = pieces.len(), "Split way");
                self.outcome = Some(SplitOutcome { original_nodes, pieces });
            }
            Some(outcome) => {
                // Redo: bring back the exact same pieces.
                let first = outcome.pieces.first()
                    .ok_or_else(|| Error::CommandFailed(format!("{self} has no pieces")))?;
                let current = backend.set_way_nodes(self.way, first.nodes.clone())?;
                let mut inserted = Vec::new();
                for piece in outcome.pieces.iter().filter(|w| w.id != self.way) {
                    if let Err(e) = backend.insert_way(piece.clone()) {
                        revert_split(backend, self.way, &inserted, current);
                        return Err(e);
                    }
                    inserted.push(piece.id);
                }
            }
        }
        self.applied = true;
        Ok(())
    }

    pub fn undo<B: GraphBackend + ?Sized>(&mut self, backend: &B) -> Result<()> {
        let Some(outcome) = &self.outcome else {
            return Ok(());
        };
        if !self.applied {
            return Ok(());
        }
        let mut removed = Vec::new();
        for piece in outcome.pieces.iter().rev().filter(|w| w.id != self.way) {
            match backend.delete_way(piece.id) {
                Ok(way) => removed.push(way),
                Err(e) => {
                    reinsert(backend, removed);
                    return Err(e);
                }
            }
        }
        if let Err(e) = backend.set_way_nodes(self.way, outcome.original_nodes.clone()) {
            reinsert(backend, removed);
            return Err(e);
        }
        self.applied = false;
        Ok(())
    }
}

/// Put back pieces taken out by a failed undo, in the reverse order they
/// were removed.
fn reinsert<B: GraphBackend + ?Sized>(backend: &B, removed: Vec<Way>) {
    for way in removed.into_iter().rev() {
        let id = way.id;
        if let Err(e) = backend.insert_way(way) {
            tracing::error!(way = %id, error = %e, "Could not restore split piece");
        }
    }
}

impl fmt::Display for SplitWay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "split way {} at {} node(s)", self.way, self.split_nodes.len())
    }
}
