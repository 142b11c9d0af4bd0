//! Set or remove tags on a group of primitives.

use std::fmt;

use crate::model::{PrimitiveId, TagChanges};
use crate::storage::GraphBackend;
use crate::{Error, Result};

/// The same tag edits applied to every target.
#[derive(Debug, Clone)]
pub struct ChangeTags {
    targets: Vec<PrimitiveId>,
    changes: TagChanges,
    /// Previous values per target, in application order. Empty unless executed.
    previous: Vec<(PrimitiveId, TagChanges)>,
}

impl ChangeTags {
    pub fn new(targets: impl IntoIterator<Item = impl Into<PrimitiveId>>, changes: TagChanges) -> Self {
        Self {
            targets: targets.into_iter().map(Into::into).collect(),
            changes,
            previous: Vec::new(),
        }
    }

    pub fn is_executed(&self) -> bool {
        !self.previous.is_empty()
    }

    /// Apply the edits. If one target fails, the targets already changed are
    /// restored before the error is returned.
    pub fn execute<B: GraphBackend + ?Sized>(&mut self, backend: &B) -> Result<()> {
        if self.is_executed() {
            return Err(Error::CommandFailed(format!("{self} already executed")));
        }
        for i in 0..self.targets.len() {
            let target = self.targets[i];
            match backend.set_tags(target, &self.changes) {
                Ok(prev) => self.previous.push((target, prev)),
                Err(e) => {
                    self.restore(backend);
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Put the previous values back, last target first. If one target fails,
    /// the targets already reverted get the new values again, so the command
    /// stays executed.
    pub fn undo<B: GraphBackend + ?Sized>(&mut self, backend: &B) -> Result<()> {
        let mut reverted = Vec::with_capacity(self.previous.len());
        for (target, prev) in self.previous.iter().rev() {
            match backend.set_tags(*target, prev) {
                Ok(applied) => reverted.push((*target, applied)),
                Err(e) => {
                    for (target, applied) in reverted.iter().rev() {
                        if let Err(e) = backend.set_tags(*target, applied) {
                            tracing::error!(primitive = %target, error = %e, "Could not reapply tags");
                        }
                    }
                    return Err(e);
                }
            }
        }
        self.previous.clear();
        Ok(())
    }

    fn restore<B: GraphBackend + ?Sized>(&mut self, backend: &B) {
        while let Some((target, prev)) = self.previous.pop() {
            if let Err(e) = backend.set_tags(target, &prev) {
                tracing::error!(primitive = %target, error = %e, "Could not restore tags");
            }
        }
    }
}

impl fmt::Display for ChangeTags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let edits: Vec<String> = self
            .changes
            .iter()
            .map(|(k, v)| match v {
                Some(v) => format!("{k}={v}"),
                None => format!("-{k}"),
            })
            .collect();
        write!(f, "change tags [{}] on {} primitive(s)", edits.join(", "), self.targets.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{changes, TagMap};
    use crate::storage::MemoryBackend;

    #[test]
    fn execute_and_undo() {
        let db = MemoryBackend::new();
        let mut tags = TagMap::new();
        tags.insert("smoothness".into(), "good".into());
        let a = db.create_node(tags);
        let b = db.create_node(TagMap::new());

        let mut cmd = ChangeTags::new(
            [a, b],
            changes([("tactile_paving", Some("yes")), ("smoothness", None)]),
        );
        cmd.execute(&db).unwrap();
        assert!(db.has_tag(a.into(), "tactile_paving", "yes").unwrap());
        assert!(!db.has_key(a.into(), "smoothness").unwrap());

        cmd.undo(&db).unwrap();
        assert!(db.has_tag(a.into(), "smoothness", "good").unwrap());
        assert!(!db.has_key(b.into(), "tactile_paving").unwrap());
    }

    #[test]
    fn failing_target_restores_earlier_ones() {
        let db = MemoryBackend::new();
        let a = db.create_node(TagMap::new());
        let missing = crate::model::NodeId(999);

        let mut cmd = ChangeTags::new([a, missing], changes([("highway", Some("crossing"))]));
        assert!(cmd.execute(&db).is_err());
        assert!(!db.has_key(a.into(), "highway").unwrap());
        assert!(!cmd.is_executed());
    }

    #[test]
    fn display_lists_edits() {
        let cmd = ChangeTags::new(
            [crate::model::WayId(1)],
            changes([("footway", Some("crossing")), ("smoothness", None)]),
        );
        assert_eq!(cmd.to_string(), "change tags [footway=crossing, -smoothness] on 1 primitive(s)");
    }
}
