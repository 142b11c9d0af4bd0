//! Tags on nodes and ways, and edits to them.

use std::collections::{BTreeMap, HashMap};

/// A map of tag keys to values.
pub type TagMap = HashMap<String, String>;

/// Requested tag edits. `None` removes the key.
///
/// Ordered so that edits apply (and log) deterministically.
pub type TagChanges = BTreeMap<String, Option<String>>;

/// Build a `TagChanges` from `(key, value)` pairs.
pub fn changes<K, V>(pairs: impl IntoIterator<Item = (K, Option<V>)>) -> TagChanges
where
    K: Into<String>,
    V: Into<String>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.map(Into::into)))
        .collect()
}

/// Apply `changes` to `tags`, returning the previous value of every touched key.
///
/// Feeding the returned map back into `apply_changes` restores the original tags.
pub fn apply_changes(tags: &mut TagMap, changes: &TagChanges) -> TagChanges {
    let mut previous = TagChanges::new();
    for (key, value) in changes {
        let old = match value {
            Some(v) => tags.insert(key.clone(), v.clone()),
            None => tags.remove(key),
        };
        previous.insert(key.clone(), old);
    }
    previous
}
