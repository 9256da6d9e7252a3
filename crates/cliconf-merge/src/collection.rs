//! Entity collections
//!
//! Insert-or-update and removal of named entities within a sequence, driven by
//! the merge engine.

use crate::merge::merge_node;
use crate::strategy::StrategyTable;
use cliconf_tree::{find_entity, Node};

/// Insert `candidate` into `collection`, or reconcile it with the existing
/// entity of the same name
///
/// `path` is the dotted collection path used for strategy lookup.
///
/// # Errors
/// Returns error if `candidate` is not a mapping with a non-empty name
pub fn upsert_entity(
    collection: &mut Vec<Node>,
    candidate: Node,
    path: &str,
    table: &StrategyTable,
) -> Result<bool, MergeError> {
    let name = candidate
        .entity_name()
        .ok_or_else(|| MergeError::MissingName(path.to_string()))?
        .to_string();

    match find_entity(collection, &name) {
        Some(idx) => {
            let changed = merge_node(&mut collection[idx], candidate, path, table);
            tracing::trace!(path, name = %name, changed, "reconciled existing entity");
            Ok(changed)
        }
        None => {
            collection.push(candidate);
            tracing::trace!(path, name = %name, "appended new entity");
            Ok(true)
        }
    }
}

/// Remove every entity named `name`
///
/// Returns `true` if anything was removed.
pub fn remove_entity(collection: &mut Vec<Node>, name: &str) -> bool {
    let before = collection.len();
    collection.retain(|item| item.entity_name() != Some(name));
    collection.len() != before
}

/// Collection errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MergeError {
    /// Candidate lacks a usable `name`
    #[error("entity for '{0}' must be a mapping with a non-empty name")]
    MissingName(String),
}
