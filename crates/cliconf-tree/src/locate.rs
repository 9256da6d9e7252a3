//! Node locator
//!
//! Resolves a [`KeyPath`] against a document tree. Absent nodes and nodes of
//! an unexpected kind both resolve to `None`: the document is shared with other
//! tool generations, so foreign data is tolerated and never overwritten here.
//! A bare key with no value (`contexts:`) counts as absent.

use crate::node::{Mapping, Node, NodeKind, Scalar};
use crate::path::KeyPath;

/// Resolve `path` without creating anything
#[must_use]
pub fn locate<'a>(root: &'a Node, path: &KeyPath) -> Option<&'a Node> {
    let mut current = root;
    for step in path.steps() {
        let child = current.as_mapping()?.get(step.name())?;
        if is_vacant(child, step.kind()) {
            return None;
        }
        if child.kind() != step.kind() {
            tracing::warn!(
                path = %path,
                step = step.name(),
                expected = %step.kind(),
                found = %child.kind(),
                "ignoring node of unexpected kind"
            );
            return None;
        }
        current = child;
    }
    Some(current)
}

/// Resolve `path` mutably
///
/// With `create`, absent or vacant steps are created as empty nodes of their
/// declared kind and linked in. A step whose existing node has a different
/// kind still yields `None`.
pub fn locate_mut<'a>(root: &'a mut Node, path: &KeyPath, create: bool) -> Option<&'a mut Node> {
    let mut current = root;
    for step in path.steps() {
        let map = current.as_mapping_mut()?;
        let occupied = map
            .get(step.name())
            .is_some_and(|child| !is_vacant(child, step.kind()));
        if !occupied {
            if !create {
                return None;
            }
            map.insert(step.name(), Node::empty(step.kind()));
        }
        let child = map.get_mut(step.name())?;
        if child.kind() != step.kind() {
            tracing::warn!(
                path = %path,
                step = step.name(),
                expected = %step.kind(),
                found = %child.kind(),
                "refusing to descend into node of unexpected kind"
            );
            return None;
        }
        current = child;
    }
    Some(current)
}

/// Untagged null where a collection is expected
fn is_vacant(child: &Node, expected: NodeKind) -> bool {
    expected != NodeKind::Scalar
        && child
            .as_scalar()
            .is_some_and(|s| s.is_null() && s.tag().is_none())
}

/// Index of the entity named `name` within a sequence
#[must_use]
pub fn find_entity(items: &[Node], name: &str) -> Option<usize> {
    items.iter().position(|item| item.entity_name() == Some(name))
}

/// Read a non-null scalar value at `path`
#[must_use]
pub fn get_scalar<'a>(root: &'a Node, path: &KeyPath) -> Option<&'a str> {
    locate(root, path)?.as_str()
}

/// Write a string scalar at `path`, creating parents
///
/// Returns `true` if the tree changed; an equal string value is left untouched.
/// Returns `false` without writing if a parent has an unexpected kind.
pub fn set_scalar(root: &mut Node, path: &KeyPath, value: &str) -> bool {
    let Some((parent_path, leaf)) = split_leaf(path) else {
        return false;
    };
    let Some(parent) = locate_mut(root, &parent_path, true).and_then(Node::as_mapping_mut) else {
        return false;
    };

    if let Some(existing) = parent.get(leaf) {
        if let Some(scalar) = existing.as_scalar() {
            if !scalar.is_null() && scalar.as_str() == value {
                return false;
            }
        }
    }
    parent.insert(leaf, Node::Scalar(Scalar::string(value)));
    true
}

/// Remove the key addressed by `path`
///
/// Returns `true` if a key was removed.
pub fn remove_key(root: &mut Node, path: &KeyPath) -> bool {
    let Some((parent_path, leaf)) = split_leaf(path) else {
        return false;
    };
    locate_mut(root, &parent_path, false)
        .and_then(Node::as_mapping_mut)
        .and_then(|map| map.remove(leaf))
        .is_some()
}

/// Remove empty mappings left behind along `path`, deepest first
///
/// Returns `true` if anything was pruned.
pub fn prune_empty(root: &mut Node, path: &KeyPath) -> bool {
    let mut pruned = false;
    let mut current = Some(path.clone());
    while let Some(p) = current {
        if p.is_empty() {
            break;
        }
        let is_empty = locate(root, &p).is_some_and(Node::is_empty_value);
        if !is_empty {
            break;
        }
        pruned |= remove_key(root, &p);
        current = p.parent();
    }
    pruned
}

fn split_leaf(path: &KeyPath) -> Option<(KeyPath, &str)> {
    let leaf = path.last()?.name();
    let parent = path.parent()?;
    Some((retype_as_mappings(parent), leaf))
}

fn retype_as_mappings(path: KeyPath) -> KeyPath {
    KeyPath::new(
        path.steps()
            .iter()
            .map(|s| crate::path::PathStep::new(s.name(), NodeKind::Mapping))
            .collect(),
    )
}

/// Collect entity names of a sequence in document order
#[must_use]
pub fn entity_names(items: &[Node]) -> Vec<&str> {
    items.iter().filter_map(Node::entity_name).collect()
}

/// Borrow the mapping at `path`, if present and of the right kind
#[must_use]
pub fn locate_mapping<'a>(root: &'a Node, path: &KeyPath) -> Option<&'a Mapping> {
    locate(root, path)?.as_mapping()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Node {
        Node::parse_document(text).unwrap()
    }

    #[test]
    fn locate_existing_collection() {
        let root = doc("contexts:\n- name: a\n- name: b\n");
        let path = KeyPath::collection("contexts").unwrap();
        let seq = locate(&root, &path).unwrap().as_sequence().unwrap();
        assert_eq!(entity_names(seq), vec!["a", "b"]);
    }

    #[test]
    fn locate_missing_is_none() {
        let root = doc("servers: []\n");
        let path = KeyPath::collection("contexts").unwrap();
        assert!(locate(&root, &path).is_none());
    }

    #[test]
    fn locate_kind_mismatch_is_none() {
        let root = doc("contexts: not-a-list\n");
        let path = KeyPath::collection("contexts").unwrap();
        assert!(locate(&root, &path).is_none());
    }

    #[test]
    fn locate_mut_creates_nested() {
        let mut root = Node::mapping();
        let path = KeyPath::collection("clientOptions.cli.essentials").unwrap();
        let seq = locate_mut(&mut root, &path, true).unwrap();
        assert_eq!(seq.kind(), NodeKind::Sequence);

        let cli = locate(&root, &KeyPath::mapping("clientOptions.cli").unwrap()).unwrap();
        assert!(cli.as_mapping().unwrap().contains_key("essentials"));
    }

    #[test]
    fn locate_mut_without_create_is_none() {
        let mut root = Node::mapping();
        let path = KeyPath::collection("contexts").unwrap();
        assert!(locate_mut(&mut root, &path, false).is_none());
        assert_eq!(root, Node::mapping());
    }

    #[test]
    fn locate_mut_does_not_overwrite_foreign_data() {
        let mut root = doc("clientOptions: 42\n");
        let path = KeyPath::collection("clientOptions.cli.essentials").unwrap();
        assert!(locate_mut(&mut root, &path, true).is_none());
        assert_eq!(root, doc("clientOptions: 42\n"));
    }

    #[test]
    fn bare_keys_are_filled_in() {
        let mut root = doc("contexts:\ncurrentContext:\n");
        let path = KeyPath::collection("contexts").unwrap();
        assert!(locate(&root, &path).is_none());
        assert!(locate_mut(&mut root, &path, false).is_none());

        let seq = locate_mut(&mut root, &path, true).unwrap();
        assert_eq!(seq.kind(), NodeKind::Sequence);

        let pointer = KeyPath::scalar("currentContext.kubernetes").unwrap();
        assert!(set_scalar(&mut root, &pointer, "dev"));
        assert_eq!(get_scalar(&root, &pointer), Some("dev"));

        let keys: Vec<_> = root.as_mapping().unwrap().keys().collect();
        assert_eq!(keys, vec!["contexts", "currentContext"]);
    }

    #[test]
    fn tagged_null_is_not_vacant() {
        let mut root = doc("contexts: !Legacy ~\n");
        let path = KeyPath::collection("contexts").unwrap();
        assert!(locate_mut(&mut root, &path, true).is_none());
        assert_eq!(root, doc("contexts: !Legacy ~\n"));
    }

    #[test]
    fn tagged_collection_is_located() {
        let root = doc("contexts: !Legacy\n- name: a\n");
        let path = KeyPath::collection("contexts").unwrap();
        let seq = locate(&root, &path).unwrap().as_sequence().unwrap();
        assert_eq!(entity_names(seq), vec!["a"]);
    }

    #[test]
    fn find_entity_by_name() {
        let root = doc("contexts:\n- name: a\n- other: x\n- name: b\n");
        let seq = root.as_mapping().unwrap().get("contexts").unwrap().as_sequence().unwrap();
        assert_eq!(find_entity(seq, "b"), Some(2));
        assert_eq!(find_entity(seq, "missing"), None);
    }

    #[test]
    fn set_scalar_reports_change() {
        let mut root = Node::mapping();
        let path = KeyPath::scalar("currentContext.kubernetes").unwrap();

        assert!(set_scalar(&mut root, &path, "ctx"));
        assert!(!set_scalar(&mut root, &path, "ctx"));
        assert_eq!(get_scalar(&root, &path), Some("ctx"));
        assert!(set_scalar(&mut root, &path, "other"));
        assert_eq!(get_scalar(&root, &path), Some("other"));
    }

    #[test]
    fn remove_key_and_prune() {
        let mut root = Node::mapping();
        let path = KeyPath::scalar("clientOptions.env.FOO").unwrap();
        set_scalar(&mut root, &path, "bar");

        assert!(remove_key(&mut root, &path));
        assert!(!remove_key(&mut root, &path));
        assert!(prune_empty(&mut root, &path.parent().unwrap()));
        assert_eq!(root, Node::mapping());
    }
}
