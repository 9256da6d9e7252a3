//! Patch-merge engine
//!
//! Reconciles a freshly encoded candidate subtree with the subtree already in
//! the document. Unknown fields in the existing subtree are kept, and values
//! that did not change are left untouched so their formatting survives.

use crate::strategy::StrategyTable;
use cliconf_tree::{find_entity, Mapping, Node, Scalar};

/// Outcome of [`reconcile`]
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    /// Updated subtree
    pub node: Node,

    /// Whether any value differs from the existing subtree
    pub changed: bool,
}

/// Reconcile `candidate` against an optional existing subtree at `path`
#[must_use]
pub fn reconcile(
    candidate: Node,
    existing: Option<Node>,
    path: &str,
    table: &StrategyTable,
) -> Reconciled {
    match existing {
        None => Reconciled {
            node: candidate,
            changed: true,
        },
        Some(mut node) => {
            let changed = merge_node(&mut node, candidate, path, table);
            Reconciled { node, changed }
        }
    }
}

/// Merge `candidate` into `existing` in place
///
/// Returns `true` if `existing` was modified.
pub fn merge_node(existing: &mut Node, candidate: Node, path: &str, table: &StrategyTable) -> bool {
    if table.select(path).is_replace() {
        return replace(existing, candidate);
    }

    match (existing, candidate) {
        // an untagged candidate edits the contents and the foreign tag stays
        (Node::Tagged(e), candidate)
            if candidate.tag().is_none() && e.node().kind() == candidate.kind() =>
        {
            merge_node(e.node_mut(), candidate, path, table)
        }
        (Node::Scalar(e), Node::Scalar(c)) => merge_scalar(e, c),
        (Node::Mapping(e), Node::Mapping(c)) => merge_mapping(e, c, path, table),
        (Node::Sequence(e), Node::Sequence(c)) => merge_sequence(e, c, path, table),
        (existing, candidate) => {
            tracing::debug!(
                path,
                existing = %existing.kind(),
                candidate = %candidate.kind(),
                "kind changed, replacing subtree"
            );
            replace(existing, candidate)
        }
    }
}

fn replace(existing: &mut Node, candidate: Node) -> bool {
    if *existing == candidate {
        return false;
    }
    *existing = candidate;
    true
}

fn merge_scalar(existing: &mut Scalar, candidate: Scalar) -> bool {
    if *existing == candidate {
        return false;
    }
    *existing = candidate;
    true
}

fn merge_mapping(
    existing: &mut Mapping,
    candidate: Mapping,
    path: &str,
    table: &StrategyTable,
) -> bool {
    let mut changed = false;
    for (key, value) in candidate {
        let child_path = join(path, key.as_str());
        match existing.get_mut(key.as_str()) {
            Some(slot) => changed |= merge_node(slot, value, &child_path, table),
            None => {
                existing.insert(key, value);
                changed = true;
            }
        }
    }
    changed
}

fn merge_sequence(
    existing: &mut Vec<Node>,
    candidate: Vec<Node>,
    path: &str,
    table: &StrategyTable,
) -> bool {
    if !is_entity_sequence(existing) || !is_entity_sequence(&candidate) {
        if *existing == candidate {
            return false;
        }
        *existing = candidate;
        return true;
    }

    let mut changed = false;
    for item in candidate {
        // is_entity_sequence guarantees a name
        let Some(name) = item.entity_name().map(str::to_owned) else {
            continue;
        };
        match find_entity(existing, &name) {
            Some(idx) => changed |= merge_node(&mut existing[idx], item, path, table),
            None => {
                existing.push(item);
                changed = true;
            }
        }
    }
    changed
}

/// Every item is a mapping bearing a non-empty `name`
///
/// An empty sequence qualifies, so an empty candidate merges as a no-op.
fn is_entity_sequence(items: &[Node]) -> bool {
    items.iter().all(|item| item.entity_name().is_some())
}

fn join(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{path}.{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategy::PatchStrategy;
    use pretty_assertions::assert_eq;

    fn yaml(text: &str) -> Node {
        Node::parse_document(text).unwrap()
    }

    #[test]
    fn reconcile_absent_appends_verbatim() {
        let candidate = yaml("name: a\nx: 1\n");
        let out = reconcile(candidate.clone(), None, "contexts", &StrategyTable::new());
        assert!(out.changed);
        assert_eq!(out.node, candidate);
    }

    #[test]
    fn merge_keeps_existing_only_keys() {
        let existing = yaml("name: e\na: 1\nb: 2\n");
        let out = reconcile(
            yaml("name: e\na: 1\nc: 3\n"),
            Some(existing),
            "contexts",
            &StrategyTable::new(),
        );
        assert!(out.changed);
        assert_eq!(out.node, yaml("name: e\na: 1\nb: 2\nc: 3\n"));
    }

    #[test]
    fn replace_drops_existing_only_keys() {
        let table = StrategyTable::new().with("contexts", PatchStrategy::Replace);
        let out = reconcile(
            yaml("name: e\na: 1\nc: 3\n"),
            Some(yaml("name: e\na: 1\nb: 2\n")),
            "contexts",
            &table,
        );
        assert!(out.changed);
        assert_eq!(out.node, yaml("name: e\na: 1\nc: 3\n"));
    }

    #[test]
    fn replace_on_nested_field() {
        let table = StrategyTable::new().with("contexts.clusterOpts", PatchStrategy::Replace);
        let existing = yaml("name: e\nclusterOpts:\n  endpoint: old\n  path: /kube\nextra: keep\n");
        let out = reconcile(
            yaml("name: e\nclusterOpts:\n  endpoint: new\n"),
            Some(existing),
            "contexts",
            &table,
        );
        assert_eq!(
            out.node,
            yaml("name: e\nclusterOpts:\n  endpoint: new\nextra: keep\n")
        );
    }

    #[test]
    fn identical_candidate_is_unchanged() {
        let existing = yaml("name: e\nport: 8080\nlabels: [a, b]\nnested:\n  k: v\n");
        let out = reconcile(existing.clone(), Some(existing.clone()), "x", &StrategyTable::new());
        assert!(!out.changed);
        assert_eq!(out.node, existing);
    }

    #[test]
    fn subset_candidate_is_unchanged() {
        let existing = yaml("name: e\na: 1\nunknown: keep\n");
        let out = reconcile(yaml("name: e\na: 1\n"), Some(existing.clone()), "x", &StrategyTable::new());
        assert!(!out.changed);
        assert_eq!(out.node, existing);
    }

    #[test]
    fn scalar_sequences_replace_wholesale() {
        let out = reconcile(
            yaml("name: e\nplugins: [c]\n"),
            Some(yaml("name: e\nplugins: [a, b]\n")),
            "groups",
            &StrategyTable::new(),
        );
        assert!(out.changed);
        assert_eq!(out.node, yaml("name: e\nplugins: [c]\n"));
    }

    #[test]
    fn entity_sequences_merge_by_name() {
        let existing = yaml(
            "name: e\nsources:\n- name: one\n  image: a\n  keep: true\n- name: two\n  image: b\n",
        );
        let candidate = yaml("name: e\nsources:\n- name: three\n  image: c\n- name: one\n  image: z\n");
        let out = reconcile(candidate, Some(existing), "contexts", &StrategyTable::new());

        assert!(out.changed);
        assert_eq!(
            out.node,
            yaml(
                "name: e\nsources:\n- name: one\n  image: z\n  keep: true\n- name: two\n  image: b\n- name: three\n  image: c\n"
            )
        );
    }

    #[test]
    fn entity_sequence_replace_strategy() {
        let table = StrategyTable::new().with("contexts.sources", PatchStrategy::Replace);
        let existing = yaml("name: e\nsources:\n- name: one\n- name: two\n");
        let out = reconcile(
            yaml("name: e\nsources:\n- name: three\n"),
            Some(existing),
            "contexts",
            &table,
        );
        assert_eq!(out.node, yaml("name: e\nsources:\n- name: three\n"));
    }

    #[test]
    fn kind_mismatch_replaces() {
        let out = reconcile(
            yaml("name: e\nopts:\n  k: v\n"),
            Some(yaml("name: e\nopts: legacy-string\n")),
            "x",
            &StrategyTable::new(),
        );
        assert!(out.changed);
        assert_eq!(out.node, yaml("name: e\nopts:\n  k: v\n"));
    }

    #[test]
    fn scalar_kind_change_is_a_change() {
        let mut existing = yaml("port: '8080'\n");
        let changed = merge_node(&mut existing, yaml("port: 8080\n"), "", &StrategyTable::new());
        assert!(changed);
    }

    #[test]
    fn merge_into_tagged_mapping_keeps_tag() {
        let mut existing = yaml("name: e\nopts: !Ext {a: 1}\n");
        let changed = merge_node(&mut existing, yaml("name: e\nopts:\n  b: 2\n"), "", &StrategyTable::new());
        assert!(changed);

        let opts = existing.as_mapping().unwrap().get("opts").unwrap();
        assert_eq!(opts.tag(), Some("Ext"));
        let keys: Vec<_> = opts.as_mapping().unwrap().keys().collect();
        assert_eq!(keys, vec!["a", "b"]);

        let again = merge_node(&mut existing, yaml("name: e\nopts:\n  b: 2\n"), "", &StrategyTable::new());
        assert!(!again);
    }

    #[test]
    fn merge_preserves_key_order() {
        let mut existing = yaml("z: 1\nname: e\na: 2\n");
        merge_node(&mut existing, yaml("a: 3\nname: e\nnew: 4\n"), "", &StrategyTable::new());
        let keys: Vec<_> = existing.as_mapping().unwrap().keys().collect();
        assert_eq!(keys, vec!["z", "name", "a", "new"]);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn arb_tree() -> impl Strategy<Value = Node> {
        let leaf = "[a-z0-9]{0,6}".prop_map(Node::string);
        leaf.prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Node::Sequence),
                prop::collection::btree_map("[a-c]", inner, 0..4).prop_map(|entries| {
                    Node::Mapping(
                        entries
                            .into_iter()
                            .map(|(k, v)| (Scalar::string(k), v))
                            .collect(),
                    )
                }),
            ]
        })
    }

    proptest! {
        #[test]
        fn self_merge_is_noop(tree in arb_tree()) {
            let mut existing = tree.clone();
            let changed = merge_node(&mut existing, tree.clone(), "", &StrategyTable::new());
            prop_assert!(!changed);
            prop_assert_eq!(existing, tree);
        }

        #[test]
        fn merge_is_idempotent(existing in arb_tree(), candidate in arb_tree()) {
            let table = StrategyTable::new();
            let mut once = existing;
            merge_node(&mut once, candidate.clone(), "", &table);

            let mut twice = once.clone();
            let changed = merge_node(&mut twice, candidate, "", &table);
            prop_assert!(!changed);
            prop_assert_eq!(once, twice);
        }
    }
}
