//! Current-selection pointers
//!
//! `currentContext` is a mapping keyed by target whose values name contexts;
//! `currentServer` is a single scalar naming a legacy server. A pointer that
//! names a missing entity reads as absent. Pointers are read and written under
//! the canonical target name only; alias keys such as `k8s` are left alone.

use crate::entity::{contains, find};
use crate::error::{ConfigError, Result};
use crate::types::{Context, Server, Target};
use cliconf_tree::{get_scalar, KeyPath, Node, NodeKind};
use std::collections::BTreeMap;

/// Root key of the per-target context pointers
pub const CURRENT_CONTEXT_KEY: &str = "currentContext";

/// Root key of the legacy server pointer
pub const CURRENT_SERVER_KEY: &str = "currentServer";

/// Path of the context pointer for `target`
#[must_use]
pub fn current_context_path(target: Target) -> KeyPath {
    KeyPath::of(&[CURRENT_CONTEXT_KEY, target.as_str()], NodeKind::Scalar)
}

/// Path of the legacy server pointer
#[must_use]
pub fn current_server_path() -> KeyPath {
    KeyPath::of(&[CURRENT_SERVER_KEY], NodeKind::Scalar)
}

/// Context selected for `target`
pub(crate) fn current_context(root: &Node, target: Target) -> Result<Context> {
    let not_found = || ConfigError::not_found("current context", target.as_str());
    let name = get_scalar(root, &current_context_path(target)).ok_or_else(not_found)?;
    find(root, name).map_err(|e| if e.is_not_found() { not_found() } else { e })
}

/// Every selected context, keyed by target
///
/// Targets without a usable pointer are skipped.
pub(crate) fn current_contexts(root: &Node) -> Result<BTreeMap<Target, Context>> {
    let mut out = BTreeMap::new();
    for target in Target::ALL {
        match current_context(root, target) {
            Ok(ctx) => {
                out.insert(target, ctx);
            }
            Err(e) if e.is_not_found() => {
                tracing::debug!(%target, "no usable context pointer");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(out)
}

/// Targets whose pointer names `name`
pub(crate) fn targets_selecting(root: &Node, name: &str) -> Vec<Target> {
    Target::ALL
        .into_iter()
        .filter(|t| get_scalar(root, &current_context_path(*t)) == Some(name))
        .collect()
}

/// Selected legacy server
pub(crate) fn current_server(root: &Node) -> Result<Server> {
    let not_found = || ConfigError::not_found("current server", CURRENT_SERVER_KEY);
    let name = get_scalar(root, &current_server_path()).ok_or_else(not_found)?;
    if !contains::<Server>(root, name) {
        return Err(not_found());
    }
    find(root, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> Node {
        Node::parse_document(text).unwrap()
    }

    #[test]
    fn pointer_paths() {
        assert_eq!(
            current_context_path(Target::MissionControl).dotted(),
            "currentContext.mission-control"
        );
        assert_eq!(current_server_path().dotted(), "currentServer");
    }

    #[test]
    fn current_context_resolves() {
        let root = doc("contexts:\n- name: dev\n  target: kubernetes\ncurrentContext:\n  kubernetes: dev\n");
        assert_eq!(current_context(&root, Target::Kubernetes).unwrap().name, "dev");
        assert!(current_context(&root, Target::MissionControl).unwrap_err().is_not_found());
    }

    #[test]
    fn dangling_pointer_is_not_found() {
        let root = doc("currentContext:\n  kubernetes: gone\ncurrentServer: gone\n");
        assert!(current_context(&root, Target::Kubernetes).unwrap_err().is_not_found());
        assert!(current_server(&root).unwrap_err().is_not_found());
        assert!(current_contexts(&root).unwrap().is_empty());
    }

    #[test]
    fn current_contexts_skips_unknown_targets() {
        let root = doc(
            "contexts:\n- name: a\n  target: kubernetes\n- name: b\n  target: mission-control\ncurrentContext:\n  kubernetes: a\n  mission-control: b\n  operations: a\n",
        );
        let all = current_contexts(&root).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[&Target::MissionControl].name, "b");
    }

    #[test]
    fn alias_keys_are_not_pointers() {
        let root = doc("contexts:\n- name: a\n  target: kubernetes\ncurrentContext:\n  k8s: a\n");
        assert!(current_context(&root, Target::Kubernetes).unwrap_err().is_not_found());
        assert!(current_contexts(&root).unwrap().is_empty());
    }

    #[test]
    fn targets_selecting_name() {
        let root = doc("currentContext:\n  kubernetes: x\n  tanzu: x\n  mission-control: y\n");
        assert_eq!(targets_selecting(&root, "x"), vec![Target::Kubernetes, Target::Tanzu]);
    }
}
