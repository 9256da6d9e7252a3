//! Feature flags and environment options
//!
//! Flags live at `clientOptions.features.<plugin>.<key>` and environment
//! variables at `clientOptions.env.<key>`, both as string scalars.

use crate::document::Session;
use crate::error::{require_non_empty, ConfigError, Result};
use cliconf_tree::{get_scalar, locate_mapping, KeyPath, Node, NodeKind};
use std::collections::BTreeMap;

const CLIENT_OPTIONS: &str = "clientOptions";
const FEATURES: &str = "features";
const ENV: &str = "env";

fn feature_path(plugin: &str, key: &str) -> KeyPath {
    KeyPath::of(&[CLIENT_OPTIONS, FEATURES, plugin, key], NodeKind::Scalar)
}

fn env_path(key: &str) -> KeyPath {
    KeyPath::of(&[CLIENT_OPTIONS, ENV, key], NodeKind::Scalar)
}

/// Validate feature coordinates
pub(crate) fn check_feature(plugin: &str, key: &str) -> Result<()> {
    require_non_empty("plugin name", plugin)?;
    require_non_empty("feature key", key)
}

/// Is the flag set to `true` (case-insensitive)
pub(crate) fn is_feature_enabled(root: &Node, plugin: &str, key: &str) -> bool {
    get_scalar(root, &feature_path(plugin, key)).is_some_and(|v| v.eq_ignore_ascii_case("true"))
}

/// Write a flag
pub(crate) fn set_feature(session: &mut Session<'_>, plugin: &str, key: &str, value: &str) -> Result<bool> {
    session.set_scalar(&feature_path(plugin, key), value)
}

/// Remove a flag, pruning the plugin mapping once empty
pub(crate) fn delete_feature(session: &mut Session<'_>, plugin: &str, key: &str) -> bool {
    let path = feature_path(plugin, key);
    let removed = session.remove_key(&path);
    if removed {
        if let Some(plugin_path) = path.parent() {
            session.prune(&plugin_path);
        }
    }
    removed
}

/// Environment variable value
pub(crate) fn get_env(root: &Node, key: &str) -> Result<String> {
    get_scalar(root, &env_path(key))
        .map(str::to_owned)
        .ok_or_else(|| ConfigError::not_found("env variable", key))
}

/// Write an environment variable
pub(crate) fn set_env(session: &mut Session<'_>, key: &str, value: &str) -> Result<bool> {
    session.set_scalar(&env_path(key), value)
}

/// Remove an environment variable
pub(crate) fn delete_env(session: &mut Session<'_>, key: &str) -> bool {
    session.remove_key(&env_path(key))
}

/// Every scalar environment entry
pub(crate) fn env_configurations(root: &Node) -> BTreeMap<String, String> {
    let path = KeyPath::of(&[CLIENT_OPTIONS, ENV], NodeKind::Mapping);
    locate_mapping(root, &path)
        .map(|env| {
            env.iter()
                .filter_map(|(k, v)| Some((k.as_str().to_string(), v.as_str()?.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cliconf_merge::StrategyTable;

    fn doc(text: &str) -> Node {
        Node::parse_document(text).unwrap()
    }

    #[test]
    fn feature_flag_is_case_insensitive() {
        let root = doc("clientOptions:\n  features:\n    global:\n      context-aware: 'True'\n      beta: 'no'\n");
        assert!(is_feature_enabled(&root, "global", "context-aware"));
        assert!(!is_feature_enabled(&root, "global", "beta"));
        assert!(!is_feature_enabled(&root, "cluster", "beta"));
    }

    #[test]
    fn delete_feature_prunes_plugin() {
        let table = StrategyTable::new();
        let root = doc("clientOptions:\n  features:\n    global:\n      a: 'true'\n    other:\n      b: 'true'\n");
        let mut session = Session::new(root, &table);

        assert!(delete_feature(&mut session, "global", "a"));
        assert!(!delete_feature(&mut session, "global", "a"));
        assert_eq!(
            session.into_root(),
            doc("clientOptions:\n  features:\n    other:\n      b: 'true'\n")
        );
    }

    #[test]
    fn env_round_trip() {
        let table = StrategyTable::new();
        let mut session = Session::new(Node::mapping(), &table);
        assert!(set_env(&mut session, "REGISTRY", "example.io").unwrap());
        assert!(!set_env(&mut session, "REGISTRY", "example.io").unwrap());

        let root = session.into_root();
        assert_eq!(get_env(&root, "REGISTRY").unwrap(), "example.io");
        assert!(get_env(&root, "MISSING").unwrap_err().is_not_found());
        assert_eq!(env_configurations(&root).len(), 1);
    }

    #[test]
    fn empty_coordinates_rejected() {
        assert!(check_feature("", "k").unwrap_err().is_invalid_argument());
        assert!(check_feature("p", "").unwrap_err().is_invalid_argument());
    }
}
