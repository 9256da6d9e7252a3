//! Patch strategy table
//!
//! Provides [`StrategyTable`], the per-path merge-or-replace policy consulted
//! by the merge engine. The table is sourced from a side document:
//!
//! ```yaml
//! configMetadata:
//!   patchStrategy:
//!     contexts.clusterOpts: replace
//!     servers.globalOpts.auth: replace
//! ```
//!
//! Paths absent from the table merge.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Per-path update policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PatchStrategy {
    /// Recurse into the existing subtree, keeping fields the candidate lacks
    #[default]
    Merge,

    /// Discard the existing subtree and substitute the candidate wholesale
    Replace,
}

impl PatchStrategy {
    /// Check if this is the replace policy
    #[inline]
    #[must_use]
    pub fn is_replace(&self) -> bool {
        matches!(self, Self::Replace)
    }
}

impl Display for PatchStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Merge => f.write_str("merge"),
            Self::Replace => f.write_str("replace"),
        }
    }
}

impl FromStr for PatchStrategy {
    type Err = StrategyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merge" => Ok(Self::Merge),
            "replace" => Ok(Self::Replace),
            _ => Err(StrategyError::InvalidStrategy(s.to_string())),
        }
    }
}

/// Dotted-path → [`PatchStrategy`] table
///
/// Keys are the collection path followed by the field path, without entity
/// names: `contexts.clusterOpts.endpoint`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StrategyTable {
    entries: BTreeMap<String, PatchStrategy>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MetadataDocument {
    #[serde(default)]
    config_metadata: Option<ConfigMetadata>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigMetadata {
    #[serde(default)]
    patch_strategy: BTreeMap<String, String>,
}

impl StrategyTable {
    /// Create new empty table (everything merges)
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a strategy for a path
    pub fn insert(&mut self, path: impl Into<String>, strategy: PatchStrategy) {
        self.entries.insert(path.into(), strategy);
    }

    /// Builder form of [`insert`](Self::insert)
    #[inline]
    #[must_use]
    pub fn with(mut self, path: impl Into<String>, strategy: PatchStrategy) -> Self {
        self.insert(path, strategy);
        self
    }

    /// Remove a path's entry
    #[inline]
    pub fn remove(&mut self, path: &str) -> Option<PatchStrategy> {
        self.entries.remove(path)
    }

    /// Strategy for `path`, defaulting to merge
    #[inline]
    #[must_use]
    pub fn select(&self, path: &str) -> PatchStrategy {
        self.entries.get(path).copied().unwrap_or_default()
    }

    /// Get number of explicit entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if table has no explicit entries
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over explicit entries
    pub fn iter(&self) -> impl Iterator<Item = (&str, PatchStrategy)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Parse the side document
    ///
    /// # Errors
    /// Returns error if the YAML is invalid or a strategy value is unknown
    pub fn from_yaml(text: &str) -> Result<Self, StrategyError> {
        if text.trim().is_empty() {
            return Ok(Self::new());
        }
        let doc: Option<MetadataDocument> =
            serde_yaml::from_str(text).map_err(StrategyError::InvalidYaml)?;
        let raw = doc
            .and_then(|d| d.config_metadata)
            .map(|m| m.patch_strategy)
            .unwrap_or_default();

        let mut table = Self::new();
        for (path, value) in raw {
            let strategy = value
                .parse::<PatchStrategy>()
                .map_err(|_| StrategyError::UnknownStrategy {
                    path: path.clone(),
                    value: value.clone(),
                })?;
            table.insert(path, strategy);
        }
        Ok(table)
    }

    /// Load the side document from disk
    ///
    /// A missing file yields an empty table.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed
    pub fn load(path: &Path) -> Result<Self, StrategyError> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let table = Self::from_yaml(&text)?;
                tracing::debug!(path = %path.display(), entries = table.len(), "loaded patch strategies");
                Ok(table)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::new()),
            Err(source) => Err(StrategyError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }
}

impl FromIterator<(String, PatchStrategy)> for StrategyTable {
    fn from_iter<I: IntoIterator<Item = (String, PatchStrategy)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

/// Strategy table errors
#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    /// Side document is not valid YAML
    #[error("invalid patch strategy document: {0}")]
    InvalidYaml(#[source] serde_yaml::Error),

    /// Text that is neither merge nor replace
    #[error("invalid patch strategy '{0}', expected merge or replace")]
    InvalidStrategy(String),

    /// Side document names a strategy other than merge/replace
    #[error("unknown patch strategy '{value}' for '{path}'")]
    UnknownStrategy {
        /// Dotted path
        path: String,
        /// Offending value
        value: String,
    },

    /// Side document could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_new_empty() {
        let table = StrategyTable::new();
        assert!(table.is_empty());
        assert_eq!(table.select("contexts"), PatchStrategy::Merge);
    }

    #[test]
    fn table_insert_and_select() {
        let table = StrategyTable::new().with("contexts.clusterOpts", PatchStrategy::Replace);
        assert_eq!(table.select("contexts.clusterOpts"), PatchStrategy::Replace);
        assert_eq!(table.select("contexts.clusterOpts.endpoint"), PatchStrategy::Merge);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn table_remove() {
        let mut table = StrategyTable::new().with("servers", PatchStrategy::Replace);
        assert_eq!(table.remove("servers"), Some(PatchStrategy::Replace));
        assert!(table.is_empty());
    }

    #[test]
    fn strategy_parse_is_case_insensitive() {
        assert_eq!("Replace".parse::<PatchStrategy>().unwrap(), PatchStrategy::Replace);
        assert_eq!(" MERGE ".parse::<PatchStrategy>().unwrap(), PatchStrategy::Merge);

        let err = "overwrite".parse::<PatchStrategy>().unwrap_err();
        assert!(matches!(err, StrategyError::InvalidStrategy(ref v) if v == "overwrite"));
    }

    #[test]
    fn from_yaml_reads_patch_strategy() {
        let text = "configMetadata:\n  patchStrategy:\n    contexts.clusterOpts: replace\n    servers.globalOpts: merge\n";
        let table = StrategyTable::from_yaml(text).unwrap();
        assert_eq!(table.select("contexts.clusterOpts"), PatchStrategy::Replace);
        assert_eq!(table.select("servers.globalOpts"), PatchStrategy::Merge);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn from_yaml_without_section() {
        let table = StrategyTable::from_yaml("configMetadata: {}\n").unwrap();
        assert!(table.is_empty());

        let table = StrategyTable::from_yaml("").unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn from_yaml_unknown_strategy() {
        let text = "configMetadata:\n  patchStrategy:\n    contexts: clobber\n";
        let err = StrategyTable::from_yaml(text).unwrap_err();
        assert!(matches!(err, StrategyError::UnknownStrategy { .. }));
    }

    #[test]
    fn from_yaml_invalid() {
        let err = StrategyTable::from_yaml("configMetadata: [").unwrap_err();
        assert!(matches!(err, StrategyError::InvalidYaml(_)));
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let table = StrategyTable::load(&dir.path().join("absent.yaml")).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn load_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config-metadata.yaml");
        std::fs::write(
            &path,
            "configMetadata:\n  patchStrategy:\n    servers: replace\n",
        )
        .unwrap();

        let table = StrategyTable::load(&path).unwrap();
        assert!(table.select("servers").is_replace());
    }
}
