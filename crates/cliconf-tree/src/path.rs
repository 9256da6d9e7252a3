//! Key paths for addressing within the document tree
//!
//! Provides [`KeyPath`] for descending from the root mapping to a collection,
//! a nested mapping or a scalar field.

use crate::node::NodeKind;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// One named step of a [`KeyPath`] and the node kind expected at that step
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathStep {
    name: String,
    kind: NodeKind,
}

impl PathStep {
    /// Create new step
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// Key name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Expected node kind
    #[inline]
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        self.kind
    }
}

/// Path from the root mapping to a node
///
/// Every step but the last must be a mapping; the last step declares the
/// kind of the addressed node.
///
/// # Examples
/// - `contexts` → the sequence of contexts
/// - `clientOptions.cli.essentials` → a nested sequence
/// - `currentContext.kubernetes` → a scalar pointer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct KeyPath(Vec<PathStep>);

impl KeyPath {
    /// Create new path from steps
    #[inline]
    #[must_use]
    pub fn new(steps: Vec<PathStep>) -> Self {
        Self(steps)
    }

    /// Empty path (root)
    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    /// Path from already-split names; intermediate steps are mappings and the
    /// last step has `kind`
    #[must_use]
    pub fn of(names: &[&str], kind: NodeKind) -> Self {
        let last = names.len().saturating_sub(1);
        Self(
            names
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let step_kind = if i == last { kind } else { NodeKind::Mapping };
                    PathStep::new(*name, step_kind)
                })
                .collect(),
        )
    }

    /// Path whose intermediate steps are mappings and whose last step has `kind`
    ///
    /// # Errors
    /// Returns error if the dotted path contains an empty segment
    pub fn with_leaf(dotted: &str, kind: NodeKind) -> Result<Self, PathError> {
        let names = split_dotted(dotted)?;
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        Ok(Self::of(&names, kind))
    }

    /// Path ending in a sequence
    ///
    /// # Errors
    /// Returns error if the dotted path contains an empty segment
    #[inline]
    pub fn collection(dotted: &str) -> Result<Self, PathError> {
        Self::with_leaf(dotted, NodeKind::Sequence)
    }

    /// Path ending in a mapping
    ///
    /// # Errors
    /// Returns error if the dotted path contains an empty segment
    #[inline]
    pub fn mapping(dotted: &str) -> Result<Self, PathError> {
        Self::with_leaf(dotted, NodeKind::Mapping)
    }

    /// Path ending in a scalar
    ///
    /// # Errors
    /// Returns error if the dotted path contains an empty segment
    #[inline]
    pub fn scalar(dotted: &str) -> Result<Self, PathError> {
        Self::with_leaf(dotted, NodeKind::Scalar)
    }

    /// Get path steps
    #[inline]
    #[must_use]
    pub fn steps(&self) -> &[PathStep] {
        &self.0
    }

    /// Get number of steps
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if path is empty (root)
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Get parent path (if not root)
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.0.is_empty() {
            None
        } else {
            Some(Self(self.0[..self.0.len() - 1].to_vec()))
        }
    }

    /// Get last step (if not root)
    #[inline]
    #[must_use]
    pub fn last(&self) -> Option<&PathStep> {
        self.0.last()
    }

    /// Append a step, returning new path
    ///
    /// The current last step is retyped as a mapping since it now has a child.
    #[must_use]
    pub fn child(&self, name: impl Into<String>, kind: NodeKind) -> Self {
        let mut new = self.clone();
        if let Some(last) = new.0.last_mut() {
            last.kind = NodeKind::Mapping;
        }
        new.0.push(PathStep::new(name, kind));
        new
    }

    /// Iterator over step names from root to leaf
    #[inline]
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(PathStep::name)
    }

    /// Dotted form used as a patch strategy key
    #[inline]
    #[must_use]
    pub fn dotted(&self) -> String {
        self.to_string()
    }
}

fn split_dotted(dotted: &str) -> Result<Vec<String>, PathError> {
    if dotted.is_empty() {
        return Ok(Vec::new());
    }
    dotted
        .split('.')
        .map(|seg| {
            if seg.is_empty() {
                Err(PathError::EmptySegment(dotted.to_string()))
            } else {
                Ok(seg.to_string())
            }
        })
        .collect()
}

impl Display for KeyPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for step in &self.0 {
            if !first {
                f.write_str(".")?;
            }
            f.write_str(&step.name)?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for KeyPath {
    type Err = PathError;

    /// Parses a dotted path of mappings; use the typed constructors to
    /// declare a non-mapping leaf.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::mapping(s)
    }
}

/// Errors related to key paths
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PathError {
    /// Empty segment in path
    #[error("path '{0}' contains empty segment")]
    EmptySegment(String),
}
