//! Patch-merge engine for the CLI configuration store
//!
//! Field-level reconciliation of entity subtrees, driven by an external
//! strategy table.
//!
//! # Core Concepts
//!
//! - [`PatchStrategy`]: merge or replace
//! - [`StrategyTable`]: dotted path → strategy, loaded from a side document
//! - [`reconcile`] / [`merge_node`]: per-variant recursive merge
//! - [`upsert_entity`] / [`remove_entity`]: named entities within a collection
//!
//! # Example
//!
//! ```rust
//! use cliconf_merge::{reconcile, PatchStrategy, StrategyTable};
//! use cliconf_tree::Node;
//!
//! let existing = Node::parse_document("name: e\na: 1\nb: 2\n").unwrap();
//! let candidate = Node::parse_document("name: e\na: 1\nc: 3\n").unwrap();
//!
//! let merged = reconcile(candidate.clone(), Some(existing.clone()), "contexts", &StrategyTable::new());
//! assert_eq!(merged.node, Node::parse_document("name: e\na: 1\nb: 2\nc: 3\n").unwrap());
//!
//! let table = StrategyTable::new().with("contexts", PatchStrategy::Replace);
//! let replaced = reconcile(candidate, Some(existing), "contexts", &table);
//! assert_eq!(replaced.node, Node::parse_document("name: e\na: 1\nc: 3\n").unwrap());
//! ```

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod collection;
mod merge;
mod strategy;

pub use collection::{remove_entity, upsert_entity, MergeError};
pub use merge::{merge_node, reconcile, Reconciled};
pub use strategy::{PatchStrategy, StrategyError, StrategyTable};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
