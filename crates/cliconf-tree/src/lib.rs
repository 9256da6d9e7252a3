//! Document tree for the CLI configuration store
//!
//! A loosely-typed YAML document modelled as a closed tagged-variant tree.
//!
//! # Core Concepts
//!
//! - [`Node`]: Mapping / Sequence / Scalar tree
//! - [`Scalar`]: leaf value carrying its [`ScalarKind`] formatting hint
//! - [`KeyPath`]: typed path from the root mapping to a node
//! - [`locate`] / [`locate_mut`]: the node locator
//! - [`encode`] / [`decode`]: struct ↔ tree codec
//!
//! # Example
//!
//! ```rust
//! use cliconf_tree::{locate, KeyPath, Node};
//!
//! let root = Node::parse_document("contexts:\n- name: dev\n").unwrap();
//! let path = KeyPath::collection("contexts").unwrap();
//! let contexts = locate(&root, &path).and_then(Node::as_sequence).unwrap();
//! assert_eq!(contexts[0].entity_name(), Some("dev"));
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

mod codec;
mod locate;
mod node;
mod path;

pub use codec::{decode, encode, CodecError};
pub use locate::{
    entity_names, find_entity, get_scalar, locate, locate_mapping, locate_mut, prune_empty,
    remove_key, set_scalar,
};
pub use node::{Mapping, Node, NodeError, NodeKind, Scalar, ScalarKind, TaggedNode, NAME_KEY};
pub use path::{KeyPath, PathError, PathStep};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
