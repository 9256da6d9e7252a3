//! Struct ↔ tree codec
//!
//! Typed records are encoded into [`Node`] subtrees to serve as merge
//! candidates and decoded back into independent copies for callers.

use crate::node::{Node, NodeError};
use serde::{de::DeserializeOwned, Serialize};

/// Encode a typed record into a tree
///
/// # Errors
/// Returns error if the value cannot be represented as YAML
pub fn encode<T: Serialize>(value: &T) -> Result<Node, CodecError> {
    let yaml = serde_yaml::to_value(value).map_err(CodecError::Encode)?;
    Node::from_value(yaml).map_err(CodecError::Tree)
}

/// Decode a tree into a typed record
///
/// # Errors
/// Returns error if the tree does not match the record's shape
pub fn decode<T: DeserializeOwned>(node: &Node) -> Result<T, CodecError> {
    serde_yaml::from_value(node.to_value()).map_err(CodecError::Decode)
}

/// Codec errors
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization failed
    #[error("encode failed: {0}")]
    Encode(#[source] serde_yaml::Error),

    /// Deserialization failed
    #[error("decode failed: {0}")]
    Decode(#[source] serde_yaml::Error),

    /// Value could not be represented as a tree
    #[error(transparent)]
    Tree(#[from] NodeError),
}
