//! Error types for the configuration store
//!
//! Provides the error taxonomy surfaced to callers:
//! - Invalid arguments (empty names and keys)
//! - Missing entities, collections and pointers
//! - Malformed backing or side documents
//! - I/O failures on the backing document
//! - Lock acquisition failures and timeouts

use cliconf_merge::{MergeError, StrategyError};
use cliconf_tree::{CodecError, NodeError};
use std::path::PathBuf;
use std::time::Duration;

/// Result alias for store operations
pub type Result<T, E = ConfigError> = std::result::Result<T, E>;

/// Main configuration store error type
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Empty name or key
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Entity, collection or pointer absent
    #[error("{kind} '{name}' not found")]
    NotFound {
        /// Entity kind
        kind: &'static str,
        /// Entity name or pointer key
        name: String,
    },

    /// Document failed to parse or has an unexpected shape
    #[error("malformed configuration: {0}")]
    Malformed(String),

    /// Reading or writing a file failed
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Lock could not be acquired
    #[error("failed to lock {path}: {source}")]
    Lock {
        /// Lock file path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Lock still held by someone else when the timeout expired
    #[error("timed out after {waited:?} waiting for lock {path}")]
    LockTimeout {
        /// Lock file path
        path: PathBuf,
        /// Time spent waiting
        waited: Duration,
    },

    /// Typed record did not match the stored subtree
    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

impl ConfigError {
    /// Create not found error
    #[inline]
    #[must_use]
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Check if error is a not-found signal
    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if error is an invalid argument
    #[inline]
    #[must_use]
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// Check if error comes from lock acquisition
    #[inline]
    #[must_use]
    pub fn is_lock_failure(&self) -> bool {
        matches!(self, Self::Lock { .. } | Self::LockTimeout { .. })
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<NodeError> for ConfigError {
    fn from(err: NodeError) -> Self {
        Self::Malformed(err.to_string())
    }
}

impl From<MergeError> for ConfigError {
    fn from(err: MergeError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

impl From<StrategyError> for ConfigError {
    fn from(err: StrategyError) -> Self {
        match err {
            StrategyError::Io { path, source } => Self::Io { path, source },
            other => Self::Malformed(other.to_string()),
        }
    }
}

/// Reject empty names and keys
pub(crate) fn require_non_empty(what: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(ConfigError::InvalidArgument(format!("{what} cannot be empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let err = ConfigError::not_found("context", "dev");
        assert_eq!(err.to_string(), "context 'dev' not found");
        assert!(err.is_not_found());
        assert!(!err.is_invalid_argument());
    }

    #[test]
    fn require_non_empty_rejects_empty() {
        let err = require_non_empty("context name", "").unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(require_non_empty("context name", "dev").is_ok());
    }

    #[test]
    fn strategy_io_maps_to_io() {
        let err: ConfigError = StrategyError::Io {
            path: PathBuf::from("/x"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        }
        .into();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn lock_failures_are_classified() {
        let err = ConfigError::LockTimeout {
            path: PathBuf::from("/x.lock"),
            waited: Duration::from_millis(10),
        };
        assert!(err.is_lock_failure());
    }
}
