//! Store configuration
//!
//! [`StoreConfig`] names the backing document, the lock resource and the patch
//! strategy side document, and bounds lock acquisition.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default backing document file name
pub const DOCUMENT_FILE: &str = "config.yaml";

/// Default lock file name
pub const LOCK_FILE: &str = ".config.yaml.lock";

/// Default patch strategy side document file name
pub const METADATA_FILE: &str = "config-metadata.yaml";

/// Configuration store settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// Backing YAML document
    pub document_path: PathBuf,
    /// Cross-process lock file
    pub lock_path: PathBuf,
    /// Patch strategy side document
    pub metadata_path: PathBuf,
    /// Maximum time to wait for the lock
    #[serde(rename = "lockTimeoutMs", with = "millis")]
    pub lock_timeout: Duration,
    /// Delay between lock attempts
    #[serde(rename = "lockPollIntervalMs", with = "millis")]
    pub lock_poll_interval: Duration,
}

impl StoreConfig {
    /// Conventional file layout inside `dir`
    #[must_use]
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            document_path: dir.join(DOCUMENT_FILE),
            lock_path: dir.join(LOCK_FILE),
            metadata_path: dir.join(METADATA_FILE),
            ..Self::default()
        }
    }

    /// With backing document path
    #[inline]
    #[must_use]
    pub fn with_document_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.document_path = path.into();
        self
    }

    /// With lock file path
    #[inline]
    #[must_use]
    pub fn with_lock_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.lock_path = path.into();
        self
    }

    /// With side document path
    #[inline]
    #[must_use]
    pub fn with_metadata_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.metadata_path = path.into();
        self
    }

    /// With lock timeout
    #[inline]
    #[must_use]
    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// With lock poll interval
    #[inline]
    #[must_use]
    pub fn with_lock_poll_interval(mut self, interval: Duration) -> Self {
        self.lock_poll_interval = interval;
        self
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            document_path: PathBuf::from(DOCUMENT_FILE),
            lock_path: PathBuf::from(LOCK_FILE),
            metadata_path: PathBuf::from(METADATA_FILE),
            lock_timeout: Duration::from_secs(10),
            lock_poll_interval: Duration::from_millis(50),
        }
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}
