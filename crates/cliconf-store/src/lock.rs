//! Cross-process lock on the backing document
//!
//! An exclusive OS-level file lock (`flock` semantics via `fs2`). Acquisition
//! polls until the configured timeout; the guard releases on drop so every
//! exit path unlocks.

use crate::error::{ConfigError, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Held exclusive lock
#[derive(Debug)]
pub struct FileLock {
    file: File,
    path: PathBuf,
}

impl FileLock {
    /// Acquire the lock at `path`, waiting at most `timeout`
    ///
    /// # Errors
    /// Returns [`ConfigError::LockTimeout`] if the lock is still contended
    /// after `timeout`, or [`ConfigError::Lock`] if the lock file cannot be
    /// opened or locked.
    pub fn acquire(path: &Path, timeout: Duration, poll: Duration) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Lock {
                path: path.to_path_buf(),
                source,
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| ConfigError::Lock {
                path: path.to_path_buf(),
                source,
            })?;

        let start = Instant::now();
        loop {
            match file.try_lock_exclusive() {
                Ok(()) => {
                    tracing::debug!(path = %path.display(), waited = ?start.elapsed(), "lock acquired");
                    return Ok(Self {
                        file,
                        path: path.to_path_buf(),
                    });
                }
                Err(e) if is_contended(&e) => {
                    let waited = start.elapsed();
                    if waited >= timeout {
                        tracing::warn!(path = %path.display(), ?waited, "lock acquisition timed out");
                        return Err(ConfigError::LockTimeout {
                            path: path.to_path_buf(),
                            waited,
                        });
                    }
                    std::thread::sleep(poll.min(timeout - waited));
                }
                Err(source) => {
                    return Err(ConfigError::Lock {
                        path: path.to_path_buf(),
                        source,
                    })
                }
            }
        }
    }

    /// Lock file path
    #[inline]
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release lock");
        } else {
            tracing::debug!(path = %self.path.display(), "lock released");
        }
    }
}

fn is_contended(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::WouldBlock
        || err.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
