//! Backing document persistence
//!
//! [`Document`] owns the location of the backing YAML file and the patch
//! strategy table. Mutations run inside [`Document::with_lock`]: the lock is
//! held for the whole read-modify-write, a fresh tree is parsed, the closure
//! edits it through a [`Session`], and a dirty tree is committed by writing a
//! temporary sibling file and renaming it over the document.

use crate::config::StoreConfig;
use crate::entity::Entity;
use crate::error::{ConfigError, Result};
use crate::lock::FileLock;
use cliconf_merge::{remove_entity, upsert_entity, StrategyTable};
use cliconf_tree::{encode, get_scalar, locate_mut, prune_empty, remove_key, set_scalar, KeyPath, Node};
use std::io::Write;
use std::path::Path;

/// Backing document handle
#[derive(Debug)]
pub struct Document {
    config: StoreConfig,
    strategies: StrategyTable,
}

impl Document {
    /// Open the document described by `config`, loading its strategy table
    ///
    /// # Errors
    /// Returns error if the strategy side document exists but cannot be read
    /// or parsed
    pub fn open(config: StoreConfig) -> Result<Self> {
        let strategies = StrategyTable::load(&config.metadata_path)?;
        Ok(Self { config, strategies })
    }

    /// Open with an explicit strategy table, ignoring the side document
    #[must_use]
    pub fn with_strategies(config: StoreConfig, strategies: StrategyTable) -> Self {
        Self { config, strategies }
    }

    /// Store configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Patch strategy table
    #[inline]
    #[must_use]
    pub fn strategies(&self) -> &StrategyTable {
        &self.strategies
    }

    /// Parse the document without taking the lock
    ///
    /// A missing file reads as an empty document.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or is malformed
    pub fn read(&self) -> Result<Node> {
        load(&self.config.document_path)
    }

    /// Run `f` against a freshly parsed tree while holding the lock
    ///
    /// The tree is written back only if `f` succeeds and reports a change
    /// through the session. The lock is released on every exit path.
    ///
    /// # Errors
    /// Returns error if the lock cannot be acquired, the document cannot be
    /// read or written, or `f` fails
    pub fn with_lock<T>(&self, f: impl FnOnce(&mut Session<'_>) -> Result<T>) -> Result<T> {
        let _guard = FileLock::acquire(
            &self.config.lock_path,
            self.config.lock_timeout,
            self.config.lock_poll_interval,
        )?;

        let root = load(&self.config.document_path)?;
        let mut session = Session::new(root, &self.strategies);
        let out = f(&mut session)?;

        if session.dirty {
            commit(&self.config.document_path, &session.root)?;
        } else {
            tracing::debug!(path = %self.config.document_path.display(), "no changes, skipping write");
        }
        Ok(out)
    }
}

/// Mutable view of the tree for the duration of one locked operation
#[derive(Debug)]
pub struct Session<'a> {
    root: Node,
    strategies: &'a StrategyTable,
    dirty: bool,
}

impl<'a> Session<'a> {
    /// Create session over `root`
    #[must_use]
    pub fn new(root: Node, strategies: &'a StrategyTable) -> Self {
        Self {
            root,
            strategies,
            dirty: false,
        }
    }

    /// Current tree
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Node {
        &self.root
    }

    /// Has the tree changed since it was parsed
    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Consume the session, returning the tree
    #[must_use]
    pub fn into_root(self) -> Node {
        self.root
    }

    /// Insert or reconcile `record` in its collection
    ///
    /// # Errors
    /// Returns error if the record cannot be encoded, has no name, or the
    /// collection slot holds foreign data of another kind
    pub fn upsert<E: Entity>(&mut self, record: &E) -> Result<bool> {
        let path = E::collection();
        let candidate = encode(record)?;
        let collection = locate_mut(&mut self.root, &path, true)
            .and_then(Node::as_sequence_mut)
            .ok_or_else(|| ConfigError::Malformed(format!("'{path}' is not a sequence")))?;

        let changed = upsert_entity(collection, candidate, &path.dotted(), self.strategies)?;
        tracing::debug!(kind = E::KIND, name = record.name(), changed, "upserted entity");
        self.dirty |= changed;
        Ok(changed)
    }

    /// Remove every entity named `name` from its collection
    ///
    /// Returns `true` if anything was removed; an absent collection removes
    /// nothing.
    pub fn remove<E: Entity>(&mut self, name: &str) -> bool {
        let removed = locate_mut(&mut self.root, &E::collection(), false)
            .and_then(Node::as_sequence_mut)
            .is_some_and(|collection| remove_entity(collection, name));
        if removed {
            tracing::debug!(kind = E::KIND, name, "removed entity");
        }
        self.dirty |= removed;
        removed
    }

    /// Write a string scalar at `path`
    ///
    /// # Errors
    /// Returns error if a parent on the path holds foreign data of another kind
    pub fn set_scalar(&mut self, path: &KeyPath, value: &str) -> Result<bool> {
        if set_scalar(&mut self.root, path, value) {
            self.dirty = true;
            return Ok(true);
        }
        if get_scalar(&self.root, path) == Some(value) {
            return Ok(false);
        }
        Err(ConfigError::Malformed(format!("cannot write scalar at '{path}'")))
    }

    /// Remove the key at `path`
    pub fn remove_key(&mut self, path: &KeyPath) -> bool {
        let removed = remove_key(&mut self.root, path);
        self.dirty |= removed;
        removed
    }

    /// Remove empty mappings left along `path`
    pub fn prune(&mut self, path: &KeyPath) -> bool {
        let pruned = prune_empty(&mut self.root, path);
        self.dirty |= pruned;
        pruned
    }
}

fn load(path: &Path) -> Result<Node> {
    match std::fs::read_to_string(path) {
        Ok(text) => {
            tracing::debug!(path = %path.display(), bytes = text.len(), "parsed document");
            Node::parse_document(&text)
                .map_err(|e| ConfigError::Malformed(format!("{}: {e}", path.display())))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "document missing, starting empty");
            Ok(Node::mapping())
        }
        Err(e) => Err(ConfigError::io(path, e)),
    }
}

fn commit(path: &Path, root: &Node) -> Result<()> {
    let text = root.to_yaml()?;
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| ConfigError::io(parent, e))?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(|e| ConfigError::io(parent, e))?;
    tmp.write_all(text.as_bytes())
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| ConfigError::io(tmp.path(), e))?;
    tmp.persist(path).map_err(|e| ConfigError::io(path, e.error))?;

    tracing::debug!(path = %path.display(), bytes = text.len(), "committed document");
    Ok(())
}
