//! Configuration store handle
//!
//! [`ConfigStore`] is the entry point. Reads parse the document without the
//! lock; every mutation runs its whole read-modify-write inside one locked
//! session and writes only when something changed.

use crate::config::StoreConfig;
use crate::document::Document;
use crate::entity::{self, Entity, PlainEntity};
use crate::error::{require_non_empty, ConfigError, Result};
use crate::options;
use crate::pointers;
use crate::sync::{Change, ChangeSet, SyncReport};
use crate::types::{Context, CorePluginGroup, Essential, PluginDiscovery, PluginGroup, Server, Target};
use cliconf_merge::StrategyTable;
use std::collections::BTreeMap;

/// Handle over one backing document
#[derive(Debug)]
pub struct ConfigStore {
    document: Document,
}

impl ConfigStore {
    /// Open a store, loading the patch strategy table
    ///
    /// # Errors
    /// Returns error if the strategy side document is unreadable or malformed
    pub fn open(config: StoreConfig) -> Result<Self> {
        let document = Document::open(config)?;
        tracing::debug!(
            path = %document.config().document_path.display(),
            strategies = document.strategies().len(),
            "opened configuration store"
        );
        Ok(Self { document })
    }

    /// Open a store with an explicit strategy table
    #[must_use]
    pub fn with_strategies(config: StoreConfig, strategies: StrategyTable) -> Self {
        Self {
            document: Document::with_strategies(config, strategies),
        }
    }

    /// Store configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        self.document.config()
    }

    /// Underlying document
    #[inline]
    #[must_use]
    pub fn document(&self) -> &Document {
        &self.document
    }

    // Generic repository operations

    /// Get the entity named `name`
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if absent
    pub fn get<E: Entity>(&self, name: &str) -> Result<E> {
        entity::find(&self.document.read()?, name)
    }

    /// List entities in document order
    ///
    /// # Errors
    /// Returns error if the document cannot be read
    pub fn list<E: Entity>(&self) -> Result<Vec<E>> {
        Ok(entity::list(&self.document.read()?))
    }

    /// Check whether an entity named `name` exists
    ///
    /// # Errors
    /// Returns error if the document cannot be read
    pub fn exists<E: Entity>(&self, name: &str) -> Result<bool> {
        Ok(entity::contains::<E>(&self.document.read()?, name))
    }

    /// Insert or update an entity, returning whether the document changed
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidArgument`] for an empty name
    pub fn set<E: PlainEntity>(&self, record: &E) -> Result<bool> {
        require_non_empty(E::KIND, record.name())?;
        self.document.with_lock(|session| session.upsert(record))
    }

    /// Delete the entity named `name`
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidArgument`] for an empty name and
    /// [`ConfigError::NotFound`] if absent
    pub fn delete<E: PlainEntity>(&self, name: &str) -> Result<()> {
        require_non_empty(E::KIND, name)?;
        self.document.with_lock(|session| {
            if session.remove::<E>(name) {
                Ok(())
            } else {
                Err(ConfigError::not_found(E::KIND, name))
            }
        })
    }

    /// Apply a change set under one lock acquisition
    ///
    /// # Errors
    /// Returns the first failing change; nothing is written in that case
    pub fn apply(&self, changes: ChangeSet) -> Result<SyncReport> {
        let count = changes.len();
        let report = self.document.with_lock(|session| changes.apply(session))?;
        if report.changed {
            tracing::info!(steps = report.steps_applied, total = count, "change set committed");
        }
        Ok(report)
    }

    // Contexts

    /// Get a context
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if absent
    pub fn get_context(&self, name: &str) -> Result<Context> {
        self.get(name)
    }

    /// Insert or update a context and its server shadow
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidArgument`] for an empty name
    pub fn set_context(&self, ctx: &Context, set_current: bool) -> Result<SyncReport> {
        require_non_empty(Context::KIND, &ctx.name)?;
        self.apply(ChangeSet::for_set_context(ctx.clone(), set_current))
    }

    /// Remove a context, its server shadow and every pointer to either
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if the context is absent
    pub fn remove_context(&self, name: &str) -> Result<SyncReport> {
        require_non_empty(Context::KIND, name)?;
        self.apply(ChangeSet::for_remove_context(name))
    }

    /// Check whether a context exists
    ///
    /// # Errors
    /// Returns error if the document cannot be read
    pub fn context_exists(&self, name: &str) -> Result<bool> {
        self.exists::<Context>(name)
    }

    /// List contexts
    ///
    /// # Errors
    /// Returns error if the document cannot be read
    pub fn list_contexts(&self) -> Result<Vec<Context>> {
        self.list()
    }

    /// List contexts of one target
    ///
    /// # Errors
    /// Returns error if the document cannot be read
    pub fn list_contexts_for_target(&self, target: Target) -> Result<Vec<Context>> {
        Ok(self
            .list_contexts()?
            .into_iter()
            .filter(|c| c.target == target)
            .collect())
    }

    // Legacy servers

    /// Get a server
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if absent
    pub fn get_server(&self, name: &str) -> Result<Server> {
        self.get(name)
    }

    /// Insert or update a server and its context shadow
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidArgument`] for an empty name
    pub fn set_server(&self, server: &Server, set_current: bool) -> Result<SyncReport> {
        require_non_empty(Server::KIND, &server.name)?;
        self.apply(ChangeSet::for_set_server(server.clone(), set_current))
    }

    /// Remove a server, its context shadow and every pointer to either
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if the server is absent
    pub fn remove_server(&self, name: &str) -> Result<SyncReport> {
        require_non_empty(Server::KIND, name)?;
        self.apply(ChangeSet::for_remove_server(name))
    }

    /// Check whether a server exists
    ///
    /// # Errors
    /// Returns error if the document cannot be read
    pub fn server_exists(&self, name: &str) -> Result<bool> {
        self.exists::<Server>(name)
    }

    /// List servers
    ///
    /// # Errors
    /// Returns error if the document cannot be read
    pub fn list_servers(&self) -> Result<Vec<Server>> {
        self.list()
    }

    // Plugin metadata

    /// Get a plugin group
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if absent
    pub fn get_plugin_group(&self, name: &str) -> Result<PluginGroup> {
        self.get(name)
    }

    /// Insert or update a plugin group
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidArgument`] for an empty name
    pub fn set_plugin_group(&self, group: &PluginGroup) -> Result<bool> {
        self.set(group)
    }

    /// Delete a plugin group
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if absent
    pub fn delete_plugin_group(&self, name: &str) -> Result<()> {
        self.delete::<PluginGroup>(name)
    }

    /// List plugin groups
    ///
    /// # Errors
    /// Returns error if the document cannot be read
    pub fn list_plugin_groups(&self) -> Result<Vec<PluginGroup>> {
        self.list()
    }

    /// Get an essential plugin
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if absent
    pub fn get_essential(&self, name: &str) -> Result<Essential> {
        self.get(name)
    }

    /// Insert or update an essential plugin
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidArgument`] for an empty name
    pub fn set_essential(&self, essential: &Essential) -> Result<bool> {
        self.set(essential)
    }

    /// Delete an essential plugin
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if absent
    pub fn delete_essential(&self, name: &str) -> Result<()> {
        self.delete::<Essential>(name)
    }

    /// List essential plugins
    ///
    /// # Errors
    /// Returns error if the document cannot be read
    pub fn list_essentials(&self) -> Result<Vec<Essential>> {
        self.list()
    }

    /// Get an essential plugin group
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if absent
    pub fn get_core_plugin_group(&self, name: &str) -> Result<CorePluginGroup> {
        self.get(name)
    }

    /// Insert or update an essential plugin group
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidArgument`] for an empty name
    pub fn set_core_plugin_group(&self, group: &CorePluginGroup) -> Result<bool> {
        self.set(group)
    }

    /// Delete an essential plugin group
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if absent
    pub fn delete_core_plugin_group(&self, name: &str) -> Result<()> {
        self.delete::<CorePluginGroup>(name)
    }

    /// List essential plugin groups
    ///
    /// # Errors
    /// Returns error if the document cannot be read
    pub fn list_core_plugin_groups(&self) -> Result<Vec<CorePluginGroup>> {
        self.list()
    }

    /// Get a discovery source
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if absent
    pub fn get_discovery_source(&self, name: &str) -> Result<PluginDiscovery> {
        self.get(name)
    }

    /// Insert or update a discovery source
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidArgument`] for an empty name
    pub fn set_discovery_source(&self, source: &PluginDiscovery) -> Result<bool> {
        self.set(source)
    }

    /// Delete a discovery source
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if absent
    pub fn delete_discovery_source(&self, name: &str) -> Result<()> {
        self.delete::<PluginDiscovery>(name)
    }

    /// List discovery sources
    ///
    /// # Errors
    /// Returns error if the document cannot be read
    pub fn list_discovery_sources(&self) -> Result<Vec<PluginDiscovery>> {
        self.list()
    }

    // Current-selection pointers

    /// Context selected for `target`
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if no existing context is selected
    pub fn get_current_context(&self, target: Target) -> Result<Context> {
        pointers::current_context(&self.document.read()?, target)
    }

    /// Every selected context, keyed by target
    ///
    /// # Errors
    /// Returns error if the document cannot be read
    pub fn current_contexts(&self) -> Result<BTreeMap<Target, Context>> {
        pointers::current_contexts(&self.document.read()?)
    }

    /// Select a context for its target
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if the context is absent
    pub fn set_current_context(&self, name: &str) -> Result<SyncReport> {
        require_non_empty(Context::KIND, name)?;
        self.apply(ChangeSet::new().with(Change::SetCurrentContext { name: name.to_string() }))
    }

    /// Clear the selection for `target`
    ///
    /// # Errors
    /// Returns error if the lock or the document fails
    pub fn remove_current_context(&self, target: Target) -> Result<SyncReport> {
        self.apply(ChangeSet::new().with(Change::ClearCurrentTarget { target }))
    }

    /// Selected legacy server
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if no existing server is selected
    pub fn get_current_server(&self) -> Result<Server> {
        pointers::current_server(&self.document.read()?)
    }

    /// Select a legacy server
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if the server is absent
    pub fn set_current_server(&self, name: &str) -> Result<SyncReport> {
        require_non_empty(Server::KIND, name)?;
        self.apply(ChangeSet::new().with(Change::SetCurrentServer { name: name.to_string() }))
    }

    /// Clear the server selection and any context selection naming `name`
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidArgument`] for an empty name
    pub fn remove_current_server(&self, name: &str) -> Result<SyncReport> {
        require_non_empty(Server::KIND, name)?;
        self.apply(
            ChangeSet::new()
                .with(Change::ClearCurrentServer { name: name.to_string() })
                .with(Change::ClearCurrentContext { name: name.to_string() }),
        )
    }

    // Features and environment

    /// Check a feature flag
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidArgument`] for empty coordinates
    pub fn is_feature_enabled(&self, plugin: &str, key: &str) -> Result<bool> {
        options::check_feature(plugin, key)?;
        Ok(options::is_feature_enabled(&self.document.read()?, plugin, key))
    }

    /// Set a feature flag
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidArgument`] for empty coordinates
    pub fn set_feature(&self, plugin: &str, key: &str, value: &str) -> Result<bool> {
        options::check_feature(plugin, key)?;
        self.document
            .with_lock(|session| options::set_feature(session, plugin, key, value))
    }

    /// Delete a feature flag, returning whether it existed
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidArgument`] for empty coordinates
    pub fn delete_feature(&self, plugin: &str, key: &str) -> Result<bool> {
        options::check_feature(plugin, key)?;
        self.document
            .with_lock(|session| Ok(options::delete_feature(session, plugin, key)))
    }

    /// Get an environment variable
    ///
    /// # Errors
    /// Returns [`ConfigError::NotFound`] if unset
    pub fn get_env(&self, key: &str) -> Result<String> {
        require_non_empty("env key", key)?;
        options::get_env(&self.document.read()?, key)
    }

    /// Set an environment variable
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidArgument`] for an empty key
    pub fn set_env(&self, key: &str, value: &str) -> Result<bool> {
        require_non_empty("env key", key)?;
        self.document.with_lock(|session| options::set_env(session, key, value))
    }

    /// Delete an environment variable, returning whether it existed
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidArgument`] for an empty key
    pub fn delete_env(&self, key: &str) -> Result<bool> {
        require_non_empty("env key", key)?;
        self.document.with_lock(|session| Ok(options::delete_env(session, key)))
    }

    /// Every environment variable
    ///
    /// # Errors
    /// Returns error if the document cannot be read
    pub fn env_configurations(&self) -> Result<BTreeMap<String, String>> {
        Ok(options::env_configurations(&self.document.read()?))
    }
}
