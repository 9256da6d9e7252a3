//! Testing utilities for the cliconf workspace
//!
//! Shared test helpers and fixtures.

#![allow(missing_docs)]

use cliconf_merge::StrategyTable;
use cliconf_store::{
    ClusterServer, ConfigStore, Context, GlobalServer, PluginDiscovery, Server, ServerType,
    StoreConfig, Target,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Install a test subscriber honouring `RUST_LOG`; safe to call repeatedly
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Store rooted in a private temporary directory
pub struct TestStore {
    pub dir: TempDir,
    pub store: ConfigStore,
}

impl TestStore {
    pub fn new() -> Self {
        Self::with_metadata(None)
    }

    /// Write `metadata` as the strategy side document before opening
    pub fn with_metadata(metadata: Option<&str>) -> Self {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        if let Some(text) = metadata {
            std::fs::write(dir.path().join(cliconf_store::config::METADATA_FILE), text).unwrap();
        }
        let store = ConfigStore::open(test_config(dir.path())).unwrap();
        Self { dir, store }
    }

    /// Seed the backing document before opening
    pub fn with_document(text: &str) -> Self {
        let fixture = Self::new();
        std::fs::write(fixture.document_path(), text).unwrap();
        fixture
    }

    pub fn with_strategies(strategies: StrategyTable) -> Self {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::with_strategies(test_config(dir.path()), strategies);
        Self { dir, store }
    }

    /// Another handle on the same files
    pub fn reopen(&self) -> ConfigStore {
        ConfigStore::open(self.store.config().clone()).unwrap()
    }

    pub fn document_path(&self) -> PathBuf {
        self.store.config().document_path.clone()
    }

    /// Raw document text, empty if not yet written
    pub fn document_text(&self) -> String {
        std::fs::read_to_string(self.document_path()).unwrap_or_default()
    }
}

impl Default for TestStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Store layout under `dir` with short lock timings
pub fn test_config(dir: &Path) -> StoreConfig {
    StoreConfig::in_dir(dir)
        .with_lock_timeout(Duration::from_secs(5))
        .with_lock_poll_interval(Duration::from_millis(2))
}

pub fn kubernetes_context(name: &str) -> Context {
    Context::new(name, Target::Kubernetes).with_cluster_opts(ClusterServer {
        endpoint: format!("https://{name}.example:6443"),
        path: "/home/test/.kube/config".into(),
        context: format!("{name}-admin@{name}"),
        is_management_cluster: true,
    })
}

pub fn mission_control_context(name: &str) -> Context {
    Context::new(name, Target::MissionControl).with_global_opts(GlobalServer {
        endpoint: format!("{name}.tmc.example:443"),
        auth: None,
    })
}

pub fn management_cluster_server(name: &str) -> Server {
    Server::from(&kubernetes_context(name))
}

pub fn global_server(name: &str) -> Server {
    let mut server = Server::from(&mission_control_context(name));
    server.server_type = ServerType::Global;
    server
}

pub fn oci_source(name: &str) -> PluginDiscovery {
    PluginDiscovery::oci(name, format!("registry.example/{name}/plugin-inventory:latest"))
}
