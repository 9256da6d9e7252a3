//! CLI configuration store
//!
//! Persists connection contexts, legacy servers and plugin metadata in one
//! YAML document shared by several generations of the CLI:
//! - Every mutation is a locked read-modify-write with an atomic commit
//! - Entities are reconciled field by field through the patch-merge engine
//! - Context and server records are kept in sync through change sets
//! - Unknown fields and unchanged values are never rewritten
//!
//! # Example
//!
//! ```rust,no_run
//! use cliconf_store::{ClusterServer, ConfigStore, Context, StoreConfig, Target};
//!
//! # fn example() -> cliconf_store::Result<()> {
//! let store = ConfigStore::open(StoreConfig::in_dir("/home/me/.config/cli"))?;
//!
//! let ctx = Context::new("mgmt", Target::Kubernetes).with_cluster_opts(ClusterServer {
//!     path: "/home/me/.kube/config".into(),
//!     context: "admin@mgmt".into(),
//!     ..ClusterServer::default()
//! });
//! let report = store.set_context(&ctx, true)?;
//! assert!(report.changed);
//! assert_eq!(store.get_current_server()?.name, "mgmt");
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![warn(missing_docs)]

// Core modules
pub mod config;
pub mod document;
pub mod entity;
pub mod error;
pub mod lock;
pub mod pointers;
pub mod sync;
pub mod types;

mod options;
mod store;

// Re-exports for convenience
pub use config::StoreConfig;
pub use document::{Document, Session};
pub use entity::{Entity, PlainEntity};
pub use error::{ConfigError, Result};
pub use lock::FileLock;
pub use store::ConfigStore;
pub use sync::{Change, ChangeSet, SyncReport};
pub use types::{
    ClusterServer, Context, CorePluginGroup, Essential, GlobalServer, GlobalServerAuth,
    LocalDiscovery, ManagementClusterServer, OciDiscovery, PluginDiscovery, PluginGroup, Server,
    ServerType, Target,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the configuration store
    pub use crate::{
        ChangeSet, ConfigError, ConfigStore, Context, Entity, Server, StoreConfig, SyncReport,
        Target,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
