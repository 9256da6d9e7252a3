//! Typed configuration records
//!
//! Records decode from and encode to their subtree in the backing document.
//! Optional and empty fields are skipped on encode so that an absent field
//! never clobbers stored data under the merge strategy.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Connection discriminator of a context
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Target {
    /// Kubernetes cluster (the cluster-style connection)
    #[default]
    #[serde(alias = "k8s")]
    Kubernetes,

    /// Mission control endpoint
    #[serde(alias = "tmc")]
    MissionControl,

    /// Tanzu platform endpoint
    Tanzu,
}

impl Target {
    /// All known targets
    pub const ALL: [Self; 3] = [Self::Kubernetes, Self::MissionControl, Self::Tanzu];

    /// Key used in the document
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Kubernetes => "kubernetes",
            Self::MissionControl => "mission-control",
            Self::Tanzu => "tanzu",
        }
    }

    /// Is this the cluster discriminator that carries a server shadow
    #[inline]
    #[must_use]
    pub fn is_cluster(&self) -> bool {
        matches!(self, Self::Kubernetes)
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "kubernetes" | "k8s" => Ok(Self::Kubernetes),
            "mission-control" | "tmc" => Ok(Self::MissionControl),
            "tanzu" => Ok(Self::Tanzu),
            other => Err(format!("unknown target '{other}'")),
        }
    }
}

/// Connection context
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Context {
    /// Unique name
    pub name: String,

    /// Connection discriminator
    #[serde(default)]
    pub target: Target,

    /// Global endpoint options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_opts: Option<GlobalServer>,

    /// Cluster options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_opts: Option<ClusterServer>,

    /// Plugin discovery sources scoped to this context
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub discovery_sources: Vec<PluginDiscovery>,

    /// Free-form metadata
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_metadata: BTreeMap<String, serde_yaml::Value>,
}

impl Context {
    /// Create new context
    #[must_use]
    pub fn new(name: impl Into<String>, target: Target) -> Self {
        Self {
            name: name.into(),
            target,
            ..Self::default()
        }
    }

    /// With cluster options
    #[must_use]
    pub fn with_cluster_opts(mut self, opts: ClusterServer) -> Self {
        self.cluster_opts = Some(opts);
        self
    }

    /// With global options
    #[must_use]
    pub fn with_global_opts(mut self, opts: GlobalServer) -> Self {
        self.global_opts = Some(opts);
        self
    }

    /// With an additional discovery source
    #[must_use]
    pub fn with_discovery_source(mut self, source: PluginDiscovery) -> Self {
        self.discovery_sources.push(source);
        self
    }

    /// With a metadata entry
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_yaml::Value>) -> Self {
        self.additional_metadata.insert(key.into(), value.into());
        self
    }
}

/// Cluster connection options
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClusterServer {
    /// API endpoint
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub endpoint: String,

    /// Kubeconfig path
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,

    /// Kubeconfig context
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context: String,

    /// Whether the cluster is a management cluster
    #[serde(default)]
    pub is_management_cluster: bool,
}

/// Global endpoint options
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalServer {
    /// Endpoint URL
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub endpoint: String,

    /// Authentication material
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<GlobalServerAuth>,
}

/// Authentication material for a global endpoint
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalServerAuth {
    /// Token issuer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// Authenticated user
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,

    /// Access token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// ID token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    /// Refresh token
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Access token expiry (RFC 3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiration: Option<String>,

    /// Authentication type
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub auth_type: Option<String>,
}

/// Legacy server type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerType {
    /// Management cluster
    #[default]
    ManagementCluster,

    /// Global endpoint
    Global,
}

/// Legacy server record
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    /// Unique name
    pub name: String,

    /// Server type
    #[serde(default, rename = "type")]
    pub server_type: ServerType,

    /// Global endpoint options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global_opts: Option<GlobalServer>,

    /// Management cluster options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub management_cluster_opts: Option<ManagementClusterServer>,

    /// Plugin discovery sources scoped to this server
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub discovery_sources: Vec<PluginDiscovery>,
}

impl Server {
    /// Create new server
    #[must_use]
    pub fn new(name: impl Into<String>, server_type: ServerType) -> Self {
        Self {
            name: name.into(),
            server_type,
            ..Self::default()
        }
    }

    /// With management cluster options
    #[must_use]
    pub fn with_management_cluster_opts(mut self, opts: ManagementClusterServer) -> Self {
        self.management_cluster_opts = Some(opts);
        self
    }

    /// With global options
    #[must_use]
    pub fn with_global_opts(mut self, opts: GlobalServer) -> Self {
        self.global_opts = Some(opts);
        self
    }
}

/// Management cluster connection options of a legacy server
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagementClusterServer {
    /// API endpoint
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub endpoint: String,

    /// Kubeconfig path
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,

    /// Kubeconfig context
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub context: String,
}

/// Plugin discovery source
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginDiscovery {
    /// Unique name
    pub name: String,

    /// OCI image discovery
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oci: Option<OciDiscovery>,

    /// Local directory discovery
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local: Option<LocalDiscovery>,
}

impl PluginDiscovery {
    /// OCI image discovery source
    #[must_use]
    pub fn oci(name: impl Into<String>, image: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            oci: Some(OciDiscovery {
                image: image.into(),
            }),
            local: None,
        }
    }

    /// Local directory discovery source
    #[must_use]
    pub fn local(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            oci: None,
            local: Some(LocalDiscovery { path: path.into() }),
        }
    }
}

/// OCI image discovery
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OciDiscovery {
    /// Inventory image reference
    pub image: String,
}

/// Local directory discovery
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LocalDiscovery {
    /// Directory path
    pub path: String,
}

/// Named group of plugins
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginGroup {
    /// Unique name
    pub name: String,

    /// Group version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Human readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Member plugin names
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plugins: Vec<String>,
}

/// Essential plugin pinned by the CLI
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Essential {
    /// Unique name
    pub name: String,

    /// Pinned version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Image reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Essential plugin group pinned by the CLI
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorePluginGroup {
    /// Unique name
    pub name: String,

    /// Pinned version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Image reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// Legacy server projection of a context
impl From<&Context> for Server {
    fn from(ctx: &Context) -> Self {
        let server_type = if ctx.target.is_cluster() {
            ServerType::ManagementCluster
        } else {
            ServerType::Global
        };
        Self {
            name: ctx.name.clone(),
            server_type,
            global_opts: ctx.global_opts.clone(),
            management_cluster_opts: ctx.cluster_opts.as_ref().map(|c| ManagementClusterServer {
                endpoint: c.endpoint.clone(),
                path: c.path.clone(),
                context: c.context.clone(),
            }),
            discovery_sources: ctx.discovery_sources.clone(),
        }
    }
}

/// Context projection of a legacy server
impl From<&Server> for Context {
    fn from(server: &Server) -> Self {
        let target = match server.server_type {
            ServerType::ManagementCluster => Target::Kubernetes,
            ServerType::Global => Target::MissionControl,
        };
        Self {
            name: server.name.clone(),
            target,
            global_opts: server.global_opts.clone(),
            cluster_opts: server.management_cluster_opts.as_ref().map(|m| ClusterServer {
                endpoint: m.endpoint.clone(),
                path: m.path.clone(),
                context: m.context.clone(),
                is_management_cluster: true,
            }),
            discovery_sources: server.discovery_sources.clone(),
            additional_metadata: BTreeMap::new(),
        }
    }
}
