//! Context-server synchronizer
//!
//! Every logical mutation of a context or a legacy server is expressed as a
//! [`ChangeSet`]: the primary write plus each derived write (shadow entity,
//! selection pointers). The store applies a change set inside one lock
//! acquisition and commits it with one atomic write, so readers never observe
//! a context without its shadow.

use crate::document::Session;
use crate::entity::{contains, find};
use crate::error::{ConfigError, Result};
use crate::pointers::{current_context_path, current_server_path, targets_selecting};
use crate::types::{Context, Server, Target};
use cliconf_tree::get_scalar;

/// One write of a change set
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    /// Insert or reconcile a context
    UpsertContext(Context),

    /// Insert or reconcile a legacy server
    UpsertServer(Server),

    /// Remove a context
    RemoveContext {
        /// Context name
        name: String,
        /// Fail with not found when absent
        required: bool,
    },

    /// Remove a legacy server
    RemoveServer {
        /// Server name
        name: String,
        /// Fail with not found when absent
        required: bool,
    },

    /// Select an existing context for its target; a kubernetes context also
    /// selects the name-aligned server when one exists
    SetCurrentContext {
        /// Context name
        name: String,
    },

    /// Select an existing server; also selects the name-aligned context for
    /// its target when one exists
    SetCurrentServer {
        /// Server name
        name: String,
    },

    /// Drop every context pointer naming `name`
    ClearCurrentContext {
        /// Context name
        name: String,
    },

    /// Drop the context pointer of `target`, and for kubernetes the server
    /// pointer naming the same entity
    ClearCurrentTarget {
        /// Connection discriminator
        target: Target,
    },

    /// Drop the server pointer if it names `name`
    ClearCurrentServer {
        /// Server name
        name: String,
    },
}

impl Change {
    /// Apply to the session, returning whether the tree changed
    ///
    /// # Errors
    /// Returns error if a required entity is absent or a write fails
    pub fn apply(self, session: &mut Session<'_>) -> Result<bool> {
        match self {
            Self::UpsertContext(ctx) => session.upsert(&ctx),
            Self::UpsertServer(server) => session.upsert(&server),
            Self::RemoveContext { name, required } => {
                let removed = session.remove::<Context>(&name);
                if required && !removed {
                    return Err(ConfigError::not_found("context", name));
                }
                Ok(removed)
            }
            Self::RemoveServer { name, required } => {
                let removed = session.remove::<Server>(&name);
                if required && !removed {
                    return Err(ConfigError::not_found("server", name));
                }
                Ok(removed)
            }
            Self::SetCurrentContext { name } => {
                let ctx: Context = find(session.root(), &name)?;
                let mut changed = session.set_scalar(&current_context_path(ctx.target), &name)?;
                if ctx.target.is_cluster() && contains::<Server>(session.root(), &name) {
                    changed |= session.set_scalar(&current_server_path(), &name)?;
                }
                Ok(changed)
            }
            Self::SetCurrentServer { name } => {
                if !contains::<Server>(session.root(), &name) {
                    return Err(ConfigError::not_found("server", name));
                }
                let mut changed = session.set_scalar(&current_server_path(), &name)?;
                if contains::<Context>(session.root(), &name) {
                    let ctx: Context = find(session.root(), &name)?;
                    changed |= session.set_scalar(&current_context_path(ctx.target), &name)?;
                }
                Ok(changed)
            }
            Self::ClearCurrentContext { name } => {
                let mut changed = false;
                for target in targets_selecting(session.root(), &name) {
                    changed |= session.remove_key(&current_context_path(target));
                }
                Ok(changed)
            }
            Self::ClearCurrentTarget { target } => {
                let path = current_context_path(target);
                let selected = get_scalar(session.root(), &path).map(str::to_owned);
                let mut changed = session.remove_key(&path);
                if let Some(name) = selected.filter(|_| target.is_cluster()) {
                    changed |= clear_server_pointer(session, &name);
                }
                Ok(changed)
            }
            Self::ClearCurrentServer { name } => Ok(clear_server_pointer(session, &name)),
        }
    }
}

fn clear_server_pointer(session: &mut Session<'_>, name: &str) -> bool {
    let path = current_server_path();
    if get_scalar(session.root(), &path) == Some(name) {
        session.remove_key(&path)
    } else {
        false
    }
}

/// Outcome of applying a [`ChangeSet`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SyncReport {
    /// Whether the document changed
    pub changed: bool,

    /// Number of steps that modified the tree
    pub steps_applied: usize,
}

/// Ordered writes of one logical operation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChangeSet {
    changes: Vec<Change>,
}

impl ChangeSet {
    /// Create empty change set
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a change
    pub fn push(&mut self, change: Change) {
        self.changes.push(change);
    }

    /// Append a change, builder style
    #[must_use]
    pub fn with(mut self, change: Change) -> Self {
        self.push(change);
        self
    }

    /// Number of changes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Check if empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Changes in application order
    pub fn iter(&self) -> impl Iterator<Item = &Change> {
        self.changes.iter()
    }

    /// Upsert a context, its server shadow for kubernetes, and optionally
    /// select it
    #[must_use]
    pub fn for_set_context(ctx: Context, set_current: bool) -> Self {
        let mut set = Self::new();
        let name = ctx.name.clone();
        let shadow = ctx.target.is_cluster().then(|| Server::from(&ctx));
        set.push(Change::UpsertContext(ctx));
        if let Some(server) = shadow {
            set.push(Change::UpsertServer(server));
        }
        if set_current {
            set.push(Change::SetCurrentContext { name });
        }
        set
    }

    /// Upsert a legacy server, its context shadow, and optionally select it
    #[must_use]
    pub fn for_set_server(server: Server, set_current: bool) -> Self {
        let name = server.name.clone();
        let shadow = Context::from(&server);
        let mut set = Self::new()
            .with(Change::UpsertServer(server))
            .with(Change::UpsertContext(shadow));
        if set_current {
            set.push(Change::SetCurrentServer { name });
        }
        set
    }

    /// Remove a context, its pointers, its server shadow and the server
    /// pointer
    #[must_use]
    pub fn for_remove_context(name: &str) -> Self {
        Self::new()
            .with(Change::ClearCurrentContext { name: name.to_string() })
            .with(Change::RemoveContext {
                name: name.to_string(),
                required: true,
            })
            .with(Change::RemoveServer {
                name: name.to_string(),
                required: false,
            })
            .with(Change::ClearCurrentServer { name: name.to_string() })
    }

    /// Remove a legacy server, its pointer, its context shadow and the
    /// context pointers
    #[must_use]
    pub fn for_remove_server(name: &str) -> Self {
        Self::new()
            .with(Change::ClearCurrentServer { name: name.to_string() })
            .with(Change::RemoveServer {
                name: name.to_string(),
                required: true,
            })
            .with(Change::RemoveContext {
                name: name.to_string(),
                required: false,
            })
            .with(Change::ClearCurrentContext { name: name.to_string() })
    }

    /// Apply every change in order
    ///
    /// Stops at the first failing change; the caller discards the session so
    /// nothing is committed.
    ///
    /// # Errors
    /// Returns the first change error
    pub fn apply(self, session: &mut Session<'_>) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        for change in self.changes {
            if change.apply(session)? {
                report.steps_applied += 1;
                report.changed = true;
            }
        }
        Ok(report)
    }
}

impl IntoIterator for ChangeSet {
    type Item = Change;
    type IntoIter = std::vec::IntoIter<Change>;

    fn into_iter(self) -> Self::IntoIter {
        self.changes.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::list;
    use crate::pointers::{current_context, current_server};
    use crate::types::{ClusterServer, ServerType};
    use cliconf_merge::StrategyTable;
    use cliconf_tree::Node;

    fn kube(name: &str) -> Context {
        Context::new(name, Target::Kubernetes).with_cluster_opts(ClusterServer {
            endpoint: format!("https://{name}"),
            path: "/kube".into(),
            context: format!("admin@{name}"),
            is_management_cluster: true,
        })
    }

    fn run(root: Node, set: ChangeSet) -> (Node, Result<SyncReport>) {
        let table = StrategyTable::new();
        let mut session = Session::new(root, &table);
        let report = set.apply(&mut session);
        (session.into_root(), report)
    }

    #[test]
    fn set_kubernetes_context_derives_server() {
        let (root, report) = run(Node::mapping(), ChangeSet::for_set_context(kube("mgmt"), true));
        let report = report.unwrap();
        assert!(report.changed);
        assert_eq!(report.steps_applied, 3);

        let server: Server = find(&root, "mgmt").unwrap();
        assert_eq!(server.server_type, ServerType::ManagementCluster);
        assert_eq!(current_context(&root, Target::Kubernetes).unwrap().name, "mgmt");
        assert_eq!(current_server(&root).unwrap().name, "mgmt");
    }

    #[test]
    fn set_mission_control_context_has_no_shadow() {
        let ctx = Context::new("saas", Target::MissionControl);
        let set = ChangeSet::for_set_context(ctx, true);
        assert_eq!(set.len(), 2);

        let (root, report) = run(Node::mapping(), set);
        report.unwrap();
        assert!(list::<Server>(&root).is_empty());
        assert!(current_server(&root).is_err());
        assert_eq!(current_context(&root, Target::MissionControl).unwrap().name, "saas");
    }

    #[test]
    fn reapplying_is_a_noop() {
        let (root, _) = run(Node::mapping(), ChangeSet::for_set_context(kube("mgmt"), true));
        let (_, report) = run(root, ChangeSet::for_set_context(kube("mgmt"), true));
        assert_eq!(report.unwrap(), SyncReport::default());
    }

    #[test]
    fn remove_context_removes_shadow_and_pointers() {
        let (root, _) = run(Node::mapping(), ChangeSet::for_set_context(kube("mgmt"), true));
        let (root, report) = run(root, ChangeSet::for_remove_context("mgmt"));
        assert!(report.unwrap().changed);

        assert!(list::<Context>(&root).is_empty());
        assert!(list::<Server>(&root).is_empty());
        assert!(current_context(&root, Target::Kubernetes).unwrap_err().is_not_found());
        assert!(current_server(&root).unwrap_err().is_not_found());
    }

    #[test]
    fn remove_missing_context_is_not_found() {
        let (_, report) = run(Node::mapping(), ChangeSet::for_remove_context("ghost"));
        assert!(report.unwrap_err().is_not_found());
    }

    #[test]
    fn set_server_derives_context() {
        let server = Server::from(&kube("legacy"));
        let (root, report) = run(Node::mapping(), ChangeSet::for_set_server(server, true));
        report.unwrap();

        let ctx: Context = find(&root, "legacy").unwrap();
        assert_eq!(ctx.target, Target::Kubernetes);
        assert_eq!(current_context(&root, Target::Kubernetes).unwrap().name, "legacy");
        assert_eq!(current_server(&root).unwrap().name, "legacy");
    }

    #[test]
    fn remove_server_removes_context_shadow() {
        let (root, _) = run(Node::mapping(), ChangeSet::for_set_context(kube("mgmt"), true));
        let (root, report) = run(root, ChangeSet::for_remove_server("mgmt"));
        report.unwrap();
        assert!(list::<Context>(&root).is_empty());
        assert!(current_context(&root, Target::Kubernetes).is_err());
    }

    #[test]
    fn select_missing_context_fails() {
        let set = ChangeSet::new().with(Change::SetCurrentContext { name: "nope".into() });
        let (_, report) = run(Node::mapping(), set);
        assert!(report.unwrap_err().is_not_found());
    }

    #[test]
    fn clear_target_drops_server_pointer() {
        let (root, _) = run(Node::mapping(), ChangeSet::for_set_context(kube("mgmt"), true));
        let set = ChangeSet::new().with(Change::ClearCurrentTarget {
            target: Target::Kubernetes,
        });
        let (root, report) = run(root, set);
        assert_eq!(report.unwrap().steps_applied, 1);
        assert!(current_server(&root).is_err());
        assert_eq!(list::<Server>(&root).len(), 1);
    }
}
