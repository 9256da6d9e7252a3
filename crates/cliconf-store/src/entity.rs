//! Entity repositories
//!
//! [`Entity`] binds a typed record to its collection in the document. The
//! read helpers here work on any parsed tree, so they serve both the unlocked
//! read path and lookups made inside a locked session.

use crate::error::{ConfigError, Result};
use crate::types::{Context, CorePluginGroup, Essential, PluginDiscovery, PluginGroup, Server};
use cliconf_tree::{decode, find_entity, locate, KeyPath, Node, NodeKind};
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Named record stored in a collection
pub trait Entity: Serialize + DeserializeOwned + Clone {
    /// Display name of the entity kind
    const KIND: &'static str;

    /// Key names from the root to the collection sequence
    const COLLECTION: &'static [&'static str];

    /// Unique name within the collection
    fn name(&self) -> &str;

    /// Path of the owning collection
    #[must_use]
    fn collection() -> KeyPath {
        KeyPath::of(Self::COLLECTION, NodeKind::Sequence)
    }
}

/// Entity with no derived writes, safe for the generic set and delete
/// operations
///
/// Contexts and servers are excluded because every write to them must also
/// keep the other generation in sync.
pub trait PlainEntity: Entity {}

macro_rules! entity {
    ($ty:ty, $kind:literal, [$($seg:literal),+], plain) => {
        entity!($ty, $kind, [$($seg),+]);
        impl PlainEntity for $ty {}
    };
    ($ty:ty, $kind:literal, [$($seg:literal),+]) => {
        impl Entity for $ty {
            const KIND: &'static str = $kind;
            const COLLECTION: &'static [&'static str] = &[$($seg),+];

            fn name(&self) -> &str {
                &self.name
            }
        }
    };
}

entity!(Context, "context", ["contexts"]);
entity!(Server, "server", ["servers"]);
entity!(PluginGroup, "plugin group", ["clientOptions", "cli", "pluginGroups"], plain);
entity!(Essential, "essential", ["clientOptions", "cli", "essentials"], plain);
entity!(CorePluginGroup, "core plugin group", ["clientOptions", "cli", "essentialPluginGroups"], plain);
entity!(PluginDiscovery, "discovery source", ["clientOptions", "cli", "discoverySources"], plain);

fn collection<E: Entity>(root: &Node) -> Option<&[Node]> {
    locate(root, &E::collection())?.as_sequence().map(Vec::as_slice)
}

/// Decode the entity named `name`
///
/// # Errors
/// Returns [`ConfigError::NotFound`] if the collection or entity is absent,
/// or a codec error if the stored subtree does not decode
pub(crate) fn find<E: Entity>(root: &Node, name: &str) -> Result<E> {
    let items = collection::<E>(root).ok_or_else(|| ConfigError::not_found(E::KIND, name))?;
    let idx = find_entity(items, name).ok_or_else(|| ConfigError::not_found(E::KIND, name))?;
    Ok(decode(&items[idx])?)
}

/// Does an entity named `name` exist
pub(crate) fn contains<E: Entity>(root: &Node, name: &str) -> bool {
    collection::<E>(root).is_some_and(|items| find_entity(items, name).is_some())
}

/// Decode every entity in document order
///
/// Entries that fail to decode are skipped with a warning, since other tool
/// generations may have written shapes this one does not understand.
pub(crate) fn list<E: Entity>(root: &Node) -> Vec<E> {
    let Some(items) = collection::<E>(root) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match decode::<E>(item) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(
                    kind = E::KIND,
                    name = item.entity_name().unwrap_or_default(),
                    error = %e,
                    "skipping undecodable entry"
                );
                None
            }
        })
        .collect()
}
