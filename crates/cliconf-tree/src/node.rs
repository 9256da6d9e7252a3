//! Document tree nodes
//!
//! Provides [`Node`], a closed tagged-variant tree that mirrors a YAML document
//! while keeping the per-scalar formatting hint needed to re-emit unchanged
//! values exactly as they were read.

use serde_yaml::{Mapping as YamlMapping, Number, Value};
use std::fmt::{self, Display, Formatter};

/// Key under which every entity record stores its identity
pub const NAME_KEY: &str = "name";

/// Kind of a tree node, used by key paths to declare what each step expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// Ordered key/value pairs
    Mapping,

    /// Ordered list of nodes
    Sequence,

    /// Leaf value
    Scalar,
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Mapping => "mapping",
            Self::Sequence => "sequence",
            Self::Scalar => "scalar",
        };
        f.write_str(s)
    }
}

/// YAML type a scalar was read with
///
/// Decides how the scalar is emitted: a `Str` whose text looks like a number
/// is re-emitted quoted, an `Int` is re-emitted plain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ScalarKind {
    /// `~` / `null` / empty
    Null,

    /// `true` / `false`
    Bool,

    /// Integer literal
    Int,

    /// Floating point literal
    Float,

    /// String (quoted or plain)
    #[default]
    Str,
}

/// Leaf value plus its formatting hint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Scalar {
    value: String,
    kind: ScalarKind,
    tag: Option<String>,
}

impl Scalar {
    /// Create a string scalar
    #[inline]
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            kind: ScalarKind::Str,
            tag: None,
        }
    }

    /// Create a scalar with an explicit kind
    #[inline]
    #[must_use]
    pub fn with_kind(value: impl Into<String>, kind: ScalarKind) -> Self {
        Self {
            value: value.into(),
            kind,
            tag: None,
        }
    }

    /// Null scalar
    #[inline]
    #[must_use]
    pub fn null() -> Self {
        Self::with_kind("", ScalarKind::Null)
    }

    /// Attach an explicit YAML tag (`!tag value`)
    #[inline]
    #[must_use]
    pub fn tagged(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Textual value
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Formatting hint
    #[inline]
    #[must_use]
    pub fn kind(&self) -> ScalarKind {
        self.kind
    }

    /// Explicit tag, if any
    #[inline]
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Is this a null scalar
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        self.kind == ScalarKind::Null
    }

    fn to_value(&self) -> Value {
        let plain = match self.kind {
            ScalarKind::Null => Value::Null,
            ScalarKind::Bool => match self.value.as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                other => Value::String(other.to_string()),
            },
            ScalarKind::Int => {
                if let Ok(i) = self.value.parse::<i64>() {
                    Value::Number(Number::from(i))
                } else if let Ok(u) = self.value.parse::<u64>() {
                    Value::Number(Number::from(u))
                } else {
                    Value::String(self.value.clone())
                }
            }
            ScalarKind::Float => parse_float(&self.value)
                .map_or_else(|| Value::String(self.value.clone()), |f| Value::Number(Number::from(f))),
            ScalarKind::Str => Value::String(self.value.clone()),
        };

        match &self.tag {
            Some(tag) if !tag.is_empty() => Value::Tagged(Box::new(serde_yaml::value::TaggedValue {
                tag: serde_yaml::value::Tag::new(tag.clone()),
                value: plain,
            })),
            _ => plain,
        }
    }
}

/// Parse a float as `serde_yaml` prints it, including the non-finite forms
fn parse_float(text: &str) -> Option<f64> {
    match text {
        ".inf" | "+.inf" => Some(f64::INFINITY),
        "-.inf" => Some(f64::NEG_INFINITY),
        ".nan" => Some(f64::NAN),
        other => other.parse().ok(),
    }
}

impl Display for Scalar {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Self::string(value)
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Self::string(value)
    }
}

/// Ordered mapping of scalar keys to nodes
///
/// Insertion order is document order and is preserved across edits.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Mapping {
    entries: Vec<(Scalar, Node)>,
}

impl Mapping {
    /// Create empty mapping
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if mapping is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Get value by key
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Node> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_str() == key)
            .map(|(_, v)| v)
    }

    /// Get mutable value by key
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Node> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k.as_str() == key)
            .map(|(_, v)| v)
    }

    /// Check if key is present
    #[inline]
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Insert or overwrite a value, keeping the position of an existing key
    ///
    /// Returns the previous value, if any.
    pub fn insert(&mut self, key: impl Into<Scalar>, value: Node) -> Option<Node> {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| k.as_str() == key.as_str()) {
            Some((_, slot)) => Some(std::mem::replace(slot, value)),
            None => {
                self.entries.push((key, value));
                None
            }
        }
    }

    /// Remove a key, returning its value
    pub fn remove(&mut self, key: &str) -> Option<Node> {
        let idx = self.entries.iter().position(|(k, _)| k.as_str() == key)?;
        Some(self.entries.remove(idx).1)
    }

    /// Get the value for `key`, inserting `default()` first if absent
    pub fn get_or_insert_with(&mut self, key: &str, default: impl FnOnce() -> Node) -> &mut Node {
        let idx = match self.entries.iter().position(|(k, _)| k.as_str() == key) {
            Some(idx) => idx,
            None => {
                self.entries.push((Scalar::string(key), default()));
                self.entries.len() - 1
            }
        };
        &mut self.entries[idx].1
    }

    /// Iterate entries in document order
    pub fn iter(&self) -> impl Iterator<Item = (&Scalar, &Node)> {
        self.entries.iter().map(|(k, v)| (k, v))
    }

    /// Iterate entries mutably in document order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&Scalar, &mut Node)> {
        self.entries.iter_mut().map(|(k, v)| (&*k, v))
    }

    /// Iterate keys in document order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }
}

impl IntoIterator for Mapping {
    type Item = (Scalar, Node);
    type IntoIter = std::vec::IntoIter<(Scalar, Node)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl FromIterator<(Scalar, Node)> for Mapping {
    fn from_iter<I: IntoIterator<Item = (Scalar, Node)>>(iter: I) -> Self {
        let mut mapping = Self::new();
        for (k, v) in iter {
            mapping.insert(k, v);
        }
        mapping
    }
}

/// Collection carrying an explicit YAML tag (`!tag {..}`)
///
/// Tagged scalars keep their tag on [`Scalar`]; only mappings and sequences
/// are wrapped here.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedNode {
    tag: String,
    node: Node,
}

impl TaggedNode {
    /// Tag without the leading `!`
    #[inline]
    #[must_use]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Wrapped collection
    #[inline]
    #[must_use]
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Mutable wrapped collection
    #[inline]
    pub fn node_mut(&mut self) -> &mut Node {
        &mut self.node
    }
}

/// Document tree node
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Ordered key/value pairs
    Mapping(Mapping),

    /// Ordered list of nodes
    Sequence(Vec<Node>),

    /// Leaf value
    Scalar(Scalar),

    /// Tagged mapping or sequence
    ///
    /// Accessors see through the tag, so a tagged collection is read and
    /// edited like an untagged one and re-emitted with its tag.
    Tagged(Box<TaggedNode>),
}

impl Node {
    /// Empty mapping node
    #[inline]
    #[must_use]
    pub fn mapping() -> Self {
        Self::Mapping(Mapping::new())
    }

    /// Empty sequence node
    #[inline]
    #[must_use]
    pub fn sequence() -> Self {
        Self::Sequence(Vec::new())
    }

    /// String scalar node
    #[inline]
    #[must_use]
    pub fn string(value: impl Into<String>) -> Self {
        Self::Scalar(Scalar::string(value))
    }

    /// Wrap a collection in an explicit tag
    #[must_use]
    pub fn tagged(tag: impl Into<String>, node: Node) -> Self {
        Self::Tagged(Box::new(TaggedNode {
            tag: tag.into(),
            node,
        }))
    }

    /// Explicit tag of this node, if any
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        match self {
            Self::Tagged(t) => Some(t.tag()),
            Self::Scalar(s) => s.tag(),
            _ => None,
        }
    }

    /// Empty node of the given kind
    #[must_use]
    pub fn empty(kind: NodeKind) -> Self {
        match kind {
            NodeKind::Mapping => Self::mapping(),
            NodeKind::Sequence => Self::sequence(),
            NodeKind::Scalar => Self::Scalar(Scalar::null()),
        }
    }

    /// Kind of this node
    #[inline]
    #[must_use]
    pub fn kind(&self) -> NodeKind {
        match self {
            Self::Mapping(_) => NodeKind::Mapping,
            Self::Sequence(_) => NodeKind::Sequence,
            Self::Scalar(_) => NodeKind::Scalar,
            Self::Tagged(t) => t.node.kind(),
        }
    }

    /// Borrow as mapping
    #[inline]
    #[must_use]
    pub fn as_mapping(&self) -> Option<&Mapping> {
        match self {
            Self::Mapping(m) => Some(m),
            Self::Tagged(t) => t.node.as_mapping(),
            _ => None,
        }
    }

    /// Borrow as mutable mapping
    #[inline]
    pub fn as_mapping_mut(&mut self) -> Option<&mut Mapping> {
        match self {
            Self::Mapping(m) => Some(m),
            Self::Tagged(t) => t.node.as_mapping_mut(),
            _ => None,
        }
    }

    /// Borrow as sequence
    #[inline]
    #[must_use]
    pub fn as_sequence(&self) -> Option<&Vec<Node>> {
        match self {
            Self::Sequence(s) => Some(s),
            Self::Tagged(t) => t.node.as_sequence(),
            _ => None,
        }
    }

    /// Borrow as mutable sequence
    #[inline]
    pub fn as_sequence_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Self::Sequence(s) => Some(s),
            Self::Tagged(t) => t.node.as_sequence_mut(),
            _ => None,
        }
    }

    /// Borrow as scalar
    #[inline]
    #[must_use]
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Self::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Textual value of a non-null scalar
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        self.as_scalar().filter(|s| !s.is_null()).map(Scalar::as_str)
    }

    /// Name of an entity record (a mapping with a non-empty `name` scalar)
    #[must_use]
    pub fn entity_name(&self) -> Option<&str> {
        self.as_mapping()?
            .get(NAME_KEY)?
            .as_str()
            .filter(|name| !name.is_empty())
    }

    /// Is this node null or an empty collection
    #[must_use]
    pub fn is_empty_value(&self) -> bool {
        match self {
            Self::Mapping(m) => m.is_empty(),
            Self::Sequence(s) => s.is_empty(),
            Self::Scalar(s) => s.is_null(),
            Self::Tagged(_) => false,
        }
    }

    /// Convert a parsed YAML value into a tree
    ///
    /// Keys are kept as parsed: `1` and `'1'` are distinct entries even though
    /// both answer a lookup for `"1"`.
    ///
    /// # Errors
    /// Returns error if a mapping key is not a scalar
    pub fn from_value(value: Value) -> Result<Self, NodeError> {
        Ok(match value {
            Value::Null => Self::Scalar(Scalar::null()),
            Value::Bool(b) => Self::Scalar(Scalar::with_kind(b.to_string(), ScalarKind::Bool)),
            Value::Number(n) => {
                let kind = if n.is_f64() {
                    ScalarKind::Float
                } else {
                    ScalarKind::Int
                };
                Self::Scalar(Scalar::with_kind(n.to_string(), kind))
            }
            Value::String(s) => Self::Scalar(Scalar::string(s)),
            Value::Sequence(items) => Self::Sequence(
                items
                    .into_iter()
                    .map(Self::from_value)
                    .collect::<Result<_, _>>()?,
            ),
            Value::Mapping(map) => {
                let mut mapping = Mapping::new();
                for (k, v) in map {
                    let key = match Self::from_value(k)? {
                        Self::Scalar(s) => s,
                        other => return Err(NodeError::NonScalarKey(other.kind())),
                    };
                    mapping.entries.push((key, Self::from_value(v)?));
                }
                Self::Mapping(mapping)
            }
            Value::Tagged(tagged) => {
                let tag = tagged.tag.to_string();
                let tag = tag.trim_start_matches('!').to_string();
                match Self::from_value(tagged.value)? {
                    Self::Scalar(s) => Self::Scalar(s.tagged(tag)),
                    collection => Self::tagged(tag, collection),
                }
            }
        })
    }

    /// Convert the tree back into a YAML value
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Scalar(s) => s.to_value(),
            Self::Sequence(items) => Value::Sequence(items.iter().map(Self::to_value).collect()),
            Self::Mapping(m) => {
                let mut map = YamlMapping::with_capacity(m.len());
                for (k, v) in m.iter() {
                    map.insert(k.to_value(), v.to_value());
                }
                Value::Mapping(map)
            }
            Self::Tagged(t) => Value::Tagged(Box::new(serde_yaml::value::TaggedValue {
                tag: serde_yaml::value::Tag::new(t.tag.clone()),
                value: t.node.to_value(),
            })),
        }
    }

    /// Parse a YAML document whose root must be a mapping
    ///
    /// Empty input yields an empty root mapping.
    ///
    /// # Errors
    /// Returns error if the text is not valid YAML or the root is not a mapping
    pub fn parse_document(text: &str) -> Result<Self, NodeError> {
        if text.trim().is_empty() {
            return Ok(Self::mapping());
        }
        let value: Value = serde_yaml::from_str(text).map_err(NodeError::InvalidYaml)?;
        match Self::from_value(value)? {
            root @ Self::Mapping(_) => Ok(root),
            Self::Scalar(s) if s.is_null() => Ok(Self::mapping()),
            other => Err(NodeError::RootNotMapping(other.kind())),
        }
    }

    /// Serialize the tree as a YAML document
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_yaml(&self) -> Result<String, NodeError> {
        serde_yaml::to_string(&self.to_value()).map_err(NodeError::InvalidYaml)
    }
}

impl From<Mapping> for Node {
    fn from(mapping: Mapping) -> Self {
        Self::Mapping(mapping)
    }
}

impl From<Scalar> for Node {
    fn from(scalar: Scalar) -> Self {
        Self::Scalar(scalar)
    }
}

/// Tree conversion errors
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// Document text is not valid YAML
    #[error("invalid YAML: {0}")]
    InvalidYaml(#[source] serde_yaml::Error),

    /// Mapping key is a collection
    #[error("unsupported {0} used as mapping key")]
    NonScalarKey(NodeKind),

    /// Document root is not a mapping
    #[error("document root must be a mapping, found {0}")]
    RootNotMapping(NodeKind),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_document() {
        let root = Node::parse_document("").unwrap();
        assert_eq!(root, Node::mapping());

        let root = Node::parse_document("~\n").unwrap();
        assert_eq!(root, Node::mapping());
    }

    #[test]
    fn parse_rejects_non_mapping_root() {
        let err = Node::parse_document("- a\n- b\n").unwrap_err();
        assert!(matches!(err, NodeError::RootNotMapping(NodeKind::Sequence)));
    }

    #[test]
    fn parse_rejects_garbage() {
        let err = Node::parse_document("a: [unclosed").unwrap_err();
        assert!(matches!(err, NodeError::InvalidYaml(_)));
    }

    #[test]
    fn scalar_kinds_survive_round_trip() {
        let text = "port: 8080\nquoted: \"8080\"\nflag: true\nratio: 0.5\nnothing: null\nlimit: .inf\nfloor: -.inf\nunknown: .nan\n";
        let root = Node::parse_document(text).unwrap();
        let map = root.as_mapping().unwrap();

        assert_eq!(map.get("port").unwrap().as_scalar().unwrap().kind(), ScalarKind::Int);
        assert_eq!(map.get("quoted").unwrap().as_scalar().unwrap().kind(), ScalarKind::Str);
        assert_eq!(map.get("flag").unwrap().as_scalar().unwrap().kind(), ScalarKind::Bool);
        assert_eq!(map.get("ratio").unwrap().as_scalar().unwrap().kind(), ScalarKind::Float);
        assert!(map.get("nothing").unwrap().as_scalar().unwrap().is_null());
        for key in ["limit", "floor", "unknown"] {
            assert_eq!(map.get(key).unwrap().as_scalar().unwrap().kind(), ScalarKind::Float);
        }

        let emitted = root.to_yaml().unwrap();
        let reparsed = Node::parse_document(&emitted).unwrap();
        assert_eq!(root, reparsed);
        assert!(emitted.contains("port: 8080"));
        assert!(emitted.contains("quoted: '8080'"));
        assert!(emitted.contains("limit: .inf"), "{emitted}");
        assert!(emitted.contains("floor: -.inf"), "{emitted}");
        assert!(emitted.contains("unknown: .nan"), "{emitted}");
    }

    #[test]
    fn keys_of_different_kinds_stay_distinct() {
        let root = Node::parse_document("ports:\n  1: int-key\n  '1': str-key\n").unwrap();
        let ports = root.as_mapping().unwrap().get("ports").unwrap().as_mapping().unwrap();
        assert_eq!(ports.len(), 2);
        assert_eq!(ports.get("1"), Some(&Node::string("int-key")));

        let emitted = root.to_yaml().unwrap();
        assert!(emitted.contains("1: int-key"), "{emitted}");
        assert!(emitted.contains("'1': str-key"), "{emitted}");
        assert_eq!(Node::parse_document(&emitted).unwrap(), root);
    }

    #[test]
    fn tagged_collections_survive() {
        let root = Node::parse_document("vendor: !Ext {a: 1}\nitems: !List [x, y]\n").unwrap();
        let map = root.as_mapping().unwrap();

        let vendor = map.get("vendor").unwrap();
        assert_eq!(vendor.tag(), Some("Ext"));
        assert_eq!(vendor.kind(), NodeKind::Mapping);
        assert_eq!(vendor.as_mapping().unwrap().get("a").unwrap().as_str(), Some("1"));

        let items = map.get("items").unwrap();
        assert_eq!(items.tag(), Some("List"));
        assert_eq!(items.as_sequence().unwrap().len(), 2);

        let emitted = root.to_yaml().unwrap();
        assert!(emitted.contains("!Ext"), "{emitted}");
        assert!(emitted.contains("!List"), "{emitted}");
        assert_eq!(Node::parse_document(&emitted).unwrap(), root);
    }

    #[test]
    fn mapping_preserves_key_order() {
        let root = Node::parse_document("zeta: 1\nalpha: 2\nmid: 3\n").unwrap();
        let keys: Vec<_> = root.as_mapping().unwrap().keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn mapping_insert_keeps_position() {
        let mut map = Mapping::new();
        map.insert("a", Node::string("1"));
        map.insert("b", Node::string("2"));
        let prev = map.insert("a", Node::string("3"));

        assert_eq!(prev, Some(Node::string("1")));
        let keys: Vec<_> = map.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(map.get("a"), Some(&Node::string("3")));
    }

    #[test]
    fn tagged_scalar_survives() {
        let root = Node::parse_document("secret: !vault abc\n").unwrap();
        let scalar = root.as_mapping().unwrap().get("secret").unwrap().as_scalar().unwrap().clone();
        assert_eq!(scalar.tag(), Some("vault"));
        assert_eq!(scalar.as_str(), "abc");

        let reparsed = Node::parse_document(&root.to_yaml().unwrap()).unwrap();
        assert_eq!(root, reparsed);
    }

    #[test]
    fn entity_name_requires_non_empty() {
        let root = Node::parse_document("name: ctx\n").unwrap();
        assert_eq!(root.entity_name(), Some("ctx"));

        let root = Node::parse_document("name: ''\n").unwrap();
        assert_eq!(root.entity_name(), None);

        assert_eq!(Node::string("ctx").entity_name(), None);
    }
}
