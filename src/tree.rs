//! # Configuration Tree
//!
//! In-memory representation of a params document. Unlike a plain
//! `serde_yaml::Value`, a `ConfigTree` keeps the distinction the renderer
//! cares about: which leaves are strings, booleans or integers, and the order
//! in which mapping keys were written.
//!
//! Paths are dotted (`application.nodePool.label`). `put` creates any missing
//! intermediate mappings, so derived values can be written back into the tree
//! before it is flattened.

use std::fmt;
use std::path::Path;

use serde_yaml::Value as YamlValue;

use crate::error::{Error, Result};
use crate::flatmap::{FlatMap, FlatValue};

/// A typed scalar leaf.
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    String(String),
    Bool(bool),
    Int(i64),
    /// Floating point values keep their document text.
    Float(String),
    Null,
}

impl Scalar {
    /// The scalar rendered as plain text, without quoting.
    pub fn text(&self) -> String {
        match self {
            Scalar::String(s) | Scalar::Float(s) => s.clone(),
            Scalar::Bool(b) => b.to_string(),
            Scalar::Int(i) => i.to_string(),
            Scalar::Null => String::new(),
        }
    }

    /// Whether the scalar carries the YAML string tag.
    pub fn is_string(&self) -> bool {
        matches!(self, Scalar::String(_))
    }

    fn to_flat(&self) -> FlatValue {
        match self {
            Scalar::String(s) | Scalar::Float(s) => FlatValue::String(s.clone()),
            Scalar::Bool(b) => FlatValue::Bool(*b),
            Scalar::Int(i) => FlatValue::Int(*i),
            Scalar::Null => FlatValue::String(String::new()),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text())
    }
}

/// A node of the configuration tree.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigNode {
    Scalar(Scalar),
    Sequence(Vec<ConfigNode>),
    /// Mapping entries in document order.
    Mapping(Vec<(String, ConfigNode)>),
}

impl ConfigNode {
    /// An empty mapping node.
    pub fn mapping() -> Self {
        ConfigNode::Mapping(Vec::new())
    }

    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            ConfigNode::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[ConfigNode]> {
        match self {
            ConfigNode::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_mapping(&self) -> Option<&[(String, ConfigNode)]> {
        match self {
            ConfigNode::Mapping(entries) => Some(entries),
            _ => None,
        }
    }

    /// Look up a direct child of a mapping node.
    pub fn child(&self, key: &str) -> Option<&ConfigNode> {
        self.as_mapping()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Convert a `serde_yaml` value, keeping scalar types and key order.
    pub fn from_yaml(value: &YamlValue) -> Self {
        match value {
            YamlValue::Null => ConfigNode::Scalar(Scalar::Null),
            YamlValue::Bool(b) => ConfigNode::Scalar(Scalar::Bool(*b)),
            YamlValue::Number(n) => match n.as_i64() {
                Some(i) => ConfigNode::Scalar(Scalar::Int(i)),
                None => ConfigNode::Scalar(Scalar::Float(n.to_string())),
            },
            YamlValue::String(s) => ConfigNode::Scalar(Scalar::String(s.clone())),
            YamlValue::Sequence(items) => {
                ConfigNode::Sequence(items.iter().map(ConfigNode::from_yaml).collect())
            }
            YamlValue::Mapping(map) => ConfigNode::Mapping(
                map.iter()
                    .map(|(k, v)| (key_text(k), ConfigNode::from_yaml(v)))
                    .collect(),
            ),
            YamlValue::Tagged(tagged) => ConfigNode::from_yaml(&tagged.value),
        }
    }

    /// Convert back into a `serde_yaml` value so a subtree can be decoded
    /// into a typed struct.
    pub fn to_yaml(&self) -> YamlValue {
        match self {
            ConfigNode::Scalar(Scalar::String(s)) => YamlValue::String(s.clone()),
            ConfigNode::Scalar(Scalar::Bool(b)) => YamlValue::Bool(*b),
            ConfigNode::Scalar(Scalar::Int(i)) => YamlValue::Number((*i).into()),
            ConfigNode::Scalar(Scalar::Float(text)) => {
                serde_yaml::from_str(text).unwrap_or_else(|_| YamlValue::String(text.clone()))
            }
            ConfigNode::Scalar(Scalar::Null) => YamlValue::Null,
            ConfigNode::Sequence(items) => {
                YamlValue::Sequence(items.iter().map(ConfigNode::to_yaml).collect())
            }
            ConfigNode::Mapping(entries) => YamlValue::Mapping(
                entries
                    .iter()
                    .map(|(k, v)| (YamlValue::String(k.clone()), v.to_yaml()))
                    .collect(),
            ),
        }
    }
}

fn key_text(key: &YamlValue) -> String {
    match key {
        YamlValue::String(s) => s.clone(),
        YamlValue::Bool(b) => b.to_string(),
        YamlValue::Number(n) => n.to_string(),
        YamlValue::Null => "null".to_string(),
        other => format!("{:?}", other),
    }
}

impl From<Scalar> for ConfigNode {
    fn from(scalar: Scalar) -> Self {
        ConfigNode::Scalar(scalar)
    }
}

impl From<&str> for ConfigNode {
    fn from(s: &str) -> Self {
        ConfigNode::Scalar(Scalar::String(s.to_string()))
    }
}

impl From<String> for ConfigNode {
    fn from(s: String) -> Self {
        ConfigNode::Scalar(Scalar::String(s))
    }
}

impl From<bool> for ConfigNode {
    fn from(b: bool) -> Self {
        ConfigNode::Scalar(Scalar::Bool(b))
    }
}

impl From<i64> for ConfigNode {
    fn from(i: i64) -> Self {
        ConfigNode::Scalar(Scalar::Int(i))
    }
}

/// Rule used to build flat-map keys from mapping keys.
pub trait KeyFormatter {
    /// Extend `prefix` (empty at the root) with `key`.
    fn join(&self, prefix: &str, key: &str) -> String;
}

/// `application.defaultNamespace` becomes `applicationDefaultNamespace`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LowerCamelCase;

impl KeyFormatter for LowerCamelCase {
    fn join(&self, prefix: &str, key: &str) -> String {
        if prefix.is_empty() {
            return key.to_string();
        }
        let mut chars = key.chars();
        match chars.next() {
            Some(first) => format!("{}{}{}", prefix, first.to_uppercase(), chars.as_str()),
            None => prefix.to_string(),
        }
    }
}

/// Keys are joined with `.`, reproducing the document path.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dotted;

impl KeyFormatter for Dotted {
    fn join(&self, prefix: &str, key: &str) -> String {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", prefix, key)
        }
    }
}

/// Format a dotted config path into its flat-map key.
pub fn flat_key(formatter: &dyn KeyFormatter, path: &str) -> String {
    path.split('.')
        .fold(String::new(), |acc, segment| formatter.join(&acc, segment))
}

/// A parsed params document.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigTree {
    root: ConfigNode,
}

impl Default for ConfigTree {
    fn default() -> Self {
        Self {
            root: ConfigNode::mapping(),
        }
    }
}

impl ConfigTree {
    pub fn new(root: ConfigNode) -> Self {
        Self { root }
    }

    /// Parse a YAML document. An empty document yields an empty mapping.
    pub fn parse(content: &str) -> Result<Self> {
        let value: YamlValue = serde_yaml::from_str(content).map_err(|e| Error::ConfigParse {
            message: e.to_string(),
            hint: None,
        })?;
        let root = match value {
            YamlValue::Null => ConfigNode::mapping(),
            other => ConfigNode::from_yaml(&other),
        };
        Ok(Self { root })
    }

    /// Read and parse a params file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| Error::fs("read", path, e))?;
        Self::parse(&content).map_err(|e| match e {
            Error::ConfigParse { message, hint } => Error::ConfigParse {
                message: format!("{}: {}", path.display(), message),
                hint,
            },
            other => other,
        })
    }

    pub fn root(&self) -> &ConfigNode {
        &self.root
    }

    /// Look up a dotted path.
    pub fn get(&self, path: &str) -> Option<&ConfigNode> {
        path.split('.')
            .try_fold(&self.root, |node, segment| node.child(segment))
    }

    /// Look up a dotted path that must hold a scalar.
    pub fn scalar(&self, path: &str) -> Option<&Scalar> {
        self.get(path).and_then(ConfigNode::as_scalar)
    }

    pub fn has_key(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    pub fn has_keys(&self, paths: &[&str]) -> bool {
        paths.iter().all(|p| self.has_key(p))
    }

    /// Insert or overwrite the value at a dotted path.
    pub fn put(&mut self, path: &str, value: impl Into<ConfigNode>) {
        let segments: Vec<&str> = path.split('.').collect();
        self.put_segments(&segments, value.into());
    }

    /// Insert or overwrite a value, splitting `key` on `separator`.
    ///
    /// A key that does not contain the separator lands at the root.
    pub fn put_with_separator(&mut self, key: &str, value: impl Into<ConfigNode>, separator: &str) {
        let segments: Vec<&str> = key.split(separator).collect();
        self.put_segments(&segments, value.into());
    }

    fn put_segments(&mut self, segments: &[&str], value: ConfigNode) {
        let Some((last, parents)) = segments.split_last() else {
            return;
        };

        let mut current = &mut self.root;
        for segment in parents {
            current = entry_or_insert(current, segment);
        }
        *entry_or_insert(current, last) = value;
    }

    /// Flatten every scalar reachable through mappings only.
    ///
    /// Sequences are not expanded into indexed keys; the fragment generator
    /// owns the sequence-shaped sections.
    pub fn flatten(&self, formatter: &dyn KeyFormatter) -> FlatMap {
        let mut flat = FlatMap::new();
        if let ConfigNode::Mapping(entries) = &self.root {
            flatten_entries(entries, "", formatter, &mut flat);
        }
        flat
    }
}

/// Return the child at `key`, turning `node` into a mapping and appending an
/// empty mapping child when needed.
fn entry_or_insert<'a>(node: &'a mut ConfigNode, key: &str) -> &'a mut ConfigNode {
    if !matches!(node, ConfigNode::Mapping(_)) {
        *node = ConfigNode::mapping();
    }
    match node {
        ConfigNode::Mapping(entries) => {
            let index = match entries.iter().position(|(k, _)| k == key) {
                Some(index) => index,
                None => {
                    entries.push((key.to_string(), ConfigNode::mapping()));
                    entries.len() - 1
                }
            };
            &mut entries[index].1
        }
        other => other,
    }
}

fn flatten_entries(
    entries: &[(String, ConfigNode)],
    prefix: &str,
    formatter: &dyn KeyFormatter,
    flat: &mut FlatMap,
) {
    for (key, node) in entries {
        let path = formatter.join(prefix, key);
        match node {
            ConfigNode::Scalar(scalar) => flat.insert(path, scalar.to_flat()),
            ConfigNode::Mapping(children) => flatten_entries(children, &path, formatter, flat),
            ConfigNode::Sequence(_) => {}
        }
    }
}
