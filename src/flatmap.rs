//! Flat key/value table produced from a configuration tree.
//!
//! Values keep their scalar type so each placeholder form can render them
//! differently: `$(key)` quotes integers, `$raw(key)` does not, and
//! `$base64(key)` encodes the raw text.

use std::collections::BTreeMap;
use std::fmt;

use base64::Engine;

/// A typed flat-map value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlatValue {
    String(String),
    Bool(bool),
    Int(i64),
}

impl FlatValue {
    /// Text used for `$(key)`: integers are emitted as a quoted string.
    pub fn formatted(&self) -> String {
        match self {
            FlatValue::Int(i) => format!("\"{}\"", i),
            other => other.raw(),
        }
    }

    /// Text used for `$raw(key)` and for env-file projections.
    pub fn raw(&self) -> String {
        match self {
            FlatValue::String(s) => s.clone(),
            FlatValue::Bool(b) => b.to_string(),
            FlatValue::Int(i) => i.to_string(),
        }
    }

    /// Standard base64 of the raw text, used for `$base64(key)`.
    pub fn base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(self.raw())
    }
}

impl fmt::Display for FlatValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw())
    }
}

impl From<&str> for FlatValue {
    fn from(s: &str) -> Self {
        FlatValue::String(s.to_string())
    }
}

impl From<String> for FlatValue {
    fn from(s: String) -> Self {
        FlatValue::String(s)
    }
}

impl From<bool> for FlatValue {
    fn from(b: bool) -> Self {
        FlatValue::Bool(b)
    }
}

impl From<i64> for FlatValue {
    fn from(i: i64) -> Self {
        FlatValue::Int(i)
    }
}

/// Ordered mapping of flat keys to typed values. Later inserts win.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatMap {
    entries: BTreeMap<String, FlatValue>,
}

impl FlatMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FlatValue>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&FlatValue> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FlatValue)> {
        self.entries.iter()
    }

    /// Merge `KEY=VALUE` lines into the map as string values.
    ///
    /// Lines are split at the first `=`. Blank lines, `#` comments and lines
    /// without `=` are ignored. Returns the number of entries applied.
    pub fn merge_env(&mut self, content: &str) -> usize {
        let mut applied = 0;
        for (key, value) in parse_env(content) {
            self.insert(key, value);
            applied += 1;
        }
        applied
    }
}

/// Parse env-file content into ordered `(key, value)` pairs.
pub fn parse_env(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty() && !line.trim_start().starts_with('#'))
        .filter_map(|line| line.split_once('='))
        .filter(|(key, _)| !key.trim().is_empty())
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .collect()
}
