//! Placeholder substitution
//!
//! Template files reference flat-map values with three forms:
//!
//! | Form             | String   | Bool          | Int            |
//! |------------------|----------|---------------|----------------|
//! | `$(key)`         | verbatim | `true`/`false`| `"42"` (quoted)|
//! | `$raw(key)`      | verbatim | `true`/`false`| `42`           |
//! | `$base64(key)`   | base64 of the raw text                    |
//!
//! Placeholders are matched as whole tokens in a single pass, so a key that
//! is a prefix or substring of another key can never rewrite part of a longer
//! placeholder. Placeholders naming keys the map does not hold are left
//! untouched; kustomize resolves its own `$(VAR)` references later.

use std::borrow::Cow;

use regex::{Captures, Regex};

use crate::error::Result;
use crate::flatmap::FlatMap;

const PLACEHOLDER_PATTERN: &str = r"\$(raw|base64)?\(([A-Za-z0-9_.\-]+)\)";

/// Which rendering a placeholder asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderForm {
    Formatted,
    Raw,
    Base64,
}

impl PlaceholderForm {
    fn from_prefix(prefix: Option<&str>) -> Self {
        match prefix {
            Some("raw") => PlaceholderForm::Raw,
            Some("base64") => PlaceholderForm::Base64,
            _ => PlaceholderForm::Formatted,
        }
    }
}

/// Compiled substitution pass over a flat map.
pub struct Substituter<'a> {
    values: &'a FlatMap,
    pattern: Regex,
}

impl<'a> Substituter<'a> {
    pub fn new(values: &'a FlatMap) -> Result<Self> {
        Ok(Self {
            values,
            pattern: Regex::new(PLACEHOLDER_PATTERN)?,
        })
    }

    /// Resolve one placeholder, or `None` if the key is unknown.
    pub fn resolve(&self, form: PlaceholderForm, key: &str) -> Option<String> {
        let value = self.values.get(key)?;
        Some(match form {
            PlaceholderForm::Formatted => value.formatted(),
            PlaceholderForm::Raw => value.raw(),
            PlaceholderForm::Base64 => value.base64(),
        })
    }

    /// Replace every known placeholder in `content`.
    ///
    /// Borrows the input when nothing matched.
    pub fn apply<'c>(&self, content: &'c str) -> Cow<'c, str> {
        self.pattern.replace_all(content, |caps: &Captures<'_>| {
            let form = PlaceholderForm::from_prefix(caps.get(1).map(|m| m.as_str()));
            match caps.get(2) {
                Some(key) => self
                    .resolve(form, key.as_str())
                    .unwrap_or_else(|| caps[0].to_string()),
                None => caps[0].to_string(),
            }
        })
    }
}

/// Convenience wrapper for a single string.
pub fn substitute(content: &str, values: &FlatMap) -> Result<String> {
    Ok(Substituter::new(values)?.apply(content).into_owned())
}
