//! Raw annotation data attached to a command method.
//!
//! Annotations are the key/value tags a command author attaches to a method
//! (`command`, `aliases`, `hook`, `default-format`, ...). They are collected
//! once while the command's metadata is built and are read, never rewritten,
//! by the processing pipeline.
//!
//! Values are a small closed set of shapes ([`AnnotationValue`]). Appending to
//! an existing key merges according to the stored shape:
//!
//! | Stored | Appended | Result |
//! |--------|----------|--------|
//! | `Text` | `Text` | concatenated |
//! | `Int` | `Int` | summed |
//! | `List` | `List` | extended |
//! | `List` | `Text` | pushed |
//!
//! Any other combination is an [`AnnotationError::ShapeMismatch`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A single annotation value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnnotationValue {
    /// A boolean marker such as `hidden`
    Bool(bool),
    /// An integer value
    Int(i64),
    /// A scalar string
    Text(String),
    /// An ordered list of strings
    List(Vec<String>),
}

impl AnnotationValue {
    /// Name of this value's shape, used in error messages.
    pub fn shape(&self) -> &'static str {
        match self {
            AnnotationValue::Bool(_) => "bool",
            AnnotationValue::Int(_) => "int",
            AnnotationValue::Text(_) => "text",
            AnnotationValue::List(_) => "list",
        }
    }

    /// Scalar string form. Lists are comma-joined.
    pub fn to_scalar(&self) -> String {
        match self {
            AnnotationValue::Bool(b) => b.to_string(),
            AnnotationValue::Int(i) => i.to_string(),
            AnnotationValue::Text(s) => s.clone(),
            AnnotationValue::List(items) => items.join(","),
        }
    }

    /// List form. Scalar text is split on commas and whitespace.
    pub fn to_list(&self) -> Vec<String> {
        match self {
            AnnotationValue::List(items) => items.clone(),
            AnnotationValue::Text(s) => split_list(s),
            other => vec![other.to_scalar()],
        }
    }
}

impl fmt::Display for AnnotationValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_scalar())
    }
}

impl From<&str> for AnnotationValue {
    fn from(s: &str) -> Self {
        AnnotationValue::Text(s.to_string())
    }
}

impl From<String> for AnnotationValue {
    fn from(s: String) -> Self {
        AnnotationValue::Text(s)
    }
}

impl From<bool> for AnnotationValue {
    fn from(b: bool) -> Self {
        AnnotationValue::Bool(b)
    }
}

impl From<i64> for AnnotationValue {
    fn from(i: i64) -> Self {
        AnnotationValue::Int(i)
    }
}

impl From<Vec<String>> for AnnotationValue {
    fn from(items: Vec<String>) -> Self {
        AnnotationValue::List(items)
    }
}

impl From<Vec<&str>> for AnnotationValue {
    fn from(items: Vec<&str>) -> Self {
        AnnotationValue::List(items.into_iter().map(String::from).collect())
    }
}

/// Error raised when mutating annotation data.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnnotationError {
    /// The appended value's shape cannot be merged into the stored one.
    #[error("cannot append {appended} to {existing} annotation '{key}'")]
    ShapeMismatch {
        key: String,
        existing: &'static str,
        appended: &'static str,
    },
}

/// Ordered, case-sensitive map of annotation key to value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationData {
    entries: IndexMap<String, AnnotationValue>,
}

impl AnnotationData {
    /// Creates empty annotation data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the scalar form of `key`, or `default` when absent.
    pub fn get(&self, key: &str, default: &str) -> String {
        self.entries
            .get(key)
            .map(AnnotationValue::to_scalar)
            .unwrap_or_else(|| default.to_string())
    }

    /// Returns the list form of `key`, or an empty list when absent.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get_list_or(key, &[])
    }

    /// Returns the list form of `key`, or `default` when absent.
    pub fn get_list_or(&self, key: &str, default: &[&str]) -> Vec<String> {
        match self.entries.get(key) {
            Some(value) => value.to_list(),
            None => default.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Returns the stored value for `key`.
    pub fn value(&self, key: &str) -> Option<&AnnotationValue> {
        self.entries.get(key)
    }

    /// Returns true when `key` is present.
    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns true when `key` holds `true`, or a non-empty value other than
    /// `"false"`/`"0"`.
    pub fn flag(&self, key: &str) -> bool {
        match self.entries.get(key) {
            Some(AnnotationValue::Bool(b)) => *b,
            Some(AnnotationValue::Int(i)) => *i != 0,
            Some(AnnotationValue::Text(s)) => !matches!(s.trim(), "false" | "0"),
            Some(AnnotationValue::List(items)) => !items.is_empty(),
            None => false,
        }
    }

    /// Sets `key`, replacing any previous value while keeping its position.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<AnnotationValue>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Appends to `key` according to the stored value's shape.
    ///
    /// An absent key behaves like [`set`](Self::set).
    pub fn append(
        &mut self,
        key: impl Into<String>,
        value: impl Into<AnnotationValue>,
    ) -> Result<(), AnnotationError> {
        let key = key.into();
        let value = value.into();

        let Some(existing) = self.entries.get_mut(&key) else {
            self.entries.insert(key, value);
            return Ok(());
        };

        match (existing, value) {
            (AnnotationValue::Text(current), AnnotationValue::Text(more)) => current.push_str(&more),
            (AnnotationValue::Int(current), AnnotationValue::Int(more)) => *current += more,
            (AnnotationValue::List(current), AnnotationValue::List(more)) => current.extend(more),
            (AnnotationValue::List(current), AnnotationValue::Text(more)) => current.push(more),
            (existing, value) => {
                return Err(AnnotationError::ShapeMismatch {
                    existing: existing.shape(),
                    appended: value.shape(),
                    key,
                })
            }
        }
        Ok(())
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<AnnotationValue> {
        self.entries.shift_remove(key)
    }

    /// Inserts every entry of `other` whose key is not already present.
    pub fn extend_missing(&mut self, other: &AnnotationData) {
        for (key, value) in &other.entries {
            if !self.entries.contains_key(key) {
                self.entries.insert(key.clone(), value.clone());
            }
        }
    }

    /// Keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AnnotationValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for AnnotationData
where
    K: Into<String>,
    V: Into<AnnotationValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut data = AnnotationData::new();
        for (k, v) in iter {
            data.set(k, v);
        }
        data
    }
}

fn split_list(s: &str) -> Vec<String> {
    s.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_returns_default_when_absent() {
        let data = AnnotationData::new();
        assert_eq!(data.get("missing", "fallback"), "fallback");
        assert!(!data.has("missing"));
    }

    #[test]
    fn test_get_joins_lists_with_commas() {
        let mut data = AnnotationData::new();
        data.set("aliases", vec!["a", "b"]);
        assert_eq!(data.get("aliases", ""), "a,b");
    }

    #[test]
    fn test_get_list_splits_scalar_text() {
        let mut data = AnnotationData::new();
        data.set("aliases", "arith, math  calc");
        assert_eq!(data.get_list("aliases"), vec!["arith", "math", "calc"]);
        assert_eq!(data.get_list_or("absent", &["x"]), vec!["x"]);
    }

    #[test]
    fn test_keys_are_case_sensitive_and_ordered() {
        let mut data = AnnotationData::new();
        data.set("Zeta", "1");
        data.set("alpha", "2");
        data.set("zeta", "3");
        let keys: Vec<&str> = data.keys().collect();
        assert_eq!(keys, vec!["Zeta", "alpha", "zeta"]);
    }

    #[test]
    fn test_set_keeps_position() {
        let mut data: AnnotationData = [("a", "1"), ("b", "2")].into_iter().collect();
        data.set("a", "changed");
        let keys: Vec<&str> = data.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(data.get("a", ""), "changed");
    }

    #[test]
    fn test_append_by_shape() {
        let mut data = AnnotationData::new();
        data.append("text", "foo").unwrap();
        data.append("text", "bar").unwrap();
        assert_eq!(data.get("text", ""), "foobar");

        data.set("count", 2i64);
        data.append("count", 5i64).unwrap();
        assert_eq!(data.value("count"), Some(&AnnotationValue::Int(7)));

        data.set("list", vec!["a"]);
        data.append("list", vec!["b", "c"]).unwrap();
        data.append("list", "d").unwrap();
        assert_eq!(data.get_list("list"), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_append_shape_mismatch_is_an_error() {
        let mut data = AnnotationData::new();
        data.set("count", 1i64);
        let err = data.append("count", "x").unwrap_err();
        assert_eq!(
            err,
            AnnotationError::ShapeMismatch {
                key: "count".into(),
                existing: "int",
                appended: "text",
            }
        );
        // Value left untouched
        assert_eq!(data.value("count"), Some(&AnnotationValue::Int(1)));
    }

    #[test]
    fn test_flag() {
        let mut data = AnnotationData::new();
        data.set("hidden", true);
        data.set("off", "false");
        data.set("bare", "");
        assert!(data.flag("hidden"));
        assert!(!data.flag("off"));
        assert!(data.flag("bare"));
        assert!(!data.flag("absent"));
    }

    #[test]
    fn test_extend_missing_keeps_existing_values() {
        let mut target: AnnotationData = [("a", "own")].into_iter().collect();
        let extra: AnnotationData = [("a", "other"), ("b", "added")].into_iter().collect();
        target.extend_missing(&extra);
        assert_eq!(target.get("a", ""), "own");
        assert_eq!(target.get("b", ""), "added");
    }
}
