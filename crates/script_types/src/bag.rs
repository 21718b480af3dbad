// Property Bag - Authored node configuration
//
// Reads never fail: a missing key, or a value that cannot be coerced to the
// requested kind, yields the caller's default.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// String-keyed, loosely-typed configuration attached to a node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyBag(HashMap<String, Value>);

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Raw lookup: exact key first, then case-insensitive. When several
    /// keys differ only in case, the lexicographically smallest wins.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).or_else(|| {
            self.0
                .iter()
                .filter(|(k, _)| k.eq_ignore_ascii_case(key))
                .min_by(|a, b| a.0.cmp(b.0))
                .map(|(_, v)| v)
        })
    }

    /// Keys that collide with another key once case is ignored, sorted
    pub fn clashing_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self.0.keys().map(String::as_str).collect();
        keys.sort_unstable_by(|a, b| {
            a.to_ascii_lowercase()
                .cmp(&b.to_ascii_lowercase())
                .then_with(|| a.cmp(b))
        });
        keys.chunk_by(|a, b| a.eq_ignore_ascii_case(b))
            .filter(|group| group.len() > 1)
            .flatten()
            .copied()
            .collect()
    }

    /// Whether a non-null, non-empty value is present
    pub fn has(&self, key: &str) -> bool {
        match self.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        }
    }

    pub fn get_string(&self, key: &str, default: &str) -> String {
        self.get(key)
            .and_then(Value::coerce_string)
            .unwrap_or_else(|| default.to_string())
    }

    /// Non-empty string, or `None`
    pub fn get_str_opt(&self, key: &str) -> Option<String> {
        self.get(key)
            .and_then(Value::coerce_string)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn get_int(&self, key: &str, default: i64) -> i64 {
        self.get(key).and_then(Value::coerce_int).unwrap_or(default)
    }

    pub fn get_float(&self, key: &str, default: f64) -> f64 {
        self.get(key).and_then(Value::coerce_float).unwrap_or(default)
    }

    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get(key).and_then(Value::coerce_bool).unwrap_or(default)
    }

    /// The stored value as-is, or `Value::Null`
    pub fn get_value(&self, key: &str) -> Value {
        self.get(key).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for PropertyBag {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_reads_with_defaults() {
        let bag = PropertyBag::new()
            .with("Amount", "15")
            .with("Visible", 1)
            .with("Ratio", 0.5)
            .with("Text", "hello");

        assert_eq!(bag.get_int("Amount", 0), 15);
        assert!(bag.get_bool("Visible", false));
        assert_eq!(bag.get_float("Ratio", 0.0), 0.5);
        assert_eq!(bag.get_string("Text", ""), "hello");
        assert_eq!(bag.get_int("Missing", 7), 7);
        // Unparseable falls back to the default, not zero
        assert_eq!(bag.get_int("Text", 3), 3);
    }

    #[test]
    fn test_case_insensitive_keys() {
        let bag = PropertyBag::new().with("ObjectId", "sword_01");
        assert_eq!(bag.get_string("objectid", ""), "sword_01");
        assert!(bag.has("OBJECTID"));
        assert!(!bag.has("RoomId"));
    }

    #[test]
    fn test_case_clash_resolves_to_smallest_key() {
        let bag = PropertyBag::new()
            .with("text", "c")
            .with("TEXT", "a")
            .with("Text", "b")
            .with("Amount", 1);
        assert_eq!(bag.get_string("Text", ""), "b");
        assert_eq!(bag.get_string("tExt", ""), "a");
        assert_eq!(bag.clashing_keys(), vec!["TEXT", "Text", "text"]);
        assert!(PropertyBag::new().with("Amount", 1).clashing_keys().is_empty());
    }

    #[test]
    fn test_blank_strings_are_absent() {
        let bag = PropertyBag::new().with("NpcId", "   ");
        assert!(!bag.has("NpcId"));
        assert_eq!(bag.get_str_opt("NpcId"), None);
    }

    #[test]
    fn test_deserialize_heterogeneous_bag() {
        let bag: PropertyBag =
            serde_json::from_str(r#"{"Seconds": "2", "Loop": false, "Tags": ["a"]}"#).unwrap();
        assert_eq!(bag.get_float("Seconds", 0.0), 2.0);
        assert!(!bag.get_bool("Loop", true));
        assert_eq!(bag.get_string("Tags", ""), "[\"a\"]");
    }
}
