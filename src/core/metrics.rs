//! Metric maps produced by collectors and enrichers.
//!
//! A metric map is an ordered `name -> value` mapping. Lookups never fail:
//! a missing or mistyped key resolves to a neutral value (`0`, `""`, an empty
//! list) so degraded results flow through statistics and scoring unchanged.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ordered metric map backed by a JSON object.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricMap(Map<String, Value>);

impl MetricMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Insert or replace a metric.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Raw access to a value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Numeric value, `0.0` when missing or non-numeric. Booleans count as 0/1.
    pub fn number(&self, key: &str) -> f64 {
        match self.0.get(key) {
            Some(Value::Number(n)) => n.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0),
            Some(Value::Bool(b)) => f64::from(u8::from(*b)),
            _ => 0.0,
        }
    }

    /// Non-negative integer value, `0` when missing.
    pub fn count(&self, key: &str) -> usize {
        let value = self.number(key);
        if value <= 0.0 {
            0
        } else {
            value.round() as usize
        }
    }

    /// String value, `""` when missing.
    pub fn string(&self, key: &str) -> &str {
        self.string_or(key, "")
    }

    /// String value with a named default.
    pub fn string_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        match self.0.get(key) {
            Some(Value::String(s)) => s.as_str(),
            _ => default,
        }
    }

    /// Boolean value, `false` when missing.
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.0.get(key), Some(Value::Bool(true)))
    }

    /// List value, empty when missing.
    pub fn list(&self, key: &str) -> &[Value] {
        match self.0.get(key) {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        }
    }

    /// List of strings; non-string entries are skipped.
    pub fn strings(&self, key: &str) -> Vec<String> {
        self.list(key)
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect()
    }

    /// A `name -> count` multiset stored as a nested object.
    pub fn counts(&self, key: &str) -> BTreeMap<String, usize> {
        match self.0.get(key) {
            Some(Value::Object(map)) => map
                .iter()
                .map(|(name, v)| (name.clone(), v.as_u64().unwrap_or(0) as usize))
                .collect(),
            _ => BTreeMap::new(),
        }
    }

    /// Nested object, if present.
    pub fn object(&self, key: &str) -> Option<&Map<String, Value>> {
        self.0.get(key).and_then(Value::as_object)
    }

    /// Union with `other`; on key collision `other` wins.
    pub fn merge(&mut self, other: MetricMap) {
        for (key, value) in other.0 {
            self.0.insert(key, value);
        }
    }

    /// Union with `other`; existing keys are kept.
    pub fn merge_missing(&mut self, other: MetricMap) {
        for (key, value) in other.0 {
            self.0.entry(key).or_insert(value);
        }
    }
}

impl From<Map<String, Value>> for MetricMap {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl FromIterator<(String, Value)> for MetricMap {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for MetricMap {
    type Item = (String, Value);
    type IntoIter = serde_json::map::IntoIter;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Encode a `name -> count` multiset as a JSON object.
pub fn counts_value(counts: &BTreeMap<String, usize>) -> Value {
    Value::Object(
        counts
            .iter()
            .map(|(name, count)| (name.clone(), Value::from(*count)))
            .collect(),
    )
}

/// Encode names as a JSON array.
pub fn strings_value<'a>(names: impl IntoIterator<Item = &'a String>) -> Value {
    Value::Array(names.into_iter().map(|n| Value::from(n.as_str())).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_missing_keys_are_neutral() {
        let map = MetricMap::new();
        assert_eq!(map.number("lines"), 0.0);
        assert_eq!(map.count("lines"), 0);
        assert_eq!(map.string("category"), "");
        assert_eq!(map.string_or("category", "other"), "other");
        assert!(!map.flag("has_nested_loops"));
        assert!(map.list("includes").is_empty());
        assert!(map.counts("filters").is_empty());
    }

    #[test]
    fn test_mistyped_values_are_neutral() {
        let map = MetricMap::new()
            .with("lines", "many")
            .with("category", 3)
            .with("filters", json!(["upper"]));
        assert_eq!(map.number("lines"), 0.0);
        assert_eq!(map.string_or("category", "other"), "other");
        assert!(map.counts("filters").is_empty());
    }

    #[test]
    fn test_counts_round_trip() {
        let mut counts = BTreeMap::new();
        counts.insert("upper".to_string(), 3);
        counts.insert("trim".to_string(), 1);
        let map = MetricMap::new().with("filters", counts_value(&counts));
        assert_eq!(map.counts("filters"), counts);
    }

    #[test]
    fn test_merge_later_wins() {
        let mut base = MetricMap::new().with("lines", 10).with("blocks", 1);
        base.merge(MetricMap::new().with("blocks", 4).with("macros", 2));
        assert_eq!(base.count("lines"), 10);
        assert_eq!(base.count("blocks"), 4);
        assert_eq!(base.count("macros"), 2);
    }

    #[test]
    fn test_merge_missing_keeps_existing() {
        let mut base = MetricMap::new().with("lines", 10);
        base.merge_missing(MetricMap::new().with("lines", 99).with("chars", 5));
        assert_eq!(base.count("lines"), 10);
        assert_eq!(base.count("chars"), 5);
    }

    #[test]
    fn test_bool_counts_as_number() {
        let map = MetricMap::new().with("is_orphan", true);
        assert_eq!(map.number("is_orphan"), 1.0);
        assert!(map.flag("is_orphan"));
    }
}
