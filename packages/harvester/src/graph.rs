//! The embedded state graph and shape-tolerant access to it.
//!
//! The graph is a normalized client-side cache shipped inside the page: a
//! flat store of nodes keyed by opaque `Type:id` strings, each node an
//! arbitrarily shaped value. `serde_json::Value` already is the closed
//! tagged variant {Null, Bool, Number, Text, List, Map} the graph needs;
//! the accessor combinators here return `None` on any shape mismatch so
//! extraction stays best-effort instead of scattering runtime type checks.

use serde_json::{Map, Value};

use crate::error::{HarvestError, Result};

/// One parsed graph snapshot. Immutable once parsed; keys are unique.
#[derive(Debug, Clone)]
pub struct StateGraph {
    nodes: Map<String, Value>,
}

impl StateGraph {
    /// Parse located blob text into a graph. Any malformed document is a
    /// terminal parse error for the page; there is no partial recovery.
    pub fn parse(raw: &str) -> Result<Self> {
        let nodes: Map<String, Value> = serde_json::from_str(raw)?;
        Ok(Self { nodes })
    }

    /// Look a node up by its full `Type:id` key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.nodes.get(key)
    }

    /// All top-level entries. With serde_json's default map this iterates
    /// in sorted key order, which keeps classification deterministic.
    pub fn entries(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Find the first list stored under a key literally equal to `name`,
    /// anywhere in the graph. "Found but empty" is a successful (empty)
    /// result; only a wholly absent key is an error.
    pub fn named_list(&self, name: &str) -> Result<&Vec<Value>> {
        self.nodes
            .iter()
            .find_map(|(key, value)| {
                if key == name {
                    if let Value::Array(items) = value {
                        return Some(items);
                    }
                }
                find_named_list(value, name)
            })
            .ok_or_else(|| HarvestError::NotFound(format!("no '{name}' collection in graph")))
    }
}

/// Depth-first search across nested maps and lists for the first key
/// literally equal to `name` whose value is itself a list.
///
/// Which of several equally-named collections at different depths wins
/// depends on map iteration order (sorted keys for serde_json's default
/// map). That order is an implementation detail, not a guarantee.
pub fn find_named_list<'a>(value: &'a Value, name: &str) -> Option<&'a Vec<Value>> {
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                if key == name {
                    if let Value::Array(items) = val {
                        return Some(items);
                    }
                }
                if let Some(found) = find_named_list(val, name) {
                    return Some(found);
                }
            }
            None
        }
        Value::Array(items) => items.iter().find_map(|item| find_named_list(item, name)),
        _ => None,
    }
}

// --- Shape-tolerant field accessors ---

/// String field of a map-shaped value, or `None` on any shape mismatch.
pub fn str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key)?.as_str()
}

/// Like [`str_field`] but rejects the empty string.
pub fn non_empty_str_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    str_field(value, key).filter(|s| !s.is_empty())
}

pub fn f64_field(value: &Value, key: &str) -> Option<f64> {
    value.get(key)?.as_f64()
}

pub fn i64_field(value: &Value, key: &str) -> Option<i64> {
    value.get(key)?.as_i64()
}

pub fn map_field<'a>(value: &'a Value, key: &str) -> Option<&'a Map<String, Value>> {
    value.get(key)?.as_object()
}

pub fn list_field<'a>(value: &'a Value, key: &str) -> Option<&'a Vec<Value>> {
    value.get(key)?.as_array()
}
