//! Generic key-value tree over a fetched document body.
//!
//! Probed endpoints answer in whatever they like, so parsing tries JSON
//! first and falls back to YAML. Consumers only walk the tree through the
//! scalar/object/array accessors below.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::document::{FORMAT_JSON, FORMAT_YAML};

#[derive(Debug, Error)]
pub enum ParseError {
    /// Neither JSON nor YAML produced an object. Carries the JSON error,
    /// the YAML one stays internal.
    #[error("invalid document: {0}")]
    Invalid(String),
}

/// Uniform view over a parsed JSON/YAML object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tree(Map<String, Value>);

impl Tree {
    /// Scalar accessor: numbers and booleans are rendered as strings,
    /// objects, arrays and missing keys yield `""`.
    pub fn get_string(&self, key: &str) -> String {
        match self.0.get(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            _ => String::new(),
        }
    }

    /// Object accessor: an empty tree when the key is absent or not an
    /// object.
    pub fn get_object(&self, key: &str) -> Tree {
        match self.0.get(key) {
            Some(Value::Object(map)) => Tree(map.clone()),
            _ => Tree::default(),
        }
    }

    /// Array accessor keeping only object elements.
    pub fn get_objects_array(&self, key: &str) -> Vec<Tree> {
        match self.0.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|el| match el {
                    Value::Object(map) => Some(Tree(map.clone())),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }
}

impl From<Map<String, Value>> for Tree {
    fn from(map: Map<String, Value>) -> Self {
        Tree(map)
    }
}

/// Parse a document body into a [`Tree`], reporting which syntax matched.
pub fn parse_tree(bytes: &[u8]) -> Result<(Tree, &'static str), ParseError> {
    let json_err = match serde_json::from_slice::<Value>(bytes) {
        Ok(Value::Object(map)) => return Ok((Tree(map), FORMAT_JSON)),
        Ok(_) => "JSON document is not an object".to_string(),
        Err(e) => e.to_string(),
    };

    let yaml: serde_yaml::Value =
        serde_yaml::from_slice(bytes).map_err(|_| ParseError::Invalid(json_err.clone()))?;
    match yaml_to_json(yaml) {
        Value::Object(map) => Ok((Tree(map), FORMAT_YAML)),
        _ => Err(ParseError::Invalid(json_err)),
    }
}

/// YAML allows non-string keys; they are coerced to their scalar rendering
/// so the tree stays uniformly string-keyed.
fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            serde_json::to_value(n).unwrap_or(Value::Null)
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(seq) => {
            Value::Array(seq.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(mapping) => {
            let mut map = Map::new();
            for (k, v) in mapping {
                map.insert(yaml_key_to_string(k), yaml_to_json(v));
            }
            Value::Object(map)
        }
        serde_yaml::Value::Tagged(tagged) => yaml_to_json(tagged.value),
    }
}

fn yaml_key_to_string(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Null => "null".to_string(),
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}
