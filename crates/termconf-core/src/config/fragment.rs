//! Config fragments, the non-structural marker, merging and YAML text
//!
//! Merge semantics:
//! - Mappings: deep-merge by key (recursive)
//! - Sequences: REPLACE (overlay wins entirely, never concatenated)
//! - Scalars and mismatched kinds: overlay wins
//! - Null: overrides like any other scalar

use serde_json::{Map, Value};

use super::traits::{ConfigError, ConfigResult};

/// A nested tree of settings contributed by one source
pub type ConfigFragment = Map<String, Value>;

/// Key that marks a default mapping as an opaque record
///
/// A marked mapping is not recursed into by the view; it is copied wholesale
/// into the raw store the first time it is read.
pub const NON_STRUCTURAL_KEY: &str = "__nonStructural";

/// Mark a mapping as non-structural
///
/// Non-mapping values are returned unchanged.
pub fn non_structural(value: Value) -> Value {
    match value {
        Value::Object(mut map) => {
            map.insert(NON_STRUCTURAL_KEY.to_string(), Value::Bool(true));
            Value::Object(map)
        }
        other => other,
    }
}

/// Whether `value` is a mapping carrying the non-structural marker
pub fn is_non_structural(value: &Value) -> bool {
    match value {
        Value::Object(map) => matches!(map.get(NON_STRUCTURAL_KEY), Some(Value::Bool(true))),
        _ => false,
    }
}

/// Whether `value` is a sub-namespace the view should recurse into
///
/// That is a non-empty mapping without the non-structural marker. Empty
/// mappings, sequences and scalars are plain values.
pub fn is_structural(value: &Value) -> bool {
    match value {
        Value::Object(map) => !map.is_empty() && !is_non_structural(value),
        _ => false,
    }
}

/// Deep copy of `value` with the marker removed at every level
pub fn strip_markers(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(k, _)| k.as_str() != NON_STRUCTURAL_KEY)
                .map(|(k, v)| (k.clone(), strip_markers(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(strip_markers).collect()),
        other => other.clone(),
    }
}

/// Deep merge two values, `overlay` taking precedence
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            Value::Object(merge_fragments(base_map, overlay_map))
        }

        // Sequences are replaced, never concatenated
        (Value::Array(_), overlay @ Value::Array(_)) => overlay,

        (_, overlay) => overlay,
    }
}

/// Deep merge two fragments, `overlay` taking precedence
pub fn merge_fragments(mut base: ConfigFragment, overlay: ConfigFragment) -> ConfigFragment {
    for (key, overlay_value) in overlay {
        let merged = match base.remove(&key) {
            Some(base_value) => deep_merge(base_value, overlay_value),
            None => overlay_value,
        };
        base.insert(key, merged);
    }
    base
}

/// Parse YAML text into a fragment
///
/// An empty or null document is an empty fragment. Anything other than a
/// mapping at the top level is rejected.
pub fn parse_yaml(text: &str) -> ConfigResult<ConfigFragment> {
    if text.trim().is_empty() {
        return Ok(ConfigFragment::new());
    }

    let document: serde_yaml::Value = serde_yaml::from_str(text)
        .map_err(|e| ConfigError::Deserialization(e.to_string()))?;

    match document {
        serde_yaml::Value::Null => Ok(ConfigFragment::new()),
        serde_yaml::Value::Mapping(_) => {
            match serde_json::to_value(&document)
                .map_err(|e| ConfigError::Deserialization(e.to_string()))?
            {
                Value::Object(map) => Ok(map),
                _ => Err(ConfigError::Deserialization(
                    "top-level document must be a mapping".to_string(),
                )),
            }
        }
        _ => Err(ConfigError::Deserialization(
            "top-level document must be a mapping".to_string(),
        )),
    }
}

/// Serialize a fragment as YAML text
pub fn to_yaml(fragment: &ConfigFragment) -> ConfigResult<String> {
    serde_yaml::to_string(fragment).map_err(|e| ConfigError::Serialization(e.to_string()))
}
