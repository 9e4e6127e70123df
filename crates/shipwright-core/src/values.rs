//! Values handling: deep merge, shallow overlay, and dot-path assignment
//!
//! Two distinct combination rules live here and the difference is a
//! documented contract, not an accident:
//!
//! - [`Values::merge`] is a recursive deep merge, used when building a child
//!   chart's rendering context.
//! - [`Values::overlay`] is a shallow top-level last-wins replacement, used
//!   for the operator override layer (`--values`, `--set`, `--set-file`).

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sha1::{Digest, Sha1};
use std::path::Path;

use crate::error::{CoreError, Result};

/// Values container with deep merge capability
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Values(pub JsonValue);

impl Values {
    /// Create empty values
    pub fn new() -> Self {
        Self(JsonValue::Object(serde_json::Map::new()))
    }

    /// Load values from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse values from YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: JsonValue = serde_yaml::from_str(yaml)?;
        Ok(Self(value))
    }

    /// Deep merge another Values into this one
    ///
    /// Rules:
    /// - Scalars: overlay replaces base
    /// - Objects: recursive merge
    /// - Arrays: overlay replaces base (never concatenated)
    pub fn merge(&mut self, overlay: &Values) {
        deep_merge(&mut self.0, &overlay.0);
    }

    /// Shallow top-level overlay: each top-level key of `other` fully
    /// replaces the same key here. A later mapping wipes out an earlier one
    /// at that key; there is no recursion at this layer.
    pub fn overlay(&mut self, other: &Values) {
        if let (JsonValue::Object(base), JsonValue::Object(over)) = (&mut self.0, &other.0) {
            for (key, value) in over {
                base.insert(key.clone(), value.clone());
            }
        }
    }

    /// Set a value by dotted path (e.g. "image.tag"), creating intermediate
    /// mappings on demand. A non-mapping at an intermediate segment is a
    /// validation error, never a silent overwrite.
    pub fn set_path(&mut self, path: &str, value: JsonValue) -> Result<()> {
        let parts: Vec<&str> = path.split('.').collect();
        set_nested(&mut self.0, path, &parts, value)
    }

    /// Get a value by dotted path
    pub fn get(&self, path: &str) -> Option<&JsonValue> {
        let parts: Vec<&str> = path.split('.').collect();
        get_nested(&self.0, &parts)
    }

    /// Get the inner JSON value
    pub fn inner(&self) -> &JsonValue {
        &self.0
    }

    /// Convert to JSON value
    pub fn into_inner(self) -> JsonValue {
        self.0
    }

    /// Compact JSON with keys in sorted order (serde_json's default map is
    /// BTreeMap-backed). Structurally equal trees always serialize
    /// identically, regardless of insertion order.
    pub fn canonical_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.0)?)
    }

    /// First 8 hex chars of SHA-1 over the canonical JSON form
    pub fn content_hash(&self) -> Result<String> {
        let canonical = self.canonical_json()?;
        Ok(hash8(canonical.as_bytes()))
    }

    /// Serialize to YAML (the on-disk snapshot format)
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(&self.0)?)
    }

    /// Check if values are empty
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            JsonValue::Object(map) => map.is_empty(),
            JsonValue::Null => true,
            _ => false,
        }
    }
}

/// First 8 hex chars of the SHA-1 digest of `bytes`
pub fn hash8(bytes: &[u8]) -> String {
    let digest = Sha1::digest(bytes);
    hex::encode(digest)[..8].to_string()
}

/// Deep merge two JSON values
fn deep_merge(base: &mut JsonValue, overlay: &JsonValue) {
    match (base, overlay) {
        (JsonValue::Object(base_map), JsonValue::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    }
                }
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

/// Set a nested value by path, erroring on scalar intermediate segments
fn set_nested(
    value: &mut JsonValue,
    full_path: &str,
    path: &[&str],
    new_value: JsonValue,
) -> Result<()> {
    let key = path[0];
    let remaining = &path[1..];

    let map = match value {
        JsonValue::Object(map) => map,
        _ => {
            return Err(CoreError::PathConflict {
                path: full_path.to_string(),
                segment: key.to_string(),
            });
        }
    };

    if remaining.is_empty() {
        map.insert(key.to_string(), new_value);
        return Ok(());
    }

    let entry = map
        .entry(key.to_string())
        .or_insert_with(|| JsonValue::Object(serde_json::Map::new()));
    if !entry.is_object() {
        return Err(CoreError::PathConflict {
            path: full_path.to_string(),
            segment: key.to_string(),
        });
    }
    set_nested(entry, full_path, remaining, new_value)
}

/// Get a nested value by path
fn get_nested<'a>(value: &'a JsonValue, path: &[&str]) -> Option<&'a JsonValue> {
    if path.is_empty() {
        return Some(value);
    }

    match value {
        JsonValue::Object(map) => map.get(path[0]).and_then(|v| get_nested(v, &path[1..])),
        _ => None,
    }
}

fn split_assignment<'a>(arg: &'a str, flag: &str) -> Result<(&'a str, &'a str)> {
    arg.split_once('=').ok_or_else(|| CoreError::ValuesMerge {
        message: format!("Invalid {flag} format: '{arg}'. Expected key=value"),
    })
}

/// Parse --set arguments (key.path=value, typed scalars)
pub fn parse_set_values(set_args: &[String]) -> Result<Values> {
    let mut values = Values::new();

    for arg in set_args {
        let (key, val) = split_assignment(arg, "--set")?;

        let json_value = if val == "true" {
            JsonValue::Bool(true)
        } else if val == "false" {
            JsonValue::Bool(false)
        } else if val == "null" {
            JsonValue::Null
        } else if let Ok(num) = val.parse::<i64>() {
            JsonValue::Number(num.into())
        } else if let Ok(num) = val.parse::<f64>() {
            JsonValue::Number(serde_json::Number::from_f64(num).unwrap_or(0.into()))
        } else {
            JsonValue::String(val.to_string())
        };

        values.set_path(key, json_value)?;
    }

    Ok(values)
}

/// Parse --set-string arguments (value is always a string)
pub fn parse_set_string_values(set_args: &[String]) -> Result<Values> {
    let mut values = Values::new();

    for arg in set_args {
        let (key, val) = split_assignment(arg, "--set-string")?;
        values.set_path(key, JsonValue::String(val.to_string()))?;
    }

    Ok(values)
}

/// Parse --set-file arguments (key=path; the file content becomes a string
/// value at the key)
pub fn parse_set_file_values(set_args: &[String], base_dir: &Path) -> Result<Values> {
    let mut values = Values::new();

    for arg in set_args {
        let (key, file_path) = split_assignment(arg, "--set-file")?;
        let content = std::fs::read_to_string(base_dir.join(file_path))?;
        values.set_path(key, JsonValue::String(content))?;
    }

    Ok(values)
}
