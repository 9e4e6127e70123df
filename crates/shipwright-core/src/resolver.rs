//! Value resolution: chart defaults, operator overrides, child chart scoping
//!
//! The override chain is shallow (top-level last-wins); building a child
//! chart's context is a deep merge. See `values.rs` for the contract.

use serde_json::Value as JsonValue;
use std::path::PathBuf;

use crate::chart::{GlobalValues, LoadedChart};
use crate::error::{CoreError, Result};
use crate::values::{
    Values, parse_set_file_values, parse_set_string_values, parse_set_values,
};

/// Operator-supplied overrides, applied in order after the chart defaults
#[derive(Debug, Clone, Default)]
pub struct OverrideSpec {
    /// --values/-f files, applied in the order given
    pub values_files: Vec<PathBuf>,
    /// --set key.path=value assignments (typed scalars)
    pub set: Vec<String>,
    /// --set-string key.path=value assignments (always strings)
    pub set_string: Vec<String>,
    /// --set-file key.path=path assignments (file content as string)
    pub set_file: Vec<String>,
}

/// The fully merged root configuration plus the typed global block
#[derive(Debug, Clone)]
pub struct ResolvedValues {
    pub merged: Values,
    pub global: GlobalValues,
}

impl ResolvedValues {
    /// Lower-cased network name for hook containers, "default" if unset
    pub fn network_name(&self) -> String {
        if self.global.network.name.is_empty() {
            "default".to_string()
        } else {
            self.global.network.name.to_lowercase()
        }
    }

    /// Lower-cased compose project name, "default" if unset
    pub fn project_name(&self) -> String {
        if self.global.project_name.is_empty() {
            "default".to_string()
        } else {
            self.global.project_name.to_lowercase()
        }
    }
}

/// Resolves the root chart's values against operator overrides
pub struct ValueResolver<'a> {
    chart: &'a LoadedChart,
}

impl<'a> ValueResolver<'a> {
    pub fn new(chart: &'a LoadedChart) -> Self {
        Self { chart }
    }

    /// Build the merged root configuration.
    ///
    /// Order: chart defaults, then each values file, then --set, then
    /// --set-string, then --set-file. Each overlay is shallow top-level
    /// last-wins. The `global` namespace is recomputed from the typed block
    /// last and overwrites any same-named user key.
    pub fn resolve(&self, overrides: &OverrideSpec) -> Result<ResolvedValues> {
        let values_file = self.chart.load_values_file()?;
        let mut merged = Values(JsonValue::Object(values_file.values.clone()));

        for file in &overrides.values_files {
            let vals = Values::from_file(file).map_err(|e| CoreError::ValuesMerge {
                message: format!("failed to load values file {}: {e}", file.display()),
            })?;
            merged.overlay(&vals);
        }

        merged.overlay(&parse_set_values(&overrides.set)?);
        merged.overlay(&parse_set_string_values(&overrides.set_string)?);
        merged.overlay(&parse_set_file_values(&overrides.set_file, &self.chart.root)?);

        // global wins over any user-supplied key of the same name
        let global = values_file.global;
        if let Some(map) = merged.0.as_object_mut() {
            map.insert("global".to_string(), serde_json::to_value(&global)?);
        }

        Ok(ResolvedValues { merged, global })
    }

    /// Build the rendering context for one child chart.
    ///
    /// Layering, lowest first: the global namespace; the root chart's own
    /// namespace under `root`; every sibling chart's namespace under its own
    /// name; finally the child's own namespace deep-merged on top so its
    /// keys win over siblings and defaults.
    pub fn child_context(&self, resolved: &ResolvedValues, child: &str) -> Result<Values> {
        let merged = resolved
            .merged
            .inner()
            .as_object()
            .ok_or_else(|| CoreError::ValuesMerge {
                message: "merged root configuration is not a mapping".to_string(),
            })?;

        let child_values = match merged.get(child) {
            Some(JsonValue::Object(obj)) => obj.clone(),
            Some(_) => {
                return Err(CoreError::ValuesMerge {
                    message: format!("values for child chart '{child}' are not a mapping"),
                });
            }
            None => serde_json::Map::new(),
        };

        let root_name = self.chart.chart.name.as_str();
        let mut context = serde_json::Map::new();

        if let Some(global) = merged.get("global") {
            context.insert("global".to_string(), global.clone());
        }

        if let Some(JsonValue::Object(root_values)) = merged.get(root_name) {
            context.insert("root".to_string(), JsonValue::Object(root_values.clone()));
        }

        for (name, value) in merged {
            if name == child || name == "global" || name == root_name {
                continue;
            }
            if let JsonValue::Object(obj) = value {
                context.insert(name.clone(), JsonValue::Object(obj.clone()));
            }
        }

        let mut context = Values(JsonValue::Object(context));
        context.merge(&Values(JsonValue::Object(child_values)));
        Ok(context)
    }
}
