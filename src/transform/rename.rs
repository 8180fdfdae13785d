//! Per-tool rename, description, and argument-remap transforms.
//!
//! A [`ToolTransform`] maps original tool names to [`TransformConfig`]
//! entries. Renamed tools publish under their target name only; lookups by
//! the original name miss. Argument renames rewrite the published schema
//! and reverse-map caller arguments before invoking the wrapped tool.

use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::provider::Tool;
use crate::transform::{GetNext, ListNext, Transform};

/// Rewrite rules for one tool.
#[derive(Debug, Clone, Default)]
pub struct TransformConfig {
    /// New published name, if renamed.
    pub rename: Option<String>,
    /// Replacement description.
    pub description: Option<String>,
    /// Argument renames: original argument name → published name.
    pub argument_renames: IndexMap<String, String>,
    /// Visibility override: `Some(false)` hides the tool without removing
    /// it; unset and `Some(true)` leave it visible.
    pub enabled: Option<bool>,
}

impl TransformConfig {
    /// Creates a config renaming the tool.
    #[must_use]
    pub fn renamed(target: impl Into<String>) -> Self {
        Self {
            rename: Some(target.into()),
            ..Self::default()
        }
    }

    /// Sets the replacement description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds an argument rename.
    #[must_use]
    pub fn with_argument_rename(
        mut self,
        original: impl Into<String>,
        published: impl Into<String>,
    ) -> Self {
        self.argument_renames.insert(original.into(), published.into());
        self
    }

    /// Sets the visibility override.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    const fn hidden(&self) -> bool {
        matches!(self.enabled, Some(false))
    }
}

/// Applies per-tool rewrite rules to a provider's tools.
#[derive(Debug)]
pub struct ToolTransform {
    configs: IndexMap<String, TransformConfig>,
    // Published (target) name → original name.
    reverse: HashMap<String, String>,
}

impl ToolTransform {
    /// Creates the transform, validating the rename mapping.
    ///
    /// # Errors
    ///
    /// Returns a validation error if two distinct original names map to
    /// the same target name.
    pub fn new(configs: IndexMap<String, TransformConfig>) -> Result<Self> {
        let mut reverse = HashMap::new();
        for (original, config) in &configs {
            let target = config.rename.clone().unwrap_or_else(|| original.clone());
            if let Some(previous) = reverse.insert(target.clone(), original.clone()) {
                return Err(Error::validation(format!(
                    "tools '{previous}' and '{original}' both transform to target name '{target}'"
                )));
            }
        }
        Ok(Self { configs, reverse })
    }

    /// Applies one config to a tool.
    fn apply(config: &TransformConfig, tool: Tool) -> Tool {
        let mut transformed = tool.clone();
        if let Some(rename) = &config.rename {
            transformed.name = rename.clone();
        }
        if let Some(description) = &config.description {
            transformed.description = Some(description.clone());
        }
        if !config.argument_renames.is_empty() {
            transformed.input_schema =
                remap_schema(&transformed.input_schema, &config.argument_renames);
            let renames = config.argument_renames.clone();
            transformed = transformed.with_handler(move |mut args| {
                if let Value::Object(map) = &mut args {
                    for (original, published) in &renames {
                        if let Some(value) = map.remove(published) {
                            map.insert(original.clone(), value);
                        }
                    }
                }
                tool.invoke(args)
            });
        }
        transformed
    }
}

impl Transform for ToolTransform {
    fn list_tools(&self, next: ListNext<'_, Tool>) -> Vec<Tool> {
        next()
            .into_iter()
            .filter_map(|tool| match self.configs.get(&tool.name) {
                None => Some(tool),
                Some(config) if config.hidden() => None,
                Some(config) => Some(Self::apply(config, tool)),
            })
            .collect()
    }

    fn get_tool(&self, name: &str, next: GetNext<'_, Tool>) -> Option<Tool> {
        if let Some(original) = self.reverse.get(name) {
            let config = &self.configs[original];
            if config.hidden() {
                return None;
            }
            let tool = next(original)?;
            let transformed = Self::apply(config, tool);
            // Defends against stale lookups: the transformed result must
            // carry exactly the name that was asked for.
            if transformed.name == name {
                return Some(transformed);
            }
            return None;
        }
        // The name is not a published target. If a config claims it as an
        // original (renamed away or hidden), the lookup must miss.
        if self.configs.contains_key(name) {
            return None;
        }
        next(name)
    }
}

/// Rewrites schema property keys and `required` entries per the rename map.
fn remap_schema(schema: &Value, renames: &IndexMap<String, String>) -> Value {
    let mut schema = schema.clone();
    if let Some(properties) = schema.get_mut("properties").and_then(Value::as_object_mut) {
        for (original, published) in renames {
            if let Some(value) = properties.remove(original) {
                properties.insert(published.clone(), value);
            }
        }
    }
    if let Some(required) = schema.get_mut("required").and_then(Value::as_array_mut) {
        for entry in required.iter_mut() {
            if let Some(name) = entry.as_str() {
                if let Some(published) = renames.get(name) {
                    *entry = Value::String(published.clone());
                }
            }
        }
    }
    schema
}
