//! Tool definitions.
//!
//! A [`Tool`] bundles a published JSON Schema with the callable that
//! implements it. Handlers are plain closures returning a JSON value; the
//! protocol layer normalises that value into content blocks.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::Result;

/// The callable behind a tool.
pub type ToolHandler = dyn Fn(Value) -> Result<Value> + Send + Sync;

/// A named, invocable capability.
#[derive(Clone)]
pub struct Tool {
    /// Unique name within a provider.
    pub name: String,
    /// Human-readable title.
    pub title: Option<String>,
    /// Human-readable description.
    pub description: Option<String>,
    /// JSON Schema for the tool's arguments.
    pub input_schema: Value,
    /// JSON Schema for structured results, if the tool produces them.
    pub output_schema: Option<Value>,
    /// Icon metadata, if any.
    pub icons: Option<Value>,
    /// Component version for version-range filtering.
    pub version: Option<String>,
    /// Argument names stripped from the published schema but still passed
    /// through to the handler.
    pub excluded_args: Vec<String>,
    /// Advisory flag: this tool is not safely parallelisable.
    pub sequential: bool,
    /// Opaque metadata side-channel (`_meta`).
    pub meta: Option<Value>,
    handler: Arc<ToolHandler>,
}

impl Tool {
    /// Creates a tool from a name, input schema, and handler.
    pub fn new(
        name: impl Into<String>,
        input_schema: Value,
        handler: impl Fn(Value) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            title: None,
            description: None,
            input_schema,
            output_schema: None,
            icons: None,
            version: None,
            excluded_args: Vec::new(),
            sequential: false,
            meta: None,
            handler: Arc::new(handler),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the output schema for structured results.
    #[must_use]
    pub fn with_output_schema(mut self, schema: Value) -> Self {
        self.output_schema = Some(schema);
        self
    }

    /// Sets icon metadata.
    #[must_use]
    pub fn with_icons(mut self, icons: Value) -> Self {
        self.icons = Some(icons);
        self
    }

    /// Sets the component version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Marks argument names as excluded from the published schema.
    #[must_use]
    pub fn with_excluded_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Marks the tool as not safely parallelisable.
    #[must_use]
    pub const fn sequential(mut self) -> Self {
        self.sequential = true;
        self
    }

    /// Attaches opaque `_meta` metadata.
    #[must_use]
    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Invokes the tool with the given arguments.
    ///
    /// Excluded arguments are a publishing concern only; the full argument
    /// object reaches the handler.
    ///
    /// # Errors
    ///
    /// Propagates whatever the handler returns.
    pub fn invoke(&self, args: Value) -> Result<Value> {
        (self.handler)(args)
    }

    /// Returns `true` if the tool's `_meta` carries a `ui` entry.
    #[must_use]
    pub fn has_ui_metadata(&self) -> bool {
        self.meta
            .as_ref()
            .and_then(|m| m.get("ui"))
            .is_some()
    }

    /// Replaces the handler, keeping all published metadata.
    ///
    /// Used by transforms that need to wrap invocation (argument renaming).
    #[must_use]
    pub fn with_handler(
        mut self,
        handler: impl Fn(Value) -> Result<Value> + Send + Sync + 'static,
    ) -> Self {
        self.handler = Arc::new(handler);
        self
    }
}

impl fmt::Debug for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("version", &self.version)
            .field("sequential", &self.sequential)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use serde_json::json;

    fn echo_tool() -> Tool {
        Tool::new(
            "echo",
            json!({"type": "object", "properties": {"text": {"type": "string"}}}),
            |args| Ok(json!({"echoed": args["text"]})),
        )
    }

    #[test]
    fn invoke_passes_arguments() {
        let tool = echo_tool();
        let result = tool.invoke(json!({"text": "hi"})).unwrap();
        assert_eq!(result["echoed"], "hi");
    }

    #[test]
    fn builder_chain_sets_fields() {
        let tool = echo_tool()
            .with_description("Echo text back")
            .with_title("Echo")
            .with_version("1.2.0")
            .with_excluded_args(["session_id"])
            .sequential();

        assert_eq!(tool.description.as_deref(), Some("Echo text back"));
        assert_eq!(tool.title.as_deref(), Some("Echo"));
        assert_eq!(tool.version.as_deref(), Some("1.2.0"));
        assert_eq!(tool.excluded_args, vec!["session_id"]);
        assert!(tool.sequential);
    }

    #[test]
    fn excluded_args_still_reach_handler() {
        let tool = Tool::new("probe", json!({"type": "object"}), |args| {
            Ok(json!({"saw_hidden": args.get("hidden").is_some()}))
        })
        .with_excluded_args(["hidden"]);

        let result = tool.invoke(json!({"hidden": true})).unwrap();
        assert_eq!(result["saw_hidden"], true);
    }

    #[test]
    fn ui_metadata_detection() {
        let plain = echo_tool();
        assert!(!plain.has_ui_metadata());

        let ui = echo_tool().with_meta(json!({"ui": {"panel": "inline"}}));
        assert!(ui.has_ui_metadata());
    }

    #[test]
    fn handler_error_propagates() {
        let tool = Tool::new("failing", json!({"type": "object"}), |_| {
            Err(Error::message("boom"))
        });
        let err = tool.invoke(json!({})).unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }
}
