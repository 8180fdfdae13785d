//! Resource and resource-template definitions.
//!
//! Resources are URI-keyed; templates carry a URI pattern with `{param}`
//! placeholders matched against concrete URIs at read time. A `{param}`
//! placeholder matches a single path segment; `{param*}` matches greedily
//! across segments.

use std::fmt;
use std::sync::Arc;

use regex::Regex;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::provider::content::ResourceContent;

/// The callable behind a resource or template.
pub type ResourceProviderFn = dyn Fn(Value) -> Result<ResourceContent> + Send + Sync;

/// A URI-keyed readable resource.
#[derive(Clone)]
pub struct Resource {
    /// Unique URI within a provider.
    pub uri: String,
    /// Human-readable name.
    pub name: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// MIME type, if known.
    pub mime_type: Option<String>,
    /// Component version for version-range filtering.
    pub version: Option<String>,
    /// Opaque metadata side-channel (`_meta`).
    pub meta: Option<Value>,
    provider: Arc<ResourceProviderFn>,
}

impl Resource {
    /// Creates a resource from a URI, name, and provider function.
    pub fn new(
        uri: impl Into<String>,
        name: impl Into<String>,
        provider: impl Fn(Value) -> Result<ResourceContent> + Send + Sync + 'static,
    ) -> Self {
        Self {
            uri: uri.into(),
            name: name.into(),
            description: None,
            mime_type: None,
            version: None,
            meta: None,
            provider: Arc::new(provider),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the MIME type.
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Sets the component version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Attaches opaque `_meta` metadata.
    #[must_use]
    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }

    /// Reads the resource contents.
    ///
    /// # Errors
    ///
    /// Propagates whatever the provider function returns.
    pub fn read(&self, params: Value) -> Result<ResourceContent> {
        (self.provider)(params)
    }

    /// Returns `true` if the resource's `_meta` carries a `ui` entry.
    #[must_use]
    pub fn has_ui_metadata(&self) -> bool {
        self.meta.as_ref().and_then(|m| m.get("ui")).is_some()
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("uri", &self.uri)
            .field("name", &self.name)
            .field("mime_type", &self.mime_type)
            .finish_non_exhaustive()
    }
}

/// A resource pattern matched against concrete URIs at read time.
#[derive(Clone)]
pub struct ResourceTemplate {
    /// URI pattern with `{param}` / `{param*}` placeholders.
    pub uri_template: String,
    /// Human-readable name.
    pub name: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// MIME type, if known.
    pub mime_type: Option<String>,
    /// JSON Schema for the extracted parameters.
    pub parameters: Option<Value>,
    /// Component version for version-range filtering.
    pub version: Option<String>,
    pattern: Regex,
    param_names: Vec<String>,
    provider: Arc<ResourceProviderFn>,
}

impl ResourceTemplate {
    /// Creates a template from a URI pattern, name, and provider function.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the pattern contains an unterminated
    /// or empty placeholder.
    pub fn new(
        uri_template: impl Into<String>,
        name: impl Into<String>,
        provider: impl Fn(Value) -> Result<ResourceContent> + Send + Sync + 'static,
    ) -> Result<Self> {
        let uri_template = uri_template.into();
        let (pattern, param_names) = compile_template(&uri_template)?;
        Ok(Self {
            uri_template,
            name: name.into(),
            description: None,
            mime_type: None,
            parameters: None,
            version: None,
            pattern,
            param_names,
            provider: Arc::new(provider),
        })
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the MIME type.
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// Sets the parameter schema.
    #[must_use]
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = Some(parameters);
        self
    }

    /// Sets the component version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Returns the declared parameter names, in pattern order.
    #[must_use]
    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    /// Matches a concrete URI against the pattern, extracting parameters.
    #[must_use]
    pub fn matches(&self, uri: &str) -> Option<Map<String, Value>> {
        let captures = self.pattern.captures(uri)?;
        let mut params = Map::new();
        for (i, name) in self.param_names.iter().enumerate() {
            if let Some(m) = captures.get(i + 1) {
                params.insert(name.clone(), Value::String(m.as_str().to_string()));
            }
        }
        Some(params)
    }

    /// Reads the template contents with the given extracted parameters.
    ///
    /// # Errors
    ///
    /// Propagates whatever the provider function returns.
    pub fn read(&self, params: Value) -> Result<ResourceContent> {
        (self.provider)(params)
    }
}

impl fmt::Debug for ResourceTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceTemplate")
            .field("uri_template", &self.uri_template)
            .field("name", &self.name)
            .field("param_names", &self.param_names)
            .finish_non_exhaustive()
    }
}

/// Compiles a URI template into an anchored regex plus parameter names.
///
/// `{param}` compiles to a single-segment capture, `{param*}` to a greedy
/// multi-segment capture. Literal text is regex-escaped.
fn compile_template(template: &str) -> Result<(Regex, Vec<String>)> {
    let mut regex = String::with_capacity(template.len() + 8);
    let mut names = Vec::new();
    regex.push('^');

    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let (literal, after) = rest.split_at(open);
        regex.push_str(&regex::escape(literal));

        let close = after.find('}').ok_or_else(|| {
            Error::validation(format!("unterminated placeholder in template '{template}'"))
        })?;
        let raw = &after[1..close];
        let (name, greedy) = match raw.strip_suffix('*') {
            Some(stripped) => (stripped, true),
            None => (raw, false),
        };
        if name.is_empty() {
            return Err(Error::validation(format!(
                "empty placeholder in template '{template}'"
            )));
        }
        names.push(name.to_string());
        regex.push_str(if greedy { "(.+)" } else { "([^/]+)" });

        rest = &after[close + 1..];
    }
    regex.push_str(&regex::escape(rest));
    regex.push('$');

    let pattern = Regex::new(&regex)
        .map_err(|e| Error::validation(format!("invalid template '{template}': {e}")))?;
    Ok((pattern, names))
}
