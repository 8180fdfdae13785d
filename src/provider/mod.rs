//! Capability providers.
//!
//! A [`CapabilityProvider`] holds named tools, URI-keyed resources,
//! pattern-matched resource templates, and named prompts, and exposes
//! `list_*`/`get_*` operations per kind.
//!
//! # Invariants
//!
//! - Names/URIs are unique within a single provider; a duplicate
//!   registration is resolved by the configured [`DuplicatePolicy`], never
//!   by silent double-registration.
//! - Registries preserve insertion order; list order is registration order.
//! - Providers are constructed at startup and immutable in shape
//!   thereafter (entries may be replaced wholesale under the `Replace`
//!   policy, not mutated in place).

pub mod content;
pub mod prompt;
pub mod resource;
pub mod tool;

pub use content::{Content, EmbeddedResource, PromptMessage, ResourceContent, Role};
pub use prompt::{Prompt, PromptArgument};
pub use resource::{Resource, ResourceTemplate};
pub use tool::Tool;

use std::collections::HashSet;
use std::sync::Mutex;

use indexmap::IndexMap;

use crate::error::{Error, Result};

/// How a provider resolves a duplicate registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Raise a validation failure.
    #[default]
    Error,
    /// Log a warning once per duplicate key and keep the old entry.
    Warn,
    /// Overwrite the old entry.
    Replace,
    /// Keep the old entry silently.
    Ignore,
}

impl DuplicatePolicy {
    /// Parses a policy from its configuration string.
    ///
    /// # Errors
    ///
    /// Returns a validation error for unknown policy names.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "error" => Ok(Self::Error),
            "warn" => Ok(Self::Warn),
            "replace" => Ok(Self::Replace),
            "ignore" => Ok(Self::Ignore),
            other => Err(Error::validation(format!(
                "unknown duplicate policy '{other}' (expected error, warn, replace, or ignore)"
            ))),
        }
    }
}

/// Outcome of applying the duplicate policy to one registration.
enum DuplicateOutcome {
    Insert,
    KeepOld,
}

/// A capability source: tools, resources, templates, and prompts.
pub struct CapabilityProvider {
    name: String,
    policy: DuplicatePolicy,
    tools: IndexMap<String, Tool>,
    resources: IndexMap<String, Resource>,
    templates: IndexMap<String, ResourceTemplate>,
    prompts: IndexMap<String, Prompt>,
    // Keys already warned about under the Warn policy.
    warned: Mutex<HashSet<String>>,
}

impl CapabilityProvider {
    /// Creates an empty provider with the default (`Error`) duplicate policy.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_policy(name, DuplicatePolicy::default())
    }

    /// Creates an empty provider with an explicit duplicate policy.
    #[must_use]
    pub fn with_policy(name: impl Into<String>, policy: DuplicatePolicy) -> Self {
        Self {
            name: name.into(),
            policy,
            tools: IndexMap::new(),
            resources: IndexMap::new(),
            templates: IndexMap::new(),
            prompts: IndexMap::new(),
            warned: Mutex::new(HashSet::new()),
        }
    }

    /// Returns the provider's name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Applies the duplicate policy for `key` against an existing entry.
    fn resolve_duplicate(&self, kind: &str, key: &str) -> Result<DuplicateOutcome> {
        match self.policy {
            DuplicatePolicy::Error => Err(Error::validation(format!(
                "duplicate {kind} '{key}' in provider '{}'",
                self.name
            ))),
            DuplicatePolicy::Warn => {
                let full_key = format!("{kind}:{key}");
                let mut warned = self
                    .warned
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
                if warned.insert(full_key) {
                    tracing::warn!(
                        provider = %self.name,
                        kind,
                        key,
                        "duplicate registration ignored, keeping existing entry"
                    );
                }
                Ok(DuplicateOutcome::KeepOld)
            }
            DuplicatePolicy::Replace => Ok(DuplicateOutcome::Insert),
            DuplicatePolicy::Ignore => Ok(DuplicateOutcome::KeepOld),
        }
    }

    /// Registers a tool.
    ///
    /// # Errors
    ///
    /// Returns a validation error on duplicate names under the `Error`
    /// policy.
    pub fn add_tool(&mut self, tool: Tool) -> Result<()> {
        if self.tools.contains_key(&tool.name) {
            if let DuplicateOutcome::KeepOld = self.resolve_duplicate("tool", &tool.name)? {
                return Ok(());
            }
        }
        self.tools.insert(tool.name.clone(), tool);
        Ok(())
    }

    /// Registers a resource.
    ///
    /// # Errors
    ///
    /// Returns a validation error on duplicate URIs under the `Error`
    /// policy.
    pub fn add_resource(&mut self, resource: Resource) -> Result<()> {
        if self.resources.contains_key(&resource.uri) {
            if let DuplicateOutcome::KeepOld = self.resolve_duplicate("resource", &resource.uri)? {
                return Ok(());
            }
        }
        self.resources.insert(resource.uri.clone(), resource);
        Ok(())
    }

    /// Registers a resource template.
    ///
    /// # Errors
    ///
    /// Returns a validation error on duplicate patterns under the `Error`
    /// policy.
    pub fn add_resource_template(&mut self, template: ResourceTemplate) -> Result<()> {
        if self.templates.contains_key(&template.uri_template) {
            if let DuplicateOutcome::KeepOld =
                self.resolve_duplicate("template", &template.uri_template)?
            {
                return Ok(());
            }
        }
        self.templates
            .insert(template.uri_template.clone(), template);
        Ok(())
    }

    /// Registers a prompt.
    ///
    /// # Errors
    ///
    /// Returns a validation error on duplicate names under the `Error`
    /// policy.
    pub fn add_prompt(&mut self, prompt: Prompt) -> Result<()> {
        if self.prompts.contains_key(&prompt.name) {
            if let DuplicateOutcome::KeepOld = self.resolve_duplicate("prompt", &prompt.name)? {
                return Ok(());
            }
        }
        self.prompts.insert(prompt.name.clone(), prompt);
        Ok(())
    }

    /// Lists all tools in registration order.
    #[must_use]
    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools.values().cloned().collect()
    }

    /// Lists all resources in registration order.
    #[must_use]
    pub fn list_resources(&self) -> Vec<Resource> {
        self.resources.values().cloned().collect()
    }

    /// Lists all resource templates in registration order.
    #[must_use]
    pub fn list_resource_templates(&self) -> Vec<ResourceTemplate> {
        self.templates.values().cloned().collect()
    }

    /// Lists all prompts in registration order.
    #[must_use]
    pub fn list_prompts(&self) -> Vec<Prompt> {
        self.prompts.values().cloned().collect()
    }

    /// Non-throwing tool lookup.
    #[must_use]
    pub fn tool(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// Non-throwing resource lookup.
    #[must_use]
    pub fn resource(&self, uri: &str) -> Option<&Resource> {
        self.resources.get(uri)
    }

    /// Non-throwing template match: first template whose pattern matches
    /// the concrete URI wins.
    #[must_use]
    pub fn resource_template(&self, uri: &str) -> Option<&ResourceTemplate> {
        self.templates.values().find(|t| t.matches(uri).is_some())
    }

    /// Non-throwing prompt lookup.
    #[must_use]
    pub fn prompt(&self, name: &str) -> Option<&Prompt> {
        self.prompts.get(name)
    }

    /// Looks up a tool by name.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown names.
    pub fn get_tool(&self, name: &str) -> Result<Tool> {
        self.tool(name)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("tool '{name}'")))
    }

    /// Looks up a resource by URI.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown URIs.
    pub fn get_resource(&self, uri: &str) -> Result<Resource> {
        self.resource(uri)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("resource '{uri}'")))
    }

    /// Looks up the first resource template matching a concrete URI.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no pattern matches.
    pub fn get_resource_template(&self, uri: &str) -> Result<ResourceTemplate> {
        self.resource_template(uri)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("resource template matching '{uri}'")))
    }

    /// Looks up a prompt by name.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown names.
    pub fn get_prompt(&self, name: &str) -> Result<Prompt> {
        self.prompt(name)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("prompt '{name}'")))
    }
}

impl std::fmt::Debug for CapabilityProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapabilityProvider")
            .field("name", &self.name)
            .field("tools", &self.tools.len())
            .field("resources", &self.resources.len())
            .field("templates", &self.templates.len())
            .field("prompts", &self.prompts.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool(name: &str) -> Tool {
        Tool::new(name, json!({"type": "object"}), |_| Ok(json!("ok")))
    }

    #[test]
    fn list_order_is_registration_order() {
        let mut provider = CapabilityProvider::new("test");
        provider.add_tool(tool("zeta")).unwrap();
        provider.add_tool(tool("alpha")).unwrap();
        provider.add_tool(tool("mid")).unwrap();

        let names: Vec<_> = provider.list_tools().iter().map(|t| t.name.clone()).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn duplicate_tool_errors_by_default() {
        let mut provider = CapabilityProvider::new("test");
        provider.add_tool(tool("echo")).unwrap();
        let err = provider.add_tool(tool("echo")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("echo"));
    }

    #[test]
    fn duplicate_replace_overwrites() {
        let mut provider = CapabilityProvider::with_policy("test", DuplicatePolicy::Replace);
        provider.add_tool(tool("echo").with_version("1")).unwrap();
        provider.add_tool(tool("echo").with_version("2")).unwrap();

        assert_eq!(provider.list_tools().len(), 1);
        assert_eq!(provider.get_tool("echo").unwrap().version.as_deref(), Some("2"));
    }

    #[test]
    fn duplicate_ignore_keeps_old() {
        let mut provider = CapabilityProvider::with_policy("test", DuplicatePolicy::Ignore);
        provider.add_tool(tool("echo").with_version("1")).unwrap();
        provider.add_tool(tool("echo").with_version("2")).unwrap();

        assert_eq!(provider.get_tool("echo").unwrap().version.as_deref(), Some("1"));
    }

    #[test]
    fn duplicate_warn_keeps_old() {
        let mut provider = CapabilityProvider::with_policy("test", DuplicatePolicy::Warn);
        provider.add_tool(tool("echo").with_version("1")).unwrap();
        provider.add_tool(tool("echo").with_version("2")).unwrap();
        // Second duplicate exercises the warn-once path.
        provider.add_tool(tool("echo").with_version("3")).unwrap();

        assert_eq!(provider.get_tool("echo").unwrap().version.as_deref(), Some("1"));
    }

    #[test]
    fn get_missing_tool_is_not_found() {
        let provider = CapabilityProvider::new("test");
        let err = provider.get_tool("ghost").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn first_matching_template_wins() {
        let mut provider = CapabilityProvider::new("test");
        provider
            .add_resource_template(
                ResourceTemplate::new("notes://{id}", "by-id", |_| {
                    Ok(ResourceContent::text("first"))
                })
                .unwrap(),
            )
            .unwrap();
        provider
            .add_resource_template(
                ResourceTemplate::new("notes://{rest*}", "catch-all", |_| {
                    Ok(ResourceContent::text("second"))
                })
                .unwrap(),
            )
            .unwrap();

        let matched = provider.get_resource_template("notes://7").unwrap();
        assert_eq!(matched.name, "by-id");

        // Only the catch-all matches a multi-segment URI.
        let matched = provider.get_resource_template("notes://a/b").unwrap();
        assert_eq!(matched.name, "catch-all");
    }

    #[test]
    fn policy_parse() {
        assert_eq!(DuplicatePolicy::parse("warn").unwrap(), DuplicatePolicy::Warn);
        assert!(DuplicatePolicy::parse("panic").is_err());
    }
}
