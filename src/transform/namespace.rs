//! Namespace transform for app-mounting.
//!
//! Prefixes tool/prompt names with `{prefix}.` and resource/template URIs
//! with `{prefix}/`, stripping the prefix on the reverse (lookup) path.
//! Lookups without the prefix miss, so multiple providers can be mounted
//! side by side without colliding.

use crate::provider::{Prompt, Resource, ResourceTemplate, Tool};
use crate::transform::{GetNext, ListNext, Transform};

/// Mounts a provider's components under a fixed prefix.
#[derive(Debug, Clone)]
pub struct NamespaceTransform {
    prefix: String,
}

impl NamespaceTransform {
    /// Creates a namespace with the given prefix segment.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Returns the prefix segment.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn add_name(&self, name: &str) -> String {
        format!("{}.{name}", self.prefix)
    }

    fn strip_name<'a>(&self, name: &'a str) -> Option<&'a str> {
        name.strip_prefix(&self.prefix)?.strip_prefix('.')
    }

    fn add_uri(&self, uri: &str) -> String {
        format!("{}/{uri}", self.prefix)
    }

    fn strip_uri<'a>(&self, uri: &'a str) -> Option<&'a str> {
        uri.strip_prefix(&self.prefix)?.strip_prefix('/')
    }
}

impl Transform for NamespaceTransform {
    fn list_tools(&self, next: ListNext<'_, Tool>) -> Vec<Tool> {
        next()
            .into_iter()
            .map(|mut tool| {
                tool.name = self.add_name(&tool.name);
                tool
            })
            .collect()
    }

    fn get_tool(&self, name: &str, next: GetNext<'_, Tool>) -> Option<Tool> {
        let inner = self.strip_name(name)?;
        let mut tool = next(inner)?;
        tool.name = self.add_name(&tool.name);
        Some(tool)
    }

    fn list_resources(&self, next: ListNext<'_, Resource>) -> Vec<Resource> {
        next()
            .into_iter()
            .map(|mut resource| {
                resource.uri = self.add_uri(&resource.uri);
                resource
            })
            .collect()
    }

    fn get_resource(&self, uri: &str, next: GetNext<'_, Resource>) -> Option<Resource> {
        let inner = self.strip_uri(uri)?;
        let mut resource = next(inner)?;
        resource.uri = self.add_uri(&resource.uri);
        Some(resource)
    }

    fn list_resource_templates(&self, next: ListNext<'_, ResourceTemplate>) -> Vec<ResourceTemplate> {
        next()
            .into_iter()
            .map(|mut template| {
                template.uri_template = self.add_uri(&template.uri_template);
                template
            })
            .collect()
    }

    fn get_resource_template(
        &self,
        uri: &str,
        next: GetNext<'_, ResourceTemplate>,
    ) -> Option<ResourceTemplate> {
        let inner = self.strip_uri(uri)?;
        let mut template = next(inner)?;
        template.uri_template = self.add_uri(&template.uri_template);
        Some(template)
    }

    fn list_prompts(&self, next: ListNext<'_, Prompt>) -> Vec<Prompt> {
        next()
            .into_iter()
            .map(|mut prompt| {
                prompt.name = self.add_name(&prompt.name);
                prompt
            })
            .collect()
    }

    fn get_prompt(&self, name: &str, next: GetNext<'_, Prompt>) -> Option<Prompt> {
        let inner = self.strip_name(name)?;
        let mut prompt = next(inner)?;
        prompt.name = self.add_name(&prompt.name);
        Some(prompt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::{CapabilityProvider, ResourceContent};
    use crate::transform::ComposedProvider;
    use serde_json::json;
    use std::sync::Arc;

    fn composed() -> ComposedProvider {
        let mut provider = CapabilityProvider::new("inner");
        provider
            .add_tool(Tool::new("query", json!({"type": "object"}), |_| Ok(json!(1))))
            .unwrap();
        provider
            .add_resource(Resource::new("docs://readme", "readme", |_| {
                Ok(ResourceContent::text("hi"))
            }))
            .unwrap();
        ComposedProvider::new(provider).with_transform(Arc::new(NamespaceTransform::new("db")))
    }

    #[test]
    fn names_and_uris_are_prefixed() {
        let composed = composed();
        assert_eq!(composed.list_tools()[0].name, "db.query");
        assert_eq!(composed.list_resources()[0].uri, "db/docs://readme");
    }

    #[test]
    fn lookup_requires_prefix() {
        let composed = composed();
        assert_eq!(composed.get_tool("db.query").unwrap().name, "db.query");
        assert!(composed.get_tool("query").unwrap_err().is_not_found());

        assert!(composed.get_resource("db/docs://readme").is_ok());
        assert!(composed.get_resource("docs://readme").unwrap_err().is_not_found());
    }

    #[test]
    fn prefix_must_match_exactly() {
        let composed = composed();
        assert!(composed.get_tool("dbx.query").unwrap_err().is_not_found());
        assert!(composed.get_tool("db.missing").unwrap_err().is_not_found());
    }
}
