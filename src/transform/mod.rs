//! Transform chains over capability providers.
//!
//! A [`Transform`] decorates a provider's list/get operations through a
//! call-next continuation: it may filter or modify what `next` returns,
//! call `next` with different arguments (renaming), or short-circuit
//! without calling `next` at all. A transform never owns the wrapped
//! provider's data.
//!
//! # Composition order
//!
//! [`ComposedProvider`] folds the chain at query time starting from the
//! base operation: for each transform in registration order, the current
//! chain becomes the new transform's `next`. Consequently the **most
//! recently registered transform executes first** (outermost) and the
//! first-registered transform sits closest to the base. Execution order is
//! the reverse of registration order. This asymmetry is intentional; do
//! not "fix" it.

pub mod namespace;
pub mod rename;
pub mod version;
pub mod visibility;

pub use namespace::NamespaceTransform;
pub use rename::{ToolTransform, TransformConfig};
pub use version::VersionFilter;
pub use visibility::VisibilityTransform;

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::provider::{CapabilityProvider, Prompt, Resource, ResourceTemplate, Tool};

/// Continuation for a list operation.
pub type ListNext<'a, T> = &'a dyn Fn() -> Vec<T>;

/// Continuation for a keyed get operation.
pub type GetNext<'a, T> = &'a dyn Fn(&str) -> Option<T>;

/// A decorator over a provider's operations.
///
/// Every method defaults to delegating unchanged; implementors override
/// only the operation families they care about.
pub trait Transform: Send + Sync {
    /// Decorates `list_tools`.
    fn list_tools(&self, next: ListNext<'_, Tool>) -> Vec<Tool> {
        next()
    }

    /// Decorates `get_tool`.
    fn get_tool(&self, name: &str, next: GetNext<'_, Tool>) -> Option<Tool> {
        next(name)
    }

    /// Decorates `list_resources`.
    fn list_resources(&self, next: ListNext<'_, Resource>) -> Vec<Resource> {
        next()
    }

    /// Decorates `get_resource`.
    fn get_resource(&self, uri: &str, next: GetNext<'_, Resource>) -> Option<Resource> {
        next(uri)
    }

    /// Decorates `list_resource_templates`.
    fn list_resource_templates(&self, next: ListNext<'_, ResourceTemplate>) -> Vec<ResourceTemplate> {
        next()
    }

    /// Decorates `get_resource_template` (keyed by concrete URI).
    fn get_resource_template(
        &self,
        uri: &str,
        next: GetNext<'_, ResourceTemplate>,
    ) -> Option<ResourceTemplate> {
        next(uri)
    }

    /// Decorates `list_prompts`.
    fn list_prompts(&self, next: ListNext<'_, Prompt>) -> Vec<Prompt> {
        next()
    }

    /// Decorates `get_prompt`.
    fn get_prompt(&self, name: &str, next: GetNext<'_, Prompt>) -> Option<Prompt> {
        next(name)
    }
}

/// A provider with an ordered transform chain folded over its operations.
pub struct ComposedProvider {
    base: CapabilityProvider,
    transforms: Vec<Arc<dyn Transform>>,
}

impl ComposedProvider {
    /// Wraps a provider with an empty transform chain.
    #[must_use]
    pub fn new(base: CapabilityProvider) -> Self {
        Self {
            base,
            transforms: Vec::new(),
        }
    }

    /// Appends a transform to the chain (it becomes the new outermost).
    pub fn add_transform(&mut self, transform: Arc<dyn Transform>) {
        self.transforms.push(transform);
    }

    /// Builder-style [`Self::add_transform`].
    #[must_use]
    pub fn with_transform(mut self, transform: Arc<dyn Transform>) -> Self {
        self.add_transform(transform);
        self
    }

    /// Returns the underlying provider.
    #[must_use]
    pub const fn base(&self) -> &CapabilityProvider {
        &self.base
    }

    /// Lists tools through the chain.
    #[must_use]
    pub fn list_tools(&self) -> Vec<Tool> {
        fold_list(&self.transforms, &|| self.base.list_tools(), &|t, next| {
            t.list_tools(next)
        })
    }

    /// Lists resources through the chain.
    #[must_use]
    pub fn list_resources(&self) -> Vec<Resource> {
        fold_list(&self.transforms, &|| self.base.list_resources(), &|t, next| {
            t.list_resources(next)
        })
    }

    /// Lists resource templates through the chain.
    #[must_use]
    pub fn list_resource_templates(&self) -> Vec<ResourceTemplate> {
        fold_list(
            &self.transforms,
            &|| self.base.list_resource_templates(),
            &|t, next| t.list_resource_templates(next),
        )
    }

    /// Lists prompts through the chain.
    #[must_use]
    pub fn list_prompts(&self) -> Vec<Prompt> {
        fold_list(&self.transforms, &|| self.base.list_prompts(), &|t, next| {
            t.list_prompts(next)
        })
    }

    /// Looks up a tool through the chain.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no transform or the base resolves the name.
    pub fn get_tool(&self, name: &str) -> Result<Tool> {
        fold_get(
            &self.transforms,
            name,
            &|n| self.base.tool(n).cloned(),
            &|t, n, next| t.get_tool(n, next),
        )
        .ok_or_else(|| Error::not_found(format!("tool '{name}'")))
    }

    /// Looks up a resource through the chain.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no transform or the base resolves the URI.
    pub fn get_resource(&self, uri: &str) -> Result<Resource> {
        fold_get(
            &self.transforms,
            uri,
            &|u| self.base.resource(u).cloned(),
            &|t, u, next| t.get_resource(u, next),
        )
        .ok_or_else(|| Error::not_found(format!("resource '{uri}'")))
    }

    /// Looks up the first matching resource template through the chain.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no pattern matches the URI.
    pub fn get_resource_template(&self, uri: &str) -> Result<ResourceTemplate> {
        fold_get(
            &self.transforms,
            uri,
            &|u| self.base.resource_template(u).cloned(),
            &|t, u, next| t.get_resource_template(u, next),
        )
        .ok_or_else(|| Error::not_found(format!("resource template matching '{uri}'")))
    }

    /// Looks up a prompt through the chain.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no transform or the base resolves the name.
    pub fn get_prompt(&self, name: &str) -> Result<Prompt> {
        fold_get(
            &self.transforms,
            name,
            &|n| self.base.prompt(n).cloned(),
            &|t, n, next| t.get_prompt(n, next),
        )
        .ok_or_else(|| Error::not_found(format!("prompt '{name}'")))
    }
}

impl From<CapabilityProvider> for ComposedProvider {
    fn from(base: CapabilityProvider) -> Self {
        Self::new(base)
    }
}

/// Folds a list operation: the last-registered transform is outermost.
fn fold_list<T>(
    transforms: &[Arc<dyn Transform>],
    base: &dyn Fn() -> Vec<T>,
    apply: &dyn Fn(&dyn Transform, ListNext<'_, T>) -> Vec<T>,
) -> Vec<T> {
    match transforms.split_last() {
        Some((outer, rest)) => apply(outer.as_ref(), &|| fold_list(rest, base, apply)),
        None => base(),
    }
}

/// Folds a keyed get operation: the last-registered transform is outermost.
fn fold_get<T>(
    transforms: &[Arc<dyn Transform>],
    key: &str,
    base: &dyn Fn(&str) -> Option<T>,
    apply: &dyn Fn(&dyn Transform, &str, GetNext<'_, T>) -> Option<T>,
) -> Option<T> {
    match transforms.split_last() {
        Some((outer, rest)) => apply(outer.as_ref(), key, &|k: &str| {
            fold_get(rest, k, base, apply)
        }),
        None => base(key),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tool(name: &str) -> Tool {
        Tool::new(name, json!({"type": "object"}), |_| Ok(json!("ok")))
    }

    fn provider(names: &[&str]) -> CapabilityProvider {
        let mut p = CapabilityProvider::new("test");
        for name in names {
            p.add_tool(tool(name)).unwrap();
        }
        p
    }

    /// Records its tag when its list operation runs.
    struct Tagger {
        tag: &'static str,
        log: std::sync::Mutex<Vec<&'static str>>,
    }

    impl Transform for Tagger {
        fn list_tools(&self, next: ListNext<'_, Tool>) -> Vec<Tool> {
            self.log
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(self.tag);
            next()
        }
    }

    #[test]
    fn empty_chain_is_passthrough() {
        let composed = ComposedProvider::new(provider(&["a", "b"]));
        assert_eq!(composed.list_tools().len(), 2);
        assert_eq!(composed.get_tool("a").unwrap().name, "a");
        assert!(composed.get_tool("missing").unwrap_err().is_not_found());
    }

    #[test]
    fn last_registered_executes_first() {
        let log = Arc::new(std::sync::Mutex::new(Vec::new()));

        struct SharedTagger(&'static str, Arc<std::sync::Mutex<Vec<&'static str>>>);
        impl Transform for SharedTagger {
            fn list_tools(&self, next: ListNext<'_, Tool>) -> Vec<Tool> {
                self.1
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner)
                    .push(self.0);
                next()
            }
        }

        let composed = ComposedProvider::new(provider(&["a"]))
            .with_transform(Arc::new(SharedTagger("first-registered", Arc::clone(&log))))
            .with_transform(Arc::new(SharedTagger("second-registered", Arc::clone(&log))));

        composed.list_tools();
        let order = log
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone();
        assert_eq!(order, vec!["second-registered", "first-registered"]);
    }

    #[test]
    fn short_circuit_skips_inner_transforms() {
        struct Empty;
        impl Transform for Empty {
            fn list_tools(&self, _next: ListNext<'_, Tool>) -> Vec<Tool> {
                Vec::new()
            }
        }

        let inner = Arc::new(Tagger {
            tag: "inner",
            log: std::sync::Mutex::new(Vec::new()),
        });
        let composed = ComposedProvider::new(provider(&["a"]))
            .with_transform(Arc::clone(&inner) as Arc<dyn Transform>)
            .with_transform(Arc::new(Empty));

        assert!(composed.list_tools().is_empty());
        assert!(inner
            .log
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .is_empty());
    }
}
