//! Visibility transform: enable/disable components without removing them.
//!
//! Keys are namespaced by kind: `"tool:name"`, `"resource:uri"`,
//! `"template:uri_template"`, `"prompt:name"`. The transform holds a
//! disabled-key set and an optional allowlist; `is_enabled` checks the
//! disabled set first, then the allowlist when default-enabled is off.

use std::collections::HashSet;
use std::sync::RwLock;

use crate::provider::{Prompt, Resource, ResourceTemplate, Tool};
use crate::transform::{GetNext, ListNext, Transform};

struct VisibilityState {
    disabled: HashSet<String>,
    enabled: HashSet<String>,
    default_enabled: bool,
}

/// Filters components by enable/disable keys.
///
/// Shared via `Arc`; enable/disable mutate through interior locking so a
/// chain assembled at startup can still be toggled at runtime.
pub struct VisibilityTransform {
    state: RwLock<VisibilityState>,
}

impl VisibilityTransform {
    /// Creates a transform with everything enabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(VisibilityState {
                disabled: HashSet::new(),
                enabled: HashSet::new(),
                default_enabled: true,
            }),
        }
    }

    /// Adds keys to the disabled set.
    pub fn disable<I, S>(&self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.write();
        for key in keys {
            state.disabled.insert(key.into());
        }
    }

    /// Removes keys from the disabled set and adds them to the allowlist.
    pub fn enable<I, S>(&self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.write();
        for key in keys {
            let key = key.into();
            state.disabled.remove(&key);
            state.enabled.insert(key);
        }
    }

    /// Replaces the allowlist with exactly these keys and turns
    /// default-enabled off: only the listed keys remain visible.
    pub fn enable_only<I, S>(&self, keys: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut state = self.write();
        state.enabled.clear();
        state.default_enabled = false;
        for key in keys {
            let key = key.into();
            state.disabled.remove(&key);
            state.enabled.insert(key);
        }
    }

    /// Evaluates a namespaced key against the current visibility state.
    #[must_use]
    pub fn is_enabled(&self, key: &str) -> bool {
        let state = self
            .state
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if state.disabled.contains(key) {
            return false;
        }
        if !state.default_enabled {
            return state.enabled.contains(key);
        }
        true
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, VisibilityState> {
        self.state
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Default for VisibilityTransform {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform for VisibilityTransform {
    fn list_tools(&self, next: ListNext<'_, Tool>) -> Vec<Tool> {
        next()
            .into_iter()
            .filter(|t| self.is_enabled(&format!("tool:{}", t.name)))
            .collect()
    }

    fn get_tool(&self, name: &str, next: GetNext<'_, Tool>) -> Option<Tool> {
        next(name).filter(|t| self.is_enabled(&format!("tool:{}", t.name)))
    }

    fn list_resources(&self, next: ListNext<'_, Resource>) -> Vec<Resource> {
        next()
            .into_iter()
            .filter(|r| self.is_enabled(&format!("resource:{}", r.uri)))
            .collect()
    }

    fn get_resource(&self, uri: &str, next: GetNext<'_, Resource>) -> Option<Resource> {
        next(uri).filter(|r| self.is_enabled(&format!("resource:{}", r.uri)))
    }

    fn list_resource_templates(&self, next: ListNext<'_, ResourceTemplate>) -> Vec<ResourceTemplate> {
        next()
            .into_iter()
            .filter(|t| self.is_enabled(&format!("template:{}", t.uri_template)))
            .collect()
    }

    fn get_resource_template(
        &self,
        uri: &str,
        next: GetNext<'_, ResourceTemplate>,
    ) -> Option<ResourceTemplate> {
        next(uri).filter(|t| self.is_enabled(&format!("template:{}", t.uri_template)))
    }

    fn list_prompts(&self, next: ListNext<'_, Prompt>) -> Vec<Prompt> {
        next()
            .into_iter()
            .filter(|p| self.is_enabled(&format!("prompt:{}", p.name)))
            .collect()
    }

    fn get_prompt(&self, name: &str, next: GetNext<'_, Prompt>) -> Option<Prompt> {
        next(name).filter(|p| self.is_enabled(&format!("prompt:{}", p.name)))
    }
}
