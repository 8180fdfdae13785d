//! Version-range filtering.
//!
//! Keeps only components whose version satisfies `gte <= v < lt` (either
//! bound optional). Components with no version set always pass: they are
//! exempt from the range, not rejected by it.
//!
//! # Comparison rules
//!
//! Versions split on `.`, `-`, and `_`. Numeric tokens compare as integers
//! (leading zeros stripped); non-numeric tokens compare lexicographically;
//! a missing trailing token defaults to `"0"`.

use std::cmp::Ordering;

use crate::provider::{Prompt, Resource, ResourceTemplate, Tool};
use crate::transform::{GetNext, ListNext, Transform};

/// Filters components by a version range.
#[derive(Debug, Clone, Default)]
pub struct VersionFilter {
    gte: Option<String>,
    lt: Option<String>,
}

impl VersionFilter {
    /// Creates a filter with the given inclusive lower / exclusive upper
    /// bounds.
    #[must_use]
    pub fn new(gte: Option<String>, lt: Option<String>) -> Self {
        Self { gte, lt }
    }

    /// Keeps versions `>= bound`.
    #[must_use]
    pub fn gte(bound: impl Into<String>) -> Self {
        Self::new(Some(bound.into()), None)
    }

    /// Keeps versions `< bound`.
    #[must_use]
    pub fn lt(bound: impl Into<String>) -> Self {
        Self::new(None, Some(bound.into()))
    }

    /// Keeps versions in `[gte, lt)`.
    #[must_use]
    pub fn range(gte: impl Into<String>, lt: impl Into<String>) -> Self {
        Self::new(Some(gte.into()), Some(lt.into()))
    }

    /// Evaluates a component version against the range.
    ///
    /// `None` (no version set) always passes.
    #[must_use]
    pub fn passes(&self, version: Option<&str>) -> bool {
        let Some(version) = version else {
            return true;
        };
        if let Some(gte) = &self.gte {
            if compare_versions(version, gte) == Ordering::Less {
                return false;
            }
        }
        if let Some(lt) = &self.lt {
            if compare_versions(version, lt) != Ordering::Less {
                return false;
            }
        }
        true
    }
}

impl Transform for VersionFilter {
    fn list_tools(&self, next: ListNext<'_, Tool>) -> Vec<Tool> {
        next()
            .into_iter()
            .filter(|t| self.passes(t.version.as_deref()))
            .collect()
    }

    fn get_tool(&self, name: &str, next: GetNext<'_, Tool>) -> Option<Tool> {
        next(name).filter(|t| self.passes(t.version.as_deref()))
    }

    fn list_resources(&self, next: ListNext<'_, Resource>) -> Vec<Resource> {
        next()
            .into_iter()
            .filter(|r| self.passes(r.version.as_deref()))
            .collect()
    }

    fn get_resource(&self, uri: &str, next: GetNext<'_, Resource>) -> Option<Resource> {
        next(uri).filter(|r| self.passes(r.version.as_deref()))
    }

    fn list_resource_templates(&self, next: ListNext<'_, ResourceTemplate>) -> Vec<ResourceTemplate> {
        next()
            .into_iter()
            .filter(|t| self.passes(t.version.as_deref()))
            .collect()
    }

    fn get_resource_template(
        &self,
        uri: &str,
        next: GetNext<'_, ResourceTemplate>,
    ) -> Option<ResourceTemplate> {
        next(uri).filter(|t| self.passes(t.version.as_deref()))
    }

    fn list_prompts(&self, next: ListNext<'_, Prompt>) -> Vec<Prompt> {
        next()
            .into_iter()
            .filter(|p| self.passes(p.version.as_deref()))
            .collect()
    }

    fn get_prompt(&self, name: &str, next: GetNext<'_, Prompt>) -> Option<Prompt> {
        next(name).filter(|p| self.passes(p.version.as_deref()))
    }
}

/// Compares two version strings token-wise.
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let a_tokens: Vec<&str> = split_version(a);
    let b_tokens: Vec<&str> = split_version(b);
    let len = a_tokens.len().max(b_tokens.len());

    for i in 0..len {
        let ta = a_tokens.get(i).copied().unwrap_or("0");
        let tb = b_tokens.get(i).copied().unwrap_or("0");
        let ordering = compare_tokens(ta, tb);
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

fn split_version(v: &str) -> Vec<&str> {
    v.split(['.', '-', '_']).collect()
}

fn compare_tokens(a: &str, b: &str) -> Ordering {
    let a_numeric = !a.is_empty() && a.bytes().all(|b| b.is_ascii_digit());
    let b_numeric = !b.is_empty() && b.bytes().all(|b| b.is_ascii_digit());

    if a_numeric && b_numeric {
        // Integer comparison without overflow: strip leading zeros, then
        // longer is larger, equal lengths compare lexicographically.
        let a = a.trim_start_matches('0');
        let b = b.trim_start_matches('0');
        a.len().cmp(&b.len()).then_with(|| a.cmp(b))
    } else {
        a.cmp(b)
    }
}
