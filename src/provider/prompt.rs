//! Prompt definitions.
//!
//! A [`Prompt`] renders a sequence of messages from named arguments via a
//! generator closure.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::provider::content::PromptMessage;

/// The callable behind a prompt.
pub type PromptGenerator = dyn Fn(Value) -> Result<Vec<PromptMessage>> + Send + Sync;

/// A declared prompt argument.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptArgument {
    /// Argument name.
    pub name: String,
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the argument must be supplied.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
}

impl PromptArgument {
    /// Creates a required argument.
    #[must_use]
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            required: true,
        }
    }

    /// Creates an optional argument.
    #[must_use]
    pub fn optional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            required: false,
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A named prompt template.
#[derive(Clone)]
pub struct Prompt {
    /// Unique name within a provider.
    pub name: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// Declared arguments.
    pub arguments: Vec<PromptArgument>,
    /// Component version for version-range filtering.
    pub version: Option<String>,
    generator: Arc<PromptGenerator>,
}

impl Prompt {
    /// Creates a prompt from a name and generator.
    pub fn new(
        name: impl Into<String>,
        generator: impl Fn(Value) -> Result<Vec<PromptMessage>> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            arguments: Vec::new(),
            version: None,
            generator: Arc::new(generator),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declares the prompt's arguments.
    #[must_use]
    pub fn with_arguments(mut self, arguments: Vec<PromptArgument>) -> Self {
        self.arguments = arguments;
        self
    }

    /// Sets the component version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Renders the prompt messages from the given arguments.
    ///
    /// # Errors
    ///
    /// Propagates whatever the generator returns.
    pub fn render(&self, args: Value) -> Result<Vec<PromptMessage>> {
        (self.generator)(args)
    }
}

impl fmt::Debug for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Prompt")
            .field("name", &self.name)
            .field("arguments", &self.arguments)
            .finish_non_exhaustive()
    }
}
