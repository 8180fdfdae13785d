//! Error types for conduit-mcp.
//!
//! Two families live here:
//!
//! - [`Error`] — the engine taxonomy shared by providers, transforms,
//!   dispatch, the protocol handler, and the client call engine.
//! - [`ConfigError`] — configuration loading failures, kept separate so
//!   startup errors carry file paths and IO sources.
//!
//! # Security Note
//!
//! Dispatch converts [`Error`] into JSON-RPC error envelopes with the
//! original message embedded. Callers executing untrusted tool logic should
//! treat that as a potential information-disclosure surface; the sampling
//! loop supports masking via `mask_error_details`, the general dispatcher
//! deliberately does not.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors produced by the protocol engine.
#[derive(Error, Debug)]
pub enum Error {
    /// A failure with no more specific classification.
    #[error("{0}")]
    Message(String),

    /// A tool, resource, prompt, or route lookup missed.
    #[error("not found: {0}")]
    NotFound(String),

    /// Duplicate registration, malformed transform config, or a response
    /// missing a required field.
    #[error("validation failed: {0}")]
    Validation(String),

    /// A tool exceeded its execution budget.
    #[error("tool '{name}' timed out after {timeout:?}")]
    ToolTimeout {
        /// Name of the tool that timed out.
        name: String,
        /// The budget that was exceeded.
        timeout: Duration,
    },

    /// Transport-level failure, including client-enforced call timeouts.
    #[error("transport error: {0}")]
    Transport(String),
}

impl Error {
    /// Creates a generic error from a message.
    pub fn message(msg: impl Into<String>) -> Self {
        Self::Message(msg.into())
    }

    /// Creates a `NotFound` error for a named component.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Creates a `Validation` error from a message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Creates a `Transport` error from a message.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Returns `true` if this is a `NotFound` error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Convenience result alias for engine operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display() {
        let error = Error::not_found("tool 'fetch'");
        assert_eq!(error.to_string(), "not found: tool 'fetch'");
        assert!(error.is_not_found());
    }

    #[test]
    fn validation_display() {
        let error = Error::validation("duplicate tool name 'echo'");
        let msg = error.to_string();
        assert!(msg.contains("validation failed"));
        assert!(msg.contains("echo"));
    }

    #[test]
    fn tool_timeout_display() {
        let error = Error::ToolTimeout {
            name: "slow".to_string(),
            timeout: Duration::from_millis(50),
        };
        let msg = error.to_string();
        assert!(msg.contains("slow"));
        assert!(msg.contains("timed out"));
    }

    #[test]
    fn transport_not_classified_as_not_found() {
        let error = Error::transport("connection reset");
        assert!(!error.is_not_found());
    }

    #[test]
    fn config_error_display() {
        let error = ConfigError::NotFound {
            path: PathBuf::from("/path/to/config.json"),
        };
        let msg = error.to_string();
        assert!(msg.contains("not found"));
        assert!(msg.contains("config.json"));
    }

    #[test]
    fn config_validation_error_display() {
        let error = ConfigError::ValidationError {
            message: "invalid setting".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("invalid setting"));
    }
}
