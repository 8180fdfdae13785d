//! Configuration structures for deserialisation.
//!
//! These structures map directly to the JSON configuration file format.

use serde::Deserialize;

use crate::error::ConfigError;
use crate::provider::DuplicatePolicy;

/// Root configuration structure.
///
/// This is the top-level structure that matches the JSON config file.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Optional JSON schema reference (ignored during parsing).
    #[serde(rename = "$schema", default)]
    _schema: Option<String>,

    /// Optional comment field (ignored during parsing).
    #[serde(rename = "_comment", default)]
    _comment: Option<String>,

    /// Server identity settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Dispatch and registration settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Client call settings.
    #[serde(default)]
    pub client: ClientConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any validation checks fail.
    pub fn validate(&self) -> Result<(), ConfigError> {
        DuplicatePolicy::parse(&self.dispatch.duplicate_policy).map_err(|e| {
            ConfigError::ValidationError {
                message: e.to_string(),
            }
        })?;

        if self.client.request_timeout_ms == 0 {
            return Err(ConfigError::ValidationError {
                message: "client.request_timeout_ms must be greater than zero".to_string(),
            });
        }
        Ok(())
    }
}

/// Server identity configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Advertised server name.
    #[serde(default = "default_server_name")]
    pub name: String,

    /// Advertised server version. Defaults to the crate version.
    #[serde(default)]
    pub version: Option<String>,

    /// Project or documentation URL.
    #[serde(default)]
    pub website_url: Option<String>,

    /// Instructions string returned from initialize.
    #[serde(default)]
    pub instructions: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: default_server_name(),
            version: None,
            website_url: None,
            instructions: None,
        }
    }
}

fn default_server_name() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

/// Dispatch and registration configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Duplicate registration policy: "error", "warn", "replace", "ignore".
    #[serde(default = "default_duplicate_policy")]
    pub duplicate_policy: String,

    /// Whether published schemas have `$ref`/`$defs` dereferenced.
    #[serde(default = "default_true")]
    pub dereference_schemas: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            duplicate_policy: default_duplicate_policy(),
            dereference_schemas: default_true(),
        }
    }
}

impl DispatchConfig {
    /// Returns the parsed duplicate policy.
    ///
    /// Valid after [`Config::validate`]; defaults to `Error` for an
    /// unparseable value.
    #[must_use]
    pub fn policy(&self) -> DuplicatePolicy {
        DuplicatePolicy::parse(&self.duplicate_policy).unwrap_or_default()
    }
}

fn default_duplicate_policy() -> String {
    "error".to_string()
}

const fn default_true() -> bool {
    true
}

/// Client call configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Default per-call timeout in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

const fn default_request_timeout_ms() -> u64 {
    30_000
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}
