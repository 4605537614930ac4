//! Logic for loading configuration in to an object model

use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;

use displaydoc::Display;
use indexmap::IndexMap;
use schemars::JsonSchema;
use schemars::schema::RootSchema;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::context::ContextSeed;
pub use crate::status::StatusDerivation;

/// Configuration error.
#[derive(Debug, Error, Display)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// could not read configuration file {path}: {error}
    CannotReadFile {
        path: String,
        error: std::io::Error,
    },
    /// could not expand environment variables: {0}
    CannotExpandVariable(String),
    /// {message}: {error}
    InvalidConfiguration {
        message: &'static str,
        error: String,
    },
    /// context key '{0}' is reserved
    ReservedContextKey(String),
    /// context value could not be serialized: {0}
    InvalidContextValue(serde_json::Error),
}

/// The configuration of a served GraphQL route.
///
/// Can be created through `serde::Deserialize` from various formats,
/// or inline in Rust code with `serde_json::json!` and `serde_json::from_value`.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Configuration {
    /// Configuration options pertaining to the http server component.
    pub server: Server,

    /// The GraphiQL explorer served to browsers.
    pub explorer: Explorer,

    /// Request limits.
    pub limits: Limits,

    /// How the response status is derived from the execution result.
    pub status: Status,

    /// Fields made available to every resolver. `request` and `redirect` are reserved.
    #[schemars(with = "std::collections::BTreeMap<String, Value>")]
    pub context: IndexMap<String, Value>,
}

impl Configuration {
    /// Read, expand and parse a YAML configuration file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigurationError> {
        let raw = std::fs::read_to_string(path).map_err(|error| {
            ConfigurationError::CannotReadFile {
                path: path.display().to_string(),
                error,
            }
        })?;
        raw.parse()
    }

    /// The context seed built from the `context` section.
    pub fn context_seed(&self) -> Result<ContextSeed, ConfigurationError> {
        ContextSeed::try_from(self.context.clone())
    }

    /// Check the configuration beyond what deserialization enforces.
    pub fn validate(self) -> Result<Self, ConfigurationError> {
        if !self.server.graphql_path.starts_with('/') {
            return Err(ConfigurationError::InvalidConfiguration {
                message: "invalid server.graphql_path",
                error: format!("'{}' must start with '/'", self.server.graphql_path),
            });
        }
        self.context_seed()?;
        Ok(self)
    }
}

impl FromStr for Configuration {
    type Err = ConfigurationError;

    fn from_str(raw_yaml: &str) -> Result<Self, Self::Err> {
        validate_configuration(raw_yaml)
    }
}

/// Parse a YAML document, expanding `${VAR}` references from the environment.
pub(crate) fn validate_configuration(raw_yaml: &str) -> Result<Configuration, ConfigurationError> {
    let expanded = shellexpand::env(raw_yaml)
        .map_err(|e| ConfigurationError::CannotExpandVariable(e.to_string()))?;
    if expanded.trim().is_empty() {
        return Ok(Configuration::default());
    }
    let configuration: Configuration = serde_yaml::from_str(&expanded).map_err(|e| {
        ConfigurationError::InvalidConfiguration {
            message: "failed to parse yaml",
            error: e.to_string(),
        }
    })?;
    configuration.validate()
}

/// Generate a JSON schema for the configuration.
pub fn generate_config_schema() -> RootSchema {
    schemars::schema_for!(Configuration)
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Server {
    /// The socket address and port to listen on. Defaults to 127.0.0.1:4000
    #[schemars(with = "String")]
    pub listen: SocketAddr,

    /// The path the GraphQL route is served from. Defaults to /graphql
    pub graphql_path: String,
}

impl Default for Server {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([127, 0, 0, 1], 4000)),
            graphql_path: "/graphql".to_string(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Explorer {
    /// Serve the explorer to GET requests that accept text/html. Defaults to true
    pub enabled: bool,

    /// The page title.
    pub title: String,
}

impl Default for Explorer {
    fn default() -> Self {
        Self {
            enabled: true,
            title: "GraphiQL".to_string(),
        }
    }
}

const DEFAULT_HTTP_MAX_REQUEST_BYTES: usize = 2_000_000;

#[derive(Clone, Debug, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Limits {
    /// Maximum size of a request body in bytes. Defaults to 2MB
    pub http_max_request_bytes: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            http_max_request_bytes: DEFAULT_HTTP_MAX_REQUEST_BYTES,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields, default)]
pub struct Status {
    /// `default` keeps the engine status, `max_error_status` promotes it
    /// to the highest `extensions.status` of the response errors.
    pub derivation: StatusDerivation,
}
