//! # Cog Configuration
//!
//! Layered configuration for the Cog process, lowest precedence first:
//!
//! 1. Built-in defaults ([`CogConfig::default`])
//! 2. An optional file: `config/cog.{toml,yaml,json}` or an explicit `--config` path
//! 3. Environment variables prefixed `COG__`, with `__` between levels
//!    (`COG__SERVER__BIND_ADDRESS=127.0.0.1:9000`)
//!
//! The loaded value is validated once at startup and treated as read-only afterwards.

use crate::client::DEFAULT_BASE_URL;
use crate::error::{CogError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use url::Url;

const ENV_PREFIX: &str = "COG";
const ENV_SEPARATOR: &str = "__";
const DEFAULT_CONFIG_FILE: &str = "config/cog";

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CogConfig {
    pub cog: CogIdentity,
    pub server: ServerConfig,
    pub api: ApiConfig,
    pub logging: LoggingConfig,
}

/// What the Cog reports about itself in its manifest.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct CogIdentity {
    pub name: String,
    pub label: String,
    pub version: String,
    pub homepage: String,
    pub auth_help_url: String,
}

impl Default for CogIdentity {
    fn default() -> Self {
        Self {
            name: "stackmoxie/on24".to_string(),
            label: "ON24".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            homepage: "https://github.com/run-crank/cog-on24".to_string(),
            auth_help_url: "https://apidocs.on24.com/".to_string(),
        }
    }
}

/// gRPC server configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind the gRPC server to
    pub bind_address: String,

    /// Whether to register the gRPC reflection service
    pub enable_reflection: bool,

    /// Whether to register the standard `grpc.health.v1` service
    pub enable_health_service: bool,

    /// HTTP/2 keepalive ping interval in seconds
    pub keepalive_interval_seconds: u64,

    /// HTTP/2 keepalive timeout in seconds
    pub keepalive_timeout_seconds: u64,

    /// Maximum concurrent HTTP/2 streams per connection
    pub max_concurrent_streams: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:28866".to_string(),
            enable_reflection: false,
            enable_health_service: true,
            keepalive_interval_seconds: 30,
            keepalive_timeout_seconds: 20,
            max_concurrent_streams: 200,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ApiConfig {
    /// ON24 REST API root
    pub base_url: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = CogError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(CogError::ConfigurationError(format!(
                "Unknown log format '{other}' (expected 'pretty' or 'json')"
            ))),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl CogConfig {
    /// Load defaults, then the config file, then `COG__*` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Config::try_from(&CogConfig::default())?;
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config: CogConfig = Config::builder()
            .add_source(defaults)
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator(ENV_SEPARATOR)
                    .separator(ENV_SEPARATOR)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.server.socket_addr()?;
        Url::parse(&self.api.base_url).map_err(|e| {
            CogError::ConfigurationError(format!(
                "Invalid api.base_url '{}': {e}",
                self.api.base_url
            ))
        })?;
        if self.cog.name.is_empty() {
            return Err(CogError::ConfigurationError(
                "cog.name must not be empty".to_string(),
            ));
        }
        if self.server.max_concurrent_streams == 0 {
            return Err(CogError::ConfigurationError(
                "server.max_concurrent_streams must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        self.bind_address.parse().map_err(|e| {
            CogError::ConfigurationError(format!(
                "Invalid server.bind_address '{}': {e}",
                self.bind_address
            ))
        })
    }
}
