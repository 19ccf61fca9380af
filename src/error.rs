//! Error types for the ON24 Cog.
//!
//! Errors never cross the RPC boundary as transport faults: the dispatcher turns
//! every variant below into an ERROR outcome. They exist so each layer can use `?`
//! internally and still report a precise cause.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CogError {
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
    #[error("Registry error: {0}")]
    RegistryError(String),
    #[error("Transport error: {0}")]
    TransportError(String),
}

impl From<config::ConfigError> for CogError {
    fn from(error: config::ConfigError) -> Self {
        CogError::ConfigurationError(error.to_string())
    }
}

impl From<tonic::transport::Error> for CogError {
    fn from(error: tonic::transport::Error) -> Self {
        CogError::TransportError(error.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CogError>;
