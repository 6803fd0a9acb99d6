//! Error type for the shared plumbing.
//!
//! Failures here happen before any credential request is issued: the
//! transport could not be built or the subscriber could not be installed.

use thiserror::Error;

/// Common error type for transport and tracing setup.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// HTTP client could not be built
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Tracing subscriber could not be installed
    #[error("Tracing initialisation failed: {0}")]
    Tracing(String),
}

impl PlatformError {
    /// Create an invalid configuration error with the given message.
    #[must_use]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
