//! HTTP transport configuration and building.
//!
//! Every request the client issues, including authentication, goes
//! through a client built here, so TLS policy is decided once.

use crate::PlatformError;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::warn;

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Request timeout (default: 30s)
    pub timeout: Duration,
    /// Connection timeout (default: 10s)
    pub connect_timeout: Duration,
    /// User agent string
    pub user_agent: String,
    /// Accept self-signed or otherwise invalid server certificates
    pub accept_invalid_certs: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: concat!("credhub-client-rs/", env!("CARGO_PKG_VERSION")).to_string(),
            accept_invalid_certs: false,
        }
    }
}

impl HttpConfig {
    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connect timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Toggle certificate verification.
    #[must_use]
    pub const fn with_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }
}

/// Build a configured HTTP client.
///
/// Creates a reqwest client with rustls TLS. When
/// [`HttpConfig::accept_invalid_certs`] is set the client skips certificate
/// verification for every request it sends.
///
/// # Errors
///
/// Returns [`PlatformError::InvalidConfig`] for an empty user agent and
/// [`PlatformError::Http`] if the client cannot be built.
///
/// # Examples
///
/// ```
/// use credhub_common::{HttpConfig, build_http_client};
/// use std::time::Duration;
///
/// let config = HttpConfig::default().with_timeout(Duration::from_secs(60));
/// assert!(build_http_client(&config).is_ok());
/// ```
pub fn build_http_client(config: &HttpConfig) -> Result<Client, PlatformError> {
    if config.user_agent.trim().is_empty() {
        return Err(PlatformError::invalid_config("user agent must not be empty"));
    }

    if config.accept_invalid_certs {
        warn!("TLS certificate verification is disabled");
    }

    let client = ClientBuilder::new()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .user_agent(&config.user_agent)
        .use_rustls_tls()
        .danger_accept_invalid_certs(config.accept_invalid_certs)
        .build()?;

    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HttpConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
        assert!(!config.accept_invalid_certs);
        assert!(config.user_agent.starts_with("credhub-client-rs/"));
    }

    #[test]
    fn test_config_builder() {
        let config = HttpConfig::default()
            .with_timeout(Duration::from_secs(60))
            .with_user_agent("test-agent")
            .with_accept_invalid_certs(true);

        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.user_agent, "test-agent");
        assert!(config.accept_invalid_certs);
    }

    #[test]
    fn test_build_client() {
        assert!(build_http_client(&HttpConfig::default()).is_ok());
        assert!(build_http_client(&HttpConfig::default().with_accept_invalid_certs(true)).is_ok());
    }

    #[test]
    fn test_empty_user_agent_rejected() {
        let config = HttpConfig::default().with_user_agent("  ");
        assert!(matches!(
            build_http_client(&config),
            Err(PlatformError::InvalidConfig(_))
        ));
    }
}
