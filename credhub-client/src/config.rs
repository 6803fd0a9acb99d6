//! CredHub client configuration.

use crate::auth::Identity;
use crate::error::{CredhubError, CredhubResult};
use credhub_common::HttpConfig;
use std::time::Duration;
use url::Url;

/// CredHub client configuration.
#[derive(Debug)]
pub struct CredhubConfig {
    /// CredHub server base URL, e.g. `https://credhub.service.cf.internal:8844`
    pub server_url: String,
    /// Who to authenticate as
    pub identity: Identity,
    /// Accept self-signed certificates from CredHub and its UAA
    pub skip_tls_verification: bool,
    /// Request timeout
    pub timeout: Duration,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// User agent override
    pub user_agent: Option<String>,
}

impl CredhubConfig {
    /// Create a new configuration with default timeouts and strict TLS.
    #[must_use]
    pub fn new(server_url: impl Into<String>, identity: Identity) -> Self {
        let http = HttpConfig::default();
        Self {
            server_url: server_url.into(),
            identity,
            skip_tls_verification: false,
            timeout: http.timeout,
            connect_timeout: http.connect_timeout,
            user_agent: None,
        }
    }

    /// Build a configuration from the environment.
    ///
    /// Reads `CREDHUB_SERVER`, then either `CREDHUB_CLIENT` and
    /// `CREDHUB_SECRET` or `CREDHUB_USERNAME` and `CREDHUB_PASSWORD`, and
    /// optionally `CREDHUB_SKIP_TLS_VALIDATION`.
    ///
    /// # Errors
    ///
    /// Returns [`CredhubError::InvalidConfig`] when the server or a complete
    /// identity is missing.
    pub fn from_env() -> CredhubResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> CredhubResult<Self> {
        let server = lookup("CREDHUB_SERVER")
            .ok_or_else(|| CredhubError::invalid_config("CREDHUB_SERVER is not set"))?;

        let identity = match (
            lookup("CREDHUB_CLIENT"),
            lookup("CREDHUB_SECRET"),
            lookup("CREDHUB_USERNAME"),
            lookup("CREDHUB_PASSWORD"),
        ) {
            (Some(id), Some(secret), _, _) => Identity::client(id, secret),
            (_, _, Some(username), Some(password)) => Identity::user(username, password),
            _ => {
                return Err(CredhubError::invalid_config(
                    "set CREDHUB_CLIENT and CREDHUB_SECRET, or CREDHUB_USERNAME and CREDHUB_PASSWORD",
                ));
            }
        };

        let skip_tls = lookup("CREDHUB_SKIP_TLS_VALIDATION")
            .is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1"));

        let config = Self::new(server, identity).with_skip_tls_verification(skip_tls);
        config.validate()?;
        Ok(config)
    }

    /// Accept or reject invalid server certificates.
    #[must_use]
    pub const fn with_skip_tls_verification(mut self, skip: bool) -> Self {
        self.skip_tls_verification = skip;
        self
    }

    /// Set request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set connection timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Override the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Check the configuration and return the parsed server URL.
    ///
    /// # Errors
    ///
    /// Returns [`CredhubError::InvalidConfig`] for an unparsable or non-HTTP
    /// server URL, or an identity with empty fields.
    pub fn validate(&self) -> CredhubResult<Url> {
        let url = Url::parse(self.server_url.trim()).map_err(|e| {
            CredhubError::invalid_config(format!("server URL {:?}: {e}", self.server_url))
        })?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(CredhubError::invalid_config(format!(
                "unsupported scheme {:?}",
                url.scheme()
            )));
        }
        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(CredhubError::invalid_config(format!(
                "server URL {:?} has no host",
                self.server_url
            )));
        }

        self.identity.validate()?;
        Ok(url)
    }

    /// Transport settings derived from this configuration.
    #[must_use]
    pub fn http_config(&self) -> HttpConfig {
        let mut http = HttpConfig::default()
            .with_timeout(self.timeout)
            .with_connect_timeout(self.connect_timeout)
            .with_accept_invalid_certs(self.skip_tls_verification);
        if let Some(agent) = &self.user_agent {
            http = http.with_user_agent(agent.clone());
        }
        http
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = CredhubConfig::new("https://credhub:8844", Identity::user("admin", "pw"));
        assert!(!config.skip_tls_verification);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_http_config_carries_tls_flag() {
        let config = CredhubConfig::new("https://credhub:8844", Identity::user("admin", "pw"))
            .with_skip_tls_verification(true)
            .with_timeout(Duration::from_secs(5))
            .with_user_agent("ci-bot");

        let http = config.http_config();
        assert!(http.accept_invalid_certs);
        assert_eq!(http.timeout, Duration::from_secs(5));
        assert_eq!(http.user_agent, "ci-bot");
    }

    #[test]
    fn test_invalid_urls_rejected() {
        for url in ["", "credhub:8844", "ftp://credhub", "mailto:ops@example.com"] {
            let config = CredhubConfig::new(url, Identity::user("admin", "pw"));
            assert!(
                matches!(config.validate(), Err(CredhubError::InvalidConfig(_))),
                "{url:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_empty_identity_rejected() {
        let config = CredhubConfig::new("https://credhub", Identity::user("", "pw"));
        assert!(matches!(config.validate(), Err(CredhubError::InvalidConfig(_))));
    }

    #[test]
    fn test_from_env_prefers_client_identity() {
        let config = CredhubConfig::from_lookup(lookup(&[
            ("CREDHUB_SERVER", "https://credhub:8844"),
            ("CREDHUB_CLIENT", "concourse"),
            ("CREDHUB_SECRET", "s3cr3t"),
            ("CREDHUB_USERNAME", "admin"),
            ("CREDHUB_PASSWORD", "pw"),
            ("CREDHUB_SKIP_TLS_VALIDATION", "TRUE"),
        ]))
        .unwrap();

        assert!(matches!(config.identity, Identity::Client { ref client_id, .. } if client_id == "concourse"));
        assert!(config.skip_tls_verification);
    }

    #[test]
    fn test_from_env_user_identity() {
        let config = CredhubConfig::from_lookup(lookup(&[
            ("CREDHUB_SERVER", "http://localhost:9000"),
            ("CREDHUB_USERNAME", "admin"),
            ("CREDHUB_PASSWORD", "pw"),
        ]))
        .unwrap();

        assert!(matches!(config.identity, Identity::User { ref username, .. } if username == "admin"));
        assert!(!config.skip_tls_verification);
    }

    #[test]
    fn test_from_env_missing_values() {
        let err = CredhubConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("CREDHUB_SERVER"));

        let err = CredhubConfig::from_lookup(lookup(&[
            ("CREDHUB_SERVER", "https://credhub"),
            ("CREDHUB_CLIENT", "concourse"),
        ]))
        .unwrap_err();
        assert!(matches!(err, CredhubError::InvalidConfig(_)));
    }
}
