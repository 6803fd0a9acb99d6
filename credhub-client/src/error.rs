//! CredHub error types using thiserror 2.0.
//!
//! The variants keep "credential absent", "not authorised", "server said
//! no" and "payload has the wrong shape" apart so callers can branch on them.

use crate::value::DecodeError;
use credhub_common::PlatformError;
use reqwest::StatusCode;
use thiserror::Error;

/// CredHub client errors.
#[derive(Error, Debug)]
pub enum CredhubError {
    /// Negotiation failed, credentials were rejected, or the server
    /// answered 401/403 to a signed request
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Unknown path, name or id
    #[error("Credential not found: {0}")]
    NotFound(String),

    /// Any other non-success response
    #[error("Request failed with status {status}: {body}")]
    Request {
        /// HTTP status returned by the server
        status: StatusCode,
        /// Response body, possibly empty
        body: String,
    },

    /// Typed decoding of a credential value failed
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The request could not be sent or its response not read
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A success response carried an unexpected body
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Platform error
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Result type for CredHub operations.
pub type CredhubResult<T> = Result<T, CredhubError>;

impl CredhubError {
    /// Create an authentication error.
    #[must_use]
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    /// Create a not found error.
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Map a non-success status to the matching variant.
    #[must_use]
    pub fn from_status(status: StatusCode, target: &str, body: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Self::Auth(format!("Status {status} for {target}: {body}"))
            }
            StatusCode::NOT_FOUND => Self::NotFound(target.to_string()),
            _ => Self::Request { status, body },
        }
    }

    /// True for [`CredhubError::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// True for [`CredhubError::Auth`].
    #[must_use]
    pub const fn is_auth(&self) -> bool {
        matches!(self, Self::Auth(_))
    }

    /// HTTP status carried by the error, if any.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Request { status, .. } => Some(*status),
            Self::Transport(e) => e.status(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CredhubError::not_found("/concourse/missing");
        assert_eq!(err.to_string(), "Credential not found: /concourse/missing");

        let err = CredhubError::Request {
            status: StatusCode::BAD_GATEWAY,
            body: "upstream".to_string(),
        };
        assert_eq!(err.to_string(), "Request failed with status 502 Bad Gateway: upstream");
    }

    #[test]
    fn test_from_status() {
        let err = CredhubError::from_status(StatusCode::UNAUTHORIZED, "/api/v1/data", String::new());
        assert!(err.is_auth());

        let err = CredhubError::from_status(StatusCode::FORBIDDEN, "/api/v1/data", String::new());
        assert!(err.is_auth());

        let err = CredhubError::from_status(StatusCode::NOT_FOUND, "/a/b", String::new());
        assert!(err.is_not_found());

        let err = CredhubError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "/a/b", "boom".into());
        assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(matches!(err, CredhubError::Request { ref body, .. } if body == "boom"));
    }

    #[test]
    fn test_from_platform_error() {
        let err: CredhubError = PlatformError::invalid_config("bad agent").into();
        assert!(matches!(err, CredhubError::Platform(_)));
        assert!(!err.is_auth());
    }
}
