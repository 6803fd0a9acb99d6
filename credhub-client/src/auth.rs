//! Authentication negotiation and request signing.
//!
//! CredHub advertises its authorization server on `/info`. When one is
//! advertised the client exchanges its identity for a bearer token at
//! `{auth-server}/oauth/token`; otherwise the identity itself is sent as
//! HTTP basic credentials. The resulting [`Signer`] is fixed for the life
//! of the client and is never refreshed.

use crate::client::{endpoint_url, error_body};
use crate::error::{CredhubError, CredhubResult};
use reqwest::{Client, RequestBuilder, header};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// OAuth client used for the password grant, as registered by CredHub's UAA.
pub const PASSWORD_GRANT_CLIENT_ID: &str = "credhub_cli";

/// Who the client authenticates as.
#[derive(Debug)]
pub enum Identity {
    /// A UAA user, exchanged with the password grant
    User {
        /// User name
        username: String,
        /// User password
        password: SecretString,
    },
    /// A UAA client, exchanged with the client-credentials grant
    Client {
        /// OAuth client id
        client_id: String,
        /// OAuth client secret
        client_secret: SecretString,
    },
}

impl Identity {
    /// A user identity.
    #[must_use]
    pub fn user(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::User {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// A client identity.
    #[must_use]
    pub fn client(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self::Client {
            client_id: client_id.into(),
            client_secret: SecretString::from(client_secret.into()),
        }
    }

    /// User name or client id.
    #[must_use]
    pub fn principal(&self) -> &str {
        match self {
            Self::User { username, .. } => username,
            Self::Client { client_id, .. } => client_id,
        }
    }

    fn secret(&self) -> &SecretString {
        match self {
            Self::User { password, .. } => password,
            Self::Client { client_secret, .. } => client_secret,
        }
    }

    pub(crate) fn validate(&self) -> CredhubResult<()> {
        if self.principal().trim().is_empty() {
            return Err(CredhubError::invalid_config("user name or client id is empty"));
        }
        if self.secret().expose_secret().is_empty() {
            return Err(CredhubError::invalid_config("password or client secret is empty"));
        }
        Ok(())
    }

    fn into_basic(self) -> Signer {
        match self {
            Self::User { username, password } => Signer::Basic { username, password },
            Self::Client {
                client_id,
                client_secret,
            } => Signer::Basic {
                username: client_id,
                password: client_secret,
            },
        }
    }
}

/// Credential attached to every outgoing request.
#[derive(Debug)]
pub enum Signer {
    /// `Authorization: Bearer <token>`
    Bearer(SecretString),
    /// `Authorization: Basic <user:password>`
    Basic {
        /// User name or client id
        username: String,
        /// Password or client secret
        password: SecretString,
    },
}

impl Signer {
    /// Attach the `Authorization` header.
    #[must_use]
    pub fn sign(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Bearer(token) => request.bearer_auth(token.expose_secret()),
            Self::Basic { username, password } => {
                request.basic_auth(username, Some(password.expose_secret()))
            }
        }
    }

    /// Authorization scheme name.
    #[must_use]
    pub const fn scheme(&self) -> &'static str {
        match self {
            Self::Bearer(_) => "Bearer",
            Self::Basic { .. } => "Basic",
        }
    }
}

#[derive(Debug, Deserialize)]
struct InfoResponse {
    #[serde(rename = "auth-server", default)]
    auth_server: Option<AuthServerInfo>,
}

#[derive(Debug, Deserialize)]
struct AuthServerInfo {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Negotiated request-signing credential.
#[derive(Debug)]
pub struct Authenticator {
    signer: Signer,
}

impl Authenticator {
    /// Discover the authorization server and obtain a signer.
    ///
    /// Issues `GET {server}/info` and, if an authorization server is
    /// advertised, one token request. Any failure on the way, including TLS
    /// verification, is reported as [`CredhubError::Auth`] and leaves nothing
    /// behind.
    ///
    /// # Errors
    ///
    /// [`CredhubError::Auth`] when discovery fails, the identity is rejected,
    /// or the token response is not a usable bearer token.
    #[instrument(skip(http, identity), fields(server = %server, principal = identity.principal()))]
    pub async fn negotiate(http: &Client, server: &Url, identity: Identity) -> CredhubResult<Self> {
        let signer = match discover_auth_server(http, server).await? {
            Some(auth_server) => {
                let token = exchange_token(http, &auth_server, &identity).await?;
                Signer::Bearer(token)
            }
            None => {
                debug!("No authorization server advertised, using basic auth");
                identity.into_basic()
            }
        };

        info!(scheme = signer.scheme(), "Authenticated with CredHub");
        Ok(Self { signer })
    }

    /// Attach the held credential to a request.
    #[must_use]
    pub fn sign(&self, request: RequestBuilder) -> RequestBuilder {
        self.signer.sign(request)
    }

    /// The held credential.
    #[must_use]
    pub const fn signer(&self) -> &Signer {
        &self.signer
    }
}

async fn discover_auth_server(http: &Client, server: &Url) -> CredhubResult<Option<Url>> {
    let url = endpoint_url(server, &["info"])?;

    let response = http
        .get(url)
        .header(header::ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| CredhubError::auth(format!("server info request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let text = error_body(response).await;
        warn!(%status, "Server info request rejected");
        return Err(CredhubError::auth(format!("server info returned status {status}: {text}")));
    }

    let info: InfoResponse = response
        .json()
        .await
        .map_err(|e| CredhubError::auth(format!("malformed server info: {e}")))?;

    match info.auth_server.and_then(|a| a.url) {
        Some(raw) if !raw.trim().is_empty() => parse_auth_server(raw.trim()).map(Some),
        _ => Ok(None),
    }
}

/// The advertised authorization server must be an absolute http(s) URL.
fn parse_auth_server(raw: &str) -> CredhubResult<Url> {
    let url = Url::parse(raw)
        .map_err(|e| CredhubError::auth(format!("invalid authorization server URL {raw:?}: {e}")))?;

    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(CredhubError::auth(format!(
            "authorization server URL {raw:?} is not an http(s) URL"
        )));
    }
    Ok(url)
}

async fn exchange_token(
    http: &Client,
    auth_server: &Url,
    identity: &Identity,
) -> CredhubResult<SecretString> {
    let url = endpoint_url(auth_server, &["oauth", "token"])
        .map_err(|e| CredhubError::auth(format!("unusable authorization server: {e}")))?;
    debug!(%url, "Requesting access token");

    let request = http.post(url).header(header::ACCEPT, "application/json");
    let request = match identity {
        Identity::User { username, password } => request
            .basic_auth(PASSWORD_GRANT_CLIENT_ID, Some(""))
            .form(&[
                ("grant_type", "password"),
                ("username", username.as_str()),
                ("password", password.expose_secret()),
            ]),
        Identity::Client {
            client_id,
            client_secret,
        } => request
            .basic_auth(client_id, Some(client_secret.expose_secret()))
            .form(&[("grant_type", "client_credentials")]),
    };

    let response = request
        .send()
        .await
        .map_err(|e| CredhubError::auth(format!("token request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let text = error_body(response).await;
        warn!(%status, "Token request rejected");
        return Err(CredhubError::auth(format!("token request returned status {status}: {text}")));
    }

    let token: TokenResponse = response
        .json()
        .await
        .map_err(|e| CredhubError::auth(format!("malformed token response: {e}")))?;

    validate_token(token)
}

fn validate_token(token: TokenResponse) -> CredhubResult<SecretString> {
    if token.access_token.trim().is_empty() {
        return Err(CredhubError::auth("token response carried an empty access token"));
    }
    if let Some(kind) = &token.token_type {
        if !kind.eq_ignore_ascii_case("bearer") {
            return Err(CredhubError::auth(format!("unsupported token type {kind:?}")));
        }
    }
    if let Some(expires_in) = token.expires_in {
        debug!(expires_in, "Access token issued");
    }
    Ok(SecretString::from(token.access_token))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(access_token: &str, token_type: Option<&str>) -> TokenResponse {
        TokenResponse {
            access_token: access_token.to_string(),
            token_type: token_type.map(str::to_string),
            expires_in: Some(599),
        }
    }

    #[test]
    fn test_validate_token() {
        let secret = validate_token(token("abc.def", Some("bearer"))).unwrap();
        assert_eq!(secret.expose_secret(), "abc.def");

        assert!(validate_token(token("abc.def", Some("Bearer"))).is_ok());
        assert!(validate_token(token("abc.def", None)).is_ok());
    }

    #[test]
    fn test_validate_token_rejects_unusable_tokens() {
        assert!(validate_token(token("", Some("bearer"))).unwrap_err().is_auth());
        assert!(validate_token(token("abc", Some("mac"))).unwrap_err().is_auth());
    }

    #[test]
    fn test_info_without_auth_server() {
        let info: InfoResponse = serde_json::from_str(r#"{"app":{"name":"CredHub"}}"#).unwrap();
        assert!(info.auth_server.is_none());

        let info: InfoResponse =
            serde_json::from_str(r#"{"auth-server":{"url":"https://uaa:8443"}}"#).unwrap();
        assert_eq!(info.auth_server.and_then(|a| a.url).as_deref(), Some("https://uaa:8443"));
    }

    #[test]
    fn test_parse_auth_server() {
        let url = parse_auth_server("https://uaa.service.internal:8443").unwrap();
        assert_eq!(url.host_str(), Some("uaa.service.internal"));
        assert!(parse_auth_server("http://127.0.0.1:8080/uaa").is_ok());

        for raw in ["uaa.service.internal:8443", "mailto:uaa@example.com", "ftp://uaa", "not a url"] {
            let err = parse_auth_server(raw).unwrap_err();
            assert!(err.is_auth(), "{raw}: {err}");
        }
    }

    #[test]
    fn test_signer_debug_redacts_secrets() {
        let signer = Signer::Bearer(SecretString::from("super-secret-token".to_string()));
        assert!(!format!("{signer:?}").contains("super-secret-token"));

        let signer = Identity::user("admin", "hunter2").into_basic();
        let debug = format!("{signer:?}");
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
        assert_eq!(signer.scheme(), "Basic");
    }

    #[test]
    fn test_sign_sets_authorization_header() {
        let http = Client::new();
        let signer = Signer::Bearer(SecretString::from("tok".to_string()));
        let request = signer.sign(http.get("http://localhost/api")).build().unwrap();
        assert_eq!(request.headers()[header::AUTHORIZATION], "Bearer tok");

        let signer = Identity::client("ci", "secret").into_basic();
        let request = signer.sign(http.get("http://localhost/api")).build().unwrap();
        assert_eq!(request.headers()[header::AUTHORIZATION], "Basic Y2k6c2VjcmV0");
    }

    #[test]
    fn test_identity_validation() {
        assert!(Identity::user("admin", "pw").validate().is_ok());
        assert!(Identity::client(" ", "secret").validate().is_err());
        assert!(Identity::client("ci", "").validate().is_err());
    }
}
