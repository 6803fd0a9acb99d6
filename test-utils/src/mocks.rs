//! Mock CredHub server.
//!
//! Serves `/info`, a UAA-style `/oauth/token` and the `/api/v1/data`
//! endpoints over the credentials in [`crate::fixtures`]. Data endpoints
//! only answer requests carrying the expected `Authorization` header;
//! anything else under `/api/` gets a 401, and authorised requests for
//! unknown names, paths or ids get a 404.

use crate::fixtures::{self, FixtureCredential};
use serde_json::{Value, json};
use std::net::SocketAddr;
use wiremock::matchers::{
    body_string_contains, header, method, path, path_regex, query_param, query_param_is_missing,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// User accepted by the password grant and by basic auth.
pub const USERNAME: &str = "user";
/// Password for [`USERNAME`].
pub const PASSWORD: &str = "pass";
/// Client accepted by the client-credentials grant.
pub const CLIENT_ID: &str = "concourse_client";
/// Secret for [`CLIENT_ID`].
pub const CLIENT_SECRET: &str = "concourse_secret";
/// Token issued by the mock UAA.
pub const ACCESS_TOKEN: &str = "mock-access-token";

/// `Basic base64("user:pass")`.
const BASIC_USER: &str = "Basic dXNlcjpwYXNz";
/// `Basic base64("credhub_cli:")`, the client half of the password grant.
pub const BASIC_PASSWORD_GRANT_CLIENT: &str = "Basic Y3JlZGh1Yl9jbGk6";
/// `Basic base64("concourse_client:concourse_secret")`.
const BASIC_CLIENT: &str = "Basic Y29uY291cnNlX2NsaWVudDpjb25jb3Vyc2Vfc2VjcmV0";

/// Highest version count the mock answers for a `versions` query.
const MAX_VERSIONS: usize = 10;

const FALLBACK_NOT_FOUND: u8 = 9;
const FALLBACK_UNAUTHORIZED: u8 = 10;

/// How the mock expects clients to authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    /// `/info` advertises the mock itself as the authorization server
    Uaa,
    /// `/info` advertises no authorization server; data requests need basic auth
    Basic,
}

/// A running mock CredHub.
pub struct MockCredhubServer {
    server: MockServer,
    mode: AuthMode,
}

impl MockCredhubServer {
    /// Start a mock that issues bearer tokens.
    pub async fn start() -> Self {
        Self::start_with(AuthMode::Uaa).await
    }

    /// Start a mock with the given authentication mode.
    pub async fn start_with(mode: AuthMode) -> Self {
        let server = MockServer::start().await;
        let mock = Self { server, mode };

        mock.mount_info().await;
        mock.mount_token_endpoint().await;
        mock.mount_data().await;
        mock.mount_fallbacks().await;

        mock
    }

    /// Base URL of the server.
    #[must_use]
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    /// Underlying wiremock server, for mounting extra mocks in a test.
    #[must_use]
    pub const fn server(&self) -> &MockServer {
        &self.server
    }

    /// Socket address the plain HTTP listener is bound to.
    #[must_use]
    pub fn address(&self) -> SocketAddr {
        *self.server.address()
    }

    /// `Authorization` header value the data endpoints accept.
    #[must_use]
    pub fn expected_authorization(&self) -> String {
        match self.mode {
            AuthMode::Uaa => format!("Bearer {ACCESS_TOKEN}"),
            AuthMode::Basic => BASIC_USER.to_string(),
        }
    }

    /// Number of requests received on a path.
    pub async fn request_count(&self, request_path: &str) -> usize {
        self.server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.url.path() == request_path)
            .count()
    }

    /// Answer every name query for `name` with the given status and body.
    pub async fn fail_name(&self, name: &str, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path("/api/v1/data"))
            .and(query_param("name", name))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .with_priority(1)
            .mount(&self.server)
            .await;
    }

    async fn mount_info(&self) {
        let body = match self.mode {
            AuthMode::Uaa => json!({
                "app": {"name": "CredHub"},
                "auth-server": {"url": self.server.uri()}
            }),
            AuthMode::Basic => json!({"app": {"name": "CredHub"}}),
        };

        Mock::given(method("GET"))
            .and(path("/info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&self.server)
            .await;
    }

    async fn mount_token_endpoint(&self) {
        let token = json!({
            "access_token": ACCESS_TOKEN,
            "token_type": "bearer",
            "expires_in": 599,
            "scope": "credhub.read credhub.write",
            "jti": "7b4b5d2f7e4a4d2a9c1b0e0f"
        });

        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("grant_type=password"))
            .and(header("authorization", BASIC_PASSWORD_GRANT_CLIENT))
            .and(body_string_contains(format!("username={USERNAME}&")))
            .and(body_string_contains(format!("&password={PASSWORD}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(token.clone()))
            .mount(&self.server)
            .await;

        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(header("authorization", BASIC_CLIENT))
            .respond_with(ResponseTemplate::new(200).set_body_json(token))
            .mount(&self.server)
            .await;

        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "unauthorized",
                "error_description": "Bad credentials"
            })))
            .with_priority(FALLBACK_UNAUTHORIZED)
            .mount(&self.server)
            .await;
    }

    async fn mount_data(&self) {
        let auth = self.expected_authorization();

        for name in fixtures::names() {
            let versions = fixtures::versions_of(&name);

            self.mount_name_query(&auth, &name, None, &versions).await;
            self.mount_name_query(&auth, &name, Some(("current", "true".to_string())), &versions[..1])
                .await;
            for count in 1..=MAX_VERSIONS {
                let take = count.min(versions.len());
                self.mount_name_query(&auth, &name, Some(("versions", count.to_string())), &versions[..take])
                    .await;
            }

            for version in &versions {
                Mock::given(method("GET"))
                    .and(path(format!("/api/v1/data/{}", version.id)))
                    .and(header("authorization", auth.as_str()))
                    .respond_with(ResponseTemplate::new(200).set_body_json(version.to_json()))
                    .mount(&self.server)
                    .await;
            }
        }

        for folder in fixtures::paths() {
            let summaries: Vec<Value> = fixtures::names_under(&folder)
                .into_iter()
                .filter_map(|name| fixtures::versions_of(&name).into_iter().next())
                .map(|newest| json!({"name": newest.name, "version_created_at": newest.version_created_at}))
                .collect();
            let body = json!({"credentials": summaries});

            for query in [folder.as_str(), folder.trim_end_matches('/')] {
                Mock::given(method("GET"))
                    .and(path("/api/v1/data"))
                    .and(query_param("path", query))
                    .and(header("authorization", auth.as_str()))
                    .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
                    .mount(&self.server)
                    .await;
            }
        }

        let paths: Vec<Value> = fixtures::paths()
            .into_iter()
            .map(|p| json!({"path": p}))
            .collect();
        Mock::given(method("GET"))
            .and(path("/api/v1/data"))
            .and(query_param("paths", "true"))
            .and(header("authorization", auth.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"paths": paths})))
            .mount(&self.server)
            .await;
    }

    async fn mount_name_query(
        &self,
        auth: &str,
        name: &str,
        selector: Option<(&str, String)>,
        versions: &[FixtureCredential],
    ) {
        let data: Vec<Value> = versions.iter().map(FixtureCredential::to_json).collect();
        let mut mock = Mock::given(method("GET"))
            .and(path("/api/v1/data"))
            .and(query_param("name", name))
            .and(header("authorization", auth));

        mock = match selector {
            Some((key, value)) => mock.and(query_param(key, value)),
            None => mock
                .and(query_param_is_missing("current"))
                .and(query_param_is_missing("versions")),
        };

        mock.respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": data})))
            .mount(&self.server)
            .await;
    }

    async fn mount_fallbacks(&self) {
        Mock::given(path_regex("^/api/"))
            .and(header("authorization", self.expected_authorization().as_str()))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": "The request could not be completed because the credential does not exist or you do not have sufficient authorization."
            })))
            .with_priority(FALLBACK_NOT_FOUND)
            .mount(&self.server)
            .await;

        Mock::given(path_regex("^/api/"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": "invalid_token",
                "error_description": "Full authentication is required to access this resource"
            })))
            .with_priority(FALLBACK_UNAUTHORIZED)
            .mount(&self.server)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_info_advertises_self_in_uaa_mode() {
        let mock = MockCredhubServer::start().await;
        let info: Value = reqwest::get(format!("{}/info", mock.uri()))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(info["auth-server"]["url"], mock.uri());
    }

    #[tokio::test]
    async fn test_data_requires_authorization() {
        let mock = MockCredhubServer::start_with(AuthMode::Basic).await;
        let http = reqwest::Client::new();
        let url = format!("{}/api/v1/data?paths=true", mock.uri());

        let anonymous = http.get(&url).send().await.unwrap();
        assert_eq!(anonymous.status(), 401);

        let authorised = http
            .get(&url)
            .basic_auth(USERNAME, Some(PASSWORD))
            .send()
            .await
            .unwrap();
        assert_eq!(authorised.status(), 200);
        assert_eq!(mock.request_count("/api/v1/data").await, 2);
    }

    #[tokio::test]
    async fn test_password_grant_requires_cli_client() {
        let mock = MockCredhubServer::start().await;
        let http = reqwest::Client::new();
        let url = format!("{}/oauth/token", mock.uri());
        let form = [("grant_type", "password"), ("username", USERNAME), ("password", PASSWORD)];

        let anonymous = http.post(&url).form(&form).send().await.unwrap();
        assert_eq!(anonymous.status(), 401);

        let other_client = http
            .post(&url)
            .basic_auth("cf", Some(""))
            .form(&form)
            .send()
            .await
            .unwrap();
        assert_eq!(other_client.status(), 401);

        let cli = http
            .post(&url)
            .basic_auth("credhub_cli", Some(""))
            .form(&form)
            .send()
            .await
            .unwrap();
        assert_eq!(cli.status(), 200);
    }
}
