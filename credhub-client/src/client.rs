//! CredHub HTTP client.

use crate::{
    auth::{Authenticator, Identity},
    config::CredhubConfig,
    credential::{
        Credential, CredentialSummary, DataResponse, FindResponse, PathsResponse,
        sort_newest_first,
    },
    error::{CredhubError, CredhubResult},
    provider::CredentialProvider,
};
use async_trait::async_trait;
use credhub_common::build_http_client;
use reqwest::{Client, Response, header};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};
use url::Url;

/// Append path segments to a base URL, dropping any query.
pub(crate) fn endpoint_url(base: &Url, segments: &[&str]) -> CredhubResult<Url> {
    let mut url = base.clone();
    url.set_query(None);
    url.path_segments_mut()
        .map_err(|()| CredhubError::invalid_config(format!("{base} cannot be a base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Read an error response body for diagnostics. A body that cannot be read
/// is logged and reported as empty.
pub(crate) async fn error_body(response: Response) -> String {
    match response.text().await {
        Ok(body) => body,
        Err(e) => {
            debug!(error = %e, "Failed to read error response body");
            String::new()
        }
    }
}

/// Authenticated CredHub client.
///
/// The signing credential is negotiated once in the constructor and only
/// read afterwards, so a client can be shared behind an `Arc` without
/// locking. A client whose credential stops being accepted keeps failing
/// with [`CredhubError::Auth`]; build a new one to re-authenticate.
#[derive(Debug)]
pub struct CredhubClient {
    base: Url,
    http: Client,
    auth: Authenticator,
}

impl CredhubClient {
    /// Authenticate as a user and return a ready client.
    ///
    /// `skip_tls_verification` makes this and every later request accept
    /// self-signed certificates.
    ///
    /// # Errors
    ///
    /// [`CredhubError::InvalidConfig`] for a bad URL or empty credentials,
    /// [`CredhubError::Auth`] when negotiation fails.
    pub async fn new(
        server_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
        skip_tls_verification: bool,
    ) -> CredhubResult<Self> {
        let config = CredhubConfig::new(server_url, Identity::user(username, password))
            .with_skip_tls_verification(skip_tls_verification);
        Self::with_config(config).await
    }

    /// Authenticate with a full configuration.
    ///
    /// # Errors
    ///
    /// See [`CredhubClient::new`]; transport construction failures surface
    /// as [`CredhubError::Platform`].
    pub async fn with_config(config: CredhubConfig) -> CredhubResult<Self> {
        let base = config.validate()?;
        let http = build_http_client(&config.http_config())?;
        let auth = Authenticator::negotiate(&http, &base, config.identity).await?;
        Ok(Self { base, http, auth })
    }

    /// Server base URL.
    #[must_use]
    pub const fn server_url(&self) -> &Url {
        &self.base
    }

    /// Negotiated credential.
    #[must_use]
    pub const fn authenticator(&self) -> &Authenticator {
        &self.auth
    }

    fn data_url(&self, query: &[(&str, &str)]) -> CredhubResult<Url> {
        let mut url = endpoint_url(&self.base, &["api", "v1", "data"])?;
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url, target: &str) -> CredhubResult<T> {
        debug!(%url, "Sending CredHub request");

        let request = self.http.get(url).header(header::ACCEPT, "application/json");
        let response = self.auth.sign(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = error_body(response).await;
            warn!(%status, target, "CredHub rejected request");
            return Err(CredhubError::from_status(status, target, body));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get_versions(&self, name: &str, query: &[(&str, &str)]) -> CredhubResult<Vec<Credential>> {
        let url = self.data_url(query)?;
        let response: DataResponse = self.get_json(url, name).await?;

        let mut credentials = response.data;
        if credentials.is_empty() {
            return Err(CredhubError::not_found(name));
        }
        sort_newest_first(&mut credentials);
        Ok(credentials)
    }
}

#[async_trait]
impl CredentialProvider for CredhubClient {
    type Error = CredhubError;

    #[instrument(skip(self))]
    async fn find_by_path(&self, path: &str) -> CredhubResult<Vec<CredentialSummary>> {
        let url = self.data_url(&[("path", path)])?;
        let response: FindResponse = self.get_json(url, path).await?;

        if response.credentials.is_empty() {
            return Err(CredhubError::not_found(path));
        }
        debug!(count = response.credentials.len(), "Found credentials");
        Ok(response.credentials)
    }

    #[instrument(skip(self))]
    async fn list_all_paths(&self) -> CredhubResult<Vec<String>> {
        let url = self.data_url(&[("paths", "true")])?;
        let response: PathsResponse = self.get_json(url, "paths").await?;
        Ok(response.paths.into_iter().map(|p| p.path).collect())
    }

    #[instrument(skip(self))]
    async fn get_all_by_name(&self, name: &str) -> CredhubResult<Vec<Credential>> {
        self.get_versions(name, &[("name", name)]).await
    }

    #[instrument(skip(self))]
    async fn get_latest_by_name(&self, name: &str) -> CredhubResult<Credential> {
        self.get_versions(name, &[("name", name), ("current", "true")])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CredhubError::not_found(name))
    }

    #[instrument(skip(self))]
    async fn get_versions_by_name(&self, name: &str, versions: i32) -> CredhubResult<Vec<Credential>> {
        let Ok(limit) = usize::try_from(versions) else {
            return self.get_all_by_name(name).await;
        };
        if limit == 0 {
            return self.get_all_by_name(name).await;
        }

        let count = versions.to_string();
        let mut credentials = self
            .get_versions(name, &[("name", name), ("versions", count.as_str())])
            .await?;
        credentials.truncate(limit);
        Ok(credentials)
    }

    #[instrument(skip(self))]
    async fn get_by_id(&self, id: &str) -> CredhubResult<Credential> {
        let url = endpoint_url(&self.base, &["api", "v1", "data", id])?;
        self.get_json(url, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_url_appends_segments() {
        let base = Url::parse("https://credhub.example.com:8844").unwrap();
        let url = endpoint_url(&base, &["api", "v1", "data"]).unwrap();
        assert_eq!(url.as_str(), "https://credhub.example.com:8844/api/v1/data");

        let base = Url::parse("https://proxy.example.com/credhub/?x=1").unwrap();
        let url = endpoint_url(&base, &["info"]).unwrap();
        assert_eq!(url.as_str(), "https://proxy.example.com/credhub/info");
    }

    #[test]
    fn test_endpoint_url_escapes_ids() {
        let base = Url::parse("https://credhub").unwrap();
        let url = endpoint_url(&base, &["api", "v1", "data", "a/b c"]).unwrap();
        assert_eq!(url.as_str(), "https://credhub/api/v1/data/a%2Fb%20c");
    }
}
