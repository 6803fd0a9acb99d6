//! Generic credential provider trait.

use crate::credential::{Credential, CredentialSummary};
use async_trait::async_trait;

/// Read access to a credential service.
///
/// Every call is a single round trip; nothing is cached or retried.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Error returned by every operation.
    type Error: std::error::Error + Send + Sync;

    /// Names of the credentials stored under a path prefix.
    async fn find_by_path(&self, path: &str) -> Result<Vec<CredentialSummary>, Self::Error>;

    /// Every distinct path known to the service.
    async fn list_all_paths(&self) -> Result<Vec<String>, Self::Error>;

    /// All versions of a credential, newest first.
    async fn get_all_by_name(&self, name: &str) -> Result<Vec<Credential>, Self::Error>;

    /// The newest version of a credential.
    async fn get_latest_by_name(&self, name: &str) -> Result<Credential, Self::Error>;

    /// The `versions` newest versions of a credential, newest first.
    ///
    /// A count of zero or less means "no limit" and behaves exactly like
    /// [`CredentialProvider::get_all_by_name`]. Existing callers rely on
    /// this, so it is kept rather than rejected.
    async fn get_versions_by_name(
        &self,
        name: &str,
        versions: i32,
    ) -> Result<Vec<Credential>, Self::Error>;

    /// A single version by its id.
    async fn get_by_id(&self, id: &str) -> Result<Credential, Self::Error>;
}
