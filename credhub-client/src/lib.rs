//! CredHub client.
//!
//! Authenticates against a CredHub server (UAA token exchange, or HTTP
//! basic when the server advertises no authorization server) and retrieves
//! credentials by path, name, version or id. Retrieved envelopes carry an
//! untyped value; [`value`] decodes it into a shape selected by the
//! envelope's type discriminant.
//!
//! ```no_run
//! use credhub_client::{CredentialProvider, CredhubClient, value::user_value};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = CredhubClient::new("https://credhub.example.com:8844", "admin", "secret", false).await?;
//! let latest = client.get_latest_by_name("/concourse/main/db-user").await?;
//! let user = user_value(&latest)?;
//! println!("{:?}", user.username);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod client;
pub mod config;
pub mod credential;
pub mod error;
pub mod provider;
pub mod value;

pub use auth::{Authenticator, Identity, Signer};
pub use client::CredhubClient;
pub use config::CredhubConfig;
pub use credential::{Credential, CredentialSummary, CredentialType};
pub use error::{CredhubError, CredhubResult};
pub use provider::CredentialProvider;
pub use value::{
    CertificateValue, CredentialValue, DecodeError, DecodeReason, RsaValue, SshValue, TypedValue,
    UserValue,
};
