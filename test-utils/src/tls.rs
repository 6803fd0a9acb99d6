//! Self-signed HTTPS front end for the mock CredHub.
//!
//! Terminates TLS with a freshly generated certificate for `127.0.0.1` and
//! `localhost` and forwards the decrypted stream to a plain HTTP upstream,
//! normally [`crate::MockCredhubServer::address`]. No client trusts the
//! certificate, so only clients that skip verification get through.

use rustls::ServerConfig;
use rustls::pki_types::{PrivateKeyDer, PrivatePkcs8KeyDer};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::copy_bidirectional;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;

/// Error raised while setting up the front end.
pub type TlsSetupError = Box<dyn std::error::Error + Send + Sync>;

/// A running TLS front end. The listener stops when this is dropped.
pub struct TlsFrontend {
    address: SocketAddr,
    accept_loop: JoinHandle<()>,
}

impl TlsFrontend {
    /// Listen on an ephemeral port and forward every connection to `upstream`.
    ///
    /// # Errors
    ///
    /// Certificate generation, TLS configuration or binding failed.
    pub async fn start(upstream: SocketAddr) -> Result<Self, TlsSetupError> {
        let acceptor = TlsAcceptor::from(Arc::new(self_signed_config()?));
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let address = listener.local_addr()?;

        let accept_loop = tokio::spawn(async move {
            while let Ok((tcp, _)) = listener.accept().await {
                let acceptor = acceptor.clone();
                tokio::spawn(async move {
                    // a rejected handshake just drops the connection
                    let Ok(mut tls) = acceptor.accept(tcp).await else {
                        return;
                    };
                    let Ok(mut backend) = TcpStream::connect(upstream).await else {
                        return;
                    };
                    let _ = copy_bidirectional(&mut tls, &mut backend).await;
                });
            }
        });

        Ok(Self {
            address,
            accept_loop,
        })
    }

    /// `https://` base URL of the front end.
    #[must_use]
    pub fn uri(&self) -> String {
        format!("https://{}", self.address)
    }
}

impl Drop for TlsFrontend {
    fn drop(&mut self) {
        self.accept_loop.abort();
    }
}

fn self_signed_config() -> Result<ServerConfig, TlsSetupError> {
    let certified =
        rcgen::generate_simple_self_signed(vec!["127.0.0.1".to_string(), "localhost".to_string()])?;
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(certified.key_pair.serialize_der()));

    let config = ServerConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
        .with_safe_default_protocol_versions()?
        .with_no_client_auth()
        .with_single_cert(vec![certified.cert.der().clone()], key)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MockCredhubServer;

    fn http(accept_invalid_certs: bool) -> reqwest::Client {
        reqwest::Client::builder()
            .use_rustls_tls()
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_forwards_to_upstream_over_tls() {
        let mock = MockCredhubServer::start().await;
        let front = TlsFrontend::start(mock.address()).await.unwrap();
        assert!(front.uri().starts_with("https://127.0.0.1:"));

        let response = http(true).get(format!("{}/info", front.uri())).send().await.unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(mock.request_count("/info").await, 1);
    }

    #[tokio::test]
    async fn test_certificate_is_untrusted() {
        let mock = MockCredhubServer::start().await;
        let front = TlsFrontend::start(mock.address()).await.unwrap();

        let result = http(false).get(format!("{}/info", front.uri())).send().await;
        assert!(result.is_err());
        assert_eq!(mock.request_count("/info").await, 0);
    }
}
