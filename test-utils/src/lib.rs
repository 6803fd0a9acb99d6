//! Shared test utilities for the CredHub client crates.
//!
//! This crate provides:
//! - A wiremock-backed CredHub server with UAA or basic authentication
//! - Fixture credentials covering every value type
//! - Proptest generators for credential envelopes
//! - A self-signed HTTPS front end for exercising TLS verification

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod mocks;
pub mod tls;

pub use mocks::{AuthMode, MockCredhubServer};
pub use tls::TlsFrontend;

use credhub_common::{TracingConfig, init_tracing};

/// Install a debug-level subscriber once per test binary.
pub fn init_test_tracing() {
    // Only the first call in a process can install the subscriber.
    let _ = init_tracing(&TracingConfig::default().with_log_level("debug"));
}
