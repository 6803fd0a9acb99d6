//! Shared plumbing for the CredHub client crates.
//!
//! This crate provides:
//! - A platform error type for setup failures
//! - HTTP transport configuration and building, including the
//!   self-signed TLS escape hatch
//! - Tracing subscriber initialisation

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod http;
pub mod tracing_config;

pub use error::PlatformError;
pub use http::{HttpConfig, build_http_client};
pub use tracing_config::{TracingConfig, init_tracing};
