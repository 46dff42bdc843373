//! Shared building blocks for the hcv secret-management clients.
//!
//! This crate provides:
//! - A generic retry envelope with linear or windowed backoff
//! - Terminal/transient error classification for that envelope
//! - HTTP client configuration and building, with optional mutual TLS
//! - Tracing subscriber initialisation for binaries

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod http;
pub mod retry;
pub mod tracing_config;

pub use error::{RetryError, Retryable};
pub use http::{HttpConfig, TlsMaterial, build_http_client};
pub use retry::{BackoffStrategy, RetryConfig, RetryPolicy};
pub use tracing_config::{LogFormat, TracingConfig, init_tracing};
