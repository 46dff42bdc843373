//! Vault error types using thiserror 2.0.
//!
//! Every failure is classified as transient (retried by the envelope) or
//! terminal (surfaced on the first occurrence). Exhausting the retry budget
//! produces [`VaultError::MaxRetriesExceeded`], which keeps the last transient
//! failure as its source.

use hcv_common::{RetryError, Retryable};
use thiserror::Error;

/// Vault-specific errors.
#[derive(Error, Debug)]
pub enum VaultError {
    /// Login rejected with 401
    #[error("Invalid Vault credentials")]
    InvalidCredentials,

    /// Secret read rejected with 401
    #[error("Invalid Vault token")]
    InvalidToken,

    /// Secret absent (404, or a null `data` object)
    #[error("Secret not found at path: {0}")]
    SecretNotFound(String),

    /// Auth method selector not recognised
    #[error("Unsupported authentication method: {0}")]
    UnsupportedAuthMethod(String),

    /// A requested key-value key is absent from the response
    #[error("Key '{key}' not present in secret at path: {path}")]
    MissingKey {
        /// Secret path
        path: String,
        /// Requested key
        key: String,
    },

    /// A 200 response whose body does not have the expected shape
    #[error("Malformed Vault response: {0}")]
    MalformedResponse(String),

    /// Login answered with a status other than 200 or 401
    #[error("Vault authentication failed with status {status}")]
    AuthenticationFailed {
        /// HTTP status code
        status: u16,
    },

    /// Secret request answered with a status that is not classified as terminal
    #[error("Unexpected status {status} from Vault for path: {path}")]
    UnexpectedStatus {
        /// HTTP status code
        status: u16,
        /// Request path
        path: String,
    },

    /// Transport-level fault (connection refused, timeout, TLS handshake)
    #[error("Vault unavailable: {0}")]
    Unavailable(String),

    /// Transient failures persisted past the retry budget
    #[error("Max retries exceeded for {operation} after {attempts} attempts")]
    MaxRetriesExceeded {
        /// Operation that was retried
        operation: String,
        /// Number of attempts performed
        attempts: u32,
        /// Failure reported by the final attempt
        #[source]
        source: Box<VaultError>,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Key store or trust store could not be loaded
    #[error("TLS configuration error: {0}")]
    Tls(String),

    /// HTTP client could not be built
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type for Vault operations.
pub type VaultResult<T> = Result<T, VaultError>;

impl VaultError {
    /// Check if error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable(_) | Self::UnexpectedStatus { .. } | Self::AuthenticationFailed { .. }
        )
    }

    /// Create an unavailable error.
    #[must_use]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create a secret not found error.
    #[must_use]
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::SecretNotFound(path.into())
    }

    /// Create a malformed response error.
    #[must_use]
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedResponse(msg.into())
    }

    /// Create an invalid configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}

impl Retryable for VaultError {
    fn is_retryable(&self) -> bool {
        Self::is_retryable(self)
    }
}

impl From<RetryError<Self>> for VaultError {
    fn from(err: RetryError<Self>) -> Self {
        match err {
            RetryError::Terminal(e) => e,
            RetryError::Exhausted {
                operation,
                attempts,
                last,
            } => Self::MaxRetriesExceeded {
                operation,
                attempts,
                source: Box::new(last),
            },
        }
    }
}
