//! HashiCorp Vault client.
//!
//! Logs in with AppRole or client-certificate credentials and reads secrets
//! from the key-value, database, Active Directory and LDAP engines. Every
//! network operation runs inside a bounded retry envelope that distinguishes
//! transient from terminal failures.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod secrets;
pub mod transport;

pub use auth::{AuthMethod, AuthResult, CertificateBundle, Credentials};
pub use client::VaultClient;
pub use config::{EndpointConfig, EnginePaths, TokenPlacement, VaultConfig};
pub use error::{VaultError, VaultResult};
pub use secrets::{SecretBundle, SecretEngine};
pub use transport::{HttpTransport, RequestAuth, Transport, VaultRequest, VaultResponse};
