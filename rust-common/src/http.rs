//! HTTP client configuration and building.
//!
//! Clients are built on rustls and always negotiate at least the configured
//! TLS version. Mutual TLS is enabled by passing [`TlsMaterial`].

use reqwest::tls::Version;
use reqwest::{Certificate, Client, ClientBuilder, Identity};
use std::time::Duration;

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Request timeout (default: 30s)
    pub timeout: Duration,
    /// Connection timeout (default: 10s)
    pub connect_timeout: Duration,
    /// Minimum negotiated TLS version (default: TLS 1.2)
    pub min_tls_version: Version,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            min_tls_version: Version::TLS_1_2,
            user_agent: concat!("hcv/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl HttpConfig {
    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the connection timeout.
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the minimum TLS version.
    #[must_use]
    pub const fn with_min_tls_version(mut self, version: Version) -> Self {
        self.min_tls_version = version;
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// PEM-encoded key material for mutual TLS.
pub struct TlsMaterial {
    /// Client certificate chain followed by its private key
    pub identity_pem: Vec<u8>,
    /// Trusted CA certificates. When present, built-in roots are not trusted.
    pub ca_bundle_pem: Option<Vec<u8>>,
}

impl std::fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("identity_pem", &"[REDACTED]")
            .field("ca_bundle_pem", &self.ca_bundle_pem.as_ref().map(Vec::len))
            .finish()
    }
}

/// Build a configured HTTP client.
///
/// # Errors
///
/// Returns an error if the key material cannot be parsed or the TLS backend
/// fails to initialise.
///
/// # Examples
///
/// ```
/// use hcv_common::{HttpConfig, build_http_client};
/// use std::time::Duration;
///
/// let config = HttpConfig::default().with_timeout(Duration::from_secs(5));
/// let client = build_http_client(&config, None).expect("client");
/// ```
pub fn build_http_client(
    config: &HttpConfig,
    tls: Option<&TlsMaterial>,
) -> Result<Client, reqwest::Error> {
    let mut builder = ClientBuilder::new()
        .timeout(config.timeout)
        .connect_timeout(config.connect_timeout)
        .user_agent(&config.user_agent)
        .use_rustls_tls()
        .min_tls_version(config.min_tls_version);

    if let Some(tls) = tls {
        builder = builder.identity(Identity::from_pem(&tls.identity_pem)?);
        if let Some(ca_bundle) = &tls.ca_bundle_pem {
            builder = builder.tls_built_in_root_certs(false);
            for cert in Certificate::from_pem_bundle(ca_bundle)? {
                builder = builder.add_root_certificate(cert);
            }
        }
    }

    builder.build()
}
