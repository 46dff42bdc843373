//! HTTP transport seam.
//!
//! A [`Transport`] performs exactly one request and reports the status code and
//! body, or a transport-level fault. It never interprets status codes; that is
//! left to the operations in [`crate::client`].

use crate::auth::{CertificateBundle, Credentials};
use crate::error::{VaultError, VaultResult};
use async_trait::async_trait;
use hcv_common::{HttpConfig, build_http_client};
use reqwest::{Client, Method};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::debug;

/// How a token accompanies a request.
#[derive(Debug, Clone, Default)]
pub enum RequestAuth {
    /// No token
    #[default]
    None,
    /// `Authorization: Bearer <token>` header
    Bearer(SecretString),
    /// `?token=<token>` query parameter
    QueryParam(SecretString),
}

/// A single request to the Vault HTTP API.
#[derive(Clone)]
pub struct VaultRequest {
    /// HTTP method
    pub method: Method,
    /// Absolute URL
    pub url: String,
    /// Token transmission
    pub auth: RequestAuth,
    /// JSON body, if any
    pub json: Option<serde_json::Value>,
}

impl VaultRequest {
    /// A GET request without body or token.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            auth: RequestAuth::None,
            json: None,
        }
    }

    /// A POST request carrying a JSON body.
    #[must_use]
    pub fn post(url: impl Into<String>, json: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            auth: RequestAuth::None,
            json: Some(json),
        }
    }

    /// Attach a token.
    #[must_use]
    pub fn with_auth(mut self, auth: RequestAuth) -> Self {
        self.auth = auth;
        self
    }
}

// Login bodies carry the secret id, so the body is never printed.
impl std::fmt::Debug for VaultRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("auth", &self.auth)
            .field("json", &self.json.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Status code and raw body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub body: String,
}

impl VaultResponse {
    /// Create a response.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Deserialize the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::MalformedResponse`] if the body is not valid JSON
    /// for `T`.
    pub fn json<T: DeserializeOwned>(&self) -> VaultResult<T> {
        serde_json::from_str(&self.body).map_err(|e| VaultError::malformed(e.to_string()))
    }
}

/// Performs a single request against the Vault HTTP API.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send one request. Transport-level faults are reported as
    /// [`VaultError::Unavailable`]; any HTTP status is a successful send.
    async fn send(&self, request: VaultRequest) -> VaultResult<VaultResponse>;
}

/// [`Transport`] backed by a rustls `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: Client,
}

impl HttpTransport {
    /// Create a transport without a client certificate.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Http`] if the client cannot be built.
    pub fn new(config: &HttpConfig) -> VaultResult<Self> {
        let http = build_http_client(config, None)?;
        Ok(Self { http })
    }

    /// Create a transport presenting the bundle's client identity and trusting
    /// only the bundle's CA certificates.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Tls`] if the key material cannot be loaded.
    pub fn with_certificate(config: &HttpConfig, bundle: &CertificateBundle) -> VaultResult<Self> {
        let material = bundle.load_tls_material()?;
        let http = build_http_client(config, Some(&material))
            .map_err(|e| VaultError::Tls(format!("failed to configure mutual TLS: {e}")))?;
        debug!(keystore = %bundle.keystore_path.display(), "configured mutual TLS client");
        Ok(Self { http })
    }

    /// Create the transport the credentials require.
    ///
    /// # Errors
    ///
    /// See [`HttpTransport::new`] and [`HttpTransport::with_certificate`].
    pub fn for_credentials(config: &HttpConfig, credentials: &Credentials) -> VaultResult<Self> {
        match credentials {
            Credentials::AppRole { .. } => Self::new(config),
            Credentials::Certificate(bundle) => Self::with_certificate(config, bundle),
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: VaultRequest) -> VaultResult<VaultResponse> {
        let mut builder = self.http.request(request.method, &request.url);

        builder = match &request.auth {
            RequestAuth::None => builder,
            RequestAuth::Bearer(token) => builder.bearer_auth(token.expose_secret()),
            RequestAuth::QueryParam(token) => builder.query(&[("token", token.expose_secret())]),
        };

        if let Some(body) = &request.json {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| VaultError::unavailable(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| VaultError::unavailable(e.to_string()))?;

        Ok(VaultResponse { status, body })
    }
}
