//! Vault client.
//!
//! Every operation runs inside the retry envelope and inside a child span of
//! the client's span, so callers decide where diagnostics are attached.

use crate::{
    auth::{AuthResult, Credentials, classify_login},
    config::{EndpointConfig, TokenPlacement, VaultConfig},
    error::{VaultError, VaultResult},
    secrets::{SecretBundle, SecretEngine, classify_read},
    transport::{HttpTransport, RequestAuth, Transport, VaultRequest},
};
use hcv_common::RetryPolicy;
use secrecy::SecretString;
use tracing::{Instrument, Span, debug, info, info_span};

const LOOKUP_SELF_PATH: &str = "auth/token/lookup-self";

/// Vault client. Holds no token; every read takes the token explicitly.
pub struct VaultClient<T = HttpTransport> {
    endpoint: EndpointConfig,
    credentials: Credentials,
    retry: RetryPolicy,
    token_placement: TokenPlacement,
    transport: T,
    span: Span,
}

impl VaultClient<HttpTransport> {
    /// Create a client over HTTP. Certificate credentials configure mutual TLS.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::Tls`] if the key material cannot be loaded, or
    /// [`VaultError::Http`] if the HTTP client cannot be built.
    pub fn from_config(config: &VaultConfig) -> VaultResult<Self> {
        let transport = HttpTransport::for_credentials(&config.http, &config.credentials)?;
        Ok(Self::new(
            config.endpoint.clone(),
            config.credentials.clone(),
            RetryPolicy::new(config.retry.clone()),
            transport,
        )
        .with_token_placement(config.token_placement))
    }
}

impl<T: Transport> VaultClient<T> {
    /// Create a client over an arbitrary transport.
    #[must_use]
    pub fn new(
        endpoint: EndpointConfig,
        credentials: Credentials,
        retry: RetryPolicy,
        transport: T,
    ) -> Self {
        let span = info_span!("vault", addr = %endpoint.addr);
        Self {
            endpoint,
            credentials,
            retry,
            token_placement: TokenPlacement::default(),
            transport,
            span,
        }
    }

    /// Attach the client's operations to a caller-supplied span.
    #[must_use]
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Set how secret reads transmit the token.
    #[must_use]
    pub const fn with_token_placement(mut self, placement: TokenPlacement) -> Self {
        self.token_placement = placement;
        self
    }

    /// Server endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &EndpointConfig {
        &self.endpoint
    }

    /// Login credentials.
    #[must_use]
    pub const fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Log in and obtain a client token.
    ///
    /// # Errors
    ///
    /// - [`VaultError::InvalidCredentials`] if the login is rejected with 401
    /// - [`VaultError::MalformedResponse`] if a role login succeeds without a token
    /// - [`VaultError::MaxRetriesExceeded`] if transient failures persist
    pub async fn authenticate(&self) -> VaultResult<AuthResult> {
        let method = self.credentials.method();
        let span = info_span!(parent: &self.span, "vault.authenticate", method = method.as_str());
        self.login().instrument(span).await
    }

    async fn login(&self) -> VaultResult<AuthResult> {
        let method = self.credentials.method();
        let url = self.endpoint.login_url();
        let url = url.as_str();

        let result = self
            .retry
            .execute("authenticate", move || async move {
                let response = self
                    .transport
                    .send(self.credentials.login_request(url.to_string()))
                    .await?;
                classify_login(method, &response)
            })
            .await?;

        info!(
            has_token = result.token.is_some(),
            policies = ?result.policies,
            "authenticated with Vault"
        );
        Ok(result)
    }

    /// Read a secret with a previously issued token.
    ///
    /// # Errors
    ///
    /// - [`VaultError::InvalidToken`] if the read is rejected with 401
    /// - [`VaultError::SecretNotFound`] if a directory or LDAP secret is absent
    /// - [`VaultError::MissingKey`] if a requested key-value key is absent
    /// - [`VaultError::MalformedResponse`] if a 200 body cannot be interpreted
    /// - [`VaultError::MaxRetriesExceeded`] if transient failures persist
    pub async fn read_secret(
        &self,
        token: &SecretString,
        engine: &SecretEngine,
    ) -> VaultResult<SecretBundle> {
        let span = info_span!(
            parent: &self.span,
            "vault.read_secret",
            engine = engine.kind(),
            path = %engine.path()
        );
        self.fetch_secret(token, engine).instrument(span).await
    }

    async fn fetch_secret(
        &self,
        token: &SecretString,
        engine: &SecretEngine,
    ) -> VaultResult<SecretBundle> {
        let url = self.endpoint.secret_url(&engine.path());
        let url = url.as_str();
        let operation = format!("read {} secret", engine.kind());

        let bundle = self
            .retry
            .execute(&operation, move || async move {
                let request = VaultRequest::get(url).with_auth(self.secret_auth(token, engine));
                let response = self.transport.send(request).await?;
                classify_read(engine, &response)
            })
            .await?;

        debug!(entries = bundle.len(), "secret read");
        Ok(bundle)
    }

    fn secret_auth(&self, token: &SecretString, engine: &SecretEngine) -> RequestAuth {
        match self.token_placement {
            TokenPlacement::QueryParameter if engine.accepts_query_token() => {
                RequestAuth::QueryParam(token.clone())
            }
            _ => RequestAuth::Bearer(token.clone()),
        }
    }

    /// Read the requested keys of a key-value secret.
    ///
    /// # Errors
    ///
    /// See [`VaultClient::read_secret`].
    pub async fn read_kv<I, S>(
        &self,
        token: &SecretString,
        path: &str,
        keys: I,
    ) -> VaultResult<SecretBundle>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.read_secret(token, &SecretEngine::key_value(path, keys)).await
    }

    /// Read database credentials.
    ///
    /// # Errors
    ///
    /// See [`VaultClient::read_secret`].
    pub async fn read_database(
        &self,
        token: &SecretString,
        path: &str,
    ) -> VaultResult<SecretBundle> {
        let engine = SecretEngine::Database {
            path: path.to_string(),
        };
        self.read_secret(token, &engine).await
    }

    /// Read Active Directory credentials for a role or account.
    ///
    /// # Errors
    ///
    /// See [`VaultClient::read_secret`].
    pub async fn read_directory(
        &self,
        token: &SecretString,
        path: &str,
        key: &str,
    ) -> VaultResult<SecretBundle> {
        let engine = SecretEngine::Directory {
            path: path.to_string(),
            key: key.to_string(),
        };
        self.read_secret(token, &engine).await
    }

    /// Read LDAP credentials.
    ///
    /// # Errors
    ///
    /// See [`VaultClient::read_secret`].
    pub async fn read_ldap(&self, token: &SecretString, path: &str) -> VaultResult<SecretBundle> {
        let engine = SecretEngine::Ldap {
            path: path.to_string(),
        };
        self.read_secret(token, &engine).await
    }

    /// Check a token against the self-lookup endpoint.
    ///
    /// Returns `Ok(true)` when the lookup succeeds. Every other outcome,
    /// including a 401, is retried.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::MaxRetriesExceeded`] when no attempt succeeded.
    pub async fn is_token_valid(&self, token: &SecretString) -> VaultResult<bool> {
        let span = info_span!(parent: &self.span, "vault.lookup_self");
        self.lookup_self(token).instrument(span).await
    }

    async fn lookup_self(&self, token: &SecretString) -> VaultResult<bool> {
        let url = self.endpoint.lookup_self_url();
        let url = url.as_str();

        let valid = self
            .retry
            .execute_with(
                "token lookup",
                move || async move {
                    let request =
                        VaultRequest::get(url).with_auth(RequestAuth::Bearer(token.clone()));
                    let response = self.transport.send(request).await?;
                    match response.status {
                        200 => Ok(true),
                        401 => Err(VaultError::InvalidToken),
                        status => Err(VaultError::UnexpectedStatus {
                            status,
                            path: LOOKUP_SELF_PATH.to_string(),
                        }),
                    }
                },
                |_: &VaultError| true,
            )
            .await?;

        debug!("token is valid");
        Ok(valid)
    }
}

impl<T> std::fmt::Debug for VaultClient<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultClient")
            .field("endpoint", &self.endpoint)
            .field("credentials", &self.credentials)
            .field("token_placement", &self.token_placement)
            .finish_non_exhaustive()
    }
}
