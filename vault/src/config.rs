//! Vault client configuration.
//!
//! Configuration is read from environment variables (optionally seeded from a
//! `.env` file) or from a `KEY=value` file. Everything is validated before the
//! first network call.

use crate::auth::{AuthMethod, CertificateBundle, Credentials};
use crate::error::{VaultError, VaultResult};
use crate::secrets::SecretEngine;
use hcv_common::{BackoffStrategy, HttpConfig, RetryConfig};
use secrecy::SecretString;
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Default secret-engine path prefix.
pub const DEFAULT_SECRET_PREFIX: &str = "v1";

/// How secret reads transmit the token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TokenPlacement {
    /// `Authorization: Bearer` header for every engine
    #[default]
    Header,
    /// `token` query parameter for database, directory and LDAP reads;
    /// key-value reads keep the header
    QueryParameter,
}

impl TokenPlacement {
    /// Parse a placement name (`header` or `query`).
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidConfig`] for an unknown name.
    pub fn parse(name: &str) -> VaultResult<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "header" => Ok(Self::Header),
            "query" => Ok(Self::QueryParameter),
            other => Err(VaultError::config(format!(
                "Invalid VAULT_TOKEN_PLACEMENT: {other}"
            ))),
        }
    }
}

/// Server address and the paths derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    /// Base URL, e.g. `https://vault.internal:8200`
    pub addr: String,
    /// Login endpoint path, appended to `addr` as is
    pub auth_path: String,
    /// Secret-engine path prefix
    pub secret_prefix: String,
}

impl EndpointConfig {
    /// Create an endpoint with the default secret prefix.
    #[must_use]
    pub fn new(addr: impl Into<String>, auth_path: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            auth_path: auth_path.into(),
            secret_prefix: DEFAULT_SECRET_PREFIX.to_string(),
        }
    }

    /// Set the secret prefix.
    #[must_use]
    pub fn with_secret_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.secret_prefix = prefix.into();
        self
    }

    /// Login URL.
    #[must_use]
    pub fn login_url(&self) -> String {
        let auth_path = self.auth_path.trim_start_matches('/');
        format!("{}/{auth_path}", self.base())
    }

    /// URL of a secret below the prefix.
    #[must_use]
    pub fn secret_url(&self, path: &str) -> String {
        let mut url = self.base().to_string();
        for segment in self
            .secret_prefix
            .split('/')
            .chain(path.split('/'))
            .filter(|s| !s.is_empty())
        {
            url.push('/');
            url.push_str(segment);
        }
        url
    }

    /// Token self-lookup URL.
    #[must_use]
    pub fn lookup_self_url(&self) -> String {
        self.secret_url("auth/token/lookup-self")
    }

    fn base(&self) -> &str {
        self.addr.trim_end_matches('/')
    }
}

/// Secrets the command-line tool reads. All optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnginePaths {
    /// Key-value secret path
    pub kv_path: Option<String>,
    /// Keys to read from the key-value secret
    pub kv_keys: Vec<String>,
    /// Database credentials path
    pub database_path: Option<String>,
    /// Directory engine path
    pub ad_path: Option<String>,
    /// Directory role or account
    pub ad_key: Option<String>,
    /// LDAP credentials path
    pub ldap_path: Option<String>,
}

impl EnginePaths {
    /// The configured secrets, in key-value, database, directory, LDAP order.
    /// A directory path without a key is skipped.
    #[must_use]
    pub fn engines(&self) -> Vec<SecretEngine> {
        let mut engines = Vec::new();
        if let Some(path) = &self.kv_path {
            engines.push(SecretEngine::key_value(path.clone(), self.kv_keys.iter().cloned()));
        }
        if let Some(path) = &self.database_path {
            engines.push(SecretEngine::Database { path: path.clone() });
        }
        if let (Some(path), Some(key)) = (&self.ad_path, &self.ad_key) {
            engines.push(SecretEngine::Directory {
                path: path.clone(),
                key: key.clone(),
            });
        }
        if let Some(path) = &self.ldap_path {
            engines.push(SecretEngine::Ldap { path: path.clone() });
        }
        engines
    }
}

/// Vault client configuration.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Server address and paths
    pub endpoint: EndpointConfig,
    /// Login credentials
    pub credentials: Credentials,
    /// Retry envelope settings
    pub retry: RetryConfig,
    /// HTTP client settings
    pub http: HttpConfig,
    /// Token transmission for secret reads
    pub token_placement: TokenPlacement,
    /// Secrets to read
    pub engines: EnginePaths,
}

impl VaultConfig {
    /// Create a configuration with default retry and HTTP settings.
    #[must_use]
    pub fn new(endpoint: EndpointConfig, credentials: Credentials) -> Self {
        Self {
            endpoint,
            credentials,
            retry: RetryConfig::default(),
            http: HttpConfig::default(),
            token_placement: TokenPlacement::default(),
            engines: EnginePaths::default(),
        }
    }

    /// Load configuration from environment variables, after applying a `.env`
    /// file if one exists.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_env() -> VaultResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from a `KEY=value` file. The process environment is
    /// not consulted.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::InvalidConfig`] if the file cannot be read or
    /// parsed, or if its values are missing or invalid.
    pub fn from_file(path: impl AsRef<Path>) -> VaultResult<Self> {
        let path = path.as_ref();
        let entries = dotenvy::from_path_iter(path)
            .map_err(|e| VaultError::config(format!("cannot read {}: {e}", path.display())))?
            .collect::<Result<HashMap<_, _>, _>>()
            .map_err(|e| VaultError::config(format!("cannot parse {}: {e}", path.display())))?;
        Self::from_lookup(|name| entries.get(name).cloned())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if required variables are missing or invalid.
    pub fn from_lookup<F>(lookup: F) -> VaultResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let addr = required(&var, "VAULT_ADDR")?;
        let method = match var("VAULT_AUTH_METHOD") {
            Some(name) => AuthMethod::parse(&name)?,
            None => AuthMethod::AppRole,
        };
        let auth_path = var("VAULT_AUTH_PATH")
            .unwrap_or_else(|| method.default_login_path().to_string());
        let secret_prefix =
            var("VAULT_SECRET_PREFIX").unwrap_or_else(|| DEFAULT_SECRET_PREFIX.to_string());

        let credentials = match method {
            AuthMethod::AppRole => Credentials::app_role(
                required(&var, "VAULT_ROLE_ID")?,
                required(&var, "VAULT_SECRET_ID")?,
            ),
            AuthMethod::Certificate => Credentials::Certificate(
                CertificateBundle::new(
                    required(&var, "VAULT_KEYSTORE_PATH")?,
                    required(&var, "VAULT_TRUSTSTORE_PATH")?,
                )
                .with_passwords(
                    SecretString::from(var("VAULT_KEYSTORE_PASSWORD").unwrap_or_default()),
                    SecretString::from(var("VAULT_TRUSTSTORE_PASSWORD").unwrap_or_default()),
                ),
            ),
        };

        let max_attempts: u32 = parse_var(&var, "VAULT_MAX_RETRIES", 3)?;
        if max_attempts == 0 {
            return Err(VaultError::config("VAULT_MAX_RETRIES must be greater than 0"));
        }
        let strategy = match var("VAULT_BACKOFF_STRATEGY") {
            Some(name) => BackoffStrategy::parse(&name).ok_or_else(|| {
                VaultError::config(format!("Invalid VAULT_BACKOFF_STRATEGY: {name}"))
            })?,
            None => BackoffStrategy::default(),
        };
        let base_backoff_ms = parse_var(&var, "VAULT_BACKOFF_INTERVAL_MS", 100)?;
        let max_backoff_ms = parse_var(&var, "VAULT_MAX_BACKOFF_INTERVAL_MS", 1000)?;
        let retry = RetryConfig::default()
            .with_max_attempts(max_attempts)
            .with_base_backoff(Duration::from_millis(base_backoff_ms))
            .with_max_backoff(Duration::from_millis(max_backoff_ms))
            .with_strategy(strategy);

        let timeout_secs = parse_var(&var, "VAULT_TIMEOUT_SECS", 30)?;
        let http = HttpConfig::default().with_timeout(Duration::from_secs(timeout_secs));

        let token_placement = match var("VAULT_TOKEN_PLACEMENT") {
            Some(name) => TokenPlacement::parse(&name)?,
            None => TokenPlacement::default(),
        };

        let engines = EnginePaths {
            kv_path: var("VAULT_KV_PATH"),
            kv_keys: var("VAULT_KV_KEYS")
                .map(|keys| {
                    keys.split(',')
                        .map(str::trim)
                        .filter(|k| !k.is_empty())
                        .map(ToString::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            database_path: var("VAULT_DATABASE_PATH"),
            ad_path: var("VAULT_AD_PATH"),
            ad_key: var("VAULT_AD_KEY"),
            ldap_path: var("VAULT_LDAP_PATH"),
        };
        if engines.kv_path.is_some() && engines.kv_keys.is_empty() {
            return Err(VaultError::config("VAULT_KV_PATH is set but VAULT_KV_KEYS names no keys"));
        }
        if engines.ad_path.is_some() && engines.ad_key.is_none() {
            return Err(VaultError::config("VAULT_AD_PATH is set but VAULT_AD_KEY is missing"));
        }

        Ok(Self {
            endpoint: EndpointConfig {
                addr,
                auth_path,
                secret_prefix,
            },
            credentials,
            retry,
            http,
            token_placement,
            engines,
        })
    }

    /// Set the token placement.
    #[must_use]
    pub const fn with_token_placement(mut self, placement: TokenPlacement) -> Self {
        self.token_placement = placement;
        self
    }
}

fn required(var: impl Fn(&str) -> Option<String>, name: &str) -> VaultResult<String> {
    var(name).ok_or_else(|| VaultError::config(format!("{name} is required")))
}

/// Parse a variable, falling back to a default when unset.
fn parse_var<T>(var: impl Fn(&str) -> Option<String>, name: &str, default: T) -> VaultResult<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(val) => val
            .trim()
            .parse()
            .map_err(|e| VaultError::config(format!("Invalid {name}: {e}"))),
        None => Ok(default),
    }
}
