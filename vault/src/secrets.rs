//! Secret engines and secret bundles.
//!
//! The four supported engines differ only in URL shape and in how the response
//! body is turned into a [`SecretBundle`].

use crate::error::{VaultError, VaultResult};
use crate::transport::VaultResponse;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Secret values keyed by name. Built fresh for every read.
#[derive(Clone, Default)]
pub struct SecretBundle {
    entries: HashMap<String, SecretString>,
}

impl SecretBundle {
    /// Create an empty bundle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value for the key.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries
            .insert(key.into(), SecretString::from(value.into()));
    }

    /// Value for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(ExposeSecret::expose_secret)
    }

    /// Whether the bundle holds a key.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Key names, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Key/value pairs, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(k, v)| (k.as_str(), v.expose_secret()))
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the bundle is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for SecretBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.keys().collect();
        keys.sort_unstable();
        f.debug_map()
            .entries(keys.into_iter().map(|k| (k, "[REDACTED]")))
            .finish()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SecretBundle {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bundle = Self::new();
        for (k, v) in iter {
            bundle.insert(k, v);
        }
        bundle
    }
}

/// A secret to read, with the engine that serves it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecretEngine {
    /// Generic key-value secret; only the requested keys are returned
    KeyValue {
        /// Secret path below the prefix
        path: String,
        /// Keys to extract from `data`
        keys: Vec<String>,
    },
    /// Database credentials; the body is the bundle
    Database {
        /// Secret path below the prefix
        path: String,
    },
    /// Active Directory credentials; every entry of `data` is returned
    Directory {
        /// Engine path below the prefix
        path: String,
        /// Role or account name appended to the path
        key: String,
    },
    /// LDAP credentials; the body is the bundle
    Ldap {
        /// Secret path below the prefix
        path: String,
    },
}

impl SecretEngine {
    /// Key-value secret.
    #[must_use]
    pub fn key_value<I, S>(path: impl Into<String>, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::KeyValue {
            path: path.into(),
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Engine name used in logs and operation names.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::KeyValue { .. } => "kv",
            Self::Database { .. } => "database",
            Self::Directory { .. } => "directory",
            Self::Ldap { .. } => "ldap",
        }
    }

    /// Path below the secret prefix.
    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::KeyValue { path, .. } | Self::Database { path } | Self::Ldap { path } => {
                path.clone()
            }
            Self::Directory { path, key } => {
                format!("{}/{}", path.trim_end_matches('/'), key.trim_start_matches('/'))
            }
        }
    }

    /// Whether a 404 means the secret does not exist. For the other engines a
    /// 404 is treated like any other unexpected status.
    #[must_use]
    pub const fn not_found_is_terminal(&self) -> bool {
        matches!(self, Self::Directory { .. } | Self::Ldap { .. })
    }

    /// Whether the engine may receive its token as a query parameter.
    #[must_use]
    pub const fn accepts_query_token(&self) -> bool {
        !matches!(self, Self::KeyValue { .. })
    }

    /// Turn a 200 response body into a bundle.
    ///
    /// # Errors
    ///
    /// - [`VaultError::MalformedResponse`] if the body is not a JSON object, or
    ///   a key-value body has no `data` object
    /// - [`VaultError::MissingKey`] if a requested key-value key is absent
    /// - [`VaultError::SecretNotFound`] if a directory body has no `data` or a
    ///   null one
    pub fn extract(&self, body: &str) -> VaultResult<SecretBundle> {
        let root: Value = serde_json::from_str(body)
            .map_err(|e| VaultError::malformed(format!("{} response: {e}", self.kind())))?;
        let root = as_object(&root, self.kind())?;

        match self {
            Self::KeyValue { path, keys } => {
                let data = root
                    .get("data")
                    .and_then(Value::as_object)
                    .ok_or_else(|| VaultError::malformed(format!("no data object at {path}")))?;
                keys.iter()
                    .map(|key| {
                        data.get(key)
                            .map(|value| (key.clone(), stringify(value)))
                            .ok_or_else(|| VaultError::MissingKey {
                                path: path.clone(),
                                key: key.clone(),
                            })
                    })
                    .collect()
            }
            Self::Directory { .. } => match root.get("data") {
                Some(Value::Object(data)) => Ok(bundle_from(data)),
                Some(Value::Null) | None => Err(VaultError::not_found(self.path())),
                Some(_) => Err(VaultError::malformed(format!(
                    "data at {} is not an object",
                    self.path()
                ))),
            },
            Self::Database { .. } | Self::Ldap { .. } => Ok(bundle_from(root)),
        }
    }
}

/// Classify one secret read response.
///
/// 200 is extracted, 401 is terminal, 404 is terminal for engines where it
/// means the secret does not exist, and anything else is transient.
pub(crate) fn classify_read(
    engine: &SecretEngine,
    response: &VaultResponse,
) -> VaultResult<SecretBundle> {
    match response.status {
        200 => engine.extract(&response.body),
        401 => Err(VaultError::InvalidToken),
        404 if engine.not_found_is_terminal() => Err(VaultError::not_found(engine.path())),
        status => Err(VaultError::UnexpectedStatus {
            status,
            path: engine.path(),
        }),
    }
}

fn as_object<'a>(value: &'a Value, kind: &str) -> VaultResult<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| VaultError::malformed(format!("{kind} response is not a JSON object")))
}

fn bundle_from(map: &Map<String, Value>) -> SecretBundle {
    map.iter().map(|(k, v)| (k.clone(), stringify(v))).collect()
}

/// Strings are taken verbatim; anything else as its JSON text.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
