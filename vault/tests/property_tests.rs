//! Property-based tests for the Vault client types.
//!
//! Tests validate:
//! - Secret values never appear in `Debug` output
//! - Secret URLs never contain doubled slashes
//! - Key-value reads return exactly the requested keys

use hcv_vault::{
    CertificateBundle, Credentials, EndpointConfig, SecretBundle, SecretEngine, VaultError,
};
use proptest::prelude::*;
use secrecy::SecretString;
use std::collections::BTreeMap;

// Strategy for generating secret values
fn secret_value_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9!@#$%^&*]{12,64}"
}

// Strategy for generating key names
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{3,15}"
}

// Strategy for generating secret paths, possibly with stray slashes
fn secret_path_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("secret/app/config".to_string()),
        Just("/database/creds/readonly/".to_string()),
        prop::collection::vec("[a-z][a-z0-9-]{2,10}", 1..4)
            .prop_map(|segments| segments.join("//")),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Bundle values never appear in Debug output; key names do.
    #[test]
    fn prop_bundle_values_redacted(
        entries in prop::collection::btree_map(key_strategy(), secret_value_strategy(), 1..8),
    ) {
        let bundle: SecretBundle = entries.clone().into_iter().collect();
        let debug_output = format!("{bundle:?}");

        for (key, value) in &entries {
            prop_assert!(!debug_output.contains(value.as_str()), "Debug output leaked a value");
            prop_assert!(debug_output.contains(key.as_str()), "Debug output should list key names");
            prop_assert_eq!(bundle.get(key), Some(value.as_str()));
        }
    }

    /// Secret ids, key store passwords and full role ids never appear in
    /// Debug output.
    #[test]
    fn prop_credentials_redacted(
        role_id in "[a-z0-9-]{9,36}",
        secret_id in secret_value_strategy(),
        password in secret_value_strategy(),
    ) {
        let approle = Credentials::app_role(role_id.clone(), secret_id.clone());
        let debug_output = format!("{approle:?}");
        prop_assert!(!debug_output.contains(&secret_id));
        prop_assert!(!debug_output.contains(&role_id));

        let cert = Credentials::Certificate(
            CertificateBundle::new("/etc/hcv/client.pem", "/etc/hcv/ca.pem")
                .with_passwords(
                    SecretString::from(password.clone()),
                    SecretString::from(password.clone()),
                ),
        );
        let debug_output = format!("{cert:?}");
        prop_assert!(!debug_output.contains(&password));
        prop_assert!(debug_output.contains("client.pem"));
    }

    /// Secret URLs contain no doubled slashes after the scheme.
    #[test]
    fn prop_secret_url_has_no_double_slash(
        path in secret_path_strategy(),
        prefix in prop_oneof![Just("v1"), Just("/v1/"), Just("v1/")],
        trailing in any::<bool>(),
    ) {
        let addr = if trailing { "https://vault:8200/" } else { "https://vault:8200" };
        let endpoint =
            EndpointConfig::new(addr, "/v1/auth/approle/login").with_secret_prefix(prefix);
        let url = endpoint.secret_url(&path);

        let rest = url.strip_prefix("https://vault:8200/v1/");
        prop_assert!(rest.is_some(), "unexpected url {}", url);
        prop_assert!(!rest.unwrap_or_default().contains("//"));
        prop_assert!(!url.ends_with('/'));
    }

    /// A key-value read returns exactly the requested keys, or names the first
    /// missing one.
    #[test]
    fn prop_kv_returns_requested_subset(
        data in prop::collection::btree_map(key_strategy(), secret_value_strategy(), 1..8),
        extra in key_strategy(),
        take in 0usize..8,
    ) {
        let requested: Vec<String> = data.keys().take(take).cloned().collect();
        let body = serde_json::json!({ "data": data }).to_string();

        let bundle = SecretEngine::key_value("secret/app", requested.clone())
            .extract(&body)
            .unwrap();
        prop_assert_eq!(bundle.len(), requested.len());
        for key in &requested {
            prop_assert_eq!(bundle.get(key), data.get(key).map(String::as_str));
        }

        if !data.contains_key(&extra) {
            let mut with_missing = requested;
            with_missing.push(extra.clone());
            let err = SecretEngine::key_value("secret/app", with_missing).extract(&body);
            prop_assert!(
                matches!(err, Err(VaultError::MissingKey { ref key, .. }) if *key == extra),
                "missing key not reported"
            );
        }
    }
}

#[test]
fn test_bundle_iteration_exposes_values_on_request() {
    let entries = BTreeMap::from([("username", "svc"), ("password", "hunter2-long")]);
    let bundle: SecretBundle = entries.clone().into_iter().collect();

    let collected: BTreeMap<&str, &str> = bundle.iter().collect();
    assert_eq!(collected, entries);
}
