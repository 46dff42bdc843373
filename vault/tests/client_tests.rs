//! End-to-end client tests against a mock Vault server.

use hcv_common::{HttpConfig, RetryConfig, RetryPolicy};
use hcv_vault::{
    CertificateBundle, Credentials, EndpointConfig, HttpTransport, SecretEngine, TokenPlacement,
    VaultClient, VaultError,
};
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "hvs.CAESIJ-test-token";

fn mock_client(server: &MockServer, max_attempts: u32) -> VaultClient {
    let retry = RetryPolicy::new(
        RetryConfig::default()
            .with_max_attempts(max_attempts)
            .with_base_backoff(Duration::ZERO)
            .with_max_backoff(Duration::ZERO),
    );
    let transport =
        HttpTransport::new(&HttpConfig::default().with_timeout(Duration::from_secs(5))).unwrap();
    VaultClient::new(
        EndpointConfig::new(server.uri(), "/v1/auth/approle/login"),
        Credentials::app_role("app-role-id", "app-secret-id"),
        retry,
        transport,
    )
}

fn token() -> SecretString {
    SecretString::from(TOKEN)
}

#[tokio::test]
async fn test_approle_login_returns_token_unchanged() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/auth/approle/login"))
        .and(body_json(serde_json::json!({
            "role_id": "app-role-id",
            "secret_id": "app-secret-id"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "auth": {
                "client_token": TOKEN,
                "policies": ["default", "app-read"],
                "lease_duration": 3600
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = mock_client(&server, 3).authenticate().await.unwrap();

    assert_eq!(result.token.unwrap().expose_secret(), TOKEN);
    assert_eq!(result.policies, vec!["default", "app-read"]);
}

#[tokio::test]
async fn test_login_unauthorized_makes_one_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/auth/approle/login"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let err = mock_client(&server, 3).authenticate().await.unwrap_err();
    assert!(matches!(err, VaultError::InvalidCredentials));
}

#[tokio::test]
async fn test_login_server_error_exhausts_budget() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/auth/approle/login"))
        .respond_with(ResponseTemplate::new(500))
        .expect(4)
        .mount(&server)
        .await;

    let err = mock_client(&server, 4).authenticate().await.unwrap_err();
    match err {
        VaultError::MaxRetriesExceeded { attempts, source, .. } => {
            assert_eq!(attempts, 4);
            assert!(matches!(*source, VaultError::AuthenticationFailed { status: 500 }));
        }
        other => panic!("expected MaxRetriesExceeded, got {other:?}"),
    }
}

#[tokio::test]
async fn test_login_recovers_after_transient_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/auth/approle/login"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/auth/approle/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "auth": { "client_token": TOKEN }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = mock_client(&server, 3).authenticate().await.unwrap();
    assert_eq!(result.token.unwrap().expose_secret(), TOKEN);
}

#[tokio::test]
async fn test_certificate_login_empty_body_has_no_token() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/auth/cert/login"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = VaultClient::new(
        EndpointConfig::new(server.uri(), "/v1/auth/cert/login"),
        Credentials::Certificate(CertificateBundle::new("client.pem", "ca.pem")),
        RetryPolicy::new(RetryConfig::default().with_max_attempts(1)),
        HttpTransport::new(&HttpConfig::default()).unwrap(),
    );

    let result = client.authenticate().await.unwrap();
    assert!(result.token.is_none());

    let received = server.received_requests().await.unwrap();
    assert!(received[0].body.is_empty());
}

#[tokio::test]
async fn test_connection_refused_is_transient() {
    // Reserve a free port, then release it so nothing listens there.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let uri = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let retry = RetryPolicy::new(
        RetryConfig::default()
            .with_max_attempts(2)
            .with_base_backoff(Duration::ZERO)
            .with_max_backoff(Duration::ZERO),
    );
    let client = VaultClient::new(
        EndpointConfig::new(uri, "/v1/auth/approle/login"),
        Credentials::app_role("r", "s"),
        retry,
        HttpTransport::new(&HttpConfig::default()).unwrap(),
    );

    let err = client.authenticate().await.unwrap_err();
    assert!(matches!(
        err,
        VaultError::MaxRetriesExceeded { attempts: 2, ref source, .. }
            if matches!(**source, VaultError::Unavailable(_))
    ));
}

#[tokio::test]
async fn test_kv_read_sends_bearer_and_returns_requested_keys() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/secret/app/config"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "lease_duration": 2_764_800,
            "data": {
                "db_user": "app",
                "db_pass": "s3cr3t",
                "api_key": "unrequested"
            }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let bundle = mock_client(&server, 3)
        .read_kv(&token(), "secret/app/config", ["db_user", "db_pass"])
        .await
        .unwrap();

    assert_eq!(bundle.len(), 2);
    assert_eq!(bundle.get("db_user"), Some("app"));
    assert_eq!(bundle.get("db_pass"), Some("s3cr3t"));
    assert!(!bundle.contains_key("api_key"));
}

#[tokio::test]
async fn test_kv_not_found_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/secret/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(3)
        .mount(&server)
        .await;

    let err = mock_client(&server, 3)
        .read_kv(&token(), "secret/missing", ["k"])
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::MaxRetriesExceeded { attempts: 3, .. }));
}

#[tokio::test]
async fn test_read_with_invalid_token_makes_one_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/database/creds/app"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let err = mock_client(&server, 5)
        .read_database(&token(), "database/creds/app")
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::InvalidToken));
}

#[tokio::test]
async fn test_database_read_takes_body_verbatim() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/database/creds/app"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "username": "v-approle-app-x7f2",
            "password": "A1a-generated",
            "ttl": 3600
        })))
        .mount(&server)
        .await;

    let bundle = mock_client(&server, 3)
        .read_database(&token(), "database/creds/app")
        .await
        .unwrap();

    assert_eq!(bundle.len(), 3);
    assert_eq!(bundle.get("username"), Some("v-approle-app-x7f2"));
    assert_eq!(bundle.get("ttl"), Some("3600"));
}

#[tokio::test]
async fn test_directory_not_found_makes_one_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/ad/creds/svc-reporting"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = mock_client(&server, 3)
        .read_directory(&token(), "ad/creds", "svc-reporting")
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::SecretNotFound(p) if p == "ad/creds/svc-reporting"));
}

#[tokio::test]
async fn test_directory_null_data_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/ad/creds/svc-reporting"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "data": null })))
        .expect(1)
        .mount(&server)
        .await;

    let err = mock_client(&server, 3)
        .read_directory(&token(), "ad/creds", "svc-reporting")
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::SecretNotFound(_)));
}

#[tokio::test]
async fn test_ldap_not_found_makes_one_request() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/ldap/static-cred/app"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let err = mock_client(&server, 3)
        .read_ldap(&token(), "ldap/static-cred/app")
        .await
        .unwrap_err();
    assert!(matches!(err, VaultError::SecretNotFound(_)));
}

#[tokio::test]
async fn test_query_placement_sends_token_parameter() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/ldap/static-cred/app"))
        .and(query_param("token", TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "username": "app",
            "password": "rotated"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = mock_client(&server, 3).with_token_placement(TokenPlacement::QueryParameter);
    let engine = SecretEngine::Ldap {
        path: "ldap/static-cred/app".to_string(),
    };
    let bundle = client.read_secret(&token(), &engine).await.unwrap();
    assert_eq!(bundle.get("password"), Some("rotated"));
}

#[tokio::test]
async fn test_token_lookup_valid() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/auth/token/lookup-self"))
        .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "data": { "ttl": 3599 }
        })))
        .expect(1)
        .mount(&server)
        .await;

    assert!(mock_client(&server, 3).is_token_valid(&token()).await.unwrap());
}

#[tokio::test]
async fn test_token_lookup_forbidden_exhausts_budget() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v1/auth/token/lookup-self"))
        .respond_with(ResponseTemplate::new(403))
        .expect(3)
        .mount(&server)
        .await;

    let err = mock_client(&server, 3).is_token_valid(&token()).await.unwrap_err();
    assert!(matches!(err, VaultError::MaxRetriesExceeded { attempts: 3, .. }));
}
