mod common;

use buddy_client::auth::LogoutOptions;
use buddy_client::models::AuthRequest;
use buddy_client::storage::{MemoryStorage, DEFAULT_USER_KEY};
use buddy_client::{Error, ErrorKind, StorageError};
use common::{harness, harness_with, login_body};
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_login(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(serde_json::json!({
            "email": "shelter@buddy.org",
            "password": "secret"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(login_body()))
        .mount(server)
        .await;
}

fn credentials() -> AuthRequest {
    AuthRequest::new("shelter@buddy.org", "secret")
}

#[tokio::test]
async fn test_login_persists_profiles_without_tokens() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    let h = harness(&server);
    let session = h.client.login(&credentials()).await.unwrap();
    assert!(session.is_authenticated());
    assert_eq!(session.storage_error, None);

    let raw = h.medium.raw(DEFAULT_USER_KEY).unwrap();
    assert!(raw.contains("Shelter A"));
    assert!(!raw.contains("header.payload.sig"));
    assert!(!raw.contains("opaque"));
}

#[tokio::test]
async fn test_login_survives_persistence_failure() {
    let server = MockServer::start().await;
    mount_login(&server).await;

    let medium = MemoryStorage::new();
    medium.set_fail_writes(true);
    let h = harness_with(&server, medium);

    let session = h.client.login(&credentials()).await.unwrap();
    assert!(session.is_authenticated());
    assert!(matches!(session.storage_error, Some(StorageError::WriteFailed { .. })));
    assert!(h.medium.raw(DEFAULT_USER_KEY).is_none());
    assert_eq!(h.reporter.reports.lock()[0].source, "session_store");
}

#[tokio::test]
async fn test_bad_credentials_trigger_one_refresh() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/auth/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server);
    let err = h.client.login(&credentials()).await.unwrap_err();
    assert!(matches!(err, Error::RefreshFailed(_)));
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
    assert!(!h.client.session().is_authenticated());
    assert_eq!(h.client.api().coordinator().refresh_count(), 1);
    assert_eq!(h.client.invalidation().emitted(), 1);
    assert_eq!(h.reporter.reports.lock()[0].source, "refresh_coordinator");
}

#[tokio::test]
async fn test_fail_safe_logout_on_server_error() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let h = harness(&server);
    h.client.login(&credentials()).await.unwrap();

    let err = h
        .client
        .logout(LogoutOptions::redirect("/"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ServerError);

    assert!(!h.client.session().is_authenticated());
    assert!(h.medium.raw(DEFAULT_USER_KEY).is_none());
    assert_eq!(*h.visited.lock(), vec!["/".to_string()]);

    let reports = h.reporter.reports.lock();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].source, "logout");
    assert_eq!(reports[0].status, Some(500));
}

#[tokio::test]
async fn test_logout_success() {
    let server = MockServer::start().await;
    mount_login(&server).await;
    Mock::given(method("POST"))
        .and(path("/auth/logout"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let h = harness(&server);
    h.client.login(&credentials()).await.unwrap();
    h.client.logout(LogoutOptions::default()).await.unwrap();

    assert!(!h.client.session().is_authenticated());
    assert!(h.visited.lock().is_empty());
    assert!(h.reporter.reports.lock().is_empty());
}

#[tokio::test]
async fn test_session_restored_and_self_healed() {
    let server = MockServer::start().await;

    let medium = MemoryStorage::with_value(DEFAULT_USER_KEY, r#"{"profiles":"not-an-array"}"#);
    let h = harness_with(&server, medium);
    let session = h.client.session().snapshot();
    assert!(!session.is_loading);
    assert!(!session.is_authenticated());
    assert!(matches!(session.storage_error, Some(StorageError::Invalid { .. })));
    assert!(h.medium.raw(DEFAULT_USER_KEY).is_none());

    let medium = MemoryStorage::with_value(
        DEFAULT_USER_KEY,
        r#"{"profiles":[{"name":"Ana","description":"","profileType":"ADOPTER"}]}"#,
    );
    let h = harness_with(&server, medium);
    assert!(h.client.session().is_authenticated());
}
