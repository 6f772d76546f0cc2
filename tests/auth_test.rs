//! Tests for the admin authorization middleware

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::Value;
use std::env;
use std::sync::{Arc, Mutex};
use tempfile::{NamedTempFile, TempDir};
use tower::ServiceExt;

use tidy_feedback::database::{init_db, AppState};
use tidy_feedback::middleware::CsrfToken;
use tidy_feedback::route::create_app;
use tidy_feedback::storage::{AttachmentStore, DEFAULT_MAX_ATTACHMENT_BYTES};

// Mutex to ensure tests that modify env vars don't run in parallel
static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn setup_test_app() -> (axum::Router, NamedTempFile, TempDir) {
    let temp_db = NamedTempFile::new().expect("Failed to create temp file");
    let upload_dir = TempDir::new().expect("Failed to create temp dir");
    let db = init_db(temp_db.path().to_str().unwrap()).expect("Failed to initialize test database");

    let state = AppState {
        db: Arc::new(db),
        attachments: Arc::new(AttachmentStore::new(
            upload_dir.path(),
            DEFAULT_MAX_ATTACHMENT_BYTES,
        )),
        csrf: Arc::new(CsrfToken::generate()),
    };
    (create_app(state), temp_db, upload_dir)
}

/// Helper function to parse response body as JSON
async fn response_json(body: Body) -> Value {
    let bytes = body
        .collect()
        .await
        .expect("Failed to read response body")
        .to_bytes();

    serde_json::from_slice(&bytes).expect("Failed to parse JSON")
}

#[tokio::test]
async fn test_admin_auth_enabled_valid_token() {
    let _guard = ENV_MUTEX.lock().unwrap();
    env::set_var("AUTHORIZATION", "secret_token");

    let (app, _temp_db, _upload_dir) = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/admin/feedback")
                .header("Authorization", "secret_token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    env::remove_var("AUTHORIZATION");
}

#[tokio::test]
async fn test_admin_auth_enabled_invalid_token() {
    let _guard = ENV_MUTEX.lock().unwrap();
    env::set_var("AUTHORIZATION", "secret_token");

    let (app, _temp_db, _upload_dir) = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/admin/feedback")
                .header("Authorization", "wrong_token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let body = response_json(response.into_body()).await;
    assert_eq!(body["error"], "Unauthorized");
    assert_eq!(body["message"], "Invalid or missing authorization header");

    env::remove_var("AUTHORIZATION");
}

#[tokio::test]
async fn test_admin_auth_enabled_no_token() {
    let _guard = ENV_MUTEX.lock().unwrap();
    env::set_var("AUTHORIZATION", "secret_token");

    let (app, _temp_db, _upload_dir) = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/admin/feedback")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    env::remove_var("AUTHORIZATION");
}

#[tokio::test]
async fn test_admin_auth_disabled() {
    let _guard = ENV_MUTEX.lock().unwrap();
    env::remove_var("AUTHORIZATION");

    let (app, _temp_db, _upload_dir) = setup_test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/admin/feedback")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_public_routes_skip_admin_auth() {
    let _guard = ENV_MUTEX.lock().unwrap();
    env::set_var("AUTHORIZATION", "secret_token");

    let (app, _temp_db, _upload_dir) = setup_test_app();

    // The token endpoint stays reachable for visitors
    let response = app
        .oneshot(
            Request::builder()
                .method("GET")
                .uri("/api/feedback/token")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    env::remove_var("AUTHORIZATION");
}
