//! Submission-client tests against a live in-process server
//!
//! The reqwest-based client cannot be driven through `oneshot`, so these
//! tests bind an ephemeral listener and run the real server in a task.

use serde_json::Value;
use std::sync::Arc;
use tempfile::{NamedTempFile, TempDir};

use tidy_feedback::client::{AttachmentUpload, FeedbackClient, FeedbackDraft, SubmissionError};
use tidy_feedback::database::{init_db, AppState};
use tidy_feedback::middleware::CsrfToken;
use tidy_feedback::model::{IssueType, Severity};
use tidy_feedback::route::create_app;
use tidy_feedback::storage::{AttachmentStore, DEFAULT_MAX_ATTACHMENT_BYTES};

/// Boots the full service on an ephemeral port and returns its base URL
/// plus the temp guards for the scratch storage.
async fn spawn_server() -> (String, NamedTempFile, TempDir) {
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
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test listener");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (format!("http://{}", addr), temp_db, upload_dir)
}

async fn fetch_record(base_url: &str, id: u64) -> Value {
    reqwest::get(format!("{}/api/admin/feedback/{}", base_url, id))
        .await
        .expect("admin request failed")
        .json()
        .await
        .expect("admin response was not JSON")
}

fn draft(description: &str) -> FeedbackDraft {
    FeedbackDraft {
        issue_type: IssueType::Bug,
        severity: Severity::High,
        description: description.to_string(),
        url: "https://example.com/page".to_string(),
        element_selector: "#hero".to_string(),
        browser_info: "{\"userAgent\":\"integration test\"}".to_string(),
    }
}

#[tokio::test]
async fn test_client_submits_without_attachment() {
    let (base_url, _temp_db, _upload_dir) = spawn_server().await;
    let client = FeedbackClient::new(base_url.clone()).expect("client should build");

    let id = client
        .submit(&draft("broken layout"), None)
        .await
        .expect("submission should succeed");
    assert_eq!(id, 1);

    let record = fetch_record(&base_url, id).await;
    assert_eq!(record["status"], "new");
    assert_eq!(record["issue_type"], "bug");
    assert_eq!(record["severity"], "high");
    assert_eq!(record["element_selector"], "#hero");
    assert_eq!(record["attachment"], Value::Null);
    assert_eq!(
        record["browser_info"],
        serde_json::json!({ "userAgent": "integration test" })
    );
}

#[tokio::test]
async fn test_client_submits_with_attachment() {
    let (base_url, _temp_db, upload_dir) = spawn_server().await;
    let client = FeedbackClient::new(base_url.clone()).expect("client should build");

    let upload = AttachmentUpload {
        filename: "screenshot.png".to_string(),
        content_type: Some("image/png".to_string()),
        data: vec![0x89u8; 512 * 1024],
    };

    let id = client
        .submit(&draft("see attached screenshot"), Some(&upload))
        .await
        .expect("submission should succeed");

    let record = fetch_record(&base_url, id).await;
    assert!(record["attachment"].is_object());

    let stored: Vec<_> = std::fs::read_dir(upload_dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(stored.len(), 1);
    assert!(stored[0].ends_with("_screenshot.png"));
}

#[tokio::test]
async fn test_client_blocks_invalid_uploads_locally() {
    let (base_url, _temp_db, upload_dir) = spawn_server().await;
    let client = FeedbackClient::new(base_url.clone()).expect("client should build");

    // Too large: rejected before any request goes out
    let too_big = AttachmentUpload {
        filename: "huge.png".to_string(),
        content_type: Some("image/png".to_string()),
        data: vec![0u8; 3 * 1024 * 1024],
    };
    let err = client
        .submit(&draft("with oversized file"), Some(&too_big))
        .await
        .expect_err("oversized upload must fail validation");
    assert!(matches!(err, SubmissionError::Validation(_)));

    // Disallowed type: same story
    let executable = AttachmentUpload {
        filename: "tool.exe".to_string(),
        content_type: Some("application/octet-stream".to_string()),
        data: vec![0u8; 1024],
    };
    let err = client
        .submit(&draft("with executable"), Some(&executable))
        .await
        .expect_err("executable upload must fail validation");
    assert!(matches!(err, SubmissionError::Validation(_)));

    // Empty description: blocked without a network call
    let err = client
        .submit(&draft("   "), None)
        .await
        .expect_err("empty description must fail validation");
    assert!(matches!(err, SubmissionError::Validation(_)));

    // Nothing was persisted or stored
    let listing: Value = reqwest::get(format!("{}/api/admin/feedback", base_url))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing["total_fetched"], 0);
    assert_eq!(std::fs::read_dir(upload_dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_client_reuses_cached_token() {
    let (base_url, _temp_db, _upload_dir) = spawn_server().await;
    let client = FeedbackClient::new(base_url.clone()).expect("client should build");

    // Both submissions ride on the same cached token
    let first = client.submit(&draft("first"), None).await.unwrap();
    let second = client.submit(&draft("second"), None).await.unwrap();
    assert_eq!(first, 1);
    assert_eq!(second, 2);
}
