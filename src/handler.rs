//! HTTP request handlers for the feedback service
//!
//! This module implements the core server-side pipeline:
//! - Accepting feedback submissions (JSON or multipart with attachment)
//! - CSRF token issuance and verification
//! - The pre-filled submission form view
//! - Admin listing, detail, edit, and delete

use axum::{
    extract::{FromRequest, Multipart, Path, Query, Request, State},
    http::header,
    response::IntoResponse,
    Json,
};
use serde_json::{json, Value};

use crate::database::{self, AppState, NewFeedback};
use crate::error::{AppError, AppResult};
use crate::model::{
    normalize_browser_info, AttachmentRef, FormParams, IssueType, ListParams, Severity,
    SubmitRequest, UpdateRequest,
};
use crate::picker::PickerConfig;

/// Upper bound for a JSON submission body. Multipart bodies are bounded by
/// the router's body limit instead.
const JSON_BODY_LIMIT: usize = 1024 * 1024;

/// A file pulled out of a multipart submission, before validation.
struct UploadedFile {
    name: String,
    content_type: Option<String>,
    data: Vec<u8>,
}

/// Accepts a feedback submission
///
/// This handler:
/// 1. Verifies the `X-CSRF-Token` header against the issued token
/// 2. Parses the body (JSON, or multipart when a file rides along)
/// 3. Rejects an absent/empty description with `400`
/// 4. Normalizes browser info, URL (referer fallback), and the enums
/// 5. Stores the attachment, logging and swallowing any failure there
/// 6. Inserts the record with `status = new`
///
/// # Request Body
///
/// ```json
/// {
///   "issue_type": "bug",
///   "severity": "high",
///   "description": "broken layout",
///   "url": "https://example.com/page",
///   "element_selector": "#hero",
///   "browser_info": "{\"userAgent\":\"...\"}"
/// }
/// ```
///
/// # Response
///
/// - **200 OK** - `{"status": "success", "id": 7}`
/// - **400 Bad Request** - description missing or body unreadable
/// - **403 Forbidden** - missing/invalid CSRF token, nothing persisted
/// - **500 Internal Server Error** - generic message; detail stays in the log
pub async fn submit_feedback(
    State(state): State<AppState>,
    request: Request,
) -> AppResult<impl IntoResponse> {
    let headers = request.headers().clone();

    // Security gate first: nothing is persisted without a valid token.
    if !state.csrf.verify(&headers) {
        tracing::warn!("submission rejected: missing or invalid CSRF token");
        return Err(AppError::Security);
    }

    let referer = headers
        .get(header::REFERER)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("");

    let (fields, upload) = if content_type.starts_with("multipart/form-data") {
        parse_multipart(request, &state).await?
    } else {
        parse_json(request).await?
    };

    // Description is the only hard-required field.
    let description = fields
        .description
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Description is required".to_string()))?;

    let browser_info = normalize_browser_info(fields.browser_info);
    let url = fields
        .url
        .filter(|value| !value.is_empty())
        .or(referer)
        .unwrap_or_default();
    let issue_type = fields
        .issue_type
        .as_deref()
        .and_then(IssueType::parse)
        .unwrap_or_default();
    let severity = fields
        .severity
        .as_deref()
        .and_then(Severity::parse)
        .unwrap_or_default();
    let element_selector = fields.element_selector.unwrap_or_default();

    // Attachment failures never block the record: log with full diagnostic
    // detail and continue with attachment = null.
    let attachment = match upload {
        Some(file) => {
            match state
                .attachments
                .store(&file.name, file.content_type.as_deref(), &file.data)
                .await
            {
                Ok(stored) => Some(AttachmentRef {
                    path: stored.path,
                    file_id: stored.file_id,
                }),
                Err(err) => {
                    tracing::error!(
                        name = %file.name,
                        size = file.data.len(),
                        mime = file.content_type.as_deref().unwrap_or("unknown"),
                        error = %err,
                        "failed to store attachment; record will have no attachment"
                    );
                    None
                }
            }
        }
        None => None,
    };

    let record = database::insert_feedback(
        &state.db,
        NewFeedback {
            submitted_by: fields.submitted_by,
            issue_type,
            severity,
            description,
            url,
            element_selector,
            browser_info,
            attachment,
        },
    )?;

    tracing::info!(id = record.id, "Feedback #{} submitted successfully", record.id);

    Ok(Json(json!({
        "status": "success",
        "id": record.id,
    })))
}

/// Reads a JSON submission body.
async fn parse_json(request: Request) -> AppResult<(SubmitRequest, Option<UploadedFile>)> {
    let bytes = axum::body::to_bytes(request.into_body(), JSON_BODY_LIMIT)
        .await
        .map_err(|_| AppError::Validation("Invalid data submitted".to_string()))?;

    if bytes.is_empty() {
        return Err(AppError::Validation("Invalid data submitted".to_string()));
    }

    let fields = serde_json::from_slice::<SubmitRequest>(&bytes)
        .map_err(|_| AppError::Validation("Invalid data submitted".to_string()))?;

    Ok((fields, None))
}

/// Walks a multipart submission, collecting text fields and at most one
/// file under the canonical `attachment` field name.
async fn parse_multipart(
    request: Request,
    state: &AppState,
) -> AppResult<(SubmitRequest, Option<UploadedFile>)> {
    let mut multipart = Multipart::from_request(request, state)
        .await
        .map_err(|_| AppError::Validation("Invalid data submitted".to_string()))?;

    let mut fields = SubmitRequest::default();
    let mut upload = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            // A torn body is an upload-level problem; keep the fields that
            // already arrived instead of failing the whole submission.
            Err(err) => {
                tracing::warn!(error = %err, "malformed multipart body; keeping fields received so far");
                break;
            }
        };

        let name = field.name().unwrap_or("").to_string();

        if name == "attachment" {
            let file_name = field
                .file_name()
                .map(|value| value.to_string())
                .unwrap_or_else(|| "attachment".to_string());
            let content_type = field.content_type().map(|value| value.to_string());

            match field.bytes().await {
                Ok(data) if !data.is_empty() => {
                    upload = Some(UploadedFile {
                        name: file_name,
                        content_type,
                        data: data.to_vec(),
                    });
                }
                // A file input submitted with no selection posts an empty part.
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(name = %file_name, error = %err, "failed to read attachment field");
                }
            }
            continue;
        }

        let text = match field.text().await {
            Ok(text) => text,
            Err(err) => {
                tracing::warn!(field = %name, error = %err, "failed to read form field");
                continue;
            }
        };

        match name.as_str() {
            "issue_type" => fields.issue_type = Some(text),
            "severity" => fields.severity = Some(text),
            "description" => fields.description = Some(text),
            "url" => fields.url = Some(text),
            "element_selector" => fields.element_selector = Some(text),
            "browser_info" => fields.browser_info = Some(Value::String(text)),
            "submitted_by" => fields.submitted_by = Some(text),
            _ => {}
        }
    }

    Ok((fields, upload))
}

/// Hands out the anti-forgery token as plain text
///
/// The submission client fetches this once and caches it for the session.
pub async fn issue_csrf_token(State(state): State<AppState>) -> String {
    state.csrf.as_str().to_string()
}

/// View-model for the submission form, pre-filled with the picker context
///
/// The picker redirects here after an element is committed; the selector and
/// page URL arrive as query parameters and come back as read-only fields.
pub async fn feedback_form(Query(params): Query<FormParams>) -> impl IntoResponse {
    Json(json!({
        "element_selector": params.element_selector.unwrap_or_default(),
        "url": params.url.unwrap_or_default(),
        "issue_types": ["bug", "enhancement", "question", "other"],
        "severities": ["critical", "high", "normal", "low"],
        "defaults": { "issue_type": "other", "severity": "normal" },
        "widget": PickerConfig::default(),
    }))
}

/// Lists feedback records for the admin inbox, newest first
///
/// # Query Parameters
///
/// - `status` (optional) - filter by triage status
/// - `page` (optional) - page number, starts from 1 (default: 1)
/// - `limit` (optional) - items per page, max 100 (default: 10)
///
/// # Response
///
/// ```json
/// {
///   "page": 1,
///   "limit": 10,
///   "total_fetched": 3,
///   "data": [...]
/// }
/// ```
pub async fn list_feedback(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> AppResult<impl IntoResponse> {
    let page = params.page.unwrap_or(1).max(1);
    let limit = params.limit.unwrap_or(10).min(100);

    let records = database::list_feedback(&state.db, params.status, page, limit)?;

    Ok(Json(json!({
        "page": page,
        "limit": limit,
        "total_fetched": records.len(),
        "data": records,
    })))
}

/// Returns one feedback record in full.
pub async fn get_feedback(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> AppResult<impl IntoResponse> {
    match database::get_feedback(&state.db, id)? {
        Some(record) => Ok(Json(record)),
        None => Err(AppError::NotFound(format!("feedback #{}", id))),
    }
}

/// Applies an admin edit (status, comments) and returns the updated record.
pub async fn update_feedback(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(changes): Json<UpdateRequest>,
) -> AppResult<impl IntoResponse> {
    match database::update_feedback(&state.db, id, &changes)? {
        Some(record) => {
            tracing::info!(id, "feedback updated by administrator");
            Ok(Json(record))
        }
        None => Err(AppError::NotFound(format!("feedback #{}", id))),
    }
}

/// Deletes a feedback record
///
/// Releases the attachment's usage registration together with the record and
/// then removes the stored file itself; a failure to remove the file is
/// logged but does not fail the delete.
pub async fn delete_feedback(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> AppResult<impl IntoResponse> {
    let removed = database::delete_feedback(&state.db, id)?
        .ok_or_else(|| AppError::NotFound(format!("feedback #{}", id)))?;

    if let Some(attachment) = &removed.attachment {
        if let Err(err) = state.attachments.remove(&attachment.path).await {
            tracing::warn!(path = %attachment.path, error = %err, "could not remove stored attachment file");
        }
    }

    tracing::info!(id, "feedback deleted by administrator");

    Ok(Json(json!({
        "message": "Feedback deleted successfully",
        "deleted_id": id,
    })))
}
