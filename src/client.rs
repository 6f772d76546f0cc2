//! Submission client for the feedback widget
//!
//! Wraps the intake HTTP API: CSRF token fetch-and-cache, client-side
//! pre-validation, and the actual POST (multipart when a file is attached,
//! JSON otherwise). [`FeedbackForm`] models the form UI state around it:
//! at most one submission in flight, inline errors with the entered values
//! preserved, close-and-clear on success.

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::middleware::CSRF_HEADER;
use crate::model::{IssueType, Severity};

/// Client-side upload cap, matching the server default (2 MiB).
pub const MAX_ATTACHMENT_BYTES: u64 = 2 * 1024 * 1024;

/// Extensions the form accepts; images are additionally allowed by MIME.
const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "pdf", "doc", "docx", "txt"];

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Field values of a submission as the visitor entered them.
#[derive(Debug, Clone, Default)]
pub struct FeedbackDraft {
    pub issue_type: IssueType,
    pub severity: Severity,
    pub description: String,
    pub url: String,
    pub element_selector: String,
    /// Pre-serialized browser-info JSON from
    /// [`collect_browser_info`](crate::context::collect_browser_info).
    pub browser_info: String,
}

/// A file the visitor picked in the form, before validation.
#[derive(Debug, Clone)]
pub struct AttachmentUpload {
    pub filename: String,
    pub content_type: Option<String>,
    pub data: Vec<u8>,
}

/// Errors from the submission client.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// Failed client-side pre-validation; no network request was made.
    #[error("{0}")]
    Validation(String),

    /// The HTTP request itself failed (network, timeout, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a non-2xx status.
    #[error("submission rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
}

#[derive(Debug, Deserialize)]
struct SubmitOk {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct SubmitErr {
    message: Option<String>,
}

/// Validates a picked file before any network traffic happens.
pub fn validate_attachment(upload: &AttachmentUpload) -> Result<(), SubmissionError> {
    if upload.data.len() as u64 > MAX_ATTACHMENT_BYTES {
        return Err(SubmissionError::Validation(
            "File is too large. The maximum allowed size is 2 MB.".to_string(),
        ));
    }

    let image_mime = upload
        .content_type
        .as_deref()
        .map(|ct| ct.starts_with("image/"))
        .unwrap_or(false);
    let allowed_extension = Path::new(&upload.filename)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false);

    if image_mime || allowed_extension {
        Ok(())
    } else {
        Err(SubmissionError::Validation(
            "This file type is not allowed. Please attach an image, PDF, document, or text file."
                .to_string(),
        ))
    }
}

/// HTTP client for the feedback intake API
///
/// One instance per widget session. The CSRF token is fetched lazily on the
/// first submission and cached for the lifetime of the client; fetching it
/// is a blocking prerequisite, a submission never goes out without one.
pub struct FeedbackClient {
    http: reqwest::Client,
    base_url: String,
    token: OnceCell<String>,
}

impl FeedbackClient {
    /// Creates a client for the service at `base_url` (no trailing slash).
    pub fn new(base_url: impl Into<String>) -> Result<Self, SubmissionError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            token: OnceCell::new(),
        })
    }

    /// Returns the cached CSRF token, fetching it on first use.
    async fn csrf_token(&self) -> Result<&str, SubmissionError> {
        self.token
            .get_or_try_init(|| async {
                let response = self
                    .http
                    .get(format!("{}/api/feedback/token", self.base_url))
                    .send()
                    .await?
                    .error_for_status()?;
                Ok::<String, SubmissionError>(response.text().await?)
            })
            .await
            .map(|token| token.as_str())
    }

    /// Submits a feedback draft, with an optional attachment
    ///
    /// Pre-validates locally (description present, file within policy), then
    /// POSTs with the `X-CSRF-Token` header. Returns the server-assigned
    /// record id on success; a non-2xx answer becomes
    /// [`SubmissionError::Rejected`] carrying the server's message so the
    /// form can show it inline.
    pub async fn submit(
        &self,
        draft: &FeedbackDraft,
        attachment: Option<&AttachmentUpload>,
    ) -> Result<u64, SubmissionError> {
        if draft.description.trim().is_empty() {
            return Err(SubmissionError::Validation(
                "Please enter a description before submitting.".to_string(),
            ));
        }
        if let Some(upload) = attachment {
            validate_attachment(upload)?;
        }

        let token = self.csrf_token().await?.to_string();

        let request = self
            .http
            .post(format!("{}/api/feedback", self.base_url))
            .header(CSRF_HEADER, token);

        let request = match attachment {
            Some(upload) => {
                let mut part = Part::bytes(upload.data.clone()).file_name(upload.filename.clone());
                if let Some(content_type) = &upload.content_type {
                    part = part.mime_str(content_type)?;
                }

                let form = Form::new()
                    .text("issue_type", draft.issue_type.as_str())
                    .text("severity", draft.severity.as_str())
                    .text("description", draft.description.clone())
                    .text("url", draft.url.clone())
                    .text("element_selector", draft.element_selector.clone())
                    .text("browser_info", draft.browser_info.clone())
                    .part("attachment", part);

                request.multipart(form)
            }
            None => request.json(&serde_json::json!({
                "issue_type": draft.issue_type,
                "severity": draft.severity,
                "description": draft.description,
                "url": draft.url,
                "element_selector": draft.element_selector,
                "browser_info": draft.browser_info,
            })),
        };

        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            let ok: SubmitOk = response.json().await?;
            Ok(ok.id)
        } else {
            let message = response
                .json::<SubmitErr>()
                .await
                .ok()
                .and_then(|err| err.message)
                .unwrap_or_else(|| "Submission failed".to_string());
            Err(SubmissionError::Rejected {
                status: status.as_u16(),
                message,
            })
        }
    }
}

/// Form UI state around a submission
///
/// The embedding surface drives this: attach a file, begin a submit, and
/// report the outcome. The rules live here so every embedder gets the same
/// behavior: the submit control is disabled while a request is in flight,
/// failures keep the form open with the entered values, success closes and
/// clears it.
#[derive(Debug, Default)]
pub struct FeedbackForm {
    pub draft: FeedbackDraft,
    pub attachment: Option<AttachmentUpload>,
    /// Inline error shown next to the submit control, if any.
    pub error: Option<String>,
    pub in_flight: bool,
    pub open: bool,
}

impl FeedbackForm {
    /// Opens the form pre-filled with the picker context.
    pub fn open_with_context(element_selector: String, url: String) -> Self {
        Self {
            draft: FeedbackDraft {
                element_selector,
                url,
                ..Default::default()
            },
            open: true,
            ..Default::default()
        }
    }

    /// Validates and attaches a picked file. On violation the file input is
    /// cleared and the message shown inline; returns whether it was accepted.
    pub fn attach_file(&mut self, upload: AttachmentUpload) -> bool {
        match validate_attachment(&upload) {
            Ok(()) => {
                self.attachment = Some(upload);
                self.error = None;
                true
            }
            Err(err) => {
                self.attachment = None;
                self.error = Some(err.to_string());
                false
            }
        }
    }

    /// Marks a submission as started. Returns `false` without touching
    /// anything when one is already in flight, or when the description is
    /// still empty (blocked before any network call).
    pub fn begin_submit(&mut self) -> bool {
        if self.in_flight {
            return false;
        }
        if self.draft.description.trim().is_empty() {
            self.error = Some("Please enter a description before submitting.".to_string());
            return false;
        }
        self.error = None;
        self.in_flight = true;
        true
    }

    /// Success path: the form closes and its state clears. The embedder
    /// shows the transient confirmation toast.
    pub fn finish_success(&mut self) {
        *self = Self::default();
    }

    /// Failure path: inline message, entered values preserved, submit
    /// control re-enabled for a retry.
    pub fn finish_failure(&mut self, message: String) {
        self.in_flight = false;
        self.error = Some(message);
    }
}
