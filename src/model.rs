//! Data models for the feedback service
//!
//! This module defines all the data structures used throughout the application,
//! including request/response payloads, the persisted feedback record, and the
//! browser-info normalization applied at intake time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// Category of a feedback submission.
///
/// Unknown inbound values are normalized to [`IssueType::Other`] rather than
/// rejected, so a record always carries one of the four known values.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    Bug,
    Enhancement,
    Question,
    #[default]
    Other,
}

impl IssueType {
    /// Parses a wire value ("bug", "enhancement", ...). Returns `None` for
    /// anything outside the known set; callers fall back to the default.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "bug" => Some(Self::Bug),
            "enhancement" => Some(Self::Enhancement),
            "question" => Some(Self::Question),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bug => "bug",
            Self::Enhancement => "enhancement",
            Self::Question => "question",
            Self::Other => "other",
        }
    }
}

/// Severity of a feedback submission. Defaults to `normal` when absent or
/// unrecognized.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    #[default]
    Normal,
    Low,
}

impl Severity {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "critical" => Some(Self::Critical),
            "high" => Some(Self::High),
            "normal" => Some(Self::Normal),
            "low" => Some(Self::Low),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::High => "high",
            Self::Normal => "normal",
            Self::Low => "low",
        }
    }
}

/// Triage status of a stored record. Every record starts as `new`; only
/// administrators move it through the remaining values. Transitions are
/// free-form.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    New,
    InProgress,
    Resolved,
    Closed,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Closed => "closed",
        }
    }
}

/// Reference to a stored attachment file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct AttachmentRef {
    /// Path of the stored file inside the managed attachment directory.
    pub path: String,

    /// Identifier of the stored file, used for the usage registration.
    pub file_id: Uuid,
}

/// Represents a feedback record stored in the database
///
/// This structure contains everything captured for one submission:
/// - Server-assigned monotonic id and immutable uuid
/// - The submission fields (issue type, severity, description)
/// - Page context (source URL, CSS selector of the targeted element)
/// - A browser-info JSON snapshot for diagnostics
/// - Triage state (status, admin comments) and the optional attachment
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FeedbackRecord {
    /// Monotonic identifier assigned at insert time. Never reused.
    pub id: u64,

    /// Globally-unique identifier assigned at creation, immutable.
    pub uuid: Uuid,

    /// Identifier of the submitting user, `None` for anonymous submissions.
    pub submitted_by: Option<String>,

    /// Timestamp when this record was created. Immutable.
    pub created_at: DateTime<Utc>,

    /// Timestamp of the last mutation. Bumped on every admin edit.
    pub updated_at: DateTime<Utc>,

    pub issue_type: IssueType,

    pub severity: Severity,

    /// Free-text description of the issue. Never empty at persistence time.
    pub description: String,

    /// URL of the page the feedback concerns. Falls back to the request
    /// referer, or the empty string, when the submission omits it.
    pub url: String,

    /// CSS selector identifying the targeted element. Empty when the
    /// feedback is not element-scoped.
    pub element_selector: String,

    /// Client environment snapshot. Always a valid JSON value: invalid
    /// inbound text is wrapped as `{"raw_data": …}` and missing input
    /// becomes `{}`.
    pub browser_info: Value,

    pub status: Status,

    /// Stored attachment reference, `None` when no file was uploaded or the
    /// upload failed.
    pub attachment: Option<AttachmentRef>,

    /// Administrator-only triage notes.
    #[serde(default)]
    pub admin_comments: Option<String>,
}

/// JSON request payload for submitting feedback
///
/// Every field is optional at the wire level; the intake endpoint applies
/// the documented defaults and rejects only a missing/empty description.
///
/// # Example
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
#[derive(Deserialize, Debug, Default)]
pub struct SubmitRequest {
    #[serde(default)]
    pub issue_type: Option<String>,

    #[serde(default)]
    pub severity: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub url: Option<String>,

    #[serde(default)]
    pub element_selector: Option<String>,

    /// Browser-info payload. Accepted as a pre-serialized JSON string or as
    /// an inline object; normalized either way.
    #[serde(default)]
    pub browser_info: Option<Value>,

    #[serde(default)]
    pub submitted_by: Option<String>,
}

/// Query parameters for the pre-filled submission form view
///
/// The picker redirects here with the generated selector and the page URL so
/// the form can show them as read-only context fields.
#[derive(Deserialize, Debug, Default)]
pub struct FormParams {
    pub element_selector: Option<String>,
    pub url: Option<String>,
}

/// Query parameters for the admin feedback listing
///
/// # Example
/// Query string: `?status=new&page=2&limit=20`
#[derive(Deserialize)]
pub struct ListParams {
    /// Optional status filter.
    pub status: Option<Status>,

    /// Page number for pagination (starts from 1). Defaults to 1.
    pub page: Option<usize>,

    /// Number of items per page. Defaults to 10, maximum is 100.
    pub limit: Option<usize>,
}

/// Admin edit payload. Only the triage fields are mutable after intake.
#[derive(Deserialize, Debug, Default)]
pub struct UpdateRequest {
    #[serde(default)]
    pub status: Option<Status>,

    #[serde(default)]
    pub admin_comments: Option<String>,
}

/// Normalizes an inbound browser-info payload into a JSON value that is
/// always safe to store.
///
/// Rules:
/// - missing or empty input becomes `{}`
/// - a string that parses as a JSON object is stored as that object
/// - any other string is wrapped as `{"raw_data": <original>}`
/// - an inline JSON object passes through; other JSON shapes are wrapped
///   by their serialized text
pub fn normalize_browser_info(raw: Option<Value>) -> Value {
    match raw {
        None => json!({}),
        Some(Value::String(text)) => {
            if text.trim().is_empty() {
                return json!({});
            }
            match serde_json::from_str::<Value>(&text) {
                Ok(parsed @ Value::Object(_)) => parsed,
                _ => json!({ "raw_data": text }),
            }
        }
        Some(obj @ Value::Object(_)) => obj,
        Some(Value::Null) => json!({}),
        Some(other) => json!({ "raw_data": other.to_string() }),
    }
}
