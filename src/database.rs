//! Database initialization, table definitions, and the feedback record store
//!
//! This module handles the setup of the embedded redb database and implements
//! the record-store operations. Records are stored JSON-serialized; the
//! sequence table hands out monotonic ids that are never reused, and the
//! file-usage table links stored attachment files to the record that owns
//! them so orphan-file sweeps leave them alone.

use std::sync::Arc;

use chrono::Utc;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use crate::middleware::CsrfToken;
use crate::model::{AttachmentRef, FeedbackRecord, IssueType, Severity, Status, UpdateRequest};
use crate::storage::AttachmentStore;

/// Main table for feedback records
///
/// Key: record id
/// Value: JSON-serialized FeedbackRecord as string
///
/// Example:
/// - Key: 42
/// - Value: '{"id":42,"uuid":"...","issue_type":"bug",...}'
pub const TABLE_FEEDBACK: TableDefinition<u64, &str> = TableDefinition::new("feedback_v1");

/// Sequence table for id assignment
///
/// Key: sequence name ("feedback")
/// Value: the last id handed out
///
/// The counter only ever moves forward, so ids stay unique across deletes.
pub const TABLE_SEQUENCE: TableDefinition<&str, u64> = TableDefinition::new("sequence_v1");

/// Usage registrations for stored attachment files
///
/// Key: stored file path
/// Value: id of the owning feedback record
///
/// Written in the same transaction as the owning record and released when
/// the record is deleted.
pub const TABLE_FILE_USAGE: TableDefinition<&str, u64> = TableDefinition::new("file_usage_v1");

const FEEDBACK_SEQUENCE: &str = "feedback";

/// Errors from the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Open(#[from] redb::DatabaseError),

    #[error(transparent)]
    Transaction(#[from] redb::TransactionError),

    #[error(transparent)]
    Table(#[from] redb::TableError),

    #[error(transparent)]
    Storage(#[from] redb::StorageError),

    #[error(transparent)]
    Commit(#[from] redb::CommitError),

    #[error("record encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Application state shared across all request handlers
///
/// Wraps the database, the attachment store, and the process-wide CSRF token
/// in Arcs for thread-safe sharing across async handlers.
#[derive(Clone)]
pub struct AppState {
    /// Thread-safe reference to the embedded database
    pub db: Arc<Database>,

    /// Managed attachment directory and upload policy
    pub attachments: Arc<AttachmentStore>,

    /// Token issued to clients and checked on every submission
    pub csrf: Arc<CsrfToken>,
}

/// Initializes the embedded database and creates required tables
///
/// Creates or opens the database file at the specified path, opens all three
/// tables so later read transactions never hit a missing table, and commits.
///
/// # Arguments
///
/// * `db_path` - File path where the database should be stored (e.g., "feedback.db")
pub fn init_db(db_path: &str) -> Result<Database, StoreError> {
    let db = Database::create(db_path)?;

    let write_txn = db.begin_write()?;
    {
        write_txn.open_table(TABLE_FEEDBACK)?;
        write_txn.open_table(TABLE_SEQUENCE)?;
        write_txn.open_table(TABLE_FILE_USAGE)?;
    }
    write_txn.commit()?;

    Ok(db)
}

/// Normalized intake fields ready for persistence. Built by the intake
/// endpoint after validation, defaulting, and attachment processing.
#[derive(Debug)]
pub struct NewFeedback {
    pub submitted_by: Option<String>,
    pub issue_type: IssueType,
    pub severity: Severity,
    pub description: String,
    pub url: String,
    pub element_selector: String,
    pub browser_info: Value,
    pub attachment: Option<AttachmentRef>,
}

/// Inserts a new feedback record and returns it with its assigned id
///
/// One write transaction covers the id assignment, the record insert, and
/// the file-usage registration, so either everything lands or nothing does.
/// The record starts with `status = new` and equal created/updated stamps.
pub fn insert_feedback(db: &Database, new: NewFeedback) -> Result<FeedbackRecord, StoreError> {
    let now = Utc::now();

    let write_txn = db.begin_write()?;
    let record = {
        // Claim the next id. The counter never goes backwards, so deleted
        // ids are not handed out again.
        let mut sequence = write_txn.open_table(TABLE_SEQUENCE)?;
        let next_id = sequence
            .get(FEEDBACK_SEQUENCE)?
            .map(|guard| guard.value())
            .unwrap_or(0)
            + 1;
        sequence.insert(FEEDBACK_SEQUENCE, next_id)?;
        drop(sequence);

        let record = FeedbackRecord {
            id: next_id,
            uuid: Uuid::new_v4(),
            submitted_by: new.submitted_by,
            created_at: now,
            updated_at: now,
            issue_type: new.issue_type,
            severity: new.severity,
            description: new.description,
            url: new.url,
            element_selector: new.element_selector,
            browser_info: new.browser_info,
            status: Status::New,
            attachment: new.attachment,
            admin_comments: None,
        };

        let record_json = serde_json::to_string(&record)?;
        let mut table = write_txn.open_table(TABLE_FEEDBACK)?;
        table.insert(next_id, record_json.as_str())?;
        drop(table);

        // Register file usage so the host's orphan-file sweep keeps the
        // attachment alive as long as the record exists.
        if let Some(attachment) = &record.attachment {
            let mut usage = write_txn.open_table(TABLE_FILE_USAGE)?;
            usage.insert(attachment.path.as_str(), next_id)?;
        }

        record
    };
    write_txn.commit()?;

    Ok(record)
}

/// Fetches one record by id.
pub fn get_feedback(db: &Database, id: u64) -> Result<Option<FeedbackRecord>, StoreError> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(TABLE_FEEDBACK)?;

    match table.get(id)? {
        Some(guard) => Ok(Some(serde_json::from_str(guard.value())?)),
        None => Ok(None),
    }
}

/// Applies an admin edit (status and/or comments) and bumps `updated_at`
///
/// Returns the updated record, or `None` when the id does not exist.
pub fn update_feedback(
    db: &Database,
    id: u64,
    changes: &UpdateRequest,
) -> Result<Option<FeedbackRecord>, StoreError> {
    let write_txn = db.begin_write()?;
    let updated = {
        let mut table = write_txn.open_table(TABLE_FEEDBACK)?;

        let existing = match table.get(id)? {
            Some(guard) => Some(serde_json::from_str::<FeedbackRecord>(guard.value())?),
            None => None,
        };

        match existing {
            None => None,
            Some(mut record) => {
                if let Some(status) = changes.status {
                    record.status = status;
                }
                if let Some(comments) = &changes.admin_comments {
                    record.admin_comments = Some(comments.clone());
                }
                record.updated_at = Utc::now();

                let record_json = serde_json::to_string(&record)?;
                table.insert(id, record_json.as_str())?;
                Some(record)
            }
        }
    };
    write_txn.commit()?;

    Ok(updated)
}

/// Deletes one record and releases its file-usage registration
///
/// Returns the removed record so the caller can clean up the stored file.
/// Returns `None` when the id does not exist.
pub fn delete_feedback(db: &Database, id: u64) -> Result<Option<FeedbackRecord>, StoreError> {
    let write_txn = db.begin_write()?;
    let removed = {
        let mut table = write_txn.open_table(TABLE_FEEDBACK)?;

        let existing = match table.remove(id)? {
            Some(guard) => Some(serde_json::from_str::<FeedbackRecord>(guard.value())?),
            None => None,
        };

        if let Some(record) = &existing {
            if let Some(attachment) = &record.attachment {
                let mut usage = write_txn.open_table(TABLE_FILE_USAGE)?;
                usage.remove(attachment.path.as_str())?;
            }
        }

        existing
    };
    write_txn.commit()?;

    Ok(removed)
}

/// Lists records newest-first with an optional status filter
///
/// Pagination is offset-based; the caller clamps page and limit. Records
/// that fail to decode are skipped rather than failing the whole listing.
pub fn list_feedback(
    db: &Database,
    status: Option<Status>,
    page: usize,
    limit: usize,
) -> Result<Vec<FeedbackRecord>, StoreError> {
    let offset = (page - 1) * limit;

    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(TABLE_FEEDBACK)?;

    // Ids are assigned in submission order, so reverse iteration gives the
    // triage inbox its newest-first ordering.
    let records = table
        .iter()?
        .rev()
        .filter_map(|res| {
            res.ok()
                .and_then(|(_, value)| serde_json::from_str::<FeedbackRecord>(value.value()).ok())
        })
        .filter(|record| status.map(|s| record.status == s).unwrap_or(true))
        .skip(offset)
        .take(limit)
        .collect();

    Ok(records)
}

/// True when a usage registration exists for the given stored file path.
pub fn file_usage_exists(db: &Database, path: &str) -> Result<bool, StoreError> {
    let read_txn = db.begin_read()?;
    let table = read_txn.open_table(TABLE_FILE_USAGE)?;
    Ok(table.get(path)?.is_some())
}
