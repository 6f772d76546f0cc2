//! Attachment processing and managed file storage
//!
//! Uploaded files land in a managed directory with collision-safe names.
//! Every failure in here is reported as a typed [`UploadError`] and the
//! intake endpoint continues without the attachment; nothing in this module
//! is allowed to abort a submission.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::Utc;
use thiserror::Error;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Default upload size limit (2 MiB). Overridable via `MAX_ATTACHMENT_SIZE`.
pub const DEFAULT_MAX_ATTACHMENT_BYTES: u64 = 2 * 1024 * 1024;

/// Extensions accepted by default, mirroring the submission form's allow-list.
const DEFAULT_ALLOWED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "gif", "pdf", "doc", "docx", "xls", "xlsx", "txt", "csv",
];

/// Failure modes of the attachment processor. These are logged and swallowed
/// by the caller; the submission itself still goes through.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("uploaded file is empty")]
    Empty,

    #[error("file is {size} bytes which exceeds the {max} byte limit")]
    TooLarge { size: u64, max: u64 },

    #[error("file type is not allowed: {name}")]
    DisallowedType { name: String },

    #[error("could not allocate a unique filename for {name}")]
    NameExhausted { name: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A successfully stored file.
#[derive(Debug, Clone)]
pub struct StoredAttachment {
    /// Full path of the file inside the managed directory.
    pub path: String,

    /// Identifier under which the file is registered for usage tracking.
    pub file_id: Uuid,
}

/// Managed attachment directory with validation policy.
pub struct AttachmentStore {
    dir: PathBuf,
    max_bytes: u64,
    allowed_extensions: Vec<String>,
}

impl AttachmentStore {
    pub fn new(dir: impl Into<PathBuf>, max_bytes: u64) -> Self {
        Self {
            dir: dir.into(),
            max_bytes,
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Validates and stores one uploaded file.
    ///
    /// Steps:
    /// 1. Ensure the managed directory exists (idempotent, safe to race).
    /// 2. Reject empty, oversized, or disallowed-type uploads.
    /// 3. Sanitize the original filename and prefix it with the unix
    ///    timestamp: `<ts>_<name>`.
    /// 4. Create the file with create-new semantics; a name collision gets a
    ///    `_1`, `_2`, ... suffix before the extension and a retry. No locks
    ///    are taken; uniqueness is decided at write time.
    pub async fn store(
        &self,
        original_name: &str,
        content_type: Option<&str>,
        data: &[u8],
    ) -> Result<StoredAttachment, UploadError> {
        // "Already exists" is success here, including when two submissions
        // race the creation.
        tokio::fs::create_dir_all(&self.dir).await?;

        if data.is_empty() {
            return Err(UploadError::Empty);
        }
        let size = data.len() as u64;
        if size > self.max_bytes {
            return Err(UploadError::TooLarge {
                size,
                max: self.max_bytes,
            });
        }
        if !self.is_allowed(original_name, content_type) {
            return Err(UploadError::DisallowedType {
                name: original_name.to_string(),
            });
        }

        let base_name = format!(
            "{}_{}",
            Utc::now().timestamp(),
            sanitize_filename(original_name)
        );

        for attempt in 0..1000 {
            let candidate = if attempt == 0 {
                base_name.clone()
            } else {
                suffixed_name(&base_name, attempt)
            };
            let path = self.dir.join(&candidate);

            match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    file.write_all(data).await?;
                    file.flush().await?;
                    return Ok(StoredAttachment {
                        path: path.to_string_lossy().into_owned(),
                        file_id: Uuid::new_v4(),
                    });
                }
                // Name taken, try the next suffix.
                Err(err) if err.kind() == ErrorKind::AlreadyExists => continue,
                Err(err) => return Err(UploadError::Io(err)),
            }
        }

        Err(UploadError::NameExhausted {
            name: original_name.to_string(),
        })
    }

    /// Removes a stored file. Used when the owning record is deleted.
    pub async fn remove(&self, path: &str) -> std::io::Result<()> {
        tokio::fs::remove_file(path).await
    }

    fn is_allowed(&self, name: &str, content_type: Option<&str>) -> bool {
        if content_type
            .map(|ct| ct.starts_with("image/"))
            .unwrap_or(false)
        {
            return true;
        }
        extension_of(name)
            .map(|ext| self.allowed_extensions.iter().any(|a| a == &ext))
            .unwrap_or(false)
    }
}

/// Strips everything outside `[A-Za-z0-9._-]` from a filename. An empty
/// result falls back to `attachment` so the stored name is never bare.
fn sanitize_filename(name: &str) -> String {
    let sanitized: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    if sanitized.trim_matches('.').is_empty() {
        "attachment".to_string()
    } else {
        sanitized
    }
}

fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
}

/// Inserts `_{n}` before the extension: `17_shot.png` -> `17_shot_1.png`.
fn suffixed_name(base: &str, n: u32) -> String {
    match base.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}_{}.{}", stem, n, ext),
        _ => format!("{}_{}", base, n),
    }
}
