use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::io::Cursor;
use tokio::io::{AsyncRead, AsyncSeek};

/// Upload payload. Seeking is required so the validator can measure the
/// content and sniff its header without buffering it.
pub trait UploadContent: AsyncRead + AsyncSeek + Send + Unpin {}

impl<T> UploadContent for T where T: AsyncRead + AsyncSeek + Send + Unpin {}

/// Readable handle returned by downloads. The caller owns it and closes it by
/// dropping it.
pub type ContentReader = Box<dyn AsyncRead + Send + Unpin>;

pub type CustomMetadata = HashMap<String, serde_json::Value>;

pub struct UploadRequest {
    pub content: Box<dyn UploadContent>,
    pub file_name: String,
    pub destination_path: String,
    pub overwrite: bool,
    pub max_file_size: Option<u64>,
    pub allowed_extensions: Vec<String>,
    pub metadata: CustomMetadata,
}

impl UploadRequest {
    pub fn new(
        content: impl UploadContent + 'static,
        file_name: impl Into<String>,
        destination_path: impl Into<String>,
    ) -> Self {
        Self {
            content: Box::new(content),
            file_name: file_name.into(),
            destination_path: destination_path.into(),
            overwrite: false,
            max_file_size: None,
            allowed_extensions: Vec::new(),
            metadata: CustomMetadata::new(),
        }
    }

    pub fn from_bytes(
        data: impl Into<Vec<u8>>,
        file_name: impl Into<String>,
        destination_path: impl Into<String>,
    ) -> Self {
        Self::new(Cursor::new(data.into()), file_name, destination_path)
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_max_file_size(mut self, max_file_size: u64) -> Self {
        self.max_file_size = Some(max_file_size);
        self
    }

    pub fn with_allowed_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

impl fmt::Debug for UploadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadRequest")
            .field("file_name", &self.file_name)
            .field("destination_path", &self.destination_path)
            .field("overwrite", &self.overwrite)
            .field("max_file_size", &self.max_file_size)
            .field("allowed_extensions", &self.allowed_extensions)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MoveRequest {
    pub source_path: String,
    pub destination_path: String,
    pub overwrite: bool,
}

impl MoveRequest {
    pub fn new(source_path: impl Into<String>, destination_path: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            destination_path: destination_path.into(),
            overwrite: false,
        }
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub file_path: String,
    /// Soft delete is not implemented; every delete is permanent.
    pub permanent: bool,
}

impl DeleteRequest {
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            permanent: true,
        }
    }
}

/// Outcome of an upload or move. Built only through [`OperationResult::success`]
/// or [`OperationResult::failure`], so a successful result always carries a
/// path, a name and a content type, and a failed one carries only its message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OperationResult {
    success: bool,
    file_path: String,
    file_name: String,
    file_size: u64,
    content_type: String,
    error_message: Option<String>,
    completed_at: DateTime<Utc>,
}

impl OperationResult {
    pub fn success(
        file_path: impl Into<String>,
        file_name: impl Into<String>,
        file_size: u64,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            success: true,
            file_path: file_path.into(),
            file_name: file_name.into(),
            file_size,
            content_type: content_type.into(),
            error_message: None,
            completed_at: Utc::now(),
        }
    }

    pub fn failure(error_message: impl Into<String>) -> Self {
        Self {
            success: false,
            file_path: String::new(),
            file_name: String::new(),
            file_size: 0,
            content_type: String::new(),
            error_message: Some(error_message.into()),
            completed_at: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn file_path(&self) -> &str {
        &self.file_path
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn completed_at(&self) -> DateTime<Utc> {
        self.completed_at
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileMetadata {
    pub file_path: String,
    pub file_name: String,
    pub file_size: u64,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub last_accessed_at: Option<DateTime<Utc>>,
    pub custom_metadata: CustomMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub error_message: Option<String>,
}

impl ValidationOutcome {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            error_message: None,
        }
    }

    pub fn invalid(error_message: impl Into<String>) -> Self {
        Self {
            is_valid: false,
            error_message: Some(error_message.into()),
        }
    }
}
