use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::models::{
    ContentReader, DeleteRequest, FileMetadata, MoveRequest, OperationResult, UploadRequest,
};
use super::naming::SecureNameGenerator;
use super::observer::{OperationEvent, OperationObserver, TracingObserver};
use super::validation::{FileValidationConfig, FileValidator};
use crate::config::{FileManagerConfig, FileManagerOptions};
use crate::error::{FileManagerError, Result};
use crate::storage::{build_provider, StorageProvider, SOURCE_MISSING};

pub const UNEXPECTED_UPLOAD_FAILURE: &str = "An unexpected error occurred during file upload.";
pub const UNEXPECTED_MOVE_FAILURE: &str = "An unexpected error occurred while moving the file.";

/// Joins a destination directory and a file name with `/`.
pub fn compose_path(destination: &str, file_name: &str) -> String {
    let destination = destination.replace('\\', "/");
    if destination.is_empty() {
        file_name.to_string()
    } else if destination.ends_with('/') {
        format!("{}{}", destination, file_name)
    } else {
        format!("{}/{}", destination, file_name)
    }
}

/// Entry point for callers: validates uploads, names them, and hands every
/// operation to the configured storage provider.
///
/// `upload`, `move_file` and `delete_file` never fail: unexpected errors,
/// panics included, are logged and turned into a failed result (or `false`).
/// Reads report a missing file as a `NotFound` error.
#[derive(Clone)]
pub struct FileManager {
    options: FileManagerOptions,
    provider: Arc<dyn StorageProvider>,
    validator: FileValidator,
    name_generator: SecureNameGenerator,
    observer: Arc<dyn OperationObserver>,
}

impl FileManager {
    pub fn new(options: FileManagerOptions, provider: Arc<dyn StorageProvider>) -> Self {
        let validator = FileValidator::new(FileValidationConfig::from(&options));
        let name_generator = SecureNameGenerator::new(options.file_name_length);

        Self {
            options,
            provider,
            validator,
            name_generator,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn from_config(config: &FileManagerConfig) -> Self {
        Self::new(config.manager.clone(), build_provider(config))
    }

    pub fn with_observer(mut self, observer: Arc<dyn OperationObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn provider(&self) -> &Arc<dyn StorageProvider> {
        &self.provider
    }

    pub async fn upload(&self, request: UploadRequest, cancel: &CancellationToken) -> OperationResult {
        let original_name = request.file_name.clone();

        let result = match AssertUnwindSafe(self.try_upload(request, cancel))
            .catch_unwind()
            .await
        {
            Ok(Ok(result)) => result,
            Ok(Err(e)) if e.is_expected() => OperationResult::failure(e.to_string()),
            Ok(Err(e)) => {
                tracing::error!("File upload failed for {}: {:?}", original_name, e);
                OperationResult::failure(UNEXPECTED_UPLOAD_FAILURE)
            }
            Err(_) => {
                tracing::error!("File upload panicked for {}", original_name);
                OperationResult::failure(UNEXPECTED_UPLOAD_FAILURE)
            }
        };

        let event = match result.error_message() {
            None => OperationEvent::Uploaded {
                original_name: &original_name,
                path: result.file_path(),
                size: result.file_size(),
            },
            Some(reason) => OperationEvent::UploadFailed {
                original_name: &original_name,
                reason,
            },
        };
        self.observer.on_event(&event);

        result
    }

    async fn try_upload(&self, mut request: UploadRequest, cancel: &CancellationToken) -> Result<OperationResult> {
        let outcome = self.validator.validate(&mut request).await;
        if !outcome.is_valid {
            return Err(FileManagerError::Validation(
                outcome
                    .error_message
                    .unwrap_or_else(|| "File validation failed.".to_string()),
            ));
        }

        let file_name = if self.options.use_secure_naming {
            self.name_generator.generate_secure_name(&request.file_name)
        } else {
            request.file_name.clone()
        };
        let destination_path = compose_path(&request.destination_path, &file_name);

        let request = UploadRequest {
            file_name,
            destination_path,
            ..request
        };

        self.provider.save(request, cancel).await
    }

    pub async fn move_file(&self, request: MoveRequest) -> OperationResult {
        let from = request.source_path.as_str();
        let to = request.destination_path.as_str();

        let result = match AssertUnwindSafe(self.try_move(&request)).catch_unwind().await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) if e.is_expected() => OperationResult::failure(format!("Error moving file: {}", e)),
            Ok(Err(e)) => {
                tracing::error!("Error moving file from {} to {}: {:?}", from, to, e);
                OperationResult::failure(UNEXPECTED_MOVE_FAILURE)
            }
            Err(_) => {
                tracing::error!("Moving file from {} to {} panicked", from, to);
                OperationResult::failure(UNEXPECTED_MOVE_FAILURE)
            }
        };

        let event = match result.error_message() {
            None => OperationEvent::Moved { from, to },
            Some(reason) => OperationEvent::MoveFailed { from, to, reason },
        };
        self.observer.on_event(&event);

        result
    }

    async fn try_move(&self, request: &MoveRequest) -> Result<OperationResult> {
        if !self.provider.exists(&request.source_path).await? {
            return Ok(OperationResult::failure(SOURCE_MISSING));
        }

        // Moves always replace the destination; the flag is only reported.
        if !request.overwrite && self.provider.exists(&request.destination_path).await? {
            self.observer.on_event(&OperationEvent::MoveReplacesDestination {
                from: &request.source_path,
                to: &request.destination_path,
            });
        }

        self.provider
            .move_file(&request.source_path, &request.destination_path)
            .await
    }

    pub async fn delete_file(&self, request: DeleteRequest) -> bool {
        let path = request.file_path.as_str();

        if !request.permanent {
            tracing::warn!(path, "Soft delete is not supported; deleting permanently");
        }

        match AssertUnwindSafe(self.provider.delete(path)).catch_unwind().await {
            Ok(Ok(true)) => {
                self.observer.on_event(&OperationEvent::Deleted { path });
                true
            }
            Ok(Ok(false)) => {
                self.observer.on_event(&OperationEvent::DeleteFailed { path, reason: None });
                false
            }
            Ok(Err(e)) => {
                let reason = e.to_string();
                self.observer.on_event(&OperationEvent::DeleteFailed {
                    path,
                    reason: Some(&reason),
                });
                false
            }
            Err(_) => {
                self.observer.on_event(&OperationEvent::DeleteFailed {
                    path,
                    reason: Some("delete panicked"),
                });
                false
            }
        }
    }

    pub async fn download(&self, file_path: &str) -> Result<ContentReader> {
        self.provider.get(file_path).await
    }

    /// `Ok(false)` only for an absent file inside the root. A path escaping the
    /// root is reported as `PathTraversal` so callers can tell it apart.
    pub async fn exists(&self, file_path: &str) -> Result<bool> {
        self.provider.exists(file_path).await
    }

    pub async fn get_metadata(&self, file_path: &str) -> Result<FileMetadata> {
        self.provider.get_metadata(file_path).await
    }

    pub async fn list(&self, directory_path: &str) -> Result<Vec<FileMetadata>> {
        self.provider.list(directory_path).await
    }
}
