use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::local::LocalFileSystemProvider;
use crate::config::{FileManagerConfig, StorageProviderKind};
use crate::error::Result;
use crate::files::models::{ContentReader, FileMetadata, OperationResult, UploadRequest};

pub const ALREADY_EXISTS: &str = "File already exists and overwrite is disabled.";
pub const SOURCE_MISSING: &str = "Source file does not exist.";
pub const DIRECTORY_MISSING: &str = "Destination directory does not exist.";

/// Physical persistence behind the file manager. Every path is relative to a
/// root chosen by the implementation, which must refuse paths resolving
/// outside of it.
///
/// Expected refusals (an existing target without overwrite, a missing move
/// source) come back as failed [`OperationResult`]s. I/O faults and refused
/// paths come back as errors.
///
/// Only `save` takes a [`CancellationToken`]. The other operations are
/// cancelled by dropping their future; a dropped `move_file` has either
/// renamed the file or left it in place.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Writes `request.content` to `request.destination_path`, creating missing
    /// directories. A failed or cancelled write must not leave a file behind.
    async fn save(&self, request: UploadRequest, cancel: &CancellationToken) -> Result<OperationResult>;

    /// Moves a file, replacing any existing destination.
    async fn move_file(&self, source_path: &str, destination_path: &str) -> Result<OperationResult>;

    /// Returns `false` when there was nothing to delete.
    async fn delete(&self, file_path: &str) -> Result<bool>;

    /// Opens a file for reading. Fails with `NotFound` when absent.
    async fn get(&self, file_path: &str) -> Result<ContentReader>;

    /// A path resolving outside the root is a `PathTraversal` error, not `false`.
    async fn exists(&self, file_path: &str) -> Result<bool>;

    /// Fails with `NotFound` when absent.
    async fn get_metadata(&self, file_path: &str) -> Result<FileMetadata>;

    /// Files directly inside `directory_path`, ordered by name.
    async fn list(&self, directory_path: &str) -> Result<Vec<FileMetadata>>;
}

pub fn build_provider(config: &FileManagerConfig) -> Arc<dyn StorageProvider> {
    match config.manager.storage_provider {
        StorageProviderKind::LocalFileSystem => Arc::new(LocalFileSystemProvider::new(
            config.local.storage_root(),
            config.manager.create_directory_if_not_exists,
        )),
    }
}
