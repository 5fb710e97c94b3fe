//! Core library for validated, sandboxed file storage: uploads, moves,
//! deletes, reads and listings behind a pluggable storage provider.

pub mod config;
pub mod error;
pub mod files;
pub mod storage;

pub use config::{FileManagerConfig, FileManagerOptions, LocalFileSystemOptions, StorageProviderKind};
pub use error::{FileManagerError, Result};
pub use files::{
    DeleteRequest, FileManager, FileMetadata, FileValidator, MoveRequest, OperationEvent,
    OperationObserver, OperationResult, SecureNameGenerator, UploadRequest,
};
pub use storage::{build_provider, LocalFileSystemProvider, StorageProvider};
pub use tokio_util::sync::CancellationToken;
