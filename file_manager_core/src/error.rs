//! File manager error types and handling

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FileManagerError>;

#[derive(Error, Debug)]
pub enum FileManagerError {
    #[error("{0}")]
    Validation(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Path escapes the storage root: {0}")]
    PathTraversal(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FileManagerError {
    /// Typed failures whose message is safe to hand back to library callers.
    /// Everything else is an unexpected fault and gets a generic message.
    pub fn is_expected(&self) -> bool {
        matches!(
            self,
            FileManagerError::Validation(_)
                | FileManagerError::NotFound(_)
                | FileManagerError::PathTraversal(_)
                | FileManagerError::Storage(_)
                | FileManagerError::Cancelled
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FileManagerError::NotFound(_))
    }
}

impl From<tokio::task::JoinError> for FileManagerError {
    fn from(err: tokio::task::JoinError) -> Self {
        FileManagerError::Other(anyhow::anyhow!("blocking storage task failed: {}", err))
    }
}
