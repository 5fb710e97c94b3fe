//! Operation summaries emitted by the file manager.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationEvent<'a> {
    Uploaded {
        original_name: &'a str,
        path: &'a str,
        size: u64,
    },
    UploadFailed {
        original_name: &'a str,
        reason: &'a str,
    },
    Moved {
        from: &'a str,
        to: &'a str,
    },
    /// A move without overwrite is about to replace an existing destination.
    MoveReplacesDestination {
        from: &'a str,
        to: &'a str,
    },
    MoveFailed {
        from: &'a str,
        to: &'a str,
        reason: &'a str,
    },
    Deleted {
        path: &'a str,
    },
    /// `reason` is `None` when there was nothing to delete.
    DeleteFailed {
        path: &'a str,
        reason: Option<&'a str>,
    },
}

pub trait OperationObserver: Send + Sync {
    fn on_event(&self, event: &OperationEvent<'_>);
}

/// Default observer: writes each summary as a `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl OperationObserver for TracingObserver {
    fn on_event(&self, event: &OperationEvent<'_>) {
        match event {
            OperationEvent::Uploaded { original_name, path, size } => {
                tracing::info!(original_name, path, size, "File uploaded");
            }
            OperationEvent::UploadFailed { original_name, reason } => {
                tracing::warn!(original_name, "File upload failed: {}", reason);
            }
            OperationEvent::Moved { from, to } => {
                tracing::info!("File moved from {} to {}", from, to);
            }
            OperationEvent::MoveReplacesDestination { from, to } => {
                tracing::warn!(
                    "Move from {} replaces existing {} even though overwrite was not requested",
                    from,
                    to
                );
            }
            OperationEvent::MoveFailed { from, to, reason } => {
                tracing::warn!("Error moving file from {} to {}: {}", from, to, reason);
            }
            OperationEvent::Deleted { path } => {
                tracing::info!("File deleted successfully: {}", path);
            }
            OperationEvent::DeleteFailed { path, reason: None } => {
                tracing::info!("File deletion failed: {} does not exist", path);
            }
            OperationEvent::DeleteFailed { path, reason: Some(reason) } => {
                tracing::error!("Error deleting file {}: {}", path, reason);
            }
        }
    }
}
