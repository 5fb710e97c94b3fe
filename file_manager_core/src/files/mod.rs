pub mod content_type;
pub mod manager;
pub mod models;
pub mod naming;
pub mod observer;
pub mod validation;

pub use content_type::content_type_for;
pub use manager::FileManager;
pub use models::{
    ContentReader, CustomMetadata, DeleteRequest, FileMetadata, MoveRequest, OperationResult,
    UploadContent, UploadRequest, ValidationOutcome,
};
pub use naming::SecureNameGenerator;
pub use observer::{OperationEvent, OperationObserver, TracingObserver};
pub use validation::{FileValidationConfig, FileValidator, ValidationError};
