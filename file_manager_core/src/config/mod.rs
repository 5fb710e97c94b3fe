pub mod settings;

pub use settings::{FileManagerConfig, FileManagerOptions, LocalFileSystemOptions, StorageProviderKind};
