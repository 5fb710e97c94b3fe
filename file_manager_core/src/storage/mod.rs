pub mod local;
pub mod provider;

pub use local::LocalFileSystemProvider;
pub use provider::{build_provider, StorageProvider, ALREADY_EXISTS, DIRECTORY_MISSING, SOURCE_MISSING};
