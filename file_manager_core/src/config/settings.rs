use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;
pub const DEFAULT_FILE_NAME_LENGTH: usize = 32;

const CONFIG_FILE_NAME: &str = "filemanager";
const ENV_PREFIX: &str = "FILEMANAGER";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileManagerConfig {
    pub manager: FileManagerOptions,
    pub local: LocalFileSystemOptions,
}

/// Backends selectable from configuration. Custom providers bypass this
/// switch and are handed to `FileManager::new` directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageProviderKind {
    LocalFileSystem,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileManagerOptions {
    pub storage_provider: StorageProviderKind,
    pub default_max_file_size: u64,
    /// Extensions with their leading dot. An empty list disables the
    /// extension check entirely.
    pub default_allowed_extensions: Vec<String>,
    pub use_secure_naming: bool,
    pub file_name_length: usize,
    pub create_directory_if_not_exists: bool,
    /// Reject uploads whose leading bytes contradict a known signature for
    /// their extension. Off by default: mismatches are only logged.
    pub strict_content_sniffing: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalFileSystemOptions {
    pub content_root: PathBuf,
    pub root_path: PathBuf,
    pub use_web_root: bool,
}

impl Default for FileManagerOptions {
    fn default() -> Self {
        Self {
            storage_provider: StorageProviderKind::LocalFileSystem,
            default_max_file_size: DEFAULT_MAX_FILE_SIZE,
            default_allowed_extensions: vec![
                ".jpg".to_string(),
                ".jpeg".to_string(),
                ".png".to_string(),
                ".gif".to_string(),
                ".pdf".to_string(),
                ".doc".to_string(),
                ".docx".to_string(),
            ],
            use_secure_naming: true,
            file_name_length: DEFAULT_FILE_NAME_LENGTH,
            create_directory_if_not_exists: true,
            strict_content_sniffing: false,
        }
    }
}

impl Default for LocalFileSystemOptions {
    fn default() -> Self {
        Self {
            content_root: PathBuf::from("."),
            root_path: PathBuf::from("uploads"),
            use_web_root: true,
        }
    }
}

impl LocalFileSystemOptions {
    /// Options rooted directly at `root`, without the web-root indirection.
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        Self {
            content_root: root.into(),
            root_path: PathBuf::new(),
            use_web_root: false,
        }
    }

    pub fn storage_root(&self) -> PathBuf {
        let base = if self.use_web_root {
            self.content_root.join("wwwroot")
        } else {
            self.content_root.clone()
        };
        base.join(&self.root_path)
    }
}

impl FileManagerConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let mut builder = Config::builder()
            .add_source(Config::try_from(&FileManagerConfig::default())?);

        if Path::new(&format!("{}.toml", CONFIG_FILE_NAME)).exists() {
            builder = builder.add_source(File::with_name(CONFIG_FILE_NAME));
        }

        Self::finish(builder)
    }

    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(Config::try_from(&FileManagerConfig::default())?)
            .add_source(File::from(path.as_ref()));

        Self::finish(builder)
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        let builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("manager.default_allowed_extensions")
                .try_parsing(true),
        );

        let config = builder.build()?;
        let loaded: FileManagerConfig = config.try_deserialize()?;

        loaded.validate()?;

        Ok(loaded)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.manager.default_max_file_size == 0 {
            return Err(ConfigError::Message(
                "Default max file size must be greater than 0".to_string(),
            ));
        }

        if self.manager.file_name_length == 0 {
            return Err(ConfigError::Message(
                "Generated file name length must be greater than 0".to_string(),
            ));
        }

        if let Some(bad) = self
            .manager
            .default_allowed_extensions
            .iter()
            .find(|ext| !ext.starts_with('.') || ext.len() < 2)
        {
            return Err(ConfigError::Message(format!(
                "Allowed extension '{}' must start with a dot",
                bad
            )));
        }

        if self.manager.default_allowed_extensions.is_empty() {
            tracing::warn!("No default allowed extensions configured - every extension will be accepted");
        }

        if self.local.storage_root().as_os_str().is_empty() {
            return Err(ConfigError::Message(
                "Storage root cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
