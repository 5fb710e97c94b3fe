//! Local filesystem storage provider

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use super::provider::{StorageProvider, ALREADY_EXISTS, DIRECTORY_MISSING, SOURCE_MISSING};
use crate::error::{FileManagerError, Result};
use crate::files::content_type::{content_type_for, file_name_of};
use crate::files::models::{
    ContentReader, CustomMetadata, FileMetadata, OperationResult, UploadContent, UploadRequest,
};

/// Staging files live next to their target so the final rename never crosses
/// a filesystem boundary. They are hidden from listings.
const STAGING_PREFIX: &str = ".fm-staging-";

/// A caller path resolved under the storage root.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ResolvedPath {
    full: PathBuf,
    /// Normalized, `/` separated, relative to the root.
    relative: String,
}

/// Stores files under a single root directory.
///
/// Caller paths are normalized lexically (`\` is read as `/`, `.` segments and
/// leading separators are dropped, `..` pops a segment) and must stay inside
/// the root. Paths whose nearest existing ancestor is a symlink pointing
/// outside the root are refused as well.
///
/// Writes go to a staging file in the target directory, are synced, then
/// renamed into place. Without overwrite the rename refuses to replace an
/// existing file, so two racing saves cannot both succeed.
#[derive(Debug, Clone)]
pub struct LocalFileSystemProvider {
    root: PathBuf,
    create_directories: bool,
}

impl LocalFileSystemProvider {
    pub fn new(root: impl Into<PathBuf>, create_directories: bool) -> Self {
        Self {
            root: root.into(),
            create_directories,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn normalize(requested: &str) -> Result<Vec<String>> {
        let unified = requested.replace('\\', "/");
        let mut parts: Vec<String> = Vec::new();

        for segment in unified.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    if parts.pop().is_none() {
                        return Err(FileManagerError::PathTraversal(requested.to_string()));
                    }
                }
                part => {
                    // Drive prefixes and the like on platforms that have them.
                    if !matches!(Path::new(part).components().next(), Some(Component::Normal(_))) {
                        return Err(FileManagerError::PathTraversal(requested.to_string()));
                    }
                    parts.push(part.to_string());
                }
            }
        }

        Ok(parts)
    }

    async fn resolve(&self, requested: &str) -> Result<ResolvedPath> {
        let parts = Self::normalize(requested)?;
        let full = parts.iter().fold(self.root.clone(), |acc, part| acc.join(part));

        self.ensure_contained(&full, requested).await?;

        let resolved = ResolvedPath {
            full,
            relative: parts.join("/"),
        };
        tracing::debug!(requested, resolved = %resolved.full.display(), "Resolved storage path");
        Ok(resolved)
    }

    async fn resolve_file(&self, requested: &str) -> Result<ResolvedPath> {
        let resolved = self.resolve(requested).await?;
        if resolved.relative.is_empty() {
            return Err(FileManagerError::Storage(format!(
                "'{}' does not name a file",
                requested
            )));
        }
        Ok(resolved)
    }

    /// Walks up to the nearest existing ancestor and checks that its real
    /// location is still inside the real root.
    async fn ensure_contained(&self, full: &Path, requested: &str) -> Result<()> {
        let root = match fs::canonicalize(&self.root).await {
            Ok(root) => root,
            // Nothing exists under a missing root, so nothing can escape it yet.
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let mut probe = full.to_path_buf();
        loop {
            if let Ok(real) = fs::canonicalize(&probe).await {
                if real.starts_with(&root) {
                    return Ok(());
                }
                tracing::warn!(requested, "Refusing path that resolves outside the storage root");
                return Err(FileManagerError::PathTraversal(requested.to_string()));
            }
            if !probe.pop() {
                return Ok(());
            }
        }
    }

    /// Makes sure `directory` exists. Returns `false` when it is missing and
    /// directory creation is disabled.
    async fn ensure_directory(&self, directory: &Path, requested: &str) -> Result<bool> {
        match fs::metadata(directory).await {
            Ok(meta) if meta.is_dir() => return Ok(true),
            Ok(_) => {
                return Err(FileManagerError::Storage(format!(
                    "Parent of '{}' is not a directory",
                    requested
                )))
            }
            Err(_) => {}
        }

        if !self.create_directories {
            return Ok(false);
        }

        fs::create_dir_all(directory).await?;
        Ok(true)
    }

    async fn stage(
        &self,
        directory: &Path,
        content: &mut Box<dyn UploadContent>,
        cancel: &CancellationToken,
    ) -> Result<NamedTempFile> {
        let dir = directory.to_path_buf();
        let staged = tokio::task::spawn_blocking(move || -> io::Result<NamedTempFile> {
            let staged = tempfile::Builder::new()
                .prefix(STAGING_PREFIX)
                .tempfile_in(dir)?;
            // tempfile creates 0600 files; stored files get ordinary permissions.
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                staged
                    .as_file()
                    .set_permissions(std::fs::Permissions::from_mode(0o644))?;
            }
            Ok(staged)
        })
        .await??;

        let mut writer = fs::File::from_std(staged.as_file().try_clone()?);

        tokio::select! {
            copied = tokio::io::copy(content, &mut writer) => {
                copied?;
            }
            _ = cancel.cancelled() => {
                tracing::warn!("Save cancelled; discarding staged content");
                return Err(FileManagerError::Cancelled);
            }
        }

        writer.flush().await?;
        writer.sync_all().await?;

        Ok(staged)
    }

    /// Renames the staged file into place. Returns `false` when overwrite is
    /// off and the target appeared in the meantime.
    async fn commit(staged: NamedTempFile, target: PathBuf, overwrite: bool) -> Result<bool> {
        tokio::task::spawn_blocking(move || {
            let outcome = if overwrite {
                staged.persist(&target)
            } else {
                staged.persist_noclobber(&target)
            };

            match outcome {
                Ok(_) => Ok(true),
                Err(e) if !overwrite && e.error.kind() == io::ErrorKind::AlreadyExists => Ok(false),
                Err(e) => Err(FileManagerError::from(e.error)),
            }
        })
        .await?
    }
}

async fn is_file(path: &Path) -> bool {
    fs::metadata(path)
        .await
        .map(|meta| meta.is_file())
        .unwrap_or(false)
}

fn parent_of(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

fn to_metadata(relative: String, meta: &std::fs::Metadata) -> io::Result<FileMetadata> {
    let modified = meta.modified()?;
    let created = meta.created().unwrap_or(modified);
    let file_name = file_name_of(&relative).to_string();

    Ok(FileMetadata {
        content_type: content_type_for(&file_name).to_string(),
        file_name,
        file_path: relative,
        file_size: meta.len(),
        created_at: DateTime::<Utc>::from(created),
        modified_at: DateTime::<Utc>::from(modified),
        last_accessed_at: meta.accessed().ok().map(DateTime::<Utc>::from),
        custom_metadata: CustomMetadata::new(),
    })
}

#[async_trait]
impl StorageProvider for LocalFileSystemProvider {
    async fn save(&self, mut request: UploadRequest, cancel: &CancellationToken) -> Result<OperationResult> {
        if cancel.is_cancelled() {
            return Err(FileManagerError::Cancelled);
        }

        let target = self.resolve_file(&request.destination_path).await?;
        let directory = parent_of(&target.full);

        if !self.ensure_directory(&directory, &target.relative).await? {
            return Ok(OperationResult::failure(DIRECTORY_MISSING));
        }

        if is_file(&target.full).await && !request.overwrite {
            return Ok(OperationResult::failure(ALREADY_EXISTS));
        }

        let staged = self.stage(&directory, &mut request.content, cancel).await?;

        if !Self::commit(staged, target.full.clone(), request.overwrite).await? {
            return Ok(OperationResult::failure(ALREADY_EXISTS));
        }

        let size = fs::metadata(&target.full).await?.len();
        tracing::info!(path = %target.relative, size, "Saved file");

        Ok(OperationResult::success(
            target.relative,
            request.file_name.clone(),
            size,
            content_type_for(&request.file_name),
        ))
    }

    async fn move_file(&self, source_path: &str, destination_path: &str) -> Result<OperationResult> {
        let source = self.resolve_file(source_path).await?;
        let destination = self.resolve_file(destination_path).await?;

        if !is_file(&source.full).await {
            return Ok(OperationResult::failure(SOURCE_MISSING));
        }

        let directory = parent_of(&destination.full);
        if !self.ensure_directory(&directory, &destination.relative).await? {
            return Ok(OperationResult::failure(DIRECTORY_MISSING));
        }

        fs::rename(&source.full, &destination.full).await?;

        let size = fs::metadata(&destination.full).await?.len();
        let file_name = file_name_of(&destination.relative).to_string();
        tracing::info!(from = %source.relative, to = %destination.relative, "Moved file");

        Ok(OperationResult::success(
            destination.relative.clone(),
            file_name.clone(),
            size,
            content_type_for(&file_name),
        ))
    }

    async fn delete(&self, file_path: &str) -> Result<bool> {
        let target = self.resolve_file(file_path).await?;

        if !is_file(&target.full).await {
            return Ok(false);
        }

        match fs::remove_file(&target.full).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn get(&self, file_path: &str) -> Result<ContentReader> {
        let target = self.resolve_file(file_path).await?;

        if !is_file(&target.full).await {
            return Err(FileManagerError::NotFound(file_path.to_string()));
        }

        match fs::File::open(&target.full).await {
            Ok(file) => Ok(Box::new(file)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(FileManagerError::NotFound(file_path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, file_path: &str) -> Result<bool> {
        let target = self.resolve_file(file_path).await?;
        Ok(is_file(&target.full).await)
    }

    async fn get_metadata(&self, file_path: &str) -> Result<FileMetadata> {
        let target = self.resolve_file(file_path).await?;

        let meta = match fs::metadata(&target.full).await {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => return Err(FileManagerError::NotFound(file_path.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(FileManagerError::NotFound(file_path.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        Ok(to_metadata(target.relative, &meta)?)
    }

    async fn list(&self, directory_path: &str) -> Result<Vec<FileMetadata>> {
        let directory = self.resolve(directory_path).await?;

        match fs::metadata(&directory.full).await {
            Ok(meta) if meta.is_dir() => {}
            _ => return Err(FileManagerError::NotFound(directory_path.to_string())),
        }

        let mut files = Vec::new();
        let mut entries = fs::read_dir(&directory.full).await?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with(STAGING_PREFIX) {
                continue;
            }

            // Symlinks are not followed: only regular files are listed.
            let meta = entry.metadata().await?;
            if !meta.is_file() {
                continue;
            }

            let relative = if directory.relative.is_empty() {
                name
            } else {
                format!("{}/{}", directory.relative, name)
            };
            files.push(to_metadata(relative, &meta)?);
        }

        files.sort_by(|a, b| a.file_name.cmp(&b.file_name));
        Ok(files)
    }
}
