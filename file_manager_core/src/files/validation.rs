use std::io::SeekFrom;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

use super::content_type::extension_of;
use super::models::{UploadContent, UploadRequest, ValidationOutcome};
use crate::config::FileManagerOptions;

const HEADER_LEN: usize = 8;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("File size exceeds maximum allowed size of {max_size} bytes.")]
    FileTooLarge { size: u64, max_size: u64 },

    #[error("File extension '{extension}' is not allowed.")]
    ExtensionNotAllowed { extension: String },

    #[error("File content type is not allowed.")]
    UnsafeContent,

    #[error("File name '{name}' is not valid.")]
    InvalidFileName { name: String },
}

/// A stored name must be a single, non-empty path segment.
pub fn is_plain_file_name(name: &str) -> bool {
    !matches!(name, "" | "." | "..") && !name.contains(['/', '\\'])
}

#[derive(Debug, Clone)]
pub struct FileValidationConfig {
    pub default_max_file_size: u64,
    pub default_allowed_extensions: Vec<String>,
    pub strict_content_sniffing: bool,
}

impl Default for FileValidationConfig {
    fn default() -> Self {
        Self::from(&FileManagerOptions::default())
    }
}

impl From<&FileManagerOptions> for FileValidationConfig {
    fn from(options: &FileManagerOptions) -> Self {
        Self {
            default_max_file_size: options.default_max_file_size,
            default_allowed_extensions: options.default_allowed_extensions.clone(),
            strict_content_sniffing: options.strict_content_sniffing,
        }
    }
}

/// Which extensions an upload may carry. An empty effective list is an open
/// policy, not a misconfiguration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionPolicy<'a> {
    Unrestricted,
    Only(&'a [String]),
}

impl ExtensionPolicy<'_> {
    pub fn allows(&self, extension: &str) -> bool {
        match self {
            ExtensionPolicy::Unrestricted => true,
            ExtensionPolicy::Only(allowed) => allowed
                .iter()
                .any(|candidate| candidate.eq_ignore_ascii_case(extension)),
        }
    }
}

struct Signature {
    magic: &'static [u8],
    extensions: &'static [&'static str],
}

const SIGNATURES: &[Signature] = &[
    Signature { magic: &[0x89, 0x50], extensions: &[".png"] },
    Signature { magic: &[0xFF, 0xD8], extensions: &[".jpg", ".jpeg"] },
    Signature { magic: &[0x25, 0x50], extensions: &[".pdf"] },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SniffVerdict {
    /// The header carries the signature expected for the extension.
    Match,
    /// The extension has a known signature and the header does not carry it.
    Mismatch,
    /// No signature is known for the extension.
    Unknown,
}

pub fn sniff(header: &[u8], extension: &str) -> SniffVerdict {
    match SIGNATURES
        .iter()
        .find(|sig| sig.extensions.contains(&extension))
    {
        Some(sig) if header.starts_with(sig.magic) => SniffVerdict::Match,
        Some(_) => SniffVerdict::Mismatch,
        None => SniffVerdict::Unknown,
    }
}

#[derive(Clone)]
pub struct FileValidator {
    config: FileValidationConfig,
}

impl FileValidator {
    pub fn new(config: FileValidationConfig) -> Self {
        Self { config }
    }

    pub fn with_default_config() -> Self {
        Self::new(FileValidationConfig::default())
    }

    pub fn extension_policy<'a>(&'a self, requested: &'a [String]) -> ExtensionPolicy<'a> {
        let effective = if requested.is_empty() {
            &self.config.default_allowed_extensions
        } else {
            requested
        };

        if effective.is_empty() {
            ExtensionPolicy::Unrestricted
        } else {
            ExtensionPolicy::Only(effective)
        }
    }

    /// Checks the file name, size, extension and content header, in that
    /// order. The content is left positioned at its start and is never closed.
    pub async fn validate(&self, request: &mut UploadRequest) -> ValidationOutcome {
        match self.check(request).await {
            Ok(()) => ValidationOutcome::valid(),
            Err(e) => {
                tracing::warn!(file_name = %request.file_name, "Upload rejected: {}", e);
                ValidationOutcome::invalid(e.to_string())
            }
        }
    }

    async fn check(&self, request: &mut UploadRequest) -> Result<(), ValidationError> {
        if !is_plain_file_name(&request.file_name) {
            return Err(ValidationError::InvalidFileName {
                name: request.file_name.clone(),
            });
        }

        let max_size = request
            .max_file_size
            .unwrap_or(self.config.default_max_file_size);
        let size = content_length(&mut request.content)
            .await
            .map_err(|e| {
                tracing::error!("Failed to measure upload content: {}", e);
                ValidationError::UnsafeContent
            })?;

        if size > max_size {
            return Err(ValidationError::FileTooLarge { size, max_size });
        }

        let extension = extension_of(&request.file_name).to_ascii_lowercase();
        if !self.extension_policy(&request.allowed_extensions).allows(&extension) {
            return Err(ValidationError::ExtensionNotAllowed { extension });
        }

        let header = read_header(&mut request.content).await.map_err(|e| {
            tracing::error!("Failed to read upload header: {}", e);
            ValidationError::UnsafeContent
        })?;

        match sniff(&header, &extension) {
            SniffVerdict::Mismatch if self.config.strict_content_sniffing => {
                Err(ValidationError::UnsafeContent)
            }
            SniffVerdict::Mismatch => {
                tracing::warn!(
                    file_name = %request.file_name,
                    "Content header does not match extension {}; accepting under permissive sniffing",
                    extension
                );
                Ok(())
            }
            SniffVerdict::Match | SniffVerdict::Unknown => Ok(()),
        }
    }
}

async fn content_length(content: &mut Box<dyn UploadContent>) -> std::io::Result<u64> {
    let length = content.seek(SeekFrom::End(0)).await?;
    content.seek(SeekFrom::Start(0)).await?;
    Ok(length)
}

async fn read_header(content: &mut Box<dyn UploadContent>) -> std::io::Result<Vec<u8>> {
    content.seek(SeekFrom::Start(0)).await?;

    let mut buffer = [0u8; HEADER_LEN];
    let mut filled = 0;
    while filled < HEADER_LEN {
        let read = content.read(&mut buffer[filled..]).await?;
        if read == 0 {
            break;
        }
        filled += read;
    }

    content.seek(SeekFrom::Start(0)).await?;
    Ok(buffer[..filled].to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{AsyncRead, AsyncSeek, ReadBuf};

    const PNG_HEADER: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

    fn png_bytes(len: usize) -> Vec<u8> {
        let mut data = PNG_HEADER.to_vec();
        data.resize(len, 0xAB);
        data
    }

    #[tokio::test]
    async fn test_accepts_default_upload() {
        let validator = FileValidator::with_default_config();
        let mut request = UploadRequest::from_bytes(png_bytes(2048), "photo.png", "albums");

        let outcome = validator.validate(&mut request).await;
        assert!(outcome.is_valid);
        assert!(outcome.error_message.is_none());
    }

    #[tokio::test]
    async fn test_rejects_oversized_content() {
        let validator = FileValidator::with_default_config();
        let mut request =
            UploadRequest::from_bytes(png_bytes(11), "photo.png", "albums").with_max_file_size(10);

        let outcome = validator.validate(&mut request).await;
        assert!(!outcome.is_valid);
        assert_eq!(
            outcome.error_message.as_deref(),
            Some("File size exceeds maximum allowed size of 10 bytes.")
        );
    }

    #[tokio::test]
    async fn test_size_at_limit_passes() {
        let validator = FileValidator::with_default_config();
        let mut request =
            UploadRequest::from_bytes(png_bytes(10), "photo.png", "albums").with_max_file_size(10);

        assert!(validator.validate(&mut request).await.is_valid);
    }

    #[tokio::test]
    async fn test_extension_checks() {
        let validator = FileValidator::with_default_config();

        let mut request = UploadRequest::from_bytes(b"MZ".to_vec(), "tool.exe", "bin");
        let outcome = validator.validate(&mut request).await;
        assert_eq!(
            outcome.error_message.as_deref(),
            Some("File extension '.exe' is not allowed.")
        );

        let mut request = UploadRequest::from_bytes(png_bytes(16), "PHOTO.PNG", "albums");
        assert!(validator.validate(&mut request).await.is_valid);

        let mut request = UploadRequest::from_bytes(b"plain".to_vec(), "README", "docs");
        assert!(!validator.validate(&mut request).await.is_valid);
    }

    #[tokio::test]
    async fn test_request_override_replaces_defaults() {
        let validator = FileValidator::with_default_config();

        let mut request = UploadRequest::from_bytes(b"a,b".to_vec(), "data.csv", "exports")
            .with_allowed_extensions([".CSV"]);
        assert!(validator.validate(&mut request).await.is_valid);

        let mut request = UploadRequest::from_bytes(png_bytes(16), "photo.png", "albums")
            .with_allowed_extensions([".csv"]);
        assert!(!validator.validate(&mut request).await.is_valid);
    }

    #[tokio::test]
    async fn test_empty_allow_list_is_unrestricted() {
        let validator = FileValidator::new(FileValidationConfig {
            default_allowed_extensions: Vec::new(),
            ..FileValidationConfig::default()
        });
        assert_eq!(validator.extension_policy(&[]), ExtensionPolicy::Unrestricted);

        for name in ["tool.exe", "README", "archive.tar.gz"] {
            let mut request = UploadRequest::from_bytes(b"anything".to_vec(), name, "misc");
            assert!(validator.validate(&mut request).await.is_valid, "{} should pass", name);
        }
    }

    #[test]
    fn test_sniff_table() {
        assert_eq!(sniff(&PNG_HEADER, ".png"), SniffVerdict::Match);
        assert_eq!(sniff(&[0xFF, 0xD8, 0xFF], ".jpg"), SniffVerdict::Match);
        assert_eq!(sniff(&[0xFF, 0xD8, 0xFF], ".jpeg"), SniffVerdict::Match);
        assert_eq!(sniff(b"%PDF-1.7", ".pdf"), SniffVerdict::Match);
        assert_eq!(sniff(b"%PDF-1.7", ".png"), SniffVerdict::Mismatch);
        assert_eq!(sniff(&[0x89], ".png"), SniffVerdict::Mismatch);
        assert_eq!(sniff(b"GIF89a", ".gif"), SniffVerdict::Unknown);
    }

    #[tokio::test]
    async fn test_permissive_sniffing_accepts_mismatch() {
        let validator = FileValidator::with_default_config();
        let mut request = UploadRequest::from_bytes(b"not really a png".to_vec(), "fake.png", "albums");

        assert!(validator.validate(&mut request).await.is_valid);
    }

    #[tokio::test]
    async fn test_strict_sniffing_rejects_mismatch() {
        let validator = FileValidator::new(FileValidationConfig {
            strict_content_sniffing: true,
            ..FileValidationConfig::default()
        });

        let mut request = UploadRequest::from_bytes(b"not really a png".to_vec(), "fake.png", "albums");
        let outcome = validator.validate(&mut request).await;
        assert_eq!(outcome.error_message.as_deref(), Some("File content type is not allowed."));

        let mut request = UploadRequest::from_bytes(png_bytes(32), "real.png", "albums");
        assert!(validator.validate(&mut request).await.is_valid);

        let mut request = UploadRequest::from_bytes(b"GIF89a....".to_vec(), "anim.gif", "albums");
        assert!(validator.validate(&mut request).await.is_valid);
    }

    #[tokio::test]
    async fn test_stream_is_rewound_after_validation() {
        let validator = FileValidator::with_default_config();
        let data = png_bytes(100);
        let mut request = UploadRequest::from_bytes(data.clone(), "photo.png", "albums");

        assert!(validator.validate(&mut request).await.is_valid);

        let mut read_back = Vec::new();
        request.content.read_to_end(&mut read_back).await.unwrap();
        assert_eq!(read_back, data);
    }

    /// Seekable content whose reads fail, and optionally whose seeks fail too.
    struct Faulty {
        fail_seek: bool,
    }

    impl AsyncRead for Faulty {
        fn poll_read(self: Pin<&mut Self>, _cx: &mut Context<'_>, _buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, "device unplugged")))
        }
    }

    impl AsyncSeek for Faulty {
        fn start_seek(self: Pin<&mut Self>, _position: SeekFrom) -> io::Result<()> {
            Ok(())
        }

        fn poll_complete(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<u64>> {
            if self.fail_seek {
                Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, "seek failed")))
            } else {
                Poll::Ready(Ok(16))
            }
        }
    }

    #[tokio::test]
    async fn test_io_faults_are_reported_as_unsafe_content() {
        let validator = FileValidator::with_default_config();

        for fail_seek in [true, false] {
            let mut request = UploadRequest::new(Faulty { fail_seek }, "photo.png", "albums");
            let outcome = validator.validate(&mut request).await;

            assert!(!outcome.is_valid);
            assert_eq!(
                outcome.error_message.as_deref(),
                Some("File content type is not allowed."),
                "fail_seek = {}",
                fail_seek
            );
        }
    }

    #[test]
    fn test_plain_file_names() {
        assert!(is_plain_file_name("photo.png"));
        assert!(is_plain_file_name(".env"));
        assert!(is_plain_file_name("..hidden"));
        for name in ["", ".", "..", "sub/x.png", "sub\\x.png", "/x.png"] {
            assert!(!is_plain_file_name(name), "{:?} should be refused", name);
        }
    }

    #[tokio::test]
    async fn test_rejects_names_that_are_not_a_single_segment() {
        let validator = FileValidator::new(FileValidationConfig {
            default_allowed_extensions: Vec::new(),
            ..FileValidationConfig::default()
        });

        for name in ["", ".", "..", "sub/x.png", "sub\\x.png"] {
            let mut request = UploadRequest::from_bytes(png_bytes(16), name, "docs");
            let outcome = validator.validate(&mut request).await;
            assert_eq!(
                outcome.error_message,
                Some(format!("File name '{}' is not valid.", name))
            );
        }
    }
}
