//! Extension handling and the extension → MIME table.

pub const OCTET_STREAM: &str = "application/octet-stream";

/// Extension of the last path segment, including its dot. Returns an empty
/// string when the name has no dot or ends with one; a leading-dot name such
/// as `.env` is its own extension.
pub fn extension_of(file_name: &str) -> &str {
    let name = file_name
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(file_name);

    match name.rfind('.') {
        Some(idx) if idx + 1 < name.len() => &name[idx..],
        _ => "",
    }
}

/// Last path segment of a `/` or `\` separated path.
pub fn file_name_of(path: &str) -> &str {
    path.rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or(path)
}

pub fn content_type_for(file_name: &str) -> &'static str {
    match extension_of(file_name).to_ascii_lowercase().as_str() {
        ".jpg" | ".jpeg" => "image/jpeg",
        ".png" => "image/png",
        ".gif" => "image/gif",
        ".pdf" => "application/pdf",
        ".doc" => "application/msword",
        ".docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        ".txt" => "text/plain",
        ".html" => "text/html",
        _ => OCTET_STREAM,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("photo.png"), ".png");
        assert_eq!(extension_of("Photo.PNG"), ".PNG");
        assert_eq!(extension_of("archive.tar.gz"), ".gz");
        assert_eq!(extension_of("README"), "");
        assert_eq!(extension_of("trailing."), "");
        assert_eq!(extension_of(".env"), ".env");
        assert_eq!(extension_of("dir.v2/file"), "");
        assert_eq!(extension_of("dir\\file.doc"), ".doc");
    }

    #[test]
    fn test_file_name_of() {
        assert_eq!(file_name_of("albums/2024/a.png"), "a.png");
        assert_eq!(file_name_of("a.png"), "a.png");
        assert_eq!(file_name_of("albums\\a.png"), "a.png");
    }

    #[test]
    fn test_content_type_table() {
        assert_eq!(content_type_for("a.jpg"), "image/jpeg");
        assert_eq!(content_type_for("a.JPEG"), "image/jpeg");
        assert_eq!(content_type_for("a.png"), "image/png");
        assert_eq!(content_type_for("a.gif"), "image/gif");
        assert_eq!(content_type_for("a.pdf"), "application/pdf");
        assert_eq!(content_type_for("a.doc"), "application/msword");
        assert_eq!(
            content_type_for("a.docx"),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
        assert_eq!(content_type_for("a.txt"), "text/plain");
        assert_eq!(content_type_for("a.html"), "text/html");
        assert_eq!(content_type_for("a.htm"), OCTET_STREAM);
        assert_eq!(content_type_for("noext"), OCTET_STREAM);
    }
}
