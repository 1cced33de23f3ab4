//! Notification messages.

use std::path::Path;

/// File attached to a notification.
#[derive(Clone, PartialEq, Eq)]
pub struct Attachment {
    pub filename: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    pub fn new(
        filename: impl Into<String>,
        content_type: impl Into<String>,
        bytes: Vec<u8>,
    ) -> Self {
        Self {
            filename: filename.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Attachment named after the file, typed from its extension.
    pub fn from_path(path: &Path, bytes: Vec<u8>) -> Self {
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());
        Self::new(filename, content_type_for(path), bytes)
    }
}

impl std::fmt::Debug for Attachment {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Attachment")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

fn content_type_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        _ => "application/octet-stream",
    }
}

/// One message to the owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub subject: String,
    pub body: String,
    pub attachment: Option<Attachment>,
}

impl Notification {
    /// Plain text notification.
    pub fn plain(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            attachment: None,
        }
    }

    /// Attach a file.
    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachment = Some(attachment);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("captured_face.png", "image/png")]
    #[case("owner.JPEG", "image/jpeg")]
    #[case("frame.jpg", "image/jpeg")]
    #[case("dump.bin", "application/octet-stream")]
    #[case("noext", "application/octet-stream")]
    fn test_content_type_from_extension(#[case] name: &str, #[case] expected: &str) {
        let attachment = Attachment::from_path(Path::new(name), Vec::new());
        assert_eq!(attachment.content_type, expected);
        assert_eq!(attachment.filename, name);
    }

    #[test]
    fn test_attachment_debug_hides_bytes() {
        let attachment = Attachment::new("a.png", "image/png", vec![7; 1024]);
        let debug = format!("{attachment:?}");
        assert!(debug.contains("len: 1024"));
        assert!(!debug.contains("7, 7"));
    }
}
