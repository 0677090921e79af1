use std::path::Path;

const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    /// Study material fed to note/quiz generation.
    Document,
    Avatar,
}

impl UploadKind {
    pub fn max_bytes(self) -> u64 {
        match self {
            Self::Document => 10 * MIB,
            Self::Avatar => 5 * MIB,
        }
    }

    /// Multipart field name expected by the backend.
    pub fn form_field(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Avatar => "avatar",
        }
    }

    fn allowed(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Self::Document => &[
                ("pdf", "application/pdf"),
                ("txt", "text/plain"),
                ("md", "text/markdown"),
            ],
            Self::Avatar => &[
                ("jpg", "image/jpeg"),
                ("jpeg", "image/jpeg"),
                ("png", "image/png"),
                ("gif", "image/gif"),
                ("webp", "image/webp"),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadCandidate {
    pub kind: UploadKind,
    pub file_name: String,
    pub mime_type: &'static str,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadValidationError {
    MissingFileName,
    UnsupportedType { extension: String },
    Empty,
    TooLarge { size_bytes: u64, max_bytes: u64 },
}

impl std::fmt::Display for UploadValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingFileName => f.write_str("file has no name"),
            Self::UnsupportedType { extension } => {
                write!(f, "file type '.{extension}' is not allowed")
            }
            Self::Empty => f.write_str("file is empty"),
            Self::TooLarge {
                size_bytes,
                max_bytes,
            } => write!(
                f,
                "file is {} MiB, the limit is {} MiB",
                size_bytes.div_ceil(MIB),
                max_bytes / MIB
            ),
        }
    }
}

impl std::error::Error for UploadValidationError {}

/// Checks a file against the allow-list and size cap for `kind`.
pub fn validate_upload(
    kind: UploadKind,
    path: &Path,
    size_bytes: u64,
) -> Result<UploadCandidate, UploadValidationError> {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .ok_or(UploadValidationError::MissingFileName)?;

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let mime_type = kind
        .allowed()
        .iter()
        .find(|(allowed, _)| *allowed == extension)
        .map(|(_, mime)| *mime)
        .ok_or_else(|| UploadValidationError::UnsupportedType {
            extension: extension.clone(),
        })?;

    if size_bytes == 0 {
        return Err(UploadValidationError::Empty);
    }

    if size_bytes > kind.max_bytes() {
        return Err(UploadValidationError::TooLarge {
            size_bytes,
            max_bytes: kind.max_bytes(),
        });
    }

    Ok(UploadCandidate {
        kind,
        file_name: file_name.to_owned(),
        mime_type,
        size_bytes,
    })
}
