use std::{fs, path::Path};

use async_trait::async_trait;

use crate::domain::{
    notice::UiNotice,
    upload::{validate_upload, UploadCandidate, UploadKind, UploadValidationError},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadReceipt {
    pub id: Option<String>,
    pub title: String,
    /// Remote location returned by the backend, e.g. an avatar URL.
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadSourceError {
    Unauthorized,
    Rejected { message: String },
    Unavailable,
    InvalidData,
}

#[async_trait]
pub trait DocumentUploader: Send + Sync {
    async fn upload(
        &self,
        candidate: &UploadCandidate,
        bytes: Vec<u8>,
    ) -> Result<UploadReceipt, UploadSourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    LoginRequired,
    Invalid(UploadValidationError),
    Unreadable { message: String },
    Unauthorized,
    Rejected { message: String },
    TemporarilyUnavailable,
    DataContractViolation,
}

impl UploadError {
    pub fn notice(&self) -> UiNotice {
        match self {
            Self::LoginRequired => UiNotice::LoginRequired,
            Self::Unauthorized => UiNotice::SessionExpired,
            Self::Invalid(error) => UiNotice::FieldError {
                field: "file",
                message: error.to_string(),
            },
            Self::Unreadable { message } => UiNotice::FieldError {
                field: "file",
                message: message.clone(),
            },
            Self::Rejected { message } => UiNotice::Banner {
                message: message.clone(),
                retryable: false,
            },
            Self::TemporarilyUnavailable => UiNotice::banner("Upload failed. Try again."),
            Self::DataContractViolation => UiNotice::Banner {
                message: "The server reply could not be understood.".to_owned(),
                retryable: false,
            },
        }
    }
}

/// Validates the file locally, then uploads it. Nothing is sent for a file
/// that fails the type or size checks.
pub async fn upload_file(
    uploader: &dyn DocumentUploader,
    signed_in: bool,
    kind: UploadKind,
    path: &Path,
) -> Result<UploadReceipt, UploadError> {
    if !signed_in {
        return Err(UploadError::LoginRequired);
    }

    let metadata = fs::metadata(path).map_err(|source| UploadError::Unreadable {
        message: format!("cannot read {}: {source}", path.display()),
    })?;
    let candidate = validate_upload(kind, path, metadata.len()).map_err(UploadError::Invalid)?;

    let bytes = fs::read(path).map_err(|source| UploadError::Unreadable {
        message: format!("cannot read {}: {source}", path.display()),
    })?;

    tracing::info!(
        code = "UPLOAD_STARTED",
        file = %candidate.file_name,
        size_bytes = candidate.size_bytes,
        "uploading"
    );

    uploader
        .upload(&candidate, bytes)
        .await
        .map_err(map_source_error)
}

fn map_source_error(error: UploadSourceError) -> UploadError {
    match error {
        UploadSourceError::Unauthorized => UploadError::Unauthorized,
        UploadSourceError::Rejected { message } => UploadError::Rejected { message },
        UploadSourceError::Unavailable => UploadError::TemporarilyUnavailable,
        UploadSourceError::InvalidData => UploadError::DataContractViolation,
    }
}
