use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to read config file at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid `{key}` in config file at {path}: {reason}")]
    ConfigInvalid {
        path: PathBuf,
        key: &'static str,
        reason: String,
    },
    #[error("failed to initialize logging: {0}")]
    LoggingInit(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
    #[error("failed to resolve storage path: {details}")]
    StoragePathResolution { details: String },
    #[error("failed to create storage directory at {path}: {source}")]
    StorageDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("local store I/O failed at {path}: {source}")]
    LocalStoreIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("local store at {path} is corrupt: {source}")]
    LocalStoreCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to build http client: {0}")]
    HttpClientBuild(#[source] reqwest::Error),
    #[error("failed to start async runtime: {0}")]
    RuntimeBuild(#[source] std::io::Error),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
