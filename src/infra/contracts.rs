use anyhow::Result;

use crate::infra::{config::AppConfig, error::AppError};

pub trait ConfigAdapter {
    fn load(&self) -> Result<AppConfig>;
}

/// String key/value storage that survives between runs, shaped after a
/// browser's local storage.
pub trait LocalStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, AppError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), AppError>;
    fn remove_item(&self, key: &str) -> Result<(), AppError>;
    /// Removes every key starting with `prefix`. Returns how many were removed.
    fn remove_prefixed(&self, prefix: &str) -> Result<usize, AppError>;
}

pub trait Clock: Send + Sync {
    fn now_unix_ms(&self) -> i64;
}
