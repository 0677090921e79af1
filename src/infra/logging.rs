use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::infra::{config::LogConfig, error::AppError};

/// Installs the global subscriber.
///
/// Logs go to stderr so stdout stays reserved for command output. When
/// `logging.file` is configured, events are written to that file instead and
/// the returned guard must be kept alive until shutdown to flush them.
pub fn init(config: &LogConfig) -> Result<Option<WorkerGuard>, AppError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    match config.file.as_deref() {
        Some(path) => {
            let (directory, file_name) = split_log_path(path)?;
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_ansi(false)
                .with_writer(writer)
                .try_init()
                .map_err(AppError::LoggingInit)?;

            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(true)
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(AppError::LoggingInit)?;

            Ok(None)
        }
    }
}

fn split_log_path(path: &Path) -> Result<(&Path, &std::ffi::OsStr), AppError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| AppError::StoragePathResolution {
            details: format!("log file path has no file name: {}", path.display()),
        })?;
    let directory = path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    Ok((directory, file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_nested_log_path_into_dir_and_file() {
        let (dir, file) = split_log_path(Path::new("/var/log/studybuddy.log")).expect("split");

        assert_eq!(dir, Path::new("/var/log"));
        assert_eq!(file, "studybuddy.log");
    }

    #[test]
    fn bare_file_name_logs_into_working_directory() {
        let (dir, file) = split_log_path(Path::new("studybuddy.log")).expect("split");

        assert_eq!(dir, Path::new("."));
        assert_eq!(file, "studybuddy.log");
    }

    #[test]
    fn rejects_path_without_file_name() {
        assert!(split_log_path(Path::new("/")).is_err());
    }
}
