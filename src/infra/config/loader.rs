use std::{fs, io::ErrorKind, path::Path};

use crate::infra::{
    config::{file_config::FileConfig, AppConfig},
    error::AppError,
};

/// Layers the TOML file at `path` over the built-in defaults.
///
/// A missing file is not an error; the client then runs on defaults.
pub(crate) fn load_from(path: &Path) -> Result<AppConfig, AppError> {
    let mut config = AppConfig::default();

    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(source) if source.kind() == ErrorKind::NotFound => return Ok(config),
        Err(source) => {
            return Err(AppError::ConfigRead {
                path: path.to_path_buf(),
                source,
            })
        }
    };

    toml::from_str::<FileConfig>(&raw)
        .map_err(|source| AppError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?
        .merge_into(&mut config);

    check(&config).map_err(|(key, reason)| AppError::ConfigInvalid {
        path: path.to_path_buf(),
        key,
        reason,
    })?;

    Ok(config)
}

fn check(config: &AppConfig) -> Result<(), (&'static str, String)> {
    let base_url = config.api.base_url.as_str();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(("api.base_url", format!("expected an http(s) URL, got {base_url:?}")));
    }
    if config.api.timeout_ms == 0 {
        return Err(("api.timeout_ms", "must be greater than zero".to_owned()));
    }
    if config.storage.namespace.trim().is_empty() {
        return Err(("storage.namespace", "must not be empty".to_owned()));
    }
    Ok(())
}
