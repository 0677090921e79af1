use std::{env, fs, path::PathBuf};

use crate::infra::error::AppError;

const APP_DIR_NAME: &str = "studybuddy";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageLayout {
    pub data_dir: PathBuf,
}

impl StorageLayout {
    pub fn resolve() -> Result<Self, AppError> {
        let data_base = env::var_os("XDG_DATA_HOME")
            .map(PathBuf::from)
            .or_else(dirs::data_dir)
            .ok_or_else(|| AppError::StoragePathResolution {
                details: "unable to resolve data base directory (XDG_DATA_HOME/platform default)"
                    .into(),
            })?;

        Ok(Self {
            data_dir: data_base.join(APP_DIR_NAME),
        })
    }

    /// `config.toml` under the platform config dir, if one can be found.
    pub fn default_config_file() -> Option<PathBuf> {
        env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(dirs::config_dir)
            .map(|base| base.join(APP_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    pub fn ensure_dirs(&self) -> Result<(), AppError> {
        fs::create_dir_all(&self.data_dir).map_err(|source| AppError::StorageDirCreate {
            path: self.data_dir.clone(),
            source,
        })
    }

    pub fn local_store_file(&self) -> PathBuf {
        self.data_dir.join("local_storage.json")
    }

    pub fn local_store_lock_file(&self) -> PathBuf {
        self.data_dir.join("local_storage.lock")
    }
}
