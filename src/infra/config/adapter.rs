use std::{
    env,
    path::{Path, PathBuf},
};

use anyhow::Result;

use crate::infra::{
    config::{load_from, AppConfig},
    contracts::ConfigAdapter,
    storage_layout::StorageLayout,
};

const CONFIG_ENV: &str = "STUDYBUDDY_CONFIG";
const LOCAL_CONFIG: &str = "config.toml";

/// Locates the StudyBuddy config file and loads it.
///
/// Lookup order: `--config`, `$STUDYBUDDY_CONFIG`, `./config.toml`, then
/// `studybuddy/config.toml` under the platform config dir.
#[derive(Debug, Clone, Default)]
pub struct FileConfigAdapter {
    explicit: Option<PathBuf>,
}

impl FileConfigAdapter {
    pub fn new(explicit: Option<&Path>) -> Self {
        Self {
            explicit: explicit.map(Path::to_path_buf),
        }
    }

    pub fn resolve_path(&self) -> PathBuf {
        if let Some(path) = &self.explicit {
            return path.clone();
        }

        if let Some(path) = env::var_os(CONFIG_ENV).filter(|value| !value.is_empty()) {
            return PathBuf::from(path);
        }

        let local = PathBuf::from(LOCAL_CONFIG);
        if local.exists() {
            return local;
        }

        StorageLayout::default_config_file().unwrap_or(local)
    }
}

impl ConfigAdapter for FileConfigAdapter {
    fn load(&self) -> Result<AppConfig> {
        Ok(load_from(&self.resolve_path())?)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::test_support::env_lock;

    fn with_env<T>(key: &str, value: Option<&Path>, run: impl FnOnce() -> T) -> T {
        let old = env::var_os(key);
        match value {
            // SAFETY: callers hold the process-wide env lock.
            Some(value) => unsafe { env::set_var(key, value) },
            // SAFETY: callers hold the process-wide env lock.
            None => unsafe { env::remove_var(key) },
        }

        let outcome = run();

        match old {
            // SAFETY: restoring env while guard is held.
            Some(old) => unsafe { env::set_var(key, old) },
            // SAFETY: restoring env while guard is held.
            None => unsafe { env::remove_var(key) },
        }
        outcome
    }

    #[test]
    fn explicit_path_wins_over_environment() {
        let _guard = env_lock();
        let dir = tempfile::tempdir().expect("temp dir");
        let explicit = dir.path().join("explicit.toml");

        let resolved = with_env(CONFIG_ENV, Some(&dir.path().join("env.toml")), || {
            FileConfigAdapter::new(Some(&explicit)).resolve_path()
        });

        assert_eq!(resolved, explicit);
    }

    #[test]
    fn environment_variable_selects_config_file() {
        let _guard = env_lock();
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("env.toml");
        fs::write(&path, "[cache]\nttl_ms = 1234\n").expect("write");

        let config = with_env(CONFIG_ENV, Some(&path), || {
            FileConfigAdapter::default().load()
        })
        .expect("config must load");

        assert_eq!(config.cache.ttl_ms, 1_234);
    }

    #[test]
    fn falls_back_to_platform_config_dir() {
        let _guard = env_lock();
        let dir = tempfile::tempdir().expect("temp dir");

        let resolved = with_env(CONFIG_ENV, None, || {
            with_env("XDG_CONFIG_HOME", Some(dir.path()), || {
                FileConfigAdapter::default().resolve_path()
            })
        });

        if !Path::new(LOCAL_CONFIG).exists() {
            assert_eq!(resolved, dir.path().join("studybuddy").join("config.toml"));
        }
    }
}
