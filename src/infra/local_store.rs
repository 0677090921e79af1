use std::{
    collections::BTreeMap,
    fs::{self, File, OpenOptions},
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Mutex,
};

use fs2::FileExt;

use crate::infra::{contracts::LocalStore, error::AppError, storage_layout::StorageLayout};

type Entries = BTreeMap<String, String>;

/// Local store persisted as a single JSON object on disk.
///
/// Every key is written under `namespace`, so several clients can share
/// one file. Mutations hold an exclusive lock on a sidecar file for the
/// whole read-modify-write cycle.
#[derive(Debug, Clone)]
pub struct FileLocalStore {
    path: PathBuf,
    lock_path: PathBuf,
    namespace: String,
}

impl FileLocalStore {
    pub fn new(path: PathBuf, lock_path: PathBuf, namespace: impl Into<String>) -> Self {
        Self {
            path,
            lock_path,
            namespace: namespace.into(),
        }
    }

    pub fn open(layout: &StorageLayout, namespace: &str) -> Result<Self, AppError> {
        layout.ensure_dirs()?;
        Ok(Self::new(
            layout.local_store_file(),
            layout.local_store_lock_file(),
            namespace,
        ))
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }

    fn read_entries(&self) -> Result<Entries, AppError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(source) if source.kind() == ErrorKind::NotFound => return Ok(Entries::new()),
            Err(source) => {
                return Err(AppError::LocalStoreIo {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        if raw.trim().is_empty() {
            return Ok(Entries::new());
        }

        serde_json::from_str(&raw).map_err(|source| AppError::LocalStoreCorrupt {
            path: self.path.clone(),
            source,
        })
    }

    fn write_entries(&self, entries: &Entries) -> Result<(), AppError> {
        let serialized =
            serde_json::to_string_pretty(entries).map_err(|source| AppError::LocalStoreCorrupt {
                path: self.path.clone(),
                source,
            })?;

        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, serialized).map_err(|source| self.io_error(&staging, source))?;
        fs::rename(&staging, &self.path).map_err(|source| self.io_error(&self.path, source))
    }

    fn with_lock<T>(
        &self,
        mutate: impl FnOnce(&mut Entries) -> T,
    ) -> Result<T, AppError> {
        let lock = self.acquire_lock()?;
        let mut entries = match self.read_entries() {
            Err(AppError::LocalStoreCorrupt { source, .. }) => {
                self.quarantine(&source)?;
                Entries::new()
            }
            other => other?,
        };
        let outcome = mutate(&mut entries);
        self.write_entries(&entries)?;
        drop(lock);
        Ok(outcome)
    }

    /// Moves an unreadable store aside so writes can start from scratch.
    fn quarantine(&self, reason: &serde_json::Error) -> Result<(), AppError> {
        let aside = self.path.with_extension("json.corrupt");
        tracing::warn!(
            code = "LOCAL_STORE_CORRUPT",
            path = %self.path.display(),
            moved_to = %aside.display(),
            error = %reason,
            "local store unreadable, starting empty"
        );
        fs::rename(&self.path, &aside).map_err(|source| self.io_error(&self.path, source))
    }

    fn acquire_lock(&self) -> Result<LockGuard, AppError> {
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.lock_path)
            .map_err(|source| self.io_error(&self.lock_path, source))?;
        file.lock_exclusive()
            .map_err(|source| self.io_error(&self.lock_path, source))?;

        Ok(LockGuard { file })
    }

    fn io_error(&self, path: &Path, source: std::io::Error) -> AppError {
        AppError::LocalStoreIo {
            path: path.to_path_buf(),
            source,
        }
    }
}

struct LockGuard {
    file: File,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

impl LocalStore for FileLocalStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self.read_entries()?.remove(&self.namespaced(key)))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), AppError> {
        let key = self.namespaced(key);
        self.with_lock(|entries| {
            entries.insert(key, value.to_owned());
        })
    }

    fn remove_item(&self, key: &str) -> Result<(), AppError> {
        let key = self.namespaced(key);
        self.with_lock(|entries| {
            entries.remove(&key);
        })
    }

    fn remove_prefixed(&self, prefix: &str) -> Result<usize, AppError> {
        let prefix = self.namespaced(prefix);
        self.with_lock(|entries| {
            let before = entries.len();
            entries.retain(|key, _| !key.starts_with(&prefix));
            before - entries.len()
        })
    }
}

#[derive(Debug, Default)]
pub struct MemoryLocalStore {
    entries: Mutex<Entries>,
}

impl MemoryLocalStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryLocalStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, AppError> {
        Ok(self
            .entries
            .lock()
            .map(|entries| entries.get(key).cloned())
            .unwrap_or_default())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), AppError> {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_owned(), value.to_owned());
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), AppError> {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
        Ok(())
    }

    fn remove_prefixed(&self, prefix: &str) -> Result<usize, AppError> {
        Ok(self
            .entries
            .lock()
            .map(|mut entries| {
                let before = entries.len();
                entries.retain(|key, _| !key.starts_with(prefix));
                before - entries.len()
            })
            .unwrap_or_default())
    }
}
