use std::{path::Path, sync::Arc};

use crate::{
    infra::{
        self, clock::SystemClock, config::FileConfigAdapter, contracts::ConfigAdapter,
        error::AppError, local_store::FileLocalStore, storage_layout::StorageLayout,
    },
    usecases::context::AppContext,
};

pub fn bootstrap(config_path: Option<&Path>) -> Result<AppContext, AppError> {
    let config = FileConfigAdapter::new(config_path)
        .load()
        .map_err(AppError::Other)?;
    let log_guard = infra::logging::init(&config.logging)?;

    let layout = StorageLayout::resolve()?;
    let store = FileLocalStore::open(&layout, &config.storage.namespace)?;
    tracing::debug!(data_dir = %layout.data_dir.display(), "local store opened");

    AppContext::new(config, Arc::new(store), Arc::new(SystemClock), log_guard)
}
