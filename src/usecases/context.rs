use std::{sync::Arc, time::Duration};

use tracing_appender::non_blocking::WorkerGuard;

use crate::{
    api::{adapters::StudyBuddyApi, client::ApiClient},
    infra::{
        cache::LocalCache,
        config::AppConfig,
        contracts::{Clock, LocalStore},
        credentials::AuthState,
        error::AppError,
    },
};

/// Long-lived services shared by every command.
pub struct AppContext {
    pub config: AppConfig,
    pub clock: Arc<dyn Clock>,
    pub auth: AuthState,
    pub cache: LocalCache,
    pub backend: StudyBuddyApi,
    _log_guard: Option<WorkerGuard>,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn LocalStore>,
        clock: Arc<dyn Clock>,
        log_guard: Option<WorkerGuard>,
    ) -> Result<Self, AppError> {
        let auth = AuthState::new(store.clone(), clock.clone());
        let cache = LocalCache::new(
            store,
            clock.clone(),
            Duration::from_millis(config.cache.ttl_ms),
        );
        let api = ApiClient::new(&config.api, Arc::new(auth.clone()))?;

        Ok(Self {
            backend: StudyBuddyApi::new(api, auth.clone()),
            config,
            clock,
            auth,
            cache,
            _log_guard: log_guard,
        })
    }
}
