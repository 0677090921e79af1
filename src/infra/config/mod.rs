mod adapter;
mod app_config;
mod file_config;
mod loader;

pub use adapter::FileConfigAdapter;
pub use app_config::{ApiConfig, AppConfig, CacheConfig, ChatConfig, LogConfig, StorageConfig};
pub(crate) use loader::load_from;
