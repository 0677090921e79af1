//! Infrastructure layer: config, logging, persisted client state, and OS integration.

pub mod cache;
pub mod clock;
pub mod config;
pub mod contracts;
pub mod credentials;
pub mod error;
pub mod local_store;
pub mod logging;
pub mod secrets;
pub mod storage_layout;
