//! Client-side response cache with a fixed time-to-live.
//!
//! Entries carry the time they were stored; expiry is checked lazily at
//! read time. Reads fail soft: any storage or decoding problem is treated
//! as a miss.

use std::{sync::Arc, time::Duration};

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::infra::contracts::{Clock, LocalStore};

const CACHE_KEY_PREFIX: &str = "cache_";
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_millis(60_000);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub data: Value,
    #[serde(rename = "timestamp")]
    pub stored_at_ms: i64,
}

#[derive(Clone)]
pub struct LocalCache {
    store: Arc<dyn LocalStore>,
    clock: Arc<dyn Clock>,
    ttl_ms: i64,
}

impl LocalCache {
    pub fn new(store: Arc<dyn LocalStore>, clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        Self {
            store,
            clock,
            ttl_ms: i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX),
        }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.store.get_item(&storage_key(key)) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(error) => {
                tracing::debug!(key, error = %error, "cache read failed; treating as miss");
                return None;
            }
        };

        let entry: CacheEntry = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(error) => {
                tracing::debug!(key, error = %error, "cache entry unreadable; treating as miss");
                return None;
            }
        };

        let age_ms = self.clock.now_unix_ms().saturating_sub(entry.stored_at_ms);
        if age_ms >= self.ttl_ms {
            tracing::debug!(key, age_ms, "cache entry expired");
            return None;
        }

        match serde_json::from_value(entry.data) {
            Ok(data) => Some(data),
            Err(error) => {
                tracing::debug!(key, error = %error, "cache payload has unexpected shape");
                None
            }
        }
    }

    pub fn set<T: Serialize>(&self, key: &str, data: &T) {
        let entry = match serde_json::to_value(data) {
            Ok(data) => CacheEntry {
                data,
                stored_at_ms: self.clock.now_unix_ms(),
            },
            Err(error) => {
                tracing::warn!(key, error = %error, "cache payload could not be serialized");
                return;
            }
        };

        let result = serde_json::to_string(&entry)
            .map_err(anyhow::Error::from)
            .and_then(|raw| Ok(self.store.set_item(&storage_key(key), &raw)?));

        if let Err(error) = result {
            tracing::warn!(key, error = %error, "cache write failed");
        }
    }

    pub fn clear(&self, key: &str) {
        if let Err(error) = self.store.remove_item(&storage_key(key)) {
            tracing::warn!(key, error = %error, "cache invalidation failed");
        }
    }

    pub fn clear_all(&self) -> usize {
        match self.store.remove_prefixed(CACHE_KEY_PREFIX) {
            Ok(removed) => removed,
            Err(error) => {
                tracing::warn!(error = %error, "cache purge failed");
                0
            }
        }
    }
}

fn storage_key(key: &str) -> String {
    format!("{CACHE_KEY_PREFIX}{key}")
}
