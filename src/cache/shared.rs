//! Fail-soft wrapper around a [`SharedStore`].

use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::backend::SharedStore;
use super::entry;
use super::key::CacheKey;
use crate::types::LlmResponse;

/// Shared tier as seen by the coordinator.
///
/// Store errors, timeouts and undecodable values all collapse to "miss" (read)
/// or "not written" (write) after a `warn!`. Nothing here returns an error.
#[derive(Clone)]
pub struct SharedTier {
    store: Arc<dyn SharedStore>,
    key_prefix: String,
    timeout: Duration,
}

impl SharedTier {
    pub fn new(store: Arc<dyn SharedStore>) -> Self {
        Self {
            store,
            key_prefix: String::new(),
            timeout: Duration::from_secs(2),
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.name()
    }

    /// Key as written to the store: `<prefix>:<hex>`, or the bare hex without a prefix.
    pub fn store_key(&self, key: &CacheKey) -> String {
        if self.key_prefix.is_empty() {
            key.as_str().to_string()
        } else {
            format!("{}:{}", self.key_prefix, key)
        }
    }

    pub async fn try_get(&self, key: &CacheKey) -> Option<LlmResponse> {
        let store_key = self.store_key(key);
        let raw = match timeout(self.timeout, self.store.get(&store_key)).await {
            Ok(Ok(Some(raw))) => raw,
            Ok(Ok(None)) => return None,
            Ok(Err(e)) => {
                warn!(backend = self.backend_name(), key = key.short(), error = %e, "shared cache read failed");
                return None;
            }
            Err(_) => {
                warn!(
                    backend = self.backend_name(),
                    key = key.short(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "shared cache read timed out"
                );
                return None;
            }
        };
        match entry::decode(&raw) {
            Ok(resp) => Some(resp),
            Err(e) => {
                warn!(backend = self.backend_name(), key = key.short(), error = %e, "shared cache entry is corrupt");
                None
            }
        }
    }

    /// Returns whether the value reached the store.
    pub async fn try_put(&self, key: &CacheKey, response: &LlmResponse, ttl: Duration) -> bool {
        let raw = match entry::encode(response) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key = key.short(), error = %e, "shared cache entry could not be encoded");
                return false;
            }
        };
        let store_key = self.store_key(key);
        match timeout(self.timeout, self.store.set_ex(&store_key, &raw, ttl)).await {
            Ok(Ok(())) => {
                debug!(backend = self.backend_name(), key = key.short(), ttl_secs = ttl.as_secs(), "shared cache write");
                true
            }
            Ok(Err(e)) => {
                warn!(backend = self.backend_name(), key = key.short(), error = %e, "shared cache write failed");
                false
            }
            Err(_) => {
                warn!(
                    backend = self.backend_name(),
                    key = key.short(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    "shared cache write timed out"
                );
                false
            }
        }
    }

    pub async fn try_delete(&self, key: &CacheKey) -> bool {
        let store_key = self.store_key(key);
        match timeout(self.timeout, self.store.delete(&store_key)).await {
            Ok(Ok(removed)) => removed,
            Ok(Err(e)) => {
                warn!(backend = self.backend_name(), key = key.short(), error = %e, "shared cache delete failed");
                false
            }
            Err(_) => {
                warn!(backend = self.backend_name(), key = key.short(), "shared cache delete timed out");
                false
            }
        }
    }
}
