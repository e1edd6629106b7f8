//! Two-level cache coordinator.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::backend::SharedStore;
use super::key::CacheKey;
use super::local::LocalCache;
use super::shared::SharedTier;
use crate::config::CacheConfig;
use crate::telemetry::CacheTelemetry;
use crate::tokens::{CharacterEstimator, TokenCounter};
use crate::types::LlmResponse;

/// Coordinates a caller-owned [`LocalCache`] with an optional [`SharedTier`].
///
/// One instance is built at startup and shared (behind an `Arc`) by every
/// session. The local tier is passed in per call because it belongs to the
/// session; the shared tier and telemetry belong to the coordinator.
///
/// Reads go local → shared; a shared hit is promoted into the local tier.
/// Writes always land locally and then, best-effort, in the shared tier.
/// There is no cross-process invalidation: the shared tier is
/// last-writer-wins and a local entry may disagree with it until it is
/// evicted or overwritten.
pub struct TwoLevelCache {
    config: CacheConfig,
    shared: Option<SharedTier>,
    telemetry: Arc<CacheTelemetry>,
    estimator: CharacterEstimator,
}

impl TwoLevelCache {
    /// Local-only coordinator.
    pub fn new(config: CacheConfig) -> Self {
        let telemetry = Arc::new(CacheTelemetry::with_top_entries(config.top_entries));
        Self {
            config,
            shared: None,
            telemetry,
            estimator: CharacterEstimator::new(),
        }
    }

    /// Attach a shared store, namespaced and time-bounded per the config.
    pub fn with_shared_store(mut self, store: Arc<dyn SharedStore>) -> Self {
        self.shared = Some(
            SharedTier::new(store)
                .with_key_prefix(self.config.key_prefix.clone())
                .with_timeout(self.config.shared_timeout),
        );
        self
    }

    /// Build from configuration, connecting to `shared_store_url` when set.
    ///
    /// A store that cannot be reached is logged and skipped; the coordinator
    /// then runs local-only.
    pub async fn from_config(config: CacheConfig) -> Self {
        let url = config.shared_store_url.clone();
        let cache = Self::new(config);
        match url {
            Some(url) => cache.connect_shared(&url).await,
            None => {
                info!("llm cache running local-only (no shared store configured)");
                cache
            }
        }
    }

    #[cfg(feature = "redis")]
    async fn connect_shared(self, url: &str) -> Self {
        use super::redis_store::RedisStore;
        let connect = async {
            let store = RedisStore::connect(url).await?;
            store.ping().await?;
            Ok::<_, crate::Error>(store)
        };
        match tokio::time::timeout(self.config.shared_timeout, connect).await {
            Ok(Ok(store)) => {
                info!(backend = "redis", "llm cache shared tier enabled");
                self.with_shared_store(Arc::new(store))
            }
            Ok(Err(e)) => {
                warn!(error = %e, "shared cache unavailable, continuing local-only");
                self
            }
            Err(_) => {
                warn!("shared cache connection timed out, continuing local-only");
                self
            }
        }
    }

    #[cfg(not(feature = "redis"))]
    async fn connect_shared(self, _url: &str) -> Self {
        warn!("shared store URL configured but the `redis` feature is disabled, continuing local-only");
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn telemetry(&self) -> &Arc<CacheTelemetry> {
        &self.telemetry
    }

    pub fn has_shared_tier(&self) -> bool {
        self.shared.is_some()
    }

    pub fn shared_backend_name(&self) -> Option<&'static str> {
        self.shared.as_ref().map(|s| s.backend_name())
    }

    /// Empty local tier sized for this coordinator, for a new session.
    pub fn new_local_cache(&self) -> LocalCache {
        LocalCache::new(self.config.max_local_entries)
    }

    pub async fn get(&self, key: &CacheKey, local: &mut LocalCache) -> Option<LlmResponse> {
        let start = Instant::now();

        if let Some(resp) = local.get(key) {
            let resp = resp.clone();
            self.record_hit(key, start, &resp, "local");
            return Some(resp);
        }

        if let Some(ref shared) = self.shared {
            if let Some(resp) = shared.try_get(key).await {
                local.put(key.clone(), resp.clone());
                self.record_hit(key, start, &resp, "shared");
                return Some(resp);
            }
        }

        let latency = start.elapsed();
        self.telemetry.record_miss(key, latency);
        debug!(key = key.short(), latency_ms = latency.as_millis() as u64, "llm cache miss");
        None
    }

    pub async fn put(
        &self,
        key: &CacheKey,
        response: &LlmResponse,
        local: &mut LocalCache,
        ttl: Duration,
    ) {
        if let Some(evicted) = local.put(key.clone(), response.clone()) {
            debug!(evicted = evicted.short(), "local cache full, evicted oldest entry");
        }
        if let Some(ref shared) = self.shared {
            shared.try_put(key, response, ttl).await;
        }
        debug!(key = key.short(), ttl_secs = ttl.as_secs(), "llm cache write");
    }

    /// Drop `key` from the local tier and, best-effort, from the shared tier.
    pub async fn invalidate(&self, key: &CacheKey, local: &mut LocalCache) -> bool {
        let mut removed = local.remove(key).is_some();
        if let Some(ref shared) = self.shared {
            removed |= shared.try_delete(key).await;
        }
        removed
    }

    fn record_hit(&self, key: &CacheKey, start: Instant, resp: &LlmResponse, tier: &'static str) {
        let latency = start.elapsed();
        let tokens = self.estimator.count_response(resp);
        self.telemetry.record_hit(key, latency, tokens);
        debug!(
            key = key.short(),
            tier,
            latency_ms = latency.as_millis() as u64,
            estimated_tokens = tokens,
            "llm cache hit"
        );
    }
}
