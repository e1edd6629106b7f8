//! Request-lifecycle hooks that put the cache in front of the model call.
//!
//! The agent pipeline calls [`CacheInterceptor::before_call`] with the request
//! it is about to send. A [`BeforeCall::Cached`] result means "serve this, skip
//! the model". On [`BeforeCall::Proceed`] the pipeline calls the model and then
//! hands the response to [`CacheInterceptor::after_call`], which may write it
//! back. [`CacheInterceptor::execute`] wires the three steps around an async
//! closure.
//!
//! Per-request state lives in a [`CallbackContext`]: a string-keyed state map
//! (holding the pending-write marker between the two hooks) and the session's
//! local cache tier.

use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::cache::{BypassPolicy, CacheKey, CacheKeyGenerator, LocalCache, MinSizeFilter, TwoLevelCache};
use crate::types::{LlmRequest, LlmResponse};
use crate::Result;

/// State key of the pending-write marker.
pub const PENDING_CACHE_KEY: &str = "pending_cache_key";

/// Request/session-scoped context handed to both hooks.
///
/// Owns the session's local tier, so it cannot be cloned into a second
/// session:
///
/// ```compile_fail
/// use ai_cache_rust::{CallbackContext, LocalCache};
/// let ctx = CallbackContext::new(LocalCache::new(8));
/// let _copy = ctx.clone();
/// ```
#[derive(Debug)]
pub struct CallbackContext {
    pub invocation_id: String,
    state: HashMap<String, Value>,
    local_cache: LocalCache,
}

impl CallbackContext {
    pub fn new(local_cache: LocalCache) -> Self {
        Self {
            invocation_id: Uuid::new_v4().to_string(),
            state: HashMap::new(),
            local_cache,
        }
    }

    pub fn get_state(&self, key: &str) -> Option<&Value> {
        self.state.get(key)
    }

    pub fn set_state(&mut self, key: impl Into<String>, value: Value) {
        self.state.insert(key.into(), value);
    }

    pub fn take_state(&mut self, key: &str) -> Option<Value> {
        self.state.remove(key)
    }

    pub fn local_cache(&self) -> &LocalCache {
        &self.local_cache
    }

    pub fn local_cache_mut(&mut self) -> &mut LocalCache {
        &mut self.local_cache
    }

    /// Key recorded by a miss in `before_call`, not yet consumed.
    pub fn pending_cache_key(&self) -> Option<CacheKey> {
        self.get_state(PENDING_CACHE_KEY)
            .and_then(Value::as_str)
            .map(CacheKey::from)
    }
}

/// Outcome of the pre-call hook.
#[derive(Debug, Clone, PartialEq)]
pub enum BeforeCall {
    /// Serve this response; the model must not be called.
    Cached(LlmResponse),
    /// Call the model.
    Proceed,
}

/// Cache hooks for one coordinator, shared by every session.
pub struct CacheInterceptor {
    cache: Arc<TwoLevelCache>,
    keys: CacheKeyGenerator,
    bypass: BypassPolicy,
    min_size: MinSizeFilter,
}

impl CacheInterceptor {
    /// Policies are taken from the coordinator's configuration.
    pub fn new(cache: Arc<TwoLevelCache>) -> Self {
        let bypass = cache.config().bypass_policy();
        let min_size = cache.config().min_size_filter();
        Self {
            cache,
            keys: CacheKeyGenerator::new(),
            bypass,
            min_size,
        }
    }

    pub fn with_key_generator(mut self, keys: CacheKeyGenerator) -> Self {
        self.keys = keys;
        self
    }

    pub fn cache(&self) -> &Arc<TwoLevelCache> {
        &self.cache
    }

    /// Fresh context with an empty local tier sized from the config.
    pub fn new_context(&self) -> CallbackContext {
        CallbackContext::new(self.cache.new_local_cache())
    }

    /// Pre-call hook.
    ///
    /// A derivation error (malformed request) is returned before anything is
    /// looked up or recorded; the context is left without a marker.
    pub async fn before_call(
        &self,
        ctx: &mut CallbackContext,
        request: &LlmRequest,
    ) -> Result<BeforeCall> {
        if !self.cache.config().enabled {
            return Ok(BeforeCall::Proceed);
        }
        // A marker left by a call whose post-hook never ran must not leak into this one.
        if ctx.take_state(PENDING_CACHE_KEY).is_some() {
            debug!(invocation_id = %ctx.invocation_id, "discarded stale pending cache key");
        }
        if let Some(term) = self.bypass.matched_term(request) {
            debug!(invocation_id = %ctx.invocation_id, term, "llm cache bypassed for time-sensitive request");
            return Ok(BeforeCall::Proceed);
        }

        let key = self.keys.derive(request)?;
        match self.cache.get(&key, ctx.local_cache_mut()).await {
            Some(resp) => Ok(BeforeCall::Cached(resp)),
            None => {
                ctx.set_state(PENDING_CACHE_KEY, Value::String(key.to_string()));
                Ok(BeforeCall::Proceed)
            }
        }
    }

    /// Post-call hook. Always returns `response` unchanged.
    pub async fn after_call(
        &self,
        ctx: &mut CallbackContext,
        request: &LlmRequest,
        response: LlmResponse,
    ) -> LlmResponse {
        if !self.cache.config().enabled {
            return response;
        }
        let key = match ctx.take_state(PENDING_CACHE_KEY) {
            Some(Value::String(k)) => CacheKey::from(k),
            _ => return response,
        };
        if self.bypass.should_bypass(request) {
            return response;
        }
        if !self.min_size.accepts(&response) {
            debug!(
                key = key.short(),
                min_chars = self.min_size.min_chars(),
                "llm response too short to cache"
            );
            return response;
        }
        let ttl = self.cache.config().ttl;
        self.cache
            .put(&key, &response, ctx.local_cache_mut(), ttl)
            .await;
        response
    }

    /// Run `call` between the two hooks; `call` is skipped on a cache hit.
    ///
    /// If `call` fails the pending marker is cleared and the error returned.
    pub async fn execute<F, Fut>(
        &self,
        ctx: &mut CallbackContext,
        request: &LlmRequest,
        call: F,
    ) -> Result<LlmResponse>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<LlmResponse>>,
    {
        match self.before_call(ctx, request).await? {
            BeforeCall::Cached(resp) => Ok(resp),
            BeforeCall::Proceed => match call().await {
                Ok(resp) => Ok(self.after_call(ctx, request, resp).await),
                Err(e) => {
                    ctx.take_state(PENDING_CACHE_KEY);
                    Err(e)
                }
            },
        }
    }
}
