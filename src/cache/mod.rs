//! 响应缓存模块：会话级本地缓存 + 可选共享存储的两级 LLM 响应缓存。
//!
//! # Response Caching Module
//!
//! A two-level cache for LLM responses: a bounded, session-owned local tier in
//! front of an optional shared key-value tier, with a deterministic request
//! key and a policy deciding which requests may be cached at all.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`TwoLevelCache`] | Read/write coordinator across both tiers, owns telemetry |
//! | [`LocalCache`] | Session-scoped FIFO-bounded tier |
//! | [`SharedStore`] | Trait for shared key-value stores with TTL |
//! | [`SharedTier`] | Fail-soft wrapper: store errors become misses |
//! | [`MemoryStore`] | In-process shared store with TTL |
//! | [`NullStore`] | No-op store |
//! | `RedisStore` | Redis store (`redis` feature) |
//! | [`CacheKeyGenerator`] | Request → SHA-256 [`CacheKey`] |
//! | [`BypassPolicy`] | Skips time-sensitive requests |
//! | [`MinSizeFilter`] | Skips writing short responses |
//!
//! ## Example
//!
//! ```rust
//! use ai_cache_rust::cache::{CacheKeyGenerator, TwoLevelCache};
//! use ai_cache_rust::config::CacheConfig;
//! use ai_cache_rust::types::{Content, LlmRequest, LlmResponse};
//!
//! # tokio_test::block_on(async {
//! let cache = TwoLevelCache::new(CacheConfig::default());
//! let mut local = cache.new_local_cache();
//!
//! let request = LlmRequest::new("m1").with_content(Content::user("What is 2+2?"));
//! let key = CacheKeyGenerator::new().derive(&request).unwrap();
//! cache.put(&key, &LlmResponse::from_text("4"), &mut local, cache.config().ttl).await;
//! assert!(cache.get(&key, &mut local).await.is_some());
//! # });
//! ```
//!
//! ## Failure model
//!
//! The shared tier is best-effort. Connection errors, timeouts and corrupt
//! values are logged and treated as misses (reads) or dropped (writes); the
//! cache keeps working local-only.

mod backend;
mod entry;
mod key;
mod local;
mod manager;
mod policy;
#[cfg(feature = "redis")]
mod redis_store;
mod shared;

pub use backend::{MemoryStore, NullStore, SharedStore};
pub use entry::{decode as decode_entry, encode as encode_entry};
pub use key::{CacheKey, CacheKeyGenerator};
pub use local::LocalCache;
pub use manager::TwoLevelCache;
pub use policy::{BypassPolicy, MinSizeFilter, DEFAULT_BYPASS_TERMS};
#[cfg(feature = "redis")]
pub use redis_store::RedisStore;
pub use shared::SharedTier;
