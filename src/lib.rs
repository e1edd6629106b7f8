//! # ai-cache-rust
//!
//! 面向 Agent 运行时的两级 LLM 响应缓存：会话级本地缓存 + 可选共享存储。
//!
//! Two-level LLM response cache for agent runtimes.
//!
//! ## Overview
//!
//! Sits between an agent pipeline and the model call. Each request is checked
//! against a time-sensitivity policy, reduced to a deterministic key, and
//! looked up in a session-local tier and then an optional shared tier (Redis
//! or any store with per-key TTL). Hits skip the model call; misses are written
//! back after the call when the response is large enough to be worth keeping.
//!
//! ## Core Properties
//!
//! - **Deterministic keys**: SHA-256 over a canonical form of model, turns and
//!   scalar generation parameters
//! - **Never stale on time-sensitive queries**: requests mentioning time,
//!   weather, "latest" and similar are never cached
//! - **Fail-soft shared tier**: store outages degrade to local-only caching
//! - **Explicit ownership**: the coordinator is constructed once and passed
//!   around; the local tier belongs to the session context
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use ai_cache_rust::{CacheConfig, CacheInterceptor, TwoLevelCache};
//! use ai_cache_rust::types::{Content, LlmRequest, LlmResponse};
//!
//! # tokio_test::block_on(async {
//! let cache = Arc::new(TwoLevelCache::from_config(CacheConfig::default()).await);
//! let hooks = CacheInterceptor::new(cache.clone());
//! let mut ctx = hooks.new_context();
//!
//! let request = LlmRequest::new("m1").with_content(Content::user("Explain ownership in Rust"));
//! let response = hooks
//!     .execute(&mut ctx, &request, || async {
//!         Ok::<_, ai_cache_rust::Error>(LlmResponse::from_text("Ownership is ...".repeat(20)))
//!     })
//!     .await
//!     .unwrap();
//! assert!(response.text.is_some());
//! # });
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`cache`] | Key derivation, policies, local/shared tiers, coordinator |
//! | [`interceptors`] | Pre-/post-call hooks and the request context |
//! | [`telemetry`] | Hit/miss counters, latency and savings accounting |
//! | [`config`] | Configuration and environment loading |
//! | [`tokens`] | Character-based token estimation |
//! | [`types`] | Request/response types |

pub mod cache;
pub mod config;
pub mod interceptors;
pub mod telemetry;
pub mod tokens;
pub mod types;

// Re-export main types for convenience
pub use cache::{CacheKey, CacheKeyGenerator, LocalCache, SharedStore, TwoLevelCache};
pub use config::CacheConfig;
pub use interceptors::{BeforeCall, CacheInterceptor, CallbackContext};
pub use telemetry::{CacheStats, CacheStatsReport, CacheTelemetry};
pub use types::{LlmRequest, LlmResponse};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
