//! Token 估算模块：为缓存节省统计和最小长度过滤提供粗略的 Token 计数。
//!
//! # Token Estimation Module
//!
//! Rough token counts used by the cache for two heuristics: the estimated
//! savings recorded on every hit, and the minimum response size a write
//! must reach.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`TokenCounter`] | Trait for token counting implementations |
//! | [`CharacterEstimator`] | Character-based approximation (4 chars ≈ 1 token) |
//!
//! ```rust
//! use ai_cache_rust::tokens::{CharacterEstimator, TokenCounter};
//!
//! let counter = CharacterEstimator::new();
//! assert_eq!(counter.count("Hello, world"), 3);
//! ```

mod counter;

pub use counter::{CharacterEstimator, TokenCounter};
