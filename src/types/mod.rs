//! 类型模块：缓存所消费的请求与响应数据类型。
//!
//! # Types Module
//!
//! The request and response values flowing through the cache. The cache does
//! not interpret them beyond what keying and size heuristics require.
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`LlmRequest`] | Model id, ordered turns and generation parameters |
//! | [`Content`] | One conversation turn (role + parts) |
//! | [`Part`] | Text or non-text piece of a turn |
//! | [`GenerationConfig`] | Sampling parameters that participate in the key |
//! | [`LlmResponse`] | Response text and/or structured content |
//!
//! ## Example
//!
//! ```rust
//! use ai_cache_rust::types::{Content, GenerationConfig, LlmRequest};
//!
//! let request = LlmRequest::new("gemini-2.0-flash")
//!     .with_content(Content::user("What is the capital of France?"))
//!     .with_config(GenerationConfig::new().with_temperature(0.2));
//! assert_eq!(request.text_parts().count(), 1);
//! ```

pub mod request;
pub mod response;

pub use request::{Blob, Content, GenerationConfig, LlmRequest, Part};
pub use response::LlmResponse;
