//! cache-demo — 演示两级缓存的命中/未命中流程并输出统计信息
//!
//! Runs a short scripted conversation through the cache hooks against a fake
//! model, then prints the telemetry report as JSON.
//!
//! Usage:
//!   RUST_LOG=ai_cache_rust=debug cache-demo
//!
//! Configuration is read from the `LLM_CACHE_*` environment variables. Without
//! a shared store URL, an in-process store stands in for the shared tier so
//! promotion between sessions is visible.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ai_cache_rust::cache::MemoryStore;
use ai_cache_rust::types::{Content, LlmRequest, LlmResponse};
use ai_cache_rust::{CacheConfig, CacheInterceptor, TwoLevelCache};
use anyhow::Context;
use tracing_subscriber::EnvFilter;

const SHORT_ANSWER: &str = "4";
const LONG_ANSWER: &str = "The answer to 2+2 is 4. Addition combines two quantities into a \
    single total; counting two items and then two more gives four items in all. This holds in \
    every positional numeral system with a digit for four, and it is usually one of the first \
    arithmetic facts taught.";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = CacheConfig::from_env().context("loading cache configuration")?;
    let cache = if config.shared_store_url.is_some() {
        TwoLevelCache::from_config(config).await
    } else {
        TwoLevelCache::new(config).with_shared_store(Arc::new(MemoryStore::default()))
    };
    let hooks = CacheInterceptor::new(Arc::new(cache));

    let request = LlmRequest::from_json(&serde_json::json!({
        "model": "m1",
        "contents": [{"role": "user", "parts": [{"text": "What is 2+2?"}]}]
    }))?;
    let model_calls = AtomicUsize::new(0);

    println!("== short answer (never cached)");
    let mut session = hooks.new_context();
    for round in 1..=2 {
        let resp = hooks
            .execute(&mut session, &request, || fake_model(&model_calls, SHORT_ANSWER))
            .await?;
        println!("round {round}: {:?}", resp.text.as_deref().unwrap_or(""));
    }

    println!("== long answer (cached after first call)");
    let mut session = hooks.new_context();
    for round in 1..=2 {
        let resp = hooks
            .execute(&mut session, &request, || fake_model(&model_calls, LONG_ANSWER))
            .await?;
        println!("round {round}: {} chars", resp.text.as_deref().unwrap_or("").len());
    }

    println!("== new session (served from shared tier)");
    let mut other = hooks.new_context();
    hooks
        .execute(&mut other, &request, || fake_model(&model_calls, LONG_ANSWER))
        .await?;
    println!("promoted into new session: {}", !other.local_cache().is_empty());

    println!("== model calls: {}", model_calls.load(Ordering::SeqCst));
    hooks.cache().telemetry().log_summary();
    let report = hooks.cache().telemetry().get_stats();
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn fake_model(calls: &AtomicUsize, answer: &str) -> ai_cache_rust::Result<LlmResponse> {
    calls.fetch_add(1, Ordering::SeqCst);
    Ok(LlmResponse::from_text(answer))
}
