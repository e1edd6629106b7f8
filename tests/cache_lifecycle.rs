//! Hook lifecycle and end-to-end caching behaviour.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ai_cache_rust::cache::{CacheKeyGenerator, MemoryStore};
use ai_cache_rust::interceptors::PENDING_CACHE_KEY;
use ai_cache_rust::types::{Content, LlmRequest, LlmResponse};
use ai_cache_rust::{BeforeCall, CacheConfig, CacheInterceptor, Error, TwoLevelCache};
use serde_json::json;

fn two_plus_two() -> LlmRequest {
    LlmRequest::from_json(&json!({
        "model": "m1",
        "contents": [{"role": "user", "parts": [{"text": "What is 2+2?"}]}]
    }))
    .unwrap()
}

const SPEC_LONG_ANSWER: &str =
    "The answer to 2+2 is 4, a basic arithmetic fact covering addition of small integers.";

fn long_answer() -> String {
    format!("{} {}", SPEC_LONG_ANSWER, "Adding two and two always yields four. ".repeat(4))
}

async fn run(
    hooks: &CacheInterceptor,
    ctx: &mut ai_cache_rust::CallbackContext,
    request: &LlmRequest,
    calls: &AtomicUsize,
    answer: &str,
) -> LlmResponse {
    hooks
        .execute(ctx, request, || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, Error>(LlmResponse::from_text(answer))
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_short_answer_is_never_cached() {
    let hooks = CacheInterceptor::new(Arc::new(TwoLevelCache::new(CacheConfig::default())));
    let mut ctx = hooks.new_context();
    let calls = AtomicUsize::new(0);
    let req = two_plus_two();

    let first = run(&hooks, &mut ctx, &req, &calls, "4").await;
    let second = run(&hooks, &mut ctx, &req, &calls, "4").await;
    assert_eq!(first.text.as_deref(), Some("4"));
    assert_eq!(second.text.as_deref(), Some("4"));
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let report = hooks.cache().telemetry().get_stats();
    let stats = report.stats().unwrap();
    assert_eq!((stats.hits, stats.misses), (0, 2));
}

#[tokio::test]
async fn test_long_answer_is_served_from_cache() {
    let hooks = CacheInterceptor::new(Arc::new(TwoLevelCache::new(CacheConfig::default())));
    let mut ctx = hooks.new_context();
    let calls = AtomicUsize::new(0);
    let req = two_plus_two();
    let answer = long_answer();
    assert!(answer.chars().count() >= 200);

    let first = run(&hooks, &mut ctx, &req, &calls, &answer).await;
    let second = run(&hooks, &mut ctx, &req, &calls, "a different answer").await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(second, first);
    assert_eq!(second.text.as_deref(), Some(answer.as_str()));

    let report = hooks.cache().telemetry().get_stats();
    let stats = report.stats().unwrap();
    assert_eq!((stats.hits, stats.misses), (1, 1));
    assert_eq!(stats.estimated_token_savings, (answer.chars().count() / 4) as u64);
    assert!((stats.hit_rate - 0.5).abs() < 1e-9);
}

#[tokio::test]
async fn test_threshold_is_configurable() {
    // 84 characters: below the default 200-character floor, above 20 tokens * 4.
    let cfg = CacheConfig::default().with_min_tokens_to_cache(20);
    let hooks = CacheInterceptor::new(Arc::new(TwoLevelCache::new(cfg)));
    let mut ctx = hooks.new_context();
    let calls = AtomicUsize::new(0);
    let req = two_plus_two();

    run(&hooks, &mut ctx, &req, &calls, SPEC_LONG_ANSWER).await;
    let cached = run(&hooks, &mut ctx, &req, &calls, "other").await;
    assert_eq!(cached.text.as_deref(), Some(SPEC_LONG_ANSWER));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_pending_marker_lifecycle() {
    let hooks = CacheInterceptor::new(Arc::new(TwoLevelCache::new(CacheConfig::default())));
    let mut ctx = hooks.new_context();
    let req = two_plus_two();

    // miss -> real call -> write
    assert_eq!(hooks.before_call(&mut ctx, &req).await.unwrap(), BeforeCall::Proceed);
    assert!(ctx.get_state(PENDING_CACHE_KEY).is_some());
    hooks
        .after_call(&mut ctx, &req, LlmResponse::from_text(long_answer()))
        .await;
    assert!(ctx.get_state(PENDING_CACHE_KEY).is_none());

    // hit: marker never set
    match hooks.before_call(&mut ctx, &req).await.unwrap() {
        BeforeCall::Cached(resp) => assert_eq!(resp.text, Some(long_answer())),
        BeforeCall::Proceed => panic!("expected a cache hit"),
    }
    assert!(ctx.get_state(PENDING_CACHE_KEY).is_none());
}

#[tokio::test]
async fn test_time_sensitive_request_always_calls_model() {
    let hooks = CacheInterceptor::new(Arc::new(TwoLevelCache::new(CacheConfig::default())));
    let mut ctx = hooks.new_context();
    let calls = AtomicUsize::new(0);
    let req = LlmRequest::new("m1").with_content(Content::user("What's the weather today?"));

    for _ in 0..3 {
        run(&hooks, &mut ctx, &req, &calls, &long_answer()).await;
    }
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(ctx.local_cache().is_empty());
    assert!(hooks.cache().telemetry().get_stats().is_empty());
}

#[tokio::test]
async fn test_short_entry_already_cached_is_still_served() {
    // The size filter applies on write only.
    let hooks = CacheInterceptor::new(Arc::new(TwoLevelCache::new(CacheConfig::default())));
    let mut ctx = hooks.new_context();
    let req = two_plus_two();
    let key = CacheKeyGenerator::new().derive(&req).unwrap();
    ctx.local_cache_mut().put(key, LlmResponse::from_text("4"));

    let outcome = hooks.before_call(&mut ctx, &req).await.unwrap();
    assert_eq!(outcome, BeforeCall::Cached(LlmResponse::from_text("4")));
}

#[tokio::test]
async fn test_sessions_share_through_shared_tier_only() {
    let cache = TwoLevelCache::new(CacheConfig::default())
        .with_shared_store(Arc::new(MemoryStore::default()));
    let hooks = CacheInterceptor::new(Arc::new(cache));
    let calls = AtomicUsize::new(0);
    let req = two_plus_two();

    let mut alice = hooks.new_context();
    run(&hooks, &mut alice, &req, &calls, &long_answer()).await;

    let mut bob = hooks.new_context();
    assert!(bob.local_cache().is_empty());
    run(&hooks, &mut bob, &req, &calls, "unused").await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(bob.local_cache().len(), 1);
}

#[tokio::test]
async fn test_local_only_sessions_are_isolated() {
    let hooks = CacheInterceptor::new(Arc::new(TwoLevelCache::new(CacheConfig::default())));
    let calls = AtomicUsize::new(0);
    let req = two_plus_two();

    let mut alice = hooks.new_context();
    run(&hooks, &mut alice, &req, &calls, &long_answer()).await;
    let mut bob = hooks.new_context();
    run(&hooks, &mut bob, &req, &calls, &long_answer()).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_local_tier_eviction_through_hooks() {
    let cfg = CacheConfig::default()
        .with_max_local_entries(2)
        .with_min_tokens_to_cache(0);
    let hooks = CacheInterceptor::new(Arc::new(TwoLevelCache::new(cfg)));
    let mut ctx = hooks.new_context();
    let calls = AtomicUsize::new(0);

    let reqs: Vec<_> = ["q1", "q2", "q3"]
        .iter()
        .map(|q| LlmRequest::new("m1").with_content(Content::user(*q)))
        .collect();
    for r in &reqs {
        run(&hooks, &mut ctx, r, &calls, "answer").await;
    }
    assert_eq!(ctx.local_cache().len(), 2);
    let keys = CacheKeyGenerator::new();
    assert!(!ctx.local_cache().contains(&keys.derive(&reqs[0]).unwrap()));
    assert!(ctx.local_cache().contains(&keys.derive(&reqs[2]).unwrap()));
}
