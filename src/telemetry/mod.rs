//! 遥测模块：缓存命中/未命中计数、延迟累计与 Token 节省估算。
//!
//! Cache Telemetry Module.
//!
//! Counters and latency accumulators for the two-level cache. Telemetry is
//! orthogonal to cache correctness: it is fed by the coordinator and only
//! read for reporting.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CacheTelemetry`] | Process-wide hit/miss counters and accumulators |
//! | [`CacheStatsReport`] | Either computed [`CacheStats`] or the "no activity" sentinel |
//! | [`EntryFrequency`] | Per-key hit count in the most-frequent list |
//!
//! Counters only grow for the lifetime of a [`CacheTelemetry`]; there is no
//! reset.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::info;

use crate::cache::CacheKey;

/// Sentinel message reported before any lookup happened.
pub const NO_ACTIVITY: &str = "No cache activity recorded";

#[derive(Debug, Default)]
struct TelemetryState {
    hits: u64,
    misses: u64,
    hit_latency_total_ms: f64,
    miss_latency_total_ms: f64,
    estimated_token_savings: u64,
    entry_hit_counts: HashMap<CacheKey, u64>,
}

/// Hit/miss accounting shared by every session of a coordinator.
///
/// Memory: the per-key hit map gains one entry for every distinct key that
/// is ever served from the cache and is never pruned, so it grows with the
/// number of distinct cached requests over the life of the process. Watch it
/// with [`CacheTelemetry::tracked_keys`]; dropping the coordinator releases it.
#[derive(Debug)]
pub struct CacheTelemetry {
    state: Mutex<TelemetryState>,
    top_entries: usize,
}

impl CacheTelemetry {
    pub fn new() -> Self {
        Self::with_top_entries(5)
    }

    /// `top_entries` bounds the `most_frequent_entries` list.
    pub fn with_top_entries(top_entries: usize) -> Self {
        Self {
            state: Mutex::new(TelemetryState::default()),
            top_entries,
        }
    }

    pub fn record_hit(&self, key: &CacheKey, latency: Duration, estimated_tokens: usize) {
        let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        st.hits = st.hits.saturating_add(1);
        st.hit_latency_total_ms += duration_ms(latency);
        st.estimated_token_savings = st
            .estimated_token_savings
            .saturating_add(estimated_tokens as u64);
        *st.entry_hit_counts.entry(key.clone()).or_insert(0) += 1;
    }

    pub fn record_miss(&self, _key: &CacheKey, latency: Duration) {
        let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        st.misses = st.misses.saturating_add(1);
        st.miss_latency_total_ms += duration_ms(latency);
    }

    /// Distinct keys held in the per-key hit map.
    pub fn tracked_keys(&self) -> usize {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry_hit_counts
            .len()
    }

    pub fn get_stats(&self) -> CacheStatsReport {
        let st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let total = st.hits + st.misses;
        if total == 0 {
            return CacheStatsReport::empty();
        }

        let mut frequent: Vec<EntryFrequency> = st
            .entry_hit_counts
            .iter()
            .map(|(k, n)| EntryFrequency {
                key: k.to_string(),
                hits: *n,
            })
            .collect();
        frequent.sort_by(|a, b| b.hits.cmp(&a.hits).then_with(|| a.key.cmp(&b.key)));
        frequent.truncate(self.top_entries);

        let avg = |sum: f64, n: u64| if n == 0 { 0.0 } else { sum / n as f64 };
        CacheStatsReport::Active(CacheStats {
            hits: st.hits,
            misses: st.misses,
            total_requests: total,
            hit_rate: st.hits as f64 / total as f64,
            miss_rate: st.misses as f64 / total as f64,
            avg_hit_latency_ms: avg(st.hit_latency_total_ms, st.hits),
            avg_miss_latency_ms: avg(st.miss_latency_total_ms, st.misses),
            estimated_token_savings: st.estimated_token_savings,
            most_frequent_entries: frequent,
        })
    }

    /// One `info!` line with the current numbers.
    pub fn log_summary(&self) {
        match self.get_stats() {
            CacheStatsReport::Active(s) => info!(
                hits = s.hits,
                misses = s.misses,
                hit_rate = s.hit_rate,
                avg_hit_latency_ms = s.avg_hit_latency_ms,
                avg_miss_latency_ms = s.avg_miss_latency_ms,
                estimated_token_savings = s.estimated_token_savings,
                "llm cache statistics"
            ),
            CacheStatsReport::Empty { .. } => info!("llm cache statistics: {}", NO_ACTIVITY),
        }
    }
}

impl Default for CacheTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryFrequency {
    pub key: String,
    pub hits: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub total_requests: u64,
    pub hit_rate: f64,
    pub miss_rate: f64,
    pub avg_hit_latency_ms: f64,
    pub avg_miss_latency_ms: f64,
    pub estimated_token_savings: u64,
    pub most_frequent_entries: Vec<EntryFrequency>,
}

/// Result of [`CacheTelemetry::get_stats`].
///
/// Serializes either as the stats object or as `{"error": "No cache activity recorded"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CacheStatsReport {
    Active(CacheStats),
    Empty { error: String },
}

impl CacheStatsReport {
    fn empty() -> Self {
        CacheStatsReport::Empty {
            error: NO_ACTIVITY.to_string(),
        }
    }

    pub fn stats(&self) -> Option<&CacheStats> {
        match self {
            CacheStatsReport::Active(s) => Some(s),
            CacheStatsReport::Empty { .. } => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CacheStatsReport::Empty { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_empty_sentinel() {
        let t = CacheTelemetry::new();
        let report = t.get_stats();
        assert!(report.is_empty());
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({"error": "No cache activity recorded"})
        );
    }

    #[test]
    fn test_counts_and_rates() {
        let t = CacheTelemetry::new();
        let a = CacheKey::from("a");
        let b = CacheKey::from("b");
        t.record_hit(&a, ms(2), 10);
        t.record_hit(&a, ms(4), 10);
        t.record_hit(&b, ms(6), 5);
        t.record_miss(&b, ms(100));

        let report = t.get_stats();
        let s = report.stats().unwrap();
        assert_eq!(s.hits, 3);
        assert_eq!(s.misses, 1);
        assert_eq!(s.total_requests, 4);
        assert!((s.hit_rate - 0.75).abs() < 1e-9);
        assert!((s.miss_rate - 0.25).abs() < 1e-9);
        assert!((s.avg_hit_latency_ms - 4.0).abs() < 1e-6);
        assert!((s.avg_miss_latency_ms - 100.0).abs() < 1e-6);
        assert_eq!(s.estimated_token_savings, 25);
        assert_eq!(
            s.most_frequent_entries,
            vec![
                EntryFrequency { key: "a".into(), hits: 2 },
                EntryFrequency { key: "b".into(), hits: 1 },
            ]
        );
    }

    #[test]
    fn test_only_misses_has_zero_hit_latency() {
        let t = CacheTelemetry::new();
        t.record_miss(&CacheKey::from("x"), ms(3));
        let report = t.get_stats();
        let s = report.stats().unwrap();
        assert_eq!(s.avg_hit_latency_ms, 0.0);
        assert_eq!(s.hit_rate, 0.0);
        assert!(s.most_frequent_entries.is_empty());
    }

    #[test]
    fn test_top_entries_truncated_in_order() {
        let t = CacheTelemetry::with_top_entries(2);
        for (key, n) in [("c", 1), ("a", 3), ("b", 3), ("d", 2)] {
            for _ in 0..n {
                t.record_hit(&CacheKey::from(key), ms(1), 0);
            }
        }
        let report = t.get_stats();
        let keys: Vec<_> = report
            .stats()
            .unwrap()
            .most_frequent_entries
            .iter()
            .map(|e| e.key.as_str())
            .collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_hit_map_grows_per_distinct_hit_key() {
        let t = CacheTelemetry::new();
        assert_eq!(t.tracked_keys(), 0);
        t.record_miss(&CacheKey::from("m"), ms(1));
        assert_eq!(t.tracked_keys(), 0);
        for key in ["a", "b", "a", "c"] {
            t.record_hit(&CacheKey::from(key), ms(1), 0);
        }
        assert_eq!(t.tracked_keys(), 3);
    }
}
