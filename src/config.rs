//! Cache configuration.
//!
//! Defaults are usable as-is; every field can be overridden from the
//! environment with [`CacheConfig::from_env`]:
//!
//! | Variable | Field |
//! |----------|-------|
//! | `LLM_CACHE_ENABLED` | `enabled` |
//! | `LLM_CACHE_TTL_SECS` | `ttl` |
//! | `LLM_CACHE_MAX_ENTRIES` | `max_local_entries` |
//! | `LLM_CACHE_SELECTIVE` | `selective_bypass_enabled` |
//! | `LLM_CACHE_MIN_TOKENS` | `min_tokens_to_cache` |
//! | `LLM_CACHE_REDIS_URL` / `REDIS_URL` | `shared_store_url` |
//! | `LLM_CACHE_KEY_PREFIX` | `key_prefix` |
//! | `LLM_CACHE_SHARED_TIMEOUT_MS` | `shared_timeout` |
//! | `LLM_CACHE_BYPASS_TERMS` | `bypass_terms` (comma separated) |
//! | `LLM_CACHE_TOP_ENTRIES` | `top_entries` |

use std::str::FromStr;
use std::time::Duration;

use crate::cache::{BypassPolicy, MinSizeFilter, DEFAULT_BYPASS_TERMS};
use crate::{Error, ErrorContext, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Shared-tier entry lifetime.
    pub ttl: Duration,
    pub max_local_entries: usize,
    /// When false, the time-sensitivity bypass is skipped and every request is cacheable.
    pub selective_bypass_enabled: bool,
    pub min_tokens_to_cache: usize,
    pub shared_store_url: Option<String>,
    pub key_prefix: String,
    pub shared_timeout: Duration,
    pub bypass_terms: Vec<String>,
    pub top_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(3600),
            max_local_entries: 1000,
            selective_bypass_enabled: true,
            min_tokens_to_cache: 50,
            shared_store_url: None,
            key_prefix: "llm_cache".to_string(),
            shared_timeout: Duration::from_secs(2),
            bypass_terms: DEFAULT_BYPASS_TERMS.iter().map(|s| s.to_string()).collect(),
            top_entries: 5,
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_max_local_entries(mut self, n: usize) -> Self {
        self.max_local_entries = n;
        self
    }

    pub fn with_selective_bypass(mut self, enabled: bool) -> Self {
        self.selective_bypass_enabled = enabled;
        self
    }

    pub fn with_min_tokens_to_cache(mut self, n: usize) -> Self {
        self.min_tokens_to_cache = n;
        self
    }

    pub fn with_shared_store_url(mut self, url: impl Into<String>) -> Self {
        self.shared_store_url = Some(url.into());
        self
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    pub fn with_shared_timeout(mut self, timeout: Duration) -> Self {
        self.shared_timeout = timeout;
        self
    }

    pub fn with_bypass_terms<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.bypass_terms = terms.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_top_entries(mut self, n: usize) -> Self {
        self.top_entries = n;
        self
    }

    /// Load from the process environment on top of the defaults, then validate.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut cfg = Self::default();

        if let Some(v) = get("LLM_CACHE_ENABLED") {
            cfg.enabled = parse_bool("LLM_CACHE_ENABLED", &v)?;
        }
        if let Some(v) = get("LLM_CACHE_TTL_SECS") {
            cfg.ttl = Duration::from_secs(parse_num("LLM_CACHE_TTL_SECS", &v)?);
        }
        if let Some(v) = get("LLM_CACHE_MAX_ENTRIES") {
            cfg.max_local_entries = parse_num("LLM_CACHE_MAX_ENTRIES", &v)?;
        }
        if let Some(v) = get("LLM_CACHE_SELECTIVE") {
            cfg.selective_bypass_enabled = parse_bool("LLM_CACHE_SELECTIVE", &v)?;
        }
        if let Some(v) = get("LLM_CACHE_MIN_TOKENS") {
            cfg.min_tokens_to_cache = parse_num("LLM_CACHE_MIN_TOKENS", &v)?;
        }
        cfg.shared_store_url = get("LLM_CACHE_REDIS_URL").or_else(|| get("REDIS_URL"));
        if let Some(v) = get("LLM_CACHE_KEY_PREFIX") {
            cfg.key_prefix = v;
        }
        if let Some(v) = get("LLM_CACHE_SHARED_TIMEOUT_MS") {
            cfg.shared_timeout =
                Duration::from_millis(parse_num("LLM_CACHE_SHARED_TIMEOUT_MS", &v)?);
        }
        if let Some(v) = get("LLM_CACHE_BYPASS_TERMS") {
            cfg.bypass_terms = v
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = get("LLM_CACHE_TOP_ENTRIES") {
            cfg.top_entries = parse_num("LLM_CACHE_TOP_ENTRIES", &v)?;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_local_entries == 0 {
            return Err(invalid("max_local_entries", "must be at least 1"));
        }
        if self.ttl.is_zero() {
            return Err(invalid("ttl", "must be greater than zero"));
        }
        if self.shared_timeout.is_zero() {
            return Err(invalid("shared_timeout", "must be greater than zero"));
        }
        Ok(())
    }

    pub fn bypass_policy(&self) -> BypassPolicy {
        BypassPolicy::new(&self.bypass_terms).with_enabled(self.selective_bypass_enabled)
    }

    pub fn min_size_filter(&self) -> MinSizeFilter {
        MinSizeFilter::new(self.min_tokens_to_cache)
    }
}

fn invalid(field: &str, msg: &str) -> Error {
    Error::configuration_with_context(
        format!("invalid cache configuration: {} {}", field, msg),
        ErrorContext::new()
            .with_field_path(field)
            .with_source("cache_config"),
    )
}

fn parse_bool(var: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(unparseable(var, raw, "a boolean")),
    }
}

fn parse_num<T: FromStr>(var: &str, raw: &str) -> Result<T> {
    raw.parse::<T>()
        .map_err(|_| unparseable(var, raw, "a non-negative integer"))
}

fn unparseable(var: &str, raw: &str, expected: &str) -> Error {
    Error::configuration_with_context(
        format!("environment variable {} is not {}", var, expected),
        ErrorContext::new()
            .with_field_path(var)
            .with_details(format!("got '{}'", raw))
            .with_source("config_loader"),
    )
}
