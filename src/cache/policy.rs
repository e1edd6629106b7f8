//! Cacheability rules: time-sensitivity bypass on requests, minimum size on responses.

use crate::tokens::{CharacterEstimator, TokenCounter};
use crate::types::{LlmRequest, LlmResponse};

/// Terms whose presence marks a request as time-sensitive.
pub const DEFAULT_BYPASS_TERMS: &[&str] = &[
    "time", "weather", "today", "now", "current", "latest", "recent", "update",
];

/// Decides whether a request may use the cache at all.
///
/// Case-insensitive substring match over every text part of every turn. Any
/// hit skips both lookup and write-back. The match is deliberately loose:
/// "sometimes" trips on "time", which only costs a cache miss.
#[derive(Debug, Clone)]
pub struct BypassPolicy {
    terms_lower: Vec<String>,
    enabled: bool,
}

impl BypassPolicy {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms_lower = terms
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self {
            terms_lower,
            enabled: true,
        }
    }

    /// Operator override: when disabled every request is cacheable regardless of content.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn terms(&self) -> &[String] {
        &self.terms_lower
    }

    pub fn should_bypass(&self, request: &LlmRequest) -> bool {
        self.matched_term(request).is_some()
    }

    /// First trigger term found in the request, for logging.
    pub fn matched_term(&self, request: &LlmRequest) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        for text in request.text_parts() {
            let lower = text.to_lowercase();
            if let Some(term) = self.terms_lower.iter().find(|t| lower.contains(t.as_str())) {
                return Some(term.as_str());
            }
        }
        None
    }
}

impl Default for BypassPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_BYPASS_TERMS)
    }
}

/// Write-side filter: responses shorter than `min_tokens` are not cached.
///
/// Applied only on write. An entry already in a tier is served regardless of
/// its size.
#[derive(Debug, Clone)]
pub struct MinSizeFilter {
    min_tokens: usize,
    estimator: CharacterEstimator,
}

impl MinSizeFilter {
    pub fn new(min_tokens: usize) -> Self {
        Self {
            min_tokens,
            estimator: CharacterEstimator::new(),
        }
    }

    pub fn min_chars(&self) -> usize {
        self.estimator.chars_for_tokens(self.min_tokens)
    }

    /// Responses without any text never qualify.
    pub fn accepts(&self, response: &LlmResponse) -> bool {
        match response.extract_text() {
            Some(text) => text.chars().count() >= self.min_chars(),
            None => false,
        }
    }
}

impl Default for MinSizeFilter {
    fn default() -> Self {
        Self::new(50)
    }
}
