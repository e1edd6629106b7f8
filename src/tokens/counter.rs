//! Token counter implementations.

use crate::types::LlmResponse;

pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;

    /// Tokens in the response text (see [`LlmResponse::extract_text`]); 0 without text.
    fn count_response(&self, response: &LlmResponse) -> usize {
        response
            .extract_text()
            .map(|t| self.count(&t))
            .unwrap_or(0)
    }

    /// Smallest character length that is estimated at `tokens` tokens.
    fn chars_for_tokens(&self, tokens: usize) -> usize;
}

/// Character-based approximation: one token per `chars_per_token` characters,
/// rounded down.
#[derive(Debug, Clone, Copy)]
pub struct CharacterEstimator {
    chars_per_token: usize,
}

impl CharacterEstimator {
    pub const DEFAULT_CHARS_PER_TOKEN: usize = 4;

    pub fn new() -> Self {
        Self::with_ratio(Self::DEFAULT_CHARS_PER_TOKEN)
    }

    pub fn with_ratio(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }
}

impl Default for CharacterEstimator {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenCounter for CharacterEstimator {
    fn count(&self, text: &str) -> usize {
        text.chars().count() / self.chars_per_token
    }

    fn chars_for_tokens(&self, tokens: usize) -> usize {
        tokens.saturating_mul(self.chars_per_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_character_estimator_rounds_down() {
        let c = CharacterEstimator::new();
        assert_eq!(c.count(""), 0);
        assert_eq!(c.count("abc"), 0);
        assert_eq!(c.count("abcd"), 1);
        assert_eq!(c.count(&"x".repeat(201)), 50);
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let c = CharacterEstimator::new();
        assert_eq!(c.count("日本語の"), 1);
    }

    #[test]
    fn test_chars_for_tokens() {
        assert_eq!(CharacterEstimator::new().chars_for_tokens(50), 200);
        assert_eq!(CharacterEstimator::with_ratio(0).chars_for_tokens(3), 3);
    }

    #[test]
    fn test_count_response_without_text() {
        let c = CharacterEstimator::new();
        assert_eq!(c.count_response(&LlmResponse::default()), 0);
        assert_eq!(c.count_response(&LlmResponse::from_text("12345678")), 2);
    }
}
