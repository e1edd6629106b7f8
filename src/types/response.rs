//! Model response as stored and returned by the cache.

use serde::{Deserialize, Serialize};

use super::request::{Content, Part};

/// Response from the model. Stored and served verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
}

impl LlmResponse {
    /// A response carrying `text` both as the flat field and as a single `model` turn.
    pub fn from_text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            content: Some(Content::new("model", vec![Part::text(text.clone())])),
            text: Some(text),
        }
    }

    pub fn from_content(content: Content) -> Self {
        Self {
            text: None,
            content: Some(content),
        }
    }

    /// Text used for size heuristics.
    ///
    /// Fallback order: the flat `text` field; otherwise the text parts of
    /// `content` concatenated in order; otherwise `None`.
    pub fn extract_text(&self) -> Option<String> {
        if let Some(ref t) = self.text {
            return Some(t.clone());
        }
        let content = self.content.as_ref()?;
        let mut texts = content.parts.iter().filter_map(|p| p.text.as_deref()).peekable();
        texts.peek()?;
        Some(texts.collect())
    }
}
