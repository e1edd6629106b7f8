//! Cache key generation.
//!
//! A key is the SHA-256 hex digest of a canonical JSON document built from the
//! request: model id, every turn as `(role, [text, ..])` in order, and the
//! present scalar generation parameters sorted by name. Structured
//! serialization keeps separators inside user text from colliding.
//!
//! Parts without text (binary attachments, function calls) do not contribute.
//! Two requests that differ only in such a part share a key; this cache is
//! meant for text conversations.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

use crate::types::LlmRequest;
use crate::{Error, ErrorContext, Result};

/// Fixed-width (64 hex chars) lookup identity of a request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Leading 12 characters, for log lines.
    pub fn short(&self) -> &str {
        let end = self
            .0
            .char_indices()
            .nth(12)
            .map(|(i, _)| i)
            .unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for CacheKey {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

#[derive(Serialize)]
struct CanonicalRequest<'a> {
    model: &'a str,
    turns: Vec<CanonicalTurn<'a>>,
    params: BTreeMap<String, Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    salt: Option<&'a str>,
}

#[derive(Serialize)]
struct CanonicalTurn<'a> {
    role: &'a str,
    texts: Vec<&'a str>,
}

/// Derives [`CacheKey`]s from requests.
#[derive(Debug, Clone, Default)]
pub struct CacheKeyGenerator {
    salt: Option<String>,
}

impl CacheKeyGenerator {
    pub fn new() -> Self {
        Self { salt: None }
    }

    /// Mixes a constant into every key, e.g. to retire entries written by an older deployment.
    pub fn with_salt(mut self, salt: impl Into<String>) -> Self {
        self.salt = Some(salt.into());
        self
    }

    pub fn derive(&self, request: &LlmRequest) -> Result<CacheKey> {
        if request.model.trim().is_empty() {
            return Err(Error::validation_with_context(
                "model identifier is empty",
                ErrorContext::new()
                    .with_field_path("request.model")
                    .with_source("key_deriver"),
            ));
        }

        let params = match request.config {
            Some(ref cfg) => cfg.scalar_params()?,
            None => BTreeMap::new(),
        };
        let canonical = CanonicalRequest {
            model: &request.model,
            turns: request
                .contents
                .iter()
                .map(|c| CanonicalTurn {
                    role: &c.role,
                    texts: c.parts.iter().filter_map(|p| p.text.as_deref()).collect(),
                })
                .collect(),
            params,
            salt: self.salt.as_deref(),
        };

        let bytes = serde_json::to_vec(&canonical)?;
        let digest = Sha256::digest(&bytes);
        let hash: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
        Ok(CacheKey(hash))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Content, GenerationConfig, Part};

    fn base() -> LlmRequest {
        LlmRequest::new("m1")
            .with_content(Content::user("What is the capital of France?"))
            .with_content(Content::model("Paris."))
            .with_content(Content::user("And of Spain?"))
            .with_config(GenerationConfig::new().with_temperature(0.2))
    }

    fn key(req: &LlmRequest) -> CacheKey {
        CacheKeyGenerator::new().derive(req).unwrap()
    }

    #[test]
    fn test_key_is_deterministic_and_fixed_width() {
        let k1 = key(&base());
        let k2 = key(&base().clone());
        assert_eq!(k1, k2);
        assert_eq!(k1.as_str().len(), 64);
        assert!(k1.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(key(&LlmRequest::new("x")).as_str().len(), 64);
    }

    #[test]
    fn test_key_is_stable_across_runs() {
        // Pinned digest: changing the canonical form invalidates every shared-tier entry.
        let req = LlmRequest::new("m1").with_content(Content::user("hi"));
        let expected = {
            let doc = r#"{"model":"m1","turns":[{"role":"user","texts":["hi"]}],"params":{}}"#;
            let digest = Sha256::digest(doc.as_bytes());
            digest.iter().map(|b| format!("{:02x}", b)).collect::<String>()
        };
        assert_eq!(key(&req).as_str(), expected);
    }

    #[test]
    fn test_key_sensitive_to_each_field() {
        let original = key(&base());

        let mut model = base();
        model.model = "m2".into();

        let mut text = base();
        text.contents[2].parts[0].text = Some("And of Portugal?".into());

        let mut role = base();
        role.contents[1].role = "user".into();

        let mut order = base();
        order.contents.swap(0, 2);

        let mut count = base();
        count.contents.pop();

        let mut temperature = base();
        temperature.config = Some(GenerationConfig::new().with_temperature(0.3));

        let mut new_param = base();
        new_param.config = Some(
            GenerationConfig::new()
                .with_temperature(0.2)
                .with_max_output_tokens(64),
        );

        let mut no_config = base();
        no_config.config = None;

        let mutated = [
            model,
            text,
            role,
            order,
            count,
            temperature,
            new_param,
            no_config,
        ];
        let mut seen = std::collections::HashSet::new();
        seen.insert(original);
        for req in &mutated {
            assert!(seen.insert(key(req)), "collision for {:?}", req);
        }
    }

    #[test]
    fn test_separator_text_does_not_collide() {
        let a = LlmRequest::new("m").with_content(Content::new(
            "user",
            vec![Part::text("a\",\"b")],
        ));
        let b = LlmRequest::new("m").with_content(Content::new(
            "user",
            vec![Part::text("a"), Part::text("b")],
        ));
        assert_ne!(key(&a), key(&b));
    }

    #[test]
    fn test_binary_parts_are_ignored_known_limitation() {
        let plain = LlmRequest::new("m").with_content(Content::user("describe the image"));
        let with_png = LlmRequest::new("m").with_content(
            Content::user("describe the image").with_part(Part::inline_data("image/png", "AAAA")),
        );
        let with_jpg = LlmRequest::new("m").with_content(
            Content::user("describe the image").with_part(Part::inline_data("image/jpeg", "BBBB")),
        );
        // Attachments neither break nor contribute to the key: these collide.
        assert_eq!(key(&plain), key(&with_png));
        assert_eq!(key(&with_png), key(&with_jpg));
    }

    #[test]
    fn test_salt_changes_key() {
        let req = base();
        let salted = CacheKeyGenerator::new().with_salt("v2").derive(&req).unwrap();
        assert_ne!(key(&req), salted);
    }

    #[test]
    fn test_empty_model_is_rejected() {
        let err = CacheKeyGenerator::new()
            .derive(&LlmRequest::new("  "))
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn test_short_key() {
        let k = key(&base());
        assert_eq!(k.short().len(), 12);
        assert_eq!(CacheKey::from("abc").short(), "abc");
    }
}
