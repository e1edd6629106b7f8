//! Structured LLM request as seen by the cache.
//!
//! The shape mirrors the content/part layout used by Gemini-style agent
//! runtimes: a model identifier, an ordered conversation of [`Content`]
//! turns, each made of [`Part`]s, and optional [`GenerationConfig`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::{Error, ErrorContext, Result};

/// Request handed to the model, consumed read-only by the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmRequest {
    pub model: String,
    #[serde(default)]
    pub contents: Vec<Content>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<GenerationConfig>,
}

impl LlmRequest {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            contents: Vec::new(),
            config: None,
        }
    }

    pub fn with_content(mut self, content: Content) -> Self {
        self.contents.push(content);
        self
    }

    pub fn with_config(mut self, config: GenerationConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Parse the nested JSON form (`{"model": .., "contents": [..], "config": {..}}`).
    ///
    /// `model` and `contents` are required; everything else is optional.
    pub fn from_json(value: &Value) -> Result<Self> {
        let obj = value.as_object().ok_or_else(|| {
            Error::validation_with_context(
                "request must be a JSON object",
                ErrorContext::new().with_source("request_parser"),
            )
        })?;
        for required in ["model", "contents"] {
            if !obj.contains_key(required) {
                return Err(Error::validation_with_context(
                    format!("missing required field '{}'", required),
                    ErrorContext::new()
                        .with_field_path(format!("request.{}", required))
                        .with_source("request_parser"),
                ));
            }
        }
        Ok(serde_json::from_value(value.clone())?)
    }

    /// Every text part of every turn, in conversation order.
    pub fn text_parts(&self) -> impl Iterator<Item = &str> {
        self.contents
            .iter()
            .flat_map(|c| c.parts.iter())
            .filter_map(|p| p.text.as_deref())
    }
}

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    /// Empty when the source JSON has no role or a `null` one.
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: String,
    #[serde(default)]
    pub parts: Vec<Part>,
}

impl Content {
    pub fn new(role: impl Into<String>, parts: Vec<Part>) -> Self {
        Self {
            role: role.into(),
            parts,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new("user", vec![Part::text(text)])
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::new("model", vec![Part::text(text)])
    }

    pub fn with_part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A piece of a turn. Only `text` is interpreted by the cache.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<Blob>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_response: Option<Value>,
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn inline_data(mime_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            inline_data: Some(Blob {
                mime_type: mime_type.into(),
                data: data.into(),
            }),
            ..Default::default()
        }
    }
}

/// Binary attachment (base64 payload).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Blob {
    pub mime_type: String,
    pub data: String,
}

/// Generation parameters. Scalar values affect the output and therefore the cache key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_instruction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_mime_type: Option<String>,
    /// Provider-specific parameters not modelled above.
    #[serde(flatten, default)]
    pub extra: BTreeMap<String, Value>,
}

impl GenerationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temperature(mut self, t: f64) -> Self {
        self.temperature = Some(t);
        self
    }

    pub fn with_top_p(mut self, p: f64) -> Self {
        self.top_p = Some(p);
        self
    }

    pub fn with_max_output_tokens(mut self, n: u32) -> Self {
        self.max_output_tokens = Some(n);
        self
    }

    pub fn with_system_instruction(mut self, s: impl Into<String>) -> Self {
        self.system_instruction = Some(s.into());
        self
    }

    pub fn with_extra(mut self, name: impl Into<String>, value: Value) -> Self {
        self.extra.insert(name.into(), value);
        self
    }

    /// Present scalar parameters, sorted by name.
    ///
    /// Nulls, arrays and objects are skipped. Fails on NaN/infinite floats,
    /// which would otherwise serialize as `null` and silently collide.
    pub fn scalar_params(&self) -> Result<BTreeMap<String, Value>> {
        let floats = [
            ("temperature", self.temperature),
            ("top_p", self.top_p),
            ("presence_penalty", self.presence_penalty),
            ("frequency_penalty", self.frequency_penalty),
        ];
        for (name, value) in floats {
            if let Some(v) = value {
                if !v.is_finite() {
                    return Err(Error::validation_with_context(
                        "generation parameter is not a finite number",
                        ErrorContext::new()
                            .with_field_path(format!("request.config.{}", name))
                            .with_details(v.to_string())
                            .with_source("key_deriver"),
                    ));
                }
            }
        }

        let mut params = BTreeMap::new();
        if let Value::Object(map) = serde_json::to_value(self)? {
            for (name, value) in map {
                match value {
                    Value::Null | Value::Array(_) | Value::Object(_) => {}
                    scalar => {
                        params.insert(name, scalar);
                    }
                }
            }
        }
        Ok(params)
    }
}
