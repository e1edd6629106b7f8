//! Shared-tier value format.
//!
//! Responses are stored as `{"text": <string|null>, "content": {"role": .., "parts": [..]} | null}`.
//! Both fields are always written; on read, a missing field means absent.

use serde::{Deserialize, Serialize};

use crate::types::{Content, LlmResponse};
use crate::Result;

#[derive(Debug, Serialize, Deserialize)]
struct StoredResponse {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    content: Option<Content>,
}

pub fn encode(response: &LlmResponse) -> Result<String> {
    let stored = StoredResponse {
        text: response.text.clone(),
        content: response.content.clone(),
    };
    Ok(serde_json::to_string(&stored)?)
}

pub fn decode(raw: &str) -> Result<LlmResponse> {
    let stored: StoredResponse = serde_json::from_str(raw)?;
    Ok(LlmResponse {
        text: stored.text,
        content: stored.content,
    })
}
