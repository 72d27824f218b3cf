//! Chat-completion client for OpenAI-compatible APIs.
//!
//! One blocking-style (non-streaming) call per generation: the whole reply is
//! read before the caller continues. No retries; failures are returned as
//! `GenerationError` for the handler to report.

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::conversation::Turn;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl From<&Turn> for ChatMessage {
    fn from(turn: &Turn) -> Self {
        Self {
            role: turn.role.as_str().to_string(),
            content: turn.content.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatCallOptions {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("chat completion request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("chat completion API error {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("malformed chat completion response: {0}")]
    Malformed(String),
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: Option<CompletionMessage>,
}

#[derive(Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

// ---------------------------------------------------------------------------
// complete_chat
// ---------------------------------------------------------------------------

/// Run a chat completion and return the first choice's text.
pub async fn complete_chat(
    client: &Client,
    opts: &ChatCallOptions,
) -> Result<String, GenerationError> {
    let url = format!("{}/chat/completions", opts.base_url.trim_end_matches('/'));
    let body = serde_json::json!({
        "model": opts.model,
        "messages": opts.messages,
    });

    let resp = client
        .post(&url)
        .bearer_auth(&opts.api_key)
        .json(&body)
        .send()
        .await
        .map_err(|e| {
            tracing::error!("Chat completion request failed: {}", e);
            GenerationError::Request(e)
        })?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        tracing::error!("Chat completion returned {}: {}", status, body);
        return Err(GenerationError::Api { status, body });
    }

    let raw = resp.text().await?;
    parse_completion(&raw)
}

/// Pull `choices[0].message.content` out of a completion body.
pub fn parse_completion(raw: &str) -> Result<String, GenerationError> {
    let parsed: CompletionResponse = serde_json::from_str(raw)
        .map_err(|e| GenerationError::Malformed(e.to_string()))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .ok_or_else(|| GenerationError::Malformed("no message content in first choice".into()))
}
