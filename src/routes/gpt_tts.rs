use axum::{
    extract::State,
    http::{header, HeaderMap},
    response::Json,
    routing::post,
    Router,
};
use bytes::Bytes;
use serde_json::{json, Value};

use crate::conversation::Turn;
use crate::error::ApiError;
use crate::services::responder::Responder;
use crate::services::tts::Synthesizer;
use crate::AppState;

/// Returned with 400 when the body carries no usable `message`.
pub const MISSING_MESSAGE_ERROR: &str = "No se proporcionó texto en 'message'.";

/// Selects the conversation when history is scoped per session.
pub const SESSION_HEADER: &str = "x-session-id";

pub fn router() -> Router<AppState> {
    Router::new().route("/gpt-tts", post(gpt_tts))
}

async fn gpt_tts(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let Some(user_text) = extract_message(&body) else {
        tracing::warn!("/gpt-tts called without a message");
        return Err(ApiError::bad_request(MISSING_MESSAGE_ERROR));
    };
    tracing::info!("/gpt-tts received {} chars", user_text.len());
    tracing::debug!("User message: {}", user_text);

    let session_id = headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok());
    let key = state.conversations.scope_key(session_id);
    let config = &state.config;

    let window =
        state
            .conversations
            .append_and_window(&key, Turn::user(user_text), config.history_window);

    let responder = Responder {
        client: &state.http,
        base_url: &config.openai_base_url,
        api_key: &config.openai_api_key,
        model: &config.chat_model,
    };
    let reply = responder.generate(&window).await.map_err(|e| {
        tracing::error!("Reply generation failed: {}", e);
        ApiError::from(e)
    })?;

    state.conversations.append(&key, Turn::assistant(reply.clone()));

    let synthesizer = Synthesizer {
        client: &state.http,
        base_url: &config.elevenlabs_base_url,
        api_key: &config.elevenlabs_api_key,
        static_dir: &config.static_dir,
    };
    let audio = synthesizer
        .synthesize(&reply, &public_base(config, &headers))
        .await;
    if !audio.is_ready() {
        tracing::warn!("Replying without audio");
    }

    Ok(Json(json!({
        "response": reply,
        "audio_url": audio.url(),
    })))
}

/// The trimmed `message` field of a JSON object body, if present and non-blank.
pub fn extract_message(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    let text = value.as_object()?.get("message")?.as_str()?.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}

/// Base URL the audio link is built on, always ending in `/`.
///
/// `PUBLIC_URL` wins; otherwise the request's `Host` and `X-Forwarded-Proto`
/// headers are used, falling back to localhost on the configured port.
pub fn public_base(config: &crate::config::Config, headers: &HeaderMap) -> String {
    if !config.public_url.trim().is_empty() {
        let base = config.public_url.trim();
        return if base.ends_with('/') {
            base.to_string()
        } else {
            format!("{}/", base)
        };
    }

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .unwrap_or_else(|| format!("localhost:{}", config.port));
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "http".into());

    format!("{}://{}/", scheme, host)
}
