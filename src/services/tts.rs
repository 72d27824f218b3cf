//! ElevenLabs TTS (Text-to-Speech) service.
//!
//! Streams MP3 audio from the `/text-to-speech/{voice_id}/stream` endpoint into
//! a single artifact under the static directory and hands back a URL for it.
//! Failures never reach the caller as errors: they come back as
//! `AudioOutcome::Unavailable` and the reply goes out without audio.

use futures::StreamExt;
use reqwest::{Client, StatusCode};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use url::Url;

pub const VOICE_ID: &str = "5foAkxpX0K5wizIaF5vu";
pub const MODEL_ID: &str = "eleven_multilingual_v1";
pub const STABILITY: f64 = 0.5;
pub const SIMILARITY_BOOST: f64 = 0.8;
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const CHUNK_SIZE: usize = 1024;

/// File name of the artifact, both on disk and under `/static`.
pub const AUDIO_FILE_NAME: &str = "output_audio.mp3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioOutcome {
    Ready { url: String },
    Unavailable { reason: String },
}

impl AudioOutcome {
    pub fn url(&self) -> Option<&str> {
        match self {
            AudioOutcome::Ready { url } => Some(url),
            AudioOutcome::Unavailable { .. } => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, AudioOutcome::Ready { .. })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("speech API key is not configured")]
    MissingKey,
    #[error("invalid public URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("speech request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("speech API error {status}: {body}")]
    Api { status: StatusCode, body: String },
    #[error("writing audio failed: {0}")]
    Io(#[from] std::io::Error),
}

pub struct Synthesizer<'a> {
    pub client: &'a Client,
    pub base_url: &'a str,
    pub api_key: &'a str,
    pub static_dir: &'a Path,
}

impl Synthesizer<'_> {
    /// Synthesize `text` into the artifact and return its URL under `public_base`.
    pub async fn synthesize(&self, text: &str, public_base: &str) -> AudioOutcome {
        match self.try_synthesize(text, public_base).await {
            Ok(url) => {
                tracing::info!("Audio available at {}", url);
                AudioOutcome::Ready { url }
            }
            Err(e) => {
                tracing::error!("Speech synthesis failed: {}", e);
                AudioOutcome::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn try_synthesize(&self, text: &str, public_base: &str) -> Result<String, SynthesisError> {
        if self.api_key.is_empty() {
            return Err(SynthesisError::MissingKey);
        }
        let base = Url::parse(public_base)?;

        let url = format!(
            "{}/text-to-speech/{}/stream",
            self.base_url.trim_end_matches('/'),
            VOICE_ID
        );
        let resp = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .header("xi-api-key", self.api_key)
            .json(&request_body(text))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await?;

        tracing::debug!("Speech API responded with {}", resp.status());
        if resp.status() != StatusCode::OK {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(SynthesisError::Api { status, body });
        }

        let path = write_artifact(self.static_dir, resp).await?;
        tracing::debug!("Audio written to {}", path.display());
        audio_url(&base, chrono::Utc::now().timestamp())
    }
}

/// Fixed voice configuration sent with every synthesis request.
pub fn request_body(text: &str) -> serde_json::Value {
    serde_json::json!({
        "text": text,
        "model_id": MODEL_ID,
        "voice_settings": {
            "stability": STABILITY,
            "similarity_boost": SIMILARITY_BOOST,
        }
    })
}

/// Hidden sibling of the static directory where downloads are staged. It sits
/// outside what `/static` serves and on the same filesystem as the artifact.
pub fn staging_dir(static_dir: &Path) -> PathBuf {
    match static_dir.file_name() {
        Some(name) => static_dir.with_file_name(format!(".{}.partial", name.to_string_lossy())),
        None => static_dir.join("..").join(".audio.partial"),
    }
}

/// Stream the response body into a staged file and rename it over the
/// artifact, so `/static` never serves a half-written file.
async fn write_artifact(dir: &Path, resp: reqwest::Response) -> Result<PathBuf, SynthesisError> {
    let staging = staging_dir(dir);
    tokio::fs::create_dir_all(dir).await?;
    tokio::fs::create_dir_all(&staging).await?;
    let target = dir.join(AUDIO_FILE_NAME);
    let tmp = staging.join(format!("{}.{}.part", AUDIO_FILE_NAME, uuid::Uuid::new_v4()));

    let result = stream_to_file(&tmp, resp).await;
    if let Err(e) = result {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }

    tokio::fs::rename(&tmp, &target).await?;
    Ok(target)
}

async fn stream_to_file(path: &Path, resp: reqwest::Response) -> Result<(), SynthesisError> {
    let mut file = tokio::fs::File::create(path).await?;
    let mut stream = resp.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let bytes = chunk?;
        for piece in bytes.chunks(CHUNK_SIZE) {
            file.write_all(piece).await?;
        }
    }
    file.flush().await?;
    Ok(())
}

/// `{base}static/output_audio.mp3?t={timestamp}`.
pub fn audio_url(base: &Url, timestamp: i64) -> Result<String, SynthesisError> {
    let mut url = base.join(&format!("static/{}", AUDIO_FILE_NAME))?;
    url.query_pairs_mut()
        .append_pair("t", &timestamp.to_string());
    Ok(url.to_string())
}
