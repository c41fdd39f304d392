//! Speech-to-text client
//!
//! Talks to an OpenAI-compatible Whisper server (whisper.cpp server,
//! faster-whisper-server, ...) using the translations endpoint, so spoken
//! instructions in any language come back as English text.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

const USER_AGENT: &str = concat!("nlinv-im/", env!("CARGO_PKG_VERSION"));

/// Transcription errors
#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Audio file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Speech-to-text backend
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe (and translate) the audio file at `audio_path`
    async fn transcribe(&self, audio_path: &Path) -> Result<String, TranscriptionError>;

    /// Backend name for logs
    fn name(&self) -> &str;
}

#[derive(Debug, Deserialize)]
struct TranslationResponse {
    text: String,
}

/// Whisper HTTP backend: multipart POST to `/v1/audio/translations`
pub struct WhisperHttpTranscriber {
    http_client: reqwest::Client,
    url: String,
    model: String,
}

impl WhisperHttpTranscriber {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self, TranscriptionError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| TranscriptionError::NetworkError(e.to_string()))?;

        let url = format!("{}/v1/audio/translations", base_url.trim_end_matches('/'));
        info!("WhisperHttpTranscriber: endpoint {} (model {})", url, model);

        Ok(Self {
            http_client,
            url,
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl Transcriber for WhisperHttpTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<String, TranscriptionError> {
        let audio_bytes = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.wav")
            .to_string();
        let mime = mime_for_file(&file_name);

        debug!(
            file = %file_name,
            bytes = audio_bytes.len(),
            "Sending audio for transcription"
        );

        let part = reqwest::multipart::Part::bytes(audio_bytes)
            .file_name(file_name)
            .mime_str(mime)
            .map_err(|e| TranscriptionError::NetworkError(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("response_format", "json");

        let response = self
            .http_client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| TranscriptionError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TranscriptionError::ApiError(status.as_u16(), error_text));
        }

        let body: TranslationResponse = response
            .json()
            .await
            .map_err(|e| TranscriptionError::ParseError(e.to_string()))?;

        let text = body.text.trim().to_string();
        debug!("Whisper transcription: {:?}", text);
        Ok(text)
    }

    fn name(&self) -> &str {
        "whisper-http"
    }
}

/// Content type sent with the audio part
pub fn mime_for_file(file_name: &str) -> &'static str {
    let extension = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "opus" => "audio/ogg",
        _ => "application/octet-stream",
    }
}
