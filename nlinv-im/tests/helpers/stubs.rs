//! Stub transcription and generation backends
//!
//! Both record what they were asked so tests can check the pipeline called
//! them (or did not).

use async_trait::async_trait;
use nlinv_im::services::{GenerationError, SqlGenerator, Transcriber, TranscriptionError};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Generator returning a canned reply
pub struct StubGenerator {
    reply: Result<String, String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl StubGenerator {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            delay: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Fails every call with a transport error
    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            ..Self::replying("")
        }
    }

    /// Waits `delay` before replying
    pub fn slow(reply: &str, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::replying(reply)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl SqlGenerator for StubGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        self.reply
            .clone()
            .map_err(GenerationError::NetworkError)
    }

    fn model(&self) -> &str {
        "stub-model"
    }
}

/// Transcriber returning a canned transcript
pub struct StubTranscriber {
    reply: Result<String, String>,
    calls: AtomicUsize,
    seen: Mutex<Vec<(String, Vec<u8>)>>,
}

impl StubTranscriber {
    pub fn replying(transcript: &str) -> Self {
        Self {
            reply: Ok(transcript.to_string()),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Fails every call as an HTTP 500 from the backend
    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            ..Self::replying("")
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// (file extension, file contents) of every file handed over
    pub fn seen(&self) -> Vec<(String, Vec<u8>)> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcriber for StubTranscriber {
    async fn transcribe(&self, audio_path: &Path) -> Result<String, TranscriptionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let bytes = tokio::fs::read(audio_path).await?;
        let extension = audio_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_string();
        self.seen.lock().unwrap().push((extension, bytes));

        self.reply
            .clone()
            .map_err(|message| TranscriptionError::ApiError(500, message))
    }

    fn name(&self) -> &str {
        "stub"
    }
}
