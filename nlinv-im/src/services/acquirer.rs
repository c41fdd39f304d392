//! Instruction acquisition
//!
//! Turns one submission (an uploaded audio clip, a typed line, or both) into
//! at most one instruction string. A non-empty transcript wins over typed text.

use super::transcriber::{Transcriber, TranscriptionError};
use nlinv_common::events::InstructionSource;
use tracing::{debug, info};

/// Audio container formats accepted for upload
pub const SUPPORTED_AUDIO_EXTENSIONS: [&str; 4] = ["wav", "mp3", "m4a", "opus"];

/// Audio clip received from the browser
#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl AudioUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    /// Lowercased file extension, if the name carries one
    pub fn extension(&self) -> Option<String> {
        audio_extension(&self.file_name)
    }

    /// Check the clip is non-empty and in a supported format
    pub fn validate(&self) -> Result<(), String> {
        if self.bytes.is_empty() {
            return Err(format!("Audio file '{}' is empty", self.file_name));
        }
        match self.extension() {
            Some(ext) if SUPPORTED_AUDIO_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
            _ => Err(format!(
                "Unsupported audio format '{}' (expected one of: {})",
                self.file_name,
                SUPPORTED_AUDIO_EXTENSIONS.join(", ")
            )),
        }
    }
}

/// Instruction text plus where it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction {
    pub text: String,
    pub source: InstructionSource,
}

/// Lowercased extension of `file_name`
pub fn audio_extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Transcribe an uploaded clip
///
/// The bytes are spooled to a temporary file that is removed when this call
/// returns, whether or not transcription succeeded.
pub async fn transcribe_upload(
    transcriber: &dyn Transcriber,
    upload: &AudioUpload,
) -> Result<String, TranscriptionError> {
    let suffix = format!(".{}", upload.extension().unwrap_or_else(|| "wav".to_string()));
    let temp = tempfile::Builder::new()
        .prefix("nlinv-audio-")
        .suffix(&suffix)
        .tempfile()?;
    tokio::fs::write(temp.path(), &upload.bytes).await?;

    debug!(
        file = %upload.file_name,
        path = %temp.path().display(),
        backend = transcriber.name(),
        "Transcribing uploaded audio"
    );

    let transcript = transcriber.transcribe(temp.path()).await?;
    info!("Transcript: {:?}", transcript);
    Ok(transcript)
}

/// Pick the instruction for this submission
///
/// A transcript that is empty after trimming falls back to the typed text.
/// Returns `None` when neither yields anything.
pub fn select_instruction(transcript: Option<String>, typed: Option<&str>) -> Option<Instruction> {
    if let Some(text) = transcript {
        let text = text.trim();
        if !text.is_empty() {
            return Some(Instruction {
                text: text.to_string(),
                source: InstructionSource::Audio,
            });
        }
    }

    typed
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| Instruction {
            text: t.to_string(),
            source: InstructionSource::Typed,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    struct EchoPath;

    #[async_trait]
    impl Transcriber for EchoPath {
        async fn transcribe(&self, audio_path: &Path) -> Result<String, TranscriptionError> {
            let bytes = tokio::fs::read(audio_path).await?;
            Ok(format!(
                "{}|{}",
                audio_path.extension().and_then(|e| e.to_str()).unwrap_or(""),
                String::from_utf8_lossy(&bytes)
            ))
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    /// Remembers the path it was handed, then replies or fails
    struct PathRecorder {
        fail: bool,
        path: Mutex<Option<PathBuf>>,
    }

    impl PathRecorder {
        fn new(fail: bool) -> Self {
            Self {
                fail,
                path: Mutex::new(None),
            }
        }

        fn seen_path(&self) -> PathBuf {
            self.path.lock().unwrap().clone().unwrap()
        }
    }

    #[async_trait]
    impl Transcriber for PathRecorder {
        async fn transcribe(&self, audio_path: &Path) -> Result<String, TranscriptionError> {
            assert!(audio_path.exists());
            *self.path.lock().unwrap() = Some(audio_path.to_path_buf());
            if self.fail {
                Err(TranscriptionError::ApiError(500, "decoder failed".to_string()))
            } else {
                Ok("add 1 Apple".to_string())
            }
        }

        fn name(&self) -> &str {
            "recorder"
        }
    }

    #[test]
    fn test_transcript_wins_over_typed() {
        let instruction =
            select_instruction(Some(" add 2 Potato ".to_string()), Some("remove 1 Apple")).unwrap();
        assert_eq!(instruction.text, "add 2 Potato");
        assert_eq!(instruction.source, InstructionSource::Audio);
    }

    #[test]
    fn test_empty_transcript_falls_back_to_typed() {
        let instruction =
            select_instruction(Some("   ".to_string()), Some("remove 1 Apple")).unwrap();
        assert_eq!(instruction.text, "remove 1 Apple");
        assert_eq!(instruction.source, InstructionSource::Typed);
    }

    #[test]
    fn test_nothing_yields_none() {
        assert!(select_instruction(None, None).is_none());
        assert!(select_instruction(None, Some("  \n")).is_none());
        assert!(select_instruction(Some(String::new()), Some("")).is_none());
    }

    #[test]
    fn test_upload_validation() {
        assert!(AudioUpload::new("clip.WAV", vec![1, 2]).validate().is_ok());
        assert!(AudioUpload::new("clip.opus", vec![1]).validate().is_ok());
        assert!(AudioUpload::new("clip.wav", vec![]).validate().is_err());
        assert!(AudioUpload::new("clip.flac", vec![1]).validate().is_err());
        assert!(AudioUpload::new("clip", vec![1]).validate().is_err());
        assert!(AudioUpload::new(".wav", vec![1]).validate().is_err());
    }

    #[tokio::test]
    async fn test_transcribe_upload_keeps_extension() {
        let upload = AudioUpload::new("memo.m4a", b"hello".to_vec());
        let transcript = transcribe_upload(&EchoPath, &upload).await.unwrap();
        assert_eq!(transcript, "m4a|hello");
    }

    #[tokio::test]
    async fn test_spooled_file_removed_after_success() {
        let transcriber = PathRecorder::new(false);
        let upload = AudioUpload::new("memo.wav", b"RIFF".to_vec());

        let transcript = transcribe_upload(&transcriber, &upload).await.unwrap();

        assert_eq!(transcript, "add 1 Apple");
        assert!(!transcriber.seen_path().exists());
    }

    #[tokio::test]
    async fn test_spooled_file_removed_after_failure() {
        let transcriber = PathRecorder::new(true);
        let upload = AudioUpload::new("memo.mp3", b"ID3".to_vec());

        let err = transcribe_upload(&transcriber, &upload).await.unwrap_err();

        assert!(matches!(err, TranscriptionError::ApiError(500, _)));
        let path = transcriber.seen_path();
        assert!(path.to_string_lossy().ends_with(".mp3"));
        assert!(!path.exists());
    }
}
