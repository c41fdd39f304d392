//! Pipeline stages
//!
//! Each stage lives in its own module; [`pipeline`] wires them together.

pub mod acquirer;
pub mod applier;
pub mod generator;
pub mod normalizer;
pub mod pipeline;
pub mod transcriber;

pub use acquirer::{AudioUpload, Instruction, SUPPORTED_AUDIO_EXTENSIONS};
pub use applier::{Applier, ExecutionError};
pub use generator::{GenerationError, OllamaGenerator, SqlGenerator};
pub use normalizer::{normalize, NormalizedScript, Statement, StatementKind};
pub use pipeline::{InstructionPipeline, InstructionRequest, PipelineError, PipelineOutcome};
pub use transcriber::{Transcriber, TranscriptionError, WhisperHttpTranscriber};
