//! Instruction pipeline
//!
//! acquire -> generate -> normalize -> apply, for one submission at a time.
//! Stage transitions go out on the [`EventBus`]; the final outcome comes back
//! as the return value.

use super::acquirer::{self, AudioUpload, Instruction};
use super::applier::{Applier, ExecutionError};
use super::generator::{self, GenerationError, SqlGenerator};
use super::normalizer;
use super::transcriber::{Transcriber, TranscriptionError};
use crate::db::InventoryStore;
use chrono::Utc;
use futures::future::{BoxFuture, FutureExt};
use nlinv_common::db::Item;
use nlinv_common::events::{EventBus, InstructionSource, InventoryEvent, PipelineStage};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Pipeline errors, one variant per stage
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Transcription failed: {0}")]
    Transcription(#[from] TranscriptionError),

    #[error("SQL generation failed: {0}")]
    Generation(#[from] GenerationError),

    #[error("SQL execution failed: {source}")]
    Execution {
        /// Normalized script that was being applied
        sql: String,
        #[source]
        source: ExecutionError,
    },

    #[error("Run cancelled before any change was applied")]
    Cancelled,

    #[error("Inventory read failed: {0}")]
    Store(#[from] nlinv_common::Error),
}

impl PipelineError {
    /// Stage reported in `PipelineFailed` events
    pub fn stage(&self) -> PipelineStage {
        match self {
            PipelineError::InvalidInput(_) | PipelineError::Transcription(_) => {
                PipelineStage::Transcription
            }
            PipelineError::Generation(_) | PipelineError::Cancelled => PipelineStage::Generation,
            PipelineError::Execution { .. } | PipelineError::Store(_) => PipelineStage::Execution,
        }
    }
}

/// One submission from the UI
#[derive(Debug, Clone, Default)]
pub struct InstructionRequest {
    pub audio: Option<AudioUpload>,
    pub typed: Option<String>,
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub enum PipelineOutcome {
    /// Neither audio nor text produced an instruction; nothing ran
    NoInstruction { items: Vec<Item> },
    /// Script applied; `items` is the table re-read after it
    Applied {
        instruction: String,
        source: InstructionSource,
        sql: String,
        items: Vec<Item>,
    },
}

/// Wires the stages together
pub struct InstructionPipeline {
    transcriber: Arc<dyn Transcriber>,
    generator: Arc<dyn SqlGenerator>,
    applier: Applier,
    event_bus: EventBus,
}

impl InstructionPipeline {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        generator: Arc<dyn SqlGenerator>,
        applier: Applier,
        event_bus: EventBus,
    ) -> Self {
        Self {
            transcriber,
            generator,
            applier,
            event_bus,
        }
    }

    pub fn model_name(&self) -> &str {
        self.generator.model()
    }

    pub fn applier(&self) -> Applier {
        self.applier
    }

    /// Run one submission to completion
    ///
    /// Cancellation is honored until the applier starts; after that the batch
    /// finishes. The returned future is `Send` so callers can hand it to
    /// `tokio::spawn`.
    pub fn run<'a>(
        &'a self,
        run_id: Uuid,
        store: &'a InventoryStore,
        request: InstructionRequest,
        cancel: &'a CancellationToken,
    ) -> BoxFuture<'a, Result<PipelineOutcome, PipelineError>> {
        async move {
            let result = self.run_stages(run_id, store, request, cancel).await;
            if let Err(e) = &result {
                self.report_failure(run_id, e);
            }
            result
        }
        .boxed()
    }

    fn report_failure(&self, run_id: Uuid, error: &PipelineError) {
        match error {
            PipelineError::Cancelled => {
                info!(%run_id, "Run cancelled");
                self.event_bus.emit_lossy(InventoryEvent::PipelineCancelled {
                    run_id,
                    timestamp: Utc::now(),
                });
            }
            _ => {
                warn!(%run_id, stage = ?error.stage(), "Run failed: {}", error);
                self.event_bus.emit_lossy(InventoryEvent::PipelineFailed {
                    run_id,
                    stage: error.stage(),
                    message: error.to_string(),
                    timestamp: Utc::now(),
                });
            }
        }
    }

    async fn run_stages(
        &self,
        run_id: Uuid,
        store: &InventoryStore,
        request: InstructionRequest,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutcome, PipelineError> {
        let started = Instant::now();

        // 1. Acquire
        let transcript = match &request.audio {
            Some(upload) => {
                upload.validate().map_err(PipelineError::InvalidInput)?;
                Some(self.transcribe(run_id, upload, cancel).await?)
            }
            None => None,
        };

        let Some(Instruction { text, source }) =
            acquirer::select_instruction(transcript, request.typed.as_deref())
        else {
            debug!(%run_id, "No instruction in submission");
            let items = store.list_items().await?;
            return Ok(PipelineOutcome::NoInstruction { items });
        };

        info!(%run_id, source = source.as_str(), "Instruction to process: {}", text);
        self.event_bus.emit_lossy(InventoryEvent::InstructionReceived {
            run_id,
            instruction: text.clone(),
            source,
            timestamp: Utc::now(),
        });

        // 2. Generate
        let vocabulary = store.known_names().await.map_err(|e| {
            GenerationError::Prompt(format!("reading item names failed: {}", e))
        })?;
        let prompt = generator::build_prompt(&text, &vocabulary)?;

        self.event_bus.emit_lossy(InventoryEvent::SqlGenerationStarted {
            run_id,
            model: self.generator.model().to_string(),
            timestamp: Utc::now(),
        });
        let generation_started = Instant::now();
        let raw = tokio::select! {
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            result = self.generator.generate(&prompt) => result?,
        };
        info!(
            %run_id,
            stage = "generate",
            elapsed_ms = generation_started.elapsed().as_millis() as u64,
            "Generator responded"
        );
        debug!(%run_id, "Raw generator output: {:?}", raw);

        // 3. Normalize
        let script = normalizer::normalize(&raw);
        let sql = script.to_sql();
        info!(%run_id, statements = script.len(), "Generated SQL:\n{}", sql);
        self.event_bus.emit_lossy(InventoryEvent::SqlGenerated {
            run_id,
            sql: sql.clone(),
            timestamp: Utc::now(),
        });

        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        // 4. Apply
        let items = self
            .applier
            .apply(store, &script)
            .await
            .map_err(|source| PipelineError::Execution {
                sql: sql.clone(),
                source,
            })?;

        info!(
            %run_id,
            stage = "apply",
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Inventory updated ({} items)",
            items.len()
        );
        self.event_bus.emit_lossy(InventoryEvent::InventoryUpdated {
            run_id,
            item_count: items.len(),
            timestamp: Utc::now(),
        });

        Ok(PipelineOutcome::Applied {
            instruction: text,
            source,
            sql,
            items,
        })
    }

    async fn transcribe(
        &self,
        run_id: Uuid,
        upload: &AudioUpload,
        cancel: &CancellationToken,
    ) -> Result<String, PipelineError> {
        self.event_bus.emit_lossy(InventoryEvent::TranscriptionStarted {
            run_id,
            file_name: upload.file_name.clone(),
            timestamp: Utc::now(),
        });

        let transcript = tokio::select! {
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            result = acquirer::transcribe_upload(self.transcriber.as_ref(), upload) => result?,
        };

        self.event_bus.emit_lossy(InventoryEvent::TranscriptionCompleted {
            run_id,
            transcript: transcript.trim().to_string(),
            timestamp: Utc::now(),
        });
        Ok(transcript)
    }
}
