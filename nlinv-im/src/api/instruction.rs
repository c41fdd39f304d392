//! Instruction submission endpoints
//!
//! POST /api/instruction runs the pipeline for one submission; only one run
//! may be in flight. The run executes on its own task so a client that goes
//! away mid-request cannot interrupt a batch that is already being applied.

use axum::{
    extract::{Multipart, State},
    routing::post,
    Json, Router,
};
use nlinv_common::db::Item;
use nlinv_common::events::InstructionSource;
use serde::Serialize;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::services::{AudioUpload, InstructionRequest, PipelineError, PipelineOutcome};
use crate::{ActiveRun, ApiError, ApiResult, AppState};

/// Multipart field carrying the audio clip
pub const AUDIO_FIELD: &str = "audio";

/// Multipart field carrying typed text
pub const INSTRUCTION_FIELD: &str = "instruction";

/// Successful submission response
#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum InstructionResponse {
    Applied {
        instruction: String,
        source: InstructionSource,
        sql: String,
        items: Vec<Item>,
    },
    NoInstruction {
        items: Vec<Item>,
    },
}

impl From<PipelineOutcome> for InstructionResponse {
    fn from(outcome: PipelineOutcome) -> Self {
        match outcome {
            PipelineOutcome::Applied {
                instruction,
                source,
                sql,
                items,
            } => InstructionResponse::Applied {
                instruction,
                source,
                sql,
                items,
            },
            PipelineOutcome::NoInstruction { items } => InstructionResponse::NoInstruction { items },
        }
    }
}

/// Cancel response
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<Uuid>,
}

/// POST /api/instruction
pub async fn submit_instruction(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<InstructionResponse>> {
    let request = read_submission(&mut multipart).await?;
    if let Some(audio) = &request.audio {
        audio.validate().map_err(ApiError::BadRequest)?;
    }

    let run_id = Uuid::new_v4();
    let cancel = CancellationToken::new();
    {
        let mut active = state.active_run.lock().await;
        if let Some(run) = active.as_ref() {
            return Err(ApiError::Conflict(format!(
                "Instruction {} is still being processed",
                run.run_id
            )));
        }
        *active = Some(ActiveRun {
            run_id,
            cancel: cancel.clone(),
        });
    }
    info!(%run_id, "Instruction run started");

    let task_state = state.clone();
    let handle = tokio::spawn(async move {
        let pipeline = Arc::clone(&task_state.pipeline);
        let store = task_state.store.clone();
        let result = pipeline.run(run_id, &store, request, &cancel).await;

        if let Err(e) = &result {
            if !matches!(e, PipelineError::Cancelled) {
                task_state.record_error(e.to_string()).await;
            }
        }

        let mut active = task_state.active_run.lock().await;
        if active.as_ref().map(|r| r.run_id) == Some(run_id) {
            *active = None;
        }
        result
    });

    let outcome = handle
        .await
        .map_err(|e| ApiError::Internal(format!("Pipeline task failed: {}", e)))??;

    Ok(Json(outcome.into()))
}

/// POST /api/instruction/cancel
///
/// Has no effect once the script is being applied.
pub async fn cancel_instruction(State(state): State<AppState>) -> Json<CancelResponse> {
    let active = state.active_run.lock().await;
    match active.as_ref() {
        Some(run) => {
            info!(run_id = %run.run_id, "Cancellation requested");
            run.cancel.cancel();
            Json(CancelResponse {
                cancelled: true,
                run_id: Some(run.run_id),
            })
        }
        None => Json(CancelResponse {
            cancelled: false,
            run_id: None,
        }),
    }
}

/// Collect the audio and text parts of a submission
///
/// An audio part with neither a file name nor content is what browsers send
/// for an untouched file input; it counts as no audio.
async fn read_submission(multipart: &mut Multipart) -> ApiResult<InstructionRequest> {
    let mut request = InstructionRequest::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            AUDIO_FIELD => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Audio upload failed: {}", e)))?;
                if file_name.is_empty() && bytes.is_empty() {
                    continue;
                }
                debug!(file = %file_name, bytes = bytes.len(), "Received audio upload");
                request.audio = Some(AudioUpload::new(file_name, bytes.to_vec()));
            }
            INSTRUCTION_FIELD => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Instruction text invalid: {}", e)))?;
                request.typed = Some(text);
            }
            other => debug!("Ignoring multipart field {:?}", other),
        }
    }

    Ok(request)
}

pub fn instruction_routes() -> Router<AppState> {
    Router::new()
        .route("/api/instruction", post(submit_instruction))
        .route("/api/instruction/cancel", post(cancel_instruction))
}
