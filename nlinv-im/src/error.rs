//! Error types for nlinv-im
//!
//! Every handler failure becomes a JSON body of the form
//! `{"error": {"code": ..., "message": ...}}`. Execution failures also carry
//! the script that was rejected.

use crate::services::{PipelineError, TranscriptionError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Invalid request (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Conflict (409), another run is in flight
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Run cancelled before applying (409)
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Speech-to-text backend failed (502)
    #[error("Transcription error: {0}")]
    Transcription(String),

    /// Prompt construction or model call failed (502)
    #[error("LLM error: {0}")]
    Llm(String),

    /// Generated SQL was rejected by the database (422)
    #[error("SQL execution error: {message}")]
    SqlExecution { message: String, sql: String },

    /// Internal server error (500)
    #[error("Internal server error: {0}")]
    Internal(String),

    /// nlinv-common error
    #[error("Common error: {0}")]
    Common(#[from] nlinv_common::Error),
}

impl ApiError {
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::Conflict(_) => "CONFLICT",
            ApiError::Cancelled(_) => "CANCELLED",
            ApiError::Transcription(_) => "TRANSCRIPTION_ERROR",
            ApiError::Llm(_) => "LLM_ERROR",
            ApiError::SqlExecution { .. } => "SQL_EXECUTION_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
            ApiError::Common(_) => "COMMON_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) | ApiError::Cancelled(_) => StatusCode::CONFLICT,
            ApiError::Transcription(_) | ApiError::Llm(_) => StatusCode::BAD_GATEWAY,
            ApiError::SqlExecution { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Internal(_) | ApiError::Common(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::InvalidInput(msg) => ApiError::BadRequest(msg),
            // A spooling failure is ours, not the backend's
            PipelineError::Transcription(TranscriptionError::Io(e)) => {
                ApiError::Internal(format!("Audio spooling failed: {}", e))
            }
            PipelineError::Transcription(e) => ApiError::Transcription(e.to_string()),
            PipelineError::Generation(e) => ApiError::Llm(e.to_string()),
            PipelineError::Execution { sql, source } => ApiError::SqlExecution {
                message: source.to_string(),
                sql,
            },
            PipelineError::Cancelled => ApiError::Cancelled(PipelineError::Cancelled.to_string()),
            PipelineError::Store(e) => ApiError::Common(e),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        let body = match self {
            ApiError::SqlExecution { message, sql } => json!({
                "error": {
                    "code": code,
                    "message": message,
                    "sql": sql,
                }
            }),
            ApiError::BadRequest(msg)
            | ApiError::Conflict(msg)
            | ApiError::Cancelled(msg)
            | ApiError::Transcription(msg)
            | ApiError::Llm(msg)
            | ApiError::Internal(msg) => json!({
                "error": {
                    "code": code,
                    "message": msg,
                }
            }),
            ApiError::Common(ref err) => json!({
                "error": {
                    "code": code,
                    "message": err.to_string(),
                }
            }),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
