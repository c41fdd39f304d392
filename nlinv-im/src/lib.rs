//! nlinv-im library interface
//!
//! Exposes the pipeline, the inventory store and the HTTP router so the binary
//! and the integration tests build the service the same way.

pub mod api;
pub mod db;
pub mod error;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use chrono::{DateTime, Utc};
use db::InventoryStore;
use nlinv_common::events::EventBus;
use services::InstructionPipeline;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Largest accepted request body (audio uploads)
pub const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Run currently holding the pipeline
#[derive(Debug, Clone)]
pub struct ActiveRun {
    pub run_id: Uuid,
    pub cancel: CancellationToken,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// In-memory inventory, created at startup
    pub store: InventoryStore,
    /// Stage wiring for instruction runs
    pub pipeline: Arc<InstructionPipeline>,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// At most one run at a time
    pub active_run: Arc<Mutex<Option<ActiveRun>>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(store: InventoryStore, pipeline: InstructionPipeline, event_bus: EventBus) -> Self {
        Self {
            store,
            pipeline: Arc::new(pipeline),
            event_bus,
            active_run: Arc::new(Mutex::new(None)),
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Remember the most recent failure for `/health`
    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    Router::new()
        .merge(api::ui_routes())
        .merge(api::inventory_routes())
        .merge(api::instruction_routes())
        .route("/events", get(api::event_stream))
        .merge(api::health_routes())
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
