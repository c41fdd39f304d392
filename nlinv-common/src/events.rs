//! Event types for the nlinv event system
//!
//! Every pipeline stage transition is published as an [`InventoryEvent`] on the
//! [`EventBus`]. The HTTP layer forwards them to the browser over SSE so the page
//! can show "Transcribing audio...", "Generating SQL..." and friends while a run
//! is in flight.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Where an instruction came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstructionSource {
    /// Transcript of an uploaded audio clip
    Audio,
    /// Typed text
    Typed,
}

impl InstructionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            InstructionSource::Audio => "audio",
            InstructionSource::Typed => "typed",
        }
    }
}

/// Pipeline stage that reported a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Transcription,
    Generation,
    Execution,
}

/// nlinv event types
///
/// Serialized with a `type` tag for SSE transmission.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InventoryEvent {
    /// Audio upload accepted, transcription request sent
    TranscriptionStarted {
        run_id: Uuid,
        /// Original upload file name
        file_name: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Transcript received (already trimmed)
    TranscriptionCompleted {
        run_id: Uuid,
        transcript: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// An instruction is available and will be processed
    InstructionReceived {
        run_id: Uuid,
        instruction: String,
        source: InstructionSource,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Prompt sent to the generator model
    SqlGenerationStarted {
        run_id: Uuid,
        model: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Normalized script ready for execution
    SqlGenerated {
        run_id: Uuid,
        sql: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Script applied and table re-read
    InventoryUpdated {
        run_id: Uuid,
        item_count: usize,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A stage failed; the run is over
    PipelineFailed {
        run_id: Uuid,
        stage: PipelineStage,
        message: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// The run was cancelled before anything was applied
    PipelineCancelled {
        run_id: Uuid,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl InventoryEvent {
    /// Event name used as the SSE `event:` field
    pub fn event_type(&self) -> &str {
        match self {
            InventoryEvent::TranscriptionStarted { .. } => "TranscriptionStarted",
            InventoryEvent::TranscriptionCompleted { .. } => "TranscriptionCompleted",
            InventoryEvent::InstructionReceived { .. } => "InstructionReceived",
            InventoryEvent::SqlGenerationStarted { .. } => "SqlGenerationStarted",
            InventoryEvent::SqlGenerated { .. } => "SqlGenerated",
            InventoryEvent::InventoryUpdated { .. } => "InventoryUpdated",
            InventoryEvent::PipelineFailed { .. } => "PipelineFailed",
            InventoryEvent::PipelineCancelled { .. } => "PipelineCancelled",
        }
    }

    /// Run this event belongs to
    pub fn run_id(&self) -> Uuid {
        match self {
            InventoryEvent::TranscriptionStarted { run_id, .. }
            | InventoryEvent::TranscriptionCompleted { run_id, .. }
            | InventoryEvent::InstructionReceived { run_id, .. }
            | InventoryEvent::SqlGenerationStarted { run_id, .. }
            | InventoryEvent::SqlGenerated { run_id, .. }
            | InventoryEvent::InventoryUpdated { run_id, .. }
            | InventoryEvent::PipelineFailed { run_id, .. }
            | InventoryEvent::PipelineCancelled { run_id, .. } => *run_id,
        }
    }
}

/// Broadcast bus for [`InventoryEvent`]s
///
/// Cloning shares the underlying channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<InventoryEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<InventoryEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: InventoryEvent,
    ) -> Result<usize, broadcast::error::SendError<InventoryEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: InventoryEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
