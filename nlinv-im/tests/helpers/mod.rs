//! Test Helper Utilities
//!
//! Stub backends and app construction shared by the nlinv-im integration tests

#![allow(dead_code)]

pub mod stubs;

pub use stubs::{StubGenerator, StubTranscriber};

use nlinv_common::events::{EventBus, InventoryEvent};
use nlinv_im::db::InventoryStore;
use nlinv_im::services::{Applier, InstructionPipeline};
use nlinv_im::AppState;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Pipeline over the given stubs plus a fresh seeded store
pub async fn create_test_pipeline(
    transcriber: Arc<StubTranscriber>,
    generator: Arc<StubGenerator>,
    atomic: bool,
) -> (InstructionPipeline, InventoryStore, EventBus) {
    let store = InventoryStore::open_in_memory()
        .await
        .expect("Failed to create in-memory inventory");
    let event_bus = EventBus::new(100);
    let pipeline = InstructionPipeline::new(
        transcriber,
        generator,
        Applier::new(atomic),
        event_bus.clone(),
    );
    (pipeline, store, event_bus)
}

/// Router and state over the given stubs, atomic batches
pub async fn create_test_app(
    transcriber: Arc<StubTranscriber>,
    generator: Arc<StubGenerator>,
) -> (axum::Router, AppState) {
    create_test_app_with_batches(transcriber, generator, true).await
}

/// Router and state over the given stubs with the chosen batch mode
pub async fn create_test_app_with_batches(
    transcriber: Arc<StubTranscriber>,
    generator: Arc<StubGenerator>,
    atomic: bool,
) -> (axum::Router, AppState) {
    let (pipeline, store, event_bus) = create_test_pipeline(transcriber, generator, atomic).await;
    let state = AppState::new(store, pipeline, event_bus);
    let app = nlinv_im::build_router(state.clone());
    (app, state)
}

/// Events already published on `rx`
pub fn drain_events(rx: &mut broadcast::Receiver<InventoryEvent>) -> Vec<InventoryEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

const BOUNDARY: &str = "nlinv-test-boundary";

/// Hand-built multipart body as the page's `FormData` would send it
///
/// Returns (content type, body).
pub fn multipart_body(audio: Option<(&str, &[u8])>, instruction: Option<&str>) -> (String, Vec<u8>) {
    let mut body = Vec::new();

    if let Some((file_name, bytes)) = audio {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"audio\"; filename=\"{file_name}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }

    if let Some(text) = instruction {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"instruction\"\r\n\r\n{text}\r\n"
            )
            .as_bytes(),
        );
    }

    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

/// Short silent mono WAV clip
pub fn silent_wav() -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: 16_000,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut buffer = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut buffer, spec).expect("Failed to create WAV writer");
        for _ in 0..1600 {
            writer.write_sample(0i16).expect("Failed to write sample");
        }
        writer.finalize().expect("Failed to finalize WAV");
    }
    buffer.into_inner()
}
