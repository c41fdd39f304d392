//! Ollama and Whisper HTTP clients against local mock servers

use axum::{
    extract::Multipart,
    http::StatusCode,
    routing::post,
    Json, Router,
};
use nlinv_im::services::{
    acquirer::transcribe_upload, AudioUpload, GenerationError, OllamaGenerator, SqlGenerator,
    Transcriber, TranscriptionError, WhisperHttpTranscriber,
};
use serde_json::{json, Value};
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

/// Serve `app` on an ephemeral port, returning its base URL
async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

/// Base URL nothing is listening on
async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_ollama_generate_round_trip() {
    let app = Router::new().route(
        "/api/generate",
        post(|Json(body): Json<Value>| async move {
            assert_eq!(body["model"], "llama3.2:3b");
            assert_eq!(body["stream"], false);
            assert!(body["prompt"].as_str().unwrap().contains("add 2 Potato"));
            Json(json!({
                "model": "llama3.2:3b",
                "response": "\nUPDATE Inventory SET quantity = quantity + 2 WHERE item_name = 'Potato';\n",
                "done": true
            }))
        }),
    );
    let base_url = spawn_server(app).await;

    let generator = OllamaGenerator::new(&base_url, "llama3.2:3b", TIMEOUT).unwrap();
    let text = generator.generate("User Instruction: \"add 2 Potato\"").await.unwrap();

    assert_eq!(
        text,
        "UPDATE Inventory SET quantity = quantity + 2 WHERE item_name = 'Potato';"
    );
}

#[tokio::test]
async fn test_ollama_error_status() {
    let app = Router::new().route(
        "/api/generate",
        post(|| async { (StatusCode::NOT_FOUND, "model 'nope' not found") }),
    );
    let base_url = spawn_server(app).await;

    let generator = OllamaGenerator::new(&base_url, "nope", TIMEOUT).unwrap();
    let err = generator.generate("prompt").await.unwrap_err();

    match err {
        GenerationError::ApiError(status, body) => {
            assert_eq!(status, 404);
            assert!(body.contains("not found"));
        }
        other => panic!("expected API error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_ollama_unexpected_body() {
    let app = Router::new().route(
        "/api/generate",
        post(|| async { Json(json!({ "done": true })) }),
    );
    let base_url = spawn_server(app).await;

    let generator = OllamaGenerator::new(&base_url, "llama3.2:3b", TIMEOUT).unwrap();
    let err = generator.generate("prompt").await.unwrap_err();

    assert!(matches!(err, GenerationError::ParseError(_)));
}

#[tokio::test]
async fn test_ollama_unreachable() {
    let generator = OllamaGenerator::new(&closed_port_url().await, "llama3.2:3b", TIMEOUT).unwrap();
    let err = generator.generate("prompt").await.unwrap_err();

    assert!(matches!(err, GenerationError::NetworkError(_)));
}

#[tokio::test]
async fn test_whisper_translation_round_trip() {
    let app = Router::new().route(
        "/v1/audio/translations",
        post(|mut multipart: Multipart| async move {
            let mut file_name = None;
            let mut file_len = 0;
            let mut model = None;
            let mut format = None;

            while let Some(field) = multipart.next_field().await.unwrap() {
                let name = field.name().unwrap_or_default().to_string();
                match name.as_str() {
                    "file" => {
                        file_name = field.file_name().map(str::to_string);
                        file_len = field.bytes().await.unwrap().len();
                    }
                    "model" => model = Some(field.text().await.unwrap()),
                    "response_format" => format = Some(field.text().await.unwrap()),
                    _ => {}
                }
            }

            assert!(file_name.unwrap().ends_with(".opus"));
            assert_eq!(file_len, 6);
            assert_eq!(model.as_deref(), Some("medium"));
            assert_eq!(format.as_deref(), Some("json"));
            Json(json!({ "text": "  Add five carrots. " }))
        }),
    );
    let base_url = spawn_server(app).await;

    let transcriber = WhisperHttpTranscriber::new(&base_url, "medium", TIMEOUT).unwrap();
    let upload = AudioUpload::new("memo.opus", b"OggS..".to_vec());
    let transcript = transcribe_upload(&transcriber, &upload).await.unwrap();

    assert_eq!(transcript, "Add five carrots.");
}

#[tokio::test]
async fn test_whisper_error_status() {
    let app = Router::new().route(
        "/v1/audio/translations",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "decoder failed") }),
    );
    let base_url = spawn_server(app).await;

    let transcriber = WhisperHttpTranscriber::new(&base_url, "medium", TIMEOUT).unwrap();
    let upload = AudioUpload::new("memo.wav", vec![0; 16]);
    let err = transcribe_upload(&transcriber, &upload).await.unwrap_err();

    assert!(matches!(err, TranscriptionError::ApiError(500, _)));
    assert_eq!(transcriber.name(), "whisper-http");
}
