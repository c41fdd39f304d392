//! nlinv-im - Natural-language inventory manager
//!
//! Serves a single page where a spoken or typed instruction ("add 2 Potato")
//! is turned into SQL by a local model, filtered, and applied to an in-memory
//! inventory table.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use nlinv_common::config::{resolve_config_path, ConfigOverrides, TomlConfig};
use nlinv_common::events::EventBus;
use nlinv_im::db::InventoryStore;
use nlinv_im::services::{Applier, InstructionPipeline, OllamaGenerator, WhisperHttpTranscriber};
use nlinv_im::AppState;

/// Command-line arguments for nlinv-im
#[derive(Parser, Debug)]
#[command(name = "nlinv-im")]
#[command(about = "Natural-language inventory manager")]
#[command(version)]
struct Args {
    /// Config file (default: <config_dir>/nlinv/nlinv-im.toml)
    #[arg(short, long, env = "NLINV_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "NLINV_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(long, env = "NLINV_BIND_ADDRESS")]
    bind_address: Option<String>,

    /// Ollama base URL
    #[arg(long, env = "NLINV_OLLAMA_URL")]
    ollama_url: Option<String>,

    /// Generator model name
    #[arg(short, long, env = "NLINV_MODEL")]
    model: Option<String>,

    /// Whisper server base URL
    #[arg(long, env = "NLINV_STT_URL")]
    stt_url: Option<String>,

    /// Whisper model name
    #[arg(long, env = "NLINV_STT_MODEL")]
    stt_model: Option<String>,

    /// Commit each statement on its own instead of one transaction per script
    #[arg(long)]
    partial_batches: bool,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            port: self.port,
            bind_address: self.bind_address.clone(),
            ollama_url: self.ollama_url.clone(),
            model: self.model.clone(),
            stt_url: self.stt_url.clone(),
            stt_model: self.stt_model.clone(),
            partial_batches: self.partial_batches,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before tracing so the configured level can seed the filter
    let config_path = resolve_config_path(args.config.as_deref());
    let mut config = TomlConfig::load(config_path.as_deref()).context("Failed to load config")?;
    config.apply_overrides(args.overrides());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "nlinv_im={level},nlinv_common={level},tower_http={level}",
                    level = config.logging.level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting nlinv-im v{} ({} {}, built {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_PROFILE"),
        env!("BUILD_TIMESTAMP")
    );
    match &config_path {
        Some(path) => info!("Config: {}", path.display()),
        None => info!("Config: built-in defaults"),
    }

    config.validate().context("Invalid configuration")?;
    if !config.atomic_batches {
        warn!("Partial batches enabled: statements before a failing one stay applied");
    }

    let store = InventoryStore::open_in_memory()
        .await
        .context("Failed to initialize inventory database")?;

    let timeout = Duration::from_secs(config.request_timeout_secs);
    let transcriber = WhisperHttpTranscriber::new(&config.stt_url, &config.stt_model, timeout)
        .context("Failed to create transcription client")?;
    let generator = OllamaGenerator::new(&config.ollama_url, &config.model, timeout)
        .context("Failed to create generator client")?;

    let event_bus = EventBus::new(100);
    let pipeline = InstructionPipeline::new(
        Arc::new(transcriber),
        Arc::new(generator),
        Applier::new(config.atomic_batches),
        event_bus.clone(),
    );

    let state = AppState::new(store, pipeline, event_bus);
    let app = nlinv_im::build_router(state);

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.bind_address, config.port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;
    info!("Listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
