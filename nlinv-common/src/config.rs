//! Bootstrap configuration loading
//!
//! Settings are resolved in priority order:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables
//! 3. TOML config file
//! 4. Built-in defaults (fallback)
//!
//! Command-line arguments and environment variables are parsed by the binary
//! (clap with `env`) and applied on top of the TOML layer through
//! [`ConfigOverrides`]. A missing TOML file is not an error; an unreadable or
//! unparseable one is.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "NLINV_CONFIG";

/// Config file name inside `<config_dir>/nlinv/`
pub const CONFIG_FILE_NAME: &str = "nlinv-im.toml";

/// Bootstrap configuration loaded from TOML
///
/// Read once at startup; the service must restart to pick up changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Base URL of the Ollama server hosting the SQL generator model
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Generator model name
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the OpenAI-compatible Whisper server
    #[serde(default = "default_stt_url")]
    pub stt_url: String,

    /// Whisper model name passed with each transcription request
    #[serde(default = "default_stt_model")]
    pub stt_model: String,

    /// Timeout for a single transcription or generation request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Run each generated script inside one transaction
    ///
    /// When false, statements that ran before a failing one stay applied.
    #[serde(default = "default_atomic_batches")]
    pub atomic_batches: bool,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_port() -> u16 {
    5780
}

fn default_bind_address() -> String {
    "127.0.0.1".to_string()
}

fn default_ollama_url() -> String {
    "http://127.0.0.1:11434".to_string()
}

fn default_model() -> String {
    "llama3.2:3b".to_string()
}

fn default_stt_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_stt_model() -> String {
    "medium".to_string()
}

fn default_request_timeout_secs() -> u64 {
    120
}

fn default_atomic_batches() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            bind_address: default_bind_address(),
            ollama_url: default_ollama_url(),
            model: default_model(),
            stt_url: default_stt_url(),
            stt_model: default_stt_model(),
            request_timeout_secs: default_request_timeout_secs(),
            atomic_batches: default_atomic_batches(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Values supplied on the command line or through the environment
///
/// `None` leaves the TOML (or default) value in place.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub bind_address: Option<String>,
    pub ollama_url: Option<String>,
    pub model: Option<String>,
    pub stt_url: Option<String>,
    pub stt_model: Option<String>,
    pub partial_batches: bool,
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
    }

    /// Load configuration from a file
    ///
    /// `None` or a path that does not exist yields built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            info!("No config file found, using built-in defaults");
            return Ok(Self::default());
        };

        if !path.exists() {
            warn!("Config file {} not found, using built-in defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply command-line / environment values on top of this config
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(addr) = overrides.bind_address {
            self.bind_address = addr;
        }
        if let Some(url) = overrides.ollama_url {
            self.ollama_url = url;
        }
        if let Some(model) = overrides.model {
            self.model = model;
        }
        if let Some(url) = overrides.stt_url {
            self.stt_url = url;
        }
        if let Some(model) = overrides.stt_model {
            self.stt_model = model;
        }
        if overrides.partial_batches {
            self.atomic_batches = false;
        }
    }

    /// Reject values the service cannot start with
    pub fn validate(&self) -> Result<()> {
        for (key, url) in [("ollama_url", &self.ollama_url), ("stt_url", &self.stt_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(Error::Config(format!(
                    "{} must be an http(s) URL, got {:?}",
                    key, url
                )));
            }
        }
        if self.model.trim().is_empty() {
            return Err(Error::Config("model must not be empty".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resolve which config file to read
///
/// Priority: explicit path (CLI) -> `NLINV_CONFIG` -> `<config_dir>/nlinv/nlinv-im.toml`
/// when it exists. Returns `None` when no candidate applies.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    default_config_path().filter(|p| p.exists())
}

/// Platform config file location (`~/.config/nlinv/nlinv-im.toml` on Linux)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("nlinv").join(CONFIG_FILE_NAME))
}
