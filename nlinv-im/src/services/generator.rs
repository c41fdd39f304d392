//! SQL generator
//!
//! Embeds the instruction in a fixed prompt describing the Inventory table and
//! asks a locally hosted Ollama model for SQL. The model is an untrusted oracle:
//! its output is only assumed to contain SQL-looking lines, which the
//! normalizer filters afterwards.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

const USER_AGENT: &str = concat!("nlinv-im/", env!("CARGO_PKG_VERSION"));

const PROMPT_TEMPLATE: &str = r#"
You are a helpful assistant that converts natural language inventory instructions
into simple, direct SQL queries for SQLite.

Table: Inventory
Columns:
- "item no" INTEGER PRIMARY KEY AUTOINCREMENT
- item_name TEXT (must match exactly: {vocabulary})
- quantity INTEGER

Instructions:
1. For simple commands like 'add N ITEM' or 'remove N ITEM', generate minimal SQL:
   - Use UPDATE to increment/decrement quantity of existing items.
   - Only use INSERT if the item does not exist.
2. For 'update ITEM to N', set quantity to N.
3. For 'show all items', generate SELECT * FROM Inventory.
4. Only generate multiple statements if multiple commands are given (use semicolons).
5. Do NOT generate unnecessary JOINs, CASE statements, or complex queries for simple instructions.
6. Use exact column names and make statements SQLite-compatible.
7. Return SQL statements that directly update the database. No explanations.

User Instruction: "{instruction}"
"#;

/// Generation-stage errors
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Prompt construction failed: {0}")]
    Prompt(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Model API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Text-in/text-out model backend
#[async_trait]
pub trait SqlGenerator: Send + Sync {
    /// Run one generation for a fully formed prompt, returning the primary text output
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;

    /// Model identifier for logs and the UI
    fn model(&self) -> &str;
}

/// Build the generator prompt for one instruction
///
/// `vocabulary` lists the item names the model must use verbatim.
pub fn build_prompt(instruction: &str, vocabulary: &[String]) -> Result<String, GenerationError> {
    let instruction = instruction.trim();
    if instruction.is_empty() {
        return Err(GenerationError::Prompt("instruction is empty".to_string()));
    }
    if vocabulary.is_empty() {
        return Err(GenerationError::Prompt(
            "inventory has no item names to offer the model".to_string(),
        ));
    }

    // Double quotes would end the quoted instruction early
    let instruction = instruction.replace('"', "'");

    Ok(PROMPT_TEMPLATE
        .replace("{vocabulary}", &vocabulary.join(", "))
        .replace("{instruction}", &instruction))
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

/// Ollama backend: `POST /api/generate` with streaming disabled
pub struct OllamaGenerator {
    http_client: reqwest::Client,
    url: String,
    model: String,
}

impl OllamaGenerator {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Result<Self, GenerationError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| GenerationError::NetworkError(e.to_string()))?;

        let url = format!("{}/api/generate", base_url.trim_end_matches('/'));
        info!("OllamaGenerator: endpoint {} (model {})", url, model);

        Ok(Self {
            http_client,
            url,
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl SqlGenerator for OllamaGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
        };

        let response = self
            .http_client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GenerationError::ApiError(status.as_u16(), error_text));
        }

        let body: GenerateResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::ParseError(e.to_string()))?;

        let text = body.response.trim().to_string();
        debug!(chars = text.len(), "Model response received");
        Ok(text)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
