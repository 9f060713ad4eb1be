//! Keyword extraction for free-text chat searches.
//!
//! A language model rewrites the user's question into a few search
//! keywords before it is sent to the gateway. Extraction is best effort:
//! callers fall back to the raw question on any [`ExtractError`].
//!
//! # Providers
//!
//! - **[`DisabledExtractor`]**: always fails with [`ExtractError::Disabled`].
//! - **[`OllamaExtractor`]**: `POST {host}/api/generate`, non-streaming.
//!
//! Use [`create_extractor`] to pick one from `[llm]` configuration.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::config::LlmConfig;

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("keyword extraction is disabled")]
    Disabled,
    #[error("language model request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("language model returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected language model response: {0}")]
    Decode(String),
    #[error("language model returned no keywords")]
    Empty,
}

/// Turns a question into search keywords.
#[async_trait]
pub trait KeywordExtractor: Send + Sync {
    /// Model identifier, or `"disabled"`.
    fn model_name(&self) -> &str;

    /// Space-separated keywords for `query`.
    async fn extract(&self, query: &str) -> Result<String, ExtractError>;
}

/// Prompt sent to the model for `query`.
pub fn keyword_prompt(query: &str) -> String {
    format!(
        "Extract the main keywords from this question \
         (answer only with the words, separated by spaces): {}",
        query
    )
}

/// Build the extractor selected by `config.provider`.
pub fn create_extractor(config: &LlmConfig) -> Result<Arc<dyn KeywordExtractor>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledExtractor)),
        "ollama" => Ok(Arc::new(OllamaExtractor::new(config)?)),
        other => anyhow::bail!("Unknown llm provider: {}", other),
    }
}

// ============ Disabled Extractor ============

pub struct DisabledExtractor;

#[async_trait]
impl KeywordExtractor for DisabledExtractor {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn extract(&self, _query: &str) -> Result<String, ExtractError> {
        Err(ExtractError::Disabled)
    }
}

// ============ Ollama Extractor ============

/// Extractor backed by a local Ollama server.
pub struct OllamaExtractor {
    client: Client,
    host: String,
    model: String,
    temperature: f32,
}

impl OllamaExtractor {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            host: config.host.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl KeywordExtractor for OllamaExtractor {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn extract(&self, query: &str) -> Result<String, ExtractError> {
        let url = format!("{}/api/generate", self.host);
        let payload = json!({
            "model": self.model,
            "prompt": keyword_prompt(query),
            "stream": false,
            "options": { "temperature": self.temperature },
        });
        debug!(model = %self.model, "keyword extraction request");

        let response = self.client.post(&url).json(&payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let data: Value = response
            .json()
            .await
            .map_err(|e| ExtractError::Decode(e.to_string()))?;
        let text = data
            .get("response")
            .and_then(Value::as_str)
            .ok_or_else(|| ExtractError::Decode("missing 'response' field".to_string()))?;

        let keywords = text.trim();
        if keywords.is_empty() {
            return Err(ExtractError::Empty);
        }
        Ok(keywords.to_string())
    }
}
