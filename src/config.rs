use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use es_assistant_core::intent::DEFAULT_ID_PREFIX;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub elasticsearch: ElasticsearchConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ElasticsearchConfig {
    #[serde(default = "default_es_url")]
    pub url: String,
    #[serde(default = "default_index")]
    pub index: String,
    #[serde(default = "default_es_timeout_secs")]
    pub timeout_secs: u64,
    /// Upper bound on buckets requested by a terms aggregation.
    #[serde(default = "default_max_buckets")]
    pub max_buckets: usize,
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            url: default_es_url(),
            index: default_index(),
            timeout_secs: default_es_timeout_secs(),
            max_buckets: default_max_buckets(),
        }
    }
}

fn default_es_url() -> String {
    "http://elasticsearch:9200".to_string()
}
fn default_index() -> String {
    "sample_data".to_string()
}
fn default_es_timeout_secs() -> u64 {
    30
}
fn default_max_buckets() -> usize {
    1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_llm_host")]
    pub host: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            host: default_llm_host(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "ollama".to_string()
}
fn default_llm_host() -> String {
    "http://localhost:11434".to_string()
}
fn default_model() -> String {
    "mistral".to_string()
}
fn default_temperature() -> f32 {
    0.5
}
fn default_llm_timeout_secs() -> u64 {
    60
}

impl LlmConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatConfig {
    /// Prefix of id tokens recognized in chat queries (`post_` in `post_12`).
    #[serde(default = "default_id_prefix")]
    pub id_prefix: String,
    /// Number of hits requested by a free-text chat search.
    #[serde(default = "default_search_size")]
    pub search_size: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            id_prefix: default_id_prefix(),
            search_size: default_search_size(),
        }
    }
}

fn default_id_prefix() -> String {
    DEFAULT_ID_PREFIX.to_string()
}
fn default_search_size() -> usize {
    5
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7341".to_string()
}

impl Config {
    /// Configuration used when no config file is present: every section at
    /// its defaults.
    pub fn minimal() -> Self {
        Self::default()
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&content)?;
    Ok(config)
}

/// Parse and validate a TOML configuration document.
pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config = toml::from_str(content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    // Validate elasticsearch
    if config.elasticsearch.url.trim().is_empty() {
        anyhow::bail!("elasticsearch.url must not be empty");
    }
    if config.elasticsearch.index.trim().is_empty() {
        anyhow::bail!("elasticsearch.index must not be empty");
    }
    if config.elasticsearch.timeout_secs == 0 {
        anyhow::bail!("elasticsearch.timeout_secs must be > 0");
    }
    if config.elasticsearch.max_buckets == 0 {
        anyhow::bail!("elasticsearch.max_buckets must be > 0");
    }

    // Validate llm
    match config.llm.provider.as_str() {
        "disabled" | "ollama" => {}
        other => anyhow::bail!(
            "Unknown llm provider: '{}'. Must be disabled or ollama.",
            other
        ),
    }
    if config.llm.is_enabled() {
        if config.llm.model.trim().is_empty() {
            anyhow::bail!(
                "llm.model must be specified when provider is '{}'",
                config.llm.provider
            );
        }
        if config.llm.timeout_secs == 0 {
            anyhow::bail!("llm.timeout_secs must be > 0");
        }
    }

    // Validate chat
    if config.chat.id_prefix.is_empty() {
        anyhow::bail!("chat.id_prefix must not be empty");
    }
    if config.chat.search_size == 0 {
        anyhow::bail!("chat.search_size must be > 0");
    }

    Ok(())
}
