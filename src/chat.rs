//! Conversational front end: classify, fetch, format.
//!
//! [`ChatFacade::answer`] always yields one text reply. Gateway failures
//! are folded into an apology carrying the failure message; keyword
//! extraction failures silently fall back to the raw question.

use std::sync::Arc;
use tracing::{debug, warn};

use es_assistant_core::format;
use es_assistant_core::gateway::{GatewayError, SearchGateway, CATEGORY_FIELD};
use es_assistant_core::intent::{Intent, IntentClassifier};

use crate::config::ChatConfig;
use crate::keywords::{ExtractError, KeywordExtractor};

/// Words that end an interactive chat session (compared lowercased).
pub const EXIT_WORDS: [&str; 3] = ["sair", "exit", "quit"];

/// Whether `input` asks to leave the chat loop.
pub fn is_exit(input: &str) -> bool {
    let input = input.trim().to_lowercase();
    EXIT_WORDS.contains(&input.as_str())
}

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

pub struct ChatFacade {
    classifier: IntentClassifier,
    gateway: Arc<dyn SearchGateway>,
    extractor: Arc<dyn KeywordExtractor>,
    search_size: usize,
}

impl ChatFacade {
    pub fn new(
        classifier: IntentClassifier,
        gateway: Arc<dyn SearchGateway>,
        extractor: Arc<dyn KeywordExtractor>,
        search_size: usize,
    ) -> Self {
        Self {
            classifier,
            gateway,
            extractor,
            search_size,
        }
    }

    /// Build from `[chat]` settings.
    pub fn from_config(
        config: &ChatConfig,
        gateway: Arc<dyn SearchGateway>,
        extractor: Arc<dyn KeywordExtractor>,
    ) -> anyhow::Result<Self> {
        let classifier = IntentClassifier::new(&config.id_prefix)?;
        Ok(Self::new(classifier, gateway, extractor, config.search_size))
    }

    /// Answer one message. Never fails.
    pub async fn answer(&self, message: &str) -> String {
        match self.try_answer(message).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(error = %err, "chat request failed");
                format::format_apology(&err.to_string())
            }
        }
    }

    /// Answer one message, surfacing pipeline failures.
    pub async fn try_answer(&self, message: &str) -> Result<String, ChatError> {
        let intent = self.classifier.classify(message);
        debug!(kind = ?intent.kind(), "classified");
        self.respond(intent).await
    }

    /// Run the handler for an already classified intent.
    pub async fn respond(&self, intent: Intent) -> Result<String, ChatError> {
        match intent {
            Intent::RecentPosts { limit } => {
                let docs = self.gateway.list_recent(limit).await?;
                Ok(format::format_recent(&docs))
            }
            Intent::Categories => {
                let counts = self.gateway.aggregate_by_field(CATEGORY_FIELD).await?;
                Ok(format::format_categories(&counts))
            }
            Intent::GetById { id: None } => {
                Ok(format::format_missing_id(self.classifier.id_prefix()))
            }
            Intent::GetById { id: Some(id) } => match self.gateway.get_by_id(&id).await? {
                Some(doc) => Ok(format::format_document(&doc)),
                None => Ok(format::format_not_found(&id)),
            },
            Intent::FreeSearch { raw_query } => {
                let keywords = self.keywords(&raw_query).await;
                let docs = self.gateway.search(&keywords, self.search_size).await?;
                Ok(format::format_search(&keywords, &docs))
            }
        }
    }

    async fn keywords(&self, query: &str) -> String {
        match self.extractor.extract(query).await {
            Ok(keywords) => keywords,
            Err(ExtractError::Disabled) => query.to_string(),
            Err(err) => {
                warn!(error = %err, "keyword extraction failed, searching raw query");
                query.to_string()
            }
        }
    }
}
