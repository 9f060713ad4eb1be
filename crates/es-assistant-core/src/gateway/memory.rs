//! In-memory [`SearchGateway`] implementation for tests and offline demos.
//!
//! Documents live in a `Vec` behind `std::sync::RwLock`, so insertion order
//! doubles as the "backend-native" order used to break ties. Relevance is a
//! plain term count with title hits weighted twice.

use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::models::{Document, IndexStats};

use super::{FieldCounts, GatewayError, SearchGateway};

/// In-memory gateway over a fixed set of documents.
pub struct InMemoryGateway {
    index: String,
    docs: RwLock<Vec<Document>>,
    outage: RwLock<Option<String>>,
}

impl InMemoryGateway {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            docs: RwLock::new(Vec::new()),
            outage: RwLock::new(None),
        }
    }

    /// Create a gateway pre-loaded with `docs`.
    pub fn with_documents(index: impl Into<String>, docs: Vec<Document>) -> Self {
        let gateway = Self::new(index);
        for doc in docs {
            gateway.upsert(doc);
        }
        gateway
    }

    /// Insert a document, replacing any existing one with the same id.
    pub fn upsert(&self, doc: Document) {
        let mut docs = self.docs.write().unwrap_or_else(|e| e.into_inner());
        match docs.iter_mut().find(|d| d.id == doc.id) {
            Some(existing) => *existing = doc,
            None => docs.push(doc),
        }
    }

    /// Make every subsequent call fail with [`GatewayError::Unavailable`]
    /// carrying `reason`, or clear the outage with `None`.
    pub fn set_outage(&self, reason: Option<&str>) {
        *self.outage.write().unwrap_or_else(|e| e.into_inner()) = reason.map(str::to_string);
    }

    fn check_outage(&self) -> Result<(), GatewayError> {
        match self.outage.read().unwrap_or_else(|e| e.into_inner()).as_ref() {
            Some(reason) => Err(GatewayError::Unavailable(reason.clone())),
            None => Ok(()),
        }
    }

    fn snapshot(&self) -> Vec<Document> {
        self.docs.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

fn relevance(doc: &Document, terms: &[String]) -> usize {
    let title = doc.title.to_lowercase();
    let content = doc.content.to_lowercase();
    let tags: Vec<String> = doc.tags.iter().map(|t| t.to_lowercase()).collect();
    terms
        .iter()
        .map(|t| {
            let mut score = 0;
            if title.contains(t.as_str()) {
                score += 2;
            }
            if content.contains(t.as_str()) {
                score += 1;
            }
            if tags.iter().any(|tag| tag.contains(t.as_str())) {
                score += 1;
            }
            score
        })
        .sum()
}

fn field_values(doc: &Document, field: &str) -> Vec<String> {
    match field {
        "category" => vec![doc.category.clone()],
        "tags" => doc.tags.clone(),
        "id" => vec![doc.id.clone()],
        other => doc.metadata_text(other).into_iter().collect(),
    }
}

/// The mapping used by the sample index, in the shape returned by the
/// backend for a single index.
pub fn sample_mapping() -> Value {
    json!({
        "mappings": {
            "properties": {
                "id": { "type": "keyword" },
                "title": { "type": "text" },
                "content": { "type": "text" },
                "category": { "type": "keyword" },
                "tags": { "type": "keyword" },
                "created_at": { "type": "date" },
                "updated_at": { "type": "date" },
                "metadata": { "type": "object" },
                "embedding": { "type": "dense_vector", "dims": 384 }
            }
        }
    })
}

#[async_trait]
impl SearchGateway for InMemoryGateway {
    fn index_name(&self) -> &str {
        &self.index
    }

    async fn search(&self, text: &str, limit: usize) -> Result<Vec<Document>, GatewayError> {
        self.check_outage()?;
        let terms: Vec<String> = text
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<(usize, Document)> = self
            .snapshot()
            .into_iter()
            .filter_map(|doc| {
                let score = relevance(&doc, &terms);
                (score > 0).then_some((score, doc))
            })
            .collect();
        // stable sort keeps insertion order among ties
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored.into_iter().take(limit).map(|(_, d)| d).collect())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Document>, GatewayError> {
        self.check_outage()?;
        Ok(self.snapshot().into_iter().find(|d| d.id == id))
    }

    async fn aggregate_by_field(&self, field: &str) -> Result<FieldCounts, GatewayError> {
        self.check_outage()?;
        let mut counts = FieldCounts::new();
        for doc in self.snapshot() {
            for value in field_values(&doc, field) {
                if !value.is_empty() {
                    *counts.entry(value).or_insert(0) += 1;
                }
            }
        }
        Ok(counts)
    }

    async fn list_recent(&self, limit: usize) -> Result<Vec<Document>, GatewayError> {
        self.check_outage()?;
        let mut docs = self.snapshot();
        // ISO-8601 timestamps of one shape order lexically
        docs.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        docs.truncate(limit);
        Ok(docs)
    }

    async fn index_stats(&self) -> Result<IndexStats, GatewayError> {
        self.check_outage()?;
        let docs = self.snapshot();
        let size_in_bytes = docs
            .iter()
            .map(|d| serde_json::to_vec(d).map(|b| b.len() as u64).unwrap_or(0))
            .sum();
        Ok(IndexStats {
            document_count: docs.len() as u64,
            size_in_bytes,
        })
    }

    async fn field_mapping(&self) -> Result<Value, GatewayError> {
        self.check_outage()?;
        Ok(sample_mapping())
    }

    async fn ping(&self) -> Result<String, GatewayError> {
        self.check_outage()?;
        Ok("in-memory".to_string())
    }
}
