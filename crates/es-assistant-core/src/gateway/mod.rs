//! Search backend abstraction.
//!
//! The [`SearchGateway`] trait is the only view the classifier, the chat
//! facade, and the protocol dispatcher have of the document index. It speaks
//! in primitive parameters and plain data; no query language leaks above it.
//!
//! Implementations must be `Send + Sync` so a single instance can be shared
//! behind an `Arc` by every transport.

pub mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::models::{Document, IndexStats};

/// Document counts keyed by distinct field value.
///
/// Consumers must treat the mapping as unordered; the `BTreeMap` only makes
/// serialized output stable.
pub type FieldCounts = BTreeMap<String, u64>;

/// Field holding a document's category; the target of category counts.
pub const CATEGORY_FIELD: &str = "category";

/// Failures raised by a [`SearchGateway`].
///
/// A missing document is not a failure: [`SearchGateway::get_by_id`]
/// reports it as `Ok(None)`.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The backend could not be reached (connection refused, timeout, DNS).
    #[error("backend unavailable: {0}")]
    Unavailable(String),
    /// The backend answered with an error status.
    #[error("backend error (HTTP {status}): {message}")]
    Backend { status: u16, message: String },
    /// The backend answered, but not in the expected shape.
    #[error("unexpected backend response: {0}")]
    Decode(String),
}

/// Capability interface the core requires from the document backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`search`](SearchGateway::search) | Relevance-ranked multi-field match |
/// | [`get_by_id`](SearchGateway::get_by_id) | Exact lookup, `None` when absent |
/// | [`aggregate_by_field`](SearchGateway::aggregate_by_field) | Count documents per distinct value |
/// | [`list_recent`](SearchGateway::list_recent) | Newest documents first |
/// | [`index_stats`](SearchGateway::index_stats) | Document count and store size |
/// | [`field_mapping`](SearchGateway::field_mapping) | The index's field mapping |
/// | [`ping`](SearchGateway::ping) | Connectivity check |
#[async_trait]
pub trait SearchGateway: Send + Sync {
    /// Name of the index this gateway reads from (e.g. `"sample_data"`).
    fn index_name(&self) -> &str;

    /// Relevance-ranked match over title (weighted higher), content, and tags.
    ///
    /// Returns at most `limit` documents. Order among equally scored hits is
    /// backend-defined and not stable.
    async fn search(&self, text: &str, limit: usize) -> Result<Vec<Document>, GatewayError>;

    /// Fetch one document by id, or `None` if no such document exists.
    async fn get_by_id(&self, id: &str) -> Result<Option<Document>, GatewayError>;

    /// Count documents per distinct value of `field`.
    ///
    /// Every value with a non-zero count is present.
    async fn aggregate_by_field(&self, field: &str) -> Result<FieldCounts, GatewayError>;

    /// Documents sorted by `created_at` descending, truncated to `limit`.
    async fn list_recent(&self, limit: usize) -> Result<Vec<Document>, GatewayError>;

    /// Primary-shard document count and store size.
    async fn index_stats(&self) -> Result<IndexStats, GatewayError>;

    /// The backend's field mapping for the index, as JSON.
    async fn field_mapping(&self) -> Result<Value, GatewayError>;

    /// Check connectivity, returning a short backend description (version).
    async fn ping(&self) -> Result<String, GatewayError>;
}
