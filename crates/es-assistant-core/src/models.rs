//! Core data models shared by the chat and protocol paths.
//!
//! A [`Document`] is the `_source` of one hit in the backing index. The
//! core only ever reads and renders documents; it never mutates them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A document stored in the search backend.
///
/// Field names follow the index mapping (`created_at`, `updated_at`), so a
/// hit's `_source` deserializes directly. Every field except `id` has a
/// default, which lets partially populated documents render with
/// placeholders instead of failing to decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Stable identifier, unique within the index (e.g. `post_1`).
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// ISO-8601 creation timestamp as stored by the backend.
    #[serde(default)]
    pub created_at: String,
    /// ISO-8601 update timestamp as stored by the backend.
    #[serde(default)]
    pub updated_at: String,
    /// Open scalar mapping (`user_id`, `user_name`, `user_email`, ...).
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Dense vector owned by the backend; opaque to the core.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Document {
    /// Create a document with the given id and title and empty everything else.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            content: String::new(),
            category: String::new(),
            tags: Vec::new(),
            created_at: String::new(),
            updated_at: String::new(),
            metadata: Map::new(),
            embedding: None,
        }
    }

    /// Look up a metadata entry and render it as plain text.
    ///
    /// Strings are returned without quotes; numbers and booleans use their
    /// JSON form. Missing, null, empty, and non-scalar values yield `None`.
    pub fn metadata_text(&self, key: &str) -> Option<String> {
        match self.metadata.get(key)? {
            Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    /// The author's display name, from `metadata.user_name`.
    pub fn author(&self) -> Option<String> {
        self.metadata_text("user_name")
    }

    /// The author's email address, from `metadata.user_email`.
    pub fn author_email(&self) -> Option<String> {
        self.metadata_text("user_email")
    }

    /// The calendar-date part (`YYYY-MM-DD`) of `created_at`.
    pub fn created_date(&self) -> Option<String> {
        let date: String = self.created_at.chars().take(10).collect();
        if date.is_empty() {
            None
        } else {
            Some(date)
        }
    }
}

/// Index-level counters backing the `stats` resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub document_count: u64,
    pub size_in_bytes: u64,
}
