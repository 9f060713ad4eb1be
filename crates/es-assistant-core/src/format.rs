//! Human-readable report rendering for chat answers.
//!
//! Every function here is pure and infallible: missing fields render as
//! [`UNKNOWN`] or [`NOT_AVAILABLE`] instead of failing. The templates (field
//! order, labels, preview budgets, the proportional bar) are relied on by
//! downstream consumers and golden-output tests, so changes here are
//! behavior changes.

use serde::Serialize;

use crate::gateway::FieldCounts;
use crate::models::Document;

/// Placeholder for a missing title, author, category, or date.
pub const UNKNOWN: &str = "Unknown";
/// Placeholder for a missing email or an empty tag list.
pub const NOT_AVAILABLE: &str = "N/A";
/// Appended to every content preview.
pub const ELLIPSIS: &str = "...";
/// Preview budget, in characters, for the recent-posts listing.
pub const RECENT_PREVIEW_CHARS: usize = 80;
/// Preview budget, in characters, for free-search results.
pub const SEARCH_PREVIEW_CHARS: usize = 100;
/// One marker unit per five percentage points.
pub const BAR_MARKER: char = '█';

/// One bucket of a category distribution, with derived display values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub name: String,
    pub count: u64,
    /// `count / total * 100`.
    pub percentage: f64,
    /// `floor(percentage / 5)`.
    pub bar_len: usize,
}

/// The first `budget` characters of `text` followed by [`ELLIPSIS`].
pub fn preview(text: &str, budget: usize) -> String {
    let mut out: String = text.chars().take(budget).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Bar length for a percentage: `floor(pct / 5)` marker units.
pub fn bar_length(percentage: f64) -> usize {
    if percentage.is_finite() && percentage > 0.0 {
        (percentage / 5.0).floor() as usize
    } else {
        0
    }
}

/// Compute each bucket's share of the total, largest first (ties by name).
///
/// Returns an empty list when the total is zero.
pub fn category_shares(counts: &FieldCounts) -> Vec<CategoryShare> {
    let total: u64 = counts.values().sum();
    if total == 0 {
        return Vec::new();
    }
    let mut shares: Vec<CategoryShare> = counts
        .iter()
        .filter(|(_, count)| **count > 0)
        .map(|(name, count)| {
            let percentage = (*count as f64 / total as f64) * 100.0;
            CategoryShare {
                name: name.clone(),
                count: *count,
                percentage,
                bar_len: bar_length(percentage),
            }
        })
        .collect();
    shares.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    shares
}

fn or_placeholder(value: &str, placeholder: &str) -> String {
    if value.trim().is_empty() {
        placeholder.to_string()
    } else {
        value.to_string()
    }
}

fn author_of(doc: &Document) -> String {
    doc.author().unwrap_or_else(|| UNKNOWN.to_string())
}

/// Numbered listing of the newest documents.
pub fn format_recent(docs: &[Document]) -> String {
    if docs.is_empty() {
        return "No documents found.".to_string();
    }

    let mut out = format!("The {} most recent posts:\n\n", docs.len());
    for (i, doc) in docs.iter().enumerate() {
        out.push_str(&format!("{}. **{}**\n", i + 1, or_placeholder(&doc.title, UNKNOWN)));
        out.push_str(&format!("   • ID: {}\n", doc.id));
        out.push_str(&format!("   • Author: {}\n", author_of(doc)));
        out.push_str(&format!(
            "   • Created: {}\n",
            doc.created_date().unwrap_or_else(|| UNKNOWN.to_string())
        ));
        out.push_str(&format!(
            "   • Preview: {}\n\n",
            preview(&doc.content, RECENT_PREVIEW_CHARS)
        ));
    }
    out
}

/// Per-category distribution with percentages and proportional bars.
pub fn format_categories(counts: &FieldCounts) -> String {
    let shares = category_shares(counts);
    if shares.is_empty() {
        return "No categories found.".to_string();
    }

    let total: u64 = shares.iter().map(|s| s.count).sum();
    let mut out = String::from("Document distribution by category:\n\n");
    for share in &shares {
        out.push_str(&format!(
            "• {}: {} docs ({:.1}%)\n",
            share.name, share.count, share.percentage
        ));
        let bar: String = std::iter::repeat(BAR_MARKER).take(share.bar_len).collect();
        out.push_str(&format!("  {}\n\n", bar));
    }
    out.push_str(&format!("Total: {} documents", total));
    out
}

/// Full detail view of a single document.
pub fn format_document(doc: &Document) -> String {
    let tags = if doc.tags.is_empty() {
        NOT_AVAILABLE.to_string()
    } else {
        doc.tags.join(", ")
    };

    let mut out = String::from("**Document details**\n\n");
    out.push_str(&format!("**Title:** {}\n", or_placeholder(&doc.title, UNKNOWN)));
    out.push_str(&format!("**ID:** {}\n", doc.id));
    out.push_str(&format!("**Author:** {}\n", author_of(doc)));
    out.push_str(&format!(
        "**Email:** {}\n",
        doc.author_email().unwrap_or_else(|| NOT_AVAILABLE.to_string())
    ));
    out.push_str(&format!("**Category:** {}\n", or_placeholder(&doc.category, UNKNOWN)));
    out.push_str(&format!("**Tags:** {}\n", tags));
    out.push_str(&format!(
        "**Created:** {}\n\n",
        doc.created_date().unwrap_or_else(|| UNKNOWN.to_string())
    ));
    out.push_str(&format!("**Content:**\n{}\n", doc.content));
    out
}

/// Answer for an id that matched no document.
pub fn format_not_found(id: &str) -> String {
    format!("Document with ID '{}' not found.", id)
}

/// Answer for a by-id query that named no id token.
pub fn format_missing_id(id_prefix: &str) -> String {
    format!("Please specify a valid ID (e.g. {}1).", id_prefix)
}

/// Numbered listing of free-search hits for `keywords`.
pub fn format_search(keywords: &str, docs: &[Document]) -> String {
    if docs.is_empty() {
        return format!("No results found for: {}", keywords);
    }

    let mut out = format!("Found {} results for '{}':\n\n", docs.len(), keywords);
    for (i, doc) in docs.iter().enumerate() {
        out.push_str(&format!("{}. **{}**\n", i + 1, or_placeholder(&doc.title, UNKNOWN)));
        out.push_str(&format!("   • ID: {}\n", doc.id));
        out.push_str(&format!("   • Author: {}\n", author_of(doc)));
        out.push_str(&format!(
            "   • Preview: {}\n\n",
            preview(&doc.content, SEARCH_PREVIEW_CHARS)
        ));
    }
    out
}

/// The single user-facing answer for a failed chat pipeline.
pub fn format_apology(message: &str) -> String {
    format!("Sorry, an error occurred: {}", message)
}
