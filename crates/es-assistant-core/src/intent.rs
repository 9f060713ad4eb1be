//! Rule-based intent classification for chat queries.
//!
//! A query is matched against an ordered list of rules; the first rule whose
//! predicate holds decides the [`IntentKind`]. The order is part of the
//! observable behavior:
//!
//! | # | Intent | Predicate |
//! |---|--------|-----------|
//! | 1 | [`IntentKind::RecentPosts`] | contains a recency keyword |
//! | 2 | [`IntentKind::Categories`] | contains an aggregation keyword |
//! | 3 | [`IntentKind::GetById`] | contains an id token or the word `id` |
//! | 4 | [`IntentKind::FreeSearch`] | always |
//!
//! Keyword matching is a case-insensitive substring test, so `"mais
//! recentes"` matches `recente`. Classification never fails.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Limit used by [`Intent::RecentPosts`] when the query has no number.
pub const DEFAULT_RECENT_LIMIT: usize = 5;
/// Lower bound applied to an extracted recent-posts limit.
pub const MIN_RECENT_LIMIT: usize = 1;
/// Upper bound applied to an extracted recent-posts limit.
pub const MAX_RECENT_LIMIT: usize = 20;
/// Id prefix used by the sample index (`post_1`, `post_2`, ...).
pub const DEFAULT_ID_PREFIX: &str = "post_";

const RECENCY_KEYWORDS: &[&str] = &[
    "recente", "recent", "latest", "último", "ultimo", "last", "novo", "new",
];

const AGGREGATION_KEYWORDS: &[&str] = &[
    "categoria",
    "category",
    "estatística",
    "estatistica",
    "statistic",
    "stats",
    "quantos",
    "how many",
    "distribuição",
    "distribuicao",
    "distribution",
];

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[0-9]+").expect("Invalid number regex"));

static ID_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bid\b").expect("Invalid id word regex"));

/// The kind of an [`Intent`], without its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    RecentPosts,
    Categories,
    GetById,
    FreeSearch,
}

/// A classified chat query together with the parameters its handler needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// List the newest documents. `limit` is already clamped.
    RecentPosts { limit: usize },
    /// Show the per-category document distribution.
    Categories,
    /// Show one document. `None` when the query named no id token.
    GetById { id: Option<String> },
    /// Relevance search with the caller's original wording.
    FreeSearch { raw_query: String },
}

impl Intent {
    pub fn kind(&self) -> IntentKind {
        match self {
            Intent::RecentPosts { .. } => IntentKind::RecentPosts,
            Intent::Categories => IntentKind::Categories,
            Intent::GetById { .. } => IntentKind::GetById,
            Intent::FreeSearch { .. } => IntentKind::FreeSearch,
        }
    }
}

/// One entry of the ordered rule list.
struct Rule {
    kind: IntentKind,
    matches: fn(&IntentClassifier, &str) -> bool,
}

/// Evaluated top to bottom; [`IntentKind::FreeSearch`] is the fallback.
const RULES: &[Rule] = &[
    Rule {
        kind: IntentKind::RecentPosts,
        matches: has_recency_keyword,
    },
    Rule {
        kind: IntentKind::Categories,
        matches: has_aggregation_keyword,
    },
    Rule {
        kind: IntentKind::GetById,
        matches: mentions_id,
    },
];

fn contains_any(lowered: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| lowered.contains(k))
}

fn has_recency_keyword(_: &IntentClassifier, lowered: &str) -> bool {
    contains_any(lowered, RECENCY_KEYWORDS)
}

fn has_aggregation_keyword(_: &IntentClassifier, lowered: &str) -> bool {
    contains_any(lowered, AGGREGATION_KEYWORDS)
}

fn mentions_id(classifier: &IntentClassifier, lowered: &str) -> bool {
    classifier.id_pattern.is_match(lowered) || ID_WORD_RE.is_match(lowered)
}

/// Extract the recent-posts limit: first integer literal, default
/// [`DEFAULT_RECENT_LIMIT`], clamped to `[MIN_RECENT_LIMIT, MAX_RECENT_LIMIT]`.
///
/// Literals too large for `u64` clamp to the maximum.
pub fn extract_limit(query: &str) -> usize {
    let Some(m) = NUMBER_RE.find(query) else {
        return DEFAULT_RECENT_LIMIT;
    };
    let n = m.as_str().parse::<u64>().unwrap_or(u64::MAX);
    n.clamp(MIN_RECENT_LIMIT as u64, MAX_RECENT_LIMIT as u64) as usize
}

/// Classifies free-text chat queries into [`Intent`]s.
pub struct IntentClassifier {
    id_prefix: String,
    id_pattern: Regex,
}

impl IntentClassifier {
    /// Create a classifier whose id tokens are `id_prefix` followed by one or
    /// more ASCII digits.
    pub fn new(id_prefix: &str) -> Result<Self, regex::Error> {
        let id_pattern = Regex::new(&format!(
            "{}[0-9]+",
            regex::escape(&id_prefix.to_lowercase())
        ))?;
        Ok(Self {
            id_prefix: id_prefix.to_lowercase(),
            id_pattern,
        })
    }

    pub fn id_prefix(&self) -> &str {
        &self.id_prefix
    }

    /// The rule evaluation order, fallback last.
    pub fn rule_order() -> Vec<IntentKind> {
        RULES
            .iter()
            .map(|r| r.kind)
            .chain(std::iter::once(IntentKind::FreeSearch))
            .collect()
    }

    /// Decide the intent kind without extracting parameters.
    pub fn classify_kind(&self, query: &str) -> IntentKind {
        let lowered = query.to_lowercase();
        RULES
            .iter()
            .find(|rule| (rule.matches)(self, &lowered))
            .map(|rule| rule.kind)
            .unwrap_or(IntentKind::FreeSearch)
    }

    /// Classify `query` and extract the parameters for its intent.
    pub fn classify(&self, query: &str) -> Intent {
        match self.classify_kind(query) {
            IntentKind::RecentPosts => Intent::RecentPosts {
                limit: extract_limit(query),
            },
            IntentKind::Categories => Intent::Categories,
            IntentKind::GetById => Intent::GetById {
                id: self.extract_id(query),
            },
            IntentKind::FreeSearch => Intent::FreeSearch {
                raw_query: query.to_string(),
            },
        }
    }

    /// First id token in `query`, lowercased.
    pub fn extract_id(&self, query: &str) -> Option<String> {
        self.id_pattern
            .find(&query.to_lowercase())
            .map(|m| m.as_str().to_string())
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new(DEFAULT_ID_PREFIX).expect("default id pattern is valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(q: &str) -> Intent {
        IntentClassifier::default().classify(q)
    }

    #[test]
    fn test_rule_order_is_pinned() {
        assert_eq!(
            IntentClassifier::rule_order(),
            vec![
                IntentKind::RecentPosts,
                IntentKind::Categories,
                IntentKind::GetById,
                IntentKind::FreeSearch,
            ]
        );
    }

    #[test]
    fn test_recent_with_number() {
        assert_eq!(
            classify("me mostre os 3 posts mais recentes"),
            Intent::RecentPosts { limit: 3 }
        );
        assert_eq!(
            classify("Show me the 7 LATEST posts"),
            Intent::RecentPosts { limit: 7 }
        );
    }

    #[test]
    fn test_recent_default_limit() {
        assert_eq!(
            classify("what's new?"),
            Intent::RecentPosts {
                limit: DEFAULT_RECENT_LIMIT
            }
        );
    }

    #[test]
    fn test_recent_limit_is_clamped() {
        assert_eq!(classify("last 50 posts"), Intent::RecentPosts { limit: 20 });
        assert_eq!(classify("last 0 posts"), Intent::RecentPosts { limit: 1 });
        assert_eq!(
            classify("recent 99999999999999999999999 posts"),
            Intent::RecentPosts { limit: 20 }
        );
    }

    #[test]
    fn test_clamp_holds_for_every_small_number() {
        for n in 0..=40u64 {
            let q = format!("the {} most recent posts", n);
            let expected = n.clamp(1, 20) as usize;
            assert_eq!(classify(&q), Intent::RecentPosts { limit: expected }, "n = {}", n);
        }
    }

    #[test]
    fn test_first_integer_wins() {
        assert_eq!(
            classify("recent 4 posts from 2023"),
            Intent::RecentPosts { limit: 4 }
        );
    }

    #[test]
    fn test_recency_beats_category() {
        assert_eq!(
            classify("recent posts per category"),
            Intent::RecentPosts { limit: 5 }
        );
        assert_eq!(
            classify("últimos 2 por categoria"),
            Intent::RecentPosts { limit: 2 }
        );
    }

    #[test]
    fn test_category_beats_id() {
        assert_eq!(classify("category of post_3"), Intent::Categories);
    }

    #[test]
    fn test_categories_keywords() {
        for q in [
            "Quantos documentos temos por categoria?",
            "how many documents are there",
            "distribution please",
            "index stats",
            "Distribuição",
        ] {
            assert_eq!(classify(q), Intent::Categories, "query: {}", q);
        }
    }

    #[test]
    fn test_get_by_id_extracts_token() {
        assert_eq!(
            classify("Me dê detalhes do post_1"),
            Intent::GetById {
                id: Some("post_1".to_string())
            }
        );
        assert_eq!(
            classify("details for POST_42 please"),
            Intent::GetById {
                id: Some("post_42".to_string())
            }
        );
    }

    #[test]
    fn test_get_by_id_without_token() {
        assert_eq!(classify("what is the id?"), Intent::GetById { id: None });
        assert_eq!(classify("post_ without digits and id"), Intent::GetById { id: None });
    }

    #[test]
    fn test_id_word_requires_word_boundary() {
        assert_eq!(
            classify("ideas about video"),
            Intent::FreeSearch {
                raw_query: "ideas about video".to_string()
            }
        );
    }

    #[test]
    fn test_free_search_keeps_raw_query() {
        assert_eq!(
            classify("Busque posts sobre User"),
            Intent::FreeSearch {
                raw_query: "Busque posts sobre User".to_string()
            }
        );
    }

    #[test]
    fn test_empty_query_is_free_search() {
        assert_eq!(
            classify(""),
            Intent::FreeSearch {
                raw_query: String::new()
            }
        );
    }

    #[test]
    fn test_custom_prefix() {
        let classifier = IntentClassifier::new("DOC-").unwrap();
        assert_eq!(classifier.id_prefix(), "doc-");
        assert_eq!(
            classifier.classify("open doc-17"),
            Intent::GetById {
                id: Some("doc-17".to_string())
            }
        );
        // the default prefix is no longer an id token
        assert_eq!(classifier.classify_kind("open post_17"), IntentKind::FreeSearch);
    }

    #[test]
    fn test_intent_kind_matches_variant() {
        assert_eq!(Intent::Categories.kind(), IntentKind::Categories);
        assert_eq!(
            Intent::RecentPosts { limit: 1 }.kind(),
            IntentKind::RecentPosts
        );
    }
}
