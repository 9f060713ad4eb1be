use serde_json::json;
use std::sync::Arc;

use es_assistant::chat::ChatFacade;
use es_assistant::keywords::DisabledExtractor;
use es_assistant_core::gateway::memory::InMemoryGateway;
use es_assistant_core::intent::{Intent, IntentClassifier};
use es_assistant_core::models::Document;

fn sample_docs(n: usize) -> Vec<Document> {
    (1..=n)
        .map(|i| {
            let mut doc = Document::new(format!("post_{}", i), format!("Post title {}", i));
            doc.content = format!("Content of post {} about databases and search engines.", i);
            doc.category = if i % 4 == 0 { "news" } else { "blog_post" }.to_string();
            doc.tags = vec!["search".to_string(), format!("tag{}", i)];
            doc.created_at = format!("2024-02-{:02}T08:30:00", i);
            doc.metadata.insert("user_name".into(), json!(format!("Author {}", i)));
            doc.metadata
                .insert("user_email".into(), json!(format!("author{}@example.com", i)));
            doc
        })
        .collect()
}

fn chat_over(docs: Vec<Document>) -> ChatFacade {
    ChatFacade::new(
        IntentClassifier::default(),
        Arc::new(InMemoryGateway::with_documents("sample_data", docs)),
        Arc::new(DisabledExtractor),
        5,
    )
}

/// Split a listing reply into its numbered entries.
fn entries(reply: &str) -> Vec<&str> {
    reply
        .split("\n\n")
        .filter(|block| block.contains("**") && block.contains("• ID:"))
        .collect()
}

#[tokio::test]
async fn test_three_most_recent_posts() {
    let classifier = IntentClassifier::default();
    let question = "me mostre os 3 posts mais recentes";
    assert_eq!(classifier.classify(question), Intent::RecentPosts { limit: 3 });

    let reply = chat_over(sample_docs(10)).answer(question).await;
    assert!(reply.starts_with("The 3 most recent posts:\n\n"));

    let listed = entries(&reply);
    assert_eq!(listed.len(), 3);
    assert!(listed[0].starts_with("1. **Post title 10**"));
    assert!(listed[1].starts_with("2. **Post title 9**"));
    assert!(listed[2].starts_with("3. **Post title 8**"));
    for entry in listed {
        assert!(entry.contains("   • ID: post_"));
        assert!(entry.contains("   • Author: Author "));
        assert!(entry.contains("   • Created: 2024-02-"));
        assert!(entry.contains("   • Preview: Content of post "));
        assert!(entry.trim_end().ends_with("..."));
    }
}

#[tokio::test]
async fn test_recent_limit_is_clamped() {
    let reply = chat_over(sample_docs(25))
        .answer("list the last 50 posts")
        .await;
    assert!(reply.starts_with("The 20 most recent posts:"));
    assert_eq!(entries(&reply).len(), 20);

    let reply = chat_over(sample_docs(5)).answer("newest 0 posts").await;
    assert!(reply.starts_with("The 1 most recent posts:"));
}

#[tokio::test]
async fn test_details_of_missing_post() {
    let reply = chat_over(Vec::new()).answer("detalhes do post_1").await;
    assert_eq!(reply, "Document with ID 'post_1' not found.");
}

#[tokio::test]
async fn test_details_of_existing_post() {
    let reply = chat_over(sample_docs(8))
        .answer("Me dê detalhes do POST_7")
        .await;
    assert!(reply.starts_with("**Document details**\n\n"));
    assert!(reply.contains("**Title:** Post title 7\n"));
    assert!(reply.contains("**ID:** post_7\n"));
    assert!(reply.contains("**Author:** Author 7\n"));
    assert!(reply.contains("**Email:** author7@example.com\n"));
    assert!(reply.contains("**Category:** blog_post\n"));
    assert!(reply.contains("**Tags:** search, tag7\n"));
    assert!(reply.contains("**Created:** 2024-02-07\n"));
    assert!(reply.ends_with(
        "**Content:**\nContent of post 7 about databases and search engines.\n"
    ));
}

#[tokio::test]
async fn test_category_distribution() {
    let reply = chat_over(sample_docs(8))
        .answer("Quantos documentos temos por categoria?")
        .await;
    assert!(reply.starts_with("Document distribution by category:\n\n"));
    assert!(reply.contains("• blog_post: 6 docs (75.0%)\n  ███████████████\n"));
    assert!(reply.contains("• news: 2 docs (25.0%)\n  █████\n"));
    assert!(reply.ends_with("Total: 8 documents"));
}

#[tokio::test]
async fn test_percentages_sum_to_hundred() {
    let reply = chat_over(sample_docs(7)).answer("category stats").await;
    let total: f64 = reply
        .lines()
        .filter_map(|line| {
            let start = line.find('(')? + 1;
            let end = line.find("%)")?;
            line[start..end].parse::<f64>().ok()
        })
        .sum();
    assert!((total - 100.0).abs() < 0.2, "sum was {}", total);
}

#[tokio::test]
async fn test_recency_beats_category() {
    let reply = chat_over(sample_docs(6))
        .answer("posts recentes por categoria")
        .await;
    assert!(reply.starts_with("The 5 most recent posts:"));
}

#[tokio::test]
async fn test_free_search_listing() {
    let reply = chat_over(sample_docs(3)).answer("databases").await;
    assert!(reply.starts_with("Found 3 results for 'databases':\n\n"));
    let listed = entries(&reply);
    assert_eq!(listed.len(), 3);
    assert!(!listed[0].contains("Created"));
}

#[tokio::test]
async fn test_free_search_without_hits() {
    let reply = chat_over(sample_docs(3)).answer("volcanoes").await;
    assert_eq!(reply, "No results found for: volcanoes");
}

#[tokio::test]
async fn test_empty_index_messages() {
    let chat = chat_over(Vec::new());
    assert_eq!(chat.answer("recent posts").await, "No documents found.");
    assert_eq!(chat.answer("distribution").await, "No categories found.");
}
