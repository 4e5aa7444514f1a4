//! Integration tests for the crew-cli commands.
//!
//! These tests drive the same code paths as the binary against an
//! in-memory vector store and stub text generation and web search.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crew_cli::commands;
use crew_core::error::{LlmError, SearchError};
use crew_core::llm::{GenerationRequest, TextGenerator};
use crew_core::models::ContentResult;
use crew_core::rag::SqliteVectorStore;
use crew_core::search::{SearchHit, WebSearch};
use crew_core::state::{AppState, AppStateInner, Providers};
use crew_core::{Database, Settings};

struct CannedGenerator;

#[async_trait]
impl TextGenerator for CannedGenerator {
    fn provider(&self) -> &str {
        "canned"
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<String, LlmError> {
        Ok("The moon guides planning. APPROVED".to_string())
    }
}

struct NoSearch;

#[async_trait]
impl WebSearch for NoSearch {
    async fn search(&self, _query: &str, _max_results: usize, _region: &str) -> Result<Vec<SearchHit>, SearchError> {
        Ok(Vec::new())
    }
}

/// Create an in-memory AppState for testing.
fn test_state(settings: Settings) -> AppState {
    let db = Database::open_in_memory().expect("Failed to open in-memory database");
    let providers = Providers {
        generator: Arc::new(CannedGenerator),
        embeddings: None,
        store: Arc::new(SqliteVectorStore::new(db)),
        search: Arc::new(NoSearch),
    };
    Arc::new(AppStateInner::new(settings, providers).expect("Failed to build state"))
}

fn write(dir: &Path, name: &str, content: &str) {
    std::fs::write(dir.join(name), content).unwrap();
}

#[tokio::test]
async fn test_ingest_directory_then_stats() {
    let state = test_state(Settings::default());
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "first.md", "# First\n\nThe new moon is a time for intentions.");
    write(dir.path(), "second.md", "---\ntags: moon\n---\n# Second\n\nReview goals at the full moon.");
    write(dir.path(), "ignored.txt", "not markdown");

    commands::ingest::run(&state, dir.path().to_str().unwrap(), "blog")
        .await
        .unwrap();

    let stats = state.rag.stats().await.unwrap();
    assert_eq!(stats.style_documents, 2);
    assert_eq!(stats.knowledge_documents, 0);
    assert!(!stats.embeddings_available);
    commands::stats::show(&state).await.unwrap();
}

#[tokio::test]
async fn test_ingest_single_article_and_query() {
    let state = test_state(Settings::default());
    let dir = tempfile::tempdir().unwrap();
    write(dir.path(), "moon.md", "# Moon Notes\n\nPlant intentions with the new moon.");
    let file = dir.path().join("moon.md");

    commands::ingest::run(&state, file.to_str().unwrap(), "auto").await.unwrap();
    commands::query::run(&state, "new moon intentions", Some("style"), Some(3))
        .await
        .unwrap();

    let result = state
        .rag
        .query("new moon intentions", crew_core::rag::CollectionScope::Style, 3)
        .await
        .unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(result.documents[0].metadata["title"], "Moon Notes");
}

#[tokio::test]
async fn test_ingest_rejects_missing_path_and_unknown_kind() {
    let state = test_state(Settings::default());
    let err = commands::ingest::run(&state, "/definitely/not/here.md", "blog")
        .await
        .unwrap_err();
    assert!(err.contains("Path not found"));

    let dir = tempfile::tempdir().unwrap();
    let err = commands::ingest::run(&state, dir.path().to_str().unwrap(), "video")
        .await
        .unwrap_err();
    assert!(err.contains("Unknown ingest kind"));
}

#[tokio::test]
async fn test_create_writes_markdown_document() {
    let state = test_state(Settings::default());
    let dir = tempfile::tempdir().unwrap();
    let style = dir.path().join("style.txt");
    std::fs::write(&style, "Short sentences. Warm tone.").unwrap();
    let output = dir.path().join("out").join("article.md");

    commands::create::run(
        &state,
        "Lunar cycles and goal-setting",
        Some(800),
        Some(output.to_str().unwrap()),
        Some(style.to_str().unwrap()),
    )
    .await
    .unwrap();

    let document = std::fs::read_to_string(&output).unwrap();
    assert!(document.starts_with("---\ntitle: \"Lunar cycles and goal-setting\""));
    assert!(document.contains("approved: true"));
    assert!(document.contains("word_count: 5"));
    assert!(document.contains("## Image Prompts"));
    assert!(document.contains("## Visual Suggestions"));
    assert!(document.contains("## Quality Review"));
}

#[tokio::test]
async fn test_create_fails_on_missing_style_file() {
    let state = test_state(Settings::default());
    let err = commands::create::run(&state, "Topic", None, None, Some("/no/such/style.txt"))
        .await
        .unwrap_err();
    assert!(err.contains("Failed to read style file"));
}

#[test]
fn test_default_output_path_uses_slug() {
    let mut settings = Settings::default();
    settings.content.output_directory = "articles".to_string();
    let result = ContentResult::assemble("p", "Lunar Cycles & Goal_Setting!", &HashMap::new());

    let path = commands::create::output_path(&settings, &result, None);
    assert_eq!(path, Path::new("articles").join("lunar-cycles-goal-setting.md"));

    let explicit = commands::create::output_path(&settings, &result, Some("custom.md"));
    assert_eq!(explicit, Path::new("custom.md"));
}

#[tokio::test]
async fn test_agent_catalog_groups_by_category() {
    let state = test_state(Settings::default());
    let catalog = commands::agents::catalog(&state);

    let content = catalog["agents"]["content"].as_array().unwrap();
    assert_eq!(content.len(), 7);
    let writer = content.iter().find(|a| a["name"] == "writer").unwrap();
    let skills: Vec<&str> = writer["skills"].as_array().unwrap().iter().filter_map(|s| s.as_str()).collect();
    assert_eq!(skills, vec!["llm_call", "rag_query"]);
    assert_eq!(catalog["skills"].as_array().unwrap().len(), 4);

    commands::agents::list(&state).await.unwrap();
}
