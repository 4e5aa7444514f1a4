//! Retrieval over the style and knowledge collections.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use super::embeddings::EmbeddingService;
use super::store::{Document, MetadataFilter, QueryInput, VectorStore};
use crate::error::RagError;

pub const DEFAULT_CONTEXT_LENGTH: usize = 3000;

/// Retrieved documents with their similarity scores (`1 / (1 + distance)`).
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetrievalResult {
    pub documents: Vec<Document>,
    pub scores: Vec<f32>,
    pub query: String,
    pub collection: String,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CombinedRetrieval {
    pub style: RetrievalResult,
    pub knowledge: RetrievalResult,
}

impl CombinedRetrieval {
    /// Knowledge results first, then style, capped at `n_results`.
    pub fn merge(self, query: &str, n_results: usize) -> RetrievalResult {
        let mut documents = self.knowledge.documents;
        let mut scores = self.knowledge.scores;
        documents.extend(self.style.documents);
        scores.extend(self.style.scores);
        documents.truncate(n_results);
        scores.truncate(n_results);
        RetrievalResult {
            documents,
            scores,
            query: query.to_string(),
            collection: "combined".to_string(),
        }
    }
}

pub fn similarity_score(distance: f32) -> f32 {
    1.0 / (1.0 + distance.max(0.0))
}

pub struct RagRetriever {
    store: Arc<dyn VectorStore>,
    embeddings: Option<Arc<dyn EmbeddingService>>,
    default_n_results: usize,
    style_collection: String,
    knowledge_collection: String,
}

impl RagRetriever {
    pub fn new(
        store: Arc<dyn VectorStore>,
        embeddings: Option<Arc<dyn EmbeddingService>>,
        default_n_results: usize,
        style_collection: &str,
        knowledge_collection: &str,
    ) -> Self {
        Self {
            store,
            embeddings,
            default_n_results,
            style_collection: style_collection.to_string(),
            knowledge_collection: knowledge_collection.to_string(),
        }
    }

    pub fn style_collection(&self) -> &str {
        &self.style_collection
    }

    pub fn knowledge_collection(&self) -> &str {
        &self.knowledge_collection
    }

    /// Query one collection. Without an embedding service the store ranks by text.
    pub async fn retrieve(
        &self,
        query: &str,
        collection: &str,
        n_results: Option<usize>,
        filter: Option<&MetadataFilter>,
    ) -> Result<RetrievalResult, RagError> {
        let n = n_results.unwrap_or(self.default_n_results);
        let result = match &self.embeddings {
            Some(embeddings) => {
                let vector = embeddings.embed(query).await?;
                self.store
                    .query(collection, QueryInput::Embedding(&vector), n, filter)
                    .await?
            }
            None => {
                self.store
                    .query(collection, QueryInput::Text(query), n, filter)
                    .await?
            }
        };

        tracing::debug!(
            "[RAG] Retrieved {} documents from '{}' for '{}'",
            result.documents.len(),
            collection,
            query
        );
        Ok(RetrievalResult {
            scores: result.distances.iter().copied().map(similarity_score).collect(),
            documents: result.documents,
            query: query.to_string(),
            collection: collection.to_string(),
        })
    }

    pub async fn retrieve_style_references(&self, query: &str, n_results: usize) -> Result<RetrievalResult, RagError> {
        self.retrieve(query, &self.style_collection, Some(n_results), None)
            .await
    }

    /// Knowledge lookup, optionally restricted to documents whose `tags` is one of `tags`.
    pub async fn retrieve_knowledge(
        &self,
        query: &str,
        n_results: usize,
        tags: Option<&[String]>,
    ) -> Result<RetrievalResult, RagError> {
        let filter = tags
            .filter(|t| !t.is_empty())
            .map(|t| MetadataFilter::new("tags", t.iter().cloned().map(Value::String).collect()));
        self.retrieve(query, &self.knowledge_collection, Some(n_results), filter.as_ref())
            .await
    }

    pub async fn retrieve_combined(
        &self,
        query: &str,
        style_n: usize,
        knowledge_n: usize,
    ) -> Result<CombinedRetrieval, RagError> {
        Ok(CombinedRetrieval {
            style: self.retrieve_style_references(query, style_n).await?,
            knowledge: self.retrieve_knowledge(query, knowledge_n, None).await?,
        })
    }
}

/// Render results as `[Source i: label]` sections separated by blank lines.
///
/// Sections are added in order and the first one that would push the
/// output past `max_length` characters stops the rendering.
pub fn format_context(result: &RetrievalResult, max_length: usize) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut current_len = 0;

    for (i, doc) in result.documents.iter().enumerate() {
        let label = doc
            .meta_str("title")
            .filter(|t| !t.is_empty())
            .or_else(|| doc.meta_str("source"))
            .unwrap_or("Unknown");
        let section = format!("[Source {}: {}]\n{}\n", i + 1, label, doc.content);
        let section_len = section.chars().count();
        let separator = if parts.is_empty() { 0 } else { 1 };
        if current_len + separator + section_len > max_length {
            break;
        }
        current_len += separator + section_len;
        parts.push(section);
    }

    parts.join("\n")
}
