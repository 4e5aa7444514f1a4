//! RAG service facade: ingestion into the two collections and retrieval.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Value};

use super::chunking::{Chunk, ChunkingStrategy, DocumentChunker};
use super::embeddings::EmbeddingService;
use super::ingestion::{extract_pdf, parse_markdown};
use super::retriever::{format_context, RagRetriever, RetrievalResult, DEFAULT_CONTEXT_LENGTH};
use super::store::{Document, VectorStore};
use crate::config::RagSettings;
use crate::error::RagError;
use crate::events::{Event, EventBus, EventType};
use crate::models::Metadata;

const SOURCE: &str = "rag_service";

/// Which collections a query covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionScope {
    Style,
    Knowledge,
    Both,
}

impl CollectionScope {
    /// `style`, `knowledge`; anything else means both.
    pub fn parse(value: &str) -> Self {
        match value {
            "style" => Self::Style,
            "knowledge" => Self::Knowledge,
            _ => Self::Both,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestKind {
    Auto,
    Blog,
    Pdf,
}

impl IngestKind {
    pub fn includes_blog(&self) -> bool {
        matches!(self, Self::Auto | Self::Blog)
    }

    pub fn includes_pdf(&self) -> bool {
        matches!(self, Self::Auto | Self::Pdf)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub files: usize,
    pub chunks: usize,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RagStats {
    pub collections: Vec<String>,
    pub style_documents: usize,
    pub knowledge_documents: usize,
    pub embeddings_available: bool,
}

pub struct RagService {
    store: Arc<dyn VectorStore>,
    embeddings: Option<Arc<dyn EmbeddingService>>,
    retriever: RagRetriever,
    chunker: DocumentChunker,
    pdf_chunker: DocumentChunker,
    events: EventBus,
}

impl RagService {
    /// PDFs use twice the configured chunk size and overlap.
    pub fn new(
        store: Arc<dyn VectorStore>,
        embeddings: Option<Arc<dyn EmbeddingService>>,
        settings: &RagSettings,
        events: EventBus,
    ) -> Result<Self, RagError> {
        if embeddings.is_none() {
            tracing::warn!("[RAG] Embeddings not available, falling back to lexical retrieval");
        }
        let retriever = RagRetriever::new(
            store.clone(),
            embeddings.clone(),
            settings.default_n_results,
            &settings.style_collection,
            &settings.knowledge_collection,
        );
        Ok(Self {
            chunker: DocumentChunker::new(settings.chunk_size, settings.chunk_overlap)?,
            pdf_chunker: DocumentChunker::new(settings.chunk_size * 2, settings.chunk_overlap * 2)?,
            store,
            embeddings,
            retriever,
            events,
        })
    }

    pub fn retriever(&self) -> &RagRetriever {
        &self.retriever
    }

    pub fn embeddings_available(&self) -> bool {
        self.embeddings.is_some()
    }

    // ─── Ingestion ──────────────────────────────────────────────────────

    /// Chunk `text` and store it under ids `<source_id>_<chunk_index>`.
    pub async fn ingest_text(
        &self,
        collection: &str,
        source_id: &str,
        text: &str,
        strategy: ChunkingStrategy,
        metadata: Metadata,
    ) -> Result<usize, RagError> {
        let chunks = self.chunker.chunk(text, strategy, &metadata);
        self.store_chunks(collection, source_id, chunks).await
    }

    /// Markdown article into the style collection.
    pub async fn ingest_blog_article(&self, path: &Path) -> Result<usize, RagError> {
        let collection = self.retriever.style_collection().to_string();
        self.publish_ingestion_started(path, "blog").await;

        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| RagError::document(path.display(), e))?;
        let stem = file_stem(path);
        let article = parse_markdown(&raw, &stem);

        let mut metadata = Metadata::new();
        metadata.insert("source".into(), json!(path.display().to_string()));
        metadata.insert("title".into(), json!(article.title));
        metadata.insert("collection_type".into(), json!("style"));
        metadata.extend(article.metadata);

        let chunks = self
            .chunker
            .chunk(&article.content, ChunkingStrategy::Semantic, &metadata);
        let count = self.store_chunks(&collection, &stem, chunks).await?;

        tracing::info!("[RAG] Ingested blog article '{}' ({} chunks)", path.display(), count);
        self.publish_ingestion_completed(path, count).await;
        Ok(count)
    }

    /// PDF into the knowledge collection.
    pub async fn ingest_pdf(&self, path: &Path) -> Result<usize, RagError> {
        let collection = self.retriever.knowledge_collection().to_string();
        self.publish_ingestion_started(path, "pdf").await;

        let owned = path.to_path_buf();
        let (content, pdf_metadata) = tokio::task::spawn_blocking(move || extract_pdf(&owned))
            .await
            .map_err(|e| RagError::document(path.display(), format!("Task join error: {}", e)))??;

        if content.trim().is_empty() {
            tracing::warn!("[RAG] PDF has no extractable text: {}", path.display());
            self.publish_ingestion_completed(path, 0).await;
            return Ok(0);
        }

        let mut metadata = Metadata::new();
        metadata.insert("source".into(), json!(path.display().to_string()));
        metadata.insert("source_type".into(), json!("pdf"));
        metadata.insert("collection_type".into(), json!("knowledge"));
        metadata.extend(pdf_metadata);

        let chunks = self
            .pdf_chunker
            .chunk(&content, ChunkingStrategy::Paragraph, &metadata);
        let count = self.store_chunks(&collection, &file_stem(path), chunks).await?;

        tracing::info!("[RAG] Ingested PDF '{}' ({} chunks)", path.display(), count);
        self.publish_ingestion_completed(path, count).await;
        Ok(count)
    }

    /// Ingest every `**/*.md` and/or `**/*.pdf` under `dir`. A file that fails
    /// is logged and reported, and the rest still get ingested.
    pub async fn ingest_directory(&self, dir: &Path, kind: IngestKind) -> Result<IngestReport, RagError> {
        if !dir.is_dir() {
            return Err(RagError::document(dir.display(), "directory not found"));
        }

        let mut report = IngestReport::default();
        if kind.includes_blog() {
            for path in find_files(dir, "md")? {
                match self.ingest_blog_article(&path).await {
                    Ok(count) => {
                        report.files += 1;
                        report.chunks += count;
                    }
                    Err(e) => {
                        tracing::error!("[RAG] Failed to ingest '{}': {}", path.display(), e);
                        report.failed.push(path.display().to_string());
                    }
                }
            }
        }
        if kind.includes_pdf() {
            for path in find_files(dir, "pdf")? {
                match self.ingest_pdf(&path).await {
                    Ok(count) => {
                        report.files += 1;
                        report.chunks += count;
                    }
                    Err(e) => {
                        tracing::error!("[RAG] Failed to ingest '{}': {}", path.display(), e);
                        report.failed.push(path.display().to_string());
                    }
                }
            }
        }

        tracing::info!(
            "[RAG] Directory '{}' ingested: {} files, {} chunks, {} failed",
            dir.display(),
            report.files,
            report.chunks,
            report.failed.len()
        );
        Ok(report)
    }

    async fn store_chunks(&self, collection: &str, source_id: &str, chunks: Vec<Chunk>) -> Result<usize, RagError> {
        let mut documents: Vec<Document> = chunks
            .into_iter()
            .map(|chunk| {
                let id = format!("{}_{}", source_id, chunk.index());
                Document::new(id, chunk.content, chunk.metadata)
            })
            .collect();

        if let Some(embeddings) = &self.embeddings {
            let texts: Vec<String> = documents.iter().map(|d| d.content.clone()).collect();
            let vectors = embeddings.embed_batch(&texts).await?;
            for (doc, vector) in documents.iter_mut().zip(vectors) {
                doc.embedding = Some(vector);
            }
        }

        let count = documents.len();
        self.store.add_documents(collection, documents).await?;
        Ok(count)
    }

    // ─── Retrieval ──────────────────────────────────────────────────────

    /// Query one collection or both. "Both" takes `n / 2` style results and
    /// `n` knowledge results, knowledge first, capped at `n`.
    pub async fn query(&self, query: &str, scope: CollectionScope, n_results: usize) -> Result<RetrievalResult, RagError> {
        self.events
            .publish(Event::new(
                EventType::RagQueryStarted,
                SOURCE,
                json!({ "query": truncate(query, 50) }),
            ))
            .await;

        let result = match scope {
            CollectionScope::Style => {
                self.retriever
                    .retrieve_style_references(query, n_results)
                    .await?
            }
            CollectionScope::Knowledge => self.retriever.retrieve_knowledge(query, n_results, None).await?,
            CollectionScope::Both => self
                .retriever
                .retrieve_combined(query, n_results / 2, n_results)
                .await?
                .merge(query, n_results),
        };

        self.events
            .publish(Event::new(
                EventType::RagQueryCompleted,
                SOURCE,
                json!({ "query": truncate(query, 50), "results": result.documents.len() }),
            ))
            .await;
        Ok(result)
    }

    pub async fn style_context(&self, topic: &str, n_results: usize) -> Result<String, RagError> {
        let result = self
            .retriever
            .retrieve_style_references(topic, n_results)
            .await?;
        Ok(format_context(&result, DEFAULT_CONTEXT_LENGTH))
    }

    pub async fn knowledge_context(&self, topic: &str, n_results: usize) -> Result<String, RagError> {
        let result = self
            .retriever
            .retrieve_knowledge(topic, n_results, None)
            .await?;
        Ok(format_context(&result, DEFAULT_CONTEXT_LENGTH))
    }

    // ─── Management ─────────────────────────────────────────────────────

    pub async fn stats(&self) -> Result<RagStats, RagError> {
        Ok(RagStats {
            collections: self.store.list_collections().await?,
            style_documents: self.store.count(self.retriever.style_collection()).await?,
            knowledge_documents: self.store.count(self.retriever.knowledge_collection()).await?,
            embeddings_available: self.embeddings.is_some(),
        })
    }

    async fn publish_ingestion_started(&self, path: &Path, kind: &str) {
        tracing::info!("[RAG] Ingesting {} '{}'", kind, path.display());
        self.events
            .publish(Event::new(
                EventType::RagIngestionStarted,
                SOURCE,
                json!({ "file": path.display().to_string(), "type": kind }),
            ))
            .await;
    }

    async fn publish_ingestion_completed(&self, path: &Path, documents: usize) {
        self.events
            .publish(Event::new(
                EventType::RagIngestionCompleted,
                SOURCE,
                json!({ "file": path.display().to_string(), "documents": documents }),
            ))
            .await;
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "document".to_string())
}

fn find_files(dir: &Path, extension: &str) -> Result<Vec<PathBuf>, RagError> {
    let pattern = format!("{}/**/*.{}", dir.display(), extension);
    let paths = glob::glob(&pattern).map_err(|e| RagError::document(dir.display(), e))?;
    let mut files: Vec<PathBuf> = paths.filter_map(Result::ok).filter(|p| p.is_file()).collect();
    files.sort();
    Ok(files)
}

fn truncate(s: &str, max: usize) -> Value {
    Value::String(s.chars().take(max).collect())
}
