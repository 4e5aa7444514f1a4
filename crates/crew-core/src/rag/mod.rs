//! Retrieval-augmented generation: chunking, storage, embeddings and retrieval.

pub mod chunking;
pub mod embeddings;
pub mod ingestion;
pub mod retriever;
pub mod service;
pub mod store;

pub use chunking::{Chunk, ChunkingStrategy, DocumentChunker};
pub use embeddings::{EmbeddingService, OpenAiEmbeddings};
pub use retriever::{format_context, similarity_score, CombinedRetrieval, RagRetriever, RetrievalResult};
pub use service::{CollectionScope, IngestKind, IngestReport, RagService, RagStats};
pub use store::{Document, MetadataFilter, QueryInput, QueryResult, SqliteVectorStore, VectorStore};
