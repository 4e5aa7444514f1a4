//! Vector store over named collections.
//!
//! `SqliteVectorStore` keeps documents (and their embeddings, when present)
//! in a single table. Queries rank a collection by cosine distance against
//! a query embedding, or by lexical term-frequency distance when the caller
//! has only text. Results come back nearest first; ties keep insertion order.

use std::collections::HashMap;

use async_trait::async_trait;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::Database;
use crate::error::RagError;
use crate::models::Metadata;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub content: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata,
            embedding: None,
        }
    }

    pub fn meta_str(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).and_then(Value::as_str)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub documents: Vec<Document>,
    /// Parallel to `documents`, ascending.
    pub distances: Vec<f32>,
}

#[derive(Debug, Clone, Copy)]
pub enum QueryInput<'a> {
    Embedding(&'a [f32]),
    Text(&'a str),
}

/// Keep documents whose metadata value for `key` is one of `any_of`. An
/// array value matches when any of its items does.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataFilter {
    pub key: String,
    pub any_of: Vec<Value>,
}

impl MetadataFilter {
    pub fn new(key: &str, any_of: Vec<Value>) -> Self {
        Self {
            key: key.to_string(),
            any_of,
        }
    }

    pub fn matches(&self, metadata: &Metadata) -> bool {
        match metadata.get(&self.key) {
            Some(Value::Array(items)) => items.iter().any(|item| self.any_of.contains(item)),
            Some(value) => self.any_of.contains(value),
            None => false,
        }
    }
}

#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace documents by `(collection, id)`.
    async fn add_documents(&self, collection: &str, documents: Vec<Document>) -> Result<(), RagError>;

    async fn query(
        &self,
        collection: &str,
        input: QueryInput<'_>,
        n_results: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<QueryResult, RagError>;

    async fn count(&self, collection: &str) -> Result<usize, RagError>;

    async fn list_collections(&self) -> Result<Vec<String>, RagError>;

    async fn delete_collection(&self, collection: &str) -> Result<(), RagError>;
}

pub struct SqliteVectorStore {
    db: Database,
}

impl SqliteVectorStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    async fn load(&self, collection: &str) -> Result<Vec<Document>, RagError> {
        let collection = collection.to_string();
        self.db
            .with_conn_async(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT id, content, metadata, embedding FROM documents
                     WHERE collection = ?1 ORDER BY seq",
                )?;
                let rows = stmt.query_map(params![collection], |row| {
                    let metadata: String = row.get(2)?;
                    let embedding: Option<String> = row.get(3)?;
                    Ok(Document {
                        id: row.get(0)?,
                        content: row.get(1)?,
                        metadata: serde_json::from_str(&metadata).unwrap_or_default(),
                        embedding: embedding.and_then(|e| serde_json::from_str(&e).ok()),
                    })
                })?;
                rows.collect()
            })
            .await
            .map_err(|e| RagError::store("query", e.0))
    }
}

#[async_trait]
impl VectorStore for SqliteVectorStore {
    async fn add_documents(&self, collection: &str, documents: Vec<Document>) -> Result<(), RagError> {
        if documents.is_empty() {
            return Ok(());
        }
        let collection = collection.to_string();
        let count = documents.len();
        let rows: Vec<(String, String, String, Option<String>)> = documents
            .into_iter()
            .map(|d| {
                let metadata = Value::Object(d.metadata).to_string();
                let embedding = d.embedding.and_then(|e| serde_json::to_string(&e).ok());
                (d.id, d.content, metadata, embedding)
            })
            .collect();

        let target = collection.clone();
        self.db
            .with_conn_async(move |conn| {
                let now = chrono::Utc::now().timestamp_millis();
                let tx = conn.unchecked_transaction()?;
                {
                    let mut stmt = tx.prepare(
                        "INSERT INTO documents (collection, id, content, metadata, embedding, created_at, updated_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
                         ON CONFLICT(collection, id) DO UPDATE SET
                            content = excluded.content,
                            metadata = excluded.metadata,
                            embedding = excluded.embedding,
                            updated_at = excluded.updated_at",
                    )?;
                    for (id, content, metadata, embedding) in &rows {
                        stmt.execute(params![target, id, content, metadata, embedding, now])?;
                    }
                }
                tx.commit()
            })
            .await
            .map_err(|e| RagError::store("add_documents", e.0))?;

        tracing::debug!("[VectorStore] Upserted {} documents into '{}'", count, collection);
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        input: QueryInput<'_>,
        n_results: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<QueryResult, RagError> {
        let documents = self.load(collection).await?;
        let candidates = documents
            .into_iter()
            .filter(|d| filter.map_or(true, |f| f.matches(&d.metadata)));

        let mut scored: Vec<(f32, Document)> = match input {
            QueryInput::Embedding(query) => candidates
                .filter_map(|d| {
                    let distance = d.embedding.as_deref().and_then(|e| cosine_distance(query, e))?;
                    Some((distance, d))
                })
                .collect(),
            QueryInput::Text(query) => {
                let query_tf = term_frequencies(query);
                candidates
                    .map(|d| (lexical_distance(&query_tf, &term_frequencies(&d.content)), d))
                    .collect()
            }
        };

        // Stable sort keeps insertion order among equal distances.
        scored.sort_by(|a, b| a.0.total_cmp(&b.0));
        scored.truncate(n_results);

        let (distances, documents) = scored.into_iter().unzip();
        Ok(QueryResult { documents, distances })
    }

    async fn count(&self, collection: &str) -> Result<usize, RagError> {
        let collection = collection.to_string();
        let count: i64 = self
            .db
            .with_conn_async(move |conn| {
                conn.query_row(
                    "SELECT COUNT(*) FROM documents WHERE collection = ?1",
                    params![collection],
                    |row| row.get(0),
                )
            })
            .await
            .map_err(|e| RagError::store("count", e.0))?;
        Ok(count as usize)
    }

    async fn list_collections(&self) -> Result<Vec<String>, RagError> {
        self.db
            .with_conn_async(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT collection FROM documents GROUP BY collection ORDER BY MIN(seq)",
                )?;
                let rows = stmt.query_map([], |row| row.get(0))?;
                rows.collect()
            })
            .await
            .map_err(|e| RagError::store("list_collections", e.0))
    }

    async fn delete_collection(&self, collection: &str) -> Result<(), RagError> {
        let collection = collection.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.execute("DELETE FROM documents WHERE collection = ?1", params![collection])
            })
            .await
            .map_err(|e| RagError::store("delete_collection", e.0))?;
        Ok(())
    }
}

// ─── Distances ──────────────────────────────────────────────────────────

/// `1 - cos(a, b)`, in `[0, 2]`. `None` on a dimension mismatch.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> Option<f32> {
    if a.len() != b.len() {
        return None;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return Some(1.0);
    }
    Some((1.0 - dot / (norm_a * norm_b)).clamp(0.0, 2.0))
}

fn term_frequencies(text: &str) -> HashMap<String, f32> {
    let mut tf = HashMap::new();
    for token in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
    {
        *tf.entry(token.to_lowercase()).or_insert(0.0) += 1.0;
    }
    tf
}

/// Cosine distance between term-frequency vectors, in `[0, 1]`.
fn lexical_distance(query: &HashMap<String, f32>, doc: &HashMap<String, f32>) -> f32 {
    if query.is_empty() || doc.is_empty() {
        return 1.0;
    }
    let dot: f32 = query
        .iter()
        .filter_map(|(term, q)| doc.get(term).map(|d| q * d))
        .sum();
    let norm = |tf: &HashMap<String, f32>| tf.values().map(|v| v * v).sum::<f32>().sqrt();
    (1.0 - dot / (norm(query) * norm(doc))).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> SqliteVectorStore {
        SqliteVectorStore::new(Database::open_in_memory().unwrap())
    }

    fn doc(id: &str, content: &str, tag: &str) -> Document {
        let mut metadata = Metadata::new();
        metadata.insert("tag".into(), json!(tag));
        Document::new(id, content, metadata)
    }

    #[test]
    fn test_filter_matches_scalar_and_array_values() {
        let filter = MetadataFilter::new("tags", vec![json!("moon")]);

        let mut tagged = Metadata::new();
        tagged.insert("tags".into(), json!(["astrology", "moon"]));
        assert!(filter.matches(&tagged));

        let mut scalar = Metadata::new();
        scalar.insert("tags".into(), json!("moon"));
        assert!(filter.matches(&scalar));

        let mut other = Metadata::new();
        other.insert("tags".into(), json!(["astrology", "tarot"]));
        assert!(!filter.matches(&other));
        assert!(!filter.matches(&Metadata::new()));
    }

    #[tokio::test]
    async fn test_query_filters_on_array_metadata() {
        let store = store();
        let mut tagged = Metadata::new();
        tagged.insert("tags".into(), json!(["astrology", "moon"]));
        store
            .add_documents(
                "kb",
                vec![Document::new("a", "moon phases", tagged), doc("b", "moon phases", "x")],
            )
            .await
            .unwrap();

        let filter = MetadataFilter::new("tags", vec![json!("moon")]);
        let result = store
            .query("kb", QueryInput::Text("moon"), 10, Some(&filter))
            .await
            .unwrap();
        let ids: Vec<&str> = result.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let store = store();
        store
            .add_documents("kb", vec![doc("a", "old text", "x"), doc("b", "other", "x")])
            .await
            .unwrap();
        store.add_documents("kb", vec![doc("a", "new text", "y")]).await.unwrap();

        assert_eq!(store.count("kb").await.unwrap(), 2);
        let result = store.query("kb", QueryInput::Text("text"), 10, None).await.unwrap();
        let first = &result.documents[0];
        assert_eq!(first.id, "a");
        assert_eq!(first.content, "new text");
        assert_eq!(first.metadata["tag"], "y");
    }

    #[tokio::test]
    async fn test_text_query_ranks_by_overlap() {
        let store = store();
        store
            .add_documents(
                "kb",
                vec![
                    doc("1", "gardening tips for spring", "a"),
                    doc("2", "moon phases and lunar goal setting", "a"),
                    doc("3", "the lunar calendar", "b"),
                ],
            )
            .await
            .unwrap();

        let result = store
            .query("kb", QueryInput::Text("lunar goal setting"), 2, None)
            .await
            .unwrap();
        let ids: Vec<_> = result.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3"]);
        assert!(result.distances[0] <= result.distances[1]);
    }

    #[tokio::test]
    async fn test_embedding_query_and_filter() {
        let store = store();
        let mut near = doc("near", "n", "keep");
        near.embedding = Some(vec![1.0, 0.0]);
        let mut far = doc("far", "f", "keep");
        far.embedding = Some(vec![0.0, 1.0]);
        let mut filtered = doc("filtered", "x", "drop");
        filtered.embedding = Some(vec![1.0, 0.0]);
        let unembedded = doc("plain", "p", "keep");
        store
            .add_documents("style", vec![far, near, filtered, unembedded])
            .await
            .unwrap();

        let filter = MetadataFilter::new("tag", vec![json!("keep")]);
        let result = store
            .query("style", QueryInput::Embedding(&[1.0, 0.0]), 10, Some(&filter))
            .await
            .unwrap();
        let ids: Vec<_> = result.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["near", "far"]);
        assert!(result.distances[0].abs() < 1e-6);
        assert!((result.distances[1] - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_ties_keep_insertion_order() {
        let store = store();
        store
            .add_documents("kb", vec![doc("first", "alpha", "a"), doc("second", "beta", "a")])
            .await
            .unwrap();
        let result = store.query("kb", QueryInput::Text("gamma"), 5, None).await.unwrap();
        let ids: Vec<_> = result.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_collections_lifecycle() {
        let store = store();
        store.add_documents("style", vec![doc("s", "s", "a")]).await.unwrap();
        store.add_documents("kb", vec![doc("k", "k", "a")]).await.unwrap();
        assert_eq!(store.list_collections().await.unwrap(), vec!["style", "kb"]);

        store.delete_collection("style").await.unwrap();
        assert_eq!(store.count("style").await.unwrap(), 0);
        assert_eq!(store.list_collections().await.unwrap(), vec!["kb"]);
        assert!(store.query("missing", QueryInput::Text("q"), 5, None).await.unwrap().documents.is_empty());
    }

    #[test]
    fn test_cosine_distance() {
        assert_eq!(cosine_distance(&[1.0, 0.0], &[1.0]), None);
        assert!((cosine_distance(&[1.0, 0.0], &[-1.0, 0.0]).unwrap() - 2.0).abs() < 1e-6);
        assert_eq!(cosine_distance(&[0.0, 0.0], &[1.0, 0.0]), Some(1.0));
    }
}
