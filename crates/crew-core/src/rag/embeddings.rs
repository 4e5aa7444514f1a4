//! Embedding providers.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::Settings;
use crate::error::RagError;

#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let mut vectors = self.embed_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| RagError::Embedding("provider returned no embedding".into()))
    }

    /// One vector per input, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError>;
}

/// POST {base_url}/embeddings (OpenAI-compatible).
pub struct OpenAiEmbeddings {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiEmbeddings {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    /// `None` unless the configured provider is `openai` and a key is present.
    pub fn from_settings(settings: &Settings) -> Option<Self> {
        if settings.rag.embedding_provider != "openai" {
            tracing::warn!(
                "[RAG] Unsupported embedding provider '{}'; using lexical retrieval",
                settings.rag.embedding_provider
            );
            return None;
        }
        let api_key = settings.openai_api_key.as_deref()?;
        Some(Self::new(
            crate::llm::OPENAI_BASE_URL,
            api_key,
            &settings.rag.embedding_model,
        ))
    }
}

#[async_trait]
impl EmbeddingService for OpenAiEmbeddings {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RagError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let url = format!("{}/embeddings", self.base_url);
        tracing::debug!("[RAG] Embedding {} texts with {}", texts.len(), self.model);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&json!({ "model": self.model, "input": texts }))
            .send()
            .await
            .map_err(|e| RagError::Embedding(format!("HTTP request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RagError::Embedding(format!("Failed to read response body: {}", e)))?;
        if !status.is_success() {
            return Err(RagError::Embedding(format!("API returned {}: {}", status, text)));
        }

        let json: Value = serde_json::from_str(&text)
            .map_err(|e| RagError::Embedding(format!("Failed to parse response JSON: {}", e)))?;
        let vectors = parse_embeddings(&json)?;
        if vectors.len() != texts.len() {
            return Err(RagError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                vectors.len()
            )));
        }
        Ok(vectors)
    }
}

/// Read `data[].embedding`, ordered by each item's `index`.
pub(crate) fn parse_embeddings(json: &Value) -> Result<Vec<Vec<f32>>, RagError> {
    let data = json
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| RagError::Embedding("response has no 'data' array".into()))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let index = item.get("index").and_then(Value::as_u64).unwrap_or(position as u64);
        let vector = item
            .get("embedding")
            .and_then(Value::as_array)
            .ok_or_else(|| RagError::Embedding("item has no 'embedding' array".into()))?
            .iter()
            .map(|v| v.as_f64().map(|f| f as f32))
            .collect::<Option<Vec<f32>>>()
            .ok_or_else(|| RagError::Embedding("embedding holds a non-number".into()))?;
        indexed.push((index, vector));
    }
    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}
