//! Text generation providers.
//!
//! Agents never talk to a provider directly: they go through the `llm_call`
//! skill, which holds an `Arc<dyn TextGenerator>`.

mod client;

use std::sync::Arc;

use async_trait::async_trait;

pub use client::{AnthropicClient, OpenAiClient, ANTHROPIC_BASE_URL, OPENAI_BASE_URL};

use crate::config::Settings;
use crate::error::LlmError;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub system_prompt: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Default::default()
        }
    }

    pub fn with_system(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Provider label used in logs and errors.
    fn provider(&self) -> &str;

    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError>;
}

/// Prefix a prompt with retrieved context.
pub fn with_context(prompt: &str, context: &str) -> String {
    format!(
        "Context information:\n{context}\n\nBased on the context above, please respond to the following:\n{prompt}"
    )
}

/// Build the generator named by `llm.default_provider`.
pub fn build_generator(settings: &Settings) -> Result<Arc<dyn TextGenerator>, LlmError> {
    let llm = &settings.llm;
    match llm.default_provider.as_str() {
        "anthropic" | "claude" => {
            let api_key = settings
                .anthropic_api_key
                .clone()
                .ok_or_else(|| LlmError::Config("ANTHROPIC_API_KEY is not set".to_string()))?;
            let base_url = llm.base_url.as_deref().unwrap_or(ANTHROPIC_BASE_URL);
            Ok(Arc::new(AnthropicClient::new(base_url, &api_key, llm)))
        }
        "openai" => {
            let api_key = settings
                .openai_api_key
                .clone()
                .ok_or_else(|| LlmError::Config("OPENAI_API_KEY is not set".to_string()))?;
            let base_url = llm.base_url.as_deref().unwrap_or(OPENAI_BASE_URL);
            Ok(Arc::new(OpenAiClient::new(base_url, &api_key, llm)))
        }
        other => Err(LlmError::Config(format!("Unknown LLM provider: '{}'", other))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_context_layout() {
        let prompt = with_context("Write an intro", "Moon phases");
        assert_eq!(
            prompt,
            "Context information:\nMoon phases\n\nBased on the context above, please respond to the following:\nWrite an intro"
        );
    }

    #[test]
    fn test_build_generator_requires_key() {
        let settings = Settings::default();
        assert!(matches!(build_generator(&settings), Err(LlmError::Config(_))));
    }

    #[test]
    fn test_build_generator_selects_provider() {
        let mut settings = Settings::default();
        settings.anthropic_api_key = Some("a-key".into());
        settings.openai_api_key = Some("o-key".into());
        assert_eq!(build_generator(&settings).unwrap().provider(), "anthropic");

        settings.llm.default_provider = "openai".into();
        assert_eq!(build_generator(&settings).unwrap().provider(), "openai");

        settings.llm.default_provider = "mystery".into();
        assert!(build_generator(&settings).is_err());
    }
}
