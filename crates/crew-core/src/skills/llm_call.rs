use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::Skill;
use crate::config::LlmSettings;
use crate::error::SkillError;
use crate::llm::{with_context, GenerationRequest, TextGenerator};
use crate::models::{ParamType, SkillContext, SkillParameter, SkillResult};

/// Text generation through the configured provider.
pub struct LlmCallSkill {
    generator: Arc<dyn TextGenerator>,
    parameters: Vec<SkillParameter>,
}

impl LlmCallSkill {
    pub fn new(generator: Arc<dyn TextGenerator>, settings: &LlmSettings) -> Self {
        Self {
            generator,
            parameters: vec![
                SkillParameter::required("prompt", ParamType::String, "The prompt to send to the LLM"),
                SkillParameter::optional("system_prompt", ParamType::String, "Optional system prompt", None),
                SkillParameter::optional("context", ParamType::String, "Optional context to include", None),
                SkillParameter::optional(
                    "max_tokens",
                    ParamType::Integer,
                    "Maximum tokens in response",
                    Some(json!(settings.max_tokens)),
                ),
                SkillParameter::optional(
                    "temperature",
                    ParamType::Float,
                    "Temperature for generation",
                    Some(json!(settings.temperature)),
                ),
            ],
        }
    }
}

#[async_trait]
impl Skill for LlmCallSkill {
    fn name(&self) -> &str {
        "llm_call"
    }

    fn description(&self) -> &str {
        "Make calls to language models for text generation"
    }

    fn category(&self) -> &str {
        "llm"
    }

    fn parameters(&self) -> &[SkillParameter] {
        &self.parameters
    }

    async fn run(&self, context: &mut SkillContext) -> Result<SkillResult, SkillError> {
        let prompt = context.str_param("prompt").unwrap_or_default();
        let prompt = match context.str_param("context").filter(|c| !c.is_empty()) {
            Some(rag_context) => with_context(prompt, rag_context),
            None => prompt.to_string(),
        };

        let request = GenerationRequest {
            prompt,
            system_prompt: context.str_param("system_prompt").map(str::to_string),
            max_tokens: context.u64_param("max_tokens").and_then(|t| u32::try_from(t).ok()),
            temperature: context.f64_param("temperature"),
        };
        let response = self.generator.generate(&request).await?;

        let tokens_estimated = response.split_whitespace().count();
        Ok(SkillResult::completed(self.name(), Value::String(response))
            .with_metadata("tokens_estimated", json!(tokens_estimated))
            .with_metadata("provider", json!(self.generator.provider())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::events::EventBus;
    use crate::models::metadata;
    use std::sync::Mutex;

    struct RecordingGenerator {
        requests: Mutex<Vec<GenerationRequest>>,
    }

    #[async_trait]
    impl TextGenerator for RecordingGenerator {
        fn provider(&self) -> &str {
            "recording"
        }

        async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
            self.requests.lock().unwrap().push(request.clone());
            Ok("three word reply".to_string())
        }
    }

    async fn call(params: Value) -> (SkillResult, GenerationRequest) {
        let generator = Arc::new(RecordingGenerator { requests: Mutex::new(Vec::new()) });
        let skill = LlmCallSkill::new(generator.clone(), &LlmSettings::default());
        let mut ctx = SkillContext::new(metadata(params));
        let result = skill.execute(&mut ctx, &EventBus::new()).await;
        let request = generator.requests.lock().unwrap().pop().unwrap();
        (result, request)
    }

    #[tokio::test]
    async fn test_defaults_and_metadata() {
        let (result, request) = call(json!({ "prompt": "Hi" })).await;
        assert!(result.success);
        assert_eq!(result.text(), Some("three word reply"));
        assert_eq!(result.metadata["tokens_estimated"], 3);
        assert_eq!(result.metadata["provider"], "recording");
        assert_eq!(request.prompt, "Hi");
        assert_eq!(request.max_tokens, Some(4096));
        assert_eq!(request.temperature, Some(0.7));
    }

    #[tokio::test]
    async fn test_context_wraps_prompt() {
        let (_, request) = call(json!({ "prompt": "Summarise", "context": "Moon facts" })).await;
        assert_eq!(request.prompt, with_context("Summarise", "Moon facts"));
        assert!(request.prompt.contains("Moon facts"));
    }

    #[tokio::test]
    async fn test_out_of_range_max_tokens_is_not_truncated() {
        let (result, request) = call(json!({ "prompt": "Hi", "max_tokens": 5_000_000_000u64 })).await;
        assert!(result.success);
        assert_eq!(request.max_tokens, None);
    }
}
