//! Skills: atomic capabilities that agents combine.
//!
//! Every skill goes through the same lifecycle in [`Skill::execute`]:
//! parameters are validated first, declared defaults fill the gaps, and
//! the pre-hook, `run` and post-hook follow. The caller always gets a
//! `SkillResult` back; failures are reported in it rather than raised.

pub mod keyword_extraction;
pub mod llm_call;
pub mod rag_query;
pub mod web_search;

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

pub use keyword_extraction::KeywordExtractionSkill;
pub use llm_call::LlmCallSkill;
pub use rag_query::RagQuerySkill;
pub use web_search::WebSearchSkill;

use crate::config::Settings;
use crate::error::{RegistryError, SkillError};
use crate::events::{Event, EventBus, EventType};
use crate::llm::TextGenerator;
use crate::models::{SkillContext, SkillParameter, SkillResult};
use crate::rag::RagService;
use crate::registry::Registry;
use crate::search::WebSearch;

pub type SkillRegistry = Registry<dyn Skill>;

#[async_trait]
pub trait Skill: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn category(&self) -> &str;
    fn parameters(&self) -> &[SkillParameter];

    fn validate(&self, context: &SkillContext) -> Result<(), Vec<String>> {
        validate_params(self.parameters(), context)
    }

    async fn pre_execute(&self, _context: &mut SkillContext) -> Result<(), SkillError> {
        Ok(())
    }

    /// Skill logic. Params are already validated and defaulted.
    async fn run(&self, context: &mut SkillContext) -> Result<SkillResult, SkillError>;

    async fn post_execute(&self, _context: &mut SkillContext, _result: &SkillResult) -> Result<(), SkillError> {
        Ok(())
    }

    async fn execute(&self, context: &mut SkillContext, events: &EventBus) -> SkillResult {
        let started = Instant::now();
        let name = self.name().to_string();

        if let Err(errors) = self.validate(context) {
            let message = format!("Validation failed: {}", errors.join(", "));
            tracing::warn!("[Skill:{}] {}", name, message);
            let mut result = SkillResult::failed(&name, message.clone());
            result.execution_time = started.elapsed().as_secs_f64();
            events
                .publish(Event::new(
                    EventType::SkillFailed,
                    &name,
                    json!({ "execution_id": context.execution_id, "error": message }),
                ))
                .await;
            return result;
        }
        apply_defaults(self.parameters(), context);

        tracing::info!("[Skill:{}] Started (execution {})", name, context.execution_id);
        events
            .publish(Event::new(
                EventType::SkillStarted,
                &name,
                json!({ "execution_id": context.execution_id, "agent": context.agent_name }),
            ))
            .await;

        let outcome = async {
            self.pre_execute(context).await?;
            let result = self.run(context).await?;
            self.post_execute(context, &result).await?;
            Ok::<_, SkillError>(result)
        }
        .await;

        match outcome {
            Ok(mut result) => {
                result.execution_time = started.elapsed().as_secs_f64();
                tracing::info!(
                    "[Skill:{}] Completed (success: {}, {:.2}s)",
                    name,
                    result.success,
                    result.execution_time
                );
                events
                    .publish(Event::new(
                        EventType::SkillCompleted,
                        &name,
                        json!({ "result": serde_json::to_value(&result).unwrap_or_default() }),
                    ))
                    .await;
                result
            }
            Err(e) => {
                tracing::error!("[Skill:{}] Failed: {}", name, e);
                let mut result = SkillResult::failed(&name, e.to_string());
                result.execution_time = started.elapsed().as_secs_f64();
                events
                    .publish(Event::new(
                        EventType::SkillFailed,
                        &name,
                        json!({ "execution_id": context.execution_id, "error": e.to_string() }),
                    ))
                    .await;
                result
            }
        }
    }

    fn describe(&self) -> SkillInfo {
        SkillInfo {
            name: self.name().to_string(),
            description: self.description().to_string(),
            category: self.category().to_string(),
            parameters: self.parameters().to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SkillInfo {
    pub name: String,
    pub description: String,
    pub category: String,
    pub parameters: Vec<SkillParameter>,
}

/// One message per missing required parameter or mistyped value.
pub fn validate_params(parameters: &[SkillParameter], context: &SkillContext) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();
    for param in parameters {
        match context.get(&param.name) {
            None | Some(Value::Null) => {
                if param.required {
                    errors.push(format!("Missing required parameter: {}", param.name));
                }
            }
            Some(value) if !param.param_type.matches(value) => {
                errors.push(format!(
                    "Parameter '{}' must be of type {}",
                    param.name,
                    param.param_type.as_str()
                ));
            }
            Some(_) => {}
        }
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

pub fn apply_defaults(parameters: &[SkillParameter], context: &mut SkillContext) {
    for param in parameters {
        let Some(default) = &param.default else { continue };
        let missing = context.get(&param.name).map_or(true, Value::is_null);
        if missing {
            context.params.insert(param.name.clone(), default.clone());
        }
    }
}

// ─── Built-in skills ────────────────────────────────────────────────────

/// External services the built-in skills depend on.
#[derive(Clone)]
pub struct SkillServices {
    pub generator: Arc<dyn TextGenerator>,
    pub rag: Arc<RagService>,
    pub search: Arc<dyn WebSearch>,
}

pub fn register_builtin_skills(
    registry: &SkillRegistry,
    services: &SkillServices,
    settings: &Settings,
) -> Result<(), RegistryError> {
    let generator = services.generator.clone();
    let llm = settings.llm.clone();
    registry.register("llm_call", "llm", move || {
        Arc::new(LlmCallSkill::new(generator.clone(), &llm)) as Arc<dyn Skill>
    })?;

    let rag = services.rag.clone();
    let n_results = settings.rag.default_n_results;
    registry.register("rag_query", "rag", move || {
        Arc::new(RagQuerySkill::new(rag.clone(), n_results)) as Arc<dyn Skill>
    })?;

    let search = services.search.clone();
    let search_settings = settings.search.clone();
    registry.register("web_search", "search", move || {
        Arc::new(WebSearchSkill::new(search.clone(), &search_settings)) as Arc<dyn Skill>
    })?;

    registry.register("keyword_extraction", "seo", || {
        Arc::new(KeywordExtractionSkill::new()) as Arc<dyn Skill>
    })?;

    tracing::info!("[Skills] Registered {} built-in skills", registry.len());
    Ok(())
}
