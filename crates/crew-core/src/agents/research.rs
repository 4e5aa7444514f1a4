use async_trait::async_trait;
use serde_json::{json, Value};

use super::{optional_text, Agent, AgentCore, BuiltinSkills};
use crate::error::AgentError;
use crate::events::EventBus;
use crate::models::{AgentCapability, Task, TaskResult};

const SEARCH_QUERY_SUFFIX: &str = "mysticism business management";

const SYSTEM_PROMPT: &str = r#"You are a researcher who finds connections between ancestral wisdom or mysticism
and modern management and business practice. Your goal is to surface original insights that join
both worlds in an authentic and practical way."#;

/// Gathers web results and existing knowledge on a topic and asks the model
/// for a structured research brief.
pub struct ResearchAgent {
    core: AgentCore,
}

impl ResearchAgent {
    pub fn new(skills: &BuiltinSkills, events: EventBus) -> Self {
        let core = AgentCore::new(
            "research",
            "Discovers topics, gathers information, and compiles research briefs",
            events,
        )
        .with_skill(skills.web_search.clone())
        .with_skill(skills.rag_query.clone())
        .with_skill(skills.llm_call.clone())
        .with_capability(
            AgentCapability::new(
                "research",
                "Research topics and gather information",
                &["research", "discover", "gather", "verify"],
                &["web_search", "rag_query", "llm_call"],
            )
            .with_priority(10),
        );
        Self { core }
    }
}

fn analysis_prompt(topic: &str, web_summary: &str, rag_context: &str) -> String {
    format!(
        r#"Analyse the following information about the topic "{topic}" and write a structured research brief.

WEB FINDINGS:
{web_summary}

EXISTING KNOWLEDGE:
{rag_context}

Please provide:
1. KEY POINTS: the most important insights on the topic
2. MYSTICISM-MANAGEMENT LINK: how the theme connects ancestral wisdom with business practice
3. CONTENT ANGLES: 3-5 interesting angles for the piece
4. SOURCES AND REFERENCES: a summary of the sources found
5. SUGGESTED KEYWORDS: relevant terms for the content

Keep the tone balanced between spirituality and business pragmatism."#
    )
}

#[async_trait]
impl Agent for ResearchAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    async fn execute_task(&self, task: &Task) -> Result<TaskResult, AgentError> {
        let topic = task.description.as_str();
        tracing::info!("[Agent:research] Researching '{}'", topic);
        let mut ctx = self.core.context_for(task);

        let web = self
            .core
            .execute_skill_in(
                "web_search",
                &mut ctx,
                json!({ "query": format!("{topic} {SEARCH_QUERY_SUFFIX}"), "max_results": 5 }),
            )
            .await?;
        let web_output = if web.success { web.output } else { Value::Null };

        let rag = self
            .core
            .execute_skill_in(
                "rag_query",
                &mut ctx,
                json!({ "query": topic, "collection": "both", "n_results": 5 }),
            )
            .await?;
        let rag_context = optional_text(&rag);

        let web_summary = web_output
            .get("summary")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .unwrap_or("No information found");
        let knowledge = if rag_context.is_empty() { "No context available" } else { rag_context.as_str() };

        let analysis = self
            .core
            .execute_skill_in(
                "llm_call",
                &mut ctx,
                json!({
                    "prompt": analysis_prompt(topic, web_summary, knowledge),
                    "system_prompt": SYSTEM_PROMPT,
                }),
            )
            .await?;
        if !analysis.success {
            tracing::warn!(
                "[Agent:research] Analysis unavailable: {}",
                analysis.error.as_deref().unwrap_or_default()
            );
        }

        let web_sources = web_output.get("results").cloned().unwrap_or_else(|| json!([]));
        let sources_count = web_sources.as_array().map_or(0, Vec::len);
        let brief = json!({
            "topic": topic,
            "analysis": optional_text(&analysis),
            "web_sources": web_sources,
            "rag_context": rag_context,
        });

        Ok(TaskResult::success(task.id(), brief).with_metadata("sources_count", json!(sources_count)))
    }
}
