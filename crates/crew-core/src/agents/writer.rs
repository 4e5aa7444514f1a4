use async_trait::async_trait;
use serde_json::json;

use super::{final_text, optional_text, str_field, str_or, word_count, Agent, AgentCore, BuiltinSkills};
use crate::error::AgentError;
use crate::events::EventBus;
use crate::models::{AgentCapability, Task, TaskResult};

const DEFAULT_TARGET_LENGTH: u64 = 1500;

const SYSTEM_PROMPT: &str = r#"You are a writer who joins mysticism, spirituality and ancestral wisdom
with modern management and leadership practice. Your style is:
- Accessible but deep
- Practical but inspiring
- Respectful of spiritual traditions
- Applicable to the business world"#;

/// Turns a research brief into a full draft: outline first, then the article.
pub struct WriterAgent {
    core: AgentCore,
}

impl WriterAgent {
    pub fn new(skills: &BuiltinSkills, events: EventBus) -> Self {
        let core = AgentCore::new(
            "writer",
            "Creates content drafts based on research and style references",
            events,
        )
        .with_skill(skills.llm_call.clone())
        .with_skill(skills.rag_query.clone())
        .with_capability(
            AgentCapability::new(
                "writing",
                "Create content drafts",
                &["write", "create", "draft", "compose"],
                &["llm_call", "rag_query"],
            )
            .with_priority(9),
        );
        Self { core }
    }
}

fn outline_prompt(topic: &str, analysis: &str, target_length: u64) -> String {
    format!(
        r#"Create a detailed outline for a blog article about:

TOPIC: {topic}

AVAILABLE RESEARCH:
{analysis}

The article must:
- Be roughly {target_length} words long
- Balance mystical and spiritual wisdom with practical management applications
- Have an engaging introduction, a body of 3-5 sections and a conclusion with a call to action
- Be approachable for business professionals interested in spirituality

Give the outline as:
1. Suggested title
2. Introduction (hook + context)
3. Main sections (with subtopics)
4. Conclusion (synthesis + call to action)"#
    )
}

fn write_prompt(outline: &str, style_context: &str, analysis: &str, target_length: u64) -> String {
    format!(
        r#"Write a complete blog article following this outline:

{outline}

STYLE REFERENCE (keep a similar tone):
{style_context}

RESEARCH AND INSIGHTS:
{analysis}

INSTRUCTIONS:
- Write roughly {target_length} words
- Use engaging, accessible language
- Include practical examples where possible
- Balance spiritual depth with business applicability
- Format with Markdown headers (## for sections)
- Open with a captivating introduction and close with a memorable conclusion

Write the full article now:"#
    )
}

#[async_trait]
impl Agent for WriterAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    async fn execute_task(&self, task: &Task) -> Result<TaskResult, AgentError> {
        let research = task.input("research");
        let topic = str_or(research, "topic", &task.description);
        let analysis = str_field(research, "analysis");
        let target_length = task.input("target_length").as_u64().unwrap_or(DEFAULT_TARGET_LENGTH);
        tracing::info!("[Agent:writer] Drafting '{}' (~{} words)", topic, target_length);
        let mut ctx = self.core.context_for(task);

        let style = self
            .core
            .execute_skill_in(
                "rag_query",
                &mut ctx,
                json!({ "query": topic, "collection": "style", "n_results": 3, "format_as_context": true }),
            )
            .await?;
        let style_context = optional_text(&style);

        let research_for_outline = if analysis.is_empty() { "No analysis available" } else { analysis };
        let outline = self
            .core
            .execute_skill_in(
                "llm_call",
                &mut ctx,
                json!({
                    "prompt": outline_prompt(topic, research_for_outline, target_length),
                    "system_prompt": SYSTEM_PROMPT,
                }),
            )
            .await?;
        let outline_text = optional_text(&outline);
        let outline_for_article = if outline_text.is_empty() {
            format!("Create a structured article about: {topic}")
        } else {
            outline_text.clone()
        };

        let draft = self
            .core
            .execute_skill_in(
                "llm_call",
                &mut ctx,
                json!({
                    "prompt": write_prompt(&outline_for_article, &style_context, analysis, target_length),
                    "system_prompt": SYSTEM_PROMPT,
                    "max_tokens": 4096,
                }),
            )
            .await?;
        let content = match final_text(task, &draft) {
            Ok(content) => content,
            Err(failure) => return Ok(failure),
        };

        let words = word_count(&content);
        Ok(TaskResult::success(
            task.id(),
            json!({
                "content": content,
                "outline": outline_text,
                "topic": topic,
                "word_count": words,
            }),
        )
        .with_metadata("word_count", json!(words)))
    }
}
