use async_trait::async_trait;
use serde_json::{json, Value};

use super::{final_text, str_field, str_or, Agent, AgentCore, BuiltinSkills};
use crate::error::AgentError;
use crate::events::EventBus;
use crate::models::{AgentCapability, Task, TaskResult};

const MAX_KEYWORDS: u64 = 15;

const SYSTEM_PROMPT: &str = r#"You are an SEO specialist for niche blogs (spirituality + business).
You know how to optimise content to rank well on Google while keeping the text natural and of high quality.
Focus on on-page SEO and user experience."#;

pub struct SeoAgent {
    core: AgentCore,
}

impl SeoAgent {
    pub fn new(skills: &BuiltinSkills, events: EventBus) -> Self {
        let core = AgentCore::new("seo", "Optimizes content for search engines", events)
            .with_skill(skills.llm_call.clone())
            .with_skill(skills.keyword_extraction.clone())
            .with_capability(
                AgentCapability::new(
                    "seo_optimization",
                    "Optimize content for SEO",
                    &["optimize", "seo", "keywords", "meta"],
                    &["llm_call", "keyword_extraction"],
                )
                .with_priority(7),
            );
        Self { core }
    }
}

fn keyword_list(keywords: &Value) -> String {
    keywords
        .get("keywords")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(|k| k.get("keyword").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join(", ")
        })
        .unwrap_or_default()
}

fn seo_prompt(content: &str, keywords: &str) -> String {
    format!(
        r#"Optimise the following content for SEO:

CONTENT:
{content}

EXTRACTED KEYWORDS:
{keywords}

Please provide:

1. META TITLE (max. 60 characters)
- Include the main keyword
- Make it attractive to click

2. META DESCRIPTION (max. 160 characters)
- Summarise the value of the article
- Include a subtle call to action
- Use the main keyword

3. CONTENT OPTIMISATION SUGGESTIONS
- Keywords to add or emphasise
- Header improvements (H1, H2, H3)
- Internal linking opportunities
- Suggested image alt text

4. OPTIMISED CONTENT
Rewrite the content with:
- Keywords distributed naturally (1-2% density)
- Headers optimised with keywords
- The main keyword in the first paragraph
- A conclusion with keyword and CTA

5. SUGGESTED SCHEMA MARKUP (content type)

Label every section of the answer clearly."#
    )
}

#[async_trait]
impl Agent for SeoAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    async fn execute_task(&self, task: &Task) -> Result<TaskResult, AgentError> {
        let edited = task.input("edited");
        let content = str_or(edited, "content", &task.description);
        let topic = str_field(edited, "topic");
        tracing::info!("[Agent:seo] Optimising '{}'", topic);
        let mut ctx = self.core.context_for(task);

        let extraction = self
            .core
            .execute_skill_in(
                "keyword_extraction",
                &mut ctx,
                json!({ "text": content, "max_keywords": MAX_KEYWORDS }),
            )
            .await?;
        let keywords = if extraction.success { extraction.output } else { json!({}) };

        let optimisation = self
            .core
            .execute_skill_in(
                "llm_call",
                &mut ctx,
                json!({
                    "prompt": seo_prompt(content, &keyword_list(&keywords)),
                    "system_prompt": SYSTEM_PROMPT,
                    "max_tokens": 4096,
                }),
            )
            .await?;
        let optimised = match final_text(task, &optimisation) {
            Ok(text) => text,
            Err(failure) => return Ok(failure),
        };

        let keywords_count = keywords
            .get("keywords")
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        Ok(TaskResult::success(
            task.id(),
            json!({
                "content": optimised,
                "original_content": content,
                "keywords": keywords,
                "topic": topic,
            }),
        )
        .with_metadata("keywords_count", json!(keywords_count)))
    }
}
