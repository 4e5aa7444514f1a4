use async_trait::async_trait;
use serde_json::{json, Value};

use super::{final_text, optional_text, str_field, str_or, word_count, Agent, AgentCore, BuiltinSkills};
use crate::error::AgentError;
use crate::events::EventBus;
use crate::models::{AgentCapability, Task, TaskResult};

const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a professional editor specialised in content that joins spirituality
and business. You have a sharp eye for:
- Grammar and style mistakes
- Inconsistent tone
- Problems with flow
- Opportunities for improvement

Your goal is to raise the quality of the text while keeping the author's original voice."#;

const EDIT_CHECKLIST: &str = r#"Please do a complete review covering:

1. WRITING STYLE (HIGHEST PRIORITY)
- Adjust tone and voice to the defined style
- Apply the preferred vocabulary
- Follow the indicated structure and formatting
- Remove terms listed as ones to avoid

2. GRAMMAR AND SPELLING
- Fix grammatical mistakes
- Check agreement
- Fix spelling

3. CLARITY AND FLOW
- Improve transitions between paragraphs
- Simplify overly complex sentences
- Make sure every paragraph has a clear purpose

4. STRUCTURE
- Check that headers are well placed
- Confirm the sections are well proportioned
- Ensure an engaging introduction and a memorable conclusion

5. ENGAGEMENT
- Add hooks where needed
- Improve calls to action
- Check that examples are clear and relevant

Provide:
1. The complete revised content
2. A list of the main changes
3. Further suggestions (if any)

REVISED CONTENT:"#;

pub struct EditorAgent {
    core: AgentCore,
}

impl EditorAgent {
    pub fn new(skills: &BuiltinSkills, events: EventBus) -> Self {
        let core = AgentCore::new(
            "editor",
            "Reviews and improves content for grammar, style, and coherence",
            events,
        )
        .with_skill(skills.llm_call.clone())
        .with_skill(skills.rag_query.clone())
        .with_capability(
            AgentCapability::new(
                "editing",
                "Edit and improve content",
                &["edit", "review", "improve", "polish"],
                &["llm_call", "rag_query"],
            )
            .with_priority(8),
        );
        Self { core }
    }
}

fn style_section(writing_style: &str, rag_style: &str) -> String {
    let mut section = String::new();
    if !writing_style.is_empty() {
        section.push_str(&format!("\nAUTHOR WRITING STYLE (APPLY STRICTLY):\n{writing_style}\n"));
    }
    if !rag_style.is_empty() {
        section.push_str(&format!("\nSTYLE REFERENCES FROM THE KNOWLEDGE BASE:\n{rag_style}\n"));
    }
    section
}

fn system_prompt(writing_style: &str) -> String {
    if writing_style.is_empty() {
        return DEFAULT_SYSTEM_PROMPT.to_string();
    }
    format!(
        r#"You are a professional editor who STRICTLY applies the author's writing style.

{writing_style}

Your goal is to:
1. Make sure the text follows the defined style
2. Fix errors without changing the essence
3. Raise the quality while keeping the author's voice"#
    )
}

#[async_trait]
impl Agent for EditorAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    async fn execute_task(&self, task: &Task) -> Result<TaskResult, AgentError> {
        let draft = task.input("draft");
        let content = str_or(draft, "content", &task.description);
        let topic = str_field(draft, "topic");
        let writing_style = task.input("writing_style").as_str().unwrap_or_default();
        tracing::info!(
            "[Agent:editor] Editing '{}' (custom style: {})",
            topic,
            !writing_style.is_empty()
        );
        let mut ctx = self.core.context_for(task);

        let style = self
            .core
            .execute_skill_in(
                "rag_query",
                &mut ctx,
                json!({ "query": topic, "collection": "style", "n_results": 2 }),
            )
            .await?;
        let rag_style = optional_text(&style);

        let prompt = format!(
            "Revise and improve the following blog article:\n\nORIGINAL CONTENT:\n{content}\n{}\n{EDIT_CHECKLIST}",
            style_section(writing_style, &rag_style)
        );
        let edit = self
            .core
            .execute_skill_in(
                "llm_call",
                &mut ctx,
                json!({
                    "prompt": prompt,
                    "system_prompt": system_prompt(writing_style),
                    "max_tokens": 4096,
                }),
            )
            .await?;
        let edited = match final_text(task, &edit) {
            Ok(text) => text,
            Err(failure) => return Ok(failure),
        };

        let words = word_count(&edited);
        Ok(TaskResult::success(
            task.id(),
            json!({
                "content": edited,
                "original_content": content,
                "topic": topic,
                "word_count": words,
            }),
        )
        .with_metadata("word_count", Value::from(words)))
    }
}
