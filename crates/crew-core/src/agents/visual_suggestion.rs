use async_trait::async_trait;
use serde_json::json;

use super::image_prompt::CONTENT_EXCERPT_CHARS;
use super::{excerpt, final_text, str_field, str_or, Agent, AgentCore, BuiltinSkills};
use crate::error::AgentError;
use crate::events::EventBus;
use crate::models::{AgentCapability, Task, TaskResult};

const SYSTEM_PROMPT: &str = r#"You are a UX/UI designer specialised in high-quality editorial blogs.
You design visual experiences that:
- Make reading and engagement easy
- Convey professionalism and spirituality at once
- Work well on every platform
- Are accessible and inclusive

Your recommendations are practical, specific and ready to implement."#;

const RECOMMENDATION_SECTIONS: &str = r#"Give detailed recommendations for:

1. ARTICLE LAYOUT
- Recommended visual structure
- Spacing between sections
- Header placement
- Use of pull quotes or highlights

2. IMAGE PLACEMENT
- Where each image goes in the text
- Relative size (full-width, half, float)
- Suggested alignment
- Recommended captions

3. COLOUR SCHEME
- Primary colour (headers, links, CTAs)
- Secondary colour (accents, highlights)
- Suggested background colours
- Specific HEX codes

4. TYPOGRAPHY
- Font style for titles (serif/sans-serif)
- Style for body text
- Size hierarchy (H1, H2, H3, paragraph)
- Line spacing

5. ADDITIONAL VISUAL ELEMENTS
- Suggested icons
- Section dividers
- Highlight boxes (quotes, tips)
- Call-to-action styling

6. RESPONSIVENESS
- Mobile adaptations
- Image behaviour on small screens

7. ACCESSIBILITY
- Colour contrast
- Minimum font sizes
- Alt text guidelines

OUTPUT FORMAT:
Organise the recommendations clearly and actionably, as a style guide for this article."#;

pub struct VisualSuggestionAgent {
    core: AgentCore,
}

impl VisualSuggestionAgent {
    pub fn new(skills: &BuiltinSkills, events: EventBus) -> Self {
        let core = AgentCore::new(
            "visual_suggestion",
            "Recommends visual layout and design elements",
            events,
        )
        .with_skill(skills.llm_call.clone())
        .with_capability(
            AgentCapability::new(
                "visual_design",
                "Suggest visual design elements",
                &["visual", "layout", "design"],
                &["llm_call"],
            )
            .with_priority(4),
        );
        Self { core }
    }
}

#[async_trait]
impl Agent for VisualSuggestionAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    async fn execute_task(&self, task: &Task) -> Result<TaskResult, AgentError> {
        let quality = task.input("quality");
        let content = str_or(quality, "content", &task.description);
        let topic = str_field(quality, "topic");
        let image_prompts = str_or(task.input("image_prompts"), "prompts", "Not available");
        tracing::info!("[Agent:visual_suggestion] Generating visual suggestions for '{}'", topic);
        let mut ctx = self.core.context_for(task);

        let prompt = format!(
            "Analyse the following content and image prompts to produce complete visual recommendations:\n\n\
             ARTICLE CONTENT:\n{}...\n\n\
             GENERATED IMAGE PROMPTS:\n{image_prompts}\n\n\
             THEME: {topic}\n\
             NICHE: Mysticism + Management/Business\n\n\
             {RECOMMENDATION_SECTIONS}",
            excerpt(content, CONTENT_EXCERPT_CHARS)
        );
        let generated = self
            .core
            .execute_skill_in(
                "llm_call",
                &mut ctx,
                json!({ "prompt": prompt, "system_prompt": SYSTEM_PROMPT }),
            )
            .await?;
        let suggestions = match final_text(task, &generated) {
            Ok(text) => text,
            Err(failure) => return Ok(failure),
        };

        Ok(TaskResult::success(
            task.id(),
            json!({ "suggestions": suggestions, "topic": topic }),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::{fixture, text};
    use crate::models::metadata;

    #[tokio::test]
    async fn test_reads_quality_and_image_prompts() {
        let fx = fixture(vec![text("Use indigo headers")], vec![]);
        let agent = VisualSuggestionAgent::new(&fx.skills, fx.events.clone());
        let mut task = Task::new("Generate visual suggestions for: Moon", "visual").with_metadata(metadata(json!({
            "quality": { "content": "final text", "topic": "Moon" },
            "image_prompts": { "prompts": "[FEATURED] moonlit office" },
        })));

        let result = agent.execute(&mut task).await.unwrap();
        assert_eq!(result.output["suggestions"], "Use indigo headers");
        let prompt = fx.llm.param(0, "prompt");
        let prompt = prompt.as_str().unwrap();
        assert!(prompt.contains("GENERATED IMAGE PROMPTS:\n[FEATURED] moonlit office"));
        assert!(prompt.contains("ARTICLE CONTENT:\nfinal text..."));
    }

    #[tokio::test]
    async fn test_missing_image_prompts_placeholder() {
        let fx = fixture(vec![text("ok")], vec![]);
        let agent = VisualSuggestionAgent::new(&fx.skills, fx.events.clone());
        let mut task = Task::new("c", "visual");
        agent.execute(&mut task).await.unwrap();
        assert!(fx.llm.param(0, "prompt").as_str().unwrap().contains("Not available"));
        assert!(!agent.can_handle(&Task::new("c", "suggest")));
    }
}
