use async_trait::async_trait;
use serde_json::json;

use super::{excerpt, final_text, str_field, str_or, Agent, AgentCore, BuiltinSkills};
use crate::error::AgentError;
use crate::events::EventBus;
use crate::models::{AgentCapability, Task, TaskResult};

pub(crate) const CONTENT_EXCERPT_CHARS: usize = 2000;

const SYSTEM_PROMPT: &str = r#"You are an expert in digital art and prompt engineering for generative AI.
You write prompts that produce professional, evocative images blending mystical and spiritual
elements with a modern corporate aesthetic. Your images are:
- Elegant and sophisticated
- Spiritually inspiring without being kitsch
- Professional without being cold
- Unique and memorable"#;

pub struct ImagePromptAgent {
    core: AgentCore,
}

impl ImagePromptAgent {
    pub fn new(skills: &BuiltinSkills, events: EventBus) -> Self {
        let core = AgentCore::new("image_prompt", "Generates detailed prompts for AI image generation", events)
            .with_skill(skills.llm_call.clone())
            .with_capability(
                AgentCapability::new(
                    "image_prompts",
                    "Generate image prompts",
                    &["image_prompt", "visual_prompt", "thumbnail"],
                    &["llm_call"],
                )
                .with_priority(5),
            );
        Self { core }
    }
}

fn image_prompt(content: &str, topic: &str) -> String {
    format!(
        r#"Analyse the following blog content and write detailed prompts for AI image generation:

CONTENT:
{content}...

THEME: {topic}
NICHE: Mysticism + Management/Business

Please create:

1. FEATURED IMAGE
A detailed prompt for the article's main image:
- Style: mystical-professional, elegant, inspiring
- Visual elements that combine spirituality and business
- Suggested colours balancing mystery and professionalism
- Composition and framing
- Prompt in English optimised for Midjourney/DALL-E

2. SECTION IMAGES (2-3 prompts)
- Identify key moments that would benefit from an image
- Write prompts that complement the text
- Keep visual consistency with the featured image

3. SOCIAL MEDIA THUMBNAIL
- Focus on immediate visual impact
- Suggested text overlay (if any)
- Sizes considered (1200x630 for OG, 1080x1080 for IG)

4. NEGATIVE PROMPTS
What to avoid in every image:
- Elements that clash with the theme
- Inappropriate visual styles
- Clichés

FORMAT FOR EACH PROMPT:
```
[IMAGE TITLE]
Prompt: [detailed prompt]
Style: [style reference]
Aspect Ratio: [recommended ratio]
Negative Prompt: [what to avoid]
```"#
    )
}

#[async_trait]
impl Agent for ImagePromptAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    async fn execute_task(&self, task: &Task) -> Result<TaskResult, AgentError> {
        let quality = task.input("quality");
        let content = str_or(quality, "content", &task.description);
        let topic = str_field(quality, "topic");
        tracing::info!("[Agent:image_prompt] Generating image prompts for '{}'", topic);
        let mut ctx = self.core.context_for(task);

        let generated = self
            .core
            .execute_skill_in(
                "llm_call",
                &mut ctx,
                json!({
                    "prompt": image_prompt(excerpt(content, CONTENT_EXCERPT_CHARS), topic),
                    "system_prompt": SYSTEM_PROMPT,
                }),
            )
            .await?;
        let prompts = match final_text(task, &generated) {
            Ok(text) => text,
            Err(failure) => return Ok(failure),
        };

        Ok(TaskResult::success(task.id(), json!({ "prompts": prompts, "topic": topic })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::{fixture, text};
    use crate::models::metadata;

    #[tokio::test]
    async fn test_long_content_is_excerpted() {
        let fx = fixture(vec![text("[FEATURED] moonlit office")], vec![]);
        let agent = ImagePromptAgent::new(&fx.skills, fx.events.clone());
        let long = "x".repeat(5000);
        let mut task = Task::new("Generate image prompts for: Moon", "image_prompt")
            .with_metadata(metadata(json!({ "quality": { "content": long, "topic": "Moon" } })));

        let result = agent.execute(&mut task).await.unwrap();
        assert_eq!(result.output["prompts"], "[FEATURED] moonlit office");
        assert_eq!(result.output["topic"], "Moon");

        let prompt = fx.llm.param(0, "prompt");
        let prompt = prompt.as_str().unwrap();
        assert!(prompt.contains(&format!("{}...", "x".repeat(2000))));
        assert!(!prompt.contains(&"x".repeat(2001)));
    }

    #[tokio::test]
    async fn test_failure_propagates_as_failed_result() {
        let fx = fixture(vec![Err("timeout".into())], vec![]);
        let agent = ImagePromptAgent::new(&fx.skills, fx.events.clone());
        let mut task = Task::new("c", "image_prompt");
        let result = agent.execute(&mut task).await.unwrap();
        assert!(!result.success);
    }
}
