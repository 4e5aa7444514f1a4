use async_trait::async_trait;
use serde_json::json;

use super::{final_text, optional_text, str_field, str_or, Agent, AgentCore, BuiltinSkills};
use crate::error::AgentError;
use crate::events::EventBus;
use crate::models::{AgentCapability, Task, TaskResult};

const DEFAULT_MIN_SCORE: u64 = 75;

const SYSTEM_PROMPT: &str = r#"You are an experienced editorial quality reviewer specialised in content that joins
spirituality and business. You are rigorous but fair, flagging real problems without being overly
critical. Your goal is to make sure published content is of high quality and brings genuine value to readers."#;

/// True when the review approves and does not ask for revision.
pub fn is_approved(review: &str) -> bool {
    let upper = review.to_uppercase();
    upper.contains("APPROVED") && !upper.contains("REVISION NEEDED")
}

pub struct QualityReviewerAgent {
    core: AgentCore,
}

impl QualityReviewerAgent {
    pub fn new(skills: &BuiltinSkills, events: EventBus) -> Self {
        let core = AgentCore::new("quality_reviewer", "Performs final quality checks and approval", events)
            .with_skill(skills.llm_call.clone())
            .with_skill(skills.rag_query.clone())
            .with_capability(
                AgentCapability::new(
                    "quality_review",
                    "Review content quality",
                    &["quality", "final_review", "approve", "validate"],
                    &["llm_call", "rag_query"],
                )
                .with_priority(6),
            );
        Self { core }
    }
}

fn review_prompt(content: &str, knowledge: &str, min_score: u64) -> String {
    format!(
        r#"Do a complete quality review of the following content:

CONTENT:
{content}

VERIFICATION CONTEXT (from our knowledge base):
{knowledge}

Score the content on these criteria:

1. ACCURACY (25 points)
- Is mystical or spiritual information presented with respect and accuracy?
- Are the business concepts correct and applicable?
- Are there claims that need correcting?

2. CLARITY AND READABILITY (25 points)
- Is the text easy to understand?
- Is the structure logical and well organised?
- Are the transitions smooth?

3. ENGAGEMENT (25 points)
- Is the content interesting and engaging?
- Is the reader motivated to keep reading?

4. RELEVANCE AND VALUE (25 points)
- Does the content offer real value to the reader?
- Are the links between mysticism and management convincing?
- Does the reader leave with practical insights?

PROVIDE:

1. DETAILED SCORE
   - Accuracy: X/25
   - Clarity: X/25
   - Engagement: X/25
   - Value: X/25
   - TOTAL: X/100

2. STRENGTHS
   - List 3-5 positive aspects

3. AREAS FOR IMPROVEMENT
   - List the problems found (if any)
   - Suggest specific fixes

4. FINAL DECISION
   - APPROVED (if score >= {min_score})
   - REVISION NEEDED (if score < {min_score}, list what must change)

5. FURTHER FEEDBACK
   - General observations
   - Suggestions for related future content"#
    )
}

#[async_trait]
impl Agent for QualityReviewerAgent {
    fn core(&self) -> &AgentCore {
        &self.core
    }

    async fn execute_task(&self, task: &Task) -> Result<TaskResult, AgentError> {
        let seo = task.input("seo");
        let content = str_or(seo, "content", &task.description);
        let topic = str_field(seo, "topic");
        let min_score = task.input("min_quality_score").as_u64().unwrap_or(DEFAULT_MIN_SCORE);
        tracing::info!("[Agent:quality_reviewer] Reviewing '{}' (min score {})", topic, min_score);
        let mut ctx = self.core.context_for(task);

        let knowledge = self
            .core
            .execute_skill_in(
                "rag_query",
                &mut ctx,
                json!({ "query": topic, "collection": "knowledge", "n_results": 3 }),
            )
            .await?;
        let knowledge_context = optional_text(&knowledge);

        let review = self
            .core
            .execute_skill_in(
                "llm_call",
                &mut ctx,
                json!({
                    "prompt": review_prompt(content, &knowledge_context, min_score),
                    "system_prompt": SYSTEM_PROMPT,
                }),
            )
            .await?;
        let review = match final_text(task, &review) {
            Ok(text) => text,
            Err(failure) => return Ok(failure),
        };

        let approved = is_approved(&review);
        tracing::info!("[Agent:quality_reviewer] Approved: {}", approved);
        Ok(TaskResult::success(
            task.id(),
            json!({
                "review": review,
                "approved": approved,
                "content": content,
                "topic": topic,
            }),
        )
        .with_metadata("approved", json!(approved)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::testing::{fixture, text};
    use crate::models::metadata;

    #[test]
    fn test_approval_parsing() {
        assert!(is_approved("TOTAL: 88/100\nFinal decision: Approved"));
        assert!(!is_approved("Final decision: REVISION NEEDED, although parts are approved"));
        assert!(!is_approved("Score 60/100"));
    }

    #[tokio::test]
    async fn test_review_output_and_threshold() {
        let fx = fixture(vec![text("TOTAL: 90/100 APPROVED")], vec![text("facts")]);
        let agent = QualityReviewerAgent::new(&fx.skills, fx.events.clone());
        let mut task = Task::new("Review quality for: Moon", "quality").with_metadata(metadata(json!({
            "seo": { "content": "final text", "topic": "Moon" },
            "min_quality_score": 80,
        })));

        let result = agent.execute(&mut task).await.unwrap();
        assert!(result.success);
        assert_eq!(result.output["approved"], true);
        assert_eq!(result.output["content"], "final text");
        assert_eq!(result.metadata["approved"], true);
        assert_eq!(fx.rag.param(0, "collection"), "knowledge");
        assert!(fx.llm.param(0, "prompt").as_str().unwrap().contains("APPROVED (if score >= 80)"));
    }

    #[tokio::test]
    async fn test_knowledge_failure_is_tolerated() {
        let fx = fixture(vec![text("REVISION NEEDED")], vec![Err("store offline".into())]);
        let agent = QualityReviewerAgent::new(&fx.skills, fx.events.clone());
        let mut task = Task::new("content", "quality");

        let result = agent.execute(&mut task).await.unwrap();
        assert!(result.success);
        assert_eq!(result.output["approved"], false);
    }
}
