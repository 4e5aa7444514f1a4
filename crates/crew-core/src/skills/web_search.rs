use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::Skill;
use crate::config::SearchSettings;
use crate::error::SkillError;
use crate::models::{ParamType, SkillContext, SkillParameter, SkillResult};
use crate::search::{SearchHit, WebSearch};

pub struct WebSearchSkill {
    search: Arc<dyn WebSearch>,
    parameters: Vec<SkillParameter>,
}

impl WebSearchSkill {
    pub fn new(search: Arc<dyn WebSearch>, settings: &SearchSettings) -> Self {
        Self {
            search,
            parameters: vec![
                SkillParameter::required("query", ParamType::String, "The search query"),
                SkillParameter::optional(
                    "max_results",
                    ParamType::Integer,
                    "Maximum number of results",
                    Some(json!(settings.max_results)),
                ),
                SkillParameter::optional(
                    "region",
                    ParamType::String,
                    "Region for search results",
                    Some(json!(settings.region)),
                ),
            ],
        }
    }
}

/// `[i] title\nbody\nSource: href` blocks separated by blank lines.
pub fn summarize(hits: &[SearchHit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, h)| format!("[{}] {}\n{}\nSource: {}", i + 1, h.title, h.body, h.href))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[async_trait]
impl Skill for WebSearchSkill {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Search the web for information"
    }

    fn category(&self) -> &str {
        "search"
    }

    fn parameters(&self) -> &[SkillParameter] {
        &self.parameters
    }

    async fn run(&self, context: &mut SkillContext) -> Result<SkillResult, SkillError> {
        let query = context.str_param("query").unwrap_or_default();
        let max_results = context.u64_param("max_results").unwrap_or(5) as usize;
        let region = context.str_param("region").unwrap_or("wt-wt");

        let hits = self.search.search(query, max_results, region).await?;
        let summary = summarize(&hits);

        Ok(SkillResult::completed(
            self.name(),
            json!({ "results": hits, "summary": summary, "query": query }),
        )
        .with_metadata("results_count", json!(hits.len())))
    }
}
