use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::Skill;
use crate::error::SkillError;
use crate::models::{ParamType, SkillContext, SkillParameter, SkillResult};
use crate::rag::retriever::DEFAULT_CONTEXT_LENGTH;
use crate::rag::{format_context, CollectionScope, RagService};

pub struct RagQuerySkill {
    rag: Arc<RagService>,
    parameters: Vec<SkillParameter>,
}

impl RagQuerySkill {
    pub fn new(rag: Arc<RagService>, default_n_results: usize) -> Self {
        Self {
            rag,
            parameters: vec![
                SkillParameter::required("query", ParamType::String, "The query to search for"),
                SkillParameter::optional(
                    "collection",
                    ParamType::String,
                    "Collection to search (style, knowledge, or both)",
                    Some(json!("both")),
                ),
                SkillParameter::optional(
                    "n_results",
                    ParamType::Integer,
                    "Number of results to return",
                    Some(json!(default_n_results)),
                ),
                SkillParameter::optional(
                    "format_as_context",
                    ParamType::Boolean,
                    "Whether to format results as context string",
                    Some(json!(true)),
                ),
            ],
        }
    }
}

#[async_trait]
impl Skill for RagQuerySkill {
    fn name(&self) -> &str {
        "rag_query"
    }

    fn description(&self) -> &str {
        "Query the knowledge base and style references"
    }

    fn category(&self) -> &str {
        "rag"
    }

    fn parameters(&self) -> &[SkillParameter] {
        &self.parameters
    }

    async fn run(&self, context: &mut SkillContext) -> Result<SkillResult, SkillError> {
        let query = context.str_param("query").unwrap_or_default();
        let collection = context.str_param("collection").unwrap_or("both");
        let n_results = context.u64_param("n_results").unwrap_or(5) as usize;

        let result = self
            .rag
            .query(query, CollectionScope::parse(collection), n_results)
            .await?;

        let output = if context.bool_param("format_as_context").unwrap_or(true) {
            Value::String(format_context(&result, DEFAULT_CONTEXT_LENGTH))
        } else {
            let documents: Vec<Value> = result
                .documents
                .iter()
                .map(|d| json!({ "content": d.content, "metadata": d.metadata }))
                .collect();
            json!({ "documents": documents, "scores": result.scores })
        };

        Ok(SkillResult::completed(self.name(), output)
            .with_metadata("query", json!(query))
            .with_metadata("collection", json!(collection))
            .with_metadata("results_count", json!(result.documents.len())))
    }
}
