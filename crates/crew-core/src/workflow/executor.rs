//! Content pipeline executor: runs the stages of [`STAGES`] in order.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::{json, Value};

use super::stages::{StageDef, STAGES};
use crate::config::ContentSettings;
use crate::error::PipelineError;
use crate::events::{Event, EventBus, EventType};
use crate::models::{ContentResult, Metadata, Task, TaskResult};
use crate::orchestration::Orchestrator;

const SOURCE: &str = "content_pipeline";

pub struct ContentPipeline {
    orchestrator: Arc<Orchestrator>,
    events: EventBus,
    settings: ContentSettings,
}

impl ContentPipeline {
    pub fn new(orchestrator: Arc<Orchestrator>, events: EventBus, settings: ContentSettings) -> Self {
        Self {
            orchestrator,
            events,
            settings,
        }
    }

    /// Run every stage for `topic` and assemble the final result.
    ///
    /// `metadata` is merged into every stage's task on top of `topic` and
    /// `target_length`, so it may override either.
    pub async fn create_content(
        &self,
        topic: &str,
        target_length: Option<u64>,
        metadata: Option<Metadata>,
    ) -> Result<ContentResult, PipelineError> {
        self.orchestrator.initialize().await;

        let pipeline_id = uuid::Uuid::new_v4().to_string();
        let target_length = target_length.unwrap_or(self.settings.default_target_length);
        tracing::info!(
            "[Pipeline] Starting {} for '{}' (~{} words)",
            pipeline_id,
            topic,
            target_length
        );
        self.publish(
            EventType::PipelineStarted,
            json!({ "pipeline_id": pipeline_id, "topic": topic }),
        )
        .await;

        let mut context = Metadata::new();
        context.insert("topic".to_string(), json!(topic));
        context.insert("target_length".to_string(), json!(target_length));
        context.extend(metadata.unwrap_or_default());

        match self.run_stages(topic, &context).await {
            Ok(outputs) => {
                let result = ContentResult::assemble(&pipeline_id, topic, &outputs);
                tracing::info!(
                    "[Pipeline] Completed {} (approved: {}, {} words)",
                    pipeline_id,
                    result.approved,
                    result.word_count
                );
                self.publish(
                    EventType::PipelineCompleted,
                    json!({ "pipeline_id": pipeline_id, "topic": topic, "approved": result.approved }),
                )
                .await;
                self.publish(
                    EventType::ContentCreated,
                    json!({ "pipeline_id": pipeline_id, "topic": topic, "word_count": result.word_count }),
                )
                .await;
                Ok(result)
            }
            Err(e) => {
                tracing::error!("[Pipeline] {} failed: {}", pipeline_id, e);
                self.publish(
                    EventType::PipelineFailed,
                    json!({ "pipeline_id": pipeline_id, "error": e.to_string() }),
                )
                .await;
                Err(e)
            }
        }
    }

    async fn run_stages(&self, topic: &str, context: &Metadata) -> Result<HashMap<String, Value>, PipelineError> {
        let mut outputs: HashMap<String, Value> = HashMap::new();
        for stage in &STAGES {
            let mut task = self.build_task(stage, topic, context, &outputs);
            let result = self.execute_stage(stage, &mut task).await?;
            outputs.insert(stage.output_key.to_string(), result.output);
        }
        Ok(outputs)
    }

    fn build_task(&self, stage: &StageDef, topic: &str, context: &Metadata, outputs: &HashMap<String, Value>) -> Task {
        let mut metadata = context.clone();
        for input in stage.inputs {
            let value = outputs.get(*input).cloned().unwrap_or(Value::Null);
            metadata.insert(input.to_string(), value);
        }
        if stage.agent == "quality_reviewer" {
            metadata.insert("min_quality_score".to_string(), json!(self.settings.min_quality_score));
        }
        Task::new(stage.task_description(topic), stage.task_type).with_metadata(metadata)
    }

    async fn execute_stage(&self, stage: &StageDef, task: &mut Task) -> Result<TaskResult, PipelineError> {
        tracing::info!("[Pipeline] Executing stage: {}", stage.agent);
        self.publish(
            EventType::PipelineStageStarted,
            json!({ "stage": stage.agent, "task_id": task.id() }),
        )
        .await;

        let result = self.orchestrator.execute_task(stage.agent, task).await?;

        self.publish(
            EventType::PipelineStageCompleted,
            json!({ "stage": stage.agent, "task_id": task.id(), "success": result.success }),
        )
        .await;

        if !result.success {
            return Err(PipelineError::StageFailed {
                stage: stage.agent.to_string(),
                reason: result.error.unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        Ok(result)
    }

    async fn publish(&self, event_type: EventType, data: Value) {
        self.events.publish(Event::new(event_type, SOURCE, data)).await;
    }
}
