use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Metadata;
use crate::error::TaskError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskPriority {
    Low = 1,
    #[default]
    Normal = 2,
    High = 3,
    Critical = 4,
}

/// A unit of work handed to an agent.
///
/// Status only moves `PENDING -> IN_PROGRESS -> COMPLETED | FAILED`; the
/// transition methods reject anything else.
#[derive(Debug, Clone, Serialize)]
pub struct Task {
    id: String,
    pub description: String,
    pub task_type: String,
    pub priority: TaskPriority,
    status: TaskStatus,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    completed_at: Option<DateTime<Utc>>,
    pub parent_task_id: Option<String>,
}

impl Task {
    pub fn new(description: impl Into<String>, task_type: impl Into<String>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            description: description.into(),
            task_type: task_type.into(),
            priority: TaskPriority::default(),
            status: TaskStatus::Pending,
            metadata: Metadata::new(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            parent_task_id: None,
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_parent(mut self, parent_task_id: impl Into<String>) -> Self {
        self.parent_task_id = Some(parent_task_id.into());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Look up a metadata value, `Value::Null` when absent.
    pub fn input(&self, key: &str) -> &Value {
        self.metadata.get(key).unwrap_or(&Value::Null)
    }

    pub fn start(&mut self) -> Result<(), TaskError> {
        self.transition(TaskStatus::InProgress)?;
        self.started_at = Some(Utc::now());
        Ok(())
    }

    pub fn finish(&mut self, success: bool) -> Result<(), TaskError> {
        let to = if success {
            TaskStatus::Completed
        } else {
            TaskStatus::Failed
        };
        self.transition(to)?;
        self.completed_at = Some(Utc::now());
        Ok(())
    }

    pub fn fail(&mut self) -> Result<(), TaskError> {
        self.finish(false)
    }

    fn transition(&mut self, to: TaskStatus) -> Result<(), TaskError> {
        let allowed = matches!(
            (self.status, to),
            (TaskStatus::Pending, TaskStatus::InProgress)
                | (TaskStatus::InProgress, TaskStatus::Completed)
                | (TaskStatus::InProgress, TaskStatus::Failed)
        );
        if !allowed {
            return Err(TaskError::InvalidTransition {
                task_id: self.id.clone(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// What an agent produced for a task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    pub task_id: String,
    pub success: bool,
    #[serde(default)]
    pub output: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Seconds.
    #[serde(default)]
    pub execution_time: f64,
    #[serde(default)]
    pub metadata: Metadata,
}

impl TaskResult {
    pub fn success(task_id: impl Into<String>, output: Value) -> Self {
        Self {
            task_id: task_id.into(),
            success: true,
            output,
            error: None,
            execution_time: 0.0,
            metadata: Metadata::new(),
        }
    }

    pub fn failure(task_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            task_id: task_id.into(),
            success: false,
            output: Value::Null,
            error: Some(error.into()),
            execution_time: 0.0,
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: Value) -> Self {
        self.metadata.insert(key.to_string(), value);
        self
    }
}

/// A declaration of which task types an agent can take on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentCapability {
    pub name: String,
    pub description: String,
    pub task_types: Vec<String>,
    #[serde(default)]
    pub required_skills: Vec<String>,
    #[serde(default)]
    pub priority: i32,
}

impl AgentCapability {
    pub fn new(name: &str, description: &str, task_types: &[&str], required_skills: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            task_types: task_types.iter().map(|t| t.to_string()).collect(),
            required_skills: required_skills.iter().map(|s| s.to_string()).collect(),
            priority: 0,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn handles(&self, task_type: &str) -> bool {
        self.task_types.iter().any(|t| t == task_type)
    }
}
