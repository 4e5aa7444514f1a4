//! Error types for the content crew core.
//!
//! Skills never raise to their callers: their failures travel inside a
//! `SkillResult`. Everything else propagates through the enums below.

use crate::models::task::TaskStatus;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("{registry} '{name}' is already registered")]
    Duplicate { registry: String, name: String },

    #[error("{registry} '{name}' not found in registry")]
    NotFound { registry: String, name: String },
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum TaskError {
    #[error("Task '{task_id}' cannot move from {from} to {to}")]
    InvalidTransition {
        task_id: String,
        from: TaskStatus,
        to: TaskStatus,
    },
}

/// Errors raised inside an agent's task logic.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Skill '{0}' not found in registry")]
    SkillNotFound(String),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error("{0}")]
    Logic(String),
}

/// The error an agent's lifecycle surfaces to the orchestrator.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Agent '{agent}' failed to execute task '{task_id}': {reason}")]
pub struct AgentExecutionError {
    pub agent: String,
    pub task_id: String,
    pub reason: String,
}

impl AgentExecutionError {
    pub fn new(agent: &str, task_id: &str, reason: impl Into<String>) -> Self {
        Self {
            agent: agent.to_string(),
            task_id: task_id.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SkillError {
    #[error("{0}")]
    Logic(String),

    #[error("{service} error: {reason}")]
    Service { service: String, reason: String },
}

impl SkillError {
    pub fn service(service: &str, reason: impl std::fmt::Display) -> Self {
        Self::Service {
            service: service.to_string(),
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("{provider} API error: {reason}")]
    Api { provider: String, reason: String },

    #[error("LLM configuration error: {0}")]
    Config(String),
}

impl From<LlmError> for SkillError {
    fn from(e: LlmError) -> Self {
        SkillError::service("llm", e)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Database error: {0}")]
pub struct DatabaseError(pub String);

#[derive(Debug, thiserror::Error)]
pub enum RagError {
    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store {operation} failed: {reason}")]
    VectorStore { operation: String, reason: String },

    #[error("Failed to process document '{document}': {reason}")]
    Document { document: String, reason: String },

    #[error("Invalid chunking configuration: {0}")]
    InvalidChunking(String),
}

impl RagError {
    pub fn store(operation: &str, reason: impl std::fmt::Display) -> Self {
        Self::VectorStore {
            operation: operation.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn document(document: impl std::fmt::Display, reason: impl std::fmt::Display) -> Self {
        Self::Document {
            document: document.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl From<DatabaseError> for RagError {
    fn from(e: DatabaseError) -> Self {
        RagError::store("database", e.0)
    }
}

impl From<RagError> for SkillError {
    fn from(e: RagError) -> Self {
        SkillError::service("rag", e)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Search request failed: {0}")]
    Request(String),
}

impl From<SearchError> for SkillError {
    fn from(e: SearchError) -> Self {
        SkillError::service("search", e)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Agent '{0}' not found")]
    AgentNotFound(String),

    #[error("Stage '{stage}' failed: {reason}")]
    StageFailed { stage: String, reason: String },

    #[error(transparent)]
    Agent(#[from] AgentExecutionError),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {reason}")]
    Read { path: String, reason: String },

    #[error("Failed to parse config '{path}': {reason}")]
    Parse { path: String, reason: String },
}

/// Failures while wiring the application together.
#[derive(Debug, thiserror::Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Rag(#[from] RagError),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}
