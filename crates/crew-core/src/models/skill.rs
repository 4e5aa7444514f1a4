use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Metadata;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SkillStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Skipped,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Float,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }

    /// `Float` takes any JSON number, `Integer` only whole ones.
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Float => value.is_number(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    pub description: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl SkillParameter {
    pub fn required(name: &str, param_type: ParamType, description: &str) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            description: description.to_string(),
            required: true,
            default: None,
        }
    }

    pub fn optional(name: &str, param_type: ParamType, description: &str, default: Option<Value>) -> Self {
        Self {
            name: name.to_string(),
            param_type,
            description: description.to_string(),
            required: false,
            default,
        }
    }
}

/// Inputs for one skill run plus state shared by the skills of one agent run.
#[derive(Debug, Clone, Serialize)]
pub struct SkillContext {
    pub execution_id: String,
    pub params: Metadata,
    pub parent_task_id: Option<String>,
    pub agent_name: Option<String>,
    pub shared_state: Metadata,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

impl SkillContext {
    pub fn new(params: Metadata) -> Self {
        Self {
            execution_id: uuid::Uuid::new_v4().to_string(),
            params,
            parent_task_id: None,
            agent_name: None,
            shared_state: Metadata::new(),
            metadata: Metadata::new(),
            created_at: Utc::now(),
        }
    }

    pub fn for_agent(agent_name: &str, parent_task_id: Option<&str>) -> Self {
        let mut ctx = Self::new(Metadata::new());
        ctx.agent_name = Some(agent_name.to_string());
        ctx.parent_task_id = parent_task_id.map(str::to_string);
        ctx
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.params.get(key)
    }

    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.params.get(key).and_then(Value::as_str)
    }

    pub fn u64_param(&self, key: &str) -> Option<u64> {
        self.params.get(key).and_then(Value::as_u64)
    }

    pub fn f64_param(&self, key: &str) -> Option<f64> {
        self.params.get(key).and_then(Value::as_f64)
    }

    pub fn bool_param(&self, key: &str) -> Option<bool> {
        self.params.get(key).and_then(Value::as_bool)
    }

    pub fn set_shared(&mut self, key: &str, value: Value) {
        self.shared_state.insert(key.to_string(), value);
    }

    pub fn get_shared(&self, key: &str) -> Option<&Value> {
        self.shared_state.get(key)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillResult {
    pub skill_name: String,
    pub success: bool,
    pub status: SkillStatus,
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

impl SkillResult {
    pub fn completed(skill_name: &str, output: Value) -> Self {
        Self {
            skill_name: skill_name.to_string(),
            success: true,
            status: SkillStatus::Completed,
            output,
            error: None,
            execution_time: 0.0,
            metadata: Metadata::new(),
        }
    }

    pub fn failed(skill_name: &str, error: impl Into<String>) -> Self {
        Self {
            skill_name: skill_name.to_string(),
            success: false,
            status: SkillStatus::Failed,
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

    /// The output as text, for skills whose output is a plain string.
    pub fn text(&self) -> Option<&str> {
        if self.success {
            self.output.as_str()
        } else {
            None
        }
    }
}
