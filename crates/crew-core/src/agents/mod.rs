//! Agents: named workers that carry out one kind of task by combining skills.
//!
//! [`Agent::execute`] owns the task lifecycle. It moves the task to
//! `IN_PROGRESS`, runs the hooks around [`Agent::execute_task`], stamps the
//! timing and announces every transition on the event bus. Unlike skills, a
//! fault inside agent logic is raised to the caller as an
//! [`AgentExecutionError`].

pub mod editor;
pub mod image_prompt;
pub mod quality_reviewer;
pub mod research;
pub mod seo;
pub mod visual_suggestion;
pub mod writer;

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};

pub use editor::EditorAgent;
pub use image_prompt::ImagePromptAgent;
pub use quality_reviewer::QualityReviewerAgent;
pub use research::ResearchAgent;
pub use seo::SeoAgent;
pub use visual_suggestion::VisualSuggestionAgent;
pub use writer::WriterAgent;

use crate::error::{AgentError, AgentExecutionError, RegistryError};
use crate::events::{Event, EventBus, EventType};
use crate::models::{metadata, AgentCapability, SkillContext, SkillResult, Task, TaskResult};
use crate::registry::Registry;
use crate::skills::{Skill, SkillRegistry};

pub type AgentRegistry = Registry<dyn Agent>;

pub const DEFAULT_CATEGORY: &str = "content";

// ─── Agent core ─────────────────────────────────────────────────────────

/// State shared by every agent implementation: identity, skills,
/// capabilities and the bus lifecycle events go to.
pub struct AgentCore {
    name: String,
    description: String,
    category: String,
    skills: Vec<Arc<dyn Skill>>,
    capabilities: Vec<AgentCapability>,
    events: EventBus,
}

impl AgentCore {
    pub fn new(name: &str, description: &str, events: EventBus) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            category: DEFAULT_CATEGORY.to_string(),
            skills: Vec::new(),
            capabilities: Vec::new(),
            events,
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    pub fn with_skill(mut self, skill: Arc<dyn Skill>) -> Self {
        self.add_skill(skill);
        self
    }

    pub fn with_capability(mut self, capability: AgentCapability) -> Self {
        self.capabilities.push(capability);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn capabilities(&self) -> &[AgentCapability] {
        &self.capabilities
    }

    /// Adding a skill under a name already present replaces it.
    pub fn add_skill(&mut self, skill: Arc<dyn Skill>) {
        self.skills.retain(|s| s.name() != skill.name());
        self.skills.push(skill);
    }

    pub fn remove_skill(&mut self, name: &str) -> bool {
        let before = self.skills.len();
        self.skills.retain(|s| s.name() != name);
        self.skills.len() != before
    }

    pub fn has_skill(&self, name: &str) -> bool {
        self.skills.iter().any(|s| s.name() == name)
    }

    pub fn skill(&self, name: &str) -> Result<&Arc<dyn Skill>, AgentError> {
        self.skills
            .iter()
            .find(|s| s.name() == name)
            .ok_or_else(|| AgentError::SkillNotFound(name.to_string()))
    }

    pub fn skill_names(&self) -> Vec<String> {
        self.skills.iter().map(|s| s.name().to_string()).collect()
    }

    /// A context scoped to one task; skills run through it share state.
    pub fn context_for(&self, task: &Task) -> SkillContext {
        SkillContext::for_agent(&self.name, Some(task.id()))
    }

    /// Run a skill in a fresh context holding only `params`.
    pub async fn execute_skill(&self, name: &str, params: Value) -> Result<SkillResult, AgentError> {
        let mut context = SkillContext::for_agent(&self.name, None);
        self.execute_skill_in(name, &mut context, params).await
    }

    /// Run a skill inside an existing context. The params are replaced,
    /// the shared state carries over.
    pub async fn execute_skill_in(
        &self,
        name: &str,
        context: &mut SkillContext,
        params: Value,
    ) -> Result<SkillResult, AgentError> {
        let skill = self.skill(name)?;
        context.params = metadata(params);
        Ok(skill.execute(context, &self.events).await)
    }
}

// ─── Agent trait ────────────────────────────────────────────────────────

#[async_trait]
pub trait Agent: Send + Sync {
    fn core(&self) -> &AgentCore;

    fn name(&self) -> &str {
        self.core().name()
    }

    fn description(&self) -> &str {
        self.core().description()
    }

    fn category(&self) -> &str {
        self.core().category()
    }

    fn capabilities(&self) -> &[AgentCapability] {
        self.core().capabilities()
    }

    fn can_handle(&self, task: &Task) -> bool {
        self.capabilities().iter().any(|c| c.handles(&task.task_type))
    }

    async fn pre_execute(&self, _task: &Task) -> Result<(), AgentError> {
        Ok(())
    }

    /// Task-specific logic.
    async fn execute_task(&self, task: &Task) -> Result<TaskResult, AgentError>;

    async fn post_execute(&self, _task: &Task, _result: &TaskResult) -> Result<(), AgentError> {
        Ok(())
    }

    async fn execute(&self, task: &mut Task) -> Result<TaskResult, AgentExecutionError> {
        let name = self.name().to_string();
        let started = Instant::now();
        task.start()
            .map_err(|e| AgentExecutionError::new(&name, task.id(), e.to_string()))?;

        tracing::info!(
            "[Agent:{}] Started task {} (type: {})",
            name,
            task.id(),
            task.task_type
        );
        let events = self.core().events();
        events
            .publish(Event::new(EventType::AgentStarted, &name, json!({ "task": task.to_json() })))
            .await;

        let outcome = {
            let task: &Task = task;
            async move {
                self.pre_execute(task).await?;
                let result = self.execute_task(task).await?;
                self.post_execute(task, &result).await?;
                Ok::<_, AgentError>(result)
            }
            .await
        };

        match outcome {
            Ok(mut result) => {
                task.finish(result.success)
                    .map_err(|e| AgentExecutionError::new(&name, task.id(), e.to_string()))?;
                result.execution_time = started.elapsed().as_secs_f64();
                tracing::info!(
                    "[Agent:{}] Completed task {} (success: {}, {:.2}s)",
                    name,
                    task.id(),
                    result.success,
                    result.execution_time
                );
                events
                    .publish(Event::new(
                        EventType::AgentCompleted,
                        &name,
                        json!({
                            "task": task.to_json(),
                            "result": serde_json::to_value(&result).unwrap_or_default(),
                        }),
                    ))
                    .await;
                Ok(result)
            }
            Err(e) => {
                if let Err(transition) = task.fail() {
                    tracing::warn!("[Agent:{}] {}", name, transition);
                }
                let reason = e.to_string();
                let elapsed = started.elapsed().as_secs_f64();
                tracing::error!("[Agent:{}] Failed task {} after {:.2}s: {}", name, task.id(), elapsed, reason);
                events
                    .publish(Event::new(
                        EventType::AgentFailed,
                        &name,
                        json!({ "task": task.to_json(), "error": reason, "execution_time": elapsed }),
                    ))
                    .await;
                Err(AgentExecutionError::new(&name, task.id(), reason))
            }
        }
    }

    fn describe(&self) -> AgentInfo {
        let core = self.core();
        AgentInfo {
            name: core.name().to_string(),
            description: core.description().to_string(),
            category: core.category().to_string(),
            skills: core.skill_names(),
            capabilities: core.capabilities().to_vec(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentInfo {
    pub name: String,
    pub description: String,
    pub category: String,
    pub skills: Vec<String>,
    pub capabilities: Vec<AgentCapability>,
}

// ─── Shared helpers ─────────────────────────────────────────────────────

/// String field of a JSON object, or `""`.
pub(crate) fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or_default()
}

/// String field, or `fallback` when absent or empty.
pub(crate) fn str_or<'a>(value: &'a Value, key: &str, fallback: &'a str) -> &'a str {
    match value.get(key).and_then(Value::as_str) {
        Some(s) if !s.is_empty() => s,
        _ => fallback,
    }
}

/// Text output of a skill that may fail without failing the agent.
pub(crate) fn optional_text(result: &SkillResult) -> String {
    result.text().unwrap_or_default().to_string()
}

/// First `max_chars` characters of `text`.
pub(crate) fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub(crate) fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// The final `llm_call` of an agent: its failure fails the task.
pub(crate) fn final_text(task: &Task, result: &SkillResult) -> Result<String, TaskResult> {
    match result.text() {
        Some(text) => Ok(text.to_string()),
        None => Err(TaskResult::failure(
            task.id(),
            result.error.clone().unwrap_or_else(|| "LLM call returned no text".to_string()),
        )),
    }
}

// ─── Built-in agents ────────────────────────────────────────────────────

/// Skill instances the built-in agents are assembled from.
#[derive(Clone)]
pub struct BuiltinSkills {
    pub llm_call: Arc<dyn Skill>,
    pub rag_query: Arc<dyn Skill>,
    pub web_search: Arc<dyn Skill>,
    pub keyword_extraction: Arc<dyn Skill>,
}

impl BuiltinSkills {
    /// Resolve the shared instances from the skill registry.
    pub fn resolve(skills: &SkillRegistry) -> Result<Self, RegistryError> {
        Ok(Self {
            llm_call: skills.require_instance("llm_call")?,
            rag_query: skills.require_instance("rag_query")?,
            web_search: skills.require_instance("web_search")?,
            keyword_extraction: skills.require_instance("keyword_extraction")?,
        })
    }
}

pub fn register_builtin_agents(
    agents: &AgentRegistry,
    skills: &SkillRegistry,
    events: &EventBus,
) -> Result<(), RegistryError> {
    let builtin = BuiltinSkills::resolve(skills)?;

    macro_rules! register {
        ($name:expr, $agent:ident) => {{
            let skills = builtin.clone();
            let events = events.clone();
            agents.register($name, DEFAULT_CATEGORY, move || {
                Arc::new($agent::new(&skills, events.clone())) as Arc<dyn Agent>
            })?;
        }};
    }

    register!("research", ResearchAgent);
    register!("writer", WriterAgent);
    register!("editor", EditorAgent);
    register!("seo", SeoAgent);
    register!("quality_reviewer", QualityReviewerAgent);
    register!("image_prompt", ImagePromptAgent);
    register!("visual_suggestion", VisualSuggestionAgent);

    tracing::info!("[Agents] Registered {} built-in agents", agents.len());
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted skills for agent tests.

    use std::sync::Mutex;

    use super::*;
    use crate::error::SkillError;
    use crate::models::{Metadata, SkillParameter};
    use crate::skills::KeywordExtractionSkill;

    /// Answers under a fixed skill name with queued outputs, recording the
    /// params of every call. An exhausted queue yields a failure.
    pub struct ScriptedSkill {
        name: String,
        responses: Mutex<Vec<Result<Value, String>>>,
        pub calls: Mutex<Vec<Metadata>>,
    }

    impl ScriptedSkill {
        pub fn new(name: &str, responses: Vec<Result<Value, String>>) -> Arc<Self> {
            let mut responses = responses;
            responses.reverse();
            Arc::new(Self {
                name: name.to_string(),
                responses: Mutex::new(responses),
                calls: Mutex::new(Vec::new()),
            })
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn param(&self, call: usize, key: &str) -> Value {
            self.calls.lock().unwrap()[call].get(key).cloned().unwrap_or(Value::Null)
        }
    }

    #[async_trait]
    impl Skill for ScriptedSkill {
        fn name(&self) -> &str {
            &self.name
        }
        fn description(&self) -> &str {
            "Scripted"
        }
        fn category(&self) -> &str {
            "test"
        }
        fn parameters(&self) -> &[SkillParameter] {
            &[]
        }

        async fn run(&self, context: &mut SkillContext) -> Result<SkillResult, SkillError> {
            self.calls.lock().unwrap().push(context.params.clone());
            match self.responses.lock().unwrap().pop() {
                Some(Ok(output)) => Ok(SkillResult::completed(&self.name, output)),
                Some(Err(e)) => Err(SkillError::Logic(e)),
                None => Err(SkillError::Logic("no scripted response".into())),
            }
        }
    }

    pub struct Fixture {
        pub llm: Arc<ScriptedSkill>,
        pub rag: Arc<ScriptedSkill>,
        pub search: Arc<ScriptedSkill>,
        pub skills: BuiltinSkills,
        pub events: EventBus,
    }

    pub fn fixture(llm: Vec<Result<Value, String>>, rag: Vec<Result<Value, String>>) -> Fixture {
        let llm = ScriptedSkill::new("llm_call", llm);
        let rag = ScriptedSkill::new("rag_query", rag);
        let search = ScriptedSkill::new(
            "web_search",
            vec![Ok(json!({ "results": [{ "title": "t", "body": "b", "href": "h" }], "summary": "web summary" }))],
        );
        let skills = BuiltinSkills {
            llm_call: llm.clone(),
            rag_query: rag.clone(),
            web_search: search.clone(),
            keyword_extraction: Arc::new(KeywordExtractionSkill::new()),
        };
        Fixture {
            llm,
            rag,
            search,
            skills,
            events: EventBus::new(),
        }
    }

    pub fn text(s: &str) -> Result<Value, String> {
        Ok(Value::String(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    struct FaultyAgent {
        core: AgentCore,
        fail_with_result: bool,
    }

    #[async_trait]
    impl Agent for FaultyAgent {
        fn core(&self) -> &AgentCore {
            &self.core
        }

        async fn execute_task(&self, task: &Task) -> Result<TaskResult, AgentError> {
            if self.fail_with_result {
                return Ok(TaskResult::failure(task.id(), "not good enough"));
            }
            Err(AgentError::Logic("boom".into()))
        }
    }

    fn faulty(fail_with_result: bool, events: &EventBus) -> FaultyAgent {
        FaultyAgent {
            core: AgentCore::new("faulty", "Fails", events.clone())
                .with_capability(AgentCapability::new("fail", "Fails", &["fail"], &[])),
            fail_with_result,
        }
    }

    #[tokio::test]
    async fn test_logic_error_raises_and_marks_task_failed() {
        let events = EventBus::new();
        let agent = faulty(false, &events);
        let mut task = Task::new("anything", "fail");

        let err = agent.execute(&mut task).await.unwrap_err();
        assert_eq!(err.agent, "faulty");
        assert_eq!(err.task_id, task.id());
        assert_eq!(err.reason, "boom");
        assert_eq!(task.status(), crate::models::TaskStatus::Failed);
        assert!(task.completed_at().is_some());

        let history = events.get_history(None, 10).await;
        let types: Vec<EventType> = history.iter().map(|e| e.event_type).collect();
        assert_eq!(types, vec![EventType::AgentStarted, EventType::AgentFailed]);
    }

    #[tokio::test]
    async fn test_unsuccessful_result_is_returned_not_raised() {
        let events = EventBus::new();
        let agent = faulty(true, &events);
        let mut task = Task::new("anything", "fail");

        let result = agent.execute(&mut task).await.unwrap();
        assert!(!result.success);
        assert_eq!(task.status(), crate::models::TaskStatus::Failed);
        assert_eq!(events.get_history(Some(EventType::AgentCompleted), 10).await.len(), 1);
    }

    #[tokio::test]
    async fn test_task_cannot_be_executed_twice() {
        let events = EventBus::new();
        let agent = faulty(true, &events);
        let mut task = Task::new("anything", "fail");
        agent.execute(&mut task).await.unwrap();
        assert!(agent.execute(&mut task).await.is_err());
    }

    #[test]
    fn test_can_handle_matches_capability_task_types() {
        let agent = faulty(true, &EventBus::new());
        assert!(agent.can_handle(&Task::new("x", "fail")));
        assert!(!agent.can_handle(&Task::new("x", "write")));
    }

    #[tokio::test]
    async fn test_unknown_skill_is_an_agent_error() {
        let core = AgentCore::new("bare", "No skills", EventBus::new());
        let err = core.execute_skill("llm_call", json!({})).await.unwrap_err();
        assert!(matches!(err, AgentError::SkillNotFound(name) if name == "llm_call"));
    }

    #[tokio::test]
    async fn test_shared_state_survives_between_skills_in_one_context() {
        let fx = fixture(vec![text("a"), text("b")], vec![]);
        let core = AgentCore::new("writer", "w", fx.events.clone()).with_skill(fx.skills.llm_call.clone());
        let task = Task::new("x", "write");
        let mut ctx = core.context_for(&task);
        ctx.set_shared("outline", json!("kept"));

        core.execute_skill_in("llm_call", &mut ctx, json!({ "prompt": "one" })).await.unwrap();
        core.execute_skill_in("llm_call", &mut ctx, json!({ "prompt": "two" })).await.unwrap();

        assert_eq!(ctx.get_shared("outline"), Some(&json!("kept")));
        assert_eq!(ctx.parent_task_id.as_deref(), Some(task.id()));
        assert_eq!(fx.llm.param(1, "prompt"), "two");
    }

    #[test]
    fn test_add_skill_replaces_same_name() {
        let fx = fixture(vec![], vec![]);
        let mut core = AgentCore::new("a", "a", EventBus::new());
        core.add_skill(fx.skills.llm_call.clone());
        core.add_skill(fx.skills.llm_call.clone());
        assert_eq!(core.skill_names(), vec!["llm_call"]);
        assert!(core.remove_skill("llm_call"));
        assert!(!core.has_skill("llm_call"));
    }

    #[test]
    fn test_excerpt_respects_char_boundaries() {
        assert_eq!(excerpt("ação lunar", 3), "açã");
        assert_eq!(excerpt("short", 100), "short");
    }

    #[test]
    fn test_register_builtin_agents_requires_skills() {
        let agents = AgentRegistry::new("Agent");
        let skills = SkillRegistry::new("Skill");
        let err = register_builtin_agents(&agents, &skills, &EventBus::new()).unwrap_err();
        assert!(matches!(err, RegistryError::NotFound { .. }));
        assert!(agents.is_empty());
    }
}
