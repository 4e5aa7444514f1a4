//! Orchestrator - holds the live agent instances and dispatches tasks to them.
//!
//! Agents are resolved from the agent registry on first use (or an explicit
//! [`Orchestrator::initialize`]). Tasks go either to a named agent or, via
//! [`Orchestrator::route_task`], to the best capable agent.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::RwLock;

use crate::agents::{Agent, AgentInfo, AgentRegistry};
use crate::error::PipelineError;
use crate::models::{Task, TaskResult};

#[derive(Default)]
struct OrchestratorState {
    initialized: bool,
    agents: Vec<Arc<dyn Agent>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorStatus {
    pub initialized: bool,
    pub agents: Vec<AgentInfo>,
}

pub struct Orchestrator {
    registry: Arc<AgentRegistry>,
    state: RwLock<OrchestratorState>,
}

impl Orchestrator {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self {
            registry,
            state: RwLock::new(OrchestratorState::default()),
        }
    }

    /// Instantiate every registered agent once. Later calls are no-ops.
    pub async fn initialize(&self) {
        let mut state = self.state.write().await;
        if state.initialized {
            return;
        }
        tracing::info!("[Orchestrator] Initializing");
        for name in self.registry.list_all() {
            if let Some(agent) = self.registry.get_instance(&name) {
                tracing::info!("[Orchestrator] Agent registered: {}", name);
                state.agents.push(agent);
            }
        }
        state.initialized = true;
        tracing::info!("[Orchestrator] Initialized with {} agents", state.agents.len());
    }

    pub async fn get_agent(&self, name: &str) -> Option<Arc<dyn Agent>> {
        self.initialize().await;
        let state = self.state.read().await;
        state.agents.iter().find(|a| a.name() == name).cloned()
    }

    pub async fn list_agents(&self) -> Vec<String> {
        self.initialize().await;
        let state = self.state.read().await;
        state.agents.iter().map(|a| a.name().to_string()).collect()
    }

    /// Run `task` on the named agent. Agent faults propagate.
    pub async fn execute_task(&self, agent_name: &str, task: &mut Task) -> Result<TaskResult, PipelineError> {
        let agent = self
            .get_agent(agent_name)
            .await
            .ok_or_else(|| PipelineError::AgentNotFound(agent_name.to_string()))?;
        Ok(agent.execute(task).await?)
    }

    /// Pick the capable agent whose matching capability has the highest
    /// priority; the first registered wins a tie.
    pub async fn route_task(&self, task: &mut Task) -> Result<TaskResult, PipelineError> {
        self.initialize().await;
        let chosen = {
            let state = self.state.read().await;
            let mut best: Option<(i32, Arc<dyn Agent>)> = None;
            for agent in &state.agents {
                let priority = agent
                    .capabilities()
                    .iter()
                    .filter(|c| c.handles(&task.task_type))
                    .map(|c| c.priority)
                    .max();
                if let Some(priority) = priority {
                    if best.as_ref().map_or(true, |(p, _)| priority > *p) {
                        best = Some((priority, agent.clone()));
                    }
                }
            }
            best.map(|(_, agent)| agent)
        };

        match chosen {
            Some(agent) => {
                tracing::info!("[Orchestrator] Routing '{}' task to {}", task.task_type, agent.name());
                Ok(agent.execute(task).await?)
            }
            None => {
                tracing::warn!("[Orchestrator] No agent for task type '{}'", task.task_type);
                Ok(TaskResult::failure(
                    task.id(),
                    format!("No agent found for task type: {}", task.task_type),
                ))
            }
        }
    }

    pub async fn status(&self) -> OrchestratorStatus {
        let state = self.state.read().await;
        OrchestratorStatus {
            initialized: state.initialized,
            agents: state.agents.iter().map(|a| a.describe()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::AgentCore;
    use crate::error::AgentError;
    use crate::events::EventBus;
    use crate::models::AgentCapability;
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoAgent {
        core: AgentCore,
    }

    impl EchoAgent {
        fn new(name: &str, task_types: &[&str], priority: i32) -> Self {
            Self {
                core: AgentCore::new(name, "Echoes", EventBus::new())
                    .with_capability(AgentCapability::new(name, "Echo", task_types, &[]).with_priority(priority)),
            }
        }
    }

    #[async_trait]
    impl Agent for EchoAgent {
        fn core(&self) -> &AgentCore {
            &self.core
        }

        async fn execute_task(&self, task: &Task) -> Result<TaskResult, AgentError> {
            Ok(TaskResult::success(task.id(), json!({ "agent": self.name() })))
        }
    }

    fn orchestrator(agents: &[(&'static str, &'static str, i32)]) -> Orchestrator {
        let registry = AgentRegistry::new("Agent");
        for &(name, task_type, priority) in agents {
            registry
                .register(name, "content", move || {
                    Arc::new(EchoAgent::new(name, &[task_type], priority)) as Arc<dyn Agent>
                })
                .unwrap();
        }
        Orchestrator::new(Arc::new(registry))
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let orch = orchestrator(&[("a", "x", 1), ("b", "y", 1)]);
        assert!(!orch.status().await.initialized);
        orch.initialize().await;
        orch.initialize().await;
        assert_eq!(orch.list_agents().await, vec!["a", "b"]);
        assert_eq!(orch.status().await.agents.len(), 2);
    }

    #[tokio::test]
    async fn test_execute_task_unknown_agent() {
        let orch = orchestrator(&[("a", "x", 1)]);
        let mut task = Task::new("t", "x");
        let err = orch.execute_task("ghost", &mut task).await.unwrap_err();
        assert!(matches!(err, PipelineError::AgentNotFound(name) if name == "ghost"));
    }

    #[tokio::test]
    async fn test_route_prefers_highest_priority_then_registration_order() {
        let orch = orchestrator(&[("low", "write", 1), ("high", "write", 9), ("also_high", "write", 9)]);
        let mut task = Task::new("t", "write");
        let result = orch.route_task(&mut task).await.unwrap();
        assert_eq!(result.output["agent"], "high");
    }

    #[tokio::test]
    async fn test_route_without_capable_agent() {
        let orch = orchestrator(&[("a", "x", 1)]);
        let mut task = Task::new("t", "translate");
        let result = orch.route_task(&mut task).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("No agent found for task type: translate"));
    }
}
