//! Event Bus - publish/subscribe notifications for agents, skills and the pipeline.
//!
//! Handlers are called one after another in descending priority order;
//! equal priorities run in registration order, wildcard handlers included.
//! A failing handler is logged and never stops delivery to the rest.

use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

pub const DEFAULT_MAX_HISTORY: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    AgentStarted,
    AgentCompleted,
    AgentFailed,
    SkillStarted,
    SkillCompleted,
    SkillFailed,
    PipelineStarted,
    PipelineStageStarted,
    PipelineStageCompleted,
    PipelineCompleted,
    PipelineFailed,
    RagIngestionStarted,
    RagIngestionCompleted,
    RagQueryStarted,
    RagQueryCompleted,
    ContentCreated,
    Custom,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AgentStarted => "AGENT_STARTED",
            Self::AgentCompleted => "AGENT_COMPLETED",
            Self::AgentFailed => "AGENT_FAILED",
            Self::SkillStarted => "SKILL_STARTED",
            Self::SkillCompleted => "SKILL_COMPLETED",
            Self::SkillFailed => "SKILL_FAILED",
            Self::PipelineStarted => "PIPELINE_STARTED",
            Self::PipelineStageStarted => "PIPELINE_STAGE_STARTED",
            Self::PipelineStageCompleted => "PIPELINE_STAGE_COMPLETED",
            Self::PipelineCompleted => "PIPELINE_COMPLETED",
            Self::PipelineFailed => "PIPELINE_FAILED",
            Self::RagIngestionStarted => "RAG_INGESTION_STARTED",
            Self::RagIngestionCompleted => "RAG_INGESTION_COMPLETED",
            Self::RagQueryStarted => "RAG_QUERY_STARTED",
            Self::RagQueryCompleted => "RAG_QUERY_COMPLETED",
            Self::ContentCreated => "CONTENT_CREATED",
            Self::Custom => "CUSTOM",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "AGENT_STARTED" => Some(Self::AgentStarted),
            "AGENT_COMPLETED" => Some(Self::AgentCompleted),
            "AGENT_FAILED" => Some(Self::AgentFailed),
            "SKILL_STARTED" => Some(Self::SkillStarted),
            "SKILL_COMPLETED" => Some(Self::SkillCompleted),
            "SKILL_FAILED" => Some(Self::SkillFailed),
            "PIPELINE_STARTED" => Some(Self::PipelineStarted),
            "PIPELINE_STAGE_STARTED" => Some(Self::PipelineStageStarted),
            "PIPELINE_STAGE_COMPLETED" => Some(Self::PipelineStageCompleted),
            "PIPELINE_COMPLETED" => Some(Self::PipelineCompleted),
            "PIPELINE_FAILED" => Some(Self::PipelineFailed),
            "RAG_INGESTION_STARTED" => Some(Self::RagIngestionStarted),
            "RAG_INGESTION_COMPLETED" => Some(Self::RagIngestionCompleted),
            "RAG_QUERY_STARTED" => Some(Self::RagQueryStarted),
            "RAG_QUERY_COMPLETED" => Some(Self::RagQueryCompleted),
            "CONTENT_CREATED" => Some(Self::ContentCreated),
            "CUSTOM" => Some(Self::Custom),
            _ => None,
        }
    }
}

/// Something that happened, with free-form payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub source: String,
    pub data: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

impl Event {
    pub fn new(event_type: EventType, source: &str, data: serde_json::Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event_type,
            source: source.to_string(),
            data,
            timestamp: Utc::now(),
        }
    }
}

/// Which events a subscription receives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventPattern {
    Any,
    Exact(EventType),
}

impl EventPattern {
    pub fn matches(&self, event_type: EventType) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(t) => *t == event_type,
        }
    }
}

impl From<EventType> for EventPattern {
    fn from(t: EventType) -> Self {
        Self::Exact(t)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

pub type HandlerResult = Result<(), String>;
pub type HandlerFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send>>;

#[derive(Clone)]
enum Handler {
    Sync(Arc<dyn Fn(&Event) -> HandlerResult + Send + Sync>),
    Async(Arc<dyn Fn(Event) -> HandlerFuture + Send + Sync>),
}

struct Subscription {
    id: SubscriptionId,
    pattern: EventPattern,
    priority: i32,
    handler: Handler,
}

struct EventBusInner {
    /// Kept in registration order.
    subscriptions: Vec<Subscription>,
    history: VecDeque<Event>,
    next_id: u64,
}

/// Thread-safe event bus shared by every component of one application.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<RwLock<EventBusInner>>,
    max_history: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_max_history(DEFAULT_MAX_HISTORY)
    }

    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(EventBusInner {
                subscriptions: Vec::new(),
                history: VecDeque::new(),
                next_id: 0,
            })),
            max_history,
        }
    }

    // ─── Subscriptions ──────────────────────────────────────────────────

    /// Subscribe a synchronous handler.
    pub async fn subscribe<F>(&self, pattern: impl Into<EventPattern>, priority: i32, handler: F) -> SubscriptionId
    where
        F: Fn(&Event) -> HandlerResult + Send + Sync + 'static,
    {
        self.insert(pattern.into(), priority, Handler::Sync(Arc::new(handler)))
            .await
    }

    /// Subscribe an asynchronous handler. It is awaited before the next one runs.
    pub async fn subscribe_async<F, Fut>(
        &self,
        pattern: impl Into<EventPattern>,
        priority: i32,
        handler: F,
    ) -> SubscriptionId
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let boxed: Arc<dyn Fn(Event) -> HandlerFuture + Send + Sync> =
            Arc::new(move |event| Box::pin(handler(event)) as HandlerFuture);
        self.insert(pattern.into(), priority, Handler::Async(boxed)).await
    }

    async fn insert(&self, pattern: EventPattern, priority: i32, handler: Handler) -> SubscriptionId {
        let mut inner = self.inner.write().await;
        let id = SubscriptionId(inner.next_id);
        inner.next_id += 1;
        inner.subscriptions.push(Subscription {
            id,
            pattern,
            priority,
            handler,
        });
        id
    }

    pub async fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut inner = self.inner.write().await;
        let before = inner.subscriptions.len();
        inner.subscriptions.retain(|s| s.id != id);
        inner.subscriptions.len() != before
    }

    pub async fn subscription_count(&self) -> usize {
        self.inner.read().await.subscriptions.len()
    }

    /// Log every event at debug level, after all other handlers.
    pub async fn attach_logging_observer(&self) -> SubscriptionId {
        self.subscribe(EventPattern::Any, i32::MIN, |event| {
            tracing::debug!(
                "[EventBus] {} from '{}': {}",
                event.event_type.as_str(),
                event.source,
                event.data
            );
            Ok(())
        })
        .await
    }

    // ─── Publish ────────────────────────────────────────────────────────

    /// Record the event in history and deliver it to matching handlers.
    pub async fn publish(&self, event: Event) {
        let handlers: Vec<Handler> = {
            let mut inner = self.inner.write().await;
            inner.history.push_back(event.clone());
            while inner.history.len() > self.max_history {
                inner.history.pop_front();
            }

            let mut matching: Vec<(i32, Handler)> = inner
                .subscriptions
                .iter()
                .filter(|s| s.pattern.matches(event.event_type))
                .map(|s| (s.priority, s.handler.clone()))
                .collect();
            // Stable: equal priorities keep registration order.
            matching.sort_by(|a, b| b.0.cmp(&a.0));
            matching.into_iter().map(|(_, h)| h).collect()
        };

        for handler in handlers {
            let outcome = match handler {
                Handler::Sync(f) => f(&event),
                Handler::Async(f) => f(event.clone()).await,
            };
            if let Err(e) = outcome {
                tracing::warn!(
                    "[EventBus] Handler for {} failed: {}",
                    event.event_type.as_str(),
                    e
                );
            }
        }
    }

    // ─── History ────────────────────────────────────────────────────────

    /// Most recent events (oldest first), optionally filtered by type.
    pub async fn get_history(&self, filter: Option<EventType>, limit: usize) -> Vec<Event> {
        let inner = self.inner.read().await;
        let matching: Vec<&Event> = inner
            .history
            .iter()
            .filter(|e| filter.map_or(true, |t| e.event_type == t))
            .collect();
        let skip = matching.len().saturating_sub(limit);
        matching.into_iter().skip(skip).cloned().collect()
    }

    pub async fn clear_history(&self) {
        self.inner.write().await.history.clear();
    }
}
