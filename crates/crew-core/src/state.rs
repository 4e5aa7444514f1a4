//! Composition root: builds every shared service once and wires them together.

use std::path::Path;
use std::sync::Arc;

use crate::agents::{register_builtin_agents, AgentRegistry};
use crate::config::Settings;
use crate::db::Database;
use crate::error::{BootstrapError, RagError};
use crate::events::EventBus;
use crate::llm::{build_generator, TextGenerator};
use crate::orchestration::Orchestrator;
use crate::rag::{EmbeddingService, OpenAiEmbeddings, RagService, SqliteVectorStore, VectorStore};
use crate::search::{DuckDuckGoSearch, WebSearch};
use crate::skills::{register_builtin_skills, SkillRegistry, SkillServices};
use crate::workflow::ContentPipeline;

/// External collaborators. Tests swap in stubs here.
#[derive(Clone)]
pub struct Providers {
    pub generator: Arc<dyn TextGenerator>,
    pub embeddings: Option<Arc<dyn EmbeddingService>>,
    pub store: Arc<dyn VectorStore>,
    pub search: Arc<dyn WebSearch>,
}

impl Providers {
    /// Real HTTP and SQLite providers. Relative store paths resolve
    /// against `base_dir`.
    pub fn from_settings(settings: &Settings, base_dir: &Path) -> Result<Self, BootstrapError> {
        let generator = build_generator(settings)?;
        let embeddings = OpenAiEmbeddings::from_settings(settings).map(|e| Arc::new(e) as Arc<dyn EmbeddingService>);
        let db = Database::open(&settings.vector_store_path(base_dir)).map_err(RagError::from)?;
        Ok(Self {
            generator,
            embeddings,
            store: Arc::new(SqliteVectorStore::new(db)),
            search: Arc::new(DuckDuckGoSearch::default()),
        })
    }
}

/// Shared state for one process.
pub struct AppStateInner {
    pub settings: Settings,
    pub events: EventBus,
    pub skills: Arc<SkillRegistry>,
    pub agents: Arc<AgentRegistry>,
    pub rag: Arc<RagService>,
    pub orchestrator: Arc<Orchestrator>,
    pub pipeline: ContentPipeline,
}

pub type AppState = Arc<AppStateInner>;

impl AppStateInner {
    pub fn new(settings: Settings, providers: Providers) -> Result<Self, BootstrapError> {
        let events = EventBus::new();

        let rag = Arc::new(RagService::new(
            providers.store,
            providers.embeddings,
            &settings.rag,
            events.clone(),
        )?);

        let skills = Arc::new(SkillRegistry::new("Skill"));
        let services = SkillServices {
            generator: providers.generator,
            rag: rag.clone(),
            search: providers.search,
        };
        register_builtin_skills(&skills, &services, &settings)?;

        let agents = Arc::new(AgentRegistry::new("Agent"));
        register_builtin_agents(&agents, &skills, &events)?;

        let orchestrator = Arc::new(Orchestrator::new(agents.clone()));
        let pipeline = ContentPipeline::new(orchestrator.clone(), events.clone(), settings.content.clone());

        tracing::info!(
            "[State] Ready ({} skills, {} agents, provider: {})",
            skills.len(),
            agents.len(),
            settings.llm.default_provider
        );
        Ok(Self {
            settings,
            events,
            skills,
            agents,
            rag,
            orchestrator,
            pipeline,
        })
    }
}
