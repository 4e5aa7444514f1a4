//! Content Crew Core: agents, skills and retrieval for automated content production.
//!
//! This crate holds the execution framework and every collaborator adapter.
//! It has **no CLI dependency** and can be embedded in:
//!
//! - the `crew` command-line tool (via `crew-cli`)
//! - tests driving the pipeline with stub providers
//! - any other host that builds an [`AppStateInner`]
//!
//! # Layers
//!
//! - [`registry`], [`events`]: catalogs and the lifecycle event bus
//! - [`skills`], [`agents`]: units of capability and the workers combining them
//! - [`rag`]: chunking, vector storage and retrieval
//! - [`orchestration`], [`workflow`]: task dispatch and the seven-stage pipeline

pub mod agents;
pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod llm;
pub mod models;
pub mod orchestration;
pub mod rag;
pub mod registry;
pub mod search;
pub mod skills;
pub mod state;
pub mod workflow;

// Convenience re-exports
pub use config::Settings;
pub use db::Database;
pub use events::EventBus;
pub use state::{AppState, AppStateInner, Providers};
pub use workflow::ContentPipeline;
