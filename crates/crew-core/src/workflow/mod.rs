//! Content workflow: the fixed seven-stage pipeline.
//!
//! ```text
//! topic ──► research ──► writer ──► editor ──► seo ──► quality_reviewer
//!                                                          │
//!                         visual_suggestion ◄── image_prompt
//!                                │
//!                          ContentResult
//! ```
//!
//! Each stage is one agent task. Its output lands in the next task's
//! metadata under the stage's output key; the first unsuccessful stage
//! aborts the run.

pub mod executor;
pub mod stages;

pub use executor::ContentPipeline;
pub use stages::{StageDef, STAGES};
