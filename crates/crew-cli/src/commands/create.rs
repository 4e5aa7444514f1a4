//! `crew create`: Run the content pipeline for one topic.

use std::path::{Path, PathBuf};

use crew_core::config::Settings;
use crew_core::models::{ContentResult, Metadata};
use crew_core::state::AppState;
use serde_json::json;

pub async fn run(
    state: &AppState,
    topic: &str,
    length: Option<u64>,
    output: Option<&str>,
    style_file: Option<&str>,
) -> Result<(), String> {
    let mut metadata = Metadata::new();
    if let Some(path) = style_file {
        let style = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read style file '{}': {}", path, e))?;
        metadata.insert("writing_style".to_string(), json!(style));
    }

    println!("Creating content about: {}", topic);
    let result = state
        .pipeline
        .create_content(topic, length, Some(metadata))
        .await
        .map_err(|e| format!("Content pipeline failed: {}", e))?;

    let path = output_path(&state.settings, &result, output);
    let saved = result
        .save(&path)
        .map_err(|e| format!("Failed to write '{}': {}", path.display(), e))?;

    println!();
    println!("  Words:    {}", result.word_count);
    println!("  Keywords: {}", result.keywords.join(", "));
    println!("  Approved: {}", if result.approved { "yes" } else { "no, revision needed" });
    println!("  Saved to: {}", saved.display());
    Ok(())
}

/// `--output` when given, else `<output_directory>/<slug>.md`.
pub fn output_path(settings: &Settings, result: &ContentResult, output: Option<&str>) -> PathBuf {
    match output {
        Some(path) => PathBuf::from(path),
        None => Path::new(&settings.content.output_directory).join(format!("{}.md", result.slug())),
    }
}
