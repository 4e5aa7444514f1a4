use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const MAX_KEYWORDS: usize = 10;
const MAX_SLUG_LEN: usize = 50;

static NON_SLUG_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("valid slug regex"));
static SLUG_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s_]+").expect("valid slug regex"));

/// The final article assembled from the pipeline's stage outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentResult {
    pub pipeline_id: String,
    pub topic: String,
    pub content: String,
    pub keywords: Vec<String>,
    pub image_prompts: String,
    pub visual_suggestions: String,
    pub quality_review: String,
    pub approved: bool,
    pub word_count: usize,
    pub created_at: DateTime<Utc>,
}

impl ContentResult {
    /// Build the result from stage outputs keyed by `seo`, `quality`,
    /// `image_prompts` and `visual`. Missing fields become empty values.
    pub fn assemble(pipeline_id: &str, topic: &str, outputs: &HashMap<String, Value>) -> Self {
        let null = Value::Null;
        let get = |key: &str| outputs.get(key).unwrap_or(&null);
        let text = |value: &Value, field: &str| {
            value.get(field).and_then(Value::as_str).unwrap_or_default().to_string()
        };

        let seo = get("seo");
        let quality = get("quality");
        let content = text(seo, "content");

        let keywords = seo
            .pointer("/keywords/keywords")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|k| k.get("keyword").and_then(Value::as_str))
                    .take(MAX_KEYWORDS)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Self {
            pipeline_id: pipeline_id.to_string(),
            topic: topic.to_string(),
            word_count: content.split_whitespace().count(),
            content,
            keywords,
            image_prompts: text(get("image_prompts"), "prompts"),
            visual_suggestions: text(get("visual"), "suggestions"),
            quality_review: text(quality, "review"),
            approved: quality.get("approved").and_then(Value::as_bool).unwrap_or(false),
            created_at: Utc::now(),
        }
    }

    /// URL slug derived from the topic.
    pub fn slug(&self) -> String {
        let lowered = self.topic.to_lowercase();
        let stripped = NON_SLUG_CHARS.replace_all(&lowered, "");
        let dashed = SLUG_SEPARATORS.replace_all(&stripped, "-");
        dashed.chars().take(MAX_SLUG_LEN).collect()
    }

    pub fn to_markdown(&self) -> String {
        format!(
            "---\ntitle: \"{title}\"\nkeywords: {keywords:?}\ncreated_at: {created}\nword_count: {words}\napproved: {approved}\n---\n\n\
             {content}\n\n---\n\n## Image Prompts\n\n{prompts}\n\n---\n\n## Visual Suggestions\n\n{visuals}\n\n---\n\n## Quality Review\n\n{review}\n",
            title = self.topic,
            keywords = self.keywords,
            created = self.created_at.to_rfc3339(),
            words = self.word_count,
            approved = self.approved,
            content = self.content,
            prompts = self.image_prompts,
            visuals = self.visual_suggestions,
            review = self.quality_review,
        )
    }

    /// Write the markdown document to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> std::io::Result<PathBuf> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_markdown())?;
        Ok(path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn outputs() -> HashMap<String, Value> {
        let keywords: Vec<Value> = (0..12)
            .map(|i| json!({"keyword": format!("kw{i}"), "frequency": 12 - i, "type": "unigram"}))
            .collect();
        HashMap::from([
            (
                "seo".to_string(),
                json!({"content": "The moon guides   planning.\nSet goals.", "keywords": {"keywords": keywords}}),
            ),
            ("quality".to_string(), json!({"review": "APPROVED overall", "approved": true})),
            ("image_prompts".to_string(), json!({"prompts": "A full moon"})),
            ("visual".to_string(), json!({"suggestions": "Use a timeline"})),
        ])
    }

    #[test]
    fn test_assemble_maps_stage_outputs() {
        let result = ContentResult::assemble("p-1", "Lunar cycles", &outputs());
        assert_eq!(result.word_count, 6);
        assert!(result.approved);
        assert_eq!(result.keywords.len(), 10);
        assert_eq!(result.keywords[0], "kw0");
        assert_eq!(result.image_prompts, "A full moon");
        assert_eq!(result.visual_suggestions, "Use a timeline");
        assert_eq!(result.quality_review, "APPROVED overall");
    }

    #[test]
    fn test_assemble_tolerates_missing_outputs() {
        let result = ContentResult::assemble("p-2", "Empty", &HashMap::new());
        assert!(result.content.is_empty());
        assert_eq!(result.word_count, 0);
        assert!(!result.approved);
        assert!(result.keywords.is_empty());
    }

    #[test]
    fn test_slug() {
        let mut result = ContentResult::assemble("p", "Lunar Cycles & Goal_Setting!", &HashMap::new());
        assert_eq!(result.slug(), "lunar-cycles-goal-setting");

        result.topic = "a ".repeat(60);
        assert_eq!(result.slug().chars().count(), 50);
    }

    #[test]
    fn test_markdown_contains_sections() {
        let result = ContentResult::assemble("p", "Lunar cycles", &outputs());
        let md = result.to_markdown();
        assert!(md.starts_with("---\ntitle: \"Lunar cycles\""));
        assert!(md.contains("## Image Prompts\n\nA full moon"));
        assert!(md.contains("approved: true"));
    }
}
