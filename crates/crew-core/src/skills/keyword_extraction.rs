use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use serde_json::json;

use super::Skill;
use crate::error::SkillError;
use crate::models::{ParamType, SkillContext, SkillParameter, SkillResult};

static WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[a-záàâãéèêíïóôõöúçñ]+\b").expect("valid regex"));

/// Portuguese and English filler words.
const STOP_WORDS: &[&str] = &[
    "para", "como", "mais", "sobre", "isso", "esse", "essa", "este", "esta", "pelo", "pela", "pelos", "pelas",
    "outro", "outra", "outros", "outras", "todo", "toda", "todos", "todas", "muito", "muita", "muitos", "muitas",
    "pode", "podem", "fazer", "sendo", "sido", "seria", "mesmo", "mesma", "entre", "ainda", "depois", "antes",
    "quando", "onde", "qual", "quais", "cada", "deve", "apenas", "assim", "forma", "tipo", "tambem", "aqui",
    "that", "this", "with", "from", "have", "been", "were", "will", "would", "could", "should", "about", "which",
    "there", "their", "they", "what", "when", "where", "some", "many", "more", "most", "other", "than", "then",
    "also", "just", "only", "very", "such", "into", "over", "after", "before",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordKind {
    Unigram,
    Bigram,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Keyword {
    pub keyword: String,
    pub frequency: usize,
    #[serde(rename = "type")]
    pub kind: KeywordKind,
}

#[derive(Debug, Clone, Serialize)]
pub struct KeywordReport {
    pub keywords: Vec<Keyword>,
    pub total_words: usize,
    pub unique_words: usize,
}

/// Frequency-based keyword extraction over unigrams and bigrams.
///
/// Unigrams contribute up to `max_keywords` entries and bigrams up to half
/// that; the merged list is re-sorted by frequency and capped again. Equal
/// frequencies keep first-occurrence order.
pub fn extract_keywords(text: &str, max_keywords: usize, min_word_length: usize) -> KeywordReport {
    let lowered = text.to_lowercase();
    let words: Vec<&str> = WORD_RE
        .find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|w| w.chars().count() >= min_word_length && !STOP_WORDS.contains(w))
        .collect();

    let unigrams = most_common(words.iter().map(|w| w.to_string()), max_keywords);
    let bigrams = most_common(
        words.windows(2).map(|pair| format!("{} {}", pair[0], pair[1])),
        max_keywords / 2,
    );

    let mut keywords: Vec<Keyword> = unigrams
        .into_iter()
        .map(|(keyword, frequency)| Keyword { keyword, frequency, kind: KeywordKind::Unigram })
        .chain(
            bigrams
                .into_iter()
                .map(|(keyword, frequency)| Keyword { keyword, frequency, kind: KeywordKind::Bigram }),
        )
        .collect();
    keywords.sort_by(|a, b| b.frequency.cmp(&a.frequency));
    keywords.truncate(max_keywords);

    let unique_words = words.iter().collect::<HashSet<_>>().len();
    KeywordReport {
        keywords,
        total_words: words.len(),
        unique_words,
    }
}

fn most_common(items: impl Iterator<Item = String>, limit: usize) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    let mut order: Vec<String> = Vec::new();
    for item in items {
        let count = counts.entry(item.clone()).or_insert(0);
        if *count == 0 {
            order.push(item);
        }
        *count += 1;
    }
    let mut ranked: Vec<(String, usize)> = order
        .into_iter()
        .map(|item| {
            let count = counts.get(&item).copied().unwrap_or_default();
            (item, count)
        })
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1));
    ranked.truncate(limit);
    ranked
}

pub struct KeywordExtractionSkill {
    parameters: Vec<SkillParameter>,
}

impl KeywordExtractionSkill {
    pub fn new() -> Self {
        Self {
            parameters: vec![
                SkillParameter::required("text", ParamType::String, "Text to extract keywords from"),
                SkillParameter::optional(
                    "max_keywords",
                    ParamType::Integer,
                    "Maximum keywords to extract",
                    Some(json!(10)),
                ),
                SkillParameter::optional(
                    "min_word_length",
                    ParamType::Integer,
                    "Minimum word length",
                    Some(json!(4)),
                ),
            ],
        }
    }
}

impl Default for KeywordExtractionSkill {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Skill for KeywordExtractionSkill {
    fn name(&self) -> &str {
        "keyword_extraction"
    }

    fn description(&self) -> &str {
        "Extract keywords and key phrases from text"
    }

    fn category(&self) -> &str {
        "seo"
    }

    fn parameters(&self) -> &[SkillParameter] {
        &self.parameters
    }

    async fn run(&self, context: &mut SkillContext) -> Result<SkillResult, SkillError> {
        let text = context.str_param("text").unwrap_or_default();
        let max_keywords = context.u64_param("max_keywords").unwrap_or(10) as usize;
        let min_word_length = context.u64_param("min_word_length").unwrap_or(4) as usize;

        let report = extract_keywords(text, max_keywords, min_word_length);
        let extracted = report.keywords.len();
        let output = serde_json::to_value(&report).map_err(|e| SkillError::Logic(e.to_string()))?;

        Ok(SkillResult::completed(self.name(), output).with_metadata("extracted_count", json!(extracted)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::models::metadata;

    #[test]
    fn test_counts_and_ranks_unigrams() {
        let report = extract_keywords("Moon moon MOON cycle cycle goals", 10, 4);
        assert_eq!(report.total_words, 6);
        assert_eq!(report.unique_words, 3);
        assert_eq!(
            report.keywords[0],
            Keyword { keyword: "moon".into(), frequency: 3, kind: KeywordKind::Unigram }
        );
        assert_eq!(report.keywords[1].keyword, "cycle");
    }

    #[test]
    fn test_stop_words_and_short_words_are_dropped() {
        let report = extract_keywords("this moon is about the lunar phase", 10, 4);
        let words: Vec<&str> = report.keywords.iter().map(|k| k.keyword.as_str()).collect();
        assert!(!words.contains(&"this"));
        assert!(!words.contains(&"about"));
        assert!(!words.contains(&"the"));
        assert_eq!(report.total_words, 3);
    }

    #[test]
    fn test_bigrams_follow_filtered_sequence() {
        let report = extract_keywords("lunar cycle and lunar cycle", 10, 4);
        let bigram = report
            .keywords
            .iter()
            .find(|k| k.kind == KeywordKind::Bigram && k.keyword == "lunar cycle")
            .unwrap();
        assert_eq!(bigram.frequency, 2);
    }

    #[test]
    fn test_accented_words_are_kept_whole() {
        let report = extract_keywords("Meditação lunar meditação", 10, 4);
        assert_eq!(report.keywords[0].keyword, "meditação");
        assert_eq!(report.keywords[0].frequency, 2);
    }

    #[test]
    fn test_result_is_capped() {
        let report = extract_keywords("alpha bravo charlie delta echoes foxtrot", 3, 4);
        assert_eq!(report.keywords.len(), 3);
    }

    #[tokio::test]
    async fn test_skill_output_shape() {
        let skill = KeywordExtractionSkill::new();
        let mut ctx = SkillContext::new(metadata(json!({ "text": "lunar lunar goals" })));
        let result = skill.execute(&mut ctx, &EventBus::new()).await;

        assert!(result.success);
        assert_eq!(result.output["keywords"][0]["keyword"], "lunar");
        assert_eq!(result.output["keywords"][0]["type"], "unigram");
        assert_eq!(result.output["total_words"], 3);
        assert_eq!(result.metadata["extracted_count"], 4);
    }
}
