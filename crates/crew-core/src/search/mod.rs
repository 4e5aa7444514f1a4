//! Web search provider used by the research agent.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SearchError;

pub const DUCKDUCKGO_API_URL: &str = "https://api.duckduckgo.com/";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchHit {
    pub title: String,
    pub body: String,
    pub href: String,
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str, max_results: usize, region: &str) -> Result<Vec<SearchHit>, SearchError>;
}

/// DuckDuckGo Instant Answer API. Needs no key.
pub struct DuckDuckGoSearch {
    client: reqwest::Client,
    endpoint: String,
}

impl Default for DuckDuckGoSearch {
    fn default() -> Self {
        Self::new(DUCKDUCKGO_API_URL)
    }
}

impl DuckDuckGoSearch {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(30))
                .user_agent("content-crew/0.1")
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            endpoint: endpoint.to_string(),
        }
    }
}

#[async_trait]
impl WebSearch for DuckDuckGoSearch {
    async fn search(&self, query: &str, max_results: usize, region: &str) -> Result<Vec<SearchHit>, SearchError> {
        tracing::info!("[Search] DuckDuckGo query: '{}' (region: {})", query, region);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
                ("kl", region),
            ])
            .send()
            .await
            .map_err(|e| SearchError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SearchError::Request(format!("DuckDuckGo returned {}", status)));
        }
        let json: Value = response
            .json()
            .await
            .map_err(|e| SearchError::Request(format!("Failed to parse response JSON: {}", e)))?;

        Ok(parse_instant_answer(&json, max_results))
    }
}

/// Flatten an Instant Answer payload into hits: the abstract first, then related topics.
pub fn parse_instant_answer(json: &Value, max_results: usize) -> Vec<SearchHit> {
    let mut hits = Vec::new();
    let text = |v: &Value, key: &str| v.get(key).and_then(Value::as_str).unwrap_or("").trim().to_string();

    let abstract_text = text(json, "AbstractText");
    if !abstract_text.is_empty() {
        hits.push(SearchHit {
            title: text(json, "Heading"),
            body: abstract_text,
            href: text(json, "AbstractURL"),
        });
    }

    let mut stack: Vec<&Value> = json
        .get("RelatedTopics")
        .and_then(Value::as_array)
        .map(|topics| topics.iter().rev().collect())
        .unwrap_or_default();

    while let Some(topic) = stack.pop() {
        if hits.len() >= max_results {
            break;
        }
        // Grouped topics nest their entries under "Topics".
        if let Some(nested) = topic.get("Topics").and_then(Value::as_array) {
            stack.extend(nested.iter().rev());
            continue;
        }
        let body = text(topic, "Text");
        if body.is_empty() {
            continue;
        }
        let title = body.split(" - ").next().unwrap_or(&body).to_string();
        hits.push(SearchHit {
            title,
            body,
            href: text(topic, "FirstURL"),
        });
    }

    hits.truncate(max_results);
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> Value {
        json!({
            "Heading": "Lunar phase",
            "AbstractText": "The lunar phase is the shape of the Moon's sunlit portion.",
            "AbstractURL": "https://en.wikipedia.org/wiki/Lunar_phase",
            "RelatedTopics": [
                {"Text": "New moon - The first lunar phase", "FirstURL": "https://duckduckgo.com/New_moon"},
                {"Name": "Culture", "Topics": [
                    {"Text": "Moon in astrology - Symbolism", "FirstURL": "https://duckduckgo.com/Astrology"}
                ]},
                {"Text": "Full moon - Opposite the sun", "FirstURL": "https://duckduckgo.com/Full_moon"}
            ]
        })
    }

    #[test]
    fn test_parse_instant_answer_orders_hits() {
        let hits = parse_instant_answer(&payload(), 10);
        let titles: Vec<_> = hits.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(titles, vec!["Lunar phase", "New moon", "Moon in astrology", "Full moon"]);
        assert_eq!(hits[1].href, "https://duckduckgo.com/New_moon");
    }

    #[test]
    fn test_parse_instant_answer_respects_limit() {
        assert_eq!(parse_instant_answer(&payload(), 2).len(), 2);
        assert!(parse_instant_answer(&json!({}), 5).is_empty());
    }
}
