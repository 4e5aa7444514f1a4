//! HTTP clients for the Anthropic Messages API and OpenAI-compatible chat completions.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::{GenerationRequest, TextGenerator};
use crate::config::LlmSettings;
use crate::error::LlmError;

pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

fn number(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or_else(|| Value::from(0))
}

/// Send a JSON body and return the decoded response, mapping non-2xx to `Api`.
async fn send_json(
    provider: &str,
    request: reqwest::RequestBuilder,
    body: &Value,
) -> Result<Value, LlmError> {
    let api_error = |reason: String| LlmError::Api {
        provider: provider.to_string(),
        reason,
    };

    let response = request
        .header("content-type", "application/json")
        .json(body)
        .send()
        .await
        .map_err(|e| api_error(format!("HTTP request failed: {}", e)))?;

    let status = response.status();
    let response_text = response
        .text()
        .await
        .map_err(|e| api_error(format!("Failed to read response body: {}", e)))?;

    if !status.is_success() {
        return Err(api_error(format!("API returned {}: {}", status, response_text)));
    }

    serde_json::from_str(&response_text)
        .map_err(|e| api_error(format!("Failed to parse response JSON: {}", e)))
}

// ─── Anthropic ──────────────────────────────────────────────────────────

/// POST {base_url}/v1/messages
pub struct AnthropicClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
}

impl AnthropicClient {
    pub fn new(base_url: &str, api_key: &str, settings: &LlmSettings) -> Self {
        Self {
            client: http_client(settings.request_timeout_secs),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: settings.anthropic_model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        }
    }

    fn body(&self, request: &GenerationRequest) -> Value {
        let mut body = json!({
            "model": self.model,
            "max_tokens": request.max_tokens.unwrap_or(self.max_tokens),
            "temperature": number(request.temperature.unwrap_or(self.temperature)),
            "messages": [{ "role": "user", "content": request.prompt }],
        });
        if let Some(system) = request.system_prompt.as_deref().filter(|s| !s.is_empty()) {
            body["system"] = Value::String(system.to_string());
        }
        body
    }
}

/// Join the text blocks of a Messages API response.
pub(crate) fn extract_anthropic_text(json: &Value) -> String {
    json.get("content")
        .and_then(|c| c.as_array())
        .and_then(|arr| {
            arr.iter()
                .filter(|block| block.get("type").and_then(|t| t.as_str()) == Some("text"))
                .filter_map(|block| block.get("text").and_then(|t| t.as_str()))
                .map(str::to_string)
                .reduce(|a, b| format!("{}\n{}", a, b))
        })
        .unwrap_or_default()
}

#[async_trait]
impl TextGenerator for AnthropicClient {
    fn provider(&self) -> &str {
        "anthropic"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let url = format!("{}/v1/messages", self.base_url);
        tracing::info!("[LLM] Calling Anthropic API: {} (model: {})", url, self.model);

        let http = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01");
        let json = send_json(self.provider(), http, &self.body(request)).await?;

        if let Some(usage) = json.get("usage") {
            tracing::debug!(
                "[LLM] Anthropic usage: input={:?} output={:?}",
                usage.get("input_tokens").and_then(|v| v.as_u64()),
                usage.get("output_tokens").and_then(|v| v.as_u64())
            );
        }
        Ok(extract_anthropic_text(&json))
    }
}

// ─── OpenAI ─────────────────────────────────────────────────────────────

/// POST {base_url}/chat/completions
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f64,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: &str, settings: &LlmSettings) -> Self {
        Self {
            client: http_client(settings.request_timeout_secs),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: settings.openai_model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        }
    }

    fn body(&self, request: &GenerationRequest) -> Value {
        let mut messages = Vec::new();
        if let Some(system) = request.system_prompt.as_deref().filter(|s| !s.is_empty()) {
            messages.push(json!({ "role": "system", "content": system }));
        }
        messages.push(json!({ "role": "user", "content": request.prompt }));

        json!({
            "model": self.model,
            "messages": messages,
            "max_tokens": request.max_tokens.unwrap_or(self.max_tokens),
            "temperature": number(request.temperature.unwrap_or(self.temperature)),
        })
    }
}

pub(crate) fn extract_openai_text(json: &Value) -> String {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|msg| msg.get("content"))
        .and_then(|c| c.as_str())
        .unwrap_or("")
        .to_string()
}

#[async_trait]
impl TextGenerator for OpenAiClient {
    fn provider(&self) -> &str {
        "openai"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        tracing::info!("[LLM] Calling OpenAI API: {} (model: {})", url, self.model);

        let http = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key));
        let json = send_json(self.provider(), http, &self.body(request)).await?;

        if let Some(usage) = json.get("usage") {
            tracing::debug!(
                "[LLM] OpenAI usage: prompt={:?} completion={:?}",
                usage.get("prompt_tokens").and_then(|v| v.as_u64()),
                usage.get("completion_tokens").and_then(|v| v.as_u64())
            );
        }
        Ok(extract_openai_text(&json))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_anthropic_text_joins_text_blocks() {
        let json = json!({
            "content": [
                {"type": "text", "text": "First"},
                {"type": "tool_use", "id": "x"},
                {"type": "text", "text": "Second"}
            ]
        });
        assert_eq!(extract_anthropic_text(&json), "First\nSecond");
        assert_eq!(extract_anthropic_text(&json!({})), "");
    }

    #[test]
    fn test_extract_openai_text() {
        let json = json!({"choices": [{"message": {"role": "assistant", "content": "Hello"}}]});
        assert_eq!(extract_openai_text(&json), "Hello");
        assert_eq!(extract_openai_text(&json!({"choices": []})), "");
    }

    #[test]
    fn test_anthropic_body_uses_request_overrides() {
        let client = AnthropicClient::new("https://example.test/", "k", &LlmSettings::default());
        let mut request = GenerationRequest::new("Hi").with_system("Be brief");
        request.max_tokens = Some(100);
        request.temperature = Some(0.5);

        let body = client.body(&request);
        assert_eq!(body["max_tokens"], 100);
        assert_eq!(body["temperature"], 0.5);
        assert_eq!(body["system"], "Be brief");
        assert_eq!(body["messages"][0]["content"], "Hi");
        assert_eq!(client.base_url, "https://example.test");
    }

    #[test]
    fn test_openai_body_puts_system_first() {
        let client = OpenAiClient::new(OPENAI_BASE_URL, "k", &LlmSettings::default());
        let body = client.body(&GenerationRequest::new("Hi").with_system("sys"));
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["model"], "gpt-4o");
    }
}
