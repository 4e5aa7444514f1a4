//! Application settings.
//!
//! Loaded from `<config_dir>/settings.yaml`, with the `rag:` section of an
//! optional `<config_dir>/rag_config.yaml` taking precedence. `${VAR}` and
//! `${VAR:-default}` references are expanded before parsing, and a few
//! environment variables override the file values:
//!
//! - `ANTHROPIC_API_KEY`, `OPENAI_API_KEY`: provider credentials (env only)
//! - `CREW_LLM_PROVIDER`, `CREW_LLM_BASE_URL`: LLM provider selection
//! - `LOG_LEVEL`, `DEBUG`

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

pub const SETTINGS_FILE: &str = "settings.yaml";
pub const RAG_CONFIG_FILE: &str = "rag_config.yaml";

static ENV_REF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env reference regex"));

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    pub default_provider: String,
    pub anthropic_model: String,
    pub openai_model: String,
    /// Overrides the provider's public endpoint.
    pub base_url: Option<String>,
    pub max_tokens: u32,
    pub temperature: f64,
    pub request_timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            default_provider: "anthropic".to_string(),
            anthropic_model: "claude-sonnet-4-20250514".to_string(),
            openai_model: "gpt-4o".to_string(),
            base_url: None,
            max_tokens: 4096,
            temperature: 0.7,
            request_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    pub embedding_provider: String,
    pub embedding_model: String,
    pub vector_store_path: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub default_n_results: usize,
    pub style_collection: String,
    pub knowledge_collection: String,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            embedding_provider: "openai".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            vector_store_path: "data/vector_store.db".to_string(),
            chunk_size: 500,
            chunk_overlap: 50,
            default_n_results: 5,
            style_collection: "style_reference".to_string(),
            knowledge_collection: "knowledge_base".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentSettings {
    pub default_target_length: u64,
    pub min_quality_score: u64,
    pub output_directory: String,
}

impl Default for ContentSettings {
    fn default() -> Self {
        Self {
            default_target_length: 1500,
            min_quality_score: 75,
            output_directory: "output/articles".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub region: String,
    pub max_results: usize,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            region: "wt-wt".to_string(),
            max_results: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub debug: bool,
    pub log_level: String,
    pub llm: LlmSettings,
    pub rag: RagSettings,
    pub content: ContentSettings,
    pub search: SearchSettings,
    #[serde(skip)]
    pub anthropic_api_key: Option<String>,
    #[serde(skip)]
    pub openai_api_key: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: "INFO".to_string(),
            llm: LlmSettings::default(),
            rag: RagSettings::default(),
            content: ContentSettings::default(),
            search: SearchSettings::default(),
            anthropic_api_key: None,
            openai_api_key: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RagConfigFile {
    #[serde(default)]
    rag: Option<RagSettings>,
}

impl Settings {
    /// Load settings from a config directory. Missing files fall back to defaults.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let mut settings = match read_optional(&config_dir.join(SETTINGS_FILE))? {
            Some((path, yaml)) => Self::from_yaml(&yaml).map_err(|e| ConfigError::Parse {
                path,
                reason: e.to_string(),
            })?,
            None => Self::default(),
        };

        if let Some((path, yaml)) = read_optional(&config_dir.join(RAG_CONFIG_FILE))? {
            let file: RagConfigFile =
                serde_yaml::from_str(&resolve_env_vars(&yaml)).map_err(|e| ConfigError::Parse {
                    path,
                    reason: e.to_string(),
                })?;
            if let Some(rag) = file.rag {
                settings.rag = rag;
            }
        }

        settings.apply_env();
        tracing::info!("[Config] Loaded settings from '{}'", config_dir.display());
        Ok(settings)
    }

    /// Parse a settings document after expanding environment references.
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_yaml::Error> {
        let expanded = resolve_env_vars(yaml);
        if expanded.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&expanded)
    }

    /// Apply environment overrides on top of file values.
    pub fn apply_env(&mut self) {
        self.anthropic_api_key = non_empty_env("ANTHROPIC_API_KEY").or(self.anthropic_api_key.take());
        self.openai_api_key = non_empty_env("OPENAI_API_KEY").or(self.openai_api_key.take());
        if let Some(provider) = non_empty_env("CREW_LLM_PROVIDER") {
            self.llm.default_provider = provider;
        }
        if let Some(base_url) = non_empty_env("CREW_LLM_BASE_URL") {
            self.llm.base_url = Some(base_url);
        }
        if let Some(level) = non_empty_env("LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(debug) = non_empty_env("DEBUG") {
            self.debug = matches!(debug.to_lowercase().as_str(), "1" | "true" | "yes");
        }
    }

    /// The vector store path, resolved against `base` when relative.
    pub fn vector_store_path(&self, base: &Path) -> PathBuf {
        let path = Path::new(&self.rag.vector_store_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base.join(path)
        }
    }
}

/// `None` when the file does not exist.
fn read_optional(path: &Path) -> Result<Option<(String, String)>, ConfigError> {
    if !path.is_file() {
        return Ok(None);
    }
    let display = path.display().to_string();
    std::fs::read_to_string(path)
        .map(|content| Some((display.clone(), content)))
        .map_err(|e| ConfigError::Read {
            path: display,
            reason: e.to_string(),
        })
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Resolve environment variable references in a string.
/// Supports `${ENV_VAR}` and `${ENV_VAR:-default}` syntax.
pub fn resolve_env_vars(input: &str) -> String {
    ENV_REF
        .replace_all(input, |caps: &regex::Captures| {
            let var_expr = &caps[1];
            if let Some(idx) = var_expr.find(":-") {
                let var_name = &var_expr[..idx];
                let default_val = &var_expr[idx + 2..];
                std::env::var(var_name).unwrap_or_else(|_| default_val.to_string())
            } else {
                std::env::var(var_expr).unwrap_or_else(|_| format!("${{{}}}", var_expr))
            }
        })
        .to_string()
}

/// The per-user fallback config directory (`~/.config/content-crew`).
pub fn user_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("content-crew"))
}
