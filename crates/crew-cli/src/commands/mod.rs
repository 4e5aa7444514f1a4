//! CLI command implementations.
//!
//! Each submodule corresponds to a top-level CLI command and drives
//! crew-core through `AppState`.

pub mod agents;
pub mod create;
pub mod ingest;
pub mod query;
pub mod stats;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crew_core::config::user_config_dir;
use crew_core::state::{AppState, AppStateInner, Providers};
use crew_core::Settings;

/// Build the shared `AppState` from a config directory.
///
/// Relative paths in the settings resolve against the working directory.
pub async fn init_state(config_dir: &str) -> Result<AppState, String> {
    load_dotenv();

    let config_dir = resolve_config_dir(config_dir, user_config_dir());
    let settings = Settings::load(&config_dir).map_err(|e| e.to_string())?;
    let cwd = std::env::current_dir().map_err(|e| format!("Cannot read working directory: {}", e))?;
    let providers = Providers::from_settings(&settings, &cwd).map_err(|e| e.to_string())?;
    let state: AppState = Arc::new(AppStateInner::new(settings, providers).map_err(|e| e.to_string())?);

    state.events.attach_logging_observer().await;
    Ok(state)
}

/// The requested directory when it exists, else the per-user one when that
/// exists, else the requested path (which loads defaults).
pub fn resolve_config_dir(requested: &str, user_dir: Option<PathBuf>) -> PathBuf {
    let requested = PathBuf::from(requested);
    if requested.is_dir() {
        return requested;
    }
    match user_dir {
        Some(dir) if dir.is_dir() => dir,
        _ => requested,
    }
}

/// Load `.env.local` then `.env`. Variables already set are left alone.
pub fn load_dotenv() {
    for filename in &[".env.local", ".env"] {
        let path = Path::new(filename);
        if !path.exists() {
            continue;
        }
        if let Ok(content) = std::fs::read_to_string(path) {
            for (key, value) in content.lines().filter_map(parse_env_line) {
                if std::env::var(key).is_err() {
                    std::env::set_var(key, value);
                }
            }
            tracing::info!("[CLI] Loaded environment from '{}'", filename);
        }
    }
}

/// Parse one `KEY=VALUE` line. Comments and blank lines give `None`.
pub fn parse_env_line(line: &str) -> Option<(&str, &str)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    let (key, value) = line.split_once('=')?;
    let key = key.trim().trim_start_matches("export ").trim();
    if key.is_empty() {
        return None;
    }
    let value = value.trim();
    let unquoted = [('"', '"'), ('\'', '\'')]
        .iter()
        .find_map(|(open, close)| value.strip_prefix(*open)?.strip_suffix(*close))
        .unwrap_or(value);
    Some((key, unquoted))
}

/// Pretty-print a JSON value to stdout.
pub fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_line() {
        assert_eq!(parse_env_line("OPENAI_API_KEY=sk-1"), Some(("OPENAI_API_KEY", "sk-1")));
        assert_eq!(parse_env_line("  NAME = \"quoted value\" "), Some(("NAME", "quoted value")));
        assert_eq!(parse_env_line("export MODE='fast'"), Some(("MODE", "fast")));
        assert_eq!(parse_env_line("URL=http://x?a=b"), Some(("URL", "http://x?a=b")));
        assert_eq!(parse_env_line("# comment"), None);
        assert_eq!(parse_env_line(""), None);
        assert_eq!(parse_env_line("no_equals_sign"), None);
        assert_eq!(parse_env_line("=value"), None);
    }

    #[test]
    fn test_resolve_config_dir_falls_back_to_user_dir() {
        let requested = tempfile::tempdir().unwrap();
        let user = tempfile::tempdir().unwrap();
        let requested_str = requested.path().to_str().unwrap();

        assert_eq!(
            resolve_config_dir(requested_str, Some(user.path().to_path_buf())),
            requested.path()
        );
        assert_eq!(
            resolve_config_dir("/no/such/config", Some(user.path().to_path_buf())),
            user.path()
        );
        assert_eq!(
            resolve_config_dir("/no/such/config", Some(PathBuf::from("/no/such/user"))),
            PathBuf::from("/no/such/config")
        );
    }
}
