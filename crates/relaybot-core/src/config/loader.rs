//! Config loader — reads `~/.relaybot/config.json` and merges env vars.
//!
//! # Loading precedence
//! 1. Defaults (from `Config::default()`)
//! 2. JSON file at `~/.relaybot/config.json`
//! 3. Environment variables `RELAYBOT_<SECTION>__<FIELD>` (override JSON)

use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::schema::Config;

/// Default config file path.
pub fn get_config_path() -> PathBuf {
    crate::utils::get_data_path().join("config.json")
}

/// Load configuration from the default path (or an explicit one) + env vars.
///
/// Falls back to `Config::default()` if the file doesn't exist or can't be
/// parsed — a bad config file degrades, it never aborts.
pub fn load_config(path: Option<&Path>) -> Config {
    let config_path = path.map(PathBuf::from).unwrap_or_else(get_config_path);
    load_config_from_path(&config_path)
}

fn load_config_from_path(path: &Path) -> Config {
    if !path.exists() {
        info!("No config file found at {}, using defaults", path.display());
        return apply_env_overrides(Config::default());
    }

    debug!("Loading config from {}", path.display());

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to read config file {}: {}", path.display(), e);
            return apply_env_overrides(Config::default());
        }
    };

    let config: Config = match serde_json::from_str(&content) {
        Ok(c) => c,
        Err(e) => {
            warn!("Failed to parse config JSON: {}", e);
            Config::default()
        }
    };

    apply_env_overrides(config)
}

/// Apply `RELAYBOT_<SECTION>__<FIELD>` environment overrides.
///
/// Supported keys cover the secrets and knobs one typically injects in a
/// container: provider API keys, the model, and the SSE port.
fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(v) = std::env::var("RELAYBOT_AGENTS__MODEL") {
        config.agents.defaults.model = v;
    }
    if let Ok(v) = std::env::var("RELAYBOT_AGENTS__WORKSPACE") {
        config.agents.defaults.workspace = v;
    }
    if let Ok(v) = std::env::var("RELAYBOT_SSE__PORT") {
        if let Ok(port) = v.parse() {
            config.sse.port = port;
        }
    }

    let provider_keys: &mut [(&str, &mut String)] = &mut [
        ("RELAYBOT_PROVIDERS__ANTHROPIC_API_KEY", &mut config.providers.anthropic.api_key),
        ("RELAYBOT_PROVIDERS__OPENAI_API_KEY", &mut config.providers.openai.api_key),
        ("RELAYBOT_PROVIDERS__OPENROUTER_API_KEY", &mut config.providers.openrouter.api_key),
        ("RELAYBOT_PROVIDERS__DEEPSEEK_API_KEY", &mut config.providers.deepseek.api_key),
        ("RELAYBOT_PROVIDERS__GROQ_API_KEY", &mut config.providers.groq.api_key),
        ("RELAYBOT_PROVIDERS__MOONSHOT_API_KEY", &mut config.providers.moonshot.api_key),
    ];
    for (env_name, slot) in provider_keys.iter_mut() {
        if let Ok(v) = std::env::var(env_name) {
            **slot = v;
        }
    }

    if let Ok(v) = std::env::var("RELAYBOT_TOOLS__WEB_SEARCH_API_KEY") {
        config.tools.web.search.api_key = v;
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.json");
        let config = load_config(Some(&path));
        assert_eq!(config.agents.defaults.max_tokens, 8192);
    }

    #[test]
    fn test_load_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"agents":{"defaults":{"model":"deepseek-chat"}}}"#,
        )
        .unwrap();

        let config = load_config(Some(&path));
        assert_eq!(config.agents.defaults.model, "deepseek-chat");
        // Untouched sections keep their defaults
        assert_eq!(config.sse.port, 18790);
    }

    #[test]
    fn test_load_invalid_json_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();

        let config = load_config(Some(&path));
        assert_eq!(config.agents.defaults.max_tool_iterations, 20);
    }

    #[test]
    fn test_config_path_under_data_dir() {
        let path = get_config_path();
        assert!(path.to_string_lossy().contains(".relaybot"));
        assert!(path.ends_with("config.json"));
    }
}
