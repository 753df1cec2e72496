//! Configuration schema.
//!
//! Hierarchy: `Config` → `AgentsConfig`, `ProvidersConfig`, `ToolsConfig`,
//! `StorageConfig`, `SseConfig`.
//!
//! JSON on disk uses **camelCase** keys; Rust uses snake_case.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration — loaded from `~/.relaybot/config.json` + env vars.
///
/// Taken as a process-wide snapshot at startup and passed explicitly to the
/// components that need it; nothing reads ambient environment afterwards.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub agents: AgentsConfig,
    pub providers: ProvidersConfig,
    pub tools: ToolsConfig,
    pub storage: StorageConfig,
    pub sse: SseConfig,
}

// ─────────────────────────────────────────────
// Agents
// ─────────────────────────────────────────────

/// Agent configuration container.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentsConfig {
    pub defaults: AgentDefaults,
}

/// Default agent settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentDefaults {
    /// Default workspace directory.
    pub workspace: String,
    /// Default LLM model identifier.
    pub model: String,
    /// Maximum tokens to generate per response.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
    /// Maximum reason-act iterations before forcing a response.
    pub max_tool_iterations: u32,
}

impl Default for AgentDefaults {
    fn default() -> Self {
        Self {
            workspace: "~/.relaybot/workspace".to_string(),
            model: "anthropic/claude-sonnet-4-20250514".to_string(),
            max_tokens: 8192,
            temperature: 0.7,
            max_tool_iterations: 20,
        }
    }
}

// ─────────────────────────────────────────────
// Providers
// ─────────────────────────────────────────────

/// Configuration for a single LLM provider (API key, base URL, headers).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    /// API key for authentication.
    #[serde(default)]
    pub api_key: String,
    /// Custom API base URL (overrides provider default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Extra HTTP headers to send with each request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_headers: Option<HashMap<String, String>>,
}

impl ProviderConfig {
    /// Whether this provider has a configured API key.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// All provider configurations, one per supported LLM backend.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub anthropic: ProviderConfig,
    #[serde(default)]
    pub openai: ProviderConfig,
    #[serde(default)]
    pub openrouter: ProviderConfig,
    #[serde(default)]
    pub deepseek: ProviderConfig,
    #[serde(default)]
    pub groq: ProviderConfig,
    #[serde(default)]
    pub moonshot: ProviderConfig,
    #[serde(default)]
    pub vllm: ProviderConfig,
}

impl ProvidersConfig {
    /// Convert to a map for the provider registry's matching logic.
    pub fn to_map(&self) -> HashMap<String, ProviderConfig> {
        let entries: &[(&str, &ProviderConfig)] = &[
            ("anthropic", &self.anthropic),
            ("openai", &self.openai),
            ("openrouter", &self.openrouter),
            ("deepseek", &self.deepseek),
            ("groq", &self.groq),
            ("moonshot", &self.moonshot),
            ("vllm", &self.vllm),
        ];
        entries
            .iter()
            .map(|(name, config)| (name.to_string(), (*config).clone()))
            .collect()
    }
}

// ─────────────────────────────────────────────
// Tools
// ─────────────────────────────────────────────

/// Tool configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolsConfig {
    /// Web tools configuration (search, fetch).
    #[serde(default)]
    pub web: WebToolsConfig,
    /// Shell exec tool configuration.
    #[serde(default)]
    pub exec: ExecToolConfig,
    /// Whether to restrict file/exec operations to the workspace directory.
    #[serde(default)]
    pub restrict_to_workspace: bool,
}

/// Web tools configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebToolsConfig {
    #[serde(default)]
    pub search: WebSearchConfig,
}

/// Web search configuration (Brave API).
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebSearchConfig {
    /// Brave Search API key.
    #[serde(default)]
    pub api_key: String,
    /// Maximum number of search results to return.
    pub max_results: u32,
}

impl Default for WebSearchConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            max_results: 5,
        }
    }
}

/// Shell exec tool configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExecToolConfig {
    /// Timeout in seconds for shell commands.
    pub timeout: u64,
}

impl Default for ExecToolConfig {
    fn default() -> Self {
        Self { timeout: 60 }
    }
}

// ─────────────────────────────────────────────
// Object storage
// ─────────────────────────────────────────────

/// Object-store configuration for the upload tools.
///
/// Targets any S3-style HTTP endpoint that accepts authenticated PUTs at
/// `{endpoint}/{bucket}/{object_key}`. Leaving `endpoint` empty disables
/// the storage tools (they are auto-registered only when configured).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StorageConfig {
    /// Base endpoint URL, e.g. `https://objects.example.com`.
    #[serde(default)]
    pub endpoint: String,
    /// Bucket name prepended to object keys.
    #[serde(default)]
    pub bucket: String,
    /// Bearer token for authentication (optional).
    #[serde(default)]
    pub access_token: String,
    /// Public base URL for constructing returned links. Falls back to
    /// `endpoint` when empty.
    #[serde(default)]
    pub public_base_url: String,
}

impl StorageConfig {
    /// Whether the storage service is usable.
    pub fn is_configured(&self) -> bool {
        !self.endpoint.is_empty() && !self.bucket.is_empty()
    }
}

// ─────────────────────────────────────────────
// SSE surface
// ─────────────────────────────────────────────

/// HTTP/SSE server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SseConfig {
    /// Listen address.
    pub host: String,
    /// Listen port.
    pub port: u16,
}

impl Default for SseConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 18790,
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.agents.defaults.max_tokens, 8192);
        assert_eq!(config.agents.defaults.temperature, 0.7);
        assert_eq!(config.agents.defaults.max_tool_iterations, 20);
        assert_eq!(config.sse.port, 18790);
        assert!(!config.tools.restrict_to_workspace);
        assert!(!config.storage.is_configured());
    }

    #[test]
    fn test_config_from_json_camel_case() {
        let json = serde_json::json!({
            "agents": {
                "defaults": {
                    "model": "gpt-4o",
                    "maxTokens": 4096,
                    "temperature": 0.5,
                    "maxToolIterations": 10
                }
            },
            "sse": {
                "host": "127.0.0.1",
                "port": 9090
            }
        });

        let config: Config = serde_json::from_value(json).unwrap();
        assert_eq!(config.agents.defaults.model, "gpt-4o");
        assert_eq!(config.agents.defaults.max_tokens, 4096);
        assert_eq!(config.agents.defaults.max_tool_iterations, 10);
        assert_eq!(config.sse.host, "127.0.0.1");
        assert_eq!(config.sse.port, 9090);
        // Defaults preserved for missing fields
        assert!(!config.tools.restrict_to_workspace);
        assert_eq!(config.tools.exec.timeout, 60);
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let config = Config::default();
        let json_str = serde_json::to_string_pretty(&config).unwrap();
        let deserialized: Config = serde_json::from_str(&json_str).unwrap();
        assert_eq!(
            deserialized.agents.defaults.model,
            config.agents.defaults.model
        );
        assert_eq!(deserialized.sse.port, config.sse.port);
    }

    #[test]
    fn test_config_json_uses_camel_case() {
        let config = Config::default();
        let json = serde_json::to_value(&config).unwrap();
        assert!(json["agents"]["defaults"].get("maxTokens").is_some());
        assert!(json["tools"].get("restrictToWorkspace").is_some());
        assert!(json["agents"]["defaults"].get("max_tokens").is_none());
    }

    #[test]
    fn test_provider_config_is_configured() {
        let empty = ProviderConfig::default();
        assert!(!empty.is_configured());

        let with_key = ProviderConfig {
            api_key: "sk-123".to_string(),
            ..Default::default()
        };
        assert!(with_key.is_configured());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = serde_json::json!({
            "providers": {
                "anthropic": {
                    "apiKey": "sk-ant-test"
                }
            }
        });

        let config: Config = serde_json::from_value(json).unwrap();
        assert_eq!(config.providers.anthropic.api_key, "sk-ant-test");
        assert!(!config.providers.openai.is_configured());
        assert_eq!(config.agents.defaults.max_tokens, 8192);
    }

    #[test]
    fn test_storage_config() {
        let json = serde_json::json!({
            "storage": {
                "endpoint": "https://objects.example.com",
                "bucket": "relaybot",
                "accessToken": "tok-123"
            }
        });

        let config: Config = serde_json::from_value(json).unwrap();
        assert!(config.storage.is_configured());
        assert_eq!(config.storage.bucket, "relaybot");
    }

    #[test]
    fn test_providers_to_map() {
        let mut providers = ProvidersConfig::default();
        providers.groq.api_key = "gsk-1".to_string();

        let map = providers.to_map();
        assert_eq!(map.len(), 7);
        assert!(map.get("groq").unwrap().is_configured());
        assert!(!map.get("openai").unwrap().is_configured());
    }
}
