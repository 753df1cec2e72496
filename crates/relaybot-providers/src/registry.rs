//! Provider registry — static specs for the supported LLM providers.
//!
//! Each `ProviderSpec` describes how to connect to a provider: keywords for
//! model matching, API bases, routing prefixes, and per-model quirks. The
//! matching logic lives here so `http_provider.rs` stays free of if-elif
//! chains.

use std::collections::HashMap;

// ─────────────────────────────────────────────
// ProviderSpec — static metadata for one provider
// ─────────────────────────────────────────────

/// Static specification describing one LLM provider.
#[derive(Clone, Debug)]
pub struct ProviderSpec {
    /// Internal name (e.g. `"openrouter"`).
    pub name: &'static str,
    /// Keywords to match in model names (lowercase).
    pub keywords: &'static [&'static str],
    /// Human-readable name for logs.
    pub display_name: &'static str,
    /// Prefix to prepend to model names for API routing.
    pub prefix: Option<&'static str>,
    /// Prefixes that, if already present, mean we skip prepending.
    pub skip_prefixes: &'static [&'static str],
    /// Whether this is a gateway/aggregator (fallback when no direct match).
    pub is_gateway: bool,
    /// Whether this is a local/self-hosted provider.
    pub is_local: bool,
    /// If the API key starts with this prefix, auto-detect this provider.
    pub detect_by_key_prefix: Option<&'static str>,
    /// Default API base URL for gateways and non-standard endpoints.
    pub default_api_base: Option<&'static str>,
    /// Per-model parameter overrides.
    pub model_overrides: &'static [ModelOverride],
}

/// A per-model parameter override.
#[derive(Clone, Debug)]
pub struct ModelOverride {
    /// Substring to match in the lowercase model name.
    pub pattern: &'static str,
    /// The field to override.
    pub field: OverrideField,
    /// The value to set.
    pub value: f64,
}

/// Fields that can be overridden per model.
#[derive(Clone, Debug)]
pub enum OverrideField {
    Temperature,
}

// ─────────────────────────────────────────────
// Supported providers (in matching priority order)
// ─────────────────────────────────────────────

/// Complete list of supported provider specifications.
pub static PROVIDERS: &[ProviderSpec] = &[
    // 1. OpenRouter — gateway, matched by key prefix "sk-or-"
    ProviderSpec {
        name: "openrouter",
        keywords: &["openrouter"],
        display_name: "OpenRouter",
        prefix: Some("openrouter"),
        skip_prefixes: &["openrouter/"],
        is_gateway: true,
        is_local: false,
        detect_by_key_prefix: Some("sk-or-"),
        default_api_base: Some("https://openrouter.ai/api/v1"),
        model_overrides: &[],
    },
    // 2. Anthropic
    ProviderSpec {
        name: "anthropic",
        keywords: &["anthropic", "claude"],
        display_name: "Anthropic",
        prefix: None,
        skip_prefixes: &[],
        is_gateway: false,
        is_local: false,
        detect_by_key_prefix: None,
        default_api_base: None,
        model_overrides: &[],
    },
    // 3. OpenAI
    ProviderSpec {
        name: "openai",
        keywords: &["openai", "gpt"],
        display_name: "OpenAI",
        prefix: None,
        skip_prefixes: &[],
        is_gateway: false,
        is_local: false,
        detect_by_key_prefix: None,
        default_api_base: None,
        model_overrides: &[],
    },
    // 4. DeepSeek
    ProviderSpec {
        name: "deepseek",
        keywords: &["deepseek"],
        display_name: "DeepSeek",
        prefix: Some("deepseek"),
        skip_prefixes: &["deepseek/"],
        is_gateway: false,
        is_local: false,
        detect_by_key_prefix: None,
        default_api_base: None,
        model_overrides: &[],
    },
    // 5. Moonshot (Kimi) — K2.5 forces temperature=1.0
    ProviderSpec {
        name: "moonshot",
        keywords: &["moonshot", "kimi"],
        display_name: "Moonshot",
        prefix: Some("moonshot"),
        skip_prefixes: &["moonshot/", "openrouter/"],
        is_gateway: false,
        is_local: false,
        detect_by_key_prefix: None,
        default_api_base: Some("https://api.moonshot.ai/v1"),
        model_overrides: &[ModelOverride {
            pattern: "kimi-k2.5",
            field: OverrideField::Temperature,
            value: 1.0,
        }],
    },
    // 6. vLLM (self-hosted)
    ProviderSpec {
        name: "vllm",
        keywords: &["vllm"],
        display_name: "vLLM",
        prefix: Some("hosted_vllm"),
        skip_prefixes: &[],
        is_gateway: false,
        is_local: true,
        detect_by_key_prefix: None,
        default_api_base: None,
        model_overrides: &[],
    },
    // 7. Groq
    ProviderSpec {
        name: "groq",
        keywords: &["groq"],
        display_name: "Groq",
        prefix: Some("groq"),
        skip_prefixes: &["groq/"],
        is_gateway: false,
        is_local: false,
        detect_by_key_prefix: None,
        default_api_base: None,
        model_overrides: &[],
    },
];

// ─────────────────────────────────────────────
// Matching functions
// ─────────────────────────────────────────────

/// Find a provider spec by matching keywords against a model name.
///
/// Skips gateways and local providers — those are fallback only.
pub fn find_by_model(model: &str) -> Option<&'static ProviderSpec> {
    let model_lower = model.to_lowercase();
    PROVIDERS.iter().find(|spec| {
        !spec.is_gateway
            && !spec.is_local
            && spec.keywords.iter().any(|kw| model_lower.contains(kw))
    })
}

/// Find a provider spec by exact name.
pub fn find_by_name(name: &str) -> Option<&'static ProviderSpec> {
    PROVIDERS.iter().find(|spec| spec.name == name)
}

/// Resolve the model name for API calls, applying prefix logic.
pub fn resolve_model_name(model: &str, spec: &ProviderSpec) -> String {
    let mut resolved = model.to_string();

    if let Some(prefix) = spec.prefix {
        let already_prefixed = spec
            .skip_prefixes
            .iter()
            .any(|sp| resolved.starts_with(sp));
        if !already_prefixed {
            resolved = format!("{}/{}", prefix, resolved);
        }
    }

    resolved
}

/// Apply per-model overrides to the request temperature.
pub fn apply_model_overrides(model: &str, spec: &ProviderSpec, temperature: f64) -> f64 {
    let model_lower = model.to_lowercase();
    let mut temp = temperature;

    for ovr in spec.model_overrides {
        if model_lower.contains(ovr.pattern) {
            match ovr.field {
                OverrideField::Temperature => temp = ovr.value,
            }
        }
    }

    temp
}

/// Re-export the provider config from core — single source of truth.
pub use relaybot_core::config::schema::ProviderConfig;

/// Match a model name to a configured provider.
///
/// 1. Keyword match, only if that provider has an API key.
/// 2. Auto-detect a gateway by key prefix among configured entries.
/// 3. Fallback to the first configured gateway.
pub fn match_provider<'a>(
    model: &str,
    providers: &'a HashMap<String, ProviderConfig>,
) -> Option<(&'a ProviderConfig, &'static ProviderSpec)> {
    if let Some(spec) = find_by_model(model) {
        if let Some(config) = providers.get(spec.name) {
            if config.is_configured() {
                return Some((config, spec));
            }
        }
    }

    PROVIDERS
        .iter()
        .filter(|s| s.is_gateway || s.is_local)
        .find_map(|spec| {
            providers
                .get(spec.name)
                .filter(|c| c.is_configured())
                .map(|c| (c, spec))
        })
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_by_model_claude() {
        let spec = find_by_model("claude-sonnet-4-20250514").unwrap();
        assert_eq!(spec.name, "anthropic");
    }

    #[test]
    fn test_find_by_model_gpt() {
        let spec = find_by_model("gpt-4o-mini").unwrap();
        assert_eq!(spec.name, "openai");
    }

    #[test]
    fn test_find_by_model_deepseek() {
        let spec = find_by_model("deepseek-chat").unwrap();
        assert_eq!(spec.name, "deepseek");
    }

    #[test]
    fn test_find_by_model_kimi() {
        let spec = find_by_model("kimi-k2.5-preview").unwrap();
        assert_eq!(spec.name, "moonshot");
    }

    #[test]
    fn test_find_by_model_skips_gateway() {
        // "openrouter/anthropic/…" matches anthropic, not the gateway
        let spec = find_by_model("openrouter/anthropic/claude-3");
        assert_eq!(spec.unwrap().name, "anthropic");
    }

    #[test]
    fn test_find_by_model_unknown() {
        assert!(find_by_model("some-random-model-xyz").is_none());
    }

    #[test]
    fn test_find_by_name() {
        let spec = find_by_name("deepseek").unwrap();
        assert_eq!(spec.display_name, "DeepSeek");
    }

    // ── resolve_model_name ──

    #[test]
    fn test_resolve_model_basic_prefix() {
        let spec = find_by_name("deepseek").unwrap();
        assert_eq!(
            resolve_model_name("deepseek-chat", spec),
            "deepseek/deepseek-chat"
        );
    }

    #[test]
    fn test_resolve_model_skip_prefix() {
        let spec = find_by_name("deepseek").unwrap();
        assert_eq!(
            resolve_model_name("deepseek/deepseek-chat", spec),
            "deepseek/deepseek-chat"
        );
    }

    #[test]
    fn test_resolve_model_no_prefix() {
        let spec = find_by_name("anthropic").unwrap();
        assert_eq!(
            resolve_model_name("claude-sonnet-4-20250514", spec),
            "claude-sonnet-4-20250514"
        );
    }

    // ── apply_model_overrides ──

    #[test]
    fn test_model_override_kimi_k25() {
        let spec = find_by_name("moonshot").unwrap();
        let temp = apply_model_overrides("kimi-k2.5-preview", spec, 0.7);
        assert_eq!(temp, 1.0);
    }

    #[test]
    fn test_model_override_no_match() {
        let spec = find_by_name("moonshot").unwrap();
        let temp = apply_model_overrides("moonshot-v1", spec, 0.7);
        assert_eq!(temp, 0.7);
    }

    // ── match_provider ──

    #[test]
    fn test_match_provider_direct() {
        let mut providers = HashMap::new();
        providers.insert(
            "anthropic".to_string(),
            ProviderConfig {
                api_key: "sk-ant-123".to_string(),
                ..Default::default()
            },
        );

        let (config, spec) = match_provider("claude-sonnet-4-20250514", &providers).unwrap();
        assert_eq!(spec.name, "anthropic");
        assert_eq!(config.api_key, "sk-ant-123");
    }

    #[test]
    fn test_match_provider_gateway_fallback() {
        let mut providers = HashMap::new();
        providers.insert(
            "openrouter".to_string(),
            ProviderConfig {
                api_key: "sk-or-fallback".to_string(),
                ..Default::default()
            },
        );

        let (config, spec) = match_provider("some-unknown-model", &providers).unwrap();
        assert_eq!(spec.name, "openrouter");
        assert_eq!(config.api_key, "sk-or-fallback");
    }

    #[test]
    fn test_match_provider_no_key() {
        let mut providers = HashMap::new();
        providers.insert(
            "anthropic".to_string(),
            ProviderConfig {
                api_key: "".to_string(),
                ..Default::default()
            },
        );

        assert!(match_provider("claude-3", &providers).is_none());
    }

    #[test]
    fn test_all_providers_have_unique_names() {
        let names: Vec<&str> = PROVIDERS.iter().map(|s| s.name).collect();
        let mut unique = names.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(names.len(), unique.len(), "Duplicate provider names found");
    }
}
