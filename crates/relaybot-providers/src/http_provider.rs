//! Generic HTTP-based LLM provider for OpenAI-compatible APIs.
//!
//! Talks directly to any `/chat/completions` endpoint via `reqwest`, both
//! blocking (`chat`) and streaming (`stream_chat`, decoded from the SSE body
//! with `eventsource-stream`). API failures never propagate as errors: the
//! blocking path returns an error-shaped `LlmResponse`, the streaming path
//! yields an error content delta followed by `finish_reason = "error"`.

use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, warn};

use relaybot_core::types::{
    ChatCompletionRequest, ChatCompletionResponse, LlmResponse, Message, StreamDelta,
    ToolDefinition, UsageInfo,
};

use crate::registry::{
    apply_model_overrides, resolve_model_name, ProviderConfig, ProviderSpec,
};
use crate::traits::{DeltaStream, LlmProvider, LlmRequestConfig};

// ─────────────────────────────────────────────
// HttpProvider
// ─────────────────────────────────────────────

/// A generic LLM provider that talks to any OpenAI-compatible HTTP API.
pub struct HttpProvider {
    /// HTTP client (shared, connection-pooled).
    client: reqwest::Client,
    /// API base URL (e.g. `"https://api.openai.com/v1"`).
    api_base: String,
    /// API key for Bearer authentication.
    api_key: String,
    /// Default model for this provider instance.
    default_model: String,
    /// Extra headers to send with each request.
    extra_headers: HeaderMap,
    /// Static provider spec for model resolution and overrides.
    spec: &'static ProviderSpec,
}

impl std::fmt::Debug for HttpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProvider")
            .field("api_base", &self.api_base)
            .field("default_model", &self.default_model)
            .field("provider", &self.spec.display_name)
            .finish()
    }
}

impl HttpProvider {
    /// Create a new HttpProvider from a provider config and spec.
    pub fn new(config: &ProviderConfig, spec: &'static ProviderSpec, model: &str) -> Self {
        // Resolve API base: config > spec default > standard OpenAI path
        let api_base = config
            .api_base
            .clone()
            .or_else(|| spec.default_api_base.map(String::from))
            .unwrap_or_else(|| "https://api.openai.com/v1".to_string());

        let mut extra_headers = HeaderMap::new();
        if let Some(ref headers) = config.extra_headers {
            for (key, value) in headers {
                if let (Ok(name), Ok(val)) = (
                    HeaderName::from_bytes(key.as_bytes()),
                    HeaderValue::from_str(value),
                ) {
                    extra_headers.insert(name, val);
                } else {
                    warn!("Invalid header: {}={}", key, value);
                }
            }
        }

        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to build HTTP client");

        HttpProvider {
            client,
            api_base,
            api_key: config.api_key.clone(),
            default_model: model.to_string(),
            extra_headers,
            spec,
        }
    }

    /// Build the full chat completions URL.
    fn completions_url(&self) -> String {
        let base = self.api_base.trim_end_matches('/');
        format!("{}/chat/completions", base)
    }

    fn resolve_model(&self, model: &str) -> String {
        resolve_model_name(model, self.spec)
    }

    fn build_request(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        model: &str,
        config: &LlmRequestConfig,
        stream: bool,
    ) -> ChatCompletionRequest {
        let resolved_model = self.resolve_model(model);
        let temperature = apply_model_overrides(model, self.spec, config.temperature);

        ChatCompletionRequest {
            model: resolved_model,
            messages: messages.to_vec(),
            tools: tools.map(|t| t.to_vec()),
            tool_choice: tools.map(|_| "auto".to_string()),
            max_tokens: Some(config.max_tokens),
            temperature: Some(temperature),
            stream,
        }
    }
}

#[async_trait]
impl LlmProvider for HttpProvider {
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        model: &str,
        config: &LlmRequestConfig,
    ) -> LlmResponse {
        let request_body = self.build_request(messages, tools, model, config, false);

        debug!(
            provider = self.spec.display_name,
            model = %request_body.model,
            messages = messages.len(),
            tools = tools.map_or(0, |t| t.len()),
            "Calling LLM"
        );

        let result = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .headers(self.extra_headers.clone())
            .json(&request_body)
            .send()
            .await;

        let response = match result {
            Ok(resp) => resp,
            Err(e) => {
                error!(provider = self.spec.display_name, error = %e, "HTTP request failed");
                return LlmResponse::error(format!("Error calling LLM: {}", e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(
                provider = self.spec.display_name,
                status = %status,
                body = %error_text,
                "API error"
            );
            return LlmResponse::error(format!("Error calling LLM: {} — {}", status, error_text));
        }

        match response.json::<ChatCompletionResponse>().await {
            Ok(chat_resp) => {
                let llm_resp: LlmResponse = chat_resp.into();
                debug!(
                    provider = self.spec.display_name,
                    has_content = llm_resp.content.is_some(),
                    tool_calls = llm_resp.tool_calls.len(),
                    finish_reason = llm_resp.finish_reason.as_deref().unwrap_or("?"),
                    "LLM response received"
                );
                llm_resp
            }
            Err(e) => {
                error!(
                    provider = self.spec.display_name,
                    error = %e,
                    "Failed to parse LLM response"
                );
                LlmResponse::error(format!("Error parsing LLM response: {}", e))
            }
        }
    }

    async fn stream_chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        model: &str,
        config: &LlmRequestConfig,
        enable_thinking: bool,
    ) -> DeltaStream {
        let request_body = self.build_request(messages, tools, model, config, true);

        // Thinking is a body extension, not part of the standard shape
        let mut body = match serde_json::to_value(&request_body) {
            Ok(v) => v,
            Err(e) => return error_stream(format!("Error building request: {}", e)),
        };
        if enable_thinking {
            body["thinking"] = json!({
                "type": "enabled",
                "budget_tokens": config.max_tokens.min(10_000),
            });
        }

        debug!(
            provider = self.spec.display_name,
            model = %request_body.model,
            "Calling LLM (stream)"
        );

        let result = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.api_key)
            .headers(self.extra_headers.clone())
            .json(&body)
            .send()
            .await;

        let response = match result {
            Ok(resp) => resp,
            Err(e) => {
                error!(provider = self.spec.display_name, error = %e, "HTTP request failed");
                return error_stream(format!("Error calling LLM: {}", e));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(
                provider = self.spec.display_name,
                status = %status,
                body = %error_text,
                "API error"
            );
            return error_stream(format!("Error calling LLM: {} — {}", status, error_text));
        }

        let event_stream = response.bytes_stream().eventsource();

        Box::pin(
            event_stream
                .flat_map(|event| {
                    let deltas = match event {
                        Ok(ev) if ev.data == "[DONE]" => Vec::new(),
                        Ok(ev) => parse_stream_event(&ev.data),
                        Err(e) => vec![
                            StreamDelta::Content(format!("Error calling LLM: {}", e)),
                            StreamDelta::Finish {
                                reason: "error".to_string(),
                                usage: None,
                            },
                        ],
                    };
                    futures::stream::iter(deltas)
                }),
        )
    }

    fn default_model(&self) -> &str {
        &self.default_model
    }

    fn display_name(&self) -> &str {
        self.spec.display_name
    }
}

/// Build a stream that surfaces one error delta and a finish marker.
fn error_stream(message: String) -> DeltaStream {
    Box::pin(futures::stream::iter(vec![
        StreamDelta::Content(message),
        StreamDelta::Finish {
            reason: "error".to_string(),
            usage: None,
        },
    ]))
}

// ─────────────────────────────────────────────
// Stream chunk decoding
// ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    #[serde(default)]
    usage: Option<UsageInfo>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    delta: ChunkDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<ChunkToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ChunkToolCall {
    #[serde(default)]
    index: u32,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<ChunkFunction>,
}

#[derive(Debug, Deserialize)]
struct ChunkFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

/// Decode one SSE data frame into zero or more [`StreamDelta`]s.
///
/// Unparseable frames are dropped — providers interleave keep-alives and
/// vendor extensions that the accumulator must survive.
fn parse_stream_event(data: &str) -> Vec<StreamDelta> {
    let chunk: StreamChunk = match serde_json::from_str(data) {
        Ok(c) => c,
        Err(_) => return Vec::new(),
    };

    let choice = match chunk.choices.into_iter().next() {
        Some(c) => c,
        None => return Vec::new(),
    };

    let mut deltas = Vec::new();

    if let Some(reasoning) = choice.delta.reasoning_content {
        if !reasoning.is_empty() {
            deltas.push(StreamDelta::Reasoning(reasoning));
        }
    }

    if let Some(content) = choice.delta.content {
        if !content.is_empty() {
            deltas.push(StreamDelta::Content(content));
        }
    }

    if let Some(tool_calls) = choice.delta.tool_calls {
        for tc in tool_calls {
            let (name, arguments) = match tc.function {
                Some(f) => (f.name, f.arguments),
                None => (None, None),
            };
            deltas.push(StreamDelta::ToolCallFragment {
                index: tc.index,
                id: tc.id,
                name,
                arguments,
            });
        }
    }

    if let Some(reason) = choice.finish_reason {
        deltas.push(StreamDelta::Finish {
            reason,
            usage: chunk.usage,
        });
    }

    deltas
}

// ─────────────────────────────────────────────
// Builder (convenience)
// ─────────────────────────────────────────────

/// Build an HttpProvider from a model name and a map of provider configs.
///
/// Matches the model to a provider spec, reads its config, and constructs
/// the client.
pub fn create_provider(
    model: &str,
    providers: &std::collections::HashMap<String, ProviderConfig>,
) -> Result<HttpProvider, String> {
    let (config, spec) = crate::registry::match_provider(model, providers).ok_or_else(|| {
        format!(
            "No configured provider found for model '{}'. \
             Set the appropriate API key in config.json.",
            model
        )
    })?;

    debug!(
        provider = spec.display_name,
        model = model,
        api_base = config.api_base.as_deref().unwrap_or("default"),
        "Creating LLM provider"
    );

    Ok(HttpProvider::new(config, spec, model))
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
