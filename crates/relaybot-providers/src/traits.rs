//! LLM Provider trait — the abstraction the agent loop drives turns through.
//!
//! Every backend implements [`LlmProvider`]. The `HttpProvider` in
//! `http_provider.rs` covers any OpenAI-compatible `/chat/completions`
//! endpoint, blocking and streaming.

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use relaybot_core::types::{LlmResponse, Message, StreamDelta, ToolDefinition};

/// A boxed stream of [`StreamDelta`]s from a streaming chat call.
pub type DeltaStream = Pin<Box<dyn Stream<Item = StreamDelta> + Send>>;

/// Configuration passed to each LLM call.
#[derive(Clone, Debug)]
pub struct LlmRequestConfig {
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature (0.0 – 2.0).
    pub temperature: f64,
}

impl Default for LlmRequestConfig {
    fn default() -> Self {
        Self {
            max_tokens: 4096,
            temperature: 0.7,
        }
    }
}

/// Trait that all LLM providers must implement.
///
/// Contracts the agent loop relies on:
/// - `chat` never raises: transport/API failures come back as an
///   [`LlmResponse`] whose content is a readable error string and whose
///   `finish_reason` is `"error"`.
/// - Tool-call arguments in `chat` responses are JSON-encoded strings; in
///   streams, argument chunks are raw fragments the caller concatenates and
///   parses once per call at turn end.
/// - A reasoning/thinking channel, when present, is distinguishable from
///   user-visible content.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Send a chat completion request.
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        model: &str,
        config: &LlmRequestConfig,
    ) -> LlmResponse;

    /// Send a streaming chat completion request.
    ///
    /// The default implementation degrades to `chat`, replaying the blocking
    /// response as one reasoning delta, one content delta, one fragment per
    /// tool call, and a finish marker.
    async fn stream_chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        model: &str,
        config: &LlmRequestConfig,
        _enable_thinking: bool,
    ) -> DeltaStream {
        let response = self.chat(messages, tools, model, config).await;

        let mut deltas = Vec::new();
        if let Some(reasoning) = response.reasoning_content {
            deltas.push(StreamDelta::Reasoning(reasoning));
        }
        if let Some(content) = response.content {
            deltas.push(StreamDelta::Content(content));
        }
        for (index, tc) in response.tool_calls.iter().enumerate() {
            deltas.push(StreamDelta::ToolCallFragment {
                index: index as u32,
                id: Some(tc.id.clone()),
                name: Some(tc.function.name.clone()),
                arguments: Some(tc.function.arguments.clone()),
            });
        }
        deltas.push(StreamDelta::Finish {
            reason: response.finish_reason.unwrap_or_else(|| "stop".to_string()),
            usage: response.usage,
        });

        Box::pin(futures::stream::iter(deltas))
    }

    /// The default model for this provider instance.
    fn default_model(&self) -> &str;

    /// Display name for logging.
    fn display_name(&self) -> &str;
}
