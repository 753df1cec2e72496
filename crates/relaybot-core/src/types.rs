//! Core types — the OpenAI chat-completions shapes every component speaks.
//!
//! Messages, tool calls, tool definitions, provider responses, and stream
//! deltas are all modeled here so the agent loop, providers, and the SSE
//! surface agree on one wire vocabulary. Format errors become compile
//! errors instead of runtime surprises.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ─────────────────────────────────────────────
// Messages (OpenAI chat completions format)
// ─────────────────────────────────────────────

/// A chat message in the OpenAI format.
///
/// Each variant maps to a `role` field value.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "role")]
pub enum Message {
    #[serde(rename = "system")]
    System { content: String },

    #[serde(rename = "user")]
    User { content: MessageContent },

    #[serde(rename = "assistant")]
    Assistant {
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<ToolCall>>,
        /// Reasoning/thinking content from models that expose it.
        #[serde(skip_serializing_if = "Option::is_none")]
        reasoning_content: Option<String>,
    },

    #[serde(rename = "tool")]
    Tool {
        content: String,
        tool_call_id: String,
    },
}

impl Message {
    /// Create a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    /// Create a user message with text content.
    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            content: MessageContent::Text(content.into()),
        }
    }

    /// Create a user message with multipart content (text + images).
    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Message::User {
            content: MessageContent::Parts(parts),
        }
    }

    /// Create an assistant message with text content.
    pub fn assistant(content: impl Into<String>) -> Self {
        Message::Assistant {
            content: Some(content.into()),
            tool_calls: None,
            reasoning_content: None,
        }
    }

    /// Create an assistant message carrying tool calls (optional text).
    pub fn assistant_tool_calls(content: Option<String>, tool_calls: Vec<ToolCall>) -> Self {
        Message::Assistant {
            content,
            tool_calls: Some(tool_calls),
            reasoning_content: None,
        }
    }

    /// Create a tool result message correlated to a tool call.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Message::Tool {
            content: content.into(),
            tool_call_id: tool_call_id.into(),
        }
    }
}

// ─────────────────────────────────────────────
// Message Content (text or multipart/vision)
// ─────────────────────────────────────────────

/// User message content — either plain text or multipart (for vision input).
///
/// When serialized: text becomes a plain string, parts become an array.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    /// Simple text content (most common case).
    Text(String),
    /// Multipart content with text and/or images.
    Parts(Vec<ContentPart>),
}

/// A single part of a multipart message.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    /// Image part — a remote URL or a base64 data URI.
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

/// Image URL payload.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ImageUrl {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

// ─────────────────────────────────────────────
// Tool Calls (function calling)
// ─────────────────────────────────────────────

/// A tool call from the assistant, requesting execution of a function.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    /// Opaque ID used to correlate the matching tool-result message.
    pub id: String,
    /// Always "function" in the current API shape.
    #[serde(rename = "type")]
    pub call_type: String,
    /// The function to call.
    pub function: FunctionCall,
}

impl ToolCall {
    /// Create a new tool call.
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: impl Into<String>) -> Self {
        ToolCall {
            id: id.into(),
            call_type: "function".to_string(),
            function: FunctionCall {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

/// The function name and arguments within a tool call.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    /// JSON-encoded arguments string. Some backends return a parsed
    /// mapping instead; deserialization normalizes both to the string form.
    #[serde(deserialize_with = "arguments_string_or_object")]
    pub arguments: String,
}

fn arguments_string_or_object<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        other => Ok(other.to_string()),
    }
}

// ─────────────────────────────────────────────
// Tool Definitions (for LLM requests)
// ─────────────────────────────────────────────

/// Definition of a tool, sent to the LLM so it knows what it can call.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    /// Always "function".
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: FunctionDefinition,
}

/// Schema of a function tool.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Create a new tool definition.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        parameters: serde_json::Value,
    ) -> Self {
        ToolDefinition {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: name.into(),
                description: description.into(),
                parameters,
            },
        }
    }
}

// ─────────────────────────────────────────────
// LLM Response
// ─────────────────────────────────────────────

/// Response from an LLM provider after a chat completion call.
#[derive(Clone, Debug, Default)]
pub struct LlmResponse {
    /// Text content from the assistant (None if only tool calls).
    pub content: Option<String>,
    /// Tool calls requested by the assistant.
    pub tool_calls: Vec<ToolCall>,
    /// Why the model stopped generating.
    pub finish_reason: Option<String>,
    /// Token usage statistics.
    pub usage: Option<UsageInfo>,
    /// Reasoning/thinking content, when the model exposes it.
    pub reasoning_content: Option<String>,
}

impl LlmResponse {
    /// Build an error response. Providers never raise across the call
    /// boundary: failures come back as content with `finish_reason: error`.
    pub fn error(msg: impl Into<String>) -> Self {
        LlmResponse {
            content: Some(msg.into()),
            finish_reason: Some("error".to_string()),
            ..Default::default()
        }
    }

    /// Whether the response contains tool calls.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Token usage statistics from the LLM.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct UsageInfo {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

// ─────────────────────────────────────────────
// Stream deltas
// ─────────────────────────────────────────────

/// One chunk of a streaming chat completion.
///
/// Modeled as a tagged union: each chunk carries exactly one of a content
/// delta, a reasoning delta, a tool-call fragment, or the finish marker.
/// Tool-call fragments with the same `index` across successive deltas
/// describe one call; the consumer concatenates `arguments` pieces and
/// parses the buffer once at turn end.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamDelta {
    /// User-visible text delta.
    Content(String),
    /// Reasoning/thinking delta, distinct from user-visible content.
    Reasoning(String),
    /// Incremental tool-call fragment, accumulated by `index`.
    ToolCallFragment {
        index: u32,
        id: Option<String>,
        name: Option<String>,
        arguments: Option<String>,
    },
    /// Final chunk: finish reason plus optional usage counters.
    Finish {
        reason: String,
        usage: Option<UsageInfo>,
    },
}

// ─────────────────────────────────────────────
// Raw provider wire types
// ─────────────────────────────────────────────

/// Raw chat completion response from an OpenAI-compatible API.
#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub id: Option<String>,
    pub choices: Vec<ChatChoice>,
    pub usage: Option<UsageInfo>,
}

/// A single choice in a chat completion response.
#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: AssistantMessage,
    pub finish_reason: Option<String>,
}

/// The assistant message within a chat completion choice.
#[derive(Debug, Deserialize)]
pub struct AssistantMessage {
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default)]
    pub reasoning_content: Option<String>,
}

impl From<ChatCompletionResponse> for LlmResponse {
    fn from(resp: ChatCompletionResponse) -> Self {
        let choice = resp.choices.into_iter().next();
        match choice {
            Some(c) => LlmResponse {
                content: c.message.content,
                tool_calls: c.message.tool_calls.unwrap_or_default(),
                finish_reason: c.finish_reason,
                usage: resp.usage,
                reasoning_content: c.message.reasoning_content,
            },
            None => LlmResponse::error("No choices in response"),
        }
    }
}

/// Request body for an OpenAI-compatible chat completion API.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_choice: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

// ─────────────────────────────────────────────
// Session types
// ─────────────────────────────────────────────

/// A conversation session with message history.
///
/// The persisted history holds only `(user, assistant)` pairs — tool and
/// system messages live in the wire message list of a single turn, never
/// in the transcript.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Session {
    pub key: String,
    pub messages: Vec<Message>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl Session {
    /// Create a new empty session.
    pub fn new(key: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        Session {
            key: key.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            metadata: HashMap::new(),
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ── Message serialization ──

    #[test]
    fn test_system_message_serialization() {
        let msg = Message::system("You are a helpful assistant.");
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["role"], "system");
        assert_eq!(json["content"], "You are a helpful assistant.");
    }

    #[test]
    fn test_user_text_message_serialization() {
        let msg = Message::user("Hello, world!");
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["role"], "user");
        assert_eq!(json["content"], "Hello, world!");
    }

    #[test]
    fn test_user_multipart_message_serialization() {
        let msg = Message::user_parts(vec![
            ContentPart::Text {
                text: "What's in this image?".to_string(),
            },
            ContentPart::ImageUrl {
                image_url: ImageUrl {
                    url: "data:image/png;base64,abc123".to_string(),
                    detail: None,
                },
            },
        ]);
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["role"], "user");
        let content = json["content"].as_array().unwrap();
        assert_eq!(content.len(), 2);
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[1]["type"], "image_url");
        assert_eq!(content[1]["image_url"]["url"], "data:image/png;base64,abc123");
    }

    #[test]
    fn test_assistant_text_message_serialization() {
        let msg = Message::assistant("The answer is 42.");
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["role"], "assistant");
        assert_eq!(json["content"], "The answer is 42.");
        // tool_calls and reasoning_content should be absent (not null)
        assert!(json.get("tool_calls").is_none());
        assert!(json.get("reasoning_content").is_none());
    }

    #[test]
    fn test_assistant_tool_calls_serialization() {
        let tool_calls = vec![ToolCall::new(
            "call_123",
            "web_search",
            r#"{"query": "Rust programming"}"#,
        )];
        let msg = Message::assistant_tool_calls(None, tool_calls);
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["role"], "assistant");
        assert!(json.get("content").is_none());

        let calls = json["tool_calls"].as_array().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0]["id"], "call_123");
        assert_eq!(calls[0]["type"], "function");
        assert_eq!(calls[0]["function"]["name"], "web_search");
    }

    #[test]
    fn test_tool_result_serialization() {
        let msg = Message::tool_result("call_123", "Search results: Rust is great!");
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["role"], "tool");
        assert_eq!(json["content"], "Search results: Rust is great!");
        assert_eq!(json["tool_call_id"], "call_123");
    }

    #[test]
    fn test_assistant_with_tool_calls_deserialization() {
        let json = json!({
            "role": "assistant",
            "content": null,
            "tool_calls": [{
                "id": "call_abc",
                "type": "function",
                "function": {
                    "name": "read_file",
                    "arguments": "{\"path\": \"/tmp/test.txt\"}"
                }
            }]
        });
        let msg: Message = serde_json::from_value(json).unwrap();

        match msg {
            Message::Assistant {
                content,
                tool_calls,
                ..
            } => {
                assert!(content.is_none());
                let calls = tool_calls.unwrap();
                assert_eq!(calls.len(), 1);
                assert_eq!(calls[0].function.name, "read_file");
            }
            _ => panic!("Expected Assistant message"),
        }
    }

    #[test]
    fn test_tool_call_arguments_accept_object_form() {
        // Some backends skip the JSON-string encoding and send a mapping
        let json = json!({
            "id": "call_x",
            "type": "function",
            "function": {
                "name": "exec",
                "arguments": {"command": "ls"}
            }
        });
        let tc: ToolCall = serde_json::from_value(json).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&tc.function.arguments).unwrap();
        assert_eq!(parsed["command"], "ls");
    }

    #[test]
    fn test_message_round_trip() {
        let messages = vec![
            Message::system("You are Relaybot."),
            Message::user("What is 2+2?"),
            Message::assistant("The answer is 4."),
            Message::tool_result("call_1", "done"),
        ];

        let json_str = serde_json::to_string(&messages).unwrap();
        let deserialized: Vec<Message> = serde_json::from_str(&json_str).unwrap();

        assert_eq!(messages, deserialized);
    }

    // ── ToolDefinition ──

    #[test]
    fn test_tool_definition_serialization() {
        let tool_def = ToolDefinition::new(
            "read_file",
            "Read the contents of a file",
            json!({
                "type": "object",
                "properties": {
                    "path": { "type": "string" }
                },
                "required": ["path"]
            }),
        );
        let json = serde_json::to_value(&tool_def).unwrap();

        assert_eq!(json["type"], "function");
        assert_eq!(json["function"]["name"], "read_file");
        assert_eq!(json["function"]["parameters"]["type"], "object");
    }

    // ── ChatCompletionResponse → LlmResponse ──

    #[test]
    fn test_chat_completion_response_parsing() {
        let api_json = json!({
            "id": "chatcmpl-abc123",
            "choices": [{
                "message": {
                    "content": "Hello! How can I help?",
                    "tool_calls": null
                },
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": 10,
                "completion_tokens": 8,
                "total_tokens": 18
            }
        });

        let resp: ChatCompletionResponse = serde_json::from_value(api_json).unwrap();
        let llm_resp: LlmResponse = resp.into();

        assert_eq!(llm_resp.content.as_deref(), Some("Hello! How can I help?"));
        assert!(!llm_resp.has_tool_calls());
        assert_eq!(llm_resp.finish_reason.as_deref(), Some("stop"));
        assert_eq!(llm_resp.usage.as_ref().unwrap().total_tokens, 18);
    }

    #[test]
    fn test_chat_completion_with_tool_calls_parsing() {
        let api_json = json!({
            "id": "chatcmpl-xyz",
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_42",
                        "type": "function",
                        "function": {
                            "name": "exec",
                            "arguments": "{\"command\": \"ls -la\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": null
        });

        let resp: ChatCompletionResponse = serde_json::from_value(api_json).unwrap();
        let llm_resp: LlmResponse = resp.into();

        assert!(llm_resp.content.is_none());
        assert!(llm_resp.has_tool_calls());
        assert_eq!(llm_resp.tool_calls[0].function.name, "exec");
        assert_eq!(llm_resp.finish_reason.as_deref(), Some("tool_calls"));
    }

    #[test]
    fn test_chat_completion_empty_choices() {
        let api_json = json!({
            "id": "chatcmpl-empty",
            "choices": [],
            "usage": null
        });

        let resp: ChatCompletionResponse = serde_json::from_value(api_json).unwrap();
        let llm_resp: LlmResponse = resp.into();

        assert_eq!(llm_resp.content.as_deref(), Some("No choices in response"));
        assert_eq!(llm_resp.finish_reason.as_deref(), Some("error"));
    }

    // ── ChatCompletionRequest serialization ──

    #[test]
    fn test_chat_request_serialization() {
        let request = ChatCompletionRequest {
            model: "claude-sonnet-4-20250514".to_string(),
            messages: vec![Message::system("You are Relaybot."), Message::user("Hello")],
            tools: None,
            tool_choice: None,
            max_tokens: Some(4096),
            temperature: Some(0.7),
            stream: false,
        };

        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "claude-sonnet-4-20250514");
        assert_eq!(json["messages"].as_array().unwrap().len(), 2);
        assert_eq!(json["max_tokens"], 4096);
        // tools, tool_choice, and stream=false should not appear
        assert!(json.get("tools").is_none());
        assert!(json.get("tool_choice").is_none());
        assert!(json.get("stream").is_none());
    }

    #[test]
    fn test_chat_request_streaming() {
        let request = ChatCompletionRequest {
            model: "gpt-4o".to_string(),
            messages: vec![Message::user("hi")],
            tools: None,
            tool_choice: None,
            max_tokens: None,
            temperature: None,
            stream: true,
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["stream"], true);
    }

    // ── LlmResponse helpers ──

    #[test]
    fn test_llm_response_error() {
        let resp = LlmResponse::error("Something went wrong");

        assert_eq!(resp.content.as_deref(), Some("Something went wrong"));
        assert_eq!(resp.finish_reason.as_deref(), Some("error"));
        assert!(!resp.has_tool_calls());
    }

    // ── StreamDelta ──

    #[test]
    fn test_stream_delta_variants() {
        let deltas = vec![
            StreamDelta::Reasoning("thinking…".into()),
            StreamDelta::Content("Hello".into()),
            StreamDelta::ToolCallFragment {
                index: 0,
                id: Some("call_1".into()),
                name: Some("exec".into()),
                arguments: Some("{\"comm".into()),
            },
            StreamDelta::Finish {
                reason: "tool_calls".into(),
                usage: None,
            },
        ];
        // Fragments with the same index describe one call
        match &deltas[2] {
            StreamDelta::ToolCallFragment { index, .. } => assert_eq!(*index, 0),
            _ => panic!("expected fragment"),
        }
    }

    // ── Session ──

    #[test]
    fn test_session_creation() {
        let session = Session::new("telegram:123456");

        assert_eq!(session.key, "telegram:123456");
        assert!(session.messages.is_empty());
        assert!(session.metadata.is_empty());
    }

    #[test]
    fn test_session_serialization_round_trip() {
        let mut session = Session::new("websocket:789");
        session.messages.push(Message::user("Hello"));
        session.messages.push(Message::assistant("Hi there!"));

        let json_str = serde_json::to_string(&session).unwrap();
        let deserialized: Session = serde_json::from_str(&json_str).unwrap();

        assert_eq!(deserialized.key, "websocket:789");
        assert_eq!(deserialized.messages.len(), 2);
    }
}
