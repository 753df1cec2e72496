//! SSE data models — the request body and the event frame schema.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ─────────────────────────────────────────────
// Request model
// ─────────────────────────────────────────────

/// Unified SSE agent request (`POST /v1/chat/completions` body).
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SseRequest {
    /// Session ID identifying the conversation.
    pub session_id: String,
    /// Request ID, unique per request.
    pub request_id: String,
    /// Agent type: `"agent"` (conversational) or `"workflow"` (reserved).
    #[serde(default = "default_agent_type")]
    pub agent_type: String,
    /// Skill selection patterns; `["*"]` means all.
    #[serde(default = "default_star_list")]
    pub skill_list: Vec<String>,
    /// Tool selection patterns; `["*"]` means all.
    #[serde(default = "default_star_list")]
    pub tool_list: Vec<String>,
    /// Workflow list (reserved).
    #[serde(default)]
    pub workflow_list: Vec<String>,
    /// OpenAI-format message list (text or multimodal parts).
    pub message: Vec<Value>,
    /// Whether to stream deltas.
    #[serde(default = "default_true")]
    pub stream: bool,
    /// Whether to emit thinking/reasoning events.
    #[serde(default)]
    pub enable_thinking: bool,
}

fn default_agent_type() -> String {
    "agent".to_string()
}

fn default_star_list() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_true() -> bool {
    true
}

// ─────────────────────────────────────────────
// SSE message body
// ─────────────────────────────────────────────

/// A file reference carried in `files` events.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct FileRef {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// The `message` field of an SSE event. All fields optional; nulls are
/// omitted from the wire.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SseMessageBody {
    /// Complete text content (non-streaming / completion events).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Streaming incremental text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta: Option<String>,
    /// File results (media progress events).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<FileRef>>,
    /// Tool name (`tool` / `tool_result` events).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    /// Tool arguments.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_arguments: Option<Value>,
    /// Tool execution result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_result: Option<String>,
}

// ─────────────────────────────────────────────
// SSE message
// ─────────────────────────────────────────────

/// A single SSE event frame.
///
/// `message_order` is strictly increasing per request; all events of one
/// reason-act cycle share a `message_id` so consumers can group deltas,
/// tool calls, and results into one visual turn. The final lifecycle event
/// always has `message_type = "done"`, `status = "completed"`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SseMessage {
    pub stream: bool,
    pub session_id: String,
    pub request_id: String,
    pub message_id: String,
    pub message_order: u64,
    /// `"agent"` or `"workflow"`.
    pub event_type: String,
    /// `processing` | `completed` | `error` | `tool_calling`.
    pub status: String,
    /// `text` | `html` | `thought` | `tool` | `tool_result` | `progress` |
    /// `image` | `file` | `video` | `done` | `error`.
    pub message_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<SseMessageBody>,
}

impl SseMessage {
    /// Serialize to an SSE `data:` frame (`\n\n`-terminated).
    pub fn to_sse_string(&self) -> String {
        let json = serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string());
        format!("data: {}\n\n", json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_defaults() {
        let req: SseRequest = serde_json::from_value(json!({
            "session_id": "s1",
            "request_id": "r1",
            "message": [{"role": "user", "content": "hello"}]
        }))
        .unwrap();

        assert_eq!(req.agent_type, "agent");
        assert_eq!(req.skill_list, vec!["*"]);
        assert_eq!(req.tool_list, vec!["*"]);
        assert!(req.workflow_list.is_empty());
        assert!(req.stream);
        assert!(!req.enable_thinking);
    }

    #[test]
    fn test_request_explicit_fields() {
        let req: SseRequest = serde_json::from_value(json!({
            "session_id": "s1",
            "request_id": "r1",
            "agent_type": "workflow",
            "tool_list": ["read_*", "exec"],
            "stream": false,
            "enable_thinking": true,
            "message": []
        }))
        .unwrap();

        assert_eq!(req.agent_type, "workflow");
        assert_eq!(req.tool_list, vec!["read_*", "exec"]);
        assert!(!req.stream);
        assert!(req.enable_thinking);
    }

    #[test]
    fn test_sse_message_framing() {
        let msg = SseMessage {
            stream: true,
            session_id: "s1".into(),
            request_id: "r1".into(),
            message_id: "abcd1234abcd1234".into(),
            message_order: 1,
            event_type: "agent".into(),
            status: "processing".into(),
            message_type: "text".into(),
            error: None,
            message: Some(SseMessageBody {
                delta: Some("Hi".into()),
                ..Default::default()
            }),
        };

        let frame = msg.to_sse_string();
        assert!(frame.starts_with("data: {"));
        assert!(frame.ends_with("\n\n"));

        let parsed: serde_json::Value =
            serde_json::from_str(frame.trim_start_matches("data: ").trim()).unwrap();
        assert_eq!(parsed["message_order"], 1);
        assert_eq!(parsed["message"]["delta"], "Hi");
        // Nulls are omitted, not serialized
        assert!(parsed.get("error").is_none());
        assert!(parsed["message"].get("content").is_none());
    }

    #[test]
    fn test_sse_message_omits_empty_body() {
        let msg = SseMessage {
            stream: false,
            session_id: "s1".into(),
            request_id: "r1".into(),
            message_id: "m1".into(),
            message_order: 9,
            event_type: "agent".into(),
            status: "completed".into(),
            message_type: "done".into(),
            error: None,
            message: None,
        };

        let frame = msg.to_sse_string();
        let parsed: serde_json::Value =
            serde_json::from_str(frame.trim_start_matches("data: ").trim()).unwrap();
        assert!(parsed.get("message").is_none());
        assert_eq!(parsed["message_type"], "done");
        assert_eq!(parsed["status"], "completed");
    }
}
