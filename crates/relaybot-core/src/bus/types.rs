//! Bus event types — messages flowing between channels and the agent loop.
//!
//! Channels publish [`InboundMessage`]s and consume [`OutboundMessage`]s;
//! the agent loop does the reverse. Metadata is a free-form JSON mapping
//! preserved end-to-end so adapters can carry threading keys and the agent
//! can mark tool-progress notifications (`metadata.type == "tool"`).

use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;

/// An inbound message from a channel to the agent.
#[derive(Clone, Debug)]
pub struct InboundMessage {
    /// Channel name (e.g. "cli", "websocket", "telegram", "system").
    pub channel: String,
    /// Sender identifier within the channel.
    pub sender_id: String,
    /// Chat/conversation identifier. For `channel == "system"` this encodes
    /// `origin_channel:origin_chat_id` so the reply routes back to the
    /// conversation that spawned the work.
    pub chat_id: String,
    /// Text content of the message.
    pub content: String,
    /// When the message was received.
    pub timestamp: DateTime<Utc>,
    /// Attached media, as absolute URLs or base64 data URIs. The channel
    /// materializes uploads before publishing.
    pub media: Vec<String>,
    /// Channel-specific metadata (e.g. message_id, reply threading key).
    pub metadata: HashMap<String, Value>,
}

impl InboundMessage {
    /// Create a new inbound message with minimal required fields.
    pub fn new(
        channel: impl Into<String>,
        sender_id: impl Into<String>,
        chat_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        InboundMessage {
            channel: channel.into(),
            sender_id: sender_id.into(),
            chat_id: chat_id.into(),
            content: content.into(),
            timestamp: Utc::now(),
            media: Vec::new(),
            metadata: HashMap::new(),
        }
    }

    /// Session key combining channel and chat_id (e.g. "telegram:123456").
    ///
    /// Identifies exactly one session in the session store.
    pub fn session_key(&self) -> String {
        format!("{}:{}", self.channel, self.chat_id)
    }

    /// For system-channel messages, split the composite `chat_id` back into
    /// the origin `(channel, chat_id)` pair. A missing separator falls back
    /// to the CLI origin.
    pub fn parse_origin(&self) -> (String, String) {
        match self.chat_id.split_once(':') {
            Some((ch, cid)) => (ch.to_string(), cid.to_string()),
            None => ("cli".to_string(), self.chat_id.clone()),
        }
    }
}

/// An outbound message from the agent to a channel.
#[derive(Clone, Debug)]
pub struct OutboundMessage {
    /// Target channel name.
    pub channel: String,
    /// Target chat/conversation identifier.
    pub chat_id: String,
    /// Text content to send.
    pub content: String,
    /// Channel-specific metadata. `type: "tool"` marks a tool-execution
    /// notification that channels should render as an ephemeral notice
    /// rather than a chat reply.
    pub metadata: HashMap<String, Value>,
}

impl OutboundMessage {
    /// Create a new outbound message.
    pub fn new(
        channel: impl Into<String>,
        chat_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        OutboundMessage {
            channel: channel.into(),
            chat_id: chat_id.into(),
            content: content.into(),
            metadata: HashMap::new(),
        }
    }

    /// Whether this message is a tool-execution notification.
    pub fn is_tool_notification(&self) -> bool {
        self.metadata
            .get("type")
            .and_then(|v| v.as_str())
            .map_or(false, |t| t == "tool")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inbound_message_creation() {
        let msg = InboundMessage::new("telegram", "user_42", "chat_99", "Hello Relaybot!");

        assert_eq!(msg.channel, "telegram");
        assert_eq!(msg.sender_id, "user_42");
        assert_eq!(msg.chat_id, "chat_99");
        assert_eq!(msg.content, "Hello Relaybot!");
        assert!(msg.media.is_empty());
        assert!(msg.metadata.is_empty());
    }

    #[test]
    fn test_session_key() {
        let msg = InboundMessage::new("websocket", "user_1", "conn_abc", "test");
        assert_eq!(msg.session_key(), "websocket:conn_abc");
    }

    #[test]
    fn test_session_key_format_cli() {
        let msg = InboundMessage::new("cli", "local", "default", "hello");
        assert_eq!(msg.session_key(), "cli:default");
    }

    #[test]
    fn test_parse_origin() {
        let msg = InboundMessage::new("system", "subagent", "telegram:42", "done");
        assert_eq!(msg.parse_origin(), ("telegram".to_string(), "42".to_string()));
    }

    #[test]
    fn test_parse_origin_no_separator_falls_back_to_cli() {
        let msg = InboundMessage::new("system", "subagent", "direct", "done");
        assert_eq!(msg.parse_origin(), ("cli".to_string(), "direct".to_string()));
    }

    #[test]
    fn test_outbound_message_creation() {
        let msg = OutboundMessage::new("telegram", "chat_99", "Here's your answer!");

        assert_eq!(msg.channel, "telegram");
        assert_eq!(msg.chat_id, "chat_99");
        assert_eq!(msg.content, "Here's your answer!");
        assert!(!msg.is_tool_notification());
    }

    #[test]
    fn test_tool_notification_marker() {
        let mut msg = OutboundMessage::new("cli", "direct", "Running tool: exec");
        msg.metadata.insert("type".to_string(), json!("tool"));
        msg.metadata.insert("tool_name".to_string(), json!("exec"));

        assert!(msg.is_tool_notification());
    }

    #[test]
    fn test_inbound_with_metadata_preserved() {
        let mut msg = InboundMessage::new("telegram", "user_1", "chat_1", "hi");
        msg.metadata.insert("message_id".to_string(), json!(12345));
        msg.metadata
            .insert("thread_key".to_string(), json!("t-abc"));

        assert_eq!(msg.metadata.get("thread_key").unwrap(), "t-abc");
        assert_eq!(msg.metadata.get("message_id").unwrap(), 12345);
    }

    #[test]
    fn test_inbound_with_media_uris() {
        let mut msg = InboundMessage::new("websocket", "user_1", "c1", "check this");
        msg.media.push("https://example.com/photo.jpg".to_string());
        msg.media.push("data:image/png;base64,abc123".to_string());

        assert_eq!(msg.media.len(), 2);
        assert!(msg.media[1].starts_with("data:image/png"));
    }
}
