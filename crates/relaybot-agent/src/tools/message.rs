//! Message tool — lets the agent proactively send messages to channels.
//!
//! The agent loop calls `set_context` before each turn so "the current
//! conversation" is always the default destination.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;
use tracing::debug;

use relaybot_core::bus::queue::MessageBus;
use relaybot_core::bus::types::OutboundMessage;

use super::base::{optional_string, require_string, Tool};

// ─────────────────────────────────────────────
// MessageTool
// ─────────────────────────────────────────────

/// Allows the agent to send messages to channels via the outbound queue.
pub struct MessageTool {
    bus: Option<Arc<MessageBus>>,
    /// Default channel / chat_id set per-turn by the agent loop.
    context: Mutex<(String, String)>,
}

impl MessageTool {
    /// Create a new message tool. Without a bus the tool is a no-op
    /// (tests, direct CLI mode).
    pub fn new(bus: Option<Arc<MessageBus>>) -> Self {
        Self {
            bus,
            context: Mutex::new(("cli".into(), "direct".into())),
        }
    }

    #[cfg(test)]
    async fn current_context(&self) -> (String, String) {
        self.context.lock().await.clone()
    }
}

#[async_trait]
impl Tool for MessageTool {
    fn name(&self) -> &str {
        "message"
    }

    fn description(&self) -> &str {
        "Send a message to a channel. By default sends to the current conversation. \
         Can optionally specify a different channel and chat_id to send to."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "content": {
                    "type": "string",
                    "description": "The message content to send"
                },
                "channel": {
                    "type": "string",
                    "description": "Target channel (optional, defaults to current)"
                },
                "chat_id": {
                    "type": "string",
                    "description": "Target chat ID (optional, defaults to current)"
                }
            },
            "required": ["content"]
        })
    }

    async fn set_context(&self, channel: &str, chat_id: &str) {
        let mut ctx = self.context.lock().await;
        *ctx = (channel.to_string(), chat_id.to_string());
    }

    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String> {
        let content = require_string(&params, "content")?;
        let param_channel = optional_string(&params, "channel");
        let param_chat_id = optional_string(&params, "chat_id");

        let (default_channel, default_chat_id) = {
            let ctx = self.context.lock().await;
            ctx.clone()
        };
        let channel = param_channel.unwrap_or(default_channel);
        let chat_id = param_chat_id.unwrap_or(default_chat_id);

        debug!(channel = %channel, chat_id = %chat_id, "sending message via tool");

        let msg = OutboundMessage::new(&channel, &chat_id, &content);

        if let Some(bus) = &self.bus {
            bus.publish_outbound(msg)
                .map_err(|e| anyhow::anyhow!("Failed to send message: {e}"))?;
        } else {
            debug!("no bus configured; message discarded");
        }

        Ok(format!("Message sent to {channel}:{chat_id}"))
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_definition() {
        let tool = MessageTool::new(None);
        let def = tool.to_definition();
        assert_eq!(def.function.name, "message");
        assert_eq!(def.tool_type, "function");
    }

    #[tokio::test]
    async fn test_set_context() {
        let tool = MessageTool::new(None);
        tool.set_context("telegram", "chat_42").await;
        assert_eq!(
            tool.current_context().await,
            ("telegram".to_string(), "chat_42".to_string())
        );
    }

    #[tokio::test]
    async fn test_execute_without_bus() {
        let tool = MessageTool::new(None);
        tool.set_context("websocket", "conn_1").await;
        let mut params = HashMap::new();
        params.insert("content".into(), json!("Hello from agent"));
        let result = tool.execute(params).await.unwrap();
        assert_eq!(result, "Message sent to websocket:conn_1");
    }

    #[tokio::test]
    async fn test_execute_with_channel_override() {
        let tool = MessageTool::new(None);
        tool.set_context("cli", "direct").await;
        let mut params = HashMap::new();
        params.insert("content".into(), json!("Hello"));
        params.insert("channel".into(), json!("telegram"));
        params.insert("chat_id".into(), json!("12345"));
        let result = tool.execute(params).await.unwrap();
        assert_eq!(result, "Message sent to telegram:12345");
    }

    #[tokio::test]
    async fn test_execute_missing_content() {
        let tool = MessageTool::new(None);
        let result = tool.execute(HashMap::new()).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_execute_publishes_to_bus() {
        let bus = Arc::new(MessageBus::new(8));
        let tool = MessageTool::new(Some(bus.clone()));
        tool.set_context("telegram", "chat_9").await;

        let mut params = HashMap::new();
        params.insert("content".into(), json!("ping"));
        let result = tool.execute(params).await.unwrap();
        assert!(result.contains("Message sent"));

        let out = bus.consume_outbound().await.unwrap();
        assert_eq!(out.channel, "telegram");
        assert_eq!(out.chat_id, "chat_9");
        assert_eq!(out.content, "ping");
    }
}
