//! SSE emitter — builds well-formed event frames and pushes them toward the
//! HTTP response.
//!
//! Each `emit_*` method constructs one [`SseMessage`], stamps it with the
//! context's ordering state, and sends the `data: {...}\n\n` string into
//! the response channel. A failed send means the HTTP peer is gone; the
//! error propagates so the agent loop can cancel in-flight work.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use serde_json::Value;
use tokio::sync::mpsc;

use crate::context::RequestContext;
use crate::models::{FileRef, SseMessage, SseMessageBody};

/// Constructs and emits SSE events for a single request lifecycle.
pub struct SseEmitter {
    ctx: Arc<RequestContext>,
    tx: mpsc::UnboundedSender<String>,
}

impl SseEmitter {
    /// Bind an emitter to a request context and an outgoing frame channel.
    pub fn new(ctx: Arc<RequestContext>, tx: mpsc::UnboundedSender<String>) -> Self {
        Self { ctx, tx }
    }

    /// The bound request context.
    pub fn ctx(&self) -> &Arc<RequestContext> {
        &self.ctx
    }

    // ------------------------------------------------------------------
    // Core builder
    // ------------------------------------------------------------------

    fn build(
        &self,
        message_type: &str,
        status: &str,
        message: Option<SseMessageBody>,
        error: Option<String>,
        message_id: Option<&str>,
    ) -> Result<()> {
        let msg = SseMessage {
            stream: self.ctx.stream,
            session_id: self.ctx.session_id.clone(),
            request_id: self.ctx.request_id.clone(),
            message_id: message_id
                .map(String::from)
                .unwrap_or_else(|| self.ctx.current_message_id()),
            message_order: self.ctx.next_order(),
            event_type: self.ctx.agent_type.clone(),
            status: status.to_string(),
            message_type: message_type.to_string(),
            error,
            message,
        };
        self.tx
            .send(msg.to_sse_string())
            .map_err(|_| anyhow!("SSE client disconnected"))
    }

    // ------------------------------------------------------------------
    // Text
    // ------------------------------------------------------------------

    /// Streaming text delta.
    pub fn emit_text_delta(&self, delta: &str, message_id: &str) -> Result<()> {
        self.build(
            "text",
            "processing",
            Some(SseMessageBody {
                delta: Some(delta.to_string()),
                ..Default::default()
            }),
            None,
            Some(message_id),
        )
    }

    /// Complete text message (non-streaming mode).
    pub fn emit_text_complete(&self, content: &str, message_id: &str) -> Result<()> {
        self.build(
            "text",
            "completed",
            Some(SseMessageBody {
                content: Some(content.to_string()),
                ..Default::default()
            }),
            None,
            Some(message_id),
        )
    }

    // ------------------------------------------------------------------
    // Thinking / Reasoning
    // ------------------------------------------------------------------

    /// Streaming thinking/reasoning delta.
    pub fn emit_thinking_delta(&self, delta: &str, message_id: &str) -> Result<()> {
        self.build(
            "thought",
            "processing",
            Some(SseMessageBody {
                delta: Some(delta.to_string()),
                ..Default::default()
            }),
            None,
            Some(message_id),
        )
    }

    /// Complete thinking block.
    pub fn emit_thinking_complete(&self, content: &str, message_id: &str) -> Result<()> {
        self.build(
            "thought",
            "completed",
            Some(SseMessageBody {
                content: Some(content.to_string()),
                ..Default::default()
            }),
            None,
            Some(message_id),
        )
    }

    // ------------------------------------------------------------------
    // Tool
    // ------------------------------------------------------------------

    /// Tool call start event.
    pub fn emit_tool_call(
        &self,
        tool_name: &str,
        arguments: Option<Value>,
        message_id: &str,
    ) -> Result<()> {
        self.build(
            "tool",
            "tool_calling",
            Some(SseMessageBody {
                tool_name: Some(tool_name.to_string()),
                tool_arguments: arguments,
                ..Default::default()
            }),
            None,
            Some(message_id),
        )
    }

    /// Tool execution result event.
    pub fn emit_tool_result(&self, tool_name: &str, result: &str, message_id: &str) -> Result<()> {
        self.build(
            "tool_result",
            "processing",
            Some(SseMessageBody {
                tool_name: Some(tool_name.to_string()),
                tool_result: Some(result.to_string()),
                ..Default::default()
            }),
            None,
            Some(message_id),
        )
    }

    // ------------------------------------------------------------------
    // Tool progress
    // ------------------------------------------------------------------

    /// Intermediate progress step from a long-running tool.
    pub fn emit_progress(&self, text: &str, message_id: &str) -> Result<()> {
        self.build(
            "progress",
            "processing",
            Some(SseMessageBody {
                content: Some(text.to_string()),
                ..Default::default()
            }),
            None,
            Some(message_id),
        )
    }

    /// Incremental HTML from a rendering tool.
    pub fn emit_html_delta(&self, delta: &str, message_id: &str) -> Result<()> {
        self.build(
            "html",
            "processing",
            Some(SseMessageBody {
                delta: Some(delta.to_string()),
                ..Default::default()
            }),
            None,
            Some(message_id),
        )
    }

    /// Produced files. `kind` is `image`, `file`, or `video`.
    pub fn emit_files(&self, kind: &str, files: Vec<FileRef>, message_id: &str) -> Result<()> {
        self.build(
            kind,
            "processing",
            Some(SseMessageBody {
                files: Some(files),
                ..Default::default()
            }),
            None,
            Some(message_id),
        )
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Processing complete signal — always the final frame.
    pub fn emit_done(&self) -> Result<()> {
        self.build("done", "completed", None, None, None)
    }

    /// Error event.
    pub fn emit_error(&self, error: &str) -> Result<()> {
        self.build("error", "error", None, Some(error.to_string()), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_emitter() -> (SseEmitter, mpsc::UnboundedReceiver<String>) {
        let ctx = Arc::new(RequestContext::new("s1", "r1"));
        let (tx, rx) = mpsc::unbounded_channel();
        (SseEmitter::new(ctx, tx), rx)
    }

    fn parse(frame: &str) -> serde_json::Value {
        assert!(frame.starts_with("data: "));
        assert!(frame.ends_with("\n\n"));
        serde_json::from_str(frame.trim_start_matches("data: ").trim()).unwrap()
    }

    #[test]
    fn test_message_order_strictly_increasing() {
        let (emitter, mut rx) = make_emitter();
        let mid = emitter.ctx().new_message_id();

        emitter.emit_text_delta("a", &mid).unwrap();
        emitter.emit_text_delta("b", &mid).unwrap();
        emitter.emit_done().unwrap();

        let orders: Vec<u64> = (0..3)
            .map(|_| parse(&rx.try_recv().unwrap())["message_order"].as_u64().unwrap())
            .collect();
        assert_eq!(orders, vec![1, 2, 3]);
    }

    #[test]
    fn test_events_share_cycle_message_id() {
        let (emitter, mut rx) = make_emitter();
        let mid = emitter.ctx().new_message_id();

        emitter.emit_text_delta("a", &mid).unwrap();
        emitter
            .emit_tool_call("clock", Some(serde_json::json!({})), &mid)
            .unwrap();
        emitter.emit_tool_result("clock", "12:00", &mid).unwrap();

        for _ in 0..3 {
            let frame = parse(&rx.try_recv().unwrap());
            assert_eq!(frame["message_id"], mid);
        }
    }

    #[test]
    fn test_tool_call_event_shape() {
        let (emitter, mut rx) = make_emitter();
        let mid = emitter.ctx().new_message_id();

        emitter
            .emit_tool_call("exec", Some(serde_json::json!({"command": "ls"})), &mid)
            .unwrap();

        let frame = parse(&rx.try_recv().unwrap());
        assert_eq!(frame["message_type"], "tool");
        assert_eq!(frame["status"], "tool_calling");
        assert_eq!(frame["message"]["tool_name"], "exec");
        assert_eq!(frame["message"]["tool_arguments"]["command"], "ls");
    }

    #[test]
    fn test_done_event_shape() {
        let (emitter, mut rx) = make_emitter();
        emitter.emit_done().unwrap();

        let frame = parse(&rx.try_recv().unwrap());
        assert_eq!(frame["message_type"], "done");
        assert_eq!(frame["status"], "completed");
        assert!(frame.get("message").is_none());
    }

    #[test]
    fn test_error_event_shape() {
        let (emitter, mut rx) = make_emitter();
        emitter.emit_error("boom").unwrap();

        let frame = parse(&rx.try_recv().unwrap());
        assert_eq!(frame["message_type"], "error");
        assert_eq!(frame["status"], "error");
        assert_eq!(frame["error"], "boom");
    }

    #[test]
    fn test_progress_and_files_events() {
        let (emitter, mut rx) = make_emitter();
        let mid = emitter.ctx().new_message_id();

        emitter.emit_progress("uploading", &mid).unwrap();
        emitter
            .emit_files(
                "image",
                vec![FileRef {
                    url: "https://objects.example.com/a.png".into(),
                    name: Some("a.png".into()),
                }],
                &mid,
            )
            .unwrap();

        let progress = parse(&rx.try_recv().unwrap());
        assert_eq!(progress["message_type"], "progress");
        assert_eq!(progress["message"]["content"], "uploading");

        let files = parse(&rx.try_recv().unwrap());
        assert_eq!(files["message_type"], "image");
        assert_eq!(files["message"]["files"][0]["name"], "a.png");
    }

    #[test]
    fn test_emit_after_disconnect_errors() {
        let (emitter, rx) = make_emitter();
        drop(rx);

        let mid = emitter.ctx().new_message_id();
        assert!(emitter.emit_text_delta("a", &mid).is_err());
    }
}
