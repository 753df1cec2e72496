//! Tool trait — the abstract interface every agent tool implements.
//!
//! Beyond the name/schema/execute core, two optional capabilities exist:
//!
//! - **Conversation context**: tools that carry conversational identity
//!   (message, spawn, schedule) override [`Tool::set_context`]; the agent
//!   loop calls it on every tool before each turn.
//! - **Progress channel**: long-running tools expose a [`ProgressSlot`].
//!   The loop installs a fresh sender per invocation, runs `execute` as a
//!   background task, and drains the channel into SSE progress events.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use relaybot_core::types::ToolDefinition;

// ─────────────────────────────────────────────
// Progress events
// ─────────────────────────────────────────────

/// Kind of a media progress event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    File,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::File => "file",
            MediaKind::Video => "video",
        }
    }
}

/// An intermediate event published by a tool during execution.
#[derive(Clone, Debug, PartialEq)]
pub enum ProgressEvent {
    /// Human-readable progress step.
    Step { text: String },
    /// Incremental HTML output.
    HtmlDelta { delta: String },
    /// A produced file/image/video reference.
    Media {
        kind: MediaKind,
        url: String,
        name: Option<String>,
    },
}

/// Per-invocation progress sender slot.
///
/// The agent loop installs a fresh sender before launching `execute` and
/// clears it afterwards; the tool snapshots the sender at execution start
/// and publishes through it. Events sent with no sender installed are
/// silently dropped (bus-path executions don't drain progress).
#[derive(Default)]
pub struct ProgressSlot {
    sender: Mutex<Option<mpsc::UnboundedSender<ProgressEvent>>>,
}

impl ProgressSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a sender for the upcoming invocation.
    pub fn install(&self, tx: mpsc::UnboundedSender<ProgressEvent>) {
        *self.sender.lock().unwrap() = Some(tx);
    }

    /// Remove the sender, closing the channel once buffered events drain.
    pub fn clear(&self) {
        *self.sender.lock().unwrap() = None;
    }

    /// Publish an event. Returns whether a receiver was attached.
    pub fn send(&self, event: ProgressEvent) -> bool {
        let guard = self.sender.lock().unwrap();
        match guard.as_ref() {
            Some(tx) => tx.send(event).is_ok(),
            None => false,
        }
    }
}

// ─────────────────────────────────────────────
// Tool trait
// ─────────────────────────────────────────────

/// Every agent tool implements this trait.
///
/// The agent loop discovers tools via `name()`, sends their schemas to the
/// LLM via `to_definition()`, and dispatches calls via `execute()`.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name used by the LLM to call this tool (e.g. `"read_file"`).
    fn name(&self) -> &str;

    /// Human-readable description shown to the LLM.
    fn description(&self) -> &str;

    /// JSON Schema describing the parameters.
    ///
    /// Must be `{"type": "object", "properties": {...}, "required": [...]}`.
    fn parameters(&self) -> Value;

    /// Execute the tool with the given arguments.
    ///
    /// Returns the tool output as a string (the LLM reads this). On
    /// failure, return an `Err` — the registry catches it and converts it
    /// to an error string for the LLM.
    async fn execute(&self, params: HashMap<String, Value>) -> anyhow::Result<String>;

    /// Build the `ToolDefinition` sent to the LLM.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition::new(self.name(), self.description(), self.parameters())
    }

    /// Update the current conversation context (channel, chat_id).
    ///
    /// Called by the agent loop on every registered tool before each turn;
    /// only tools that route by conversation override it.
    async fn set_context(&self, _channel: &str, _chat_id: &str) {}

    /// Inject per-request identity before an SSE-path execution.
    ///
    /// Tools that build request-scoped artifacts (object keys, filenames)
    /// override this.
    fn set_request_scope(&self, _session_id: &str, _request_id: &str, _message_id: &str) {}

    /// Progress channel slot, for tools that stream intermediate events.
    fn progress_slot(&self) -> Option<&ProgressSlot> {
        None
    }
}

// ─────────────────────────────────────────────
// Param helpers
// ─────────────────────────────────────────────

/// Extract a required `String` param, returning a user-friendly error.
pub fn require_string(params: &HashMap<String, Value>, key: &str) -> anyhow::Result<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow::anyhow!("Missing required parameter: {key}"))
}

/// Extract an optional `String` param.
pub fn optional_string(params: &HashMap<String, Value>, key: &str) -> Option<String> {
    params.get(key).and_then(|v| v.as_str()).map(|s| s.to_string())
}

/// Extract an optional integer param.
pub fn optional_i64(params: &HashMap<String, Value>, key: &str) -> Option<i64> {
    params.get(key).and_then(|v| v.as_i64())
}

/// Extract an optional boolean param (defaults to `false` if absent).
pub fn optional_bool(params: &HashMap<String, Value>, key: &str) -> bool {
    params.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
}
