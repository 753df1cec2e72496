//! Subagent manager — background task delegation.
//!
//! The main agent delegates work through the `spawn` tool. Each subagent
//! runs as a `tokio::spawn` task with:
//! - its own task-focused system prompt
//! - a limited tool registry (filesystem, shell, web — no message, no
//!   spawn, no edit)
//! - an ephemeral message history (never persisted)
//! - the same provider, workspace, and budgets as the parent
//!
//! On completion the subagent publishes its result as a `system`-channel
//! inbound message with `chat_id = "{origin_channel}:{origin_chat_id}"`;
//! the agent loop dequeues it as an asynchronous completion notice and
//! surfaces it to the original conversation.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use relaybot_core::bus::queue::MessageBus;
use relaybot_core::bus::types::InboundMessage;
use relaybot_core::types::{Message, ToolCall};
use relaybot_providers::traits::{LlmProvider, LlmRequestConfig};

use crate::context::ContextBuilder;
use crate::tools::filesystem::{ListDirTool, ReadFileTool, WriteFileTool};
use crate::tools::registry::ToolRegistry;
use crate::tools::shell::ExecTool;
use crate::tools::web::{WebFetchTool, WebSearchTool};

/// Maximum reason-act iterations for a subagent task.
const SUBAGENT_MAX_ITERATIONS: usize = 15;

// ─────────────────────────────────────────────
// TaskInfo
// ─────────────────────────────────────────────

/// Metadata about a running subagent task.
#[derive(Clone, Debug)]
pub struct TaskInfo {
    /// Unique task identifier (8 hex chars).
    pub id: String,
    /// Short display label.
    pub label: String,
    /// Full task description sent to the subagent.
    pub task: String,
    /// Channel that originated the request.
    pub origin_channel: String,
    /// Chat ID that originated the request.
    pub origin_chat_id: String,
}

// ─────────────────────────────────────────────
// SubagentManager
// ─────────────────────────────────────────────

/// Manages the lifecycle of background subagent tasks.
pub struct SubagentManager {
    provider: Arc<dyn LlmProvider>,
    workspace: PathBuf,
    bus: Arc<MessageBus>,
    model: String,
    brave_api_key: Option<String>,
    exec_timeout_secs: u64,
    restrict_to_workspace: bool,
    request_config: LlmRequestConfig,
    /// Currently running tasks, keyed by task ID.
    running_tasks: RwLock<HashMap<String, TaskInfo>>,
}

impl SubagentManager {
    /// Create a new subagent manager.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        workspace: PathBuf,
        bus: Arc<MessageBus>,
        model: String,
        brave_api_key: Option<String>,
        exec_timeout_secs: u64,
        restrict_to_workspace: bool,
        request_config: LlmRequestConfig,
    ) -> Self {
        Self {
            provider,
            workspace,
            bus,
            model,
            brave_api_key,
            exec_timeout_secs,
            restrict_to_workspace,
            request_config,
            running_tasks: RwLock::new(HashMap::new()),
        }
    }

    /// Spawn a subagent task in the background.
    ///
    /// Returns an immediate confirmation string; the work itself runs as a
    /// detached task.
    pub async fn spawn(
        self: &Arc<Self>,
        task: String,
        label: Option<String>,
        origin_channel: String,
        origin_chat_id: String,
    ) -> String {
        let task_id = generate_task_id();
        let display_label = label.unwrap_or_else(|| {
            if task.chars().count() > 30 {
                let prefix: String = task.chars().take(30).collect();
                format!("{prefix}…")
            } else {
                task.clone()
            }
        });

        let info = TaskInfo {
            id: task_id.clone(),
            label: display_label.clone(),
            task: task.clone(),
            origin_channel: origin_channel.clone(),
            origin_chat_id: origin_chat_id.clone(),
        };

        {
            let mut tasks = self.running_tasks.write().await;
            tasks.insert(task_id.clone(), info);
        }

        let mgr = Arc::clone(self);
        let tid = task_id.clone();
        let lbl = display_label.clone();
        let t = task.clone();

        tokio::spawn(async move {
            let result = mgr.run_subagent(&tid, &t).await;

            match result {
                Ok(response) => {
                    mgr.announce_result(&tid, &lbl, &response, &origin_channel, &origin_chat_id)
                        .await;
                }
                Err(e) => {
                    error!(task_id = %tid, error = %e, "subagent task failed");
                    mgr.announce_result(
                        &tid,
                        &lbl,
                        &format!("Task failed: {e}"),
                        &origin_channel,
                        &origin_chat_id,
                    )
                    .await;
                }
            }

            let mut tasks = mgr.running_tasks.write().await;
            tasks.remove(&tid);
            info!(task_id = %tid, "subagent task cleaned up");
        });

        format!(
            "Subagent [{display_label}] started (id: {task_id}). I'll notify you when it completes."
        )
    }

    /// Run the subagent's reason-act loop: isolated context, limited tools,
    /// ephemeral history.
    async fn run_subagent(&self, task_id: &str, task: &str) -> Result<String> {
        info!(task_id = %task_id, "subagent starting");

        let mut tools = ToolRegistry::new();
        let allowed_dir = if self.restrict_to_workspace {
            Some(self.workspace.clone())
        } else {
            None
        };

        tools.register(Arc::new(ReadFileTool::new(allowed_dir.clone())));
        tools.register(Arc::new(WriteFileTool::new(allowed_dir.clone())));
        tools.register(Arc::new(ListDirTool::new(allowed_dir)));
        tools.register(Arc::new(ExecTool::new(
            self.workspace.clone(),
            Some(self.exec_timeout_secs),
            self.restrict_to_workspace,
        )));
        tools.register(Arc::new(WebSearchTool::new(self.brave_api_key.clone())));
        tools.register(Arc::new(WebFetchTool::new()));

        let system_prompt = self.build_subagent_prompt(task);
        let mut messages = vec![Message::system(&system_prompt), Message::user(task)];

        let tool_defs = tools.get_definitions();
        let mut final_content: Option<String> = None;

        for iteration in 0..SUBAGENT_MAX_ITERATIONS {
            debug!(task_id = %task_id, iteration = iteration, "subagent LLM call");

            let response = self
                .provider
                .chat(&messages, Some(&tool_defs), &self.model, &self.request_config)
                .await;

            if response.has_tool_calls() {
                let tool_calls: Vec<ToolCall> = response.tool_calls.clone();
                ContextBuilder::add_assistant_message(
                    &mut messages,
                    response.content.clone(),
                    tool_calls.clone(),
                );

                for tc in &tool_calls {
                    let params: HashMap<String, serde_json::Value> =
                        serde_json::from_str(&tc.function.arguments).unwrap_or_default();

                    info!(
                        task_id = %task_id,
                        tool = %tc.function.name,
                        iteration = iteration,
                        "subagent executing tool"
                    );

                    let result = tools.execute(&tc.function.name, params).await;
                    ContextBuilder::add_tool_result(&mut messages, &tc.id, &result);
                }
            } else {
                final_content = response.content;
                break;
            }
        }

        let result = final_content
            .unwrap_or_else(|| "Subagent completed processing but produced no output.".into());

        info!(task_id = %task_id, result_len = result.len(), "subagent finished");
        Ok(result)
    }

    /// Announce the subagent result back onto the bus.
    ///
    /// Publishes an `InboundMessage` with `channel="system"` and
    /// `chat_id="{origin_channel}:{origin_chat_id}"` so the agent loop
    /// routes the response to the originating conversation.
    async fn announce_result(
        &self,
        task_id: &str,
        label: &str,
        result: &str,
        origin_channel: &str,
        origin_chat_id: &str,
    ) {
        let content = format!(
            "## Subagent Result\n\
             **Task**: {label}\n\n\
             {result}\n\n\
             ---\n\
             *Summarize this naturally for the user. Keep it brief. \
             Do not mention 'subagent' or task IDs.*"
        );

        let msg = InboundMessage::new(
            "system",
            "subagent",
            format!("{origin_channel}:{origin_chat_id}"),
            content,
        );

        info!(task_id = %task_id, "announcing subagent result");
        if let Err(e) = self.bus.publish_inbound(msg) {
            error!(task_id = %task_id, error = %e, "failed to announce subagent result");
        }
    }

    /// Build the subagent's system prompt.
    fn build_subagent_prompt(&self, task: &str) -> String {
        format!(
            "# Subagent\n\
             You are a subagent spawned by the main agent to complete a specific task.\n\n\
             ## Your Task\n\
             {task}\n\n\
             ## Rules\n\
             1. Stay focused — complete only the assigned task\n\
             2. Your final response will be reported back to the main agent\n\
             3. Do not initiate conversations or take on side tasks\n\
             4. Be concise but informative\n\n\
             ## What You Can Do\n\
             - Read and write files in the workspace\n\
             - List directory contents\n\
             - Execute shell commands\n\
             - Search the web and fetch web pages\n\n\
             ## What You Cannot Do\n\
             - Send messages directly to users (no message tool)\n\
             - Spawn other subagents\n\
             - Access the main agent's conversation history\n\n\
             ## Workspace\n\
             Your workspace is at: {workspace}",
            workspace = self.workspace.display()
        )
    }

    /// Info about currently running tasks.
    pub async fn running_tasks(&self) -> Vec<TaskInfo> {
        let tasks = self.running_tasks.read().await;
        tasks.values().cloned().collect()
    }

    /// Number of running tasks.
    pub async fn task_count(&self) -> usize {
        let tasks = self.running_tasks.read().await;
        tasks.len()
    }
}

// ─────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────

/// Generate a short unique task ID (8 hex chars from timestamp + counter).
fn generate_task_id() -> String {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::{SystemTime, UNIX_EPOCH};

    static COUNTER: AtomicU32 = AtomicU32::new(0);

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64;

    let count = COUNTER.fetch_add(1, Ordering::Relaxed);
    let mixed = nanos
        .wrapping_mul(6364136223846793005)
        .wrapping_add(count as u64);
    format!("{:08x}", (mixed >> 32) as u32)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
