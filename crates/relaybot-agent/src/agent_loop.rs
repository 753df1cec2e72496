//! Agent loop — the reason-act engine.
//!
//! Three entry points share one core:
//! - [`AgentLoop::run`] — bus-driven: poll the inbound queue (1 s timeout so
//!   the stop flag is observed promptly), process, publish outbound.
//! - [`AgentLoop::process_direct`] — synchronous: synthesize an inbound
//!   message and return the final text (CLI, cron callback).
//! - [`AgentLoop::process_sse`] — HTTP: stream or non-stream per-request,
//!   emitting SSE events through the bound emitter.
//!
//! One invocation runs up to `max_iterations` reason-act cycles: call the
//! provider, execute any returned tool calls in order (feeding results back
//! as tool messages), repeat until a tool-less turn or the budget runs out.
//! Only the `(user, assistant)` pair is persisted to the session.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::Result;
use futures::StreamExt;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use relaybot_core::bus::queue::MessageBus;
use relaybot_core::bus::types::{InboundMessage, OutboundMessage};
use relaybot_core::session::SessionManager;
use relaybot_core::types::{Message, ToolCall};
use relaybot_providers::traits::{LlmProvider, LlmRequestConfig};
use relaybot_sse::emitter::SseEmitter;
use relaybot_sse::models::FileRef;
use relaybot_sse::RequestContext;

use crate::context::ContextBuilder;
use crate::subagent::SubagentManager;
use crate::tools::base::{ProgressEvent, Tool};
use crate::tools::filesystem::{EditFileTool, ListDirTool, ReadFileTool, WriteFileTool};
use crate::tools::message::MessageTool;
use crate::tools::registry::{validate_params, ToolDeps, ToolRegistry};
use crate::tools::shell::ExecTool;
use crate::tools::spawn::SpawnTool;
use crate::tools::web::{WebFetchTool, WebSearchTool};

/// Default maximum reason-act iterations per user message.
const DEFAULT_MAX_ITERATIONS: usize = 20;

/// Messages of history sent to the provider per turn.
const MAX_HISTORY_MESSAGES: usize = 50;

/// Reply when the iteration budget runs out without a tool-less turn.
const NO_RESPONSE_SENTINEL: &str = "I've completed processing but have no response to give.";

// ─────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────

/// Construction options for [`AgentLoop`]. Everything is optional; the
/// defaults match a bare CLI session.
#[derive(Default)]
pub struct AgentLoopConfig {
    /// Model override (falls back to the provider default).
    pub model: Option<String>,
    /// Reason-act iteration budget.
    pub max_iterations: Option<usize>,
    /// Temperature / max_tokens for each provider call.
    pub request_config: Option<LlmRequestConfig>,
    /// Brave Search API key for the web_search tool.
    pub brave_api_key: Option<String>,
    /// Shell tool timeout in seconds.
    pub exec_timeout_secs: Option<u64>,
    /// Restrict file/exec tools to the workspace directory.
    pub restrict_to_workspace: bool,
    /// Agent display name for the system prompt.
    pub agent_name: Option<String>,
    /// Session manager (a fresh default-path one if absent).
    pub session_manager: Option<SessionManager>,
    /// Optional services for auto-registered tools (storage, cron).
    pub deps: ToolDeps,
}

// ─────────────────────────────────────────────
// AgentLoop
// ─────────────────────────────────────────────

/// The reason-act engine: consumes messages, drives LLM turns, dispatches
/// tools, persists sessions, publishes replies.
pub struct AgentLoop {
    bus: Arc<MessageBus>,
    provider: Arc<dyn LlmProvider>,
    #[allow(dead_code)]
    workspace: PathBuf,
    model: String,
    max_iterations: usize,
    request_config: LlmRequestConfig,
    tools: ToolRegistry,
    context: ContextBuilder,
    sessions: SessionManager,
    subagent_manager: Arc<SubagentManager>,
    stop: AtomicBool,
}

impl AgentLoop {
    /// Create a new agent loop with the default tool set registered.
    pub fn new(
        bus: Arc<MessageBus>,
        provider: Arc<dyn LlmProvider>,
        workspace: PathBuf,
        config: AgentLoopConfig,
    ) -> Self {
        let model = config
            .model
            .unwrap_or_else(|| provider.default_model().to_string());
        let max_iterations = config.max_iterations.unwrap_or(DEFAULT_MAX_ITERATIONS);
        let request_config = config.request_config.unwrap_or_default();
        let exec_timeout = config.exec_timeout_secs.unwrap_or(60);
        let agent_name = config.agent_name.unwrap_or_else(|| "Relaybot".into());
        let sessions = config.session_manager.unwrap_or_else(|| {
            SessionManager::new(None).expect("failed to create session manager")
        });

        let context = ContextBuilder::new(&workspace, &agent_name);

        let mut tools = ToolRegistry::new();
        let allowed_dir = if config.restrict_to_workspace {
            Some(workspace.clone())
        } else {
            None
        };

        tools.register(Arc::new(ReadFileTool::new(allowed_dir.clone())));
        tools.register(Arc::new(WriteFileTool::new(allowed_dir.clone())));
        tools.register(Arc::new(EditFileTool::new(allowed_dir.clone())));
        tools.register(Arc::new(ListDirTool::new(allowed_dir)));
        tools.register(Arc::new(ExecTool::new(
            workspace.clone(),
            Some(exec_timeout),
            config.restrict_to_workspace,
        )));
        tools.register(Arc::new(WebSearchTool::new(config.brave_api_key.clone())));
        tools.register(Arc::new(WebFetchTool::new()));
        tools.register(Arc::new(MessageTool::new(Some(bus.clone()))));

        let subagent_manager = Arc::new(SubagentManager::new(
            provider.clone(),
            workspace.clone(),
            bus.clone(),
            model.clone(),
            config.brave_api_key,
            exec_timeout,
            config.restrict_to_workspace,
            request_config.clone(),
        ));
        tools.register(Arc::new(SpawnTool::new(subagent_manager.clone())));

        tools.auto_register_all(&config.deps);

        info!(
            model = %model,
            tools = tools.len(),
            max_iterations = max_iterations,
            "agent loop initialized"
        );

        Self {
            bus,
            provider,
            workspace,
            model,
            max_iterations,
            request_config,
            tools,
            context,
            sessions,
            subagent_manager,
            stop: AtomicBool::new(false),
        }
    }

    /// Register an additional tool (rare; startup wiring and tests).
    pub fn register_tool(&mut self, tool: Arc<dyn Tool>) {
        self.tools.register(tool);
    }

    /// The tool registry (read access).
    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// The model name in use.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// The subagent manager.
    pub fn subagents(&self) -> &Arc<SubagentManager> {
        &self.subagent_manager
    }

    // ─────────────────────────────────────────
    // Bus-driven entry point
    // ─────────────────────────────────────────

    /// Run the event loop until [`AgentLoop::stop`] is called or the
    /// inbound queue closes.
    pub async fn run(&self) {
        info!("agent loop started, waiting for messages");
        while !self.stop.load(Ordering::SeqCst) {
            // Bounded wait so the stop flag is observed within ~1 s
            let msg = match tokio::time::timeout(
                std::time::Duration::from_secs(1),
                self.bus.consume_inbound(),
            )
            .await
            {
                Ok(Some(msg)) => msg,
                Ok(None) => {
                    info!("inbound queue closed, agent loop exiting");
                    break;
                }
                Err(_) => continue,
            };

            let session_key = msg.session_key();
            debug!(session_key = %session_key, "received message");

            let result = if msg.channel == "system" {
                self.process_system_message(&msg).await
            } else {
                self.process_message(&msg).await
            };

            match result {
                Ok(response) => {
                    if let Err(e) = self.bus.publish_outbound(response) {
                        error!(error = %e, "failed to publish outbound message");
                    }
                }
                Err(e) => {
                    error!(error = %e, session_key = %session_key, "message processing error");
                    let err_msg = OutboundMessage::new(
                        &msg.channel,
                        &msg.chat_id,
                        format!("Sorry, I encountered an error: {e}"),
                    );
                    if let Err(publish_err) = self.bus.publish_outbound(err_msg) {
                        warn!(error = %publish_err, "dropping error reply");
                    }
                }
            }
        }
        info!("agent loop stopped");
    }

    /// Signal the bus-driven loop to exit at its next poll.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    // ─────────────────────────────────────────
    // Core processing
    // ─────────────────────────────────────────

    /// Process a single inbound message into an outbound response.
    pub async fn process_message(&self, msg: &InboundMessage) -> Result<OutboundMessage> {
        let session_key = msg.session_key();

        self.set_tool_contexts(&msg.channel, &msg.chat_id).await;

        let history = self.sessions.get_history(&session_key, MAX_HISTORY_MESSAGES);
        let mut messages = self.context.build_messages(
            &history,
            &msg.content,
            &msg.media,
            &msg.channel,
            &msg.chat_id,
            &[],
        );

        let final_content = self
            .reason_act(&mut messages, &msg.channel, &msg.chat_id)
            .await;
        let content = final_content.unwrap_or_else(|| NO_RESPONSE_SENTINEL.into());

        self.sessions
            .add_message(&session_key, Message::user(&msg.content));
        self.sessions
            .add_message(&session_key, Message::assistant(&content));

        Ok(OutboundMessage::new(&msg.channel, &msg.chat_id, &content))
    }

    /// Process a system-channel message (subagent completion notice).
    ///
    /// The inbound `chat_id` carries `origin_channel:origin_chat_id`; the
    /// response routes back there, and the persisted user entry is
    /// prefixed so system input stays distinguishable in history.
    pub async fn process_system_message(&self, msg: &InboundMessage) -> Result<OutboundMessage> {
        info!(sender = %msg.sender_id, chat_id = %msg.chat_id, "processing system message");

        let (origin_channel, origin_chat_id) = msg.parse_origin();
        let session_key = format!("{origin_channel}:{origin_chat_id}");

        self.set_tool_contexts(&origin_channel, &origin_chat_id).await;

        let history = self.sessions.get_history(&session_key, MAX_HISTORY_MESSAGES);
        let mut messages = self.context.build_messages(
            &history,
            &msg.content,
            &[],
            &origin_channel,
            &origin_chat_id,
            &[],
        );

        let final_content = self
            .reason_act(&mut messages, &origin_channel, &origin_chat_id)
            .await;
        let content = final_content.unwrap_or_else(|| "Background task completed.".into());

        self.sessions.add_message(
            &session_key,
            Message::user(format!("[System: {}] {}", msg.sender_id, msg.content)),
        );
        self.sessions
            .add_message(&session_key, Message::assistant(&content));

        Ok(OutboundMessage::new(&origin_channel, &origin_chat_id, &content))
    }

    /// Direct entry point: synthesize an inbound message and return the
    /// final text. Used by the CLI and the cron callback.
    pub async fn process_direct(&self, content: &str, channel: &str, chat_id: &str) -> Result<String> {
        let msg = InboundMessage::new(channel, "user", chat_id, content);
        let response = self.process_message(&msg).await?;
        Ok(response.content)
    }

    /// The shared reason-act cycle for the bus/direct paths.
    ///
    /// Returns the final assistant text, or `None` when the iteration
    /// budget ran out. Each tool call is announced on the outbound queue
    /// as an ephemeral notification before execution.
    async fn reason_act(
        &self,
        messages: &mut Vec<Message>,
        channel: &str,
        chat_id: &str,
    ) -> Option<String> {
        let tool_defs = self.tools.get_definitions();

        for iteration in 0..self.max_iterations {
            debug!(iteration = iteration, "LLM call");

            let response = self
                .provider
                .chat(messages, Some(&tool_defs), &self.model, &self.request_config)
                .await;

            if !response.has_tool_calls() {
                return response.content;
            }

            let tool_calls: Vec<ToolCall> = response.tool_calls.clone();
            ContextBuilder::add_assistant_message(messages, response.content.clone(), tool_calls.clone());

            for tc in &tool_calls {
                let args = parse_arguments(&tc.function.arguments);

                info!(tool = %tc.function.name, iteration = iteration, "executing tool call");
                self.publish_tool_notification(channel, chat_id, &tc.function.name, &args);

                let params: HashMap<String, Value> = args.into_iter().collect();
                let result = self.tools.execute(&tc.function.name, params).await;

                debug!(tool = %tc.function.name, result_len = result.len(), "tool result");
                ContextBuilder::add_tool_result(messages, &tc.id, &result);
            }
        }

        None
    }

    /// Publish the `metadata.type = "tool"` notification channels render
    /// as an ephemeral notice.
    fn publish_tool_notification(
        &self,
        channel: &str,
        chat_id: &str,
        tool_name: &str,
        args: &serde_json::Map<String, Value>,
    ) {
        let mut notice = OutboundMessage::new(channel, chat_id, format!("Running tool: {tool_name}"));
        notice.metadata.insert("type".into(), json!("tool"));
        notice.metadata.insert("tool_name".into(), json!(tool_name));
        notice
            .metadata
            .insert("arguments".into(), Value::Object(args.clone()));
        if let Err(e) = self.bus.publish_outbound(notice) {
            warn!(error = %e, "dropping tool notification");
        }
    }

    /// Point every context-carrying tool at the current conversation.
    async fn set_tool_contexts(&self, channel: &str, chat_id: &str) {
        for tool in self.tools.iter() {
            tool.set_context(channel, chat_id).await;
        }
    }

    // ─────────────────────────────────────────
    // SSE entry point
    // ─────────────────────────────────────────

    /// Process an SSE request, emitting events through `emitter`.
    ///
    /// Always terminates the event stream with `done`; fatal errors emit
    /// `error` first. Emitter failures mean the HTTP peer disconnected —
    /// the loop unwinds quietly.
    pub async fn process_sse(&self, emitter: &SseEmitter, openai_messages: &[Value]) {
        let ctx = emitter.ctx().clone();
        match self.process_sse_inner(&ctx, emitter, openai_messages).await {
            Ok(()) => {
                let _ = emitter.emit_done();
            }
            Err(e) => {
                warn!(error = %e, request_id = %ctx.request_id, "SSE processing error");
                let _ = emitter.emit_error(&e.to_string());
                let _ = emitter.emit_done();
            }
        }
    }

    async fn process_sse_inner(
        &self,
        ctx: &Arc<RequestContext>,
        emitter: &SseEmitter,
        openai_messages: &[Value],
    ) -> Result<()> {
        let session_key = ctx.session_key();

        self.set_tool_contexts("sse", &ctx.session_id).await;

        let tool_defs = self.tools.filtered_definitions(&ctx.tool_list);
        let tool_defs = if tool_defs.is_empty() { None } else { Some(tool_defs) };

        let (current_text, current_media) = extract_last_user_message(openai_messages);
        let history = self.sessions.get_history(&session_key, MAX_HISTORY_MESSAGES);
        let messages = self.context.build_messages(
            &history,
            &current_text,
            &current_media,
            "sse",
            &ctx.session_id,
            &ctx.skill_list,
        );

        if ctx.stream {
            self.sse_stream_loop(ctx, emitter, messages, tool_defs, &session_key, &current_text)
                .await
        } else {
            self.sse_non_stream_loop(ctx, emitter, messages, tool_defs, &session_key, &current_text)
                .await
        }
    }

    /// Streaming reason-act loop: emit deltas as they arrive, accumulate
    /// tool-call fragments by index, execute at turn end, repeat.
    async fn sse_stream_loop(
        &self,
        ctx: &Arc<RequestContext>,
        emitter: &SseEmitter,
        mut messages: Vec<Message>,
        tool_defs: Option<Vec<relaybot_core::types::ToolDefinition>>,
        session_key: &str,
        user_text: &str,
    ) -> Result<()> {
        #[derive(Default)]
        struct PendingCall {
            id: String,
            name: String,
            arguments: String,
        }

        for iteration in 0..self.max_iterations {
            // One message id per reason-act cycle: every event of this
            // turn — deltas, tool calls, progress, results — shares it.
            let turn_msg_id = ctx.new_message_id();

            let mut pending: BTreeMap<u32, PendingCall> = BTreeMap::new();
            let mut accumulated = String::new();

            debug!(iteration = iteration, "LLM stream call");
            let mut stream = self
                .provider
                .stream_chat(
                    &messages,
                    tool_defs.as_deref(),
                    &self.model,
                    &self.request_config,
                    ctx.enable_thinking,
                )
                .await;

            while let Some(delta) = stream.next().await {
                match delta {
                    relaybot_core::types::StreamDelta::Reasoning(d) => {
                        if ctx.enable_thinking {
                            emitter.emit_thinking_delta(&d, &turn_msg_id)?;
                        }
                    }
                    relaybot_core::types::StreamDelta::Content(d) => {
                        accumulated.push_str(&d);
                        emitter.emit_text_delta(&d, &turn_msg_id)?;
                    }
                    relaybot_core::types::StreamDelta::ToolCallFragment {
                        index,
                        id,
                        name,
                        arguments,
                    } => {
                        let entry = pending.entry(index).or_default();
                        if let Some(id) = id {
                            entry.id = id;
                        }
                        if let Some(name) = name {
                            entry.name = name;
                        }
                        if let Some(args) = arguments {
                            entry.arguments.push_str(&args);
                        }
                    }
                    relaybot_core::types::StreamDelta::Finish { .. } => {}
                }
            }
            drop(stream);

            let full_content = if accumulated.is_empty() {
                None
            } else {
                Some(accumulated.clone())
            };

            if !pending.is_empty() {
                // BTreeMap keeps fragments ordered by stream index
                let tool_calls: Vec<ToolCall> = pending
                    .values()
                    .map(|p| ToolCall::new(&p.id, &p.name, &p.arguments))
                    .collect();

                ContextBuilder::add_assistant_message(&mut messages, full_content, tool_calls.clone());

                for tc in &tool_calls {
                    let args = parse_arguments(&tc.function.arguments);

                    emitter.emit_tool_call(
                        &tc.function.name,
                        Some(Value::Object(args.clone())),
                        &turn_msg_id,
                    )?;

                    let params: HashMap<String, Value> = args.into_iter().collect();
                    let result = self
                        .execute_tool_streaming(ctx, emitter, &tc.function.name, params, &turn_msg_id)
                        .await?;

                    emitter.emit_tool_result(&tc.function.name, &result, &turn_msg_id)?;
                    ContextBuilder::add_tool_result(&mut messages, &tc.id, &result);
                }

                continue;
            }

            // Tool-less turn: the streamed deltas already carried the reply
            let final_content = full_content.unwrap_or_else(|| NO_RESPONSE_SENTINEL.into());
            self.save_turn(session_key, user_text, &final_content);
            return Ok(());
        }

        // Budget exhausted without a tool-less turn
        emitter.emit_text_complete(NO_RESPONSE_SENTINEL, &ctx.new_message_id())?;
        self.save_turn(session_key, user_text, NO_RESPONSE_SENTINEL);
        Ok(())
    }

    /// Non-streaming reason-act loop: blocking provider calls, one
    /// `text_complete` event for the final reply.
    async fn sse_non_stream_loop(
        &self,
        ctx: &Arc<RequestContext>,
        emitter: &SseEmitter,
        mut messages: Vec<Message>,
        tool_defs: Option<Vec<relaybot_core::types::ToolDefinition>>,
        session_key: &str,
        user_text: &str,
    ) -> Result<()> {
        let mut final_content: Option<String> = None;

        for iteration in 0..self.max_iterations {
            debug!(iteration = iteration, "LLM call");
            let response = self
                .provider
                .chat(&messages, tool_defs.as_deref(), &self.model, &self.request_config)
                .await;

            let turn_msg_id = ctx.new_message_id();

            if ctx.enable_thinking {
                if let Some(ref reasoning) = response.reasoning_content {
                    emitter.emit_thinking_complete(reasoning, &turn_msg_id)?;
                }
            }

            if response.has_tool_calls() {
                let tool_calls = response.tool_calls.clone();
                ContextBuilder::add_assistant_message(&mut messages, response.content.clone(), tool_calls.clone());

                for tc in &tool_calls {
                    let args = parse_arguments(&tc.function.arguments);

                    emitter.emit_tool_call(
                        &tc.function.name,
                        Some(Value::Object(args.clone())),
                        &turn_msg_id,
                    )?;

                    let params: HashMap<String, Value> = args.into_iter().collect();
                    let result = self
                        .execute_tool_streaming(ctx, emitter, &tc.function.name, params, &turn_msg_id)
                        .await?;

                    emitter.emit_tool_result(&tc.function.name, &result, &turn_msg_id)?;
                    ContextBuilder::add_tool_result(&mut messages, &tc.id, &result);
                }
                continue;
            }

            final_content = response.content;
            break;
        }

        let final_content = final_content.unwrap_or_else(|| NO_RESPONSE_SENTINEL.into());
        emitter.emit_text_complete(&final_content, &ctx.new_message_id())?;
        self.save_turn(session_key, user_text, &final_content);
        Ok(())
    }

    /// Execute one tool on the SSE path, draining its progress channel
    /// into emitted events.
    ///
    /// Tools without a progress slot dispatch through the registry. For
    /// progress-bearing tools: install a fresh channel, inject the request
    /// scope, launch `execute` as a background task, and `select!` between
    /// task completion and progress events; after completion, drain buffered
    /// events before yielding the final result so ordering is preserved.
    /// An emit failure (peer gone) aborts the task.
    async fn execute_tool_streaming(
        &self,
        ctx: &Arc<RequestContext>,
        emitter: &SseEmitter,
        name: &str,
        params: HashMap<String, Value>,
        turn_msg_id: &str,
    ) -> Result<String> {
        let Some(tool) = self.tools.get(name).cloned() else {
            return Ok(format!("Error: Tool '{name}' not found"));
        };

        if let Some(errors) = validate_params(&tool.parameters(), &params) {
            return Ok(format!("Error: Invalid parameters for tool '{name}': {errors}"));
        }

        if tool.progress_slot().is_none() {
            return Ok(match tool.execute(params).await {
                Ok(result) => result,
                Err(e) => format!("Error executing {name}: {e}"),
            });
        }

        let (tx, mut rx) = mpsc::unbounded_channel::<ProgressEvent>();
        if let Some(slot) = tool.progress_slot() {
            slot.install(tx);
        }
        tool.set_request_scope(&ctx.session_id, &ctx.request_id, turn_msg_id);

        let task_tool = tool.clone();
        let mut task = tokio::spawn(async move { task_tool.execute(params).await });

        let joined = loop {
            tokio::select! {
                res = &mut task => break res,
                Some(event) = rx.recv() => {
                    if let Err(e) = emit_progress_event(emitter, &event, turn_msg_id) {
                        task.abort();
                        if let Some(slot) = tool.progress_slot() {
                            slot.clear();
                        }
                        return Err(e);
                    }
                }
            }
        };

        if let Some(slot) = tool.progress_slot() {
            slot.clear();
        }

        // Drain events buffered before completion
        while let Ok(event) = rx.try_recv() {
            emit_progress_event(emitter, &event, turn_msg_id)?;
        }

        Ok(match joined {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => format!("Error executing {name}: {e}"),
            Err(e) => format!("Error executing {name}: {e}"),
        })
    }

    /// Persist the `(user, assistant)` pair for one completed turn.
    fn save_turn(&self, session_key: &str, user_text: &str, assistant_text: &str) {
        self.sessions
            .add_message(session_key, Message::user(user_text));
        self.sessions
            .add_message(session_key, Message::assistant(assistant_text));
    }
}

// ─────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────

/// Parse a tool-call arguments string, permissively: malformed or
/// non-object JSON yields an empty map.
fn parse_arguments(raw: &str) -> serde_json::Map<String, Value> {
    if raw.trim().is_empty() {
        return serde_json::Map::new();
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    }
}

/// Map a tool progress event to its SSE emission.
fn emit_progress_event(emitter: &SseEmitter, event: &ProgressEvent, message_id: &str) -> Result<()> {
    match event {
        ProgressEvent::Step { text } => emitter.emit_progress(text, message_id),
        ProgressEvent::HtmlDelta { delta } => emitter.emit_html_delta(delta, message_id),
        ProgressEvent::Media { kind, url, name } => emitter.emit_files(
            kind.as_str(),
            vec![FileRef {
                url: url.clone(),
                name: name.clone(),
            }],
            message_id,
        ),
    }
}

/// Extract text and media URIs from the last user message of an
/// OpenAI-format message list.
fn extract_last_user_message(openai_messages: &[Value]) -> (String, Vec<String>) {
    for msg in openai_messages.iter().rev() {
        if msg.get("role").and_then(|r| r.as_str()) != Some("user") {
            continue;
        }
        let content = msg.get("content");
        match content {
            Some(Value::String(text)) => return (text.clone(), Vec::new()),
            Some(Value::Array(parts)) => {
                let mut texts = Vec::new();
                let mut media = Vec::new();
                for part in parts {
                    match part.get("type").and_then(|t| t.as_str()) {
                        Some("text") => {
                            if let Some(t) = part.get("text").and_then(|t| t.as_str()) {
                                texts.push(t.to_string());
                            }
                        }
                        Some("image_url") => {
                            if let Some(url) = part
                                .get("image_url")
                                .and_then(|i| i.get("url"))
                                .and_then(|u| u.as_str())
                            {
                                media.push(url.to_string());
                            }
                        }
                        _ => {}
                    }
                }
                return (texts.join(" "), media);
            }
            _ => {}
        }
    }
    (String::new(), Vec::new())
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
