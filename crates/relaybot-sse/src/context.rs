//! Request context — per-HTTP-request identity carried through the pipeline.
//!
//! Each incoming SSE request creates one [`RequestContext`] that travels
//! from the handler, through the agent loop, to the emitter. The mutable
//! runtime state (event ordering, current message id) lives behind atomics
//! and a mutex so the context can be shared by reference across tasks.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::models::SseRequest;

/// Context for a single SSE request.
#[derive(Debug)]
pub struct RequestContext {
    // --- identifiers ---
    pub session_id: String,
    pub request_id: String,

    // --- request parameters ---
    pub agent_type: String,
    pub skill_list: Vec<String>,
    pub tool_list: Vec<String>,
    pub workflow_list: Vec<String>,
    pub stream: bool,
    pub enable_thinking: bool,

    // --- runtime state ---
    message_order: AtomicU64,
    current_message_id: Mutex<Option<String>>,
}

impl RequestContext {
    /// Build a context directly from identifiers (tests, internal callers).
    pub fn new(session_id: impl Into<String>, request_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            request_id: request_id.into(),
            agent_type: "agent".to_string(),
            skill_list: vec!["*".to_string()],
            tool_list: vec!["*".to_string()],
            workflow_list: Vec::new(),
            stream: true,
            enable_thinking: false,
            message_order: AtomicU64::new(0),
            current_message_id: Mutex::new(None),
        }
    }

    /// Build a context from a validated request body.
    pub fn from_request(req: &SseRequest) -> Self {
        Self {
            session_id: req.session_id.clone(),
            request_id: req.request_id.clone(),
            agent_type: req.agent_type.clone(),
            skill_list: req.skill_list.clone(),
            tool_list: req.tool_list.clone(),
            workflow_list: req.workflow_list.clone(),
            stream: req.stream,
            enable_thinking: req.enable_thinking,
            message_order: AtomicU64::new(0),
            current_message_id: Mutex::new(None),
        }
    }

    /// Return the next message order number (1-based, strictly increasing).
    pub fn next_order(&self) -> u64 {
        self.message_order.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Mint and cache a new message ID (groups all events of one cycle).
    pub fn new_message_id(&self) -> String {
        let id = uuid::Uuid::new_v4().simple().to_string()[..16].to_string();
        let mut current = self.current_message_id.lock().unwrap();
        *current = Some(id.clone());
        id
    }

    /// Return the current message ID, minting one lazily on first access.
    pub fn current_message_id(&self) -> String {
        {
            let current = self.current_message_id.lock().unwrap();
            if let Some(ref id) = *current {
                return id.clone();
            }
        }
        self.new_message_id()
    }

    /// Session key in the bus/session-store format.
    pub fn session_key(&self) -> String {
        format!("sse:{}", self.session_id)
    }
}
