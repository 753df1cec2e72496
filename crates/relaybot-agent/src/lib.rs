//! Relaybot agent — the reason-act engine and its tool surface.
//!
//! This crate contains:
//! - **tools**: the Tool trait, registry, and built-in tools (filesystem,
//!   shell, web, message, spawn, schedule, storage)
//! - **patterns**: the glob matcher scoping tool and skill selection
//! - **context**: system prompt and message-list construction
//! - **subagent**: background task delegation
//! - **agent_loop**: the reason-act loop with bus, direct, and SSE entry
//!   points

pub mod agent_loop;
pub mod context;
pub mod memory;
pub mod patterns;
pub mod skills;
pub mod subagent;
pub mod tools;

pub use agent_loop::{AgentLoop, AgentLoopConfig};
pub use context::ContextBuilder;
pub use memory::MemoryStore;
pub use skills::SkillsLoader;
pub use subagent::SubagentManager;
pub use tools::{Tool, ToolRegistry};
