//! Tool modules for the Relaybot agent.

pub mod base;
pub mod filesystem;
pub mod message;
pub mod registry;
pub mod schedule;
pub mod shell;
pub mod spawn;
pub mod storage;
pub mod web;

pub use base::{
    optional_bool, optional_i64, optional_string, require_string, MediaKind, ProgressEvent,
    ProgressSlot, Tool,
};
pub use registry::{ToolDeps, ToolRegistry};
