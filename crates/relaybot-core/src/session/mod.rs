//! Session persistence — per-conversation append logs keyed by `channel:chat_id`.

pub mod manager;

pub use manager::{SessionManager, SessionSummary};
