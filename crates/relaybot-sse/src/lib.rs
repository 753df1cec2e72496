//! SSE protocol layer — the wire schema, per-request context, and emitter
//! shared by the agent loop and the HTTP surface.

pub mod context;
pub mod emitter;
pub mod models;

pub use context::RequestContext;
pub use emitter::SseEmitter;
pub use models::{FileRef, SseMessage, SseMessageBody, SseRequest};
