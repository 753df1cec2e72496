//! Message bus — the in-process pub/sub spine between channels and the agent.

pub mod queue;
pub mod types;

pub use queue::{BusError, MessageBus};
pub use types::{InboundMessage, OutboundMessage};
