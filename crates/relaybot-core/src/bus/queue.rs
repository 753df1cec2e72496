//! Async message bus — two FIFO queues decoupling channels from the agent.
//!
//! Built on bounded `tokio::sync::mpsc` channels. Publishing never blocks
//! the producer: when a queue is full, `publish_*` fails and the caller is
//! expected to drop the message with a warning. The bound applies to both
//! queues alike.
//!
//! Topology: any number of producers, exactly one long-running consumer per
//! queue. A second consumer would compete first-come per element, not
//! broadcast.

use super::types::{InboundMessage, OutboundMessage};
use tokio::sync::mpsc;

/// Error returned when a bus queue rejects a publish.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("bus queue is full")]
    Full,
    #[error("bus queue is closed")]
    Closed,
}

/// The message bus connecting channels ↔ agent loop.
///
/// - Channels publish to `inbound` (user messages arriving)
/// - Agent loop consumes from `inbound`, processes, publishes to `outbound`
/// - Channel adapters consume from `outbound` and deliver natively
pub struct MessageBus {
    inbound_tx: mpsc::Sender<InboundMessage>,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundMessage>>,
    outbound_tx: mpsc::Sender<OutboundMessage>,
    outbound_rx: tokio::sync::Mutex<mpsc::Receiver<OutboundMessage>>,
}

impl MessageBus {
    /// Create a new message bus with the given per-queue capacity.
    pub fn new(capacity: usize) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(capacity);
        let (outbound_tx, outbound_rx) = mpsc::channel(capacity);

        MessageBus {
            inbound_tx,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
            outbound_tx,
            outbound_rx: tokio::sync::Mutex::new(outbound_rx),
        }
    }

    /// Publish a message from a channel to the agent (inbound).
    ///
    /// Never blocks; fails with [`BusError::Full`] when the queue is at
    /// capacity.
    pub fn publish_inbound(&self, msg: InboundMessage) -> Result<(), BusError> {
        self.inbound_tx.try_send(msg).map_err(Self::map_send_err)
    }

    /// Publish a response from the agent to a channel (outbound).
    pub fn publish_outbound(&self, msg: OutboundMessage) -> Result<(), BusError> {
        self.outbound_tx.try_send(msg).map_err(Self::map_send_err)
    }

    /// Consume the next inbound message (awaits until available).
    ///
    /// Returns None if all senders are dropped. Callers needing prompt
    /// cancellation wrap this in `tokio::time::timeout`.
    pub async fn consume_inbound(&self) -> Option<InboundMessage> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await
    }

    /// Consume the next outbound message (awaits until available).
    pub async fn consume_outbound(&self) -> Option<OutboundMessage> {
        let mut rx = self.outbound_rx.lock().await;
        rx.recv().await
    }

    fn map_send_err<T>(err: mpsc::error::TrySendError<T>) -> BusError {
        match err {
            mpsc::error::TrySendError::Full(_) => BusError::Full,
            mpsc::error::TrySendError::Closed(_) => BusError::Closed,
        }
    }
}
