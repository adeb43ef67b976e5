//! Message bus ports.
//!
//! The dispatcher publishes outbox rows through [`MessagePublisher`] and
//! the inbox consumer receives through [`MessageConsumer`]. Delivery is
//! at-least-once end to end: the dispatcher retries failed publishes and
//! consumers dedup by `(message_id, topic)` via the inbox table, so the
//! broker binding behind these traits only needs basic publish/receive/
//! ack semantics. [`MemoryBus`] implements both for single-process use
//! and the test suite.

pub mod memory;

use std::time::Duration;

use async_trait::async_trait;

pub use memory::MemoryBus;

/// Error from the bus binding.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("publish failed: {0}")]
    Publish(String),
    #[error("receive failed: {0}")]
    Receive(String),
    #[error("ack failed: {0}")]
    Ack(String),
}

/// A message handed to the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Broker-assigned message id; dedup key together with the topic.
    pub message_id: String,
    pub topic: String,
    pub payload: String,
}

/// Publishing side of the bus.
#[async_trait]
pub trait MessagePublisher: Send + Sync {
    /// Publish one message to a topic.
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), BusError>;
}

/// Consuming side of the bus.
///
/// Received messages stay invisible to other receivers for
/// `invisibility`; anything not acked becomes visible again after the
/// window elapses.
#[async_trait]
pub trait MessageConsumer: Send + Sync {
    /// Receive up to `max_messages`, waiting briefly when none are ready.
    async fn receive(
        &self,
        max_messages: usize,
        invisibility: Duration,
    ) -> Result<Vec<InboundMessage>, BusError>;

    /// Acknowledge one message as processed.
    async fn ack(&self, message: &InboundMessage) -> Result<(), BusError>;
}
