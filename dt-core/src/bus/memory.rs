//! In-process bus implementing both ports.
//!
//! One queue shared by all topics, with per-message invisibility
//! deadlines: a received-but-unacked message becomes receivable again
//! once its window elapses, which is exactly the redelivery behavior the
//! inbox dedup exists to absorb.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{BusError, InboundMessage, MessageConsumer, MessagePublisher};

#[derive(Debug, Clone)]
struct QueuedMessage {
    message_id: String,
    topic: String,
    payload: String,
    /// Hidden from `receive` until this instant. `None` = visible now.
    invisible_until: Option<Instant>,
}

/// In-process [`MessagePublisher`] + [`MessageConsumer`].
#[derive(Default)]
pub struct MemoryBus {
    queue: Mutex<Vec<QueuedMessage>>,
    next_id: AtomicU64,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of messages currently queued (visible or not).
    pub fn len(&self) -> usize {
        self.queue.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.lock().is_empty()
    }
}

#[async_trait]
impl MessagePublisher for MemoryBus {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), BusError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.queue.lock().push(QueuedMessage {
            message_id: format!("mem-{id}"),
            topic: topic.to_string(),
            payload: payload.to_string(),
            invisible_until: None,
        });
        Ok(())
    }
}

#[async_trait]
impl MessageConsumer for MemoryBus {
    async fn receive(
        &self,
        max_messages: usize,
        invisibility: Duration,
    ) -> Result<Vec<InboundMessage>, BusError> {
        let now = Instant::now();
        let mut queue = self.queue.lock();
        let mut received = Vec::new();
        for msg in queue.iter_mut() {
            if received.len() >= max_messages {
                break;
            }
            let visible = msg.invisible_until.map_or(true, |t| t <= now);
            if visible {
                msg.invisible_until = Some(now + invisibility);
                received.push(InboundMessage {
                    message_id: msg.message_id.clone(),
                    topic: msg.topic.clone(),
                    payload: msg.payload.clone(),
                });
            }
        }
        Ok(received)
    }

    async fn ack(&self, message: &InboundMessage) -> Result<(), BusError> {
        self.queue
            .lock()
            .retain(|m| !(m.message_id == message.message_id && m.topic == message.topic));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn received_messages_stay_invisible_until_window_elapses() {
        let bus = MemoryBus::new();
        bus.publish("game_drawn", "{}").await.unwrap();

        let first = bus.receive(16, Duration::from_millis(20)).await.unwrap();
        assert_eq!(first.len(), 1);

        // Still invisible.
        let second = bus.receive(16, Duration::from_millis(20)).await.unwrap();
        assert!(second.is_empty());

        // Visible again after the window: redelivery.
        tokio::time::sleep(Duration::from_millis(30)).await;
        let third = bus.receive(16, Duration::from_millis(20)).await.unwrap();
        assert_eq!(third.len(), 1);
        assert_eq!(third[0].message_id, first[0].message_id);
    }

    #[tokio::test]
    async fn ack_removes_the_message() {
        let bus = MemoryBus::new();
        bus.publish("bet_placed", "a").await.unwrap();
        bus.publish("bet_placed", "b").await.unwrap();

        let msgs = bus.receive(1, Duration::from_secs(10)).await.unwrap();
        assert_eq!(msgs.len(), 1);
        bus.ack(&msgs[0]).await.unwrap();
        assert_eq!(bus.len(), 1);

        let rest = bus.receive(16, Duration::from_secs(10)).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_ne!(rest[0].message_id, msgs[0].message_id);
    }
}
