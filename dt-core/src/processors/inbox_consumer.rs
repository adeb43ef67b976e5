//! InboxConsumer processor.
//!
//! The InboxConsumer is responsible for:
//! - Receiving batches from the message bus with an invisibility window
//! - Dedup-inserting each message into the inbox table
//! - Running the payload side effect for first-time messages only
//! - Acking each message individually
//!
//! A failed insert is not acked; the message becomes visible again after
//! the invisibility window and is retried. Graceful shutdown acks
//! nothing in flight.

use std::time::Duration;

use kanau::processor::Processor;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::bus::{InboundMessage, MessageConsumer};
use crate::clock::now_ms;
use crate::entities::inbox::UpsertInbox;
use crate::framework::DatabaseProcessor;

/// Receive behavior of the consumer.
#[derive(Debug, Clone)]
pub struct InboxConsumerConfig {
    /// Messages requested per receive call.
    pub max_messages: usize,
    /// How long received messages stay invisible to other receivers.
    pub invisibility: Duration,
    /// Pause after an empty or failed receive.
    pub idle_backoff: Duration,
}

impl Default for InboxConsumerConfig {
    fn default() -> Self {
        Self {
            max_messages: 16,
            invisibility: Duration::from_secs(20),
            idle_backoff: Duration::from_secs(1),
        }
    }
}

/// Receives bus messages and lands them in the inbox table.
pub struct InboxConsumer {
    processor: DatabaseProcessor,
    consumer: std::sync::Arc<dyn MessageConsumer>,
    config: InboxConsumerConfig,
}

impl InboxConsumer {
    pub fn new(
        processor: DatabaseProcessor,
        consumer: std::sync::Arc<dyn MessageConsumer>,
        config: InboxConsumerConfig,
    ) -> Self {
        Self {
            processor,
            consumer,
            config,
        }
    }

    /// Run until the shutdown signal flips.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!("InboxConsumer started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("InboxConsumer received shutdown signal");
                        break;
                    }
                }

                received = self.consumer.receive(self.config.max_messages, self.config.invisibility) => {
                    match received {
                        Ok(messages) if messages.is_empty() => {
                            tokio::time::sleep(self.config.idle_backoff).await;
                        }
                        Ok(messages) => {
                            for message in messages {
                                self.handle_message(&message).await;
                            }
                        }
                        Err(err) => {
                            warn!(error = %err, "inbox: receive failed");
                            tokio::time::sleep(self.config.idle_backoff).await;
                        }
                    }
                }
            }
        }

        info!("InboxConsumer shutdown complete");
    }

    /// Dedup-insert, side effect, ack. No ack when the insert fails.
    async fn handle_message(&self, message: &InboundMessage) {
        let first_seen = match self
            .processor
            .process(UpsertInbox {
                message_id: message.message_id.clone(),
                topic: message.topic.clone(),
                payload: message.payload.clone(),
                processed_at: now_ms(),
            })
            .await
        {
            Ok(first_seen) => first_seen,
            Err(err) => {
                warn!(
                    message_id = %message.message_id,
                    topic = %message.topic,
                    error = %err,
                    "inbox: upsert failed, leaving message for redelivery"
                );
                return;
            }
        };

        if first_seen {
            self.side_effect(message);
        } else {
            debug!(
                message_id = %message.message_id,
                topic = %message.topic,
                "inbox: duplicate delivery ignored"
            );
        }

        if let Err(err) = self.consumer.ack(message).await {
            warn!(
                message_id = %message.message_id,
                topic = %message.topic,
                error = %err,
                "inbox: ack failed"
            );
        }
    }

    /// Payload-specific processing for first-time messages.
    fn side_effect(&self, message: &InboundMessage) {
        let Ok(payload) = serde_json::from_str::<serde_json::Value>(&message.payload) else {
            return;
        };
        if payload.get("event").and_then(|v| v.as_str()) == Some("game_drawn") {
            let round_id = payload
                .get("game_round_id")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            let result = payload
                .get("result")
                .and_then(|v| v.as_str())
                .unwrap_or_default();
            info!(round_id, result, "inbox: consumed draw result");
        }
    }
}
