//! OutboxDispatcher processor.
//!
//! The OutboxDispatcher is responsible for:
//! - Polling pending outbox rows once per tick, oldest first
//! - Publishing each row's payload to the message bus
//! - Marking published rows sent
//! - Recording failures: retry counter, truncated error, dead after the
//!   retry budget is spent
//!
//! Delivery is at-least-once: a crash between publish and mark-sent
//! republishes the row, and consumers dedup via the inbox table. FIFO
//! within a topic is best-effort via id ordering only.

use std::sync::Arc;
use std::time::Duration;

use kanau::processor::Processor;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::bus::MessagePublisher;
use crate::entities::outbox::{ListOutboxPending, MarkOutboxFailed, MarkOutboxSent};
use crate::framework::DatabaseProcessor;

/// Polling and retry behavior of the dispatcher.
#[derive(Debug, Clone)]
pub struct OutboxDispatcherConfig {
    /// Pause between polls.
    pub tick: Duration,
    /// Rows fetched per poll.
    pub batch_size: i64,
    /// Budget for one publish call.
    pub publish_timeout: Duration,
}

impl Default for OutboxDispatcherConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            batch_size: 100,
            publish_timeout: Duration::from_secs(5),
        }
    }
}

/// Polls the outbox table and publishes pending rows.
pub struct OutboxDispatcher {
    processor: DatabaseProcessor,
    publisher: Arc<dyn MessagePublisher>,
    config: OutboxDispatcherConfig,
}

impl OutboxDispatcher {
    pub fn new(
        processor: DatabaseProcessor,
        publisher: Arc<dyn MessagePublisher>,
        config: OutboxDispatcherConfig,
    ) -> Self {
        Self {
            processor,
            publisher,
            config,
        }
    }

    /// Run until the shutdown signal flips.
    pub async fn run(self, mut shutdown_rx: watch::Receiver<bool>) {
        info!("OutboxDispatcher started");

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("OutboxDispatcher received shutdown signal");
                        break;
                    }
                }

                _ = tokio::time::sleep(self.config.tick) => {
                    if let Err(err) = self.dispatch_batch().await {
                        warn!(error = %err, "outbox: poll failed");
                    }
                }
            }
        }

        info!("OutboxDispatcher shutdown complete");
    }

    /// Publish one batch of pending rows.
    async fn dispatch_batch(&self) -> Result<(), sqlx::Error> {
        let rows = self
            .processor
            .process(ListOutboxPending {
                limit: self.config.batch_size,
            })
            .await?;

        if rows.is_empty() {
            return Ok(());
        }
        debug!(rows = rows.len(), "outbox: dispatching batch");

        for row in rows {
            let publish = tokio::time::timeout(
                self.config.publish_timeout,
                self.publisher.publish(&row.topic, &row.payload),
            )
            .await;

            match publish {
                Ok(Ok(())) => {
                    self.processor.process(MarkOutboxSent { id: row.id }).await?;
                    debug!(id = row.id, topic = %row.topic, biz_key = %row.biz_key, "outbox: sent");
                }
                Ok(Err(err)) => {
                    warn!(id = row.id, topic = %row.topic, error = %err, "outbox: publish failed");
                    self.processor
                        .process(MarkOutboxFailed {
                            id: row.id,
                            last_error: err.to_string(),
                        })
                        .await?;
                }
                Err(_) => {
                    warn!(id = row.id, topic = %row.topic, "outbox: publish timed out");
                    self.processor
                        .process(MarkOutboxFailed {
                            id: row.id,
                            last_error: "publish timeout".to_string(),
                        })
                        .await?;
                }
            }
        }

        Ok(())
    }
}
