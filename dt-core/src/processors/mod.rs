//! Long-running background processors.
//!
//! - `OutboxDispatcher`: polls pending outbox rows and publishes them to
//!   the bus with bounded retries.
//! - `InboxConsumer`: receives bus messages, dedup-inserts them into the
//!   inbox table and acks.
//!
//! Both run until their shutdown watch channel flips to `true`.

pub mod inbox_consumer;
pub mod outbox_dispatcher;

pub use inbox_consumer::{InboxConsumer, InboxConsumerConfig};
pub use outbox_dispatcher::{OutboxDispatcher, OutboxDispatcherConfig};
