//! Relational entities and their access paths.
//!
//! Transaction-scoped operations are inherent `*_tx` methods taking a
//! `&mut sqlx::Transaction`; one-shot pool-scoped commands implement
//! `kanau::processor::Processor` against
//! [`crate::framework::DatabaseProcessor`].

pub mod customers;
pub mod game_event_audit;
pub mod idempotency_keys;
pub mod inbox;
pub mod orders;
pub mod outbox;
pub mod rounds;
pub mod settlement_log;
pub mod wallet_ledger;

pub use customers::Customer;
pub use game_event_audit::GameEventAudit;
pub use idempotency_keys::IdempotencyKey;
pub use orders::{BillStatus, NewOrder, PendingOrder, PlayType};
pub use outbox::{OutboxRow, OutboxStatus};
pub use rounds::Round;
pub use settlement_log::SettlementLog;
pub use wallet_ledger::{LedgerBizType, WalletLedger};
