//! Fast-path key-value layer.
//!
//! The KV store carries the idempotency result cache, the in-flight
//! locks and the round snapshots. It is strictly a latency optimization
//! plus an in-flight deduplicator: every uniqueness guarantee traces to
//! a SQL UNIQUE constraint, and every call site treats a KV error as
//! "skip this layer". Correctness must survive a complete KV outage.

pub mod keys;
pub mod memory;
pub mod redis;

use std::time::Duration;

use async_trait::async_trait;

pub use self::memory::MemoryKv;
pub use self::redis::RedisKv;

/// Error from the KV backend. Callers log these at `warn` and degrade.
#[derive(Debug, thiserror::Error)]
pub enum KvError {
    #[error("redis error: {0}")]
    Redis(#[from] ::redis::RedisError),
}

/// Minimal KV surface the engines need.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Read a value.
    async fn get(&self, key: &str) -> Result<Option<String>, KvError>;

    /// Write a value with a TTL (last writer wins).
    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError>;

    /// Write a value with a TTL only if the key is absent.
    ///
    /// Returns `true` when the write happened (the lock was acquired).
    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, KvError>;

    /// Delete a key unconditionally.
    async fn del(&self, key: &str) -> Result<(), KvError>;

    /// Delete a key only while it still holds `value`.
    ///
    /// This is the lock release: an expired lock re-acquired by another
    /// owner holds a different token and is left alone. Returns `true`
    /// when the key was deleted.
    async fn del_if_value(&self, key: &str, value: &str) -> Result<bool, KvError>;
}

/// No-op store used when no KV backend is configured.
///
/// `get` never hits, `set_nx_ex` always grants, deletes do nothing —
/// exactly the degraded mode the engines fall into when a real backend
/// errors, so running without KV changes latency, never outcomes.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledKv;

#[async_trait]
impl KvStore for DisabledKv {
    async fn get(&self, _key: &str) -> Result<Option<String>, KvError> {
        Ok(None)
    }

    async fn set_ex(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<(), KvError> {
        Ok(())
    }

    async fn set_nx_ex(&self, _key: &str, _value: &str, _ttl: Duration) -> Result<bool, KvError> {
        Ok(true)
    }

    async fn del(&self, _key: &str) -> Result<(), KvError> {
        Ok(())
    }

    async fn del_if_value(&self, _key: &str, _value: &str) -> Result<bool, KvError> {
        Ok(true)
    }
}
