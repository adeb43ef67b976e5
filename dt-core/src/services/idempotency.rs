//! KV layers of the idempotency protocol.
//!
//! Three layers guard a bet attempt:
//!
//! 1. result cache read — a duplicate of a committed attempt returns the
//!    cached result without taking any locks;
//! 2. in-flight lock — SET-NX with a random token absorbs concurrent
//!    duplicates while the first attempt is still running;
//! 3. the `(idempotency_key, purpose)` UNIQUE row inside the bet
//!    transaction — the only load-bearing layer.
//!
//! This module owns layers 1 and 2 plus the result write-back. Layer 3
//! lives in [`crate::entities::idempotency_keys`]. A KV error anywhere
//! here degrades to "layer skipped": the caller proceeds and the UNIQUE
//! row stays authoritative.

use std::time::Duration;

use uuid::Uuid;

use crate::kv::{keys, KvStore};

/// TTLs of the two KV layers.
#[derive(Debug, Clone)]
pub struct IdemConfig {
    /// In-flight lock TTL. Must outlive the worst-case bet transaction —
    /// and therefore the betting window — so a retry can never observe
    /// neither the lock nor the persisted row.
    pub lock_ttl: Duration,
    /// Result cache TTL. Longer than the lock TTL so clients that back
    /// off before retrying still hit the cache.
    pub result_ttl: Duration,
}

impl Default for IdemConfig {
    fn default() -> Self {
        Self {
            lock_ttl: Duration::from_secs(45),
            result_ttl: Duration::from_secs(120),
        }
    }
}

/// A held in-flight lock. Must be released via [`InFlightLock::release`]
/// on every exit path; an unreleased lock only delays duplicates until
/// the TTL expires.
#[derive(Debug)]
pub struct InFlightLock {
    key: String,
    token: String,
}

impl InFlightLock {
    /// Compare-and-delete release. Deleting is best-effort: an expired
    /// lock held by a new owner is left alone.
    pub async fn release(self, kv: &dyn KvStore) {
        match kv.del_if_value(&self.key, &self.token).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(key = %self.key, "in-flight lock already released or expired");
            }
            Err(err) => {
                tracing::warn!(key = %self.key, error = %err, "failed to release in-flight lock");
            }
        }
    }
}

/// Outcome of [`IdemCoordinator::begin`].
#[derive(Debug)]
pub enum IdemBegin {
    /// The lock was acquired (or KV is down and the layer is skipped).
    Proceed(Option<InFlightLock>),
    /// Another attempt holds the lock but its result is already cached.
    CachedResult(String),
    /// Another attempt holds the lock and has not finished.
    InFlight,
}

/// Layers 1 and 2 of the idempotency protocol over a [`KvStore`].
pub struct IdemCoordinator<'a> {
    kv: &'a dyn KvStore,
    config: &'a IdemConfig,
}

impl<'a> IdemCoordinator<'a> {
    pub fn new(kv: &'a dyn KvStore, config: &'a IdemConfig) -> Self {
        Self { kv, config }
    }

    /// Layer 1: cached result of a committed attempt, if any.
    pub async fn cached_result(&self, idempotency_key: &str) -> Option<String> {
        match self.kv.get(&keys::idem_result_key(idempotency_key)).await {
            Ok(hit) => hit,
            Err(err) => {
                tracing::warn!(error = %err, "result cache read failed, skipping KV layer");
                None
            }
        }
    }

    /// Layer 2: take the in-flight lock.
    ///
    /// On contention the result cache is re-checked once — the holder
    /// may have committed between our layer-1 read and now.
    pub async fn begin(&self, idempotency_key: &str) -> IdemBegin {
        let lock_key = keys::idem_lock_key(idempotency_key);
        let token = Uuid::new_v4().to_string();

        match self
            .kv
            .set_nx_ex(&lock_key, &token, self.config.lock_ttl)
            .await
        {
            Ok(true) => IdemBegin::Proceed(Some(InFlightLock {
                key: lock_key,
                token,
            })),
            Ok(false) => match self.cached_result(idempotency_key).await {
                Some(result) => IdemBegin::CachedResult(result),
                None => IdemBegin::InFlight,
            },
            Err(err) => {
                tracing::warn!(error = %err, "in-flight lock unavailable, skipping KV layer");
                IdemBegin::Proceed(None)
            }
        }
    }

    /// Cache a committed result for duplicate retries.
    pub async fn store_result(&self, idempotency_key: &str, result_json: &str) {
        if let Err(err) = self
            .kv
            .set_ex(
                &keys::idem_result_key(idempotency_key),
                result_json,
                self.config.result_ttl,
            )
            .await
        {
            tracing::warn!(error = %err, "result cache write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryKv;

    fn config() -> IdemConfig {
        IdemConfig::default()
    }

    #[tokio::test]
    async fn second_begin_reports_in_flight() {
        let kv = MemoryKv::new();
        let cfg = config();
        let coord = IdemCoordinator::new(&kv, &cfg);

        let first = coord.begin("K1").await;
        assert!(matches!(first, IdemBegin::Proceed(Some(_))));

        let second = coord.begin("K1").await;
        assert!(matches!(second, IdemBegin::InFlight));
    }

    #[tokio::test]
    async fn contended_begin_returns_cached_result_when_present() {
        let kv = MemoryKv::new();
        let cfg = config();
        let coord = IdemCoordinator::new(&kv, &cfg);

        let IdemBegin::Proceed(Some(_lock)) = coord.begin("K1").await else {
            panic!("expected lock");
        };
        coord.store_result("K1", r#"{"bill_no":"B1"}"#).await;

        let second = coord.begin("K1").await;
        match second {
            IdemBegin::CachedResult(json) => assert!(json.contains("B1")),
            other => panic!("expected cached result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn release_frees_the_key_for_the_next_attempt() {
        let kv = MemoryKv::new();
        let cfg = config();
        let coord = IdemCoordinator::new(&kv, &cfg);

        let IdemBegin::Proceed(Some(lock)) = coord.begin("K1").await else {
            panic!("expected lock");
        };
        lock.release(&kv).await;

        assert!(matches!(coord.begin("K1").await, IdemBegin::Proceed(Some(_))));
    }

    #[tokio::test]
    async fn result_cache_round_trips() {
        let kv = MemoryKv::new();
        let cfg = config();
        let coord = IdemCoordinator::new(&kv, &cfg);

        assert_eq!(coord.cached_result("K1").await, None);
        coord.store_result("K1", "{}").await;
        assert_eq!(coord.cached_result("K1").await.as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn disabled_kv_always_grants_and_never_caches() {
        let kv = crate::kv::DisabledKv;
        let cfg = config();
        let coord = IdemCoordinator::new(&kv, &cfg);

        // Every attempt proceeds: dedup falls through to the SQL layer.
        assert!(matches!(coord.begin("K1").await, IdemBegin::Proceed(Some(_))));
        assert!(matches!(coord.begin("K1").await, IdemBegin::Proceed(Some(_))));
        coord.store_result("K1", "{}").await;
        assert_eq!(coord.cached_result("K1").await, None);
    }
}
