//! In-process [`KvStore`] with real TTL semantics.
//!
//! Single-node stand-in used by the test suite and available for local
//! development. Entries expire lazily on access.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{KvError, KvStore};

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

/// Mutex-guarded map behaving like the Redis subset the engines use.
#[derive(Default)]
pub struct MemoryKv {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    fn live_value(&self, key: &str) -> Option<String> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }
}

#[async_trait]
impl KvStore for MemoryKv {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        Ok(self.live_value(key))
    }

    async fn set_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<(), KvError> {
        self.entries.lock().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn set_nx_ex(&self, key: &str, value: &str, ttl: Duration) -> Result<bool, KvError> {
        if self.live_value(key).is_some() {
            return Ok(false);
        }
        self.entries.lock().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(true)
    }

    async fn del(&self, key: &str) -> Result<(), KvError> {
        self.entries.lock().remove(key);
        Ok(())
    }

    async fn del_if_value(&self, key: &str, value: &str) -> Result<bool, KvError> {
        let mut entries = self.entries.lock();
        match entries.get(key) {
            Some(entry) if entry.expires_at > Instant::now() && entry.value == value => {
                entries.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_nx_grants_once_until_expiry() {
        let kv = MemoryKv::new();
        assert!(kv
            .set_nx_ex("lock", "a", Duration::from_secs(60))
            .await
            .unwrap());
        assert!(!kv
            .set_nx_ex("lock", "b", Duration::from_secs(60))
            .await
            .unwrap());
        assert_eq!(kv.get("lock").await.unwrap().as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn expired_entries_are_gone() {
        let kv = MemoryKv::new();
        kv.set_ex("k", "v", Duration::from_millis(1)).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(kv.get("k").await.unwrap(), None);
        assert!(kv.set_nx_ex("k", "w", Duration::from_secs(60)).await.unwrap());
    }

    #[tokio::test]
    async fn del_if_value_only_matches_own_token() {
        let kv = MemoryKv::new();
        kv.set_ex("lock", "token-a", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(!kv.del_if_value("lock", "token-b").await.unwrap());
        assert!(kv.del_if_value("lock", "token-a").await.unwrap());
        assert_eq!(kv.get("lock").await.unwrap(), None);
    }
}
