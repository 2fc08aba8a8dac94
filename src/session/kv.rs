//! Key-value backend trait and the in-memory implementation.

use crate::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

/// TTL-capable key-value storage.
///
/// Object-safe: values are opaque byte strings, serialization lives in the
/// repository layer above. `Ok(None)` / `false` consistently mean "key absent
/// or already expired"; expiry is never an error.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Fetch the value at `key`, or `None` if absent or expired.
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Store `value` at `key`. `Some(ttl)` arms expiry; `None` persists until
    /// deleted.
    async fn set_bytes(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()>;

    /// Delete `key`. Idempotent.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Delete every key in `keys`, returning how many existed.
    async fn delete_many(&self, keys: &[String]) -> Result<usize>;

    /// Remaining TTL for `key`: `None` when the key is absent or has no
    /// expiry armed.
    async fn ttl(&self, key: &str) -> Result<Option<Duration>>;

    /// Re-arm expiry on an existing key. Returns `false` if the key is
    /// absent.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;

    /// All live keys starting with `prefix`. O(keyspace); callers treat this
    /// as a maintenance operation.
    async fn scan_keys(&self, prefix: &str) -> Result<Vec<String>>;

    /// Whether the backend is reachable.
    fn is_healthy(&self) -> bool;
}

struct Entry {
    value: Vec<u8>,
    deadline: Option<Instant>,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|d| d <= now)
    }
}

/// In-memory key-value store for development and tests.
///
/// A single mutex over a `HashMap` with per-entry deadlines. Expired entries
/// are dropped lazily on read and swept during scans; there is no background
/// reaper, which is fine at dev-workload sizes.
#[derive(Default)]
pub struct InMemoryKv {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryKv {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (unexpired) entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .lock()
            .await
            .values()
            .filter(|e| !e.is_expired(now))
            .count()
    }

    /// Whether the store holds no live entries.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKv {
    async fn get_bytes(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if entry.is_expired(Instant::now()) => {
                entries.remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    async fn set_bytes(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>) -> Result<()> {
        let entry = Entry {
            value,
            deadline: ttl.map(|t| Instant::now() + t),
        };
        self.entries.lock().await.insert(key.to_string(), entry);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.entries.lock().await.remove(key);
        Ok(())
    }

    async fn delete_many(&self, keys: &[String]) -> Result<usize> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        let mut removed = 0;
        for key in keys {
            if let Some(entry) = entries.remove(key) {
                if !entry.is_expired(now) {
                    removed += 1;
                }
            }
        }
        Ok(removed)
    }

    async fn ttl(&self, key: &str) -> Result<Option<Duration>> {
        let entries = self.entries.lock().await;
        let now = Instant::now();
        Ok(entries
            .get(key)
            .filter(|e| !e.is_expired(now))
            .and_then(|e| e.deadline)
            .map(|deadline| deadline.saturating_duration_since(now)))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        match entries.get_mut(key) {
            Some(entry) if entry.is_expired(now) => {
                entries.remove(key);
                Ok(false)
            }
            Some(entry) => {
                entry.deadline = Some(now + ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn scan_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut entries = self.entries.lock().await;
        let now = Instant::now();
        entries.retain(|_, e| !e.is_expired(now));
        Ok(entries
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn is_healthy(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_get_delete() {
        let kv = InMemoryKv::new();
        kv.set_bytes("k1", b"v1".to_vec(), None).await.unwrap();

        assert_eq!(kv.get_bytes("k1").await.unwrap(), Some(b"v1".to_vec()));
        assert_eq!(kv.get_bytes("missing").await.unwrap(), None);

        kv.delete("k1").await.unwrap();
        assert_eq!(kv.get_bytes("k1").await.unwrap(), None);
        // Idempotent.
        kv.delete("k1").await.unwrap();
    }

    #[tokio::test]
    async fn test_ttl_expiry() {
        let kv = InMemoryKv::new();
        kv.set_bytes("k1", b"v1".to_vec(), Some(Duration::from_millis(20)))
            .await
            .unwrap();

        assert!(kv.get_bytes("k1").await.unwrap().is_some());
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(kv.get_bytes("k1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_ttl_reports_remaining() {
        let kv = InMemoryKv::new();
        kv.set_bytes("k1", b"v1".to_vec(), Some(Duration::from_secs(60)))
            .await
            .unwrap();
        kv.set_bytes("k2", b"v2".to_vec(), None).await.unwrap();

        let remaining = kv.ttl("k1").await.unwrap().unwrap();
        assert!(remaining <= Duration::from_secs(60));
        assert!(remaining > Duration::from_secs(50));

        // No expiry armed, and absent key.
        assert_eq!(kv.ttl("k2").await.unwrap(), None);
        assert_eq!(kv.ttl("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_expire_rearms_deadline() {
        let kv = InMemoryKv::new();
        kv.set_bytes("k1", b"v1".to_vec(), Some(Duration::from_millis(20)))
            .await
            .unwrap();

        assert!(kv.expire("k1", Duration::from_secs(60)).await.unwrap());
        tokio::time::sleep(Duration::from_millis(40)).await;
        // Would have expired under the original deadline.
        assert!(kv.get_bytes("k1").await.unwrap().is_some());

        assert!(!kv.expire("missing", Duration::from_secs(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_scan_keys_by_prefix() {
        let kv = InMemoryKv::new();
        kv.set_bytes("session:a", b"1".to_vec(), None).await.unwrap();
        kv.set_bytes("session:b", b"2".to_vec(), None).await.unwrap();
        kv.set_bytes("other:c", b"3".to_vec(), None).await.unwrap();

        let mut keys = kv.scan_keys("session:").await.unwrap();
        keys.sort();
        assert_eq!(keys, vec!["session:a", "session:b"]);
    }

    #[tokio::test]
    async fn test_scan_skips_expired() {
        let kv = InMemoryKv::new();
        kv.set_bytes("session:a", b"1".to_vec(), Some(Duration::from_millis(10)))
            .await
            .unwrap();
        kv.set_bytes("session:b", b"2".to_vec(), None).await.unwrap();

        tokio::time::sleep(Duration::from_millis(30)).await;
        let keys = kv.scan_keys("session:").await.unwrap();
        assert_eq!(keys, vec!["session:b"]);
    }

    #[tokio::test]
    async fn test_delete_many_counts_existing() {
        let kv = InMemoryKv::new();
        kv.set_bytes("a", b"1".to_vec(), None).await.unwrap();
        kv.set_bytes("b", b"2".to_vec(), None).await.unwrap();

        let removed = kv
            .delete_many(&["a".to_string(), "b".to_string(), "ghost".to_string()])
            .await
            .unwrap();
        assert_eq!(removed, 2);
        assert!(kv.is_empty().await);
    }
}
