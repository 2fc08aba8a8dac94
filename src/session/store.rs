//! Session repository: key prefixing, TTL defaults, and the JSON codec.

use crate::error::{AuthError, Result};
use crate::session::kv::KeyValueStore;
use crate::store::now_millis;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Prefix under which every session document lives in the key-value store.
pub const SESSION_KEY_PREFIX: &str = "session:";

/// Default session lifetime: 7 days.
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// The session document stored under `session:<id>`.
///
/// The session id lives only in the key. `expires_at` is the authoritative
/// deadline (epoch millis); the store TTL mirrors it as a backstop that
/// reclaims storage without a read.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub user_id: String,
    /// Issue time (epoch millis).
    pub created_at: i64,
    /// Authoritative expiry deadline (epoch millis).
    pub expires_at: i64,
    /// Caller-defined payload carried alongside the session.
    #[serde(default)]
    pub data: HashMap<String, Value>,
}

impl SessionRecord {
    /// Build a record for `user_id` expiring `ttl` from now.
    #[must_use]
    pub fn new(user_id: impl Into<String>, ttl: Duration, data: HashMap<String, Value>) -> Self {
        let now = now_millis();
        Self {
            user_id: user_id.into(),
            created_at: now,
            expires_at: now + ttl.as_millis() as i64,
            data,
        }
    }

    /// Whether the authoritative deadline has passed.
    #[must_use]
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at <= now
    }
}

/// Repository over a [`KeyValueStore`].
///
/// All keys are namespaced with [`SESSION_KEY_PREFIX`]; payloads are JSON. A
/// payload that fails to parse is treated as absent and deleted, never
/// surfaced as an error; a corrupt session is indistinguishable from a
/// missing one to callers, which is the safe direction to fail.
pub struct SessionStore<K: KeyValueStore> {
    kv: Arc<K>,
    ttl: Duration,
}

impl<K: KeyValueStore> Clone for SessionStore<K> {
    fn clone(&self) -> Self {
        Self {
            kv: Arc::clone(&self.kv),
            ttl: self.ttl,
        }
    }
}

impl<K: KeyValueStore> SessionStore<K> {
    /// Create a store with the default 7-day TTL.
    #[must_use]
    pub fn new(kv: Arc<K>) -> Self {
        Self {
            kv,
            ttl: DEFAULT_SESSION_TTL,
        }
    }

    /// Override the default TTL.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// The configured default TTL.
    #[must_use]
    pub fn default_ttl(&self) -> Duration {
        self.ttl
    }

    fn key(session_id: &str) -> String {
        format!("{}{}", SESSION_KEY_PREFIX, session_id)
    }

    /// Write a session document, arming expiry with `ttl` (or the default).
    pub async fn put(
        &self,
        session_id: &str,
        record: &SessionRecord,
        ttl: Option<Duration>,
    ) -> Result<()> {
        let bytes = serde_json::to_vec(record)
            .map_err(|e| AuthError::internal(format!("session serialization failed: {}", e)))?;
        self.kv
            .set_bytes(&Self::key(session_id), bytes, Some(ttl.unwrap_or(self.ttl)))
            .await
    }

    /// Read a session document. Absent, expired-in-store, and corrupt all
    /// come back as `None`.
    pub async fn get(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        let key = Self::key(session_id);
        let Some(bytes) = self.kv.get_bytes(&key).await? else {
            return Ok(None);
        };
        match serde_json::from_slice::<SessionRecord>(&bytes) {
            Ok(record) => Ok(Some(record)),
            Err(e) => {
                tracing::debug!(
                    target: "session.store.corrupt",
                    session_id = %session_id,
                    error = %e,
                    "Discarding unparseable session payload"
                );
                self.kv.delete(&key).await?;
                Ok(None)
            }
        }
    }

    /// Merge `fields` into the session's data map and rewrite the document,
    /// preserving the remaining TTL (falling back to the default when the
    /// backend cannot report one).
    pub async fn update_data(
        &self,
        session_id: &str,
        fields: HashMap<String, Value>,
    ) -> Result<SessionRecord> {
        let mut record = self
            .get(session_id)
            .await?
            .ok_or(AuthError::SessionNotFound)?;
        record.data.extend(fields);

        let remaining = self.kv.ttl(&Self::key(session_id)).await?;
        self.put(session_id, &record, remaining).await?;
        Ok(record)
    }

    /// Push the session's deadline out to `ttl` from now (or the default),
    /// rewriting the authoritative `expires_at` and re-arming the store TTL
    /// so both expiry mechanisms move together.
    pub async fn extend(
        &self,
        session_id: &str,
        ttl: Option<Duration>,
    ) -> Result<SessionRecord> {
        let mut record = self
            .get(session_id)
            .await?
            .ok_or(AuthError::SessionNotFound)?;
        let ttl = ttl.unwrap_or(self.ttl);
        record.expires_at = now_millis() + ttl.as_millis() as i64;
        self.put(session_id, &record, Some(ttl)).await?;
        Ok(record)
    }

    /// Delete a session document. Idempotent.
    pub async fn delete(&self, session_id: &str) -> Result<()> {
        self.kv.delete(&Self::key(session_id)).await
    }

    /// Delete every session belonging to `user_id`, returning how many were
    /// removed. Scans the whole session keyspace; maintenance-class.
    pub async fn delete_all_for_user(&self, user_id: &str) -> Result<usize> {
        let keys = self.kv.scan_keys(SESSION_KEY_PREFIX).await?;
        let mut doomed = Vec::new();
        for key in keys {
            let Some(bytes) = self.kv.get_bytes(&key).await? else {
                continue;
            };
            // Unparseable payloads are skipped here; the next read deletes
            // them.
            if let Ok(record) = serde_json::from_slice::<SessionRecord>(&bytes) {
                if record.user_id == user_id {
                    doomed.push(key);
                }
            }
        }
        self.kv.delete_many(&doomed).await
    }

    /// Whether the backend is reachable.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.kv.is_healthy()
    }
}
