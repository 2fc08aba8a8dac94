//! Session lifecycle policy with tracing.
//!
//! # Tracing Events
//!
//! - `auth.session.created` - New session issued
//! - `auth.session.expired` - Stale session discarded on read
//! - `auth.session.revoked` - Session explicitly invalidated
//! - `auth.session.revoke_all` - All of a user's sessions invalidated
//! - `auth.session.refreshed` - Session id rotated

use crate::error::{AuthError, Result};
use crate::session::kv::KeyValueStore;
use crate::session::store::{SessionRecord, SessionStore};
use crate::store::{now_millis, User, UserStore};
use crate::token::generate_session_id;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Issues, validates, extends, rotates, and revokes sessions.
///
/// Expiry is lazy: every read checks the record's own `expires_at` and
/// discards the session if it has passed, regardless of what the store TTL
/// says. The store TTL only bounds how long an unread stale session occupies
/// storage.
///
/// `create_session` is also the entry point for alternate credential
/// ceremonies: a caller that has already verified a passkey assertion (or any
/// other factor) issues a session here directly, bypassing the password path.
pub struct SessionManager<K: KeyValueStore, U: UserStore> {
    store: SessionStore<K>,
    users: Arc<U>,
}

impl<K: KeyValueStore, U: UserStore> Clone for SessionManager<K, U> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            users: Arc::clone(&self.users),
        }
    }
}

impl<K: KeyValueStore, U: UserStore> SessionManager<K, U> {
    /// Create a manager over a session store and a user store.
    #[must_use]
    pub fn new(store: SessionStore<K>, users: Arc<U>) -> Self {
        Self { store, users }
    }

    /// Issue a new session for `user_id`, returning the session id.
    pub async fn create_session(
        &self,
        user_id: &str,
        data: HashMap<String, Value>,
    ) -> Result<String> {
        let session_id = generate_session_id();
        let record = SessionRecord::new(user_id, self.store.default_ttl(), data);
        self.store.put(&session_id, &record, None).await?;

        tracing::info!(
            target: "auth.session.created",
            user_id = %user_id,
            expires_at = record.expires_at,
            "New session created"
        );
        Ok(session_id)
    }

    /// Resolve a session id to its record, enforcing lazy expiry.
    ///
    /// Absent and expired both come back as `None`; an expired record is
    /// deleted on the spot.
    pub async fn validate_session(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        let Some(record) = self.store.get(session_id).await? else {
            return Ok(None);
        };
        if record.is_expired(now_millis()) {
            self.store.delete(session_id).await?;
            tracing::debug!(
                target: "auth.session.expired",
                user_id = %record.user_id,
                "Discarded expired session on read"
            );
            return Ok(None);
        }
        Ok(Some(record))
    }

    /// Resolve a session id to its user.
    ///
    /// Absent session and absent user both yield `None`; neither is an
    /// error, since a user row may be deleted while sessions still exist.
    pub async fn current_user(&self, session_id: &str) -> Result<Option<User>> {
        let Some(record) = self.validate_session(session_id).await? else {
            return Ok(None);
        };
        self.users.find_by_id(&record.user_id).await
    }

    /// Push the session's deadline out to `ttl` from now (the default TTL
    /// when `None`).
    ///
    /// Rewrites the authoritative `expires_at` and re-arms the store TTL, so
    /// both expiry mechanisms move together.
    pub async fn extend_session(
        &self,
        session_id: &str,
        ttl: Option<Duration>,
    ) -> Result<SessionRecord> {
        // Lazy-expiry check first; a stale session cannot be revived.
        if self.validate_session(session_id).await?.is_none() {
            return Err(AuthError::SessionNotFound);
        }
        self.store.extend(session_id, ttl).await
    }

    /// Merge fields into the session's data payload, keeping its deadline.
    pub async fn update_session_data(
        &self,
        session_id: &str,
        fields: HashMap<String, Value>,
    ) -> Result<SessionRecord> {
        // Lazy-expiry check first so a stale session can't be written back.
        if self.validate_session(session_id).await?.is_none() {
            return Err(AuthError::SessionNotFound);
        }
        self.store.update_data(session_id, fields).await
    }

    /// Invalidate one session. Idempotent.
    pub async fn invalidate_session(&self, session_id: &str) -> Result<()> {
        self.store.delete(session_id).await?;
        tracing::info!(
            target: "auth.session.revoked",
            "Session revoked"
        );
        Ok(())
    }

    /// Invalidate every session belonging to `user_id`, returning the count.
    pub async fn invalidate_all_user_sessions(&self, user_id: &str) -> Result<usize> {
        let count = self.store.delete_all_for_user(user_id).await?;
        tracing::warn!(
            target: "auth.session.revoke_all",
            user_id = %user_id,
            count = count,
            "All sessions revoked"
        );
        Ok(count)
    }

    /// Rotate a session id: validate the old session, delete it, and issue a
    /// fresh one carrying the same user and data.
    ///
    /// If the new write fails the old session stays deleted; the caller is
    /// logged out rather than left holding a rotated-away id.
    pub async fn refresh_session(&self, session_id: &str) -> Result<String> {
        let record = self
            .validate_session(session_id)
            .await?
            .ok_or(AuthError::SessionNotFound)?;
        self.store.delete(session_id).await?;

        let new_id = self.create_session(&record.user_id, record.data).await?;
        tracing::info!(
            target: "auth.session.refreshed",
            user_id = %record.user_id,
            "Session id rotated"
        );
        Ok(new_id)
    }

    /// The underlying repository.
    pub fn store(&self) -> &SessionStore<K> {
        &self.store
    }
}
