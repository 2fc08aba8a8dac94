//! Authentication orchestrator.
//!
//! Composes the password primitives, the lockout policy, the account stores,
//! and the session manager into the four user-facing flows: register, login,
//! logout, and change-password. This layer owns ordering and side effects;
//! all state lives in the injected backends.
//!
//! # Tracing Events
//!
//! - `auth.register.success` - Account created
//! - `auth.login.success` - Credentials accepted, session issued
//! - `auth.login.failed` - Wrong password, counter incremented
//! - `auth.login.locked` - Attempt rejected inside a lockout window
//! - `auth.lockout.account_locked` - Failure threshold reached
//! - `auth.logout.failed` - Best-effort logout hit a storage error
//! - `auth.password.changed` - Credential rotated, sessions revoked

use crate::config::AuthConfig;
use crate::error::{AuthError, Conflict, Result};
use crate::password::PasswordHasher;
use crate::session::{KeyValueStore, SessionManager, SessionRecord, SessionStore};
use crate::store::{
    now_millis, CredentialStore, NewCredential, NewUser, UnitOfWork, User, UserStore,
};
use serde_json::json;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use uuid::Uuid;

/// Outcome of a flow that ends with an authenticated user.
#[derive(Clone, Debug)]
pub struct AuthSuccess {
    /// The authenticated user, as read back after the flow's mutations.
    pub user: User,
    /// Session id to hand to the transport layer.
    pub session_id: String,
}

/// The authentication service.
///
/// `D` is the relational backend (users, credentials, and transactions in one
/// handle); `K` is the key-value backend for sessions.
///
/// ```rust,ignore
/// let accounts = Arc::new(InMemoryDirectory::new());
/// let kv = Arc::new(InMemoryKv::new());
/// let auth = AuthService::new(accounts, kv, AuthConfig::new());
///
/// let created = auth.register("alice", "alice@example.com", "hunter2hunter2").await?;
/// let user = auth.current_user(&created.session_id).await?;
/// ```
pub struct AuthService<D, K>
where
    D: UserStore + CredentialStore + UnitOfWork,
    K: KeyValueStore,
{
    accounts: Arc<D>,
    sessions: SessionManager<K, D>,
    hasher: PasswordHasher,
    config: AuthConfig,
}

impl<D, K> AuthService<D, K>
where
    D: UserStore + CredentialStore + UnitOfWork,
    K: KeyValueStore,
{
    /// Build a service over the given backends.
    #[must_use]
    pub fn new(accounts: Arc<D>, kv: Arc<K>, config: AuthConfig) -> Self {
        let store = SessionStore::new(kv).with_ttl(config.session_ttl);
        let sessions = SessionManager::new(store, Arc::clone(&accounts));
        let hasher = PasswordHasher::new(config.hashing.clone());
        Self {
            accounts,
            sessions,
            hasher,
            config,
        }
    }

    /// The session manager, for direct session operations and for alternate
    /// credential ceremonies that issue sessions without a password.
    pub fn sessions(&self) -> &SessionManager<K, D> {
        &self.sessions
    }

    /// Run a storage operation under the configured deadline. On elapse the
    /// caller sees a retryable `StorageUnavailable`.
    async fn deadline<T, F>(&self, op: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        match self.config.storage_timeout {
            Some(limit) => match tokio::time::timeout(limit, op).await {
                Ok(result) => result,
                Err(_) => Err(AuthError::unavailable("storage deadline elapsed")),
            },
            None => op.await,
        }
    }

    /// Register a new account and issue its first session.
    ///
    /// User row and credential row are created in one transaction; any
    /// failure between the two rolls both back. The session is issued after
    /// commit; if that write fails the account exists and the user simply
    /// logs in.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<AuthSuccess> {
        let email = email.trim().to_lowercase();
        let name = name.trim().to_string();

        self.config.password_policy.check(password)?;
        let password_hash = self.hasher.hash(password)?;

        let user = self
            .deadline(async {
                let mut tx = self.accounts.begin().await?;

                // Fast-fail pre-checks; the store's unique constraints remain
                // the true enforcement under concurrency.
                if tx.find_user_by_email(&email).await?.is_some() {
                    return Err(AuthError::AlreadyExists(Conflict::Email));
                }
                if tx.find_user_by_name(&name).await?.is_some() {
                    return Err(AuthError::AlreadyExists(Conflict::Name));
                }

                let user = tx
                    .create_user(NewUser {
                        id: Uuid::new_v4().to_string(),
                        name: name.clone(),
                        email: email.clone(),
                    })
                    .await?;
                tx.create_credential(NewCredential {
                    user_id: user.id.clone(),
                    password_hash,
                })
                .await?;
                tx.commit().await?;
                Ok(user)
            })
            .await?;

        tracing::info!(
            target: "auth.register.success",
            user_id = %user.id,
            "Account registered"
        );

        let session_id = self.issue_session(&user.id).await?;
        Ok(AuthSuccess { user, session_id })
    }

    /// Authenticate with email and password, issuing a session on success.
    ///
    /// Unknown email and wrong password both come back as
    /// `InvalidCredentials`; a lockout in effect comes back as
    /// `AccountLocked` before any password work. Each wrong password
    /// increments the failed-attempt counter atomically and arms the lock
    /// once the threshold is reached; that arming attempt still reads as
    /// `InvalidCredentials` to the caller.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthSuccess> {
        let email = email.trim().to_lowercase();

        let Some(user) = self.deadline(self.accounts.find_by_email(&email)).await? else {
            // Timing-safe: hash anyway so unknown emails cost the same.
            let _ = self.hasher.hash(password);
            return Err(AuthError::InvalidCredentials);
        };

        if self.config.lockout.is_locked(&user, now_millis()) {
            tracing::debug!(
                target: "auth.login.locked",
                user_id = %user.id,
                "Login attempt inside lockout window"
            );
            return Err(AuthError::AccountLocked);
        }

        let Some(credential) = self
            .deadline(self.accounts.find_by_user_id(&user.id))
            .await?
        else {
            let _ = self.hasher.hash(password);
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hasher.verify(password, &credential.password_hash)? {
            self.record_failed_attempt(&user).await?;
            return Err(AuthError::InvalidCredentials);
        }

        let user = self
            .deadline(self.accounts.reset_failed_attempts(&user.id))
            .await?;

        tracing::info!(
            target: "auth.login.success",
            user_id = %user.id,
            "Login succeeded"
        );

        let session_id = self.issue_session(&user.id).await?;
        Ok(AuthSuccess { user, session_id })
    }

    /// Invalidate a session. Idempotent and best-effort: storage failures
    /// are logged rather than surfaced, since the transport clears its
    /// cookie either way and the store TTL bounds the orphan's lifetime.
    pub async fn logout(&self, session_id: &str) {
        if let Err(e) = self
            .deadline(self.sessions.invalidate_session(session_id))
            .await
        {
            tracing::warn!(
                target: "auth.logout.failed",
                error = %e,
                "Failed to invalidate session on logout"
            );
        }
    }

    /// Invalidate every session belonging to `user_id`.
    pub async fn logout_all(&self, user_id: &str) -> Result<usize> {
        self.deadline(self.sessions.invalidate_all_user_sessions(user_id))
            .await
    }

    /// Resolve a session id to its user. Absent or expired sessions yield
    /// `None`, never an error.
    pub async fn current_user(&self, session_id: &str) -> Result<Option<User>> {
        self.deadline(self.sessions.current_user(session_id)).await
    }

    /// Resolve a session id to its record with lazy expiry.
    pub async fn validate_session(&self, session_id: &str) -> Result<Option<SessionRecord>> {
        self.deadline(self.sessions.validate_session(session_id))
            .await
    }

    /// Rotate a credential after verifying the current password, then revoke
    /// every session the user holds. The caller logs in again with the new
    /// password.
    pub async fn change_password(
        &self,
        user_id: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let user = self
            .deadline(self.accounts.find_by_id(user_id))
            .await?
            .ok_or_else(|| AuthError::not_found(format!("user {}", user_id)))?;

        let credential = self
            .deadline(self.accounts.find_by_user_id(&user.id))
            .await?
            .ok_or_else(|| AuthError::not_found(format!("credential for user {}", user.id)))?;

        if !self
            .hasher
            .verify(current_password, &credential.password_hash)?
        {
            return Err(AuthError::InvalidCredentials);
        }

        self.config.password_policy.check(new_password)?;
        let new_hash = self.hasher.hash(new_password)?;
        self.deadline(self.accounts.update_hash(&user.id, &new_hash))
            .await?;

        let revoked = self
            .deadline(self.sessions.invalidate_all_user_sessions(&user.id))
            .await?;

        tracing::info!(
            target: "auth.password.changed",
            user_id = %user.id,
            sessions_revoked = revoked,
            "Password changed, all sessions revoked"
        );
        Ok(())
    }

    async fn issue_session(&self, user_id: &str) -> Result<String> {
        let data = HashMap::from([("login_time".to_string(), json!(now_millis()))]);
        self.deadline(self.sessions.create_session(user_id, data))
            .await
    }

    /// Increment the counter and arm the lockout when the threshold is
    /// reached. The re-read after increment is what the policy judges, so
    /// concurrent failures cannot slip under the threshold.
    async fn record_failed_attempt(&self, user: &User) -> Result<()> {
        let updated = self
            .deadline(self.accounts.increment_failed_attempts(&user.id))
            .await?;

        tracing::debug!(
            target: "auth.login.failed",
            user_id = %user.id,
            attempts = updated.failed_attempts,
            "Failed login attempt recorded"
        );

        if self.config.lockout.should_lock(&updated) {
            let until = self.config.lockout.lock_deadline(now_millis());
            self.deadline(self.accounts.lock_user(&user.id, until))
                .await?;

            tracing::warn!(
                target: "auth.lockout.account_locked",
                user_id = %user.id,
                attempts = updated.failed_attempts,
                duration_secs = self.config.lockout.lock_duration.as_secs(),
                "Account locked due to failed attempts"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::PasswordConfig;
    use crate::session::InMemoryKv;
    use crate::store::InMemoryDirectory;

    fn service() -> AuthService<InMemoryDirectory, InMemoryKv> {
        let accounts = Arc::new(InMemoryDirectory::new());
        let kv = Arc::new(InMemoryKv::new());
        let config = AuthConfig::new().hashing(PasswordConfig::fast());
        AuthService::new(accounts, kv, config)
    }

    #[tokio::test]
    async fn test_register_and_login_roundtrip() {
        let auth = service();

        let created = auth
            .register("alice", "Alice@Example.com", "hunter2hunter2")
            .await
            .unwrap();
        assert_eq!(created.user.email, "alice@example.com");

        // Email is matched case-insensitively on login too.
        let logged_in = auth
            .login("ALICE@example.COM", "hunter2hunter2")
            .await
            .unwrap();
        assert_eq!(logged_in.user.id, created.user.id);
        assert!(logged_in.user.last_login_at.is_some());

        let current = auth
            .current_user(&logged_in.session_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.id, created.user.id);
    }

    #[tokio::test]
    async fn test_register_conflicts_are_specific() {
        let auth = service();
        auth.register("alice", "alice@example.com", "hunter2hunter2")
            .await
            .unwrap();

        let err = auth
            .register("bob", "alice@example.com", "hunter2hunter2")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AlreadyExists(Conflict::Email)));

        let err = auth
            .register("alice", "other@example.com", "hunter2hunter2")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AlreadyExists(Conflict::Name)));
    }

    #[tokio::test]
    async fn test_register_rejects_weak_password() {
        let auth = service();
        let err = auth
            .register("alice", "alice@example.com", "short")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::WeakPassword(_)));
    }

    #[tokio::test]
    async fn test_login_conflates_unknown_and_wrong() {
        let auth = service();
        auth.register("alice", "alice@example.com", "hunter2hunter2")
            .await
            .unwrap();

        let unknown = auth.login("ghost@example.com", "whatever!").await.unwrap_err();
        let wrong = auth.login("alice@example.com", "wrong-password").await.unwrap_err();

        assert!(matches!(unknown, AuthError::InvalidCredentials));
        assert!(matches!(wrong, AuthError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn test_lockout_after_threshold() {
        let auth = service();
        let created = auth
            .register("alice", "alice@example.com", "hunter2hunter2")
            .await
            .unwrap();

        for _ in 0..5 {
            let err = auth
                .login("alice@example.com", "wrong-password")
                .await
                .unwrap_err();
            assert!(matches!(err, AuthError::InvalidCredentials));
        }

        // Even the correct password is rejected while locked.
        let err = auth
            .login("alice@example.com", "hunter2hunter2")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AccountLocked));

        // Simulate the window elapsing.
        auth.accounts
            .lock_user(&created.user.id, now_millis() - 1)
            .await
            .unwrap();

        let logged_in = auth
            .login("alice@example.com", "hunter2hunter2")
            .await
            .unwrap();
        assert_eq!(logged_in.user.failed_attempts, 0);
        assert!(logged_in.user.locked_until.is_none());
    }

    #[tokio::test]
    async fn test_logout_is_idempotent_and_quiet() {
        let auth = service();
        let created = auth
            .register("alice", "alice@example.com", "hunter2hunter2")
            .await
            .unwrap();

        auth.logout(&created.session_id).await;
        assert!(auth
            .current_user(&created.session_id)
            .await
            .unwrap()
            .is_none());
        // Second logout of the same id is a no-op.
        auth.logout(&created.session_id).await;
    }

    #[tokio::test]
    async fn test_change_password_revokes_sessions() {
        let auth = service();
        let created = auth
            .register("alice", "alice@example.com", "hunter2hunter2")
            .await
            .unwrap();
        let second = auth
            .login("alice@example.com", "hunter2hunter2")
            .await
            .unwrap();

        auth.change_password(&created.user.id, "hunter2hunter2", "correct-horse-battery")
            .await
            .unwrap();

        assert!(auth.current_user(&created.session_id).await.unwrap().is_none());
        assert!(auth.current_user(&second.session_id).await.unwrap().is_none());

        // Old password no longer works, new one does.
        assert!(matches!(
            auth.login("alice@example.com", "hunter2hunter2")
                .await
                .unwrap_err(),
            AuthError::InvalidCredentials
        ));
        auth.login("alice@example.com", "correct-horse-battery")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_change_password_requires_current() {
        let auth = service();
        let created = auth
            .register("alice", "alice@example.com", "hunter2hunter2")
            .await
            .unwrap();

        let err = auth
            .change_password(&created.user.id, "wrong-password", "correct-horse-battery")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        let err = auth
            .change_password("ghost", "whatever!", "correct-horse-battery")
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_passkey_style_direct_session_issuance() {
        let auth = service();
        let created = auth
            .register("alice", "alice@example.com", "hunter2hunter2")
            .await
            .unwrap();

        // An already-verified assertion issues a session without a password.
        let session_id = auth
            .sessions()
            .create_session(&created.user.id, HashMap::new())
            .await
            .unwrap();
        let user = auth.current_user(&session_id).await.unwrap().unwrap();
        assert_eq!(user.id, created.user.id);
    }
}
