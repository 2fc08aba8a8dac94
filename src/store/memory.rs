//! In-memory relational backend.
//!
//! A single mutex guards the whole directory, which makes every operation,
//! including the counter increments, trivially atomic, and lets the
//! transaction handle hold the lock for its lifetime so concurrent
//! registrations serialize instead of racing the uniqueness checks. Suitable
//! for development and tests; a SQL backend implements the same traits for
//! production.

use crate::error::{AuthError, Conflict, Result};
use crate::store::{
    now_millis, AccountTx, CredentialRecord, CredentialStore, NewCredential, NewUser, UnitOfWork,
    User, UserStore, UserUpdate,
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Clone, Default)]
struct DirectoryState {
    users: HashMap<String, User>,
    email_index: HashMap<String, String>,
    name_index: HashMap<String, String>,
    credentials: HashMap<String, CredentialRecord>,
}

impl DirectoryState {
    fn insert_user(&mut self, data: NewUser) -> Result<User> {
        if self.email_index.contains_key(&data.email) {
            return Err(AuthError::AlreadyExists(Conflict::Email));
        }
        if self.name_index.contains_key(&data.name) {
            return Err(AuthError::AlreadyExists(Conflict::Name));
        }

        let now = now_millis();
        let user = User {
            id: data.id,
            name: data.name,
            email: data.email,
            last_login_at: None,
            failed_attempts: 0,
            locked_until: None,
            created_at: now,
            updated_at: now,
        };

        self.email_index.insert(user.email.clone(), user.id.clone());
        self.name_index.insert(user.name.clone(), user.id.clone());
        self.users.insert(user.id.clone(), user.clone());
        Ok(user)
    }

    fn insert_credential(&mut self, record: NewCredential) -> Result<CredentialRecord> {
        if self.credentials.contains_key(&record.user_id) {
            return Err(AuthError::AlreadyExists(Conflict::Credential));
        }

        let now = now_millis();
        let record = CredentialRecord {
            user_id: record.user_id,
            password_hash: record.password_hash,
            created_at: now,
            updated_at: now,
        };
        self.credentials
            .insert(record.user_id.clone(), record.clone());
        Ok(record)
    }

    fn user_by_email(&self, email: &str) -> Option<User> {
        self.email_index
            .get(email)
            .and_then(|id| self.users.get(id))
            .cloned()
    }

    fn user_by_name(&self, name: &str) -> Option<User> {
        self.name_index
            .get(name)
            .and_then(|id| self.users.get(id))
            .cloned()
    }
}

/// In-memory implementation of the user store, credential store, and unit of
/// work.
#[derive(Clone, Default)]
pub struct InMemoryDirectory {
    state: Arc<Mutex<DirectoryState>>,
}

impl InMemoryDirectory {
    /// Create an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for InMemoryDirectory {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>> {
        Ok(self.state.lock().await.users.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.state.lock().await.user_by_email(email))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<User>> {
        Ok(self.state.lock().await.user_by_name(name))
    }

    async fn create(&self, data: NewUser) -> Result<User> {
        self.state.lock().await.insert_user(data)
    }

    async fn update(&self, id: &str, update: UserUpdate) -> Result<User> {
        let mut state = self.state.lock().await;

        // Uniqueness checks against the indexes before touching the row.
        if let Some(ref email) = update.email {
            if state.email_index.get(email).is_some_and(|owner| owner != id) {
                return Err(AuthError::AlreadyExists(Conflict::Email));
            }
        }
        if let Some(ref name) = update.name {
            if state.name_index.get(name).is_some_and(|owner| owner != id) {
                return Err(AuthError::AlreadyExists(Conflict::Name));
            }
        }

        let user = state
            .users
            .get(id)
            .cloned()
            .ok_or_else(|| AuthError::not_found(format!("user {}", id)))?;

        let mut updated = user.clone();
        if let Some(name) = update.name {
            updated.name = name;
        }
        if let Some(email) = update.email {
            updated.email = email;
        }
        if let Some(last_login_at) = update.last_login_at {
            updated.last_login_at = last_login_at;
        }
        if let Some(failed_attempts) = update.failed_attempts {
            updated.failed_attempts = failed_attempts;
        }
        if let Some(locked_until) = update.locked_until {
            updated.locked_until = locked_until;
        }
        updated.updated_at = now_millis();

        if updated.email != user.email {
            state.email_index.remove(&user.email);
            state.email_index.insert(updated.email.clone(), id.to_string());
        }
        if updated.name != user.name {
            state.name_index.remove(&user.name);
            state.name_index.insert(updated.name.clone(), id.to_string());
        }
        state.users.insert(id.to_string(), updated.clone());
        Ok(updated)
    }

    async fn increment_failed_attempts(&self, id: &str) -> Result<User> {
        let mut state = self.state.lock().await;
        let user = state
            .users
            .get_mut(id)
            .ok_or_else(|| AuthError::not_found(format!("user {}", id)))?;
        user.failed_attempts += 1;
        user.updated_at = now_millis();
        Ok(user.clone())
    }

    async fn reset_failed_attempts(&self, id: &str) -> Result<User> {
        let mut state = self.state.lock().await;
        let user = state
            .users
            .get_mut(id)
            .ok_or_else(|| AuthError::not_found(format!("user {}", id)))?;
        let now = now_millis();
        user.failed_attempts = 0;
        user.locked_until = None;
        user.last_login_at = Some(now);
        user.updated_at = now;
        Ok(user.clone())
    }

    async fn lock_user(&self, id: &str, until: i64) -> Result<User> {
        let mut state = self.state.lock().await;
        let user = state
            .users
            .get_mut(id)
            .ok_or_else(|| AuthError::not_found(format!("user {}", id)))?;
        user.locked_until = Some(until);
        user.updated_at = now_millis();
        Ok(user.clone())
    }
}

#[async_trait]
impl CredentialStore for InMemoryDirectory {
    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<CredentialRecord>> {
        Ok(self.state.lock().await.credentials.get(user_id).cloned())
    }

    async fn create(&self, record: NewCredential) -> Result<CredentialRecord> {
        self.state.lock().await.insert_credential(record)
    }

    async fn update_hash(&self, user_id: &str, new_hash: &str) -> Result<CredentialRecord> {
        let mut state = self.state.lock().await;
        let record = state
            .credentials
            .get_mut(user_id)
            .ok_or_else(|| AuthError::not_found(format!("credential for user {}", user_id)))?;
        record.password_hash = new_hash.to_string();
        record.updated_at = now_millis();
        Ok(record.clone())
    }

    async fn delete(&self, user_id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state
            .credentials
            .remove(user_id)
            .map(|_| ())
            .ok_or_else(|| AuthError::not_found(format!("credential for user {}", user_id)))
    }
}

/// Transaction over the in-memory directory.
///
/// Holds the directory lock for its lifetime and stages writes on a copy of
/// the state; commit swaps the copy in, rollback (or drop) discards it.
struct MemoryTx {
    guard: OwnedMutexGuard<DirectoryState>,
    staged: DirectoryState,
}

#[async_trait]
impl UnitOfWork for InMemoryDirectory {
    async fn begin(&self) -> Result<Box<dyn AccountTx>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryTx { guard, staged }))
    }
}

#[async_trait]
impl AccountTx for MemoryTx {
    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>> {
        Ok(self.staged.user_by_email(email))
    }

    async fn find_user_by_name(&mut self, name: &str) -> Result<Option<User>> {
        Ok(self.staged.user_by_name(name))
    }

    async fn create_user(&mut self, data: NewUser) -> Result<User> {
        self.staged.insert_user(data)
    }

    async fn create_credential(&mut self, record: NewCredential) -> Result<CredentialRecord> {
        self.staged.insert_credential(record)
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        *self.guard = self.staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(id: &str, name: &str, email: &str) -> NewUser {
        NewUser {
            id: id.into(),
            name: name.into(),
            email: email.into(),
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let dir = InMemoryDirectory::new();
        let user = UserStore::create(&dir, new_user("u1", "alice", "alice@example.com"))
            .await
            .unwrap();

        assert_eq!(user.failed_attempts, 0);
        assert!(user.locked_until.is_none());

        assert_eq!(dir.find_by_id("u1").await.unwrap().unwrap().id, "u1");
        assert_eq!(
            dir.find_by_email("alice@example.com").await.unwrap().unwrap().id,
            "u1"
        );
        assert_eq!(dir.find_by_name("alice").await.unwrap().unwrap().id, "u1");
        assert!(dir.find_by_email("bob@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unique_constraints() {
        let dir = InMemoryDirectory::new();
        UserStore::create(&dir, new_user("u1", "alice", "alice@example.com"))
            .await
            .unwrap();

        let err = UserStore::create(&dir, new_user("u2", "bob", "alice@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AlreadyExists(Conflict::Email)));

        let err = UserStore::create(&dir, new_user("u3", "alice", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AlreadyExists(Conflict::Name)));
    }

    #[tokio::test]
    async fn test_update_partial_fields() {
        let dir = InMemoryDirectory::new();
        UserStore::create(&dir, new_user("u1", "alice", "alice@example.com"))
            .await
            .unwrap();

        let updated = dir
            .update(
                "u1",
                UserUpdate {
                    name: Some("alice2".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "alice2");
        assert_eq!(updated.email, "alice@example.com");
        // Old name index entry is gone, new one resolves.
        assert!(dir.find_by_name("alice").await.unwrap().is_none());
        assert!(dir.find_by_name("alice2").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_missing_user() {
        let dir = InMemoryDirectory::new();
        let err = dir.update("ghost", UserUpdate::default()).await.unwrap_err();
        assert!(matches!(err, AuthError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_increment_is_atomic_under_concurrency() {
        let dir = InMemoryDirectory::new();
        UserStore::create(&dir, new_user("u1", "alice", "alice@example.com"))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let dir = dir.clone();
            handles.push(tokio::spawn(async move {
                dir.increment_failed_attempts("u1").await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let user = dir.find_by_id("u1").await.unwrap().unwrap();
        assert_eq!(user.failed_attempts, 20);
    }

    #[tokio::test]
    async fn test_reset_clears_lock_and_sets_last_login() {
        let dir = InMemoryDirectory::new();
        UserStore::create(&dir, new_user("u1", "alice", "alice@example.com"))
            .await
            .unwrap();
        dir.increment_failed_attempts("u1").await.unwrap();
        dir.lock_user("u1", now_millis() + 60_000).await.unwrap();

        let user = dir.reset_failed_attempts("u1").await.unwrap();
        assert_eq!(user.failed_attempts, 0);
        assert!(user.locked_until.is_none());
        assert!(user.last_login_at.is_some());
    }

    #[tokio::test]
    async fn test_credential_lifecycle() {
        let dir = InMemoryDirectory::new();

        let record = CredentialStore::create(
            &dir,
            NewCredential {
                user_id: "u1".into(),
                password_hash: "$hash$1".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(record.password_hash, "$hash$1");

        let err = CredentialStore::create(
            &dir,
            NewCredential {
                user_id: "u1".into(),
                password_hash: "$hash$2".into(),
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::AlreadyExists(Conflict::Credential)));

        let updated = dir.update_hash("u1", "$hash$3").await.unwrap();
        assert_eq!(updated.password_hash, "$hash$3");

        CredentialStore::delete(&dir, "u1").await.unwrap();
        assert!(dir.find_by_user_id("u1").await.unwrap().is_none());
        assert!(matches!(
            CredentialStore::delete(&dir, "u1").await.unwrap_err(),
            AuthError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_tx_commit_persists_both_rows() {
        let dir = InMemoryDirectory::new();

        let mut tx = dir.begin().await.unwrap();
        assert!(tx
            .find_user_by_email("alice@example.com")
            .await
            .unwrap()
            .is_none());
        let user = tx
            .create_user(new_user("u1", "alice", "alice@example.com"))
            .await
            .unwrap();
        tx.create_credential(NewCredential {
            user_id: user.id.clone(),
            password_hash: "$hash$1".into(),
        })
        .await
        .unwrap();
        tx.commit().await.unwrap();

        assert!(dir.find_by_id("u1").await.unwrap().is_some());
        assert!(dir.find_by_user_id("u1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_tx_rollback_discards_everything() {
        let dir = InMemoryDirectory::new();

        let mut tx = dir.begin().await.unwrap();
        tx.create_user(new_user("u1", "alice", "alice@example.com"))
            .await
            .unwrap();
        tx.rollback().await.unwrap();

        assert!(dir.find_by_id("u1").await.unwrap().is_none());
        assert!(dir.find_by_email("alice@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tx_drop_is_rollback() {
        let dir = InMemoryDirectory::new();

        {
            let mut tx = dir.begin().await.unwrap();
            tx.create_user(new_user("u1", "alice", "alice@example.com"))
                .await
                .unwrap();
            // Dropped without commit.
        }

        assert!(dir.find_by_id("u1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_tx_sees_its_own_writes() {
        let dir = InMemoryDirectory::new();

        let mut tx = dir.begin().await.unwrap();
        tx.create_user(new_user("u1", "alice", "alice@example.com"))
            .await
            .unwrap();
        assert!(tx
            .find_user_by_email("alice@example.com")
            .await
            .unwrap()
            .is_some());
        assert!(tx.find_user_by_name("alice").await.unwrap().is_some());
        tx.rollback().await.unwrap();
    }
}
