//! Unit-of-work abstraction over the relational backend.
//!
//! Registration has to create a user row and a credential row as one atomic
//! unit. Instead of a transaction-as-callback, the backend hands out an
//! [`AccountTx`]: a transaction-scoped handle offering the operations the
//! registration flow needs, committed or rolled back under the caller's
//! control flow. Dropping an uncommitted handle rolls back.

use crate::error::Result;
use crate::store::{CredentialRecord, NewCredential, NewUser, User};
use async_trait::async_trait;

/// A backend that can open account transactions.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Begin a transaction against the user and credential tables.
    async fn begin(&self) -> Result<Box<dyn AccountTx>>;
}

/// A transaction-scoped view of the account tables.
///
/// Reads observe the transaction's own uncommitted writes. The isolation of
/// the backend must make the uniqueness pre-checks race-proof against
/// concurrent registrations; the unique constraints remain the true
/// enforcement either way.
#[async_trait]
pub trait AccountTx: Send {
    /// Find a user by (lowercased) email within the transaction.
    async fn find_user_by_email(&mut self, email: &str) -> Result<Option<User>>;

    /// Find a user by name within the transaction.
    async fn find_user_by_name(&mut self, name: &str) -> Result<Option<User>>;

    /// Create a user row. Fails with `AlreadyExists` on email or name
    /// collision.
    async fn create_user(&mut self, data: NewUser) -> Result<User>;

    /// Create a credential row. Fails with
    /// `AlreadyExists(Conflict::Credential)` on a duplicate `user_id`.
    async fn create_credential(&mut self, record: NewCredential) -> Result<CredentialRecord>;

    /// Make every write in this transaction durable.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discard every write in this transaction.
    async fn rollback(self: Box<Self>) -> Result<()>;
}
