//! Credential records and the durable credential store trait.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A password credential row, one-to-one with a user.
///
/// The hash is an opaque PHC string from the slow-hash primitive; this layer
/// never inspects it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub user_id: String,
    pub password_hash: String,
    /// Creation time (epoch millis).
    pub created_at: i64,
    /// Last hash rotation (epoch millis).
    pub updated_at: i64,
}

/// Data for creating a credential record.
#[derive(Clone, Debug)]
pub struct NewCredential {
    pub user_id: String,
    pub password_hash: String,
}

/// Durable credential storage.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Fetch the credential record for a user.
    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<CredentialRecord>>;

    /// Create a credential record. Fails with
    /// `AlreadyExists(Conflict::Credential)` when the user already has one
    /// (unique constraint on `user_id`).
    async fn create(&self, record: NewCredential) -> Result<CredentialRecord>;

    /// Replace the stored hash, bumping `updated_at`. Fails with `NotFound`
    /// when the user has no credential record.
    async fn update_hash(&self, user_id: &str, new_hash: &str) -> Result<CredentialRecord>;

    /// Delete the credential record. Fails with `NotFound` when absent;
    /// deletion of a missing credential indicates a bookkeeping bug upstream,
    /// so it is surfaced rather than tolerated.
    async fn delete(&self, user_id: &str) -> Result<()>;
}
