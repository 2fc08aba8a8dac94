//! Durable account storage.
//!
//! Two record families live in the relational backend: [`User`] rows
//! (identity plus the brute-force counters) and [`CredentialRecord`] rows
//! (one password hash per user). The traits here are the seam between the
//! orchestrator and whatever backend implements them; [`InMemoryDirectory`]
//! is the in-process implementation used in development and tests.
//!
//! Registration needs the two creations to be atomic, which is what
//! [`UnitOfWork`] / [`AccountTx`] provide: the caller begins a transaction,
//! drives it, and explicitly commits or rolls back.

mod credential;
mod memory;
mod uow;
mod user;

pub use credential::{CredentialRecord, CredentialStore, NewCredential};
pub use memory::InMemoryDirectory;
pub use uow::{AccountTx, UnitOfWork};
pub use user::{NewUser, User, UserStore, UserUpdate};

use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time as epoch milliseconds.
///
/// All persisted timestamps in the crate use this representation.
#[must_use]
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
