//! User records and the durable user store trait.

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A user row.
///
/// `name` and `email` are globally unique; the backend enforces that with
/// constraints, not pre-checks. `failed_attempts` and `locked_until` are the
/// brute-force counters: the counter resets to zero whenever a successful
/// login clears the lock.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Opaque unique identifier.
    pub id: String,
    /// Unique display name.
    pub name: String,
    /// Unique email address, stored lowercased.
    pub email: String,
    /// Last successful login (epoch millis).
    pub last_login_at: Option<i64>,
    /// Consecutive failed login attempts since the last success.
    pub failed_attempts: u32,
    /// Lockout deadline (epoch millis), if a lockout is in effect or lapsed.
    pub locked_until: Option<i64>,
    /// Creation time (epoch millis).
    pub created_at: i64,
    /// Last mutation time (epoch millis).
    pub updated_at: i64,
}

/// Data for creating a user.
#[derive(Clone, Debug)]
pub struct NewUser {
    pub id: String,
    pub name: String,
    pub email: String,
}

/// A partial update: only the provided fields are applied.
#[derive(Clone, Debug, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub last_login_at: Option<Option<i64>>,
    pub failed_attempts: Option<u32>,
    pub locked_until: Option<Option<i64>>,
}

/// Durable user storage.
///
/// The counter mutations (`increment_failed_attempts`,
/// `reset_failed_attempts`) must be atomic at the storage layer. The
/// orchestrator never reads a counter and writes it back; that pattern loses
/// updates under concurrent failed logins and lets an attacker stay under
/// the lockout threshold.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Find a user by id.
    async fn find_by_id(&self, id: &str) -> Result<Option<User>>;

    /// Find a user by (lowercased) email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Find a user by name.
    async fn find_by_name(&self, name: &str) -> Result<Option<User>>;

    /// Create a user. Fails with `AlreadyExists` when the email or name
    /// collides; the constraint in the backend is the enforcement, not a
    /// pre-check.
    async fn create(&self, data: NewUser) -> Result<User>;

    /// Apply a partial update. Fails with `NotFound` when the id is absent.
    async fn update(&self, id: &str, update: UserUpdate) -> Result<User>;

    /// Atomically add one to `failed_attempts` and bump `updated_at`,
    /// returning the updated row.
    async fn increment_failed_attempts(&self, id: &str) -> Result<User>;

    /// Atomically zero the counter, clear the lock, and set `last_login_at`
    /// to now.
    async fn reset_failed_attempts(&self, id: &str) -> Result<User>;

    /// Set the lockout deadline (epoch millis).
    async fn lock_user(&self, id: &str, until: i64) -> Result<User>;
}
