//! Error taxonomy for authentication and session operations.
//!
//! Every operation in the crate returns [`Result`]. The variants are
//! deliberately coarse at the credential boundary: unknown accounts and wrong
//! passwords both surface as [`AuthError::InvalidCredentials`] so callers
//! cannot enumerate registered emails. Registration conflicts are allowed to
//! be specific (the caller controls the submitted values), so
//! [`AuthError::AlreadyExists`] carries which constraint was violated.

use std::fmt;

/// Which uniqueness constraint a write collided with.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Conflict {
    /// The email address is already registered.
    Email,
    /// The account name is already taken.
    Name,
    /// The user already has a credential record.
    Credential,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Email => write!(f, "email"),
            Self::Name => write!(f, "name"),
            Self::Credential => write!(f, "credential"),
        }
    }
}

/// The main error type for authentication and session operations.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// A uniqueness constraint was violated (email, name, or credential row).
    #[error("{0} already exists")]
    AlreadyExists(Conflict),

    /// A referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Wrong password or unknown account. The two cases are conflated on
    /// purpose; callers must not be able to tell them apart.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The account is inside its lockout window.
    #[error("account temporarily locked")]
    AccountLocked,

    /// A new password failed the strength policy.
    #[error("weak password: {0}")]
    WeakPassword(String),

    /// The session does not exist. Most call sites report absence through
    /// `Option` instead; this variant is for operations where a missing
    /// session is a contract violation (e.g. updating one).
    #[error("session not found")]
    SessionNotFound,

    /// The storage backend timed out or refused the connection. Retryable.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A storage backend reported an error that is not a simple outage.
    #[error("storage error: {0}")]
    Storage(String),

    /// An invariant inside the crate failed (bad hash format, serialization
    /// of our own types, ...).
    #[error("internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl AuthError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::StorageUnavailable(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether the caller may retry the operation unchanged.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageUnavailable(_))
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AuthError>;
