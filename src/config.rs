//! Top-level configuration for the auth service.

use crate::password::{PasswordConfig, PasswordPolicy};
use crate::policy::LockoutPolicy;
use crate::session::DEFAULT_SESSION_TTL;
use std::time::Duration;

/// Default deadline applied to individual storage calls.
const DEFAULT_STORAGE_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for [`AuthService`](crate::auth::AuthService).
///
/// Every knob has a production-sane default; construction is builder-style.
///
/// ```rust,ignore
/// let config = AuthConfig::new()
///     .session_ttl(Duration::from_secs(24 * 60 * 60))
///     .lockout(LockoutPolicy::new().max_attempts(3));
/// ```
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// Session lifetime (default: 7 days).
    pub session_ttl: Duration,
    /// Brute-force lockout thresholds.
    pub lockout: LockoutPolicy,
    /// Argon2id cost parameters.
    pub hashing: PasswordConfig,
    /// Password strength requirements.
    pub password_policy: PasswordPolicy,
    /// Deadline for individual storage calls; `None` disables the deadline.
    /// On elapse the operation fails with a retryable `StorageUnavailable`.
    pub storage_timeout: Option<Duration>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl: DEFAULT_SESSION_TTL,
            lockout: LockoutPolicy::default(),
            hashing: PasswordConfig::default(),
            password_policy: PasswordPolicy::default(),
            storage_timeout: Some(DEFAULT_STORAGE_TIMEOUT),
        }
    }
}

impl AuthConfig {
    /// Create a config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the session lifetime.
    #[must_use]
    pub fn session_ttl(mut self, ttl: Duration) -> Self {
        self.session_ttl = ttl;
        self
    }

    /// Set the lockout policy.
    #[must_use]
    pub fn lockout(mut self, policy: LockoutPolicy) -> Self {
        self.lockout = policy;
        self
    }

    /// Set the Argon2id cost parameters.
    #[must_use]
    pub fn hashing(mut self, config: PasswordConfig) -> Self {
        self.hashing = config;
        self
    }

    /// Set the password strength policy.
    #[must_use]
    pub fn password_policy(mut self, policy: PasswordPolicy) -> Self {
        self.password_policy = policy;
        self
    }

    /// Set the per-call storage deadline.
    #[must_use]
    pub fn storage_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.storage_timeout = timeout;
        self
    }
}
