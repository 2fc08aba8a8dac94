//! Account lockout policy.
//!
//! Pure decision logic with no I/O: given a user's security counters and a
//! clock reading, decide whether the account is inside its lockout window and
//! whether the latest failure should trigger one. The orchestrator owns the
//! storage side effects.

use crate::store::User;
use std::time::Duration;

/// Default maximum failed attempts before lockout.
const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Default lockout duration (15 minutes).
const DEFAULT_LOCK_DURATION: Duration = Duration::from_secs(15 * 60);

/// Lockout policy configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockoutPolicy {
    /// Failed attempts at which the account is locked.
    pub max_attempts: u32,
    /// How long the account stays locked.
    pub lock_duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            lock_duration: DEFAULT_LOCK_DURATION,
        }
    }
}

impl LockoutPolicy {
    /// Create a policy with default settings (5 attempts, 15 minutes).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum failed attempts before lockout.
    #[must_use]
    pub fn max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max;
        self
    }

    /// Set the lockout duration.
    #[must_use]
    pub fn lock_duration(mut self, duration: Duration) -> Self {
        self.lock_duration = duration;
        self
    }

    /// Whether the account is inside its lockout window at `now` (epoch
    /// millis). A `locked_until` in the past means the lock has lapsed.
    #[must_use]
    pub fn is_locked(&self, user: &User, now: i64) -> bool {
        match user.locked_until {
            Some(until) => now < until,
            None => false,
        }
    }

    /// Whether the user's failed-attempt count has reached the threshold.
    #[must_use]
    pub fn should_lock(&self, user: &User) -> bool {
        user.failed_attempts >= self.max_attempts
    }

    /// The lockout deadline for a lock imposed at `now` (epoch millis).
    #[must_use]
    pub fn lock_deadline(&self, now: i64) -> i64 {
        now + self.lock_duration.as_millis() as i64
    }
}
