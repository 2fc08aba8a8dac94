//! Password hashing and strength validation.
//!
//! The slow-hash primitive is Argon2id producing PHC-formatted strings (salt
//! and cost parameters embedded), so stored hashes remain verifiable when the
//! parameters change later. The hasher is injected into the orchestrator by
//! construction; nothing else in the crate assumes a particular algorithm.

use crate::error::{AuthError, Result};

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as Argon2Hasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

/// Cost parameters for password hashing.
#[derive(Clone, Debug)]
pub struct PasswordConfig {
    /// Memory cost in KiB (default: 19456 = 19 MiB).
    pub memory_cost: u32,
    /// Time cost / iterations (default: 2).
    pub time_cost: u32,
    /// Parallelism (default: 1).
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        // OWASP recommended minimum for Argon2id
        Self {
            memory_cost: 19 * 1024,
            time_cost: 2,
            parallelism: 1,
        }
    }
}

impl PasswordConfig {
    /// Faster settings for development/testing (NOT for production).
    #[cfg(any(test, debug_assertions))]
    #[must_use]
    pub fn fast() -> Self {
        Self {
            memory_cost: 1024,
            time_cost: 1,
            parallelism: 1,
        }
    }
}

/// Hashes and verifies passwords with Argon2id.
#[derive(Clone)]
pub struct PasswordHasher {
    config: PasswordConfig,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(PasswordConfig::default())
    }
}

impl PasswordHasher {
    /// Create a hasher with the given cost parameters.
    #[must_use]
    pub fn new(config: PasswordConfig) -> Self {
        Self { config }
    }

    /// Hash a password, returning the PHC-formatted string.
    pub fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = self.build_argon2()?;

        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| AuthError::internal(format!("password hashing failed: {}", e)))
    }

    /// Verify a password against a stored hash.
    ///
    /// The comparison inside Argon2 is constant-time; a malformed stored hash
    /// is an internal error, not a failed verification.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| AuthError::internal(format!("invalid password hash format: {}", e)))?;

        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    fn build_argon2(&self) -> Result<Argon2<'static>> {
        let params = Params::new(
            self.config.memory_cost,
            self.config.time_cost,
            self.config.parallelism,
            None,
        )
        .map_err(|e| AuthError::internal(format!("invalid Argon2 params: {}", e)))?;

        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }
}

/// Password strength requirements checked at registration and change.
///
/// Length-based only (NIST SP 800-63B): composition rules push users toward
/// predictable substitutions, so the policy stays out of that game. The upper
/// bound exists because Argon2 input length is attacker-controlled work.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PasswordPolicy {
    /// Minimum length in bytes (default: 8).
    pub min_length: usize,
    /// Maximum length in bytes (default: 128).
    pub max_length: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 128,
        }
    }
}

impl PasswordPolicy {
    /// Create a policy with the default bounds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the minimum length.
    #[must_use]
    pub fn min_length(mut self, len: usize) -> Self {
        self.min_length = len;
        self
    }

    /// Set the maximum length.
    #[must_use]
    pub fn max_length(mut self, len: usize) -> Self {
        self.max_length = len;
        self
    }

    /// Validate a password, returning an error describing the violation.
    pub fn check(&self, password: &str) -> Result<()> {
        if password.len() < self.min_length {
            return Err(AuthError::WeakPassword(format!(
                "must be at least {} characters",
                self.min_length
            )));
        }
        if password.len() > self.max_length {
            return Err(AuthError::WeakPassword(format!(
                "must be at most {} characters",
                self.max_length
            )));
        }
        Ok(())
    }
}
