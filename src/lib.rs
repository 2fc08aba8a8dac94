//! # keywarden
//!
//! Credential authentication and session management core.
//!
//! Provides password registration and login with brute-force lockout,
//! server-side sessions with TTL and lazy expiry over a key-value store, and
//! atomic account creation over a relational store. Transport concerns
//! (HTTP, cookies, form validation) stay outside; this crate is the layer a
//! web handler calls into.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use keywarden::{AuthConfig, AuthService, InMemoryDirectory, InMemoryKv};
//! use std::sync::Arc;
//!
//! let accounts = Arc::new(InMemoryDirectory::new());
//! let kv = Arc::new(InMemoryKv::new());
//! let auth = AuthService::new(accounts, kv, AuthConfig::new());
//!
//! let created = auth.register("alice", "alice@example.com", "hunter2hunter2").await?;
//! let logged_in = auth.login("alice@example.com", "hunter2hunter2").await?;
//! let user = auth.current_user(&logged_in.session_id).await?;
//! ```
//!
//! # Architecture
//!
//! - [`AuthService`]: the orchestrator (register, login, logout,
//!   change-password).
//! - [`SessionManager`] / [`SessionStore`]: session lifecycle over any
//!   [`KeyValueStore`] ([`InMemoryKv`] built in, `RedisKv` behind the
//!   `redis-sessions` feature).
//! - [`UserStore`] / [`CredentialStore`] / [`UnitOfWork`]: the relational
//!   seam ([`InMemoryDirectory`] built in).
//! - [`LockoutPolicy`], [`PasswordHasher`], [`PasswordPolicy`]: the pure
//!   policy and crypto pieces, injected via [`AuthConfig`].

pub mod auth;
pub mod config;
pub mod error;
pub mod password;
pub mod policy;
pub mod session;
pub mod store;
pub mod token;

pub use auth::{AuthService, AuthSuccess};
pub use config::AuthConfig;
pub use error::{AuthError, Conflict, Result};
pub use password::{PasswordConfig, PasswordHasher, PasswordPolicy};
pub use policy::LockoutPolicy;
#[cfg(feature = "redis-sessions")]
pub use session::RedisKv;
pub use session::{
    InMemoryKv, KeyValueStore, SessionManager, SessionRecord, SessionStore, DEFAULT_SESSION_TTL,
};
pub use store::{
    AccountTx, CredentialRecord, CredentialStore, InMemoryDirectory, NewCredential, NewUser,
    UnitOfWork, User, UserStore, UserUpdate,
};
pub use token::generate_session_id;
