//! Server-side sessions over a TTL-capable key-value store.
//!
//! Three layers, lowest first:
//!
//! - [`KeyValueStore`]: the backend seam. [`InMemoryKv`] ships for development
//!   and tests; `RedisKv` (feature `redis-sessions`) for production.
//! - [`SessionStore`]: the repository. Owns the key prefix, the default TTL,
//!   and the JSON codec for [`SessionRecord`] payloads.
//! - [`SessionManager`]: the policy layer. Lazy expiry, user resolution,
//!   extension, rotation, and bulk revocation.
//!
//! Expiry is enforced twice on purpose: the record's `expires_at` is the
//! authoritative deadline checked on every read, and the store TTL is the
//! backstop that reclaims storage for sessions nobody reads again.

mod kv;
mod manager;
#[cfg(feature = "redis-sessions")]
mod redis;
mod store;

pub use kv::{InMemoryKv, KeyValueStore};
pub use manager::SessionManager;
#[cfg(feature = "redis-sessions")]
pub use redis::RedisKv;
pub use store::{SessionRecord, SessionStore, DEFAULT_SESSION_TTL, SESSION_KEY_PREFIX};
