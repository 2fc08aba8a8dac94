//! Session token generation.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;

/// Number of random bytes in a session token (256 bits of entropy).
///
/// With this much entropy a collision is a correctness bug, not a condition
/// to handle; callers never retry generation.
const TOKEN_BYTES: usize = 32;

/// Generate a cryptographically random, URL-safe session identifier.
///
/// 32 bytes of OS randomness, base64url-encoded without padding: 43
/// characters.
#[must_use]
pub fn generate_session_id() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
