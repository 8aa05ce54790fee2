//! Token helpers
//!
//! - Delete tokens: unguessable per-entry secrets handed to the publisher
//! - Session tokens: cookie value derived from the shared site password

use rand::Rng;
use sha2::{Digest, Sha256};

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "auth_token";

/// Length of a delete token in random bytes
const DELETE_TOKEN_BYTES: usize = 32;

/// Mint a delete token: 32 random bytes as 64 lowercase hex chars
pub fn generate_token() -> String {
    let mut bytes = [0u8; DELETE_TOKEN_BYTES];
    rand::rng().fill(&mut bytes[..]);
    hex::encode(bytes)
}

/// Derive the session cookie value for a site password.
///
/// The cookie never carries the password itself.
pub fn session_token(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"bananad-session:");
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare two secrets without short-circuiting on the first mismatch
pub fn tokens_match(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
