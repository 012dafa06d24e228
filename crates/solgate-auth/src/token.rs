//! Bearer token and secret generation, digesting and comparison.
//!
//! Tokens and secrets each carry 256 bits from the thread-local CSPRNG.
//! Only their SHA-256 digests are persisted.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Prefix that makes handshake tokens recognisable in config and scanners.
pub const TOKEN_PREFIX: &str = "hs_";

fn random_b64() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Generate a bearer token (`hs_` + 43 base64url chars).
pub fn generate_token() -> String {
    format!("{TOKEN_PREFIX}{}", random_b64())
}

/// Generate a verification secret (43 base64url chars).
pub fn generate_secret() -> String {
    random_b64()
}

/// SHA-256 of a raw token or secret, hex-encoded.
pub fn digest(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare two digests without early exit.
pub fn digests_match(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
