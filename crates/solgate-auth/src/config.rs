//! Handshake service configuration.

use serde::Deserialize;

/// Upper bound on tolerated clock skew, whatever is configured.
pub const MAX_CLOCK_SKEW_SECS: u64 = 5;

/// Configuration for the handshake service.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HandshakeConfig {
    /// TTL used when the caller does not request one (default: 3600).
    pub default_ttl_secs: u64,
    /// Smallest TTL a caller may request (default: 1).
    pub min_ttl_secs: u64,
    /// Largest TTL a caller may request (default: 86_400 = 1 day).
    pub max_ttl_secs: u64,
    /// Grace added to `expires_at` when checking expiry (default: 2,
    /// capped at [`MAX_CLOCK_SKEW_SECS`]).
    pub clock_skew_secs: u64,
    /// Bound on the credential-store round trip in `validate`
    /// (default: 2000).
    pub lookup_timeout_ms: u64,
    /// How long expired or revoked records are kept before purging
    /// (default: 604_800 = 7 days).
    pub retention_secs: u64,
    /// Argon2id PHC hash of the operator root key. `None` disables
    /// root minting.
    pub root_key_hash: Option<String>,
    /// Optional pepper prepended to the root key before verification.
    pub pepper: Option<String>,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            default_ttl_secs: 3600,
            min_ttl_secs: 1,
            max_ttl_secs: 86_400,
            clock_skew_secs: 2,
            lookup_timeout_ms: 2000,
            retention_secs: 604_800,
            root_key_hash: None,
            pepper: None,
        }
    }
}

impl HandshakeConfig {
    pub fn effective_skew_secs(&self) -> u64 {
        self.clock_skew_secs.min(MAX_CLOCK_SKEW_SECS)
    }
}
