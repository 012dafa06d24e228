//! Handshake validation error types.

use solgate_core::error::SolgateError;
use thiserror::Error;

/// Why a credential was rejected.
///
/// The three rejection variants stay distinct for audit logging but all
/// convert to the same opaque [`SolgateError::Unauthorized`].
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid token or secret")]
    Invalid,

    #[error("handshake has expired")]
    Expired,

    #[error("handshake has been revoked")]
    Revoked,

    #[error("credential lookup timed out")]
    Timeout,

    #[error("credential store unavailable: {0}")]
    Unavailable(String),

    #[error("cryptography error: {0}")]
    Crypto(String),
}

impl AuthError {
    /// Short audit label.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::Invalid => "invalid",
            AuthError::Expired => "expired",
            AuthError::Revoked => "revoked",
            AuthError::Timeout => "timeout",
            AuthError::Unavailable(_) => "unavailable",
            AuthError::Crypto(_) => "crypto",
        }
    }
}

impl From<AuthError> for SolgateError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Invalid | AuthError::Expired | AuthError::Revoked => {
                SolgateError::Unauthorized
            }
            AuthError::Timeout => SolgateError::Timeout(err.to_string()),
            AuthError::Unavailable(msg) => SolgateError::Database(msg),
            AuthError::Crypto(msg) => SolgateError::Crypto(msg),
        }
    }
}
