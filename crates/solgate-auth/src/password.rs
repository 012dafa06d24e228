//! Operator root-key hashing and verification using Argon2id.

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher, PasswordVerifier};

use crate::error::AuthError;

fn peppered(key: &str, pepper: Option<&str>) -> String {
    match pepper {
        Some(p) => format!("{p}{key}"),
        None => key.to_string(),
    }
}

/// Hash a root key with Argon2id (m=19 MiB, t=2, p=1) and a random salt.
///
/// The output is a PHC string suitable for `HandshakeConfig::root_key_hash`.
pub fn hash_root_key(key: &str, pepper: Option<&str>) -> Result<String, AuthError> {
    let params = argon2::Params::new(19456, 2, 1, None)
        .map_err(|e| AuthError::Crypto(format!("argon2 params error: {e}")))?;
    let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

    let salt = SaltString::generate(&mut argon2::password_hash::rand_core::OsRng);
    let hash = argon2
        .hash_password(peppered(key, pepper).as_bytes(), &salt)
        .map_err(|e| AuthError::Crypto(format!("root key hash error: {e}")))?;

    Ok(hash.to_string())
}

/// Verify a presented root key against an Argon2id PHC-format hash.
///
/// Returns `Ok(false)` on mismatch and `Err(AuthError::Crypto)` if the
/// stored hash is malformed.
pub fn verify_root_key(key: &str, hash: &str, pepper: Option<&str>) -> Result<bool, AuthError> {
    let parsed_hash = argon2::PasswordHash::new(hash)
        .map_err(|e| AuthError::Crypto(format!("invalid hash format: {e}")))?;

    match Argon2::default().verify_password(peppered(key, pepper).as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(AuthError::Crypto(format!("verify error: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_key_matches() {
        let hash = hash_root_key("operator-root", None).unwrap();
        assert!(verify_root_key("operator-root", &hash, None).unwrap());
    }

    #[test]
    fn wrong_key_does_not_match() {
        let hash = hash_root_key("operator-root", None).unwrap();
        assert!(!verify_root_key("guess", &hash, None).unwrap());
    }

    #[test]
    fn pepper_is_applied() {
        let hash = hash_root_key("operator-root", Some("pepper!")).unwrap();
        assert!(verify_root_key("operator-root", &hash, Some("pepper!")).unwrap());
        assert!(!verify_root_key("operator-root", &hash, None).unwrap());
    }

    #[test]
    fn malformed_hash_returns_error() {
        assert!(verify_root_key("key", "not-a-hash", None).is_err());
    }
}
