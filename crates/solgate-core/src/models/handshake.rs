//! Handshake (issued credential) domain model.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::registry::{SYSTEM_STORE_ID, SolutionName, derive_store_ids};

/// Permission required to mint further handshakes.
pub const PERMISSION_MINT: &str = "handshake:mint";

/// An issued credential as persisted.
///
/// Neither the bearer token nor the secret is stored; only their
/// SHA-256 digests are.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Handshake {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub token_hash: String,
    #[serde(skip_serializing)]
    pub secret_hash: String,
    /// `None` for system-level credentials.
    pub solution_name: Option<SolutionName>,
    pub permissions: BTreeSet<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

/// Validity of a handshake at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeStatus {
    Active,
    Expired,
    Revoked,
}

impl Handshake {
    /// Revocation takes precedence over expiry.
    pub fn status_at(&self, now: DateTime<Utc>, skew: Duration) -> HandshakeStatus {
        if self.revoked_at.is_some() {
            HandshakeStatus::Revoked
        } else if now >= self.expires_at + skew {
            HandshakeStatus::Expired
        } else {
            HandshakeStatus::Active
        }
    }

    pub fn is_system(&self) -> bool {
        self.solution_name.is_none()
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.contains(permission)
    }
}

/// Fields required to persist a new handshake.
#[derive(Debug, Clone)]
pub struct CreateHandshake {
    pub token_hash: String,
    pub secret_hash: String,
    pub solution_name: Option<SolutionName>,
    pub permissions: BTreeSet<String>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// Store identifiers as presented to the credential holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PresentedStores {
    pub erp: Option<String>,
    pub app: Option<String>,
    pub system: String,
}

impl PresentedStores {
    pub fn for_solution(solution: Option<&SolutionName>) -> Self {
        match solution {
            Some(name) => {
                let ids = derive_store_ids(name);
                Self {
                    erp: Some(ids.erp.physical()),
                    app: Some(ids.app.physical()),
                    system: ids.system.physical(),
                }
            }
            None => Self {
                erp: None,
                app: None,
                system: SYSTEM_STORE_ID.to_string(),
            },
        }
    }
}

/// The one-time response to a successful mint.
///
/// `secret` is only ever available here; it cannot be retrieved later.
/// `Debug` redacts both credentials.
#[derive(Clone, Serialize)]
pub struct IssuedHandshake {
    pub handshake_id: Uuid,
    pub token: String,
    pub secret: String,
    pub expires_at: DateTime<Utc>,
    pub solution_name: Option<SolutionName>,
    pub store_ids: PresentedStores,
    pub permissions: BTreeSet<String>,
}

impl fmt::Debug for IssuedHandshake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedHandshake")
            .field("handshake_id", &self.handshake_id)
            .field("token", &"<redacted>")
            .field("secret", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("solution_name", &self.solution_name)
            .field("store_ids", &self.store_ids)
            .field("permissions", &self.permissions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handshake(expires_at: DateTime<Utc>, revoked_at: Option<DateTime<Utc>>) -> Handshake {
        Handshake {
            id: Uuid::new_v4(),
            token_hash: String::new(),
            secret_hash: String::new(),
            solution_name: None,
            permissions: BTreeSet::new(),
            issued_at: expires_at - Duration::hours(1),
            expires_at,
            revoked_at,
        }
    }

    #[test]
    fn status_reflects_expiry_and_skew() {
        let now = Utc::now();
        let hs = handshake(now, None);
        assert_eq!(hs.status_at(now, Duration::zero()), HandshakeStatus::Expired);
        assert_eq!(
            hs.status_at(now, Duration::seconds(2)),
            HandshakeStatus::Active
        );
        assert_eq!(
            hs.status_at(now - Duration::seconds(1), Duration::zero()),
            HandshakeStatus::Active
        );
    }

    #[test]
    fn revocation_wins_over_expiry() {
        let now = Utc::now();
        let hs = handshake(now - Duration::hours(1), Some(now - Duration::hours(2)));
        assert_eq!(hs.status_at(now, Duration::zero()), HandshakeStatus::Revoked);
    }

    #[test]
    fn digests_are_never_serialized() {
        let mut hs = handshake(Utc::now(), None);
        hs.token_hash = "token-digest".into();
        hs.secret_hash = "secret-digest".into();
        let json = serde_json::to_string(&hs).unwrap();
        assert!(!json.contains("token-digest"));
        assert!(!json.contains("secret-digest"));
    }

    #[test]
    fn system_handshake_presents_only_system_store() {
        let stores = PresentedStores::for_solution(None);
        assert_eq!(stores.erp, None);
        assert_eq!(stores.app, None);
        assert_eq!(stores.system, "system_db");
    }

    #[test]
    fn issued_debug_hides_credentials() {
        let issued = IssuedHandshake {
            handshake_id: Uuid::new_v4(),
            token: "hs_plain_token".into(),
            secret: "plain_secret".into(),
            expires_at: Utc::now(),
            solution_name: None,
            store_ids: PresentedStores::for_solution(None),
            permissions: BTreeSet::new(),
        };
        let rendered = format!("{issued:?}");
        assert!(!rendered.contains("hs_plain_token"));
        assert!(!rendered.contains("plain_secret"));
    }
}
