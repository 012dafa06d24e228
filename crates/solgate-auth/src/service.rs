//! Handshake service: mint, validate and revoke scoped credentials.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use solgate_core::audit;
use solgate_core::clock::{self, Clock, SystemClock};
use solgate_core::context::RequestContext;
use solgate_core::error::{SolgateError, SolgateResult};
use solgate_core::models::handshake::{
    CreateHandshake, Handshake, HandshakeStatus, IssuedHandshake, PERMISSION_MINT,
    PresentedStores,
};
use solgate_core::registry::{SolutionName, parse_name};
use solgate_core::repository::{HandshakeRepository, SolutionRepository};
use tracing::debug;
use uuid::Uuid;

use crate::config::HandshakeConfig;
use crate::error::AuthError;
use crate::password;
use crate::token;

/// Input for minting a handshake.
#[derive(Debug, Clone, Default)]
pub struct CreateHandshakeInput {
    /// Tenant to bind to; `None` requests a system-level credential.
    pub solution: Option<String>,
    pub permissions: BTreeSet<String>,
    /// Lifetime in seconds; `None` uses the configured default.
    pub ttl_secs: Option<u64>,
}

#[derive(Debug, Clone)]
enum Authority {
    Root,
    Handshake(Handshake),
}

/// Proof that the caller may mint credentials.
///
/// Only obtainable from [`HandshakeService::authorize_root`] or
/// [`HandshakeService::authorize_handshake`].
#[derive(Debug, Clone)]
pub struct MintAuthority(Authority);

/// Handshake service.
///
/// Generic over repository implementations so that the auth layer has
/// no dependency on the database crate.
pub struct HandshakeService<H: HandshakeRepository, S: SolutionRepository> {
    handshakes: H,
    solutions: S,
    config: HandshakeConfig,
    clock: Arc<dyn Clock>,
}

impl<H: HandshakeRepository, S: SolutionRepository> HandshakeService<H, S> {
    pub fn new(handshakes: H, solutions: S, config: HandshakeConfig) -> Self {
        Self {
            handshakes,
            solutions,
            config,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &HandshakeConfig {
        &self.config
    }

    /// Verify the operator root key and grant unrestricted minting.
    pub fn authorize_root(&self, presented_key: &str) -> SolgateResult<MintAuthority> {
        let Some(hash) = self.config.root_key_hash.as_deref() else {
            audit::mint_denied("root minting disabled", None);
            return Err(SolgateError::Forbidden {
                reason: "root minting is disabled".into(),
            });
        };
        if !password::verify_root_key(presented_key, hash, self.config.pepper.as_deref())? {
            audit::mint_denied("root key mismatch", None);
            return Err(SolgateError::Unauthorized);
        }
        Ok(MintAuthority(Authority::Root))
    }

    /// Grant minting to a validated handshake holding `handshake:mint`.
    pub fn authorize_handshake(&self, handshake: Handshake) -> SolgateResult<MintAuthority> {
        let status = handshake.status_at(self.clock.now(), self.skew());
        if status != HandshakeStatus::Active {
            audit::mint_denied("minting handshake not active", None);
            return Err(SolgateError::Unauthorized);
        }
        if !handshake.has_permission(PERMISSION_MINT) {
            audit::mint_denied(
                "missing mint permission",
                handshake.solution_name.as_ref().map(SolutionName::as_str),
            );
            return Err(SolgateError::Forbidden {
                reason: format!("'{PERMISSION_MINT}' permission required"),
            });
        }
        Ok(MintAuthority(Authority::Handshake(handshake)))
    }

    /// Mint a new handshake.
    ///
    /// The returned [`IssuedHandshake`] is the only place the raw token
    /// and secret ever appear.
    pub async fn create(
        &self,
        authority: &MintAuthority,
        input: CreateHandshakeInput,
    ) -> SolgateResult<IssuedHandshake> {
        // 1. Bound the lifetime.
        let ttl = input.ttl_secs.unwrap_or(self.config.default_ttl_secs);
        if ttl < self.config.min_ttl_secs || ttl > self.config.max_ttl_secs {
            return Err(SolgateError::Validation {
                message: format!(
                    "ttl must be between {} and {} seconds",
                    self.config.min_ttl_secs, self.config.max_ttl_secs
                ),
            });
        }

        // 2. Validate the requested scope and the caller's right to it.
        let solution = input.solution.as_deref().map(parse_name).transpose()?;
        check_mint_scope(authority, solution.as_ref(), &input.permissions)?;

        // 3. Tenant credentials only for registered, active solutions.
        if let Some(name) = &solution {
            let record = self.solutions.get(name).await?;
            if !record.active {
                audit::mint_denied("solution inactive", Some(name.as_str()));
                return Err(SolgateError::InactiveSolution {
                    name: name.to_string(),
                });
            }
        }

        // 4. Generate and persist digests only.
        let raw_token = token::generate_token();
        let raw_secret = token::generate_secret();
        let issued_at = self.clock.now();
        let expires_at =
            clock::seconds_after(issued_at, ttl).ok_or_else(|| SolgateError::Validation {
                message: format!("ttl of {ttl} seconds is out of range"),
            })?;

        let handshake = self
            .handshakes
            .create(CreateHandshake {
                token_hash: token::digest(&raw_token),
                secret_hash: token::digest(&raw_secret),
                solution_name: solution,
                permissions: input.permissions,
                issued_at,
                expires_at,
            })
            .await?;

        audit::handshake_issued(
            handshake.id,
            handshake.solution_name.as_ref(),
            handshake.expires_at,
        );

        Ok(IssuedHandshake {
            handshake_id: handshake.id,
            token: raw_token,
            secret: raw_secret,
            expires_at: handshake.expires_at,
            store_ids: PresentedStores::for_solution(handshake.solution_name.as_ref()),
            solution_name: handshake.solution_name,
            permissions: handshake.permissions,
        })
    }

    /// Validate a presented token/secret pair.
    ///
    /// Always reads the authoritative record, so a revocation is seen by
    /// the very next call. The precise failure is audit-logged; callers
    /// at the boundary should convert it with `SolgateError::from`.
    pub async fn validate(&self, raw_token: &str, raw_secret: &str) -> Result<Handshake, AuthError> {
        let token_hash = token::digest(raw_token);
        let secret_hash = token::digest(raw_secret);

        let lookup = tokio::time::timeout(
            StdDuration::from_millis(self.config.lookup_timeout_ms),
            self.handshakes.get_by_token_hash(&token_hash),
        )
        .await;

        let handshake = match lookup {
            Ok(Ok(hs)) => hs,
            Ok(Err(SolgateError::NotFound { .. })) => {
                audit::auth_failure(AuthError::Invalid.reason(), None);
                return Err(AuthError::Invalid);
            }
            Ok(Err(e)) => return Err(AuthError::Unavailable(e.to_string())),
            Err(_) => return Err(AuthError::Timeout),
        };

        if !token::digests_match(&handshake.secret_hash, &secret_hash) {
            audit::auth_failure(AuthError::Invalid.reason(), Some(handshake.id));
            return Err(AuthError::Invalid);
        }

        match handshake.status_at(self.clock.now(), self.skew()) {
            HandshakeStatus::Active => {
                debug!(handshake_id = %handshake.id, "Handshake validated");
                Ok(handshake)
            }
            HandshakeStatus::Revoked => {
                audit::auth_failure(AuthError::Revoked.reason(), Some(handshake.id));
                Err(AuthError::Revoked)
            }
            HandshakeStatus::Expired => {
                audit::auth_failure(AuthError::Expired.reason(), Some(handshake.id));
                Err(AuthError::Expired)
            }
        }
    }

    /// Validate and bind in one step, collapsing credential failures to
    /// [`SolgateError::Unauthorized`].
    pub async fn authenticate(
        &self,
        raw_token: &str,
        raw_secret: &str,
    ) -> SolgateResult<RequestContext> {
        let handshake = self.validate(raw_token, raw_secret).await?;
        Ok(RequestContext::bind(&handshake))
    }

    /// Revoke a handshake. Revoking twice is not an error.
    pub async fn revoke(&self, handshake_id: Uuid) -> SolgateResult<()> {
        self.handshakes
            .revoke(handshake_id, self.clock.now())
            .await?;
        audit::handshake_revoked(handshake_id);
        Ok(())
    }

    /// Delete records that expired or were revoked longer ago than the
    /// retention window.
    pub async fn purge_expired(&self) -> SolgateResult<u64> {
        let retention = self.config.retention_secs;
        let before = clock::seconds_before(self.clock.now(), retention).ok_or_else(|| {
            SolgateError::Internal(format!("retention of {retention} seconds is out of range"))
        })?;
        let purged = self.handshakes.purge(before).await?;
        debug!(purged, %before, "Purged expired handshakes");
        Ok(purged)
    }

    fn skew(&self) -> Duration {
        Duration::seconds(self.config.effective_skew_secs() as i64)
    }
}

/// Decide whether `authority` may mint for `solution` with `permissions`.
///
/// Root and system-level handshakes may mint anything. A tenant-bound
/// handshake may mint only for its own solution and only a subset of
/// its own permissions.
fn check_mint_scope(
    authority: &MintAuthority,
    solution: Option<&SolutionName>,
    permissions: &BTreeSet<String>,
) -> SolgateResult<()> {
    let minter = match &authority.0 {
        Authority::Root => return Ok(()),
        Authority::Handshake(hs) => hs,
    };
    let Some(own) = minter.solution_name.as_ref() else {
        return Ok(());
    };

    let requested = solution.map(SolutionName::as_str);
    if solution != Some(own) {
        audit::mint_denied("cross-tenant mint", requested);
        return Err(SolgateError::Forbidden {
            reason: "tenant credentials may only mint for their own solution".into(),
        });
    }
    if !permissions.is_subset(&minter.permissions) {
        audit::mint_denied("permission escalation", requested);
        return Err(SolgateError::Forbidden {
            reason: "requested permissions exceed the minting credential".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn minter(solution: Option<&str>, permissions: &[&str]) -> MintAuthority {
        let now = Utc::now();
        MintAuthority(Authority::Handshake(Handshake {
            id: Uuid::new_v4(),
            token_hash: String::new(),
            secret_hash: String::new(),
            solution_name: solution.map(|s| SolutionName::parse(s).unwrap()),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
            issued_at: now,
            expires_at: now + Duration::hours(1),
            revoked_at: None,
        }))
    }

    fn perms(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|p| p.to_string()).collect()
    }

    fn name(raw: &str) -> SolutionName {
        SolutionName::parse(raw).unwrap()
    }

    #[test]
    fn root_may_mint_anything() {
        let root = MintAuthority(Authority::Root);
        assert!(check_mint_scope(&root, None, &perms(&["admin"])).is_ok());
        assert!(check_mint_scope(&root, Some(&name("acme")), &perms(&["read"])).is_ok());
    }

    #[test]
    fn system_minter_may_mint_for_any_tenant() {
        let system = minter(None, &[PERMISSION_MINT]);
        assert!(check_mint_scope(&system, Some(&name("acme")), &perms(&["write"])).is_ok());
    }

    #[test]
    fn tenant_minter_is_confined_to_own_solution() {
        let tenant = minter(Some("acme"), &[PERMISSION_MINT, "read"]);
        assert!(check_mint_scope(&tenant, Some(&name("acme")), &perms(&["read"])).is_ok());
        assert!(matches!(
            check_mint_scope(&tenant, Some(&name("globex")), &perms(&["read"])),
            Err(SolgateError::Forbidden { .. })
        ));
        assert!(matches!(
            check_mint_scope(&tenant, None, &perms(&["read"])),
            Err(SolgateError::Forbidden { .. })
        ));
    }

    #[test]
    fn tenant_minter_cannot_escalate() {
        let tenant = minter(Some("acme"), &[PERMISSION_MINT, "read"]);
        assert!(matches!(
            check_mint_scope(&tenant, Some(&name("acme")), &perms(&["read", "write"])),
            Err(SolgateError::Forbidden { .. })
        ));
    }
}
