//! Security-audit events.
//!
//! All events go to the [`AUDIT_TARGET`] tracing target so they can be
//! routed separately from ordinary logs. Tokens and secrets are never
//! passed to these helpers.

use chrono::{DateTime, Utc};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::context::OperationClass;
use crate::registry::SolutionName;

pub const AUDIT_TARGET: &str = "solgate::audit";

/// A tenant-bound context tried to reach the system store.
pub fn isolation_violation(handshake_id: Uuid, solution: &SolutionName, class: OperationClass) {
    error!(
        target: AUDIT_TARGET,
        event = "isolation_violation",
        handshake_id = %handshake_id,
        solution = %solution,
        operation_class = %class,
        "Tenant context attempted to resolve the system store"
    );
}

/// Credential validation failed. `reason` is the precise internal cause
/// (`invalid`, `expired`, `revoked`), which callers never see.
pub fn auth_failure(reason: &'static str, handshake_id: Option<Uuid>) {
    warn!(
        target: AUDIT_TARGET,
        event = "auth_failure",
        reason,
        handshake_id = ?handshake_id,
        "Handshake validation failed"
    );
}

pub fn handshake_issued(
    handshake_id: Uuid,
    solution: Option<&SolutionName>,
    expires_at: DateTime<Utc>,
) {
    info!(
        target: AUDIT_TARGET,
        event = "handshake_issued",
        handshake_id = %handshake_id,
        solution = ?solution.map(SolutionName::as_str),
        expires_at = %expires_at,
        "Handshake issued"
    );
}

pub fn handshake_revoked(handshake_id: Uuid) {
    info!(
        target: AUDIT_TARGET,
        event = "handshake_revoked",
        handshake_id = %handshake_id,
        "Handshake revoked"
    );
}

pub fn mint_denied(reason: &str, requested_solution: Option<&str>) {
    warn!(
        target: AUDIT_TARGET,
        event = "mint_denied",
        reason,
        requested_solution = ?requested_solution,
        "Handshake mint denied"
    );
}

/// Provisioning and deprovisioning milestones.
pub fn lifecycle(event: &'static str, solution: &SolutionName) {
    info!(
        target: AUDIT_TARGET,
        event,
        solution = %solution,
        "Solution lifecycle event"
    );
}
