//! Database router.
//!
//! Resolves exactly one store for a request context and operation class.
//! The rule this module exists to enforce: a tenant-bound context can
//! never resolve to the system store. Such an attempt is rejected as an
//! [`RoutingError::IsolationViolation`] and audit-logged; it is never
//! redirected to a tenant store.

use thiserror::Error;

use crate::audit;
use crate::context::{OperationClass, OperationDescriptor, RequestContext, classify};
use crate::error::SolgateError;
use crate::registry::StoreId;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    #[error("tenant '{solution}' attempted a SYSTEM operation")]
    IsolationViolation { solution: String },

    #[error("{class} operation requires a tenant-bound context")]
    MissingTenantContext { class: OperationClass },

    /// The context carries no operation class to route on.
    #[error("request context has no operation class")]
    Unclassified,
}

impl From<RoutingError> for SolgateError {
    fn from(err: RoutingError) -> Self {
        match err {
            RoutingError::IsolationViolation { solution } => {
                SolgateError::IsolationViolation { solution }
            }
            RoutingError::MissingTenantContext { class } => SolgateError::MissingTenantContext {
                operation: class.to_string(),
            },
            RoutingError::Unclassified => SolgateError::UnknownOperation(err.to_string()),
        }
    }
}

/// Resolve the target store for `class` under `ctx`.
pub fn resolve(ctx: &RequestContext, class: OperationClass) -> Result<StoreId, RoutingError> {
    match (class, ctx.tenant()) {
        (OperationClass::System, None) => Ok(StoreId::System),
        (OperationClass::System, Some(tenant)) => {
            audit::isolation_violation(ctx.handshake_id(), &tenant.name, class);
            Err(RoutingError::IsolationViolation {
                solution: tenant.name.to_string(),
            })
        }
        (OperationClass::TenantApp, Some(tenant)) => Ok(tenant.stores.app.clone()),
        (OperationClass::TenantErp, Some(tenant)) => Ok(tenant.stores.erp.clone()),
        (OperationClass::TenantApp | OperationClass::TenantErp, None) => {
            Err(RoutingError::MissingTenantContext { class })
        }
    }
}

/// Classify `descriptor` and resolve it in one step.
pub fn resolve_descriptor(
    ctx: &RequestContext,
    descriptor: &OperationDescriptor,
) -> Result<StoreId, RoutingError> {
    resolve(ctx, classify(descriptor))
}

/// Resolve using the operation class recorded on the context.
pub fn resolve_bound(ctx: &RequestContext) -> Result<StoreId, RoutingError> {
    let class = ctx.operation_class().ok_or(RoutingError::Unclassified)?;
    resolve(ctx, class)
}
