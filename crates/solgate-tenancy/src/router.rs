//! Registry-backed store resolution.

use std::time::Duration;

use solgate_core::context::{OperationClass, OperationDescriptor, RequestContext, classify};
use solgate_core::error::{SolgateError, SolgateResult};
use solgate_core::registry::StoreId;
use solgate_core::repository::SolutionRepository;
use solgate_core::router;
use tracing::debug;

/// Resolves the store for an operation and, for tenant stores, confirms
/// against the registry that the solution is still active.
///
/// The isolation rule itself lives in [`solgate_core::router::resolve`];
/// a violation is rejected before the registry is consulted.
pub struct TenantRouter<S: SolutionRepository> {
    solutions: S,
    timeout: Duration,
}

impl<S: SolutionRepository> TenantRouter<S> {
    pub fn new(solutions: S, timeout: Duration) -> Self {
        Self { solutions, timeout }
    }

    /// Classify `descriptor` and resolve its store.
    pub async fn route(
        &self,
        ctx: &RequestContext,
        descriptor: &OperationDescriptor,
    ) -> SolgateResult<StoreId> {
        self.route_class(ctx, classify(descriptor)).await
    }

    /// Resolve the store for an already classified operation.
    pub async fn route_class(
        &self,
        ctx: &RequestContext,
        class: OperationClass,
    ) -> SolgateResult<StoreId> {
        let store = router::resolve(ctx, class)?;

        if let Some(name) = store.solution() {
            let solution = tokio::time::timeout(self.timeout, self.solutions.get(name))
                .await
                .map_err(|_| SolgateError::Timeout(format!("routing check for '{name}'")))?
                .map_err(|e| match e {
                    // A bound credential for a vanished solution is no
                    // different from a deactivated one.
                    SolgateError::NotFound { .. } => SolgateError::InactiveSolution {
                        name: name.to_string(),
                    },
                    other => other,
                })?;
            if !solution.active {
                return Err(SolgateError::InactiveSolution {
                    name: name.to_string(),
                });
            }
        }

        debug!(
            handshake_id = %ctx.handshake_id(),
            class = %class,
            store = %store,
            "Operation routed"
        );
        Ok(store)
    }
}
