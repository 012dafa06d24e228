//! Solution lifecycle: provisioning, deprovisioning and recovery of
//! interrupted provisioning.
//!
//! Provisioning is all-or-nothing. The registry record is created first
//! (its uniqueness serializes concurrent attempts for one name), then the
//! app and ERP stores, then the record is activated. Any failure after
//! registration drops both tenant stores and deletes the record. Store
//! operations are idempotent, so rollback never needs to know how far the
//! failed step got.

use std::sync::Arc;

use serde::Serialize;
use solgate_core::audit;
use solgate_core::clock::{self, Clock, SystemClock};
use solgate_core::error::{SolgateError, SolgateResult};
use solgate_core::models::solution::{CreateSolution, Solution};
use solgate_core::registry::{SolutionName, derive_store_ids};
use solgate_core::repository::{HandshakeRepository, SolutionRepository, StoreProvisioner};
use tracing::{info, warn};

use crate::config::TenancyConfig;
use crate::error::{DeprovisionError, ProvisionError};

/// Result of [`SolutionLifecycleManager::recover_stale`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RecoveryReport {
    pub rolled_back: Vec<String>,
    pub failed: Vec<String>,
}

enum StepError {
    Failed(SolgateError),
    TimedOut,
}

impl StepError {
    fn provision(self, step: &'static str) -> ProvisionError {
        match self {
            StepError::Failed(source) => ProvisionError::Step { step, source },
            StepError::TimedOut => ProvisionError::TimedOut { step },
        }
    }

    fn deprovision(self, step: &'static str) -> DeprovisionError {
        match self {
            StepError::Failed(source) => DeprovisionError::Step { step, source },
            StepError::TimedOut => DeprovisionError::TimedOut { step },
        }
    }
}

impl std::fmt::Display for StepError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StepError::Failed(e) => write!(f, "{e}"),
            StepError::TimedOut => f.write_str("timed out"),
        }
    }
}

pub struct SolutionLifecycleManager<S, P, H>
where
    S: SolutionRepository,
    P: StoreProvisioner,
    H: HandshakeRepository,
{
    solutions: S,
    provisioner: P,
    handshakes: H,
    config: TenancyConfig,
    clock: Arc<dyn Clock>,
}

impl<S, P, H> SolutionLifecycleManager<S, P, H>
where
    S: SolutionRepository,
    P: StoreProvisioner,
    H: HandshakeRepository,
{
    pub fn new(solutions: S, provisioner: P, handshakes: H, config: TenancyConfig) -> Self {
        Self {
            solutions,
            provisioner,
            handshakes,
            config,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Register `name`, create its app and ERP stores and activate it.
    pub async fn provision(&self, name: &str) -> Result<Solution, ProvisionError> {
        let name = SolutionName::parse(name).map_err(|source| ProvisionError::InvalidName {
            name: name.to_string(),
            source,
        })?;

        // A timed-out registration is not rolled back here: the record may
        // belong to a concurrent caller. recover_stale handles leftovers.
        let created_at = self.clock.now();
        match self
            .step(self.solutions.create(CreateSolution {
                name: name.clone(),
                created_at,
            }))
            .await
        {
            Ok(_) => {}
            Err(StepError::Failed(SolgateError::AlreadyExists { .. })) => {
                warn!(solution = %name, "Provisioning refused: name taken");
                return Err(ProvisionError::Conflict {
                    name: name.to_string(),
                });
            }
            Err(e) => return Err(e.provision("register")),
        }
        audit::lifecycle("provision_started", &name);

        let stores = derive_store_ids(&name);
        for (step, store) in [("create_app_store", &stores.app), ("create_erp_store", &stores.erp)] {
            if let Err(e) = self.step(self.provisioner.create_store(store)).await {
                return Err(self.roll_back(&name, step, e).await);
            }
        }

        let solution = match self
            .step(self.solutions.activate(&name, self.clock.now()))
            .await
        {
            Ok(solution) => solution,
            Err(e) => return Err(self.roll_back(&name, "activate", e).await),
        };

        audit::lifecycle("provisioned", &name);
        info!(
            solution = %name,
            app_store = %stores.app,
            erp_store = %stores.erp,
            "Solution provisioned"
        );
        Ok(solution)
    }

    /// Revoke the solution's handshakes, drop its tenant stores and mark
    /// it deprovisioned. The record is kept so the name is never reused.
    ///
    /// A solution whose provisioning has not finished is refused; it is
    /// either activated or rolled back first.
    pub async fn deprovision(&self, name: &str, confirm: bool) -> Result<(), DeprovisionError> {
        if !confirm {
            return Err(DeprovisionError::ConfirmationRequired);
        }
        let name = SolutionName::parse(name).map_err(|source| DeprovisionError::InvalidName {
            name: name.to_string(),
            source,
        })?;

        match self.step(self.solutions.get(&name)).await {
            Ok(solution) if solution.is_pending() => {
                warn!(solution = %name, "Deprovisioning refused: provisioning in progress");
                return Err(DeprovisionError::InProgress {
                    name: name.to_string(),
                });
            }
            Ok(_) => {}
            Err(StepError::Failed(SolgateError::NotFound { .. })) => {
                return Err(DeprovisionError::NotFound {
                    name: name.to_string(),
                });
            }
            Err(e) => return Err(e.deprovision("lookup")),
        }
        audit::lifecycle("deprovision_started", &name);

        let revoked = self
            .step(self.handshakes.revoke_for_solution(&name, self.clock.now()))
            .await
            .map_err(|e| e.deprovision("revoke_handshakes"))?;

        let stores = derive_store_ids(&name);
        for (step, store) in [("drop_app_store", &stores.app), ("drop_erp_store", &stores.erp)] {
            self.step(self.provisioner.drop_store(store))
                .await
                .map_err(|e| e.deprovision(step))?;
        }

        self.step(self.solutions.mark_deprovisioned(&name, self.clock.now()))
            .await
            .map_err(|e| e.deprovision("mark_deprovisioned"))?;

        // Minting requires an active solution, so nothing can be issued
        // past this point; sweep anything issued since the first pass.
        let late = self
            .step(self.handshakes.revoke_for_solution(&name, self.clock.now()))
            .await
            .map_err(|e| e.deprovision("revoke_late_handshakes"))?;

        audit::lifecycle("deprovisioned", &name);
        info!(
            solution = %name,
            revoked_handshakes = revoked + late,
            "Solution deprovisioned"
        );
        Ok(())
    }

    /// Roll back provisioning attempts that never completed and are older
    /// than the configured window.
    pub async fn recover_stale(&self) -> SolgateResult<RecoveryReport> {
        let stale = self.config.stale_provision_secs;
        let cutoff = clock::seconds_before(self.clock.now(), stale).ok_or_else(|| {
            SolgateError::Internal(format!("stale window of {stale} seconds is out of range"))
        })?;
        let pending = self.solutions.list_pending(cutoff).await?;

        let mut report = RecoveryReport::default();
        for solution in pending {
            match self.clean_up(&solution.name).await {
                Ok(()) => {
                    audit::lifecycle("stale_provision_rolled_back", &solution.name);
                    report.rolled_back.push(solution.name.to_string());
                }
                Err(e) => {
                    warn!(
                        solution = %solution.name,
                        error = %e,
                        "Failed to roll back stale provisioning"
                    );
                    report.failed.push(solution.name.to_string());
                }
            }
        }
        Ok(report)
    }

    async fn roll_back(
        &self,
        name: &SolutionName,
        step: &'static str,
        cause: StepError,
    ) -> ProvisionError {
        warn!(solution = %name, step, error = %cause, "Provisioning failed, rolling back");
        match self.clean_up(name).await {
            Ok(()) => {
                audit::lifecycle("provision_rolled_back", name);
                cause.provision(step)
            }
            Err(e) => ProvisionError::RollbackFailed {
                step,
                reason: e.to_string(),
            },
        }
    }

    /// Drop both tenant stores, then delete the registry record.
    async fn clean_up(&self, name: &SolutionName) -> Result<(), StepError> {
        let stores = derive_store_ids(name);
        for store in [&stores.erp, &stores.app] {
            self.step(self.provisioner.drop_store(store)).await?;
        }
        self.step(self.solutions.delete(name)).await
    }

    async fn step<T>(
        &self,
        fut: impl Future<Output = SolgateResult<T>>,
    ) -> Result<T, StepError> {
        match tokio::time::timeout(self.config.step_timeout(), fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(StepError::Failed(e)),
            Err(_) => Err(StepError::TimedOut),
        }
    }
}
