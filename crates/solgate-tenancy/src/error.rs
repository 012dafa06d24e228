//! Tenancy error types.

use solgate_core::error::SolgateError;
use solgate_core::registry::InvalidNameError;
use thiserror::Error;

/// Failure of [`provision`](crate::SolutionLifecycleManager::provision).
///
/// Except for [`ProvisionError::RollbackFailed`], partial state has
/// already been removed by the time this is returned.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("invalid solution name '{name}': {source}")]
    InvalidName {
        name: String,
        source: InvalidNameError,
    },

    #[error("solution '{name}' already exists")]
    Conflict { name: String },

    #[error("provisioning step '{step}' failed: {source}")]
    Step {
        step: &'static str,
        source: SolgateError,
    },

    #[error("provisioning step '{step}' timed out")]
    TimedOut { step: &'static str },

    /// Rollback did not complete; the record stays pending and is
    /// picked up by `recover_stale`.
    #[error("rollback after failed step '{step}' did not complete: {reason}")]
    RollbackFailed { step: &'static str, reason: String },
}

impl From<ProvisionError> for SolgateError {
    fn from(err: ProvisionError) -> Self {
        match err {
            ProvisionError::InvalidName { name, source } => SolgateError::InvalidName {
                name,
                reason: source.to_string(),
            },
            ProvisionError::Conflict { .. } => SolgateError::AlreadyExists {
                entity: "solution".into(),
            },
            ProvisionError::TimedOut { .. } => SolgateError::Timeout(err.to_string()),
            ProvisionError::Step { .. } | ProvisionError::RollbackFailed { .. } => {
                SolgateError::Provision(err.to_string())
            }
        }
    }
}

/// Failure of [`deprovision`](crate::SolutionLifecycleManager::deprovision).
///
/// The `active` flag is only cleared by the final step, so any failure
/// leaves it as it was. Every step is idempotent; calling `deprovision`
/// again resumes.
#[derive(Debug, Error)]
pub enum DeprovisionError {
    #[error("deprovisioning requires explicit confirmation")]
    ConfirmationRequired,

    #[error("invalid solution name '{name}': {source}")]
    InvalidName {
        name: String,
        source: InvalidNameError,
    },

    #[error("solution '{name}' not found")]
    NotFound { name: String },

    #[error("solution '{name}' is still being provisioned")]
    InProgress { name: String },

    #[error("deprovisioning step '{step}' failed: {source}")]
    Step {
        step: &'static str,
        source: SolgateError,
    },

    #[error("deprovisioning step '{step}' timed out")]
    TimedOut { step: &'static str },
}

impl From<DeprovisionError> for SolgateError {
    fn from(err: DeprovisionError) -> Self {
        match err {
            DeprovisionError::ConfirmationRequired => SolgateError::ConfirmationRequired,
            DeprovisionError::InvalidName { name, source } => SolgateError::InvalidName {
                name,
                reason: source.to_string(),
            },
            DeprovisionError::NotFound { name } => SolgateError::NotFound {
                entity: "solution".into(),
                id: name,
            },
            DeprovisionError::InProgress { .. } => SolgateError::Conflict {
                entity: "solution".into(),
                reason: err.to_string(),
            },
            DeprovisionError::TimedOut { .. } => SolgateError::Timeout(err.to_string()),
            DeprovisionError::Step { .. } => SolgateError::Deprovision(err.to_string()),
        }
    }
}

/// Failure of a schema-fallback write.
///
/// A field unknown to the primary schema is never a cause.
#[derive(Debug, Error)]
pub enum WriteError {
    /// Routing refused the request before any store was touched.
    #[error("write rejected: {0}")]
    Rejected(SolgateError),

    /// The diverted fields were already stored. Retrying the same write
    /// is safe.
    #[error("primary store write failed: {0}")]
    Primary(String),

    /// Nothing reached the primary store. Retrying the same write is
    /// safe.
    #[error("custom field write failed: {0}")]
    SideStore(String),
}

impl From<WriteError> for SolgateError {
    fn from(err: WriteError) -> Self {
        match err {
            WriteError::Rejected(inner) => inner,
            WriteError::Primary(_) => SolgateError::Write(err.to_string()),
            WriteError::SideStore(msg) => SolgateError::Database(msg),
        }
    }
}
