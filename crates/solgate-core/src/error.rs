//! Error types for the solgate subsystem.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolgateError {
    #[error("Invalid solution name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// Deliberately carries no detail; the precise cause is audit-logged
    /// where it is detected.
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Forbidden: {reason}")]
    Forbidden { reason: String },

    #[error("Isolation violation: tenant '{solution}' attempted to reach the system store")]
    IsolationViolation { solution: String },

    #[error("Tenant context missing for {operation} operation")]
    MissingTenantContext { operation: String },

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Solution is not active: {name}")]
    InactiveSolution { name: String },

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Entity already exists: {entity}")]
    AlreadyExists { entity: String },

    /// The entity exists but its current state does not allow the
    /// operation, e.g. a solution still being provisioned.
    #[error("Conflict on {entity}: {reason}")]
    Conflict { entity: String, reason: String },

    #[error("Explicit confirmation is required")]
    ConfirmationRequired,

    #[error("Provisioning failed: {0}")]
    Provision(String),

    #[error("Deprovisioning failed: {0}")]
    Deprovision(String),

    #[error("Primary write failed: {0}")]
    Write(String),

    #[error("Validation error: {message}")]
    Validation { message: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type SolgateResult<T> = Result<T, SolgateError>;

/// Caller-facing classification of an error.
///
/// The request boundary turns this into a response; it never needs to
/// inspect the error itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Correctable input (bad name, bad TTL). Not retried.
    InvalidInput,
    /// Uniform credential denial.
    Unauthorized,
    Forbidden,
    Conflict,
    NotFound,
    /// Tenant context tried to reach the system store.
    SecurityViolation,
    /// Misclassified or unbound operation; a bug in the caller.
    ProgrammingError,
    /// Store unreachable or slow. The only retryable class.
    Unavailable,
}

impl ErrorClass {
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorClass::Unavailable)
    }
}

impl SolgateError {
    pub fn class(&self) -> ErrorClass {
        match self {
            SolgateError::InvalidName { .. }
            | SolgateError::Validation { .. }
            | SolgateError::ConfirmationRequired => ErrorClass::InvalidInput,
            SolgateError::Unauthorized => ErrorClass::Unauthorized,
            SolgateError::Forbidden { .. } | SolgateError::InactiveSolution { .. } => {
                ErrorClass::Forbidden
            }
            SolgateError::AlreadyExists { .. } | SolgateError::Conflict { .. } => {
                ErrorClass::Conflict
            }
            SolgateError::NotFound { .. } => ErrorClass::NotFound,
            SolgateError::IsolationViolation { .. } => ErrorClass::SecurityViolation,
            SolgateError::MissingTenantContext { .. } | SolgateError::UnknownOperation(_) => {
                ErrorClass::ProgrammingError
            }
            SolgateError::Provision(_)
            | SolgateError::Deprovision(_)
            | SolgateError::Write(_)
            | SolgateError::Database(_)
            | SolgateError::Crypto(_)
            | SolgateError::Timeout(_)
            | SolgateError::Internal(_) => ErrorClass::Unavailable,
        }
    }
}
