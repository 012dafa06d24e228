//! Database-specific error types and conversions.

use solgate_core::error::SolgateError;

/// Database-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("SurrealDB error: {0}")]
    Surreal(#[from] surrealdb::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Query failed: {0}")]
    Query(String),

    /// The record exists but is not in the state the statement requires.
    #[error("Conflict on {entity}: {reason}")]
    Conflict { entity: String, reason: String },

    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Record already exists: {entity}")]
    AlreadyExists { entity: String },

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Refused: {0}")]
    Refused(String),
}

impl DbError {
    /// Map a failed statement, recognising uniqueness conflicts.
    pub(crate) fn from_statement(err: surrealdb::Error, entity: &str) -> Self {
        let message = err.to_string();
        if message.contains("already exists") || message.contains("already contains") {
            DbError::AlreadyExists {
                entity: entity.to_string(),
            }
        } else {
            DbError::Query(message)
        }
    }
}

/// Whether a statement lost an optimistic transaction race and can be run
/// again unchanged.
pub(crate) fn is_write_conflict(err: &surrealdb::Error) -> bool {
    let message = err.to_string();
    message.contains("Transaction conflict") || message.contains("retry the transaction")
}

impl From<DbError> for SolgateError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => SolgateError::NotFound { entity, id },
            DbError::AlreadyExists { entity } => SolgateError::AlreadyExists { entity },
            DbError::Refused(reason) => SolgateError::Forbidden { reason },
            DbError::Conflict { entity, reason } => SolgateError::Conflict { entity, reason },
            other => SolgateError::Database(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use solgate_core::error::ErrorClass;

    use super::*;

    #[test]
    fn query_failures_are_not_reported_as_migrations() {
        let err = DbError::Query("syntax error".into());
        assert_eq!(err.to_string(), "Query failed: syntax error");

        let err: SolgateError = err.into();
        assert!(matches!(err, SolgateError::Database(ref msg) if msg.starts_with("Query failed")));
    }

    #[test]
    fn state_conflict_maps_to_conflict_class() {
        let err: SolgateError = DbError::Conflict {
            entity: "solution".into(),
            reason: "not pending".into(),
        }
        .into();
        assert_eq!(err.class(), ErrorClass::Conflict);
        assert!(!err.class().is_retryable());
    }
}
