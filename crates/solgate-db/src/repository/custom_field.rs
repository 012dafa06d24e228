//! SurrealDB implementation of [`CustomFieldRepository`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use solgate_core::error::SolgateResult;
use solgate_core::models::custom_field::CustomFieldRecord;
use solgate_core::registry::SolutionName;
use solgate_core::repository::CustomFieldRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::debug;

use crate::error::{DbError, is_write_conflict};

/// Each conflict means another writer committed, so this bounds the
/// number of concurrent writers to one key that always succeed.
const MAX_CONFLICT_RETRIES: u32 = 64;

#[derive(Debug, SurrealValue)]
struct CustomFieldRow {
    solution_name: String,
    model_name: String,
    record_id: String,
    field_name: String,
    #[surreal(rename = "field_value")]
    value_json: String,
    written_at: DateTime<Utc>,
}

impl CustomFieldRow {
    fn try_into_record(self) -> Result<CustomFieldRecord, DbError> {
        let solution_name = SolutionName::parse(&self.solution_name).map_err(|e| {
            DbError::Corrupt(format!("invalid solution name '{}': {e}", self.solution_name))
        })?;
        let field_value = serde_json::from_str(&self.value_json)
            .map_err(|e| DbError::Corrupt(format!("invalid field value JSON: {e}")))?;
        Ok(CustomFieldRecord {
            solution_name,
            model_name: self.model_name,
            record_id: self.record_id,
            field_name: self.field_name,
            field_value,
            written_at: self.written_at,
        })
    }
}

/// Record id for a composite key. Parts are joined with the ASCII unit
/// separator so `("a_b", "c")` and `("a", "b_c")` never collide.
fn record_key(solution: &str, model_name: &str, record_id: &str, field_name: &str) -> String {
    let mut hasher = Sha256::new();
    for (i, part) in [solution, model_name, record_id, field_name]
        .into_iter()
        .enumerate()
    {
        if i > 0 {
            hasher.update([0x1f]);
        }
        hasher.update(part.as_bytes());
    }
    hex::encode(hasher.finalize())
}

/// SurrealDB implementation of the custom field side-store.
#[derive(Clone)]
pub struct SurrealCustomFieldRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealCustomFieldRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> SurrealCustomFieldRepository<C> {
    async fn try_upsert(
        &self,
        key: &str,
        record: &CustomFieldRecord,
        value: &str,
    ) -> Result<(), surrealdb::Error> {
        self.db
            .query(
                "UPSERT type::record('custom_field', $key) SET \
                 solution_name = $solution_name, \
                 model_name = $model_name, \
                 record_id = $record_id, \
                 field_name = $field_name, \
                 field_value = $field_value, \
                 written_at = $written_at",
            )
            .bind(("key", key.to_string()))
            .bind(("solution_name", record.solution_name.to_string()))
            .bind(("model_name", record.model_name.clone()))
            .bind(("record_id", record.record_id.clone()))
            .bind(("field_name", record.field_name.clone()))
            .bind(("field_value", value.to_string()))
            .bind(("written_at", record.written_at))
            .await?
            .check()?;
        Ok(())
    }
}

impl<C: Connection> CustomFieldRepository for SurrealCustomFieldRepository<C> {
    /// A writer that loses a transaction race to another writer of the
    /// same key runs its statement again, so concurrent writers all
    /// succeed and the last one to commit wins.
    async fn upsert(&self, record: CustomFieldRecord) -> SolgateResult<()> {
        let key = record_key(
            record.solution_name.as_str(),
            &record.model_name,
            &record.record_id,
            &record.field_name,
        );
        let value = serde_json::to_string(&record.field_value)
            .map_err(|e| DbError::Corrupt(format!("unserializable field value: {e}")))?;

        let mut attempt = 0;
        loop {
            match self.try_upsert(&key, &record, &value).await {
                Ok(()) => return Ok(()),
                Err(e) if is_write_conflict(&e) && attempt < MAX_CONFLICT_RETRIES => {
                    attempt += 1;
                    debug!(
                        model = %record.model_name,
                        field = %record.field_name,
                        attempt,
                        "Custom field write conflicted, retrying"
                    );
                    tokio::time::sleep(Duration::from_millis(u64::from(attempt))).await;
                }
                Err(e) => return Err(DbError::from_statement(e, "custom_field").into()),
            }
        }
    }

    async fn list_for_record(
        &self,
        solution: &SolutionName,
        model_name: &str,
        record_id: &str,
    ) -> SolgateResult<Vec<CustomFieldRecord>> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM custom_field \
                 WHERE solution_name = $solution_name \
                 AND model_name = $model_name \
                 AND record_id = $record_id \
                 ORDER BY field_name ASC",
            )
            .bind(("solution_name", solution.to_string()))
            .bind(("model_name", model_name.to_string()))
            .bind(("record_id", record_id.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<CustomFieldRow> = result.take(0).map_err(DbError::from)?;
        let records = rows
            .into_iter()
            .map(CustomFieldRow::try_into_record)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(records)
    }
}
