//! SurrealDB implementation of [`SolutionRepository`].
//!
//! The record id is the solution name itself, so two concurrent
//! `create` calls for one name cannot both succeed: the second hits the
//! existing record (or the unique index) and fails with a conflict.

use chrono::{DateTime, Utc};
use solgate_core::error::SolgateResult;
use solgate_core::models::solution::{CreateSolution, Solution};
use solgate_core::registry::SolutionName;
use solgate_core::repository::SolutionRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct SolutionRow {
    name: String,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deprovisioned_at: Option<DateTime<Utc>>,
}

impl SolutionRow {
    fn try_into_solution(self) -> Result<Solution, DbError> {
        let name = SolutionName::parse(&self.name)
            .map_err(|e| DbError::Corrupt(format!("invalid solution name '{}': {e}", self.name)))?;
        Ok(Solution {
            name,
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deprovisioned_at: self.deprovisioned_at,
        })
    }
}

fn single(rows: Vec<SolutionRow>, name: &SolutionName) -> Result<Solution, DbError> {
    rows.into_iter()
        .next()
        .ok_or_else(|| DbError::NotFound {
            entity: "solution".into(),
            id: name.to_string(),
        })?
        .try_into_solution()
}

/// SurrealDB implementation of the Solution repository.
#[derive(Clone)]
pub struct SurrealSolutionRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealSolutionRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> SolutionRepository for SurrealSolutionRepository<C> {
    async fn create(&self, input: CreateSolution) -> SolgateResult<Solution> {
        let result = self
            .db
            .query(
                "CREATE type::record('solution', $name) SET \
                 name = $name, \
                 active = false, \
                 created_at = $created_at, \
                 updated_at = $created_at",
            )
            .bind(("name", input.name.to_string()))
            .bind(("created_at", input.created_at))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement(e, "solution"))?;

        let rows: Vec<SolutionRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, &input.name)?)
    }

    async fn get(&self, name: &SolutionName) -> SolgateResult<Solution> {
        let mut result = self
            .db
            .query("SELECT * FROM type::record('solution', $name)")
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SolutionRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, name)?)
    }

    async fn activate(&self, name: &SolutionName, at: DateTime<Utc>) -> SolgateResult<Solution> {
        let result = self
            .db
            .query(
                "UPDATE type::record('solution', $name) SET \
                 active = true, updated_at = $at \
                 WHERE active = false AND deprovisioned_at = NONE",
            )
            .bind(("name", name.to_string()))
            .bind(("at", at))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<SolutionRow> = result.take(0).map_err(DbError::from)?;
        match rows.into_iter().next() {
            Some(row) => Ok(row.try_into_solution()?),
            None => Err(DbError::Conflict {
                entity: "solution".into(),
                reason: format!("'{name}' is not awaiting activation"),
            }
            .into()),
        }
    }

    async fn mark_deprovisioned(
        &self,
        name: &SolutionName,
        at: DateTime<Utc>,
    ) -> SolgateResult<Solution> {
        let result = self
            .db
            .query(
                "UPDATE type::record('solution', $name) SET \
                 active = false, deprovisioned_at = $at, updated_at = $at",
            )
            .bind(("name", name.to_string()))
            .bind(("at", at))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<SolutionRow> = result.take(0).map_err(DbError::from)?;
        Ok(single(rows, name)?)
    }

    async fn delete(&self, name: &SolutionName) -> SolgateResult<()> {
        self.db
            .query(
                "DELETE type::record('solution', $name) \
                 WHERE active = false AND deprovisioned_at = NONE",
            )
            .bind(("name", name.to_string()))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(())
    }

    async fn list_pending(&self, before: DateTime<Utc>) -> SolgateResult<Vec<Solution>> {
        let mut result = self
            .db
            .query(
                "SELECT * FROM solution \
                 WHERE active = false \
                 AND deprovisioned_at = NONE \
                 AND created_at < $before \
                 ORDER BY created_at ASC",
            )
            .bind(("before", before))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<SolutionRow> = result.take(0).map_err(DbError::from)?;
        let solutions = rows
            .into_iter()
            .map(SolutionRow::try_into_solution)
            .collect::<Result<Vec<_>, DbError>>()?;
        Ok(solutions)
    }
}
