//! SurrealDB implementation of [`HandshakeRepository`].

use chrono::{DateTime, Utc};
use solgate_core::error::SolgateResult;
use solgate_core::models::handshake::{CreateHandshake, Handshake};
use solgate_core::registry::SolutionName;
use solgate_core::repository::HandshakeRepository;
use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use uuid::Uuid;

use crate::error::DbError;

#[derive(Debug, SurrealValue)]
struct HandshakeRow {
    token_hash: String,
    secret_hash: String,
    solution_name: Option<String>,
    permissions: Vec<String>,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    revoked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, SurrealValue)]
struct HandshakeRowWithId {
    record_id: String,
    token_hash: String,
    secret_hash: String,
    solution_name: Option<String>,
    permissions: Vec<String>,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    revoked_at: Option<DateTime<Utc>>,
}

fn parse_solution(raw: Option<String>) -> Result<Option<SolutionName>, DbError> {
    raw.map(|name| {
        SolutionName::parse(&name)
            .map_err(|e| DbError::Corrupt(format!("invalid solution name '{name}': {e}")))
    })
    .transpose()
}

impl HandshakeRow {
    fn into_handshake(self, id: Uuid) -> Result<Handshake, DbError> {
        Ok(Handshake {
            id,
            token_hash: self.token_hash,
            secret_hash: self.secret_hash,
            solution_name: parse_solution(self.solution_name)?,
            permissions: self.permissions.into_iter().collect(),
            issued_at: self.issued_at,
            expires_at: self.expires_at,
            revoked_at: self.revoked_at,
        })
    }
}

impl HandshakeRowWithId {
    fn try_into_handshake(self) -> Result<Handshake, DbError> {
        let id = Uuid::parse_str(&self.record_id)
            .map_err(|e| DbError::Corrupt(format!("invalid UUID: {e}")))?;
        Ok(Handshake {
            id,
            token_hash: self.token_hash,
            secret_hash: self.secret_hash,
            solution_name: parse_solution(self.solution_name)?,
            permissions: self.permissions.into_iter().collect(),
            issued_at: self.issued_at,
            expires_at: self.expires_at,
            revoked_at: self.revoked_at,
        })
    }
}

/// Row struct for count queries.
#[derive(Debug, SurrealValue)]
struct CountRow {
    total: u64,
}

/// SurrealDB implementation of the Handshake repository.
#[derive(Clone)]
pub struct SurrealHandshakeRepository<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealHandshakeRepository<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

impl<C: Connection> HandshakeRepository for SurrealHandshakeRepository<C> {
    async fn create(&self, input: CreateHandshake) -> SolgateResult<Handshake> {
        let id = Uuid::new_v4();
        let id_str = id.to_string();

        let result = self
            .db
            .query(
                "CREATE type::record('handshake', $id) SET \
                 token_hash = $token_hash, \
                 secret_hash = $secret_hash, \
                 solution_name = $solution_name, \
                 permissions = $permissions, \
                 issued_at = $issued_at, \
                 expires_at = $expires_at",
            )
            .bind(("id", id_str.clone()))
            .bind(("token_hash", input.token_hash))
            .bind(("secret_hash", input.secret_hash))
            .bind(("solution_name", input.solution_name.map(String::from)))
            .bind((
                "permissions",
                input.permissions.into_iter().collect::<Vec<String>>(),
            ))
            .bind(("issued_at", input.issued_at))
            .bind(("expires_at", input.expires_at))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::from_statement(e, "handshake"))?;

        let rows: Vec<HandshakeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "handshake".into(),
            id: id_str,
        })?;

        Ok(row.into_handshake(id)?)
    }

    async fn get_by_id(&self, id: Uuid) -> SolgateResult<Handshake> {
        let id_str = id.to_string();

        let mut result = self
            .db
            .query("SELECT * FROM type::record('handshake', $id)")
            .bind(("id", id_str.clone()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<HandshakeRow> = result.take(0).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "handshake".into(),
            id: id_str,
        })?;

        Ok(row.into_handshake(id)?)
    }

    async fn get_by_token_hash(&self, token_hash: &str) -> SolgateResult<Handshake> {
        let mut result = self
            .db
            .query(
                "SELECT meta::id(id) AS record_id, * FROM handshake \
                 WHERE token_hash = $token_hash",
            )
            .bind(("token_hash", token_hash.to_string()))
            .await
            .map_err(DbError::from)?;

        let rows: Vec<HandshakeRowWithId> = result.take(0).map_err(DbError::from)?;
        // The digest is not an identifier worth echoing into errors.
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "handshake".into(),
            id: "token".into(),
        })?;

        Ok(row.try_into_handshake()?)
    }

    async fn revoke(&self, id: Uuid, at: DateTime<Utc>) -> SolgateResult<Handshake> {
        let id_str = id.to_string();

        // Statement 0 sets revoked_at only if unset, statement 1 reads
        // back the authoritative record.
        let result = self
            .db
            .query(
                "UPDATE type::record('handshake', $id) SET revoked_at = $at \
                 WHERE revoked_at = NONE; \
                 SELECT * FROM type::record('handshake', $id);",
            )
            .bind(("id", id_str.clone()))
            .bind(("at", at))
            .await
            .map_err(DbError::from)?;

        let mut result = result
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        let rows: Vec<HandshakeRow> = result.take(1).map_err(DbError::from)?;
        let row = rows.into_iter().next().ok_or_else(|| DbError::NotFound {
            entity: "handshake".into(),
            id: id_str,
        })?;

        Ok(row.into_handshake(id)?)
    }

    async fn revoke_for_solution(
        &self,
        name: &SolutionName,
        at: DateTime<Utc>,
    ) -> SolgateResult<u64> {
        // Count live handshakes first, then revoke them.
        let mut count_result = self
            .db
            .query(
                "SELECT count() AS total FROM handshake \
                 WHERE solution_name = $solution AND revoked_at = NONE \
                 GROUP ALL",
            )
            .bind(("solution", name.to_string()))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        self.db
            .query(
                "UPDATE handshake SET revoked_at = $at \
                 WHERE solution_name = $solution AND revoked_at = NONE",
            )
            .bind(("solution", name.to_string()))
            .bind(("at", at))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(total)
    }

    async fn purge(&self, before: DateTime<Utc>) -> SolgateResult<u64> {
        // NONE sorts before every datetime, hence the explicit check.
        const PREDICATE: &str = "expires_at < $before \
             OR (revoked_at != NONE AND revoked_at < $before)";

        let mut count_result = self
            .db
            .query(format!(
                "SELECT count() AS total FROM handshake WHERE {PREDICATE} GROUP ALL"
            ))
            .bind(("before", before))
            .await
            .map_err(DbError::from)?;
        let count_rows: Vec<CountRow> = count_result.take(0).map_err(DbError::from)?;
        let total = count_rows.first().map(|r| r.total).unwrap_or(0);

        self.db
            .query(format!("DELETE handshake WHERE {PREDICATE}"))
            .bind(("before", before))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        Ok(total)
    }
}
