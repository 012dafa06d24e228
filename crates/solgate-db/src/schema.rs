//! Schema definitions and migration runner for SurrealDB.
//!
//! All tables live in the control-plane (system) database and use
//! SCHEMAFULL mode. UUIDs are stored as strings.

use surrealdb::{Connection, Surreal};
use surrealdb_types::SurrealValue;
use tracing::info;

use crate::error::DbError;

// -----------------------------------------------------------------------
// Migration tracking
// -----------------------------------------------------------------------

const MIGRATION_TABLE_DDL: &str = "\
DEFINE TABLE IF NOT EXISTS _migration SCHEMAFULL;
DEFINE FIELD IF NOT EXISTS version ON TABLE _migration TYPE int;
DEFINE FIELD IF NOT EXISTS name ON TABLE _migration TYPE string;
DEFINE FIELD IF NOT EXISTS applied_at ON TABLE _migration TYPE datetime \
    DEFAULT time::now();
DEFINE INDEX IF NOT EXISTS idx_migration_version ON TABLE _migration \
    COLUMNS version UNIQUE;
";

#[derive(Debug, SurrealValue)]
struct MigrationRecord {
    version: u32,
    #[allow(dead_code)]
    name: String,
}

struct Migration {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

static MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "control_plane",
    sql: SCHEMA_V1,
}];

// -----------------------------------------------------------------------
// Schema v1
// -----------------------------------------------------------------------

const SCHEMA_V1: &str = "\
-- =======================================================================
-- Solutions (record id = name)
-- =======================================================================
DEFINE TABLE solution SCHEMAFULL;
DEFINE FIELD name ON TABLE solution TYPE string;
DEFINE FIELD active ON TABLE solution TYPE bool DEFAULT false;
DEFINE FIELD created_at ON TABLE solution TYPE datetime;
DEFINE FIELD updated_at ON TABLE solution TYPE datetime;
DEFINE FIELD deprovisioned_at ON TABLE solution TYPE option<datetime>;
DEFINE INDEX idx_solution_name ON TABLE solution COLUMNS name UNIQUE;

-- =======================================================================
-- Handshakes (digests only, never raw token or secret)
-- =======================================================================
DEFINE TABLE handshake SCHEMAFULL;
DEFINE FIELD token_hash ON TABLE handshake TYPE string;
DEFINE FIELD secret_hash ON TABLE handshake TYPE string;
DEFINE FIELD solution_name ON TABLE handshake TYPE option<string>;
DEFINE FIELD permissions ON TABLE handshake TYPE array<string>;
DEFINE FIELD issued_at ON TABLE handshake TYPE datetime;
DEFINE FIELD expires_at ON TABLE handshake TYPE datetime;
DEFINE FIELD revoked_at ON TABLE handshake TYPE option<datetime>;
DEFINE INDEX idx_handshake_token ON TABLE handshake \
    COLUMNS token_hash UNIQUE;
DEFINE INDEX idx_handshake_solution ON TABLE handshake \
    COLUMNS solution_name;

-- =======================================================================
-- Custom fields (schema fallback side-store, record id = key digest)
-- =======================================================================
DEFINE TABLE custom_field SCHEMAFULL;
DEFINE FIELD solution_name ON TABLE custom_field TYPE string;
DEFINE FIELD model_name ON TABLE custom_field TYPE string;
DEFINE FIELD record_id ON TABLE custom_field TYPE string;
DEFINE FIELD field_name ON TABLE custom_field TYPE string;
DEFINE FIELD field_value ON TABLE custom_field TYPE string;
DEFINE FIELD written_at ON TABLE custom_field TYPE datetime;
DEFINE INDEX idx_custom_field_key ON TABLE custom_field \
    COLUMNS solution_name, model_name, record_id, field_name UNIQUE;
";

// -----------------------------------------------------------------------
// Public API
// -----------------------------------------------------------------------

/// Run all pending migrations against the given SurrealDB client.
///
/// Creates a `_migration` tracking table on first run, then applies
/// each migration whose version exceeds the current maximum.
pub async fn run_migrations<C: Connection>(db: &Surreal<C>) -> Result<(), DbError> {
    db.query(MIGRATION_TABLE_DDL)
        .await?
        .check()
        .map_err(|e| DbError::Migration(e.to_string()))?;

    let mut result = db
        .query("SELECT * FROM _migration ORDER BY version DESC LIMIT 1")
        .await?;
    let records: Vec<MigrationRecord> = result.take(0)?;
    let current_version = records.first().map(|m| m.version).unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version > current_version {
            info!(
                version = migration.version,
                name = migration.name,
                "Applying migration"
            );
            db.query(migration.sql).await?.check().map_err(|e| {
                DbError::Migration(format!(
                    "Migration v{} '{}' failed: {}",
                    migration.version, migration.name, e,
                ))
            })?;

            db.query(
                "CREATE _migration SET version = $version, \
                 name = $name",
            )
            .bind(("version", migration.version))
            .bind(("name", migration.name))
            .await?
            .check()
            .map_err(|e| {
                DbError::Migration(format!(
                    "Failed to record migration v{}: {}",
                    migration.version, e,
                ))
            })?;

            info!(
                version = migration.version,
                "Migration applied successfully"
            );
        }
    }

    Ok(())
}

/// Returns the raw schema DDL for version 1.
pub fn schema_v1() -> &'static str {
    SCHEMA_V1
}
