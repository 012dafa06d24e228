//! Tenant store provisioning: one SurrealDB database per tenant store,
//! in the same namespace as the control plane.

use solgate_core::error::SolgateResult;
use solgate_core::registry::StoreId;
use solgate_core::repository::StoreProvisioner;
use surrealdb::{Connection, Surreal};
use tracing::info;

use crate::error::DbError;

/// SurrealDB implementation of [`StoreProvisioner`].
///
/// Database names come from [`StoreId::physical`], which only ever
/// yields `[a-z0-9_]` identifiers, so they are safe to splice into DDL.
#[derive(Clone)]
pub struct SurrealStoreProvisioner<C: Connection> {
    db: Surreal<C>,
}

impl<C: Connection> SurrealStoreProvisioner<C> {
    pub fn new(db: Surreal<C>) -> Self {
        Self { db }
    }
}

fn tenant_database(store: &StoreId) -> Result<String, DbError> {
    if store.is_system() {
        return Err(DbError::Refused(
            "the system store is not managed by the provisioner".into(),
        ));
    }
    Ok(store.physical())
}

impl<C: Connection> StoreProvisioner for SurrealStoreProvisioner<C> {
    async fn create_store(&self, store: &StoreId) -> SolgateResult<()> {
        let database = tenant_database(store)?;

        self.db
            .query(format!("DEFINE DATABASE IF NOT EXISTS {database}"))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        info!(store = %database, "Tenant store created");
        Ok(())
    }

    async fn drop_store(&self, store: &StoreId) -> SolgateResult<()> {
        let database = tenant_database(store)?;

        self.db
            .query(format!("REMOVE DATABASE IF EXISTS {database}"))
            .await
            .map_err(DbError::from)?
            .check()
            .map_err(|e| DbError::Query(e.to_string()))?;

        info!(store = %database, "Tenant store dropped");
        Ok(())
    }

    async fn store_exists(&self, store: &StoreId) -> SolgateResult<bool> {
        let database = store.physical();

        let mut result = self
            .db
            .query("RETURN $database IN object::keys((INFO FOR NS).databases)")
            .bind(("database", database))
            .await
            .map_err(DbError::from)?;

        let exists: Option<bool> = result.take(0).map_err(DbError::from)?;
        Ok(exists.unwrap_or(false))
    }
}
