//! SurrealDB connection management.
//!
//! The engine is picked from the URL scheme: `ws://` / `wss://` for a
//! server, `mem://` for an embedded in-memory store (local runs and
//! demos). Tenant stores are sibling databases of the control-plane
//! database inside one namespace, so a single connection serves the
//! provisioner and every repository.

use serde::Deserialize;
use solgate_core::registry::SYSTEM_STORE_ID;
use surrealdb::Surreal;
use surrealdb::engine::any::{self, Any};
use surrealdb::opt::auth::Root;
use tracing::{info, warn};

use crate::error::DbError;

/// Configuration for connecting to SurrealDB.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Endpoint, e.g. `ws://127.0.0.1:8000` or `mem://`.
    pub url: String,
    pub namespace: String,
    /// Control-plane database. This is the system store.
    pub database: String,
    /// Root credentials; ignored for embedded engines.
    pub username: String,
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8000".into(),
            namespace: "solgate".into(),
            database: SYSTEM_STORE_ID.into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

impl DbConfig {
    /// Whether the URL names an in-process engine, which has no users
    /// to sign in as.
    pub fn is_embedded(&self) -> bool {
        self.url.starts_with("mem:")
    }
}

/// A connection bound to the control-plane database.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Any>,
}

impl DbManager {
    /// Connect, sign in as root when talking to a server, and select the
    /// configured namespace and control-plane database.
    pub async fn connect(config: &DbConfig) -> Result<Self, DbError> {
        if config.database != SYSTEM_STORE_ID {
            warn!(
                database = %config.database,
                system_store = SYSTEM_STORE_ID,
                "Control-plane database differs from the system store id"
            );
        }
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Connecting to SurrealDB"
        );

        let db = any::connect(config.url.as_str()).await?;

        if !config.is_embedded() {
            db.signin(Root {
                username: config.username.clone(),
                password: config.password.clone(),
            })
            .await?;
        }

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        info!("Connected to SurrealDB");
        Ok(Self { db })
    }

    pub fn client(&self) -> &Surreal<Any> {
        &self.db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_the_system_store() {
        let config = DbConfig::default();
        assert_eq!(config.database, SYSTEM_STORE_ID);
        assert!(!config.is_embedded());
    }

    #[test]
    fn mem_urls_are_embedded() {
        let config = DbConfig {
            url: "mem://".into(),
            ..DbConfig::default()
        };
        assert!(config.is_embedded());
    }
}
