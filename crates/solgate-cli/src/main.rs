//! `solgate`: operator CLI for the tenant credential and routing core.

mod settings;
mod telemetry;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use solgate_auth::password::hash_root_key;
use solgate_auth::{CreateHandshakeInput, HandshakeService};
use solgate_core::error::SolgateError;
use solgate_core::registry::{derive_store_ids, parse_name};
use solgate_core::repository::StoreProvisioner;
use solgate_db::repository::{
    SurrealHandshakeRepository, SurrealSolutionRepository, SurrealStoreProvisioner,
};
use solgate_db::{DbError, DbManager};
use solgate_tenancy::{DeprovisionError, ProvisionError, SolutionLifecycleManager};
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use tracing::{error, info};
use uuid::Uuid;

use crate::settings::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "solgate", version, about = "Tenant credential and routing administration")]
struct Cli {
    /// Configuration file (defaults to an optional `solgate.toml`).
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply pending control-plane schema migrations.
    Migrate,
    /// Register a solution and create its tenant stores.
    Provision { name: String },
    /// Remove a solution's tenant stores and revoke its handshakes.
    Deprovision {
        name: String,
        /// Required; nothing is removed without it.
        #[arg(long)]
        confirm: bool,
    },
    /// Mint a handshake with the operator root key.
    Mint {
        /// Tenant to bind to; omit for a system-level handshake.
        #[arg(long)]
        solution: Option<String>,
        #[arg(long = "permission", value_name = "PERMISSION")]
        permissions: Vec<String>,
        /// Lifetime in seconds.
        #[arg(long)]
        ttl: Option<u64>,
        #[arg(long, env = "SOLGATE_ROOT_KEY", hide_env_values = true)]
        root_key: String,
    },
    /// Revoke a handshake by id.
    Revoke { id: Uuid },
    /// Delete handshakes past the retention window.
    Purge,
    /// Roll back provisioning attempts that never completed.
    Recover,
    /// Show a solution's derived stores and whether they exist.
    Stores { name: String },
    /// Print the Argon2id hash to configure as `handshake.root_key_hash`.
    HashRootKey {
        #[arg(long, env = "SOLGATE_ROOT_KEY", hide_env_values = true)]
        root_key: String,
        #[arg(long, env = "SOLGATE__HANDSHAKE__PEPPER", hide_env_values = true)]
        pepper: Option<String>,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Solgate(#[from] SolgateError),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error(transparent)]
    Deprovision(#[from] DeprovisionError),

    #[error("failed to render output: {0}")]
    Output(#[from] serde_json::Error),
}

type CliResult<T> = Result<T, CliError>;

#[derive(Serialize)]
struct StoreStatus {
    store: String,
    exists: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    telemetry::init();

    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "Command failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    // Hashing needs neither configuration nor a database.
    if let Command::HashRootKey { root_key, pepper } = &cli.command {
        let hash = hash_root_key(root_key, pepper.as_deref()).map_err(SolgateError::from)?;
        println!("{hash}");
        return Ok(());
    }

    let config = AppConfig::load(cli.config.as_deref())?;
    let manager = DbManager::connect(&config.db).await?;
    let db = manager.client().clone();

    match cli.command {
        Command::Migrate => {
            solgate_db::run_migrations(&db).await?;
            info!("Migrations complete");
        }
        Command::Provision { name } => {
            let solution = lifecycle(&db, &config).provision(&name).await?;
            print_json(&serde_json::json!({
                "name": solution.name,
                "active": solution.active,
                "stores": solution.store_ids(),
            }))?;
        }
        Command::Deprovision { name, confirm } => {
            lifecycle(&db, &config).deprovision(&name, confirm).await?;
            print_json(&serde_json::json!({ "name": name, "deprovisioned": true }))?;
        }
        Command::Mint {
            solution,
            permissions,
            ttl,
            root_key,
        } => {
            let service = handshakes(&db, &config);
            let authority = service.authorize_root(&root_key)?;
            let issued = service
                .create(
                    &authority,
                    CreateHandshakeInput {
                        solution,
                        permissions: permissions.into_iter().collect(),
                        ttl_secs: ttl,
                    },
                )
                .await?;
            print_json(&issued)?;
        }
        Command::Revoke { id } => {
            handshakes(&db, &config).revoke(id).await?;
            print_json(&serde_json::json!({ "handshake_id": id, "revoked": true }))?;
        }
        Command::Purge => {
            let purged = handshakes(&db, &config).purge_expired().await?;
            print_json(&serde_json::json!({ "purged": purged }))?;
        }
        Command::Recover => {
            let report = lifecycle(&db, &config).recover_stale().await?;
            print_json(&report)?;
        }
        Command::Stores { name } => {
            let ids = derive_store_ids(&parse_name(&name)?);
            let provisioner = SurrealStoreProvisioner::new(db.clone());
            let mut statuses = Vec::new();
            for store in [&ids.erp, &ids.app, &ids.system] {
                statuses.push(StoreStatus {
                    store: store.physical(),
                    exists: provisioner.store_exists(store).await?,
                });
            }
            print_json(&statuses)?;
        }
        Command::HashRootKey { .. } => {}
    }
    Ok(())
}

fn handshakes(
    db: &Surreal<Any>,
    config: &AppConfig,
) -> HandshakeService<SurrealHandshakeRepository<Any>, SurrealSolutionRepository<Any>> {
    HandshakeService::new(
        SurrealHandshakeRepository::new(db.clone()),
        SurrealSolutionRepository::new(db.clone()),
        config.handshake.clone(),
    )
}

fn lifecycle(
    db: &Surreal<Any>,
    config: &AppConfig,
) -> SolutionLifecycleManager<
    SurrealSolutionRepository<Any>,
    SurrealStoreProvisioner<Any>,
    SurrealHandshakeRepository<Any>,
> {
    SolutionLifecycleManager::new(
        SurrealSolutionRepository::new(db.clone()),
        SurrealStoreProvisioner::new(db.clone()),
        SurrealHandshakeRepository::new(db.clone()),
        config.tenancy.clone(),
    )
}

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
