//! Layered application configuration.
//!
//! Sources, later ones winning: built-in defaults, `solgate.toml` (or the
//! file given with `--config`), then `SOLGATE__`-prefixed environment
//! variables such as `SOLGATE__DB__URL` or
//! `SOLGATE__HANDSHAKE__ROOT_KEY_HASH`.

use std::path::Path;

use config::builder::{ConfigBuilder, DefaultState};
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use solgate_auth::HandshakeConfig;
use solgate_db::DbConfig;
use solgate_tenancy::TenancyConfig;

const DEFAULT_CONFIG_FILE: &str = "solgate";
const ENV_PREFIX: &str = "SOLGATE";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub db: DbConfig,
    pub handshake: HandshakeConfig,
    pub tenancy: TenancyConfig,
}

impl AppConfig {
    /// Load configuration. An explicit `path` must exist; the default
    /// file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };
        Self::build(Config::builder().add_source(file))
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }
}
