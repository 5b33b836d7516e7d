//! Service configuration.
//!
//! Layered from built-in defaults, an optional config file (any format the
//! `config` crate understands, e.g. `utr.toml`), then environment variables
//! such as `UTR__DATABASE_URL` or `UTR__GLEDGER__BASE_URL`.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use crate::gledger::GLedgerConfig;

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "utr";
/// Prefix for configuration environment variables.
pub const CONFIG_ENV_PREFIX: &str = "UTR";
/// Environment variable holding the log filter.
pub const LOG_ENV_VAR: &str = "UTR_LOG";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// sqlx SQLite URL
    pub database_url: String,
    pub server: ServerSettings,
    pub gledger: GLedgerConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: "sqlite:utr.db?mode=rwc".to_string(),
            server: ServerSettings::default(),
            gledger: GLedgerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_addr: String,
    /// Path prefix every UTR route is mounted under
    pub api_prefix: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            api_prefix: "/api/sugarian".to_string(),
        }
    }
}

impl Settings {
    /// Load settings. An explicitly named file must exist; the default one
    /// is optional.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        let file = match path {
            Some(path) => File::with_name(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(CONFIG_ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()
    }
}
