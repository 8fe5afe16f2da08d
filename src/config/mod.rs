//! Configuration management for the cluster manager.
//!
//! Settings are resolved once at process entry and handed to the
//! orchestrator. Sources, lowest priority first:
//! 1. Default values (hardcoded)
//! 2. Optional TOML file (`--config` or `CLUSTER_MANAGER_CONFIG`)
//! 3. Environment variables, e.g. `CLUSTER_MANAGER__TIMING__READINESS__TIMEOUT_MS=20000`
//!

mod binaries;
mod markers;
mod network;
mod paths;
mod timing;
mod tls;
pub use binaries::*;
pub use markers::*;
pub use network::*;
pub use paths::*;
pub use timing::*;
pub use tls::*;


//---
use std::env;
use std::path::Path;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use crate::Result;

/// Environment variable naming an optional settings file
pub const CONFIG_PATH_ENV: &str = "CLUSTER_MANAGER_CONFIG";
const ENV_PREFIX: &str = "CLUSTER_MANAGER";

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Settings {
    /// Where workspaces and TLS material live
    #[serde(default)]
    pub paths: PathsConfig,
    /// Server/CLI executable candidates
    #[serde(default)]
    pub binaries: BinariesConfig,
    /// Port allocation parameters
    #[serde(default)]
    pub ports: PortsConfig,
    /// Every bounded wait of the lifecycle
    #[serde(default)]
    pub timing: TimingConfig,
    /// TLS material cache
    #[serde(default)]
    pub tls: TlsConfig,
    /// Log markers used for readiness and conflict detection
    #[serde(default)]
    pub markers: MarkersConfig,
}

impl Settings {
    /// Load configuration from multiple sources with priority:
    /// 1. Hardcoded defaults
    /// 2. Settings file (`config_path`, else `CLUSTER_MANAGER_CONFIG`)
    /// 3. Environment variables
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        } else if let Ok(path) = env::var(CONFIG_PATH_ENV) {
            builder = builder.add_source(File::with_name(&path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("binaries.server_candidates")
                .with_list_parse_key("binaries.cli_candidates")
                .with_list_parse_key("markers.address_in_use"),
        );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.binaries.validate()?;
        self.ports.validate()?;
        self.timing.validate()?;
        self.markers.validate()?;
        Ok(())
    }
}
