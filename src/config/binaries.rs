use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Executables probed with `which`, first hit wins
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BinariesConfig {
    #[serde(default = "default_server_candidates")]
    pub server_candidates: Vec<String>,

    #[serde(default = "default_cli_candidates")]
    pub cli_candidates: Vec<String>,
}

impl Default for BinariesConfig {
    fn default() -> Self {
        Self {
            server_candidates: default_server_candidates(),
            cli_candidates: default_cli_candidates(),
        }
    }
}

impl BinariesConfig {
    pub fn validate(&self) -> Result<()> {
        if self.server_candidates.is_empty() {
            return Err(ConfigError::Message("binaries.server_candidates cannot be empty".into()).into());
        }
        if self.cli_candidates.is_empty() {
            return Err(ConfigError::Message("binaries.cli_candidates cannot be empty".into()).into());
        }
        Ok(())
    }
}

fn default_server_candidates() -> Vec<String> {
    vec!["valkey-server".into(), "redis-server".into()]
}
fn default_cli_candidates() -> Vec<String> {
    vec!["valkey-cli".into(), "redis-cli".into()]
}
