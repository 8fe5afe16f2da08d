use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Literal log markers checked right after a launch
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MarkersConfig {
    /// Phrasings of "address already in use". Different C libraries word the
    /// bind error differently, new server builds may add more.
    #[serde(default = "default_address_in_use")]
    pub address_in_use: Vec<String>,

    /// Printed once the server accepts connections
    #[serde(default = "default_ready")]
    pub ready: String,
}

impl Default for MarkersConfig {
    fn default() -> Self {
        Self {
            address_in_use: default_address_in_use(),
            ready: default_ready(),
        }
    }
}

impl MarkersConfig {
    pub fn validate(&self) -> Result<()> {
        if self.address_in_use.iter().all(|m| m.is_empty()) {
            return Err(ConfigError::Message("markers.address_in_use cannot be empty".into()).into());
        }
        if self.ready.is_empty() {
            return Err(ConfigError::Message("markers.ready cannot be empty".into()).into());
        }
        Ok(())
    }
}

fn default_address_in_use() -> Vec<String> {
    vec![
        "Address already in use".into(),
        "Address in use".into(),
        "address in use".into(),
    ]
}
fn default_ready() -> String {
    "Ready".into()
}
