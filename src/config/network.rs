use std::ops::RangeInclusive;
use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::constants::DEFAULT_MAX_PORT;
use crate::constants::DEFAULT_MIN_PORT;
use crate::Result;

/// Parameters of the random free-port search
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PortsConfig {
    /// Lowest candidate port (inclusive)
    #[serde(default = "default_min_port")]
    pub min_port: u16,

    /// Highest candidate port (inclusive)
    #[serde(default = "default_max_port")]
    pub max_port: u16,

    /// Give up the search after this long (milliseconds)
    #[serde(default = "default_search_timeout_ms")]
    pub search_timeout_ms: u64,

    /// Pause after a failed bind (milliseconds), jitter is added on top
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// Upper bound of the random jitter (microseconds)
    #[serde(default = "default_retry_jitter_us")]
    pub retry_jitter_us: u64,
}

impl Default for PortsConfig {
    fn default() -> Self {
        Self {
            min_port: default_min_port(),
            max_port: default_max_port(),
            search_timeout_ms: default_search_timeout_ms(),
            retry_delay_ms: default_retry_delay_ms(),
            retry_jitter_us: default_retry_jitter_us(),
        }
    }
}

impl PortsConfig {
    pub fn range(&self) -> RangeInclusive<u16> {
        self.min_port..=self.max_port
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_port == 0 || self.min_port > self.max_port {
            return Err(ConfigError::Message(format!(
                "invalid port range {}-{}",
                self.min_port, self.max_port
            ))
            .into());
        }
        Ok(())
    }
}

fn default_min_port() -> u16 {
    DEFAULT_MIN_PORT
}
fn default_max_port() -> u16 {
    DEFAULT_MAX_PORT
}
fn default_search_timeout_ms() -> u64 {
    60_000
}
fn default_retry_delay_ms() -> u64 {
    10
}
fn default_retry_jitter_us() -> u64 {
    900
}
