use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

/// Poll until a deadline
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct WaitPolicy {
    /// Overall deadline (unit: milliseconds)
    #[serde(default = "default_readiness_timeout_ms")]
    pub timeout_ms: u64,

    /// Sleep between two polls (unit: milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub interval_ms: u64,
}

impl WaitPolicy {
    pub const fn new(
        timeout_ms: u64,
        interval_ms: u64,
    ) -> Self {
        Self {
            timeout_ms,
            interval_ms,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Poll a fixed number of times
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct RetryBudget {
    /// Number of polls after the first one
    #[serde(default = "default_topology_views_retries")]
    pub max_retries: usize,

    /// Sleep between two polls (unit: milliseconds)
    #[serde(default = "default_topology_views_interval_ms")]
    pub interval_ms: u64,
}

impl RetryBudget {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Graceful stop of one node
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownPolicy {
    /// Extra attempts when the shutdown command itself times out
    #[serde(default = "default_shutdown_retries")]
    pub max_retries: usize,

    /// Timeout of one shutdown command (unit: milliseconds)
    #[serde(default = "default_shutdown_command_timeout_ms")]
    pub command_timeout_ms: u64,

    /// How long to wait for the node to stop answering (unit: milliseconds)
    #[serde(default = "default_confirmation_timeout_ms")]
    pub confirmation_timeout_ms: u64,

    /// Sleep between two confirmation probes (unit: milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub confirmation_interval_ms: u64,

    /// Consecutive failed liveness probes that prove the node is gone
    #[serde(default = "default_confirmation_failures")]
    pub confirmation_failures: usize,
}

impl ShutdownPolicy {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }

    pub fn confirmation(&self) -> WaitPolicy {
        WaitPolicy::new(self.confirmation_timeout_ms, self.confirmation_interval_ms)
    }
}

/// Divide waits by lifecycle step
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TimingConfig {
    /// Log re-read interval for every log watch
    #[serde(default = "default_log_poll_interval_ms")]
    pub log_poll_interval_ms: u64,

    /// The daemonizing spawn must exit within this (unit: milliseconds)
    #[serde(default = "default_spawn_timeout_ms")]
    pub spawn_timeout_ms: u64,

    /// `<server> --version` and `which` lookups (unit: milliseconds)
    #[serde(default = "default_version_timeout_ms")]
    pub version_timeout_ms: u64,

    /// Wait for the `pid=..., just started` log line (unit: milliseconds)
    #[serde(default = "default_pid_discovery_timeout_ms")]
    pub pid_discovery_timeout_ms: u64,

    /// Wait for either an address-in-use line or the ready marker
    #[serde(default = "default_conflict_detection_timeout_ms")]
    pub conflict_detection_timeout_ms: u64,

    /// Liveness polling after launch
    #[serde(default = "default_readiness")]
    pub readiness: WaitPolicy,

    /// Timeout of one liveness probe (unit: milliseconds)
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Wait for cluster-state/sync confirmation lines (unit: milliseconds)
    #[serde(default = "default_log_message_timeout_ms")]
    pub log_message_timeout_ms: u64,

    /// Per node budget for "every node sees every node"
    #[serde(default = "default_topology_views")]
    pub topology_views: RetryBudget,

    /// Timeout of one topology query (unit: milliseconds)
    #[serde(default = "default_cli_query_timeout_ms")]
    pub cli_query_timeout_ms: u64,

    /// Timeout of the cluster-create command (unit: milliseconds)
    #[serde(default = "default_cluster_create_timeout_ms")]
    pub cluster_create_timeout_ms: u64,

    /// Timeout of one replica assignment (unit: milliseconds)
    #[serde(default = "default_replica_of_timeout_ms")]
    pub replica_of_timeout_ms: u64,

    #[serde(default = "default_shutdown")]
    pub shutdown: ShutdownPolicy,

    /// Wait for TLS files another run is still writing (unit: milliseconds)
    #[serde(default = "default_cert_wait_timeout_ms")]
    pub cert_wait_timeout_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            log_poll_interval_ms: default_log_poll_interval_ms(),
            spawn_timeout_ms: default_spawn_timeout_ms(),
            version_timeout_ms: default_version_timeout_ms(),
            pid_discovery_timeout_ms: default_pid_discovery_timeout_ms(),
            conflict_detection_timeout_ms: default_conflict_detection_timeout_ms(),
            readiness: default_readiness(),
            probe_timeout_ms: default_probe_timeout_ms(),
            log_message_timeout_ms: default_log_message_timeout_ms(),
            topology_views: default_topology_views(),
            cli_query_timeout_ms: default_cli_query_timeout_ms(),
            cluster_create_timeout_ms: default_cluster_create_timeout_ms(),
            replica_of_timeout_ms: default_replica_of_timeout_ms(),
            shutdown: default_shutdown(),
            cert_wait_timeout_ms: default_cert_wait_timeout_ms(),
        }
    }
}

impl TimingConfig {
    pub fn log_poll_interval(&self) -> Duration {
        Duration::from_millis(self.log_poll_interval_ms)
    }
    pub fn spawn_timeout(&self) -> Duration {
        Duration::from_millis(self.spawn_timeout_ms)
    }
    pub fn version_timeout(&self) -> Duration {
        Duration::from_millis(self.version_timeout_ms)
    }
    pub fn pid_discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.pid_discovery_timeout_ms)
    }
    pub fn conflict_detection_timeout(&self) -> Duration {
        Duration::from_millis(self.conflict_detection_timeout_ms)
    }
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
    pub fn log_message_timeout(&self) -> Duration {
        Duration::from_millis(self.log_message_timeout_ms)
    }
    pub fn cli_query_timeout(&self) -> Duration {
        Duration::from_millis(self.cli_query_timeout_ms)
    }
    pub fn cluster_create_timeout(&self) -> Duration {
        Duration::from_millis(self.cluster_create_timeout_ms)
    }
    pub fn replica_of_timeout(&self) -> Duration {
        Duration::from_millis(self.replica_of_timeout_ms)
    }
    pub fn cert_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.cert_wait_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.log_poll_interval_ms == 0
            || self.readiness.interval_ms == 0
            || self.shutdown.confirmation_interval_ms == 0
        {
            return Err(ConfigError::Message("polling intervals must be greater than 0".into()).into());
        }
        if self.shutdown.confirmation_failures == 0 {
            return Err(
                ConfigError::Message("timing.shutdown.confirmation_failures must be at least 1".into()).into(),
            );
        }
        Ok(())
    }
}

fn default_log_poll_interval_ms() -> u64 {
    100
}
fn default_spawn_timeout_ms() -> u64 {
    2_000
}
fn default_version_timeout_ms() -> u64 {
    5_000
}
fn default_pid_discovery_timeout_ms() -> u64 {
    2_000
}
fn default_conflict_detection_timeout_ms() -> u64 {
    5_000
}
fn default_readiness() -> WaitPolicy {
    WaitPolicy::new(default_readiness_timeout_ms(), default_poll_interval_ms())
}
fn default_readiness_timeout_ms() -> u64 {
    10_000
}
fn default_poll_interval_ms() -> u64 {
    100
}
fn default_probe_timeout_ms() -> u64 {
    1_000
}
fn default_log_message_timeout_ms() -> u64 {
    10_000
}
fn default_topology_views() -> RetryBudget {
    RetryBudget {
        max_retries: default_topology_views_retries(),
        interval_ms: default_topology_views_interval_ms(),
    }
}
fn default_topology_views_retries() -> usize {
    80
}
fn default_topology_views_interval_ms() -> u64 {
    500
}
fn default_cli_query_timeout_ms() -> u64 {
    5_000
}
fn default_cluster_create_timeout_ms() -> u64 {
    40_000
}
fn default_replica_of_timeout_ms() -> u64 {
    20_000
}
fn default_shutdown() -> ShutdownPolicy {
    ShutdownPolicy {
        max_retries: default_shutdown_retries(),
        command_timeout_ms: default_shutdown_command_timeout_ms(),
        confirmation_timeout_ms: default_confirmation_timeout_ms(),
        confirmation_interval_ms: default_poll_interval_ms(),
        confirmation_failures: default_confirmation_failures(),
    }
}
fn default_shutdown_retries() -> usize {
    3
}
fn default_shutdown_command_timeout_ms() -> u64 {
    5_000
}
fn default_confirmation_timeout_ms() -> u64 {
    20_000
}
fn default_confirmation_failures() -> usize {
    2
}
fn default_cert_wait_timeout_ms() -> u64 {
    15_000
}
