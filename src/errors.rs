//! Cluster Lifecycle Error Hierarchy
//!
//! Every failure that ends a start or stop operation is one of the closed
//! [`LifecycleError`] kinds. Infrastructure failures (I/O, spawning, missing
//! executables) live in [`SystemError`] and configuration problems come from
//! the `config` crate.
//!
//! Variants carry the external output they were derived from so that the
//! caller can print it next to the log file path that explains it.

use std::path::PathBuf;
use std::time::Duration;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Terminal failures of a cluster start/stop operation
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Infrastructure-level failures (fs, spawning, encoding)
    #[error(transparent)]
    System(#[from] SystemError),

    /// Settings could not be loaded
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Request rejected before anything was launched
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Orchestrator asked to move between incompatible states
    #[error("Invalid state transition from {from} to {to}")]
    InvalidState { from: &'static str, to: &'static str },
}

/// Captured result of one external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Prefer the error stream, fall back to stdout.
    pub fn diagnostic(&self) -> &str {
        if self.stderr.trim().is_empty() {
            self.stdout.trim()
        } else {
            self.stderr.trim()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
    /// Server spawn returned a non-zero exit code
    #[error("Failed to launch server on {address} (exit code {exit_code:?}): {stderr}\nExecuted: {command}")]
    LaunchFailed {
        address: String,
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    /// `--version` output did not contain `server v=X.Y.Z`
    #[error("Unable to determine server version from output: {output}")]
    VersionDetectionFailed { output: String },

    /// Requested port is already bound by another process
    #[error("Couldn't start server on {address}, address already in use. See {} for more information", log_file.display())]
    PortConflict { address: String, log_file: PathBuf },

    /// Node never answered the liveness probe
    #[error("Waiting for server {address} to start exceeded timeout of {timeout:?}. See {} for more information", log_file.display())]
    ReadinessTimeout {
        address: String,
        timeout: Duration,
        log_file: PathBuf,
    },

    /// Cluster-create or replica assignment was rejected or timed out
    #[error("Failed to form topology: {reason}\n{output}")]
    TopologyFormationFailed { reason: String, output: String },

    /// Topology accepted but never observed consistently
    #[error("Timeout exceeded waiting for {address} to converge: {detail}\nCurrent output:\n{output}")]
    ConvergenceTimeout {
        address: String,
        detail: String,
        output: String,
    },

    /// Graceful stop rejected or node still reachable
    #[error("Failed to shutdown host {address}: {reason}")]
    ShutdownFailed { address: String, reason: String },

    /// No bindable port inside the range before the deadline
    #[error("Timeout Expired: No free port found in {min_port}-{max_port} after {timeout:?}")]
    NoFreePort {
        min_port: u16,
        max_port: u16,
        timeout: Duration,
    },

    /// TLS material could not be produced or written
    #[error("Failed to generate TLS certificates: {0}")]
    CertificateGenerationFailed(String),
}

#[derive(Debug, thiserror::Error)]
pub enum SystemError {
    /// Disk I/O failures
    #[error(transparent)]
    IoError(#[from] std::io::Error),

    /// I/O failure on a known path
    #[error("Error occurred at path {}: {source}", path.display())]
    PathError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The command could not be started at all
    #[error("Failed to spawn {command}: {source}")]
    SpawnFailed {
        command: String,
        source: std::io::Error,
    },

    /// The command did not finish within its own timeout
    #[error("Command timed out after {timeout:?}: {command}")]
    CommandTimeout { command: String, timeout: Duration },

    /// None of the candidate executables is installed
    #[error("Neither {} found in the system", candidates.join(" nor "))]
    BinaryNotFound { candidates: Vec<String> },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid log pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl SystemError {
    pub fn path(
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        SystemError::PathError {
            path: path.into(),
            source,
        }
    }
}

impl Error {
    /// Transport-level timeout of an external command.
    ///
    /// Shutdown requests are retried on this condition only.
    pub fn is_command_timeout(&self) -> bool {
        matches!(self, Error::System(SystemError::CommandTimeout { .. }))
    }

    /// Lifecycle failure kind, if any
    pub fn lifecycle(&self) -> Option<&LifecycleError> {
        match self {
            Error::Lifecycle(e) => Some(e),
            _ => None,
        }
    }
}

// ============== Conversion Implementations ============== //
impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::System(SystemError::IoError(e))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::System(SystemError::Serialization(e))
    }
}

impl From<regex::Error> for Error {
    fn from(e: regex::Error) -> Self {
        Error::System(SystemError::Pattern(e))
    }
}

impl From<rcgen::Error> for Error {
    fn from(e: rcgen::Error) -> Self {
        Error::Lifecycle(LifecycleError::CertificateGenerationFailed(e.to_string()))
    }
}
