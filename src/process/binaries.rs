use std::time::Duration;

use tracing::debug;
use tracing::error;

use crate::BinariesConfig;
use crate::CommandRunner;
use crate::Result;
use crate::SystemError;

/// Server and CLI executables picked for this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binaries {
    pub server: String,
    pub cli: String,
}

impl Binaries {
    pub fn new(
        server: impl Into<String>,
        cli: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            cli: cli.into(),
        }
    }

    /// First installed candidate of each list, in list order.
    pub async fn discover(
        runner: &dyn CommandRunner,
        config: &BinariesConfig,
        timeout: Duration,
    ) -> Result<Self> {
        let server = first_available(runner, &config.server_candidates, timeout).await?;
        let cli = first_available(runner, &config.cli_candidates, timeout).await?;
        debug!("Using server binary {} and cli binary {}", server, cli);
        Ok(Self { server, cli })
    }
}

async fn first_available(
    runner: &dyn CommandRunner,
    candidates: &[String],
    timeout: Duration,
) -> Result<String> {
    for candidate in candidates {
        match runner.run("which", std::slice::from_ref(candidate), timeout).await {
            Ok(output) if output.success() => return Ok(candidate.clone()),
            Ok(_) => debug!("{} not found", candidate),
            Err(e) => error!("Error checking {}: {}", candidate, e),
        }
    }
    Err(SystemError::BinaryNotFound {
        candidates: candidates.to_vec(),
    }
    .into())
}
