use std::cell::Cell;

use tracing::debug;
use tracing::error;
use tracing::warn;

use crate::constants::INLINE_PASSWORD_WARNING;
use crate::constants::PING_RESPONSE;
use crate::utils::wait::wait_for_condition;
use crate::CliInvoker;
use crate::Credentials;
use crate::LifecycleError;
use crate::LogWatcher;
use crate::MarkersConfig;
use crate::Node;
use crate::Result;
use crate::TimingConfig;
use crate::WaitPolicy;

/// Interpretation of one liveness probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Exact `PONG`
    Alive,
    /// Non-zero exit, typically connection refused
    Refused { exit_code: Option<i32>, stderr: String },
    /// The probe outlived its own timeout
    TimedOut,
    /// Exit 0 with some other reply
    Unexpected(String),
    /// The CLI could not be run at all
    Failed(String),
}

/// What the node's log says about its port right after launch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortStatus {
    InUse,
    Free,
    /// Neither marker showed up in time
    Undetermined,
}

pub struct ReadinessProber {
    cli: CliInvoker,
    watcher: LogWatcher,
    timing: TimingConfig,
    markers: MarkersConfig,
}

impl ReadinessProber {
    pub fn new(
        cli: CliInvoker,
        watcher: LogWatcher,
        timing: TimingConfig,
        markers: MarkersConfig,
    ) -> Self {
        Self {
            cli,
            watcher,
            timing,
            markers,
        }
    }

    pub fn cli(&self) -> &CliInvoker {
        &self.cli
    }

    pub async fn probe(
        &self,
        node: &Node,
        credentials: Option<&Credentials>,
    ) -> ProbeOutcome {
        match self
            .cli
            .run_on(node, credentials, &["PING"], self.timing.probe_timeout())
            .await
        {
            Ok(output) if output.stdout.trim() == PING_RESPONSE => ProbeOutcome::Alive,
            Ok(output) if !output.success() => ProbeOutcome::Refused {
                exit_code: output.exit_code,
                stderr: output.stderr,
            },
            Ok(output) => ProbeOutcome::Unexpected(output.stdout),
            Err(e) if e.is_command_timeout() => ProbeOutcome::TimedOut,
            Err(e) => ProbeOutcome::Failed(e.to_string()),
        }
    }

    /// `true` only on an exact `PONG` within the probe timeout.
    pub async fn probe_liveness(
        &self,
        node: &Node,
        credentials: Option<&Credentials>,
    ) -> bool {
        match self.probe(node, credentials).await {
            ProbeOutcome::Alive => true,
            ProbeOutcome::Refused { exit_code, stderr } => {
                debug!(
                    "Got error while waiting for server {}. Return code: {:?}\n Error: {}",
                    node,
                    exit_code,
                    stderr.trim()
                );
                false
            }
            other => {
                debug!("Server {} not ready: {:?}", node, other);
                false
            }
        }
    }

    /// Probe until the node answers or the readiness policy runs out.
    pub async fn wait_until_ready(
        &self,
        node: &Node,
        credentials: Option<&Credentials>,
    ) -> bool {
        debug!("Waiting for server: {}", node);
        let policy = self.timing.readiness;
        let ready = wait_for_condition(
            move || async move { self.probe_liveness(node, credentials).await.then_some(()) },
            policy.interval(),
            policy.timeout(),
        )
        .await
        .is_some();
        if ready {
            debug!("Server {} is up!", node);
        }
        ready
    }

    /// Whichever shows up first in the node log: an address-in-use
    /// phrasing or the ready marker.
    pub async fn detect_port_conflict(
        &self,
        node: &Node,
    ) -> PortStatus {
        debug!("checking is address already bind for: {}", node);
        let mut literals = self.markers.address_in_use.clone();
        literals.push(self.markers.ready.clone());
        let in_use = self.markers.address_in_use.len();

        match self
            .watcher
            .wait_for_any(&node.log_file(), &literals, self.timing.conflict_detection_timeout())
            .await
        {
            Some(i) if i < in_use => {
                debug!("Address is already bind for server {}", node);
                PortStatus::InUse
            }
            Some(_) => {
                debug!("Address is free for server {}!", node);
                PortStatus::Free
            }
            None => {
                warn!(
                    "Timeout exceeded trying to check if address already in use for server {}!",
                    node
                );
                PortStatus::Undetermined
            }
        }
    }

    /// Ask the node to stop without persisting.
    ///
    /// A command timeout is returned as is so the caller can retry it; any
    /// other error output is a [`LifecycleError::ShutdownFailed`].
    pub async fn request_shutdown(
        &self,
        node: &Node,
        credentials: Option<&Credentials>,
    ) -> Result<()> {
        debug!("Stopping server {}", node);
        let output = self
            .cli
            .run_on(
                node,
                credentials,
                &["shutdown", "nosave"],
                self.timing.shutdown.command_timeout(),
            )
            .await?;

        let stderr: Vec<&str> = output
            .stderr
            .lines()
            .filter(|line| !line.trim().is_empty() && !line.contains(INLINE_PASSWORD_WARNING))
            .collect();
        if !stderr.is_empty() || !output.success() {
            let reason = if stderr.is_empty() {
                format!("exit code {:?}", output.exit_code)
            } else {
                stderr.join("\n")
            };
            error!("Failed to shutdown host {}:\n {}", node, reason);
            return Err(LifecycleError::ShutdownFailed {
                address: node.address(),
                reason,
            }
            .into());
        }
        Ok(())
    }

    /// Confirm the node is gone: enough consecutive refused probes.
    ///
    /// An alive reply resets the count, timed out probes neither count
    /// nor reset.
    pub async fn wait_for_shutdown(
        &self,
        node: &Node,
        credentials: Option<&Credentials>,
    ) -> bool {
        debug!("Waiting for server {} to shutdown", node);
        let policy: WaitPolicy = self.timing.shutdown.confirmation();
        let required = self.timing.shutdown.confirmation_failures.max(1);
        let failures = Cell::new(0usize);
        let failures = &failures;

        let confirmed = wait_for_condition(
            move || async move {
                match self.probe(node, credentials).await {
                    ProbeOutcome::Refused { stderr, .. } => {
                        failures.set(failures.get() + 1);
                        if failures.get() >= required {
                            debug!("Success: server is down: {}", stderr.trim());
                            return Some(());
                        }
                    }
                    ProbeOutcome::Alive => {
                        debug!("Server {} is still up", node);
                        failures.set(0);
                    }
                    ProbeOutcome::TimedOut => {
                        error!("Sending ping to server during shutdown timed out");
                    }
                    other => debug!("Unexpected probe result during shutdown: {:?}", other),
                }
                None
            },
            policy.interval(),
            policy.timeout(),
        )
        .await
        .is_some();

        if !confirmed {
            warn!("Server {} still reachable after {:?}", node, policy.timeout());
        }
        confirmed
    }
}
