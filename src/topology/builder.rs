use std::cell::RefCell;

use tokio::time::Instant;
use tracing::debug;
use tracing::info;

use super::parse::own_role;
use super::parse::parse_role_reply;
use crate::constants::ALL_SLOTS_COVERED;
use crate::constants::CLUSTER_STATE_OK_MESSAGE;
use crate::constants::OK_RESPONSE;
use crate::constants::REPLICA_SYNC_FINISHED_MESSAGE;
use crate::utils::wait::poll_with_budget;
use crate::CliInvoker;
use crate::Error;
use crate::LifecycleError;
use crate::LogWatcher;
use crate::Node;
use crate::Result;
use crate::TimingConfig;
use crate::TopologyKind;
use crate::TopologyRequest;

/// Wires ready nodes into a cluster or a replication group and waits
/// until the nodes themselves report the result.
pub struct TopologyBuilder {
    cli: CliInvoker,
    watcher: LogWatcher,
    timing: TimingConfig,
}

impl TopologyBuilder {
    pub fn new(
        cli: CliInvoker,
        watcher: LogWatcher,
        timing: TimingConfig,
    ) -> Self {
        Self { cli, watcher, timing }
    }

    pub async fn form(
        &self,
        request: &TopologyRequest,
        nodes: &mut [Node],
    ) -> Result<()> {
        match request.kind() {
            TopologyKind::Cluster => self.form_cluster(nodes, request.replica_count).await,
            TopologyKind::Replication => self.form_replication(nodes).await,
            TopologyKind::Single => Ok(()),
        }
    }

    pub async fn form_cluster(
        &self,
        nodes: &mut [Node],
        replica_count: usize,
    ) -> Result<()> {
        let tic = Instant::now();
        debug!("## Starting cluster creation...");

        let mut command = vec!["--cluster".to_string(), "create".to_string()];
        command.extend(nodes.iter().map(Node::address));
        command.extend([
            "--cluster-replicas".to_string(),
            replica_count.to_string(),
            "--cluster-yes".to_string(),
        ]);

        let output = self
            .cli
            .run(command, self.timing.cluster_create_timeout())
            .await
            .map_err(|e| formation_error("cluster create did not complete", e))?;
        if !output.stderr.trim().is_empty() || !output.stdout.contains(ALL_SLOTS_COVERED) {
            return Err(LifecycleError::TopologyFormationFailed {
                reason: "Failed to create cluster".into(),
                output: output.diagnostic().to_string(),
            }
            .into());
        }

        self.wait_for_message_in_logs(nodes, CLUSTER_STATE_OK_MESSAGE).await?;
        self.wait_for_all_topology_views(nodes).await?;

        debug!("The cluster was successfully created!");
        info!("create_cluster Elapsed time: {:?}", tic.elapsed());
        Ok(())
    }

    /// `nodes[0]` is the primary, every other node replicates it.
    pub async fn form_replication(
        &self,
        nodes: &mut [Node],
    ) -> Result<()> {
        let tic = Instant::now();
        let Some((primary, replicas)) = nodes.split_first() else {
            return Ok(());
        };
        debug!("## Starting replication setup...");

        let port = primary.port.to_string();
        for replica in replicas {
            let output = self
                .cli
                .run_on(
                    replica,
                    None,
                    &["REPLICAOF", primary.host.as_str(), port.as_str()],
                    self.timing.replica_of_timeout(),
                )
                .await
                .map_err(|e| formation_error(&format!("REPLICAOF on {} did not complete", replica), e))?;
            if !output.stderr.trim().is_empty() || output.stdout.trim() != OK_RESPONSE {
                return Err(LifecycleError::TopologyFormationFailed {
                    reason: format!("Failed to set up replication for server {}", replica),
                    output: output.diagnostic().to_string(),
                }
                .into());
            }
        }

        self.wait_for_message_in_logs(replicas, REPLICA_SYNC_FINISHED_MESSAGE)
            .await?;
        debug!(
            "{} nodes successfully became replicas of the primary {}!",
            replicas.len(),
            primary
        );

        self.observe_roles(nodes).await?;
        info!("create_replication Elapsed time: {:?}", tic.elapsed());
        Ok(())
    }

    async fn wait_for_message_in_logs(
        &self,
        nodes: &[Node],
        message: &str,
    ) -> Result<()> {
        for node in nodes {
            let log_file = node.log_file();
            if !self
                .watcher
                .contains(&log_file, message, self.timing.log_message_timeout())
                .await
            {
                return Err(LifecycleError::ConvergenceTimeout {
                    address: node.address(),
                    detail: format!(
                        "server log did not contain the message: {}. See {} for more information",
                        message,
                        log_file.display()
                    ),
                    output: self.watcher.snapshot(&log_file).await.unwrap_or_default(),
                }
                .into());
            }
        }
        Ok(())
    }

    /// Every node must list every node in `cluster slots`; replicas only
    /// show up there once their sync completed. Roles are then read from
    /// `cluster nodes`.
    async fn wait_for_all_topology_views(
        &self,
        nodes: &mut [Node],
    ) -> Result<()> {
        let total = nodes.len();
        let budget = self.timing.topology_views;
        let query_timeout = self.timing.cli_query_timeout();

        for node in nodes.iter_mut() {
            let last_output = RefCell::new(String::new());
            let last_output = &last_output;
            let target: &Node = node;

            let knows_all = poll_with_budget(
                move || async move {
                    let output = match self
                        .cli
                        .run_on(target, None, &["cluster", "slots"], query_timeout)
                        .await
                    {
                        Ok(output) => output.stdout,
                        Err(e) => {
                            debug!("cluster slots on {} failed: {}", target, e);
                            String::new()
                        }
                    };
                    let seen = output.matches(target.host.as_str()).count();
                    *last_output.borrow_mut() = output;
                    (seen == total).then_some(())
                },
                budget.interval(),
                budget.max_retries,
            )
            .await
            .is_some();

            if !knows_all {
                return Err(LifecycleError::ConvergenceTimeout {
                    address: node.address(),
                    detail: "Timeout exceeded trying to wait for server to know all hosts".into(),
                    output: last_output.take(),
                }
                .into());
            }

            let output = self
                .cli
                .run_on(node, None, &["cluster", "nodes"], query_timeout)
                .await?;
            match own_role(&output.stdout) {
                Some(role) => node.observe_role(role),
                None => {
                    return Err(LifecycleError::ConvergenceTimeout {
                        address: node.address(),
                        detail: "cluster nodes reply has no myself entry".into(),
                        output: output.diagnostic().to_string(),
                    }
                    .into())
                }
            }
            debug!("Server {} is ready!", node);
        }
        Ok(())
    }

    /// Re-read every node's role from the node itself.
    async fn observe_roles(
        &self,
        nodes: &mut [Node],
    ) -> Result<()> {
        for node in nodes.iter_mut() {
            let output = self
                .cli
                .run_on(node, None, &["ROLE"], self.timing.cli_query_timeout())
                .await?;
            match parse_role_reply(&output.stdout) {
                Some(role) => node.observe_role(role),
                None => {
                    return Err(LifecycleError::ConvergenceTimeout {
                        address: node.address(),
                        detail: "ROLE reply did not name a role".into(),
                        output: output.diagnostic().to_string(),
                    }
                    .into())
                }
            }
        }
        Ok(())
    }
}

/// Timeouts and spawn failures of a formation command
fn formation_error(
    reason: &str,
    e: Error,
) -> Error {
    LifecycleError::TopologyFormationFailed {
        reason: reason.to_string(),
        output: e.to_string(),
    }
    .into()
}
