use std::collections::VecDeque;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::debug;
use tracing::error;
use tracing::warn;

use crate::utils::file_io::remove_folder;
use crate::Binaries;
use crate::CertificateGenerator;
use crate::CertificateStore;
use crate::CliInvoker;
use crate::ClusterState;
use crate::ClusterWorkspace;
use crate::CommandRunner;
use crate::Credentials;
use crate::Error;
use crate::FsLogSource;
use crate::LaunchOptions;
use crate::LifecycleError;
use crate::LogSource;
use crate::LogWatcher;
use crate::Node;
use crate::PortAllocator;
use crate::PortStatus;
use crate::ProcessLauncher;
use crate::RcgenGenerator;
use crate::ReadinessProber;
use crate::Result;
use crate::Settings;
use crate::TlsMaterial;
use crate::TokioCommandRunner;
use crate::TopologyBuilder;
use crate::TopologyKind;
use crate::TopologyRequest;

#[derive(Debug, Clone)]
pub struct StartRequest {
    pub host: String,
    pub topology: TopologyRequest,
    /// One port per node; `None` allocates ports
    pub ports: Option<Vec<u16>>,
    pub tls: bool,
    pub modules: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct StartedCluster {
    pub workspace: PathBuf,
    pub nodes: Vec<Node>,
    pub kind: TopologyKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopTarget {
    Folder(PathBuf),
    /// Every workspace under `root` whose name starts with `prefix`
    Prefix { root: PathBuf, prefix: String },
}

#[derive(Debug, Clone)]
pub struct StopRequest {
    pub host: String,
    pub target: StopTarget,
    pub tls: bool,
    pub credentials: Option<Credentials>,
    pub keep_folder: bool,
    /// Force killed after every workspace was stopped
    pub pids: Vec<u32>,
}

impl StopTarget {
    /// Folder whose manager log records the stop.
    pub fn log_folder(&self) -> &Path {
        match self {
            StopTarget::Folder(path) => path,
            StopTarget::Prefix { root, .. } => root,
        }
    }
}

/// A node that did not stop gracefully
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeFailure {
    pub address: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StopReport {
    pub stopped: Vec<String>,
    pub failures: Vec<NodeFailure>,
    pub removed_folders: Vec<PathBuf>,
    pub killed: Vec<u32>,
}

impl StopReport {
    pub fn all_graceful(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Per-operation components, bound to the TLS material of that operation
struct Stack {
    launcher: ProcessLauncher,
    prober: ReadinessProber,
    builder: TopologyBuilder,
}

/// Brings a cluster up and tears clusters down.
///
/// Work is strictly sequential: nodes are launched, then checked one at a
/// time from a pending queue that relaunched nodes re-enter at the back.
pub struct ClusterOrchestrator {
    settings: Settings,
    runner: Arc<dyn CommandRunner>,
    log_source: Arc<dyn LogSource>,
    cert_generator: Arc<dyn CertificateGenerator>,
    binaries: Binaries,
    allocator: Arc<PortAllocator>,
    state: ClusterState,
}

impl ClusterOrchestrator {
    pub fn new(
        settings: Settings,
        runner: Arc<dyn CommandRunner>,
        log_source: Arc<dyn LogSource>,
        binaries: Binaries,
    ) -> Self {
        let allocator = Arc::new(PortAllocator::new(settings.ports.clone()));
        Self {
            settings,
            runner,
            log_source,
            cert_generator: Arc::new(RcgenGenerator),
            binaries,
            allocator,
            state: ClusterState::Empty,
        }
    }

    /// Real processes and log files, binaries looked up on `PATH`.
    pub async fn from_settings(settings: Settings) -> Result<Self> {
        let runner: Arc<dyn CommandRunner> = Arc::new(TokioCommandRunner);
        let binaries = Binaries::discover(
            runner.as_ref(),
            &settings.binaries,
            settings.timing.version_timeout(),
        )
        .await?;
        Ok(Self::new(settings, runner, Arc::new(FsLogSource), binaries))
    }

    pub fn with_certificate_generator(
        mut self,
        generator: Arc<dyn CertificateGenerator>,
    ) -> Self {
        self.cert_generator = generator;
        self
    }

    pub fn state(&self) -> ClusterState {
        self.state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    fn transition(
        &mut self,
        next: ClusterState,
    ) -> Result<()> {
        self.state = self.state.transition(next)?;
        debug!("cluster state -> {}", self.state);
        Ok(())
    }

    fn watcher(&self) -> LogWatcher {
        LogWatcher::new(self.log_source.clone(), self.settings.timing.log_poll_interval())
    }

    fn cli(
        &self,
        tls: Option<TlsMaterial>,
    ) -> CliInvoker {
        CliInvoker::new(self.runner.clone(), self.binaries.cli.clone(), tls)
    }

    fn prober(
        &self,
        tls: Option<TlsMaterial>,
    ) -> ReadinessProber {
        ReadinessProber::new(
            self.cli(tls),
            self.watcher(),
            self.settings.timing.clone(),
            self.settings.markers.clone(),
        )
    }

    fn stack(
        &self,
        tls: Option<TlsMaterial>,
    ) -> Result<Stack> {
        Ok(Stack {
            launcher: ProcessLauncher::new(
                self.runner.clone(),
                self.watcher(),
                self.allocator.clone(),
                self.binaries.server.clone(),
                self.settings.timing.clone(),
            )?,
            prober: self.prober(tls.clone()),
            builder: TopologyBuilder::new(self.cli(tls), self.watcher(), self.settings.timing.clone()),
        })
    }

    /// Generate the shared TLS material unless a valid copy is cached.
    pub async fn ensure_tls(&self) -> Result<TlsMaterial> {
        CertificateStore::new(
            TlsMaterial::new(self.settings.paths.tls_folder()),
            self.cert_generator.clone(),
            self.settings.tls.clone(),
            self.settings.timing.cert_wait_timeout(),
            self.settings.timing.log_poll_interval(),
        )
        .ensure()
        .await
    }

    /// Launch every node into `workspace`, wait until all of them answer
    /// and form the requested topology.
    pub async fn start(
        &mut self,
        workspace: &ClusterWorkspace,
        request: &StartRequest,
    ) -> Result<StartedCluster> {
        if let Some(ports) = &request.ports {
            request.topology.validate_ports(ports)?;
        }
        self.transition(ClusterState::NodesLaunching)?;

        match self.run_start(workspace, request).await {
            Ok(started) => Ok(started),
            Err(e) => {
                error!("Failed to start cluster in {}: {}", workspace.path().display(), e);
                self.state = ClusterState::Failed;
                Err(e)
            }
        }
    }

    async fn run_start(
        &mut self,
        workspace: &ClusterWorkspace,
        request: &StartRequest,
    ) -> Result<StartedCluster> {
        let topology = request.topology;
        let tls = if request.tls {
            Some(self.ensure_tls().await?)
        } else {
            None
        };
        let options = LaunchOptions {
            host: request.host.clone(),
            cluster_mode: topology.cluster_enabled(),
            tls_args: tls
                .as_ref()
                .map(|m| m.server_launch_args(&request.host, topology.replica_count > 0)),
            modules: request.modules.clone(),
        };
        let stack = self.stack(tls)?;

        let mut nodes = self.launch_nodes(&stack, workspace, request, &options).await?;
        self.transition(ClusterState::NodesReady)?;

        let kind = topology.kind();
        if kind != TopologyKind::Single {
            self.transition(ClusterState::TopologyForming)?;
            stack.builder.form(&topology, &mut nodes).await?;
        }
        self.transition(ClusterState::Converged)?;

        Ok(StartedCluster {
            workspace: workspace.path().to_path_buf(),
            nodes,
            kind,
        })
    }

    async fn launch_nodes(
        &self,
        stack: &Stack,
        workspace: &ClusterWorkspace,
        request: &StartRequest,
        options: &LaunchOptions,
    ) -> Result<Vec<Node>> {
        let tic = Instant::now();
        debug!("## Creating servers");
        let node_count = request.topology.node_count();
        let explicit_ports = request.ports.is_some();

        let mut pending = VecDeque::with_capacity(node_count);
        for i in 0..node_count {
            let port = request.ports.as_ref().map(|ports| ports[i]);
            pending.push_back(stack.launcher.launch(port, workspace.path(), options).await?);
        }

        let mut ready = Vec::with_capacity(node_count);
        while let Some(node) = pending.pop_front() {
            debug!("Checking server {}", node);
            if stack.prober.detect_port_conflict(&node).await == PortStatus::InUse {
                if explicit_ports {
                    // the user picked a taken port, keep its log around
                    return Err(LifecycleError::PortConflict {
                        address: node.address(),
                        log_file: node.log_file(),
                    }
                    .into());
                }
                warn!("Port {} is taken, relaunching {} on a new port", node.port, node);
                remove_folder(node.workdir())?;
                pending.push_back(stack.launcher.launch(None, workspace.path(), options).await?);
                continue;
            }

            if !stack.prober.wait_until_ready(&node, None).await {
                return Err(LifecycleError::ReadinessTimeout {
                    address: node.address(),
                    timeout: self.settings.timing.readiness.timeout(),
                    log_file: node.log_file(),
                }
                .into());
            }
            ready.push(node);
        }

        debug!("All servers are up!");
        debug!("create_servers() Elapsed time: {:?}", tic.elapsed());
        Ok(ready)
    }

    /// Gracefully stop every node of every targeted workspace.
    ///
    /// Node failures are collected, they never abort the teardown.
    pub async fn stop(
        &mut self,
        request: &StopRequest,
    ) -> Result<StopReport> {
        self.transition(ClusterState::Stopping)?;
        match self.run_stop(request).await {
            Ok(report) => {
                self.transition(ClusterState::Stopped)?;
                Ok(report)
            }
            Err(e) => {
                self.state = ClusterState::Failed;
                Err(e)
            }
        }
    }

    async fn run_stop(
        &self,
        request: &StopRequest,
    ) -> Result<StopReport> {
        let workspaces = match &request.target {
            StopTarget::Folder(path) => vec![ClusterWorkspace::open(path)?],
            StopTarget::Prefix { root, prefix } => ClusterWorkspace::find(root, prefix)?,
        };
        let tls = request
            .tls
            .then(|| TlsMaterial::new(self.settings.paths.tls_folder()));
        let prober = self.prober(tls);

        let mut report = StopReport::default();
        for workspace in &workspaces {
            self.stop_workspace(&prober, workspace, request, &mut report).await?;
        }
        for pid in &request.pids {
            self.kill(*pid, &mut report).await;
        }
        Ok(report)
    }

    async fn stop_workspace(
        &self,
        prober: &ReadinessProber,
        workspace: &ClusterWorkspace,
        request: &StopRequest,
        report: &mut StopReport,
    ) -> Result<()> {
        debug!("## Stopping cluster in path {}", workspace.path().display());
        let mut all_stopped = true;
        for port in workspace.node_ports()? {
            let node = Node::new(request.host.clone(), port, workspace.node_dir(port));
            match self.stop_node(prober, &node, request.credentials.as_ref()).await {
                Ok(()) => report.stopped.push(node.address()),
                Err(e) => {
                    error!("{}", e);
                    all_stopped = false;
                    report.failures.push(NodeFailure {
                        address: node.address(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        if all_stopped {
            debug!("All hosts were stopped gracefully");
        } else {
            warn!("Some hosts in {} were not stopped gracefully", workspace.path().display());
        }

        if !request.keep_folder {
            workspace.remove()?;
            report.removed_folders.push(workspace.path().to_path_buf());
        }
        Ok(())
    }

    /// Retries the shutdown request on command timeouts only.
    async fn stop_node(
        &self,
        prober: &ReadinessProber,
        node: &Node,
        credentials: Option<&Credentials>,
    ) -> Result<()> {
        let policy = self.settings.timing.shutdown;
        let mut last_timeout: Option<Error> = None;

        for attempt in 0..=policy.max_retries {
            match prober.request_shutdown(node, credentials).await {
                Ok(()) => {
                    if prober.wait_for_shutdown(node, credentials).await {
                        return Ok(());
                    }
                    return Err(LifecycleError::ShutdownFailed {
                        address: node.address(),
                        reason: "Timeout elapsed while waiting for the node to shutdown".into(),
                    }
                    .into());
                }
                Err(e) if e.is_command_timeout() => {
                    warn!("Shutdown of {} timed out (attempt {}): {}", node, attempt + 1, e);
                    last_timeout = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(LifecycleError::ShutdownFailed {
            address: node.address(),
            reason: last_timeout.map(|e| e.to_string()).unwrap_or_default(),
        }
        .into())
    }

    /// `kill -9`; an already dead process is only logged.
    async fn kill(
        &self,
        pid: u32,
        report: &mut StopReport,
    ) {
        let args = vec!["-9".to_string(), pid.to_string()];
        match self
            .runner
            .run("kill", &args, self.settings.timing.cli_query_timeout())
            .await
        {
            Ok(output) if output.success() => report.killed.push(pid),
            Ok(output) => debug!("Could not kill server with PID: {}. {}", pid, output.diagnostic()),
            Err(e) => debug!("Could not kill server with PID: {}. {}", pid, e),
        }
    }
}

impl StartedCluster {
    /// "Cluster" or "Standalone", for the final log line
    pub fn flavour(&self) -> &'static str {
        match self.kind {
            TopologyKind::Cluster => "Cluster",
            TopologyKind::Replication | TopologyKind::Single => "Standalone",
        }
    }
}
