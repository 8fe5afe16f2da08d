use std::path::Path;
use std::sync::Arc;

use regex::Regex;
use tokio::sync::OnceCell;
use tokio::time::Instant;
use tracing::debug;
use tracing::warn;

use super::runner::format_command;
use crate::constants::DEBUG_COMMAND_MIN_VERSION;
use crate::constants::PID_LINE_GROUP;
use crate::constants::PID_LINE_PATTERN;
use crate::constants::SERVER_LOG_FILE;
use crate::constants::VERSION_PATTERN;
use crate::utils::file_io::create_dir_if_not_exist;
use crate::CommandRunner;
use crate::Error;
use crate::LifecycleError;
use crate::LogWatcher;
use crate::Node;
use crate::PortAllocator;
use crate::ProcessIdentity;
use crate::Result;
use crate::TimingConfig;

/// `major.minor.patch` reported by `<server> --version`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ServerVersion(pub u32, pub u32, pub u32);

impl ServerVersion {
    pub fn parse(
        pattern: &Regex,
        output: &str,
    ) -> Option<Self> {
        let caps = pattern.captures(output)?;
        let part = |i: usize| caps.get(i)?.as_str().parse::<u32>().ok();
        Some(ServerVersion(part(1)?, part(2)?, part(3)?))
    }

    pub fn needs_debug_command_flag(&self) -> bool {
        let (major, minor, patch) = DEBUG_COMMAND_MIN_VERSION;
        *self >= ServerVersion(major, minor, patch)
    }
}

/// Options shared by every node of one cluster
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub host: String,
    pub cluster_mode: bool,
    /// `Some` switches the node to `--tls-port`
    pub tls_args: Option<Vec<String>>,
    pub modules: Vec<String>,
}

/// Spawns daemonizing servers, one working directory per port.
pub struct ProcessLauncher {
    runner: Arc<dyn CommandRunner>,
    watcher: LogWatcher,
    allocator: Arc<PortAllocator>,
    server_binary: String,
    timing: TimingConfig,
    version: OnceCell<ServerVersion>,
    version_pattern: Regex,
    pid_pattern: Regex,
}

impl ProcessLauncher {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        watcher: LogWatcher,
        allocator: Arc<PortAllocator>,
        server_binary: impl Into<String>,
        timing: TimingConfig,
    ) -> Result<Self> {
        Ok(Self {
            runner,
            watcher,
            allocator,
            server_binary: server_binary.into(),
            timing,
            version: OnceCell::new(),
            version_pattern: Regex::new(VERSION_PATTERN)?,
            pid_pattern: Regex::new(PID_LINE_PATTERN)?,
        })
    }

    /// Detected once, then cached for the lifetime of the launcher.
    pub async fn server_version(&self) -> Result<ServerVersion> {
        self.version
            .get_or_try_init(|| async {
                let args = vec!["--version".to_string()];
                let output = self
                    .runner
                    .run(&self.server_binary, &args, self.timing.version_timeout())
                    .await?;
                let version = ServerVersion::parse(&self.version_pattern, &output.stdout).ok_or_else(|| {
                    LifecycleError::VersionDetectionFailed {
                        output: output.diagnostic().to_string(),
                    }
                })?;
                debug!("Detected server version {:?}", version);
                Ok::<_, Error>(version)
            })
            .await
            .copied()
    }

    /// Launch one node on `port`, or on a freshly allocated port.
    ///
    /// The returned node has not been checked for port conflicts or
    /// liveness yet.
    pub async fn launch(
        &self,
        port: Option<u16>,
        workspace: &Path,
        options: &LaunchOptions,
    ) -> Result<Node> {
        let tic = Instant::now();
        let port = match port {
            Some(port) => port,
            None => self.allocator.allocate_default().await?,
        };
        let node_dir = workspace.join(port.to_string());
        let mut node = Node::new(options.host.clone(), port, node_dir.clone());
        debug!("Creating server {}", node);

        create_dir_if_not_exist(&node_dir)?;
        let version = self.server_version().await?;
        let args = server_args(port, &node_dir, options, version.needs_debug_command_flag());

        let command = format_command(&self.server_binary, &args);
        let output = self
            .runner
            .run(&self.server_binary, &args, self.timing.spawn_timeout())
            .await
            .map_err(|e| LifecycleError::LaunchFailed {
                address: node.address(),
                command: command.clone(),
                exit_code: None,
                stderr: e.to_string(),
            })?;
        if !output.success() {
            return Err(LifecycleError::LaunchFailed {
                address: node.address(),
                command,
                exit_code: output.exit_code,
                stderr: output.diagnostic().to_string(),
            }
            .into());
        }

        node.identity = self.resolve_identity(&node.log_file()).await;
        debug!("start_server() {} Elapsed time: {:?}", node, tic.elapsed());
        Ok(node)
    }

    /// Recover the pid from the `just started` log line.
    pub async fn resolve_identity(
        &self,
        log_file: &Path,
    ) -> ProcessIdentity {
        let found = self
            .watcher
            .wait_for_pattern(log_file, &self.pid_pattern, self.timing.pid_discovery_timeout())
            .await;
        match found
            .as_ref()
            .and_then(|m| m.group(PID_LINE_GROUP))
            .and_then(|pid| pid.parse::<u32>().ok())
        {
            Some(pid) => ProcessIdentity::Resolved(pid),
            None => {
                warn!("Could not resolve pid from {}", log_file.display());
                ProcessIdentity::Unknown
            }
        }
    }
}

/// Full argument list of one server launch.
pub fn server_args(
    port: u16,
    node_dir: &Path,
    options: &LaunchOptions,
    enable_debug_command: bool,
) -> Vec<String> {
    let port_flag = if options.tls_args.is_some() {
        "--tls-port"
    } else {
        "--port"
    };
    let mut args: Vec<String> = vec![
        port_flag.into(),
        port.to_string(),
        "--cluster-enabled".into(),
        if options.cluster_mode { "yes" } else { "no" }.into(),
        "--dir".into(),
        node_dir.display().to_string(),
        "--daemonize".into(),
        "yes".into(),
        "--logfile".into(),
        node_dir.join(SERVER_LOG_FILE).display().to_string(),
        "--protected-mode".into(),
        "no".into(),
        "--appendonly".into(),
        "no".into(),
        "--save".into(),
        "".into(),
    ];
    if enable_debug_command {
        args.extend(["--enable-debug-command".into(), "yes".into()]);
    }
    for module in &options.modules {
        args.extend(["--loadmodule".into(), module.clone()]);
    }
    if let Some(tls_args) = &options.tls_args {
        args.extend(tls_args.iter().cloned());
    }
    args
}
