//! Command line of the `cluster-manager` binary.
//!
//! Global options come before the action:
//! `cluster-manager --tls --loglevel debug start --cluster-mode -n 3 -r 1`
use std::path::Path;
use std::path::PathBuf;

use clap::ArgGroup;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use tracing::Level;

use crate::constants::CLUSTER_MANAGER_LOG_FILE;
use crate::constants::DEFAULT_CLUSTER_PREFIX;
use crate::constants::TLS_PREFIX;
use crate::Credentials;
use crate::Error;
use crate::Result;
use crate::StartRequest;
use crate::StopRequest;
use crate::StopTarget;
use crate::TopologyRequest;

#[derive(Parser, Debug)]
#[command(name = "cluster-manager")]
#[command(version)]
#[command(about = "Start and stop throwaway Valkey/Redis clusters for tests", long_about = None)]
pub struct Cli {
    /// Host address
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    pub host: String,

    /// TLS enabled
    #[arg(long, default_value_t = false)]
    pub tls: bool,

    /// Authentication password
    #[arg(long)]
    pub auth: Option<String>,

    /// critical, error, warn, warning, info or debug
    #[arg(long = "loglevel", alias = "log", default_value = "info", value_parser = parse_log_level)]
    pub log_level: Level,

    /// Log file (defaults to the cluster folder)
    #[arg(long)]
    pub logfile: Option<PathBuf>,

    /// Settings file, overrides CLUSTER_MANAGER_CONFIG
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start a new cluster
    Start(StartArgs),
    /// Shutdown a running cluster
    Stop(StopArgs),
}

#[derive(Args, Debug)]
pub struct StartArgs {
    /// Cluster mode enabled; a standalone replication group otherwise
    #[arg(long, default_value_t = false)]
    pub cluster_mode: bool,

    /// Parent of the new cluster folder (defaults to the configured clusters folder)
    #[arg(long)]
    pub folder_path: Option<PathBuf>,

    /// One port per node
    #[arg(short, long, num_args = 1..)]
    pub ports: Option<Vec<u16>>,

    /// Number of shards, cluster mode only
    #[arg(short = 'n', long, default_value_t = 3)]
    pub shard_count: usize,

    /// Replicas per shard
    #[arg(short, long, default_value_t = 1)]
    pub replica_count: usize,

    /// Cluster folder name prefix, `tls-` is prepended with TLS
    #[arg(long, default_value = DEFAULT_CLUSTER_PREFIX)]
    pub prefix: String,

    /// Server module to load, repeatable
    #[arg(long = "load-module")]
    pub load_module: Vec<String>,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("target").required(true).args(["prefix", "cluster_folder"])))]
pub struct StopArgs {
    /// Folder searched with `--prefix` (defaults to the configured clusters folder)
    #[arg(long)]
    pub folder_path: Option<PathBuf>,

    /// Stop every cluster whose folder name starts with this prefix
    #[arg(long)]
    pub prefix: Option<String>,

    /// Stop the cluster in this folder
    #[arg(long)]
    pub cluster_folder: Option<PathBuf>,

    /// Keep the cluster folder
    #[arg(long, default_value_t = false)]
    pub keep_folder: bool,

    /// Comma separated process ids to kill once the clusters are stopped
    #[arg(long, default_value = "", value_parser = parse_pids)]
    pub pids: Pids,
}

/// Process ids given as one comma separated value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pids(pub Vec<u32>);

/// Empty entries are skipped, so `--pids ""` and `1,,2,` are accepted.
pub fn parse_pids(value: &str) -> std::result::Result<Pids, String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|pid| !pid.is_empty())
        .map(|pid| pid.parse::<u32>().map_err(|e| format!("invalid pid {:?}: {}", pid, e)))
        .collect::<std::result::Result<Vec<_>, _>>()
        .map(Pids)
}

/// `critical` and `warning` are accepted next to the tracing level names.
pub fn parse_log_level(value: &str) -> std::result::Result<Level, String> {
    match value.to_ascii_lowercase().as_str() {
        "critical" | "error" => Ok(Level::ERROR),
        "warn" | "warning" => Ok(Level::WARN),
        "info" => Ok(Level::INFO),
        "debug" => Ok(Level::DEBUG),
        "trace" => Ok(Level::TRACE),
        _ => Err(format!(
            "log level given: {} -- must be one of: critical | error | warn | warning | info | debug",
            value
        )),
    }
}

impl Cli {
    fn credentials(&self) -> Option<Credentials> {
        self.auth.as_deref().map(Credentials::new)
    }

    /// Validated before any folder is created.
    pub fn start_request(
        &self,
        args: &StartArgs,
    ) -> Result<StartRequest> {
        let topology = TopologyRequest::new(args.shard_count, args.replica_count, args.cluster_mode)?;
        if let Some(ports) = &args.ports {
            topology.validate_ports(ports)?;
        }
        Ok(StartRequest {
            host: self.host.clone(),
            topology,
            ports: args.ports.clone(),
            tls: self.tls,
            modules: args.load_module.clone(),
        })
    }

    pub fn workspace_prefix(
        &self,
        args: &StartArgs,
    ) -> String {
        if self.tls {
            format!("{}{}", TLS_PREFIX, args.prefix)
        } else {
            args.prefix.clone()
        }
    }

    /// `clusters_folder` is used when `--folder-path` is absent.
    pub fn stop_request(
        &self,
        args: &StopArgs,
        clusters_folder: &Path,
    ) -> Result<StopRequest> {
        let target = match (&args.cluster_folder, &args.prefix) {
            (Some(folder), None) => StopTarget::Folder(folder.clone()),
            (None, Some(prefix)) => StopTarget::Prefix {
                root: args.folder_path.clone().unwrap_or_else(|| clusters_folder.to_path_buf()),
                prefix: prefix.clone(),
            },
            (Some(_), Some(_)) => {
                return Err(Error::InvalidRequest(
                    "--cluster-folder cannot be passed together with --prefix".into(),
                ))
            }
            (None, None) => {
                return Err(Error::InvalidRequest(
                    "One of following arguments is required: --cluster-folder or --prefix".into(),
                ))
            }
        };
        Ok(StopRequest {
            host: self.host.clone(),
            target,
            tls: self.tls,
            credentials: self.credentials(),
            keep_folder: args.keep_folder,
            pids: args.pids.0.clone(),
        })
    }

    /// `--logfile`, else the manager log inside `folder`.
    pub fn log_file(
        &self,
        folder: &Path,
    ) -> PathBuf {
        self.logfile
            .clone()
            .unwrap_or_else(|| folder.join(CLUSTER_MANAGER_LOG_FILE))
    }
}
