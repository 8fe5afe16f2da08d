// -
// Log file protocol of the server under test

/// Per node log file, inside the node's working directory
pub const SERVER_LOG_FILE: &str = "server.log";

/// Log of this tool, inside the cluster workspace by default
pub const CLUSTER_MANAGER_LOG_FILE: &str = "cluster_manager.log";

/// Group 2 is the pid of the daemonized server
pub(crate) const PID_LINE_PATTERN: &str = r"version=(.*?)pid=([\d]+), just started";
pub(crate) const PID_LINE_GROUP: usize = 2;

/// Matched case-insensitively against `<server> --version`
pub(crate) const VERSION_PATTERN: &str = r"(?i)server v=(\d+)\.(\d+)\.(\d+)";

pub(crate) const CLUSTER_STATE_OK_MESSAGE: &str = "Cluster state changed: ok";
pub(crate) const REPLICA_SYNC_FINISHED_MESSAGE: &str = "sync: Finished with success";

// -
// CLI protocol

pub(crate) const PING_RESPONSE: &str = "PONG";
pub(crate) const OK_RESPONSE: &str = "OK";
pub(crate) const ALL_SLOTS_COVERED: &str = "[OK] All 16384 slots covered.";

/// Benign stderr line printed whenever `-a <password>` is used
pub(crate) const INLINE_PASSWORD_WARNING: &str = "Warning: Using a password with '-a'";

/// First server version that needs `--enable-debug-command yes`
pub(crate) const DEBUG_COMMAND_MIN_VERSION: (u32, u32, u32) = (7, 0, 0);

// -
// Workspace

pub const DEFAULT_CLUSTER_PREFIX: &str = "cluster";
pub(crate) const TLS_PREFIX: &str = "tls-";
pub(crate) const WORKSPACE_SUFFIX_LEN: usize = 6;

// -
// Port allocation

pub const DEFAULT_MIN_PORT: u16 = 6379;
pub const DEFAULT_MAX_PORT: u16 = 55535;

// -
// Machine readable records printed on stdout

pub const RECORD_LOG_FILE: &str = "LOG_FILE";
pub const RECORD_SERVERS_JSON: &str = "SERVERS_JSON";
pub const RECORD_CLUSTER_FOLDER: &str = "CLUSTER_FOLDER";
pub const RECORD_CLUSTER_NODES: &str = "CLUSTER_NODES";
