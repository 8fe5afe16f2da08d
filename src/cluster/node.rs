use std::fmt;
use std::path::Path;
use std::path::PathBuf;

use serde::Serialize;

use crate::constants::SERVER_LOG_FILE;

/// Role as last reported by the node itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Primary,
    Replica,
}

/// Pid of the daemonized server.
///
/// The spawned child exits right away, the real pid only shows up in the
/// node's log and may never show up at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessIdentity {
    #[default]
    Unknown,
    Resolved(u32),
}

impl ProcessIdentity {
    /// `-1` while unknown, for the machine readable records
    pub fn as_record(&self) -> i64 {
        match self {
            ProcessIdentity::Unknown => -1,
            ProcessIdentity::Resolved(pid) => i64::from(*pid),
        }
    }
}

/// One server instance of the cluster under test
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub host: String,
    pub port: u16,
    pub identity: ProcessIdentity,
    role: Role,
    workdir: PathBuf,
}

impl Node {
    pub fn new(
        host: impl Into<String>,
        port: u16,
        workdir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            host: host.into(),
            port,
            identity: ProcessIdentity::Unknown,
            role: Role::Primary,
            workdir: workdir.into(),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn log_file(&self) -> PathBuf {
        self.workdir.join(SERVER_LOG_FILE)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_primary(&self) -> bool {
        self.role == Role::Primary
    }

    /// Only topology queries against the node set this.
    pub(crate) fn observe_role(
        &mut self,
        role: Role,
    ) {
        self.role = role;
    }

    pub fn descriptor(&self) -> NodeDescriptor {
        NodeDescriptor {
            host: self.host.clone(),
            port: self.port,
            pid: self.identity.as_record(),
            is_primary: self.is_primary(),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Entry of the `SERVERS_JSON` record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeDescriptor {
    pub host: String,
    pub port: u16,
    pub pid: i64,
    pub is_primary: bool,
}
