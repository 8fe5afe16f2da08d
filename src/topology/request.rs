use std::collections::HashSet;

use crate::Error;
use crate::Result;

/// Shape of the topology formed over the launched nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopologyKind {
    /// Sharded, formed with `--cluster create`
    Cluster,
    /// One primary, every other node replicates it
    Replication,
    /// A single node, nothing to form
    Single,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopologyRequest {
    pub shard_count: usize,
    pub replica_count: usize,
    pub cluster_mode: bool,
}

impl TopologyRequest {
    /// Without cluster mode the shard count is forced to 1.
    pub fn new(
        shard_count: usize,
        replica_count: usize,
        cluster_mode: bool,
    ) -> Result<Self> {
        if shard_count == 0 {
            return Err(Error::InvalidRequest("shard count must be at least 1".into()));
        }
        Ok(Self {
            shard_count: if cluster_mode { shard_count } else { 1 },
            replica_count,
            cluster_mode,
        })
    }

    pub fn node_count(&self) -> usize {
        self.shard_count * (1 + self.replica_count)
    }

    /// A single shard is never sharded, even in cluster mode.
    pub fn kind(&self) -> TopologyKind {
        if self.cluster_mode && self.shard_count > 1 {
            TopologyKind::Cluster
        } else if self.replica_count > 0 {
            TopologyKind::Replication
        } else {
            TopologyKind::Single
        }
    }

    /// Value of the server's `--cluster-enabled` flag
    pub fn cluster_enabled(&self) -> bool {
        self.kind() == TopologyKind::Cluster
    }

    /// Explicit ports must name every node exactly once.
    pub fn validate_ports(
        &self,
        ports: &[u16],
    ) -> Result<()> {
        if ports.len() != self.node_count() {
            return Err(Error::InvalidRequest(format!(
                "The number of ports must be equal to the total number of nodes. Number of passed ports == {}, number of nodes == {}",
                ports.len(),
                self.node_count()
            )));
        }
        let unique: HashSet<&u16> = ports.iter().collect();
        if unique.len() != ports.len() {
            return Err(Error::InvalidRequest(format!("Duplicate ports in {:?}", ports)));
        }
        if ports.contains(&0) {
            return Err(Error::InvalidRequest("Port 0 cannot be requested".into()));
        }
        Ok(())
    }
}
