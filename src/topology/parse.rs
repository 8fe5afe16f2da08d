use crate::Role;

/// One line of `cluster nodes`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterNodeEntry {
    pub id: String,
    /// `host:port@bus-port`
    pub address: String,
    pub flags: String,
}

impl ClusterNodeEntry {
    pub fn is_myself(&self) -> bool {
        self.flags.contains("myself")
    }

    pub fn role(&self) -> Role {
        if self.flags.contains("master") {
            Role::Primary
        } else {
            Role::Replica
        }
    }
}

/// Lines with fewer than three tokens are skipped.
pub fn parse_cluster_nodes(output: &str) -> Vec<ClusterNodeEntry> {
    output
        .lines()
        .filter_map(|line| {
            let mut tokens = line.split_whitespace();
            Some(ClusterNodeEntry {
                id: tokens.next()?.to_string(),
                address: tokens.next()?.to_string(),
                flags: tokens.next()?.to_string(),
            })
        })
        .collect()
}

/// Role of the queried node, from the line flagged `myself`
pub fn own_role(cluster_nodes_output: &str) -> Option<Role> {
    parse_cluster_nodes(cluster_nodes_output)
        .into_iter()
        .find(ClusterNodeEntry::is_myself)
        .map(|entry| entry.role())
}

/// First line of the `ROLE` reply
pub fn parse_role_reply(output: &str) -> Option<Role> {
    match output.lines().map(str::trim).find(|l| !l.is_empty())? {
        "master" => Some(Role::Primary),
        "slave" | "replica" => Some(Role::Replica),
        _ => None,
    }
}
