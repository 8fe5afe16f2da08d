//! Single-line `KEY=value` records printed on stdout for the calling
//! test harness.
use std::path::Path;

use crate::constants::RECORD_CLUSTER_FOLDER;
use crate::constants::RECORD_CLUSTER_NODES;
use crate::constants::RECORD_LOG_FILE;
use crate::constants::RECORD_SERVERS_JSON;
use crate::Node;
use crate::NodeDescriptor;
use crate::Result;

pub fn log_file_record(path: &Path) -> String {
    format!("{}={}", RECORD_LOG_FILE, path.display())
}

pub fn servers_json_record(nodes: &[Node]) -> Result<String> {
    let descriptors: Vec<NodeDescriptor> = nodes.iter().map(Node::descriptor).collect();
    Ok(format!("{}={}", RECORD_SERVERS_JSON, serde_json::to_string(&descriptors)?))
}

pub fn cluster_folder_record(path: &Path) -> String {
    format!("{}={}", RECORD_CLUSTER_FOLDER, path.display())
}

pub fn cluster_nodes_record(nodes: &[Node]) -> String {
    let addresses: Vec<String> = nodes.iter().map(Node::address).collect();
    format!("{}={}", RECORD_CLUSTER_NODES, addresses.join(","))
}
