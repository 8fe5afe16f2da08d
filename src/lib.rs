//! Provisions ephemeral Valkey/Redis deployments on the local host and tears
//! them down again: a single node, a primary with replicas, or a sharded
//! cluster with replicas per shard.
//!
//! [`ClusterOrchestrator`] drives the lifecycle; every external effect goes
//! through the [`CommandRunner`] and [`LogSource`] seams.
pub mod cli;
mod cluster;
mod config;
pub mod constants;
mod errors;
mod logwatch;
mod network;
mod probe;
mod process;
mod tls;
mod topology;
pub mod utils;

pub use cluster::*;
pub use config::*;
pub use errors::*;
pub use logwatch::*;
pub use network::*;
pub use probe::*;
pub use process::*;
pub use tls::*;
pub use topology::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
