use std::fmt;

use crate::Error;
use crate::Result;

/// Lifecycle of one orchestrator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClusterState {
    Empty,
    NodesLaunching,
    NodesReady,
    TopologyForming,
    Converged,
    Stopping,
    Stopped,
    Failed,
}

impl ClusterState {
    pub fn name(&self) -> &'static str {
        match self {
            ClusterState::Empty => "Empty",
            ClusterState::NodesLaunching => "NodesLaunching",
            ClusterState::NodesReady => "NodesReady",
            ClusterState::TopologyForming => "TopologyForming",
            ClusterState::Converged => "Converged",
            ClusterState::Stopping => "Stopping",
            ClusterState::Stopped => "Stopped",
            ClusterState::Failed => "Failed",
        }
    }

    pub fn can_transition_to(
        &self,
        next: ClusterState,
    ) -> bool {
        use ClusterState::*;
        matches!(
            (self, next),
            (Empty, NodesLaunching)
                | (NodesLaunching, NodesReady)
                | (NodesReady, TopologyForming)
                // single node, nothing to form
                | (NodesReady, Converged)
                | (TopologyForming, Converged)
                // teardown after a start that failed or was abandoned midway
                | (Empty, Stopping)
                | (NodesLaunching, Stopping)
                | (NodesReady, Stopping)
                | (TopologyForming, Stopping)
                | (Converged, Stopping)
                | (Failed, Stopping)
                | (Stopping, Stopped)
                | (_, Failed)
        )
    }

    pub fn transition(
        self,
        next: ClusterState,
    ) -> Result<ClusterState> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(Error::InvalidState {
                from: self.name(),
                to: next.name(),
            })
        }
    }
}

impl fmt::Display for ClusterState {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}
