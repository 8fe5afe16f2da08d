//! Node model, workspace layout and the orchestrator that drives a
//! cluster from nothing to converged and back to stopped.
mod node;
mod orchestrator;
pub mod report;
mod state;
mod workspace;

pub use node::*;
pub use orchestrator::*;
pub use state::*;
pub use workspace::*;
