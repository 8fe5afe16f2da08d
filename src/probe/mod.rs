//! Liveness probing, port-conflict detection and graceful stop requests.
mod cli;
mod readiness_prober;

pub use cli::*;
pub use readiness_prober::*;
