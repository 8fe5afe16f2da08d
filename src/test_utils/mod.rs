//! Shared fakes for unit tests: in-memory logs and a scripted fleet of
//! server processes, so that no real server or CLI binary is needed.
mod common;
mod fake_fleet;
mod memory_log;

pub use common::*;
pub use fake_fleet::*;
pub use memory_log::*;
