//! Local network helpers.
//!
//! The only network concern of the orchestrator is finding TCP ports the
//! server under test can bind. The search is racy by nature: a port found
//! free here may be taken before the server binds it, so launches treat
//! "address already in use" as recoverable.
mod port_allocator;

pub use port_allocator::*;
