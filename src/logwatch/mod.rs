//! Log polling.
//!
//! The server under test daemonizes, so its own log file is the only way to
//! learn its pid, whether its port was free, and when cluster state or
//! replica synchronisation completed. Each poll re-reads the whole file from
//! the start; there is no cursor, which keeps the watcher correct for
//! append-only, rotation-free logs.
mod log_source;
mod log_watcher;

pub use log_source::*;
pub use log_watcher::*;

#[cfg(test)]
mod log_watcher_test;
