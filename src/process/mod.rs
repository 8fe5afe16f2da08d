//! Everything that runs an external executable: the command runner seam,
//! discovery of the server/CLI binaries and the server launcher.
mod binaries;
mod launcher;
mod runner;

pub use binaries::*;
pub use launcher::*;
pub use runner::*;
