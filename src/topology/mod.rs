//! Cluster formation and standalone replication over launched nodes.
mod builder;
mod parse;
mod request;

pub use builder::*;
pub use parse::*;
pub use request::*;
