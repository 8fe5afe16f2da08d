//! TLS material shared by every node and every CLI call of a run.
mod generator;
mod material;
mod store;

pub use generator::*;
pub use material::*;
pub use store::*;
