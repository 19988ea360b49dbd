#![deny(missing_docs)]

//! Core plumbing shared by the lmc simulation crates: structured errors,
//! the deterministic random source and hierarchical parameter trees.

pub mod errors;
pub mod params;
pub mod rng;

pub use errors::{ErrorInfo, LmcError};
pub use params::ParameterTree;
pub use rng::{derive_substream_seed, RngHandle};
