//! Progress reporting module
//!
//! Progress is advisory: sinks observe a hash computation but never
//! influence the digests it produces.

mod reporter;

pub use reporter::*;
