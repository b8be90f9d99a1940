//! Input/output helpers.
//!
//! - subject CSV ingest (`ingest`)
//! - result exports (CSV/JSON) (`export`)
//! - coefficient table CSV read/write (`table`)

pub mod export;
pub mod ingest;
pub mod table;

pub use export::*;
pub use ingest::*;
pub use table::*;
