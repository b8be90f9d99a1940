//! Domain types used throughout the crate.
//!
//! This module defines:
//!
//! - reference/measure/sex/race enums (`Reference`, `KnudsonMeasure`, `WangSex`, ...)
//! - the `measure` argument shape (`MeasureSpec`)
//! - observed-value inputs for percent-of-predicted (`Observed`, `KnudsonObservations`, ...)

pub mod types;

pub use types::*;
