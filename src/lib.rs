//! `spiro-ref` library crate.
//!
//! Predicted and percent-of-predicted spirometry values from the Knudson (1983)
//! and Wang (1993) reference equations.
//!
//! The binary (`spiro`) is a thin wrapper around this library so that:
//!
//! - the equation logic is testable without spawning processes
//! - other tools can call the predictors directly with in-memory vectors

pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod io;
pub mod predict;
pub mod report;
pub mod tables;

pub use domain::{KnudsonMeasure, KnudsonSex, MeasureSpec, Observed, Race, WangMeasure, WangSex};
pub use error::{AppError, SpiroError};
pub use predict::{Knudson, PctPredicted, Wang};
