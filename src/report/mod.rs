//! Reporting utilities: run summaries and formatted terminal output.

pub mod format;

pub use format::*;

use crate::domain::SubjectResult;

/// Distribution of percent-of-predicted values over the evaluated subjects.
#[derive(Debug, Clone, PartialEq)]
pub struct PctStats {
    pub n: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    /// Subjects below 80% of predicted.
    pub below_80: usize,
}

/// Summarize percent-of-predicted values; `None` when no subject has one.
pub fn pct_stats(results: &[SubjectResult]) -> Option<PctStats> {
    let values: Vec<f64> = results.iter().filter_map(|r| r.pct_predicted).collect();
    if values.is_empty() {
        return None;
    }

    let n = values.len();
    let mean = values.iter().sum::<f64>() / n as f64;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let below_80 = values.iter().filter(|&&v| v < 80.0).count();

    Some(PctStats { n, mean, min, max, below_80 })
}
