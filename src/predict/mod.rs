//! Reference-equation evaluation.
//!
//! Both predictors follow the same flow:
//!
//! - validate call-level inputs (lengths, measure, sex domain) and fail fast
//! - derive the age stratum for each element
//! - look up coefficients and evaluate the formula
//! - optionally divide an observed value by the prediction
//!
//! Per-element problems never abort a batch; they come back as `None`.

use std::fmt;

use serde::Serialize;

use crate::error::SpiroError;

pub mod knudson;
pub mod wang;

pub use knudson::Knudson;
pub use wang::Wang;

/// Plausible height interval for a unit system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeightRange {
    pub min: f64,
    pub max: f64,
    pub unit: &'static str,
}

/// Knudson heights are centimetres.
pub const KNUDSON_HEIGHT_CM: HeightRange = HeightRange {
    min: 100.0,
    max: 250.0,
    unit: "cm",
};

/// Wang heights are metres.
pub const WANG_HEIGHT_M: HeightRange = HeightRange {
    min: 0.5,
    max: 2.5,
    unit: "m",
};

/// Heights outside the plausible range for the unit system.
///
/// Usually a unit mix-up (metres passed where centimetres are expected, or the
/// reverse). Informational only: values are still computed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeightWarning {
    pub range: HeightRange,
    /// Positions of the offending elements.
    pub indices: Vec<usize>,
}

impl fmt::Display for HeightWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} height value(s) outside the plausible range [{}, {}] {}; check that heights are in {}",
            self.indices.len(),
            self.range.min,
            self.range.max,
            self.range.unit,
            self.range.unit,
        )
    }
}

/// Percent-of-predicted output for one measure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PctPredicted<M> {
    pub measure: M,
    pub predicted: Vec<Option<f64>>,
    pub pct: Vec<Option<f64>>,
    pub warnings: Vec<HeightWarning>,
}

/// Fail unless every named input has the same length; returns that length.
pub fn ensure_equal_lengths(lengths: &[(&'static str, usize)]) -> Result<usize, SpiroError> {
    let n = lengths.first().map(|(_, len)| *len).unwrap_or(0);
    if lengths.iter().any(|(_, len)| *len != n) {
        return Err(SpiroError::LengthMismatch {
            lengths: lengths.to_vec(),
        });
    }
    Ok(n)
}

/// `observed / predicted * 100` per element; missing if either side is.
pub fn percent_of_predicted(observed: &[Option<f64>], predicted: &[Option<f64>]) -> Vec<Option<f64>> {
    observed
        .iter()
        .zip(predicted)
        .map(|(obs, pred)| match (finite(*obs), finite(*pred)) {
            (Some(o), Some(p)) => finite(Some(o / p * 100.0)),
            _ => None,
        })
        .collect()
}

/// Flag heights outside `range`, logging a warning when any are found.
pub fn check_height_range(heights: &[Option<f64>], range: HeightRange) -> Option<HeightWarning> {
    let indices: Vec<usize> = heights
        .iter()
        .enumerate()
        .filter_map(|(i, h)| finite(*h).filter(|h| *h < range.min || *h > range.max).map(|_| i))
        .collect();

    if indices.is_empty() {
        return None;
    }
    let warning = HeightWarning { range, indices };
    log::warn!("{warning}");
    Some(warning)
}

/// Treat non-finite values as missing.
pub(crate) fn finite(v: Option<f64>) -> Option<f64> {
    v.filter(|x| x.is_finite())
}
