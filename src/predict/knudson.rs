//! Knudson (1983) predictor.
//!
//! `predicted = const + h*height + a*age + a2*age²` (height in cm), with
//! coefficients chosen by measure, sex and age stratum:
//!
//! - male: [6, 12) → 6, [12, 25) → 12, 25+ → 25
//! - female: [6, 11) → 6, [11, 20) → 11, 20+ → 20
//!
//! Ages below 6, unknown sex codes and missing inputs yield `None`.

use rayon::prelude::*;

use super::{KNUDSON_HEIGHT_CM, PctPredicted, check_height_range, ensure_equal_lengths, finite, percent_of_predicted};
use crate::domain::{KnudsonMeasure, KnudsonObservations, KnudsonSex, Measure, MeasureSpec, Observed};
use crate::error::SpiroError;
use crate::tables::{KnudsonKey, KnudsonTable, knudson};

/// Knudson evaluator over a coefficient table.
#[derive(Debug, Clone, Copy)]
pub struct Knudson<'t> {
    table: &'t KnudsonTable,
}

impl Knudson<'static> {
    /// Evaluator over the compiled-in table.
    pub fn builtin() -> Result<Self, SpiroError> {
        Ok(Self::new(knudson::builtin()?))
    }
}

impl<'t> Knudson<'t> {
    pub fn new(table: &'t KnudsonTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &'t KnudsonTable {
        self.table
    }

    /// Predicted values, one per element.
    ///
    /// `sex` uses the integer coding 1 = male, 2 = female.
    pub fn predicted(
        &self,
        sex: &[Option<i64>],
        age: &[Option<f64>],
        height: &[Option<f64>],
        measure: &MeasureSpec<KnudsonMeasure>,
    ) -> Result<Vec<Option<f64>>, SpiroError> {
        let n = ensure_equal_lengths(&[("sex", sex.len()), ("age", age.len()), ("height", height.len())])?;
        let measure = measure.resolve(n)?;

        Ok((0..n)
            .into_par_iter()
            .map(|i| self.predict_one(measure, sex[i], age[i], height[i]))
            .collect())
    }

    /// Percent of predicted for exactly one observed measure.
    pub fn pct_predicted(
        &self,
        sex: &[Option<i64>],
        age: &[Option<f64>],
        height: &[Option<f64>],
        observed: &Observed<KnudsonMeasure>,
    ) -> Result<PctPredicted<KnudsonMeasure>, SpiroError> {
        ensure_equal_lengths(&[
            ("sex", sex.len()),
            ("age", age.len()),
            ("height", height.len()),
            (observed.measure.name(), observed.values.len()),
        ])?;

        let warnings = check_height_range(height, KNUDSON_HEIGHT_CM).into_iter().collect();
        let predicted = self.predicted(sex, age, height, &MeasureSpec::Scalar(observed.measure))?;
        let pct = percent_of_predicted(&observed.values, &predicted);

        Ok(PctPredicted {
            measure: observed.measure,
            predicted,
            pct,
            warnings,
        })
    }

    /// Percent of predicted from named measure arguments (exactly one set).
    pub fn pct_predicted_named(
        &self,
        sex: &[Option<i64>],
        age: &[Option<f64>],
        height: &[Option<f64>],
        observations: KnudsonObservations,
    ) -> Result<PctPredicted<KnudsonMeasure>, SpiroError> {
        let observed = observations.into_observed()?;
        self.pct_predicted(sex, age, height, &observed)
    }

    fn predict_one(
        &self,
        measure: KnudsonMeasure,
        sex: Option<i64>,
        age: Option<f64>,
        height: Option<f64>,
    ) -> Option<f64> {
        let sex = KnudsonSex::from_code(sex?)?;
        let age = finite(age)?;
        let height = finite(height)?;
        let age_lb = age_band(sex, age)?;

        let row = self.table.get(&KnudsonKey { measure, sex, age_lb })?;
        finite(Some(row.evaluate(age, height)))
    }
}

/// Lower bound of the age stratum, or `None` below age 6.
pub fn age_band(sex: KnudsonSex, age: f64) -> Option<u8> {
    let bands: [u8; 3] = match sex {
        KnudsonSex::Male => [6, 12, 25],
        KnudsonSex::Female => [6, 11, 20],
    };
    bands.into_iter().rev().find(|lb| age >= f64::from(*lb))
}
