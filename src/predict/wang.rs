//! Wang (1993) predictor.
//!
//! `predicted = exp(alpha) * height^beta` (height in metres), with coefficients
//! chosen by measure, sex, race and completed year of age (6..=18).
//!
//! In adult mode ages of 19 and above reuse the 18-year-old coefficients;
//! otherwise they fall outside the table and yield `None`.

use rayon::prelude::*;

use super::{PctPredicted, WANG_HEIGHT_M, check_height_range, ensure_equal_lengths, finite, percent_of_predicted};
use crate::domain::{Measure, MeasureSpec, Observed, Race, WangMeasure, WangObservations, WangSex};
use crate::error::SpiroError;
use crate::tables::wang::{self as table, MAX_AGE};
use crate::tables::{WangKey, WangTable};

/// Age from which adult mode clamps to the last published year.
const ADULT_AGE: f64 = 19.0;

/// Wang evaluator over a coefficient table.
#[derive(Debug, Clone, Copy)]
pub struct Wang<'t> {
    table: &'t WangTable,
    adult_mode: bool,
}

impl Wang<'static> {
    /// Evaluator over the compiled-in table (adult mode off).
    pub fn builtin() -> Result<Self, SpiroError> {
        Ok(Self::new(table::builtin()?))
    }
}

impl<'t> Wang<'t> {
    pub fn new(table: &'t WangTable) -> Self {
        Self {
            table,
            adult_mode: false,
        }
    }

    /// Clamp ages ≥ 19 to 18 before stratification.
    pub fn with_adult_mode(mut self, adult_mode: bool) -> Self {
        self.adult_mode = adult_mode;
        self
    }

    pub fn adult_mode(&self) -> bool {
        self.adult_mode
    }

    pub fn table(&self) -> &'t WangTable {
        self.table
    }

    /// Predicted values, one per element.
    ///
    /// `sex` must be `"m"`, `"f"` or missing; anything else fails the call.
    /// Unrecognised `race` labels only miss the lookup.
    pub fn predicted<S, R>(
        &self,
        sex: &[Option<S>],
        age: &[Option<f64>],
        race: &[Option<R>],
        height: &[Option<f64>],
        measure: &MeasureSpec<WangMeasure>,
    ) -> Result<Vec<Option<f64>>, SpiroError>
    where
        S: AsRef<str>,
        R: AsRef<str> + Sync,
    {
        let n = ensure_equal_lengths(&[
            ("sex", sex.len()),
            ("age", age.len()),
            ("race", race.len()),
            ("height", height.len()),
        ])?;
        let measure = measure.resolve(n)?;
        let sex = parse_sexes(sex)?;

        Ok((0..n)
            .into_par_iter()
            .map(|i| {
                let race = race[i].as_ref().and_then(|r| Race::parse(r.as_ref()));
                self.predict_one(measure, sex[i], age[i], race, height[i])
            })
            .collect())
    }

    /// Percent of predicted for exactly one observed measure.
    pub fn pct_predicted<S, R>(
        &self,
        sex: &[Option<S>],
        race: &[Option<R>],
        age: &[Option<f64>],
        height: &[Option<f64>],
        observed: &Observed<WangMeasure>,
    ) -> Result<PctPredicted<WangMeasure>, SpiroError>
    where
        S: AsRef<str>,
        R: AsRef<str> + Sync,
    {
        ensure_equal_lengths(&[
            ("sex", sex.len()),
            ("race", race.len()),
            ("age", age.len()),
            ("height", height.len()),
            (observed.measure.name(), observed.values.len()),
        ])?;

        let predicted = self.predicted(sex, age, race, height, &MeasureSpec::Scalar(observed.measure))?;
        let warnings = check_height_range(height, WANG_HEIGHT_M).into_iter().collect();
        let pct = percent_of_predicted(&observed.values, &predicted);

        Ok(PctPredicted {
            measure: observed.measure,
            predicted,
            pct,
            warnings,
        })
    }

    /// Percent of predicted from named measure arguments (exactly one set).
    pub fn pct_predicted_named<S, R>(
        &self,
        sex: &[Option<S>],
        race: &[Option<R>],
        age: &[Option<f64>],
        height: &[Option<f64>],
        observations: WangObservations,
    ) -> Result<PctPredicted<WangMeasure>, SpiroError>
    where
        S: AsRef<str>,
        R: AsRef<str> + Sync,
    {
        let observed = observations.into_observed()?;
        self.pct_predicted(sex, race, age, height, &observed)
    }

    fn predict_one(
        &self,
        measure: WangMeasure,
        sex: Option<WangSex>,
        age: Option<f64>,
        race: Option<Race>,
        height: Option<f64>,
    ) -> Option<f64> {
        let sex = sex?;
        let race = race?;
        let height = finite(height)?;
        let age_lb = age_band(finite(age)?, self.adult_mode)?;

        let row = self.table.get(&WangKey {
            measure,
            sex,
            race,
            age_lb,
        })?;
        finite(Some(row.evaluate(height)))
    }
}

/// Completed year of age used as the lookup key.
///
/// Negative ages and ages beyond the `u8` range have no stratum.
pub fn age_band(age: f64, adult_mode: bool) -> Option<u8> {
    let age = if adult_mode && age >= ADULT_AGE {
        f64::from(MAX_AGE)
    } else {
        age
    };
    let year = age.floor();
    if !(0.0..=f64::from(u8::MAX)).contains(&year) {
        return None;
    }
    Some(year as u8)
}

/// Validate the sex column up front; a single bad code fails the call.
fn parse_sexes<S: AsRef<str>>(sex: &[Option<S>]) -> Result<Vec<Option<WangSex>>, SpiroError> {
    sex.iter()
        .enumerate()
        .map(|(index, s)| match s {
            None => Ok(None),
            Some(s) => WangSex::parse(s.as_ref()).map(Some).ok_or_else(|| SpiroError::InvalidWangSex {
                index,
                value: s.as_ref().to_string(),
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wang() -> Wang<'static> {
        Wang::builtin().unwrap()
    }

    #[test]
    fn age_band_floors_and_clamps() {
        assert_eq!(age_band(10.99, false), Some(10));
        assert_eq!(age_band(18.7, false), Some(18));
        assert_eq!(age_band(40.0, false), Some(40));
        assert_eq!(age_band(40.0, true), Some(18));
        assert_eq!(age_band(18.5, true), Some(18));
        assert_eq!(age_band(-1.0, false), None);
    }

    #[test]
    fn reproduces_closed_form_for_table_row() {
        let w = wang();
        let key = WangKey {
            measure: WangMeasure::Fvc,
            sex: WangSex::Female,
            race: Race::Black,
            age_lb: 12,
        };
        let row = w.table().get(&key).unwrap().clone();
        let out = w
            .predicted(&[Some("f")], &[Some(12.4)], &[Some("black")], &[Some(1.52)], &WangMeasure::Fvc.into())
            .unwrap();
        let expected = row.alpha.exp() * 1.52_f64.powf(row.beta);
        assert_eq!(out[0], Some(expected));
    }

    #[test]
    fn invalid_sex_fails_whole_call() {
        let err = wang()
            .predicted(
                &[Some("m"), Some("male")],
                &[Some(10.0), Some(10.0)],
                &[Some("white"), Some("white")],
                &[Some(1.4), Some(1.4)],
                &WangMeasure::Fev.into(),
            )
            .unwrap_err();
        assert_eq!(
            err,
            SpiroError::InvalidWangSex {
                index: 1,
                value: "male".to_string()
            }
        );
    }

    #[test]
    fn missing_sex_and_unknown_race_are_missing() {
        let out = wang()
            .predicted(
                &[None, Some("m"), Some("m")],
                &[Some(10.0), Some(10.0), Some(5.0)],
                &[Some("white"), Some("asian"), Some("white")],
                &[Some(1.4), Some(1.4), Some(1.1)],
                &WangMeasure::Fev.into(),
            )
            .unwrap();
        assert_eq!(out, vec![None, None, None]);
    }

    #[test]
    fn fef2575_gap_at_six_and_seven() {
        let w = wang();
        for sex in ["m", "f"] {
            for race in ["white", "black"] {
                let out = w
                    .predicted(
                        &[Some(sex); 3],
                        &[Some(6.2), Some(7.9), Some(8.0)],
                        &[Some(race); 3],
                        &[Some(1.2), Some(1.25), Some(1.3)],
                        &WangMeasure::Fef2575.into(),
                    )
                    .unwrap();
                assert_eq!(out[0], None, "{sex}/{race} age 6");
                assert_eq!(out[1], None, "{sex}/{race} age 7");
                assert!(out[2].is_some(), "{sex}/{race} age 8");
            }
        }
    }

    #[test]
    fn adult_mode_reuses_age_eighteen() {
        let args = |age: f64| (vec![Some("m")], vec![Some(age)], vec![Some("white")], vec![Some(1.8)]);

        let (sex, age, race, height) = args(40.0);
        let adult = wang()
            .with_adult_mode(true)
            .predicted(&sex, &age, &race, &height, &WangMeasure::Fev.into())
            .unwrap();
        let plain = wang()
            .predicted(&sex, &age, &race, &height, &WangMeasure::Fev.into())
            .unwrap();

        let (sex, age, race, height) = args(18.0);
        let eighteen = wang()
            .predicted(&sex, &age, &race, &height, &WangMeasure::Fev.into())
            .unwrap();

        assert!(adult[0].is_some());
        assert_eq!(adult, eighteen);
        assert_eq!(plain, vec![None]);
    }

    #[test]
    fn pct_uses_single_observed_measure() {
        let observations = WangObservations {
            fev_fvc: Some(vec![Some(0.85)]),
            ..Default::default()
        };
        let out = wang()
            .pct_predicted_named(&[Some("f")], &[Some("white")], &[Some(11.0)], &[Some(1.45)], observations)
            .unwrap();
        assert_eq!(out.measure, WangMeasure::FevFvc);
        let predicted = out.predicted[0].unwrap();
        assert!((out.pct[0].unwrap() - 0.85 / predicted * 100.0).abs() < 1e-9);
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn centimetre_heights_warn_but_compute() {
        let observed = Observed::new(WangMeasure::Fev, vec![Some(2.0)]);
        let out = wang()
            .pct_predicted(&[Some("m")], &[Some("white")], &[Some(10.0)], &[Some(140.0)], &observed)
            .unwrap();
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.warnings[0].range.unit, "m");
        assert!(out.pct[0].is_some());
    }

    #[test]
    fn pct_rejects_invalid_sex_before_evaluating() {
        let observed = Observed::new(WangMeasure::Fev, vec![Some(2.0)]);
        let err = wang()
            .pct_predicted(&[Some("x")], &[Some("white")], &[Some(10.0)], &[Some(1.4)], &observed)
            .unwrap_err();
        assert!(matches!(err, SpiroError::InvalidWangSex { index: 0, .. }));
    }

    #[test]
    fn pct_without_measure_is_usage_error() {
        let err = wang()
            .pct_predicted_named(
                &[Some("m")],
                &[Some("white")],
                &[Some(10.0)],
                &[Some(1.4)],
                WangObservations::default(),
            )
            .unwrap_err();
        assert_eq!(err, SpiroError::NoObservedMeasure);
    }
}
