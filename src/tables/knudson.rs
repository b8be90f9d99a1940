//! Knudson et al. (1983) coefficient table.
//!
//! Knudson RJ, Lebowitz MD, Holberg CJ, Burrows B. "Changes in the normal
//! maximal expiratory flow-volume curve with growth and aging."
//! *Am Rev Respir Dis* 1983;127:725-734.
//!
//! Each row gives `predicted = const + height*h + age*a + age_sq*a²` with height
//! in centimetres and age in years, for one (measure, sex, age stratum).
//! Strata are keyed by their lower age bound: males 6 / 12 / 25, females
//! 6 / 11 / 20. None of the published strata use a quadratic age term, so
//! `coef_age_sq` is zero throughout; the column is kept so loaded tables can
//! carry one.
//!
//! The literal values below are hand transcriptions. A corrected table can be
//! supplied at runtime with `--knudson-table` without recompiling.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use super::{CoefficientTable, KeyedRow, ensure_finite};
use crate::domain::{KnudsonMeasure, KnudsonSex};
use crate::error::SpiroError;

pub type KnudsonTable = CoefficientTable<KnudsonRow>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KnudsonKey {
    pub measure: KnudsonMeasure,
    pub sex: KnudsonSex,
    pub age_lb: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnudsonRow {
    pub measure: KnudsonMeasure,
    pub sex: KnudsonSex,
    pub age_lb: u8,
    pub coef_const: f64,
    pub coef_height: f64,
    pub coef_age: f64,
    pub coef_age_sq: f64,
}

impl KeyedRow for KnudsonRow {
    type Key = KnudsonKey;

    fn key(&self) -> KnudsonKey {
        KnudsonKey {
            measure: self.measure,
            sex: self.sex,
            age_lb: self.age_lb,
        }
    }

    fn validate(&self) -> Result<(), SpiroError> {
        ensure_finite(
            "Knudson",
            self.key(),
            &[
                ("coef_const", self.coef_const),
                ("coef_height", self.coef_height),
                ("coef_age", self.coef_age),
                ("coef_age_sq", self.coef_age_sq),
            ],
        )
    }
}

impl KnudsonRow {
    /// Evaluate the regression for one subject.
    pub fn evaluate(&self, age: f64, height: f64) -> f64 {
        self.coef_const + self.coef_height * height + self.coef_age * age + self.coef_age_sq * age * age
    }
}

/// The compiled-in table, indexed on first use.
pub fn builtin() -> Result<&'static KnudsonTable, SpiroError> {
    static TABLE: LazyLock<Result<KnudsonTable, SpiroError>> =
        LazyLock::new(|| CoefficientTable::from_rows(KNUDSON_ROWS.iter().map(|r| r.to_row())));
    TABLE.as_ref().map_err(Clone::clone)
}

/// Literal row: (measure, sex, age_lb, const, height, age, age²).
struct Literal(KnudsonMeasure, KnudsonSex, u8, f64, f64, f64, f64);

impl Literal {
    fn to_row(&self) -> KnudsonRow {
        let Literal(measure, sex, age_lb, coef_const, coef_height, coef_age, coef_age_sq) = *self;
        KnudsonRow {
            measure,
            sex,
            age_lb,
            coef_const,
            coef_height,
            coef_age,
            coef_age_sq,
        }
    }
}

use KnudsonMeasure::{Fef2575, Fev, Fvc, Vmax50, Vmax75};
use KnudsonSex::{Female, Male};

#[rustfmt::skip]
const KNUDSON_ROWS: &[Literal] = &[
    // Males 6-11
    Literal(Fev,     Male,    6, -2.8142, 0.0348,  0.0000, 0.0),
    Literal(Fvc,     Male,    6, -3.3756, 0.0409,  0.0000, 0.0),
    Literal(Fef2575, Male,    6, -2.5379, 0.0363,  0.0000, 0.0),
    Literal(Vmax50,  Male,    6, -2.5454, 0.0424,  0.0000, 0.0),
    Literal(Vmax75,  Male,    6, -1.4775, 0.0219,  0.0000, 0.0),
    // Males 12-24
    Literal(Fev,     Male,   12, -6.1181, 0.0519,  0.0636, 0.0),
    Literal(Fvc,     Male,   12, -6.8865, 0.0590,  0.0739, 0.0),
    Literal(Fef2575, Male,   12, -4.8434, 0.0413,  0.1129, 0.0),
    Literal(Vmax50,  Male,   12, -3.5730, 0.0366,  0.1176, 0.0),
    Literal(Vmax75,  Male,   12, -2.1544, 0.0200,  0.0622, 0.0),
    // Males 25+
    Literal(Fev,     Male,   25, -6.5147, 0.0665, -0.0292, 0.0),
    Literal(Fvc,     Male,   25, -8.7818, 0.0844, -0.0298, 0.0),
    Literal(Fef2575, Male,   25,  2.5579, 0.0185, -0.0450, 0.0),
    Literal(Vmax50,  Male,   25,  1.4891, 0.0291, -0.0431, 0.0),
    Literal(Vmax75,  Male,   25,  1.0583, 0.0124, -0.0376, 0.0),
    // Females 6-10
    Literal(Fev,     Female,  6, -2.7578, 0.0336,  0.0000, 0.0),
    Literal(Fvc,     Female,  6, -3.7486, 0.0430,  0.0000, 0.0),
    Literal(Fef2575, Female,  6, -2.8007, 0.0361,  0.0000, 0.0),
    Literal(Vmax50,  Female,  6, -2.5070, 0.0365,  0.0000, 0.0),
    Literal(Vmax75,  Female,  6, -1.3519, 0.0196,  0.0000, 0.0),
    // Females 11-19
    Literal(Fev,     Female, 11, -3.7622, 0.0351,  0.0694, 0.0),
    Literal(Fvc,     Female, 11, -4.4470, 0.0416,  0.0699, 0.0),
    Literal(Fef2575, Female, 11, -2.3040, 0.0279,  0.1060, 0.0),
    Literal(Vmax50,  Female, 11, -2.5640, 0.0290,  0.1233, 0.0),
    Literal(Vmax75,  Female, 11, -1.3398, 0.0145,  0.0640, 0.0),
    // Females 20+
    Literal(Fev,     Female, 20, -1.8210, 0.0332, -0.0190, 0.0),
    Literal(Fvc,     Female, 20, -3.1947, 0.0444, -0.0169, 0.0),
    Literal(Fef2575, Female, 20,  2.6830, 0.0079, -0.0244, 0.0),
    Literal(Vmax50,  Female, 20,  1.7425, 0.0166, -0.0237, 0.0),
    Literal(Vmax75,  Female, 20,  0.9541, 0.0072, -0.0231, 0.0),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_has_every_stratum() {
        let table = builtin().unwrap();
        assert_eq!(table.len(), 30);
        for &measure in <KnudsonMeasure as crate::domain::Measure>::ALL {
            for (sex, bands) in [(Male, [6, 12, 25]), (Female, [6, 11, 20])] {
                for age_lb in bands {
                    let key = KnudsonKey { measure, sex, age_lb };
                    assert!(table.get(&key).is_some(), "missing {key:?}");
                }
            }
        }
    }

    #[test]
    fn duplicate_rows_are_rejected() {
        let row = KNUDSON_ROWS[0].to_row();
        let err = KnudsonTable::from_rows(vec![row.clone(), row]).unwrap_err();
        assert!(matches!(err, SpiroError::DuplicateRow { .. }));
    }

    #[test]
    fn non_finite_coefficients_are_rejected() {
        let mut row = KNUDSON_ROWS[0].to_row();
        row.coef_height = f64::NAN;
        assert!(matches!(
            KnudsonTable::from_rows(vec![row]),
            Err(SpiroError::InvalidTable(_))
        ));
    }

    #[test]
    fn quadratic_term_is_applied() {
        let row = KnudsonRow {
            measure: Fev,
            sex: Male,
            age_lb: 25,
            coef_const: 1.0,
            coef_height: 0.0,
            coef_age: 0.0,
            coef_age_sq: 0.001,
        };
        assert!((row.evaluate(30.0, 170.0) - 1.9).abs() < 1e-12);
    }
}
