//! Wang et al. (1993) coefficient table.
//!
//! Wang X, Dockery DW, Wypij D, Fay ME, Ferris BG. "Pulmonary function between
//! 6 and 18 years of age." *Pediatr Pulmonol* 1993;15:75-88.
//!
//! Each row gives `ln(predicted) = alpha + beta * ln(height)` with height in
//! metres, for one (measure, sex, race, single year of age 6..=18). FEF25-75 was
//! not fitted for ages 6 and 7, so those cells are absent for every sex/race.
//!
//! The literal values below are hand transcriptions. A corrected table can be
//! supplied at runtime with `--wang-table` without recompiling.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use super::{CoefficientTable, KeyedRow, ensure_finite};
use crate::domain::{Race, WangMeasure, WangSex};
use crate::error::SpiroError;

pub type WangTable = CoefficientTable<WangRow>;

/// Oldest age covered by the published table.
pub const MAX_AGE: u8 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WangKey {
    pub measure: WangMeasure,
    pub sex: WangSex,
    pub race: Race,
    pub age_lb: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WangRow {
    pub measure: WangMeasure,
    pub race: Race,
    pub sex: WangSex,
    pub age_lb: u8,
    pub alpha: f64,
    pub beta: f64,
}

impl KeyedRow for WangRow {
    type Key = WangKey;

    fn key(&self) -> WangKey {
        WangKey {
            measure: self.measure,
            sex: self.sex,
            race: self.race,
            age_lb: self.age_lb,
        }
    }

    fn validate(&self) -> Result<(), SpiroError> {
        ensure_finite("Wang", self.key(), &[("alpha", self.alpha), ("beta", self.beta)])
    }
}

impl WangRow {
    pub fn evaluate(&self, height: f64) -> f64 {
        self.alpha.exp() * height.powf(self.beta)
    }
}

/// The compiled-in table, indexed on first use.
pub fn builtin() -> Result<&'static WangTable, SpiroError> {
    static TABLE: LazyLock<Result<WangTable, SpiroError>> =
        LazyLock::new(|| CoefficientTable::from_rows(expand(WANG_SERIES)));
    TABLE.as_ref().map_err(Clone::clone)
}

/// One published column: consecutive ages starting at `first_age`.
struct Series {
    measure: WangMeasure,
    sex: WangSex,
    race: Race,
    first_age: u8,
    coefs: &'static [(f64, f64)],
}

fn expand(series: &[Series]) -> Vec<WangRow> {
    series
        .iter()
        .flat_map(|s| {
            s.coefs.iter().zip(s.first_age..).map(|(&(alpha, beta), age_lb)| WangRow {
                measure: s.measure,
                race: s.race,
                sex: s.sex,
                age_lb,
                alpha,
                beta,
            })
        })
        .collect()
}

use Race::{Black, White};
use WangMeasure::{Fef2575, Fev, FevFvc, Fvc};
use WangSex::{Female, Male};

#[rustfmt::skip]
const WANG_SERIES: &[Series] = &[
    // White males
    Series { measure: Fev, sex: Male, race: White, first_age: 6, coefs: &[
        (-0.109, 2.252), (-0.104, 2.270), (-0.089, 2.257), (-0.063, 2.197), (-0.057, 2.212),
        (-0.093, 2.279), (-0.161, 2.431), (-0.264, 2.727), (-0.252, 2.777), (-0.145, 2.576),
        (-0.017, 2.350), ( 0.097, 2.175), ( 0.178, 2.095),
    ]},
    Series { measure: Fvc, sex: Male, race: White, first_age: 6, coefs: &[
        (-0.024, 2.470), (-0.018, 2.489), ( 0.005, 2.443), ( 0.017, 2.426), ( 0.030, 2.407),
        ( 0.009, 2.468), (-0.061, 2.637), (-0.175, 2.884), (-0.219, 2.917), (-0.079, 2.698),
        ( 0.104, 2.405), ( 0.197, 2.237), ( 0.267, 2.149),
    ]},
    Series { measure: FevFvc, sex: Male, race: White, first_age: 6, coefs: &[
        (-0.078, -0.248), (-0.086, -0.220), (-0.091, -0.188), (-0.086, -0.168), (-0.091, -0.161),
        (-0.101, -0.177), (-0.106, -0.135), (-0.107, -0.132), (-0.111, -0.112), (-0.106, -0.110),
        (-0.114, -0.080), (-0.126, -0.051), (-0.103, -0.071),
    ]},
    Series { measure: Fef2575, sex: Male, race: White, first_age: 8, coefs: &[
        ( 0.154, 1.855), ( 0.209, 1.718), ( 0.244, 1.641), ( 0.160, 1.878), ( 0.002, 2.245),
        (-0.113, 2.483), (-0.059, 2.288), ( 0.082, 2.037), ( 0.237, 1.749), ( 0.356, 1.532),
        ( 0.398, 1.480),
    ]},
    // Black males
    Series { measure: Fev, sex: Male, race: Black, first_age: 6, coefs: &[
        (-0.166, 2.341), (-0.197, 2.373), (-0.174, 2.312), (-0.159, 2.265), (-0.158, 2.261),
        (-0.186, 2.303), (-0.250, 2.512), (-0.362, 2.777), (-0.336, 2.686), (-0.249, 2.501),
        (-0.136, 2.292), (-0.010, 2.075), ( 0.046, 1.998),
    ]},
    Series { measure: Fvc, sex: Male, race: Black, first_age: 6, coefs: &[
        (-0.088, 2.322), (-0.106, 2.367), (-0.083, 2.322), (-0.068, 2.271), (-0.050, 2.253),
        (-0.073, 2.307), (-0.141, 2.506), (-0.262, 2.777), (-0.270, 2.749), (-0.150, 2.526),
        (-0.010, 2.250), ( 0.097, 2.067), ( 0.140, 1.995),
    ]},
    Series { measure: FevFvc, sex: Male, race: Black, first_age: 6, coefs: &[
        (-0.075, -0.001), (-0.089,  0.002), (-0.091, -0.005), (-0.091, -0.010), (-0.106,  0.006),
        (-0.112, -0.004), (-0.108,  0.001), (-0.103, -0.004), (-0.066, -0.072), (-0.099, -0.035),
        (-0.127,  0.040), (-0.107,  0.007), (-0.094,  0.003),
    ]},
    Series { measure: Fef2575, sex: Male, race: Black, first_age: 8, coefs: &[
        ( 0.049, 1.934), ( 0.073, 1.835), ( 0.093, 1.806), ( 0.048, 1.921), (-0.073, 2.184),
        (-0.191, 2.437), (-0.144, 2.319), ( 0.010, 2.058), ( 0.160, 1.786), ( 0.259, 1.596),
        ( 0.308, 1.520),
    ]},
    // White females
    Series { measure: Fev, sex: Female, race: White, first_age: 6, coefs: &[
        (-0.097, 2.193), (-0.108, 2.261), (-0.100, 2.253), (-0.094, 2.237), (-0.093, 2.234),
        (-0.119, 2.307), (-0.149, 2.392), (-0.123, 2.303), (-0.056, 2.161), ( 0.014, 2.026),
        ( 0.056, 1.939), ( 0.077, 1.889), ( 0.092, 1.860),
    ]},
    Series { measure: Fvc, sex: Female, race: White, first_age: 6, coefs: &[
        (-0.031, 2.313), (-0.038, 2.359), (-0.029, 2.340), (-0.018, 2.304), (-0.012, 2.287),
        (-0.032, 2.345), (-0.055, 2.404), (-0.021, 2.306), ( 0.050, 2.148), ( 0.117, 2.015),
        ( 0.158, 1.931), ( 0.178, 1.883), ( 0.192, 1.851),
    ]},
    Series { measure: FevFvc, sex: Female, race: White, first_age: 6, coefs: &[
        (-0.068, -0.119), (-0.070, -0.098), (-0.071, -0.087), (-0.076, -0.067), (-0.081, -0.053),
        (-0.087, -0.038), (-0.094, -0.012), (-0.098, -0.003), (-0.106,  0.013), (-0.103,  0.011),
        (-0.102,  0.008), (-0.101,  0.006), (-0.100,  0.009),
    ]},
    Series { measure: Fef2575, sex: Female, race: White, first_age: 8, coefs: &[
        ( 0.091, 1.935), ( 0.083, 1.907), ( 0.089, 1.854), ( 0.077, 1.880), ( 0.052, 1.931),
        ( 0.101, 1.812), ( 0.184, 1.631), ( 0.254, 1.488), ( 0.290, 1.405), ( 0.307, 1.362),
        ( 0.321, 1.331),
    ]},
    // Black females
    Series { measure: Fev, sex: Female, race: Black, first_age: 6, coefs: &[
        (-0.218, 2.292), (-0.213, 2.286), (-0.201, 2.255), (-0.193, 2.237), (-0.190, 2.236),
        (-0.213, 2.302), (-0.245, 2.393), (-0.224, 2.321), (-0.158, 2.182), (-0.093, 2.054),
        (-0.052, 1.974), (-0.033, 1.928), (-0.021, 1.902),
    ]},
    Series { measure: Fvc, sex: Female, race: Black, first_age: 6, coefs: &[
        (-0.143, 2.343), (-0.137, 2.343), (-0.125, 2.318), (-0.116, 2.299), (-0.110, 2.289),
        (-0.131, 2.350), (-0.160, 2.430), (-0.135, 2.351), (-0.068, 2.206), (-0.004, 2.076),
        ( 0.036, 1.995), ( 0.055, 1.948), ( 0.067, 1.920),
    ]},
    Series { measure: FevFvc, sex: Female, race: Black, first_age: 6, coefs: &[
        (-0.075, -0.051), (-0.076, -0.057), (-0.076, -0.063), (-0.077, -0.062), (-0.080, -0.053),
        (-0.082, -0.048), (-0.085, -0.037), (-0.089, -0.030), (-0.090, -0.024), (-0.089, -0.022),
        (-0.088, -0.021), (-0.088, -0.020), (-0.088, -0.018),
    ]},
    Series { measure: Fef2575, sex: Female, race: Black, first_age: 8, coefs: &[
        (-0.037, 1.905), (-0.033, 1.880), (-0.027, 1.850), (-0.040, 1.885), (-0.064, 1.944),
        (-0.014, 1.825), ( 0.069, 1.648), ( 0.138, 1.509), ( 0.175, 1.429), ( 0.192, 1.388),
        ( 0.204, 1.359),
    ]},
];
