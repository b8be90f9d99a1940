//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory as coefficient-table keys
//! - parsed from CLI flags and subject CSVs
//! - exported alongside computed results

use std::fmt;
use std::hash::Hash;
use std::path::PathBuf;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::SpiroError;

/// Which reference-equation family to evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Reference {
    /// Knudson et al. (1983): linear in height (cm), age and age².
    Knudson,
    /// Wang et al. (1993): `exp(alpha) * height^beta`, height in metres, ages 6–18.
    Wang,
}

impl Reference {
    pub fn display_name(self) -> &'static str {
        match self {
            Reference::Knudson => "Knudson 1983",
            Reference::Wang => "Wang 1993",
        }
    }
}

/// Sex coding used by the Knudson equations (`1` = male, `2` = female).
///
/// Any other integer code is not an error: it simply has no stratum, so the
/// prediction for that element is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum KnudsonSex {
    Male = 1,
    Female = 2,
}

impl KnudsonSex {
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(KnudsonSex::Male),
            2 => Some(KnudsonSex::Female),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for KnudsonSex {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        KnudsonSex::from_code(i64::from(value)).ok_or_else(|| format!("invalid Knudson sex code {value} (expected 1 or 2)"))
    }
}

impl From<KnudsonSex> for u8 {
    fn from(value: KnudsonSex) -> Self {
        value.code()
    }
}

/// Sex coding used by the Wang equations (`"m"` / `"f"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WangSex {
    #[serde(rename = "m")]
    Male,
    #[serde(rename = "f")]
    Female,
}

impl WangSex {
    /// Parse the exact codes `"m"` / `"f"` (surrounding whitespace ignored).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "m" => Some(WangSex::Male),
            "f" => Some(WangSex::Female),
            _ => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            WangSex::Male => "m",
            WangSex::Female => "f",
        }
    }
}

/// Race strata published by Wang et al.
///
/// Other race labels are accepted by the predictors but never match a table
/// row, so they produce missing predictions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Race {
    White,
    Black,
}

impl Race {
    /// Case-insensitive match on `"white"` / `"black"`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("white") {
            Some(Race::White)
        } else if s.eq_ignore_ascii_case("black") {
            Some(Race::Black)
        } else {
            None
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Race::White => "white",
            Race::Black => "black",
        }
    }
}

/// Common behaviour of the per-reference measure enums.
pub trait Measure: Copy + Eq + Hash + fmt::Debug + fmt::Display + Send + Sync + 'static {
    /// Reference family label used in error messages.
    const REFERENCE: &'static str;
    /// Every supported measure, in canonical order.
    const ALL: &'static [Self];

    fn name(self) -> &'static str;

    fn parse(s: &str) -> Result<Self, SpiroError> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| SpiroError::UnknownMeasure {
                reference: Self::REFERENCE,
                value: s.to_string(),
                expected: Self::expected(),
            })
    }

    fn expected() -> &'static str;
}

/// Spirometry measures covered by Knudson (1983).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnudsonMeasure {
    /// FEV1 (L).
    Fev,
    /// FVC (L).
    Fvc,
    /// FEF25-75 (L/s).
    Fef2575,
    /// Maximal flow at 50% of FVC (L/s).
    Vmax50,
    /// Maximal flow at 75% of FVC expired (L/s).
    Vmax75,
}

impl Measure for KnudsonMeasure {
    const REFERENCE: &'static str = "Knudson";
    const ALL: &'static [Self] = &[
        KnudsonMeasure::Fev,
        KnudsonMeasure::Fvc,
        KnudsonMeasure::Fef2575,
        KnudsonMeasure::Vmax50,
        KnudsonMeasure::Vmax75,
    ];

    fn name(self) -> &'static str {
        match self {
            KnudsonMeasure::Fev => "fev",
            KnudsonMeasure::Fvc => "fvc",
            KnudsonMeasure::Fef2575 => "fef2575",
            KnudsonMeasure::Vmax50 => "vmax50",
            KnudsonMeasure::Vmax75 => "vmax75",
        }
    }

    fn expected() -> &'static str {
        "fev, fvc, fef2575, vmax50, vmax75"
    }
}

/// Spirometry measures covered by Wang (1993).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WangMeasure {
    /// FEV1 (L).
    Fev,
    /// FVC (L).
    Fvc,
    /// FEV1/FVC ratio.
    FevFvc,
    /// FEF25-75 (L/s). Not fitted for ages 6 and 7.
    Fef2575,
}

impl Measure for WangMeasure {
    const REFERENCE: &'static str = "Wang";
    const ALL: &'static [Self] = &[
        WangMeasure::Fev,
        WangMeasure::Fvc,
        WangMeasure::FevFvc,
        WangMeasure::Fef2575,
    ];

    fn name(self) -> &'static str {
        match self {
            WangMeasure::Fev => "fev",
            WangMeasure::Fvc => "fvc",
            WangMeasure::FevFvc => "fev_fvc",
            WangMeasure::Fef2575 => "fef2575",
        }
    }

    fn expected() -> &'static str {
        "fev, fvc, fev_fvc, fef2575"
    }
}

impl fmt::Display for KnudsonMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Display for WangMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for KnudsonMeasure {
    type Err = SpiroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as Measure>::parse(s)
    }
}

impl FromStr for WangMeasure {
    type Err = SpiroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <Self as Measure>::parse(s)
    }
}

/// The `measure` argument of a batch call.
///
/// Either one measure for every element, or a per-element vector that must
/// repeat a single value. Mixed batches are rejected before evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum MeasureSpec<M> {
    Scalar(M),
    PerElement(Vec<M>),
}

impl<M: Measure> MeasureSpec<M> {
    /// Parse measure names; a single name becomes `Scalar`.
    pub fn parse<S: AsRef<str>>(values: &[S]) -> Result<Self, SpiroError> {
        let parsed = values
            .iter()
            .map(|s| M::parse(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        match parsed.as_slice() {
            [single] => Ok(MeasureSpec::Scalar(*single)),
            _ => Ok(MeasureSpec::PerElement(parsed)),
        }
    }

    /// Resolve to the single measure for a batch of `n` elements.
    pub fn resolve(&self, n: usize) -> Result<M, SpiroError> {
        match self {
            MeasureSpec::Scalar(m) => Ok(*m),
            MeasureSpec::PerElement(ms) => {
                let Some(&first) = ms.first() else {
                    return Err(SpiroError::MeasureLength { got: 0, expected: n });
                };
                if ms.len() != 1 && ms.len() != n {
                    return Err(SpiroError::MeasureLength {
                        got: ms.len(),
                        expected: n,
                    });
                }
                if let Some(other) = ms.iter().find(|m| **m != first) {
                    return Err(SpiroError::MixedMeasures {
                        first: first.to_string(),
                        other: other.to_string(),
                    });
                }
                Ok(first)
            }
        }
    }
}

impl<M> From<M> for MeasureSpec<M> {
    fn from(value: M) -> Self {
        MeasureSpec::Scalar(value)
    }
}

/// Observed values for exactly one measure (percent-of-predicted input).
#[derive(Debug, Clone, PartialEq)]
pub struct Observed<M> {
    pub measure: M,
    pub values: Vec<Option<f64>>,
}

impl<M> Observed<M> {
    pub fn new(measure: M, values: Vec<Option<f64>>) -> Self {
        Self { measure, values }
    }
}

/// Named observed-measure arguments for the Knudson percent-of-predicted call.
///
/// Exactly one field may be set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KnudsonObservations {
    pub fev: Option<Vec<Option<f64>>>,
    pub fvc: Option<Vec<Option<f64>>>,
    pub fef2575: Option<Vec<Option<f64>>>,
    pub vmax50: Option<Vec<Option<f64>>>,
    pub vmax75: Option<Vec<Option<f64>>>,
}

impl KnudsonObservations {
    pub fn into_observed(self) -> Result<Observed<KnudsonMeasure>, SpiroError> {
        select_single(vec![
            (KnudsonMeasure::Fev, self.fev),
            (KnudsonMeasure::Fvc, self.fvc),
            (KnudsonMeasure::Fef2575, self.fef2575),
            (KnudsonMeasure::Vmax50, self.vmax50),
            (KnudsonMeasure::Vmax75, self.vmax75),
        ])
    }
}

/// Named observed-measure arguments for the Wang percent-of-predicted call.
///
/// Exactly one field may be set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WangObservations {
    pub fev: Option<Vec<Option<f64>>>,
    pub fvc: Option<Vec<Option<f64>>>,
    pub fev_fvc: Option<Vec<Option<f64>>>,
    pub fef2575: Option<Vec<Option<f64>>>,
}

impl WangObservations {
    pub fn into_observed(self) -> Result<Observed<WangMeasure>, SpiroError> {
        select_single(vec![
            (WangMeasure::Fev, self.fev),
            (WangMeasure::Fvc, self.fvc),
            (WangMeasure::FevFvc, self.fev_fvc),
            (WangMeasure::Fef2575, self.fef2575),
        ])
    }
}

/// Pick the one supplied measure out of a list of named candidates.
pub fn select_single<M: Measure>(candidates: Vec<(M, Option<Vec<Option<f64>>>)>) -> Result<Observed<M>, SpiroError> {
    let mut supplied: Vec<(M, Vec<Option<f64>>)> = candidates
        .into_iter()
        .filter_map(|(m, values)| values.map(|v| (m, v)))
        .collect();

    match supplied.len() {
        0 => Err(SpiroError::NoObservedMeasure),
        1 => {
            let (measure, values) = supplied.remove(0);
            Ok(Observed { measure, values })
        }
        _ => Err(SpiroError::MultipleObservedMeasures {
            supplied: supplied.iter().map(|(m, _)| m.name()).collect(),
        }),
    }
}

/// A per-subject evaluated result (used for reports and exports).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubjectResult {
    pub id: String,
    pub sex: Option<String>,
    pub age: Option<f64>,
    pub height: Option<f64>,
    pub race: Option<String>,
    pub measure: String,
    pub predicted: Option<f64>,
    pub observed: Option<f64>,
    pub pct_predicted: Option<f64>,
}

/// Where coefficient tables come from (built-in unless a CSV path is set).
#[derive(Debug, Clone, Default)]
pub struct TableSources {
    pub knudson: Option<PathBuf>,
    pub wang: Option<PathBuf>,
}

/// A `spiro batch` run as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub reference: Reference,
    pub input: PathBuf,
    pub measure: Option<String>,
    pub adult_mode: bool,
    pub tables: TableSources,

    pub print_rows: bool,
    pub export_results: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measure_parse_is_case_insensitive() {
        assert_eq!("FEV".parse::<KnudsonMeasure>().unwrap(), KnudsonMeasure::Fev);
        assert_eq!("fev_fvc".parse::<WangMeasure>().unwrap(), WangMeasure::FevFvc);
    }

    #[test]
    fn unknown_measure_is_rejected_per_reference() {
        // vmax50 is a Knudson measure only.
        let err = "vmax50".parse::<WangMeasure>().unwrap_err();
        assert!(matches!(err, SpiroError::UnknownMeasure { reference: "Wang", .. }));
        assert!("fev_fvc".parse::<KnudsonMeasure>().is_err());
    }

    #[test]
    fn uniform_vector_resolves() {
        let spec = MeasureSpec::PerElement(vec![KnudsonMeasure::Fvc; 3]);
        assert_eq!(spec.resolve(3).unwrap(), KnudsonMeasure::Fvc);
    }

    #[test]
    fn mixed_vector_fails_fast() {
        let spec = MeasureSpec::PerElement(vec![KnudsonMeasure::Fev, KnudsonMeasure::Fvc]);
        assert!(matches!(spec.resolve(2), Err(SpiroError::MixedMeasures { .. })));
    }

    #[test]
    fn measure_vector_length_must_match() {
        let spec = MeasureSpec::PerElement(vec![WangMeasure::Fev; 2]);
        assert_eq!(
            spec.resolve(3),
            Err(SpiroError::MeasureLength { got: 2, expected: 3 })
        );
        // A single-element vector broadcasts.
        let spec = MeasureSpec::PerElement(vec![WangMeasure::Fev]);
        assert_eq!(spec.resolve(3), Ok(WangMeasure::Fev));
    }

    #[test]
    fn named_observations_require_exactly_one() {
        assert_eq!(
            KnudsonObservations::default().into_observed(),
            Err(SpiroError::NoObservedMeasure)
        );

        let two = WangObservations {
            fev: Some(vec![Some(2.0)]),
            fvc: Some(vec![Some(2.5)]),
            ..Default::default()
        };
        assert_eq!(
            two.into_observed(),
            Err(SpiroError::MultipleObservedMeasures {
                supplied: vec!["fev", "fvc"]
            })
        );

        let one = KnudsonObservations {
            vmax75: Some(vec![Some(1.1), None]),
            ..Default::default()
        };
        let observed = one.into_observed().unwrap();
        assert_eq!(observed.measure, KnudsonMeasure::Vmax75);
        assert_eq!(observed.values, vec![Some(1.1), None]);
    }

    #[test]
    fn sex_codes() {
        assert_eq!(KnudsonSex::from_code(1), Some(KnudsonSex::Male));
        assert_eq!(KnudsonSex::from_code(3), None);
        assert_eq!(WangSex::parse(" f "), Some(WangSex::Female));
        assert_eq!(WangSex::parse("F"), None);
        assert_eq!(Race::parse("Black"), Some(Race::Black));
        assert_eq!(Race::parse("asian"), None);
    }
}
