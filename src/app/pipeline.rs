//! Shared evaluation pipeline used by every subcommand.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! resolve tables -> pick measure / observed column -> evaluate -> per-subject results
//!
//! The subcommands can then focus on how subjects arrive (flags or CSV) and how
//! results leave (terminal, CSV, JSON).

use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::domain::{
    KnudsonMeasure, KnudsonObservations, Measure, MeasureSpec, Observed, Reference, SubjectResult, TableSources,
    WangMeasure, WangObservations,
};
use crate::error::{AppError, SpiroError};
use crate::io::ingest::{RowNote, SubjectBatch, is_na};
use crate::io::table::load_table;
use crate::predict::{HeightWarning, Knudson, Wang, ensure_equal_lengths};
use crate::tables::{KnudsonTable, WangTable, knudson, wang};

/// What to compute for a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    /// Predicted values only, for these measure names (one, or one per subject).
    Predicted(Vec<String>),
    /// Percent of predicted; exactly one observed column must be present.
    Pct(BTreeMap<String, Vec<Option<f64>>>),
}

/// All computed outputs of one evaluation.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub reference: Reference,
    pub measure: String,
    pub adult_mode: bool,
    pub with_pct: bool,
    pub results: Vec<SubjectResult>,
    pub warnings: Vec<HeightWarning>,
    pub row_notes: Vec<RowNote>,
}

impl RunOutput {
    /// Subjects without a predicted value.
    pub fn n_missing(&self) -> usize {
        self.results.iter().filter(|r| r.predicted.is_none()).count()
    }
}

/// Decide between predicted-only and percent-of-predicted for a CSV batch.
///
/// - `--measure m` with a column named `m` → percent of predicted on that column
/// - `--measure m` without such a column → predicted only
/// - no `--measure`, but a `measure` column → predicted only, per-row measures
/// - otherwise → percent of predicted, exactly one observed column required
pub fn select_for_batch(batch: &SubjectBatch, measure: Option<&str>) -> Selection {
    if let Some(m) = measure {
        let name = m.trim().to_ascii_lowercase();
        return match batch.observed.get(&name) {
            Some(values) => Selection::Pct(BTreeMap::from([(name, values.clone())])),
            None => Selection::Predicted(vec![m.to_string()]),
        };
    }
    if let Some(per_row) = &batch.measure {
        // Blank cells take the measure named on the other rows.
        let named: Vec<&String> = per_row.iter().filter(|m| !is_na(m)).collect();
        return match named.first() {
            Some(first) if named.iter().all(|m| m == first) => Selection::Predicted(vec![first.to_string()]),
            _ => Selection::Predicted(per_row.clone()),
        };
    }
    Selection::Pct(batch.observed.clone())
}

/// Resolve the Knudson table: CSV override or the compiled-in one.
pub fn knudson_table(sources: &TableSources) -> Result<Cow<'static, KnudsonTable>, AppError> {
    match &sources.knudson {
        Some(path) => Ok(Cow::Owned(load_table(path)?)),
        None => Ok(Cow::Borrowed(knudson::builtin()?)),
    }
}

/// Resolve the Wang table: CSV override or the compiled-in one.
pub fn wang_table(sources: &TableSources) -> Result<Cow<'static, WangTable>, AppError> {
    match &sources.wang {
        Some(path) => Ok(Cow::Owned(load_table(path)?)),
        None => Ok(Cow::Borrowed(wang::builtin()?)),
    }
}

/// Evaluate a batch with the chosen reference.
pub fn evaluate(
    batch: &SubjectBatch,
    selection: Selection,
    reference: Reference,
    adult_mode: bool,
    sources: &TableSources,
) -> Result<RunOutput, AppError> {
    if batch.is_empty() {
        return Err(AppError::new(3, "No subjects to evaluate."));
    }
    // Knudson never reads race, so its predictor cannot catch a short race vector.
    ensure_equal_lengths(&[
        ("id", batch.ids.len()),
        ("sex", batch.sex.len()),
        ("age", batch.age.len()),
        ("height", batch.height.len()),
        ("race", batch.race.len()),
    ])?;

    let evaluated = match reference {
        Reference::Knudson => {
            if adult_mode {
                log::warn!("--adult only applies to Wang; ignored for Knudson");
            }
            let table = knudson_table(sources)?;
            evaluate_knudson(batch, selection, &table)?
        }
        Reference::Wang => {
            let table = wang_table(sources)?;
            evaluate_wang(batch, selection, &table, adult_mode)?
        }
    };

    let results = (0..batch.len())
        .map(|i| SubjectResult {
            id: batch.ids[i].clone(),
            sex: batch.sex[i].clone(),
            age: batch.age[i],
            height: batch.height[i],
            race: batch.race[i].clone(),
            measure: evaluated.measure.to_string(),
            predicted: evaluated.predicted[i],
            observed: evaluated.observed.as_ref().and_then(|o| o[i]),
            pct_predicted: evaluated.pct.as_ref().and_then(|p| p[i]),
        })
        .collect();

    Ok(RunOutput {
        reference,
        measure: evaluated.measure.to_string(),
        adult_mode: adult_mode && reference == Reference::Wang,
        with_pct: evaluated.pct.is_some(),
        results,
        warnings: evaluated.warnings,
        row_notes: batch.row_notes.clone(),
    })
}

struct Evaluated {
    measure: &'static str,
    predicted: Vec<Option<f64>>,
    observed: Option<Vec<Option<f64>>>,
    pct: Option<Vec<Option<f64>>>,
    warnings: Vec<HeightWarning>,
}

fn evaluate_knudson(batch: &SubjectBatch, selection: Selection, table: &KnudsonTable) -> Result<Evaluated, AppError> {
    let k = Knudson::new(table);
    let sex: Vec<Option<i64>> = batch
        .sex
        .iter()
        .map(|s| s.as_deref().and_then(parse_knudson_sex))
        .collect();

    match selection {
        Selection::Predicted(names) => {
            let measures = MeasureSpec::<KnudsonMeasure>::parse(&names)?;
            let measure = measures.resolve(batch.len())?;
            let predicted = k.predicted(&sex, &batch.age, &batch.height, &measures)?;
            Ok(predicted_only(measure, predicted))
        }
        Selection::Pct(mut columns) => {
            let observed = KnudsonObservations {
                fev: columns.remove("fev"),
                fvc: columns.remove("fvc"),
                fef2575: columns.remove("fef2575"),
                vmax50: columns.remove("vmax50"),
                vmax75: columns.remove("vmax75"),
            };
            reject_leftover::<KnudsonMeasure>(columns)?;
            let observed = observed.into_observed()?;
            let out = k.pct_predicted(&sex, &batch.age, &batch.height, &observed)?;
            Ok(with_pct(observed, out.predicted, out.pct, out.warnings))
        }
    }
}

fn evaluate_wang(
    batch: &SubjectBatch,
    selection: Selection,
    table: &WangTable,
    adult_mode: bool,
) -> Result<Evaluated, AppError> {
    let w = Wang::new(table).with_adult_mode(adult_mode);

    match selection {
        Selection::Predicted(names) => {
            let measures = MeasureSpec::<WangMeasure>::parse(&names)?;
            let measure = measures.resolve(batch.len())?;
            let predicted = w.predicted(&batch.sex, &batch.age, &batch.race, &batch.height, &measures)?;
            Ok(predicted_only(measure, predicted))
        }
        Selection::Pct(mut columns) => {
            let observed = WangObservations {
                fev: columns.remove("fev"),
                fvc: columns.remove("fvc"),
                fev_fvc: columns.remove("fev_fvc"),
                fef2575: columns.remove("fef2575"),
            };
            reject_leftover::<WangMeasure>(columns)?;
            let observed = observed.into_observed()?;
            let out = w.pct_predicted(&batch.sex, &batch.race, &batch.age, &batch.height, &observed)?;
            Ok(with_pct(observed, out.predicted, out.pct, out.warnings))
        }
    }
}

fn predicted_only<M: Measure>(measure: M, predicted: Vec<Option<f64>>) -> Evaluated {
    Evaluated {
        measure: measure.name(),
        predicted,
        observed: None,
        pct: None,
        warnings: Vec::new(),
    }
}

fn with_pct<M: Measure>(
    observed: Observed<M>,
    predicted: Vec<Option<f64>>,
    pct: Vec<Option<f64>>,
    warnings: Vec<HeightWarning>,
) -> Evaluated {
    Evaluated {
        measure: observed.measure.name(),
        predicted,
        observed: Some(observed.values),
        pct: Some(pct),
        warnings,
    }
}

/// Observed columns the reference does not define are a usage error.
fn reject_leftover<M: Measure>(columns: BTreeMap<String, Vec<Option<f64>>>) -> Result<(), SpiroError> {
    match columns.into_keys().next() {
        Some(name) => Err(SpiroError::UnknownMeasure {
            reference: M::REFERENCE,
            value: name,
            expected: M::expected(),
        }),
        None => Ok(()),
    }
}

/// Knudson sex codes are integers; anything else is a missing value.
fn parse_knudson_sex(s: &str) -> Option<i64> {
    let v = s.trim().parse::<f64>().ok()?;
    if v.is_finite() && v.fract() == 0.0 {
        Some(v as i64)
    } else {
        None
    }
}
