//! Subject CSV ingest.
//!
//! This module turns a subject list CSV into column vectors that the predictors
//! can evaluate directly.
//!
//! Design goals:
//! - **Strict schema** for required columns (clear errors + exit code 2)
//! - **Lenient cells**: an unparseable number is a missing value, like any other
//!   per-element gap, and is reported as a row note
//! - **Separation of concerns**: no equation logic here

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::Reference;
use crate::error::AppError;

/// Column vectors read from a subject CSV.
#[derive(Debug, Clone, Default)]
pub struct SubjectBatch {
    pub ids: Vec<String>,
    pub sex: Vec<Option<String>>,
    pub age: Vec<Option<f64>>,
    pub height: Vec<Option<f64>>,
    pub race: Vec<Option<String>>,
    /// Per-row `measure` column, if the file has one.
    pub measure: Option<Vec<String>>,
    /// Observed values keyed by measure column name (`fev`, `fvc`, ...).
    pub observed: BTreeMap<String, Vec<Option<f64>>>,
    pub row_notes: Vec<RowNote>,
    pub rows_read: usize,
}

impl SubjectBatch {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// A row-level problem encountered during ingest.
#[derive(Debug, Clone, PartialEq)]
pub struct RowNote {
    pub line: usize,
    pub id: Option<String>,
    pub message: String,
}

/// Load a subject CSV for the given reference.
pub fn load_subjects(path: &Path, reference: Reference) -> Result<SubjectBatch, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    read_subjects(file, reference)
}

/// Read subjects from any CSV source.
pub fn read_subjects<R: Read>(source: R, reference: Reference) -> Result<SubjectBatch, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    ensure_required_columns_exist(reference, &header_map)?;

    let observed_columns: Vec<&'static str> = measure_names(reference)
        .iter()
        .copied()
        .filter(|name| header_map.contains_key(*name))
        .collect();

    let mut batch = SubjectBatch {
        measure: header_map.contains_key("measure").then(Vec::new),
        observed: observed_columns.iter().map(|c| (c.to_string(), Vec::new())).collect(),
        ..Default::default()
    };

    for (idx, result) in reader.records().enumerate() {
        // +2: header is line 1 and CSV lines are 1-based.
        let line = idx + 2;
        batch.rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                // Keep the row so output lines up with input; every field is missing.
                let id = format!("row{}", line - 1);
                batch.row_notes.push(RowNote {
                    line,
                    id: Some(id.clone()),
                    message: format!("CSV parse error (all fields treated as missing): {e}"),
                });
                batch.ids.push(id);
                batch.sex.push(None);
                batch.age.push(None);
                batch.height.push(None);
                batch.race.push(None);
                for values in batch.observed.values_mut() {
                    values.push(None);
                }
                if let Some(measures) = batch.measure.as_mut() {
                    measures.push(String::new());
                }
                continue;
            }
        };

        let id = get_optional(&record, &header_map, "id")
            .map(str::to_string)
            .unwrap_or_else(|| format!("row{}", line - 1));

        let mut notes = Vec::new();
        let mut number = |name: &str| -> Option<f64> {
            let raw = get_optional(&record, &header_map, name)?;
            let parsed = parse_cell(raw);
            if parsed.is_none() && !is_na(raw) {
                notes.push(format!("`{name}` value '{raw}' is not a number; treated as missing"));
            }
            parsed
        };

        let age = number("age");
        let height = number("height");
        let observed: Vec<Option<f64>> = observed_columns.iter().map(|c| number(c)).collect();

        batch.age.push(age);
        batch.height.push(height);
        for (column, value) in observed_columns.iter().zip(observed) {
            if let Some(values) = batch.observed.get_mut(*column) {
                values.push(value);
            }
        }
        batch.sex.push(get_text(&record, &header_map, "sex"));
        batch.race.push(get_text(&record, &header_map, "race"));
        if let Some(measures) = batch.measure.as_mut() {
            measures.push(get_optional(&record, &header_map, "measure").unwrap_or("").to_string());
        }

        for message in notes {
            batch.row_notes.push(RowNote {
                line,
                id: Some(id.clone()),
                message,
            });
        }
        batch.ids.push(id);
    }

    Ok(batch)
}

fn measure_names(reference: Reference) -> &'static [&'static str] {
    match reference {
        Reference::Knudson => &["fev", "fvc", "fef2575", "vmax50", "vmax75"],
        Reference::Wang => &["fev", "fvc", "fev_fvc", "fef2575"],
    }
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn ensure_required_columns_exist(reference: Reference, header_map: &HashMap<String, usize>) -> Result<(), AppError> {
    for column in ["sex", "age", "height"] {
        if !header_map.contains_key(column) {
            return Err(AppError::new(2, format!("Missing required column: `{column}`")));
        }
    }
    if reference == Reference::Wang && !header_map.contains_key("race") {
        return Err(AppError::new(2, "Missing required column for `--reference wang`: `race`"));
    }
    Ok(())
}

fn get_optional<'a>(record: &'a StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<&'a str> {
    let idx = header_map.get(name)?;
    record.get(*idx).map(str::trim).filter(|s| !s.is_empty())
}

fn get_text(record: &StringRecord, header_map: &HashMap<String, usize>, name: &str) -> Option<String> {
    get_optional(record, header_map, name)
        .filter(|s| !is_na(s))
        .map(str::to_string)
}

/// `NA` (any case) and empty cells are missing.
pub fn is_na(s: &str) -> bool {
    let s = s.trim();
    s.is_empty() || s.eq_ignore_ascii_case("na")
}

/// Parse a numeric cell; missing markers, junk and non-finite values are `None`.
pub fn parse_cell(s: &str) -> Option<f64> {
    if is_na(s) {
        return None;
    }
    let v = s.trim().parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}
