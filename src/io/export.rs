//! Export per-subject results to CSV and JSON.
//!
//! The CSV export is meant to be easy to consume in spreadsheets; missing values
//! are written as empty cells. The JSON export carries the run metadata
//! (reference, measure, warnings) alongside the rows.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::domain::{Reference, SubjectResult};
use crate::error::AppError;
use crate::predict::HeightWarning;

/// JSON document written by `--json`.
#[derive(Debug, Clone, Serialize)]
pub struct RunDocument<'a> {
    pub tool: &'static str,
    pub reference: Reference,
    pub measure: &'a str,
    pub adult_mode: bool,
    pub warnings: Vec<String>,
    pub results: &'a [SubjectResult],
}

/// Write per-subject results to a CSV file.
pub fn write_results_csv(path: &Path, results: &[SubjectResult]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_results(file, results)
}

/// Write per-subject results as CSV to any sink.
pub fn write_results<W: Write>(sink: W, results: &[SubjectResult]) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(sink);
    for r in results {
        writer
            .serialize(r)
            .map_err(|e| AppError::new(4, format!("Failed to write export CSV row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(4, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

/// Write the run document as pretty JSON.
pub fn write_results_json(
    path: &Path,
    reference: Reference,
    measure: &str,
    adult_mode: bool,
    warnings: &[HeightWarning],
    results: &[SubjectResult],
) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create results JSON '{}': {e}", path.display())))?;

    let doc = RunDocument {
        tool: "spiro",
        reference,
        measure,
        adult_mode,
        warnings: warnings.iter().map(ToString::to_string).collect(),
        results,
    };

    serde_json::to_writer_pretty(file, &doc)
        .map_err(|e| AppError::new(4, format!("Failed to write results JSON: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str, predicted: Option<f64>) -> SubjectResult {
        SubjectResult {
            id: id.to_string(),
            sex: Some("m".to_string()),
            age: Some(10.0),
            height: Some(1.4),
            race: Some("white".to_string()),
            measure: "fev".to_string(),
            predicted,
            observed: None,
            pct_predicted: None,
        }
    }

    #[test]
    fn csv_has_header_and_empty_missing_cells() {
        let mut buf = Vec::new();
        write_results(&mut buf, &[result("A", Some(2.0)), result("B", None)]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next(),
            Some("id,sex,age,height,race,measure,predicted,observed,pct_predicted")
        );
        assert_eq!(lines.next(), Some("A,m,10.0,1.4,white,fev,2.0,,"));
        assert_eq!(lines.next(), Some("B,m,10.0,1.4,white,fev,,,"));
    }

    #[test]
    fn json_document_round_trips_through_serde_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.json");
        write_results_json(&path, Reference::Wang, "fev", true, &[], &[result("A", Some(2.0))]).unwrap();

        let value: serde_json::Value = serde_json::from_reader(File::open(&path).unwrap()).unwrap();
        assert_eq!(value["reference"], "wang");
        assert_eq!(value["adult_mode"], true);
        assert_eq!(value["results"][0]["predicted"], 2.0);
        assert!(value["results"][0]["observed"].is_null());
    }
}
