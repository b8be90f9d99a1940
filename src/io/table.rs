//! Coefficient table CSV read/write.
//!
//! Column layout follows the row types:
//!
//! - Knudson: `measure,sex,age_lb,coef_const,coef_height,coef_age,coef_age_sq`
//! - Wang: `measure,race,sex,age_lb,alpha,beta`
//!
//! Cells a publication leaves undefined are simply absent rows.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{AppError, SpiroError};
use crate::tables::{CoefficientTable, KeyedRow};

/// Load a coefficient table from a CSV file.
pub fn load_table<R>(path: &Path) -> Result<CoefficientTable<R>, AppError>
where
    R: KeyedRow + DeserializeOwned,
{
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open coefficient table '{}': {e}", path.display())))?;
    let table = read_table(file).map_err(|e| AppError::new(2, format!("{}: {e}", path.display())))?;
    log::info!("loaded {} coefficient rows from {}", table.len(), path.display());
    Ok(table)
}

/// Read a coefficient table from any CSV source.
pub fn read_table<R, S>(source: S) -> Result<CoefficientTable<R>, SpiroError>
where
    R: KeyedRow + DeserializeOwned,
    S: Read,
{
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(source);
    let rows = reader
        .deserialize::<R>()
        .enumerate()
        .map(|(idx, row)| row.map_err(|e| SpiroError::InvalidTable(format!("line {}: {e}", idx + 2))))
        .collect::<Result<Vec<_>, _>>()?;

    if rows.is_empty() {
        return Err(SpiroError::InvalidTable("no coefficient rows".to_string()));
    }
    CoefficientTable::from_rows(rows)
}

/// Write a coefficient table as CSV, rows ordered by key.
pub fn write_table<R, W>(sink: W, table: &CoefficientTable<R>) -> Result<(), AppError>
where
    R: KeyedRow + Serialize,
    W: Write,
{
    let mut writer = csv::Writer::from_writer(sink);
    for row in table.rows() {
        writer
            .serialize(row)
            .map_err(|e| AppError::new(4, format!("Failed to write coefficient row: {e}")))?;
    }
    writer
        .flush()
        .map_err(|e| AppError::new(4, format!("Failed to flush coefficient table: {e}")))?;
    Ok(())
}

/// Write a coefficient table to a CSV file.
pub fn write_table_csv<R>(path: &Path, table: &CoefficientTable<R>) -> Result<(), AppError>
where
    R: KeyedRow + Serialize,
{
    let file = File::create(path)
        .map_err(|e| AppError::new(4, format!("Failed to create table CSV '{}': {e}", path.display())))?;
    write_table(file, table)
}
