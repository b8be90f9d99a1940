//! Coefficient tables for the reference equations.
//!
//! A table is an immutable map from a composite key to a coefficient row. The
//! built-in tables are compiled-in literal data, indexed once per process and
//! shared read-only; alternative tables can be loaded from CSV (`io::table`).

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::SpiroError;

pub mod knudson;
pub mod wang;

pub use knudson::{KnudsonKey, KnudsonRow, KnudsonTable};
pub use wang::{WangKey, WangRow, WangTable};

/// A coefficient row that knows its own lookup key.
pub trait KeyedRow: Clone + Debug {
    type Key: Copy + Eq + Hash + Ord + Debug;

    fn key(&self) -> Self::Key;

    /// Reject rows with non-finite coefficients.
    fn validate(&self) -> Result<(), SpiroError>;
}

/// Immutable key → row mapping.
#[derive(Debug, Clone)]
pub struct CoefficientTable<R: KeyedRow> {
    rows: HashMap<R::Key, R>,
}

impl<R: KeyedRow> CoefficientTable<R> {
    /// Build a table, rejecting duplicate keys and invalid coefficients.
    pub fn from_rows(rows: impl IntoIterator<Item = R>) -> Result<Self, SpiroError> {
        let mut map = HashMap::new();
        for row in rows {
            row.validate()?;
            let key = row.key();
            if map.insert(key, row).is_some() {
                return Err(SpiroError::DuplicateRow {
                    key: format!("{key:?}"),
                });
            }
        }
        log::debug!("indexed coefficient table with {} rows", map.len());
        Ok(Self { rows: map })
    }

    pub fn get(&self, key: &R::Key) -> Option<&R> {
        self.rows.get(key)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// All rows ordered by key (deterministic export order).
    pub fn rows(&self) -> Vec<&R> {
        let mut rows: Vec<&R> = self.rows.values().collect();
        rows.sort_by_key(|r| r.key());
        rows
    }
}

pub(crate) fn ensure_finite(label: &str, key: impl Debug, values: &[(&str, f64)]) -> Result<(), SpiroError> {
    for (name, v) in values {
        if !v.is_finite() {
            return Err(SpiroError::InvalidTable(format!(
                "{label} row {key:?}: `{name}` must be finite, got {v}"
            )));
        }
    }
    Ok(())
}
