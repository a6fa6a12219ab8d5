#![deny(warnings)]

//! Tabular input and output for the dashboard.
//!
//! This crate provides:
//! - CSV loaders for the static environment and production history
//! - Column-named tables built from any [`TableRow`] record
//! - Presentation formatting (Year as integer, 3 decimals elsewhere)
//! - Workbook (one CSV per sheet), JSON and text report exports

pub mod export;
pub mod load;
pub mod report;

pub use export::{export_workbook, write_json, Sheet};
pub use load::{load_environment_csv, load_history, load_production_csv, History};
pub use report::{format_table, render_report, FormattedTable, ReportHeader, ReportSection};

use agro_core::{TableRow, ValidationError, Year};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

/// Column name to presentation label.
pub type LabelMap = BTreeMap<String, String>;

/// File names of the static history inside a data directory.
pub const ENVIRONMENT_FILE: &str = "data_env.csv";
pub const PRODUCTION_FILE: &str = "data_prod.csv";

/// Errors produced while loading or exporting tables.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// `row` is the 1-based data row, 0 when the file itself failed.
    #[error("{path}: row {row}: {source}")]
    Csv {
        path: PathBuf,
        row: usize,
        #[source]
        source: csv::Error,
    },
    #[error("{path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// One row of a [`DataTable`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataRow {
    pub year: Year,
    pub values: Vec<f64>,
}

/// Numeric table with named columns; the first column is always Year.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    pub columns: Vec<String>,
    pub rows: Vec<DataRow>,
}

impl DataTable {
    /// Lay out typed records as a column-named table.
    pub fn from_records<T: TableRow>(records: &[T]) -> Self {
        Self {
            columns: T::COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: records
                .iter()
                .map(|r| DataRow {
                    year: r.year(),
                    values: r.values(),
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agro_core::{EnvironmentRecord, PerformanceRecord};

    #[test]
    fn table_from_records_keeps_column_order() {
        let rows = vec![EnvironmentRecord {
            year: 2020,
            temperature: 20.0,
            humidity: 50.0,
            precipitation: 60.0,
        }];
        let t = DataTable::from_records(&rows);
        assert_eq!(t.columns, vec!["Year", "Temperature", "Humidity", "Precipitation"]);
        assert_eq!(t.rows[0].year, 2020);
        assert_eq!(t.rows[0].values, vec![20.0, 50.0, 60.0]);
    }

    #[test]
    fn performance_table_has_seven_columns() {
        let t = DataTable::from_records::<PerformanceRecord>(&[]);
        assert_eq!(t.columns.len(), 7);
        assert!(t.is_empty());
    }
}
