//! Workbook and JSON exports.

use crate::{DataTable, PipelineError};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Sheet names of the dashboard workbook.
pub const ENVIRONMENT_SHEET: &str = "Dati Ambientali";
pub const PRODUCTION_SHEET: &str = "Dati di Produzione";
pub const PERFORMANCE_SHEET: &str = "Dati di Performance";

/// One named table of a workbook.
#[derive(Clone, Debug, PartialEq)]
pub struct Sheet {
    pub name: String,
    pub table: DataTable,
}

impl Sheet {
    pub fn new(name: impl Into<String>, table: DataTable) -> Self {
        Self {
            name: name.into(),
            table,
        }
    }
}

/// Write every sheet to `dir/<name>.csv`, raw column names and full precision.
///
/// Returns the written paths in sheet order.
pub fn export_workbook(dir: &Path, sheets: &[Sheet]) -> Result<Vec<PathBuf>, PipelineError> {
    std::fs::create_dir_all(dir).map_err(|source| PipelineError::Io {
        path: dir.to_path_buf(),
        source,
    })?;
    let mut written = Vec::with_capacity(sheets.len());
    for sheet in sheets {
        let path = dir.join(format!("{}.csv", sheet.name));
        let csv_err = |source| PipelineError::Csv {
            path: path.clone(),
            row: 0,
            source,
        };
        let mut wtr = csv::Writer::from_path(&path).map_err(csv_err)?;
        wtr.write_record(&sheet.table.columns).map_err(csv_err)?;
        for row in &sheet.table.rows {
            let mut record = Vec::with_capacity(row.values.len() + 1);
            record.push(row.year.to_string());
            record.extend(row.values.iter().map(|v| v.to_string()));
            wtr.write_record(&record).map_err(csv_err)?;
        }
        wtr.flush().map_err(|source| PipelineError::Io {
            path: path.clone(),
            source,
        })?;
        written.push(path);
    }
    info!(dir = %dir.display(), sheets = written.len(), "exported workbook");
    Ok(written)
}

/// Pretty-printed JSON of `value` at `path`.
pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PipelineError> {
    let s = serde_json::to_string_pretty(value).map_err(|source| PipelineError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    std::fs::write(path, s).map_err(|source| PipelineError::Io {
        path: path.to_path_buf(),
        source,
    })
}
