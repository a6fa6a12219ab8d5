//! Static history loaders.

use crate::{PipelineError, ENVIRONMENT_FILE, PRODUCTION_FILE};
use agro_core::{
    ensure_finite, ensure_unique_years, join_on_year, EnvironmentRecord, EnvironmentTable,
    PrecipitationUnit, ProductionRecord,
};
use csv::ReaderBuilder;
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::{debug, info};

/// Environment and production history read from disk.
#[derive(Clone, Debug, PartialEq)]
pub struct History {
    pub environment: EnvironmentTable,
    pub production: Vec<ProductionRecord>,
}

fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, PipelineError> {
    let mut rdr = ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|source| PipelineError::Csv {
            path: path.to_path_buf(),
            row: 0,
            source,
        })?;
    let mut rows = Vec::new();
    for (i, result) in rdr.deserialize::<T>().enumerate() {
        let row = result.map_err(|source| PipelineError::Csv {
            path: path.to_path_buf(),
            row: i + 1,
            source,
        })?;
        rows.push(row);
    }
    debug!(path = %path.display(), rows = rows.len(), "read csv");
    Ok(rows)
}

/// Environment history with `Year,Temperature,Humidity,Precipitation`
/// columns, precipitation in millimeters.
pub fn load_environment_csv(path: &Path) -> Result<EnvironmentTable, PipelineError> {
    let rows: Vec<EnvironmentRecord> = read_rows(path)?;
    ensure_unique_years("environment", &rows)?;
    ensure_finite("environment", &rows)?;
    Ok(EnvironmentTable::new(PrecipitationUnit::Millimeters, rows))
}

/// Production history with `Year,Growth_Days,Yield,Water_Consumption,Fertilizer_Consumption` columns.
pub fn load_production_csv(path: &Path) -> Result<Vec<ProductionRecord>, PipelineError> {
    let rows: Vec<ProductionRecord> = read_rows(path)?;
    ensure_unique_years("production", &rows)?;
    ensure_finite("production", &rows)?;
    Ok(rows)
}

/// Both history files from `dir`; their year sets must match.
pub fn load_history(dir: &Path) -> Result<History, PipelineError> {
    let environment = load_environment_csv(&dir.join(ENVIRONMENT_FILE))?;
    let production = load_production_csv(&dir.join(PRODUCTION_FILE))?;
    join_on_year("environment", &environment.rows, "production", &production)?;
    info!(dir = %dir.display(), years = environment.len(), "loaded static history");
    Ok(History {
        environment,
        production,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use agro_core::ValidationError;
    use std::path::PathBuf;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("agro-load-{}-{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    const ENV: &str = "Year,Temperature,Humidity,Precipitation\n\
                       2020,20,50,600\n\
                       2021,22,55,580\n\
                       2022,21,52,610\n";
    const PROD: &str = "Year,Growth_Days,Yield,Water_Consumption,Fertilizer_Consumption\n\
                        2020,158,70,75,80\n\
                        2021,162,74,80,78\n\
                        2022,159,71,76,83\n";

    #[test]
    fn loads_matching_history() {
        let dir = scratch_dir("ok");
        std::fs::write(dir.join(ENVIRONMENT_FILE), ENV).unwrap();
        std::fs::write(dir.join(PRODUCTION_FILE), PROD).unwrap();
        let h = load_history(&dir).unwrap();
        assert_eq!(h.environment.unit, PrecipitationUnit::Millimeters);
        assert_eq!(h.environment.years(), vec![2020, 2021, 2022]);
        assert_eq!(h.environment.rows[1].precipitation, 580.0);
        assert_eq!(h.production[2].fertilizer_consumption, 83.0);
    }

    #[test]
    fn bad_row_reports_its_number() {
        let dir = scratch_dir("bad-row");
        let path = dir.join(ENVIRONMENT_FILE);
        std::fs::write(&path, "Year,Temperature,Humidity,Precipitation\n2020,20,50,600\n2021,warm,55,580\n").unwrap();
        match load_environment_csv(&path) {
            Err(PipelineError::Csv { row, .. }) => assert_eq!(row, 2),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn mismatched_years_rejected() {
        let dir = scratch_dir("mismatch");
        std::fs::write(dir.join(ENVIRONMENT_FILE), ENV).unwrap();
        std::fs::write(
            dir.join(PRODUCTION_FILE),
            "Year,Growth_Days,Yield,Water_Consumption,Fertilizer_Consumption\n2020,158,70,75,80\n",
        )
        .unwrap();
        assert!(matches!(
            load_history(&dir),
            Err(PipelineError::Validation(ValidationError::YearMismatch { .. }))
        ));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = scratch_dir("missing");
        assert!(matches!(
            load_production_csv(&dir.join("nope.csv")),
            Err(PipelineError::Csv { row: 0, .. })
        ));
    }
}
