//! Dashboard configuration loaded from YAML.

use agro_core::{CropProfileConfig, EnvField, Year};
use agro_forecast::ForecastParams;
use data_pipeline::{LabelMap, ReportHeader};
use serde::{Deserialize, Serialize};
use std::fs;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Column labels for the on-screen tables and for the report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelTable {
    pub display: LabelMap,
    pub report: LabelMap,
}

fn label_map(pairs: &[(&str, &str)]) -> LabelMap {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

impl Default for LabelTable {
    fn default() -> Self {
        Self {
            display: label_map(&[
                ("Year", "Anno"),
                ("Temperature", "Temperatura (°C)"),
                ("Humidity", "Umidità (%)"),
                ("Precipitation", "Precipitazioni (cm)"),
                ("Growth_Days", "Giorni di Crescita"),
                ("Yield", "Raccolto (q)"),
                ("Water_Consumption", "Cons. Acqua (dm3)"),
                ("Fertilizer_Consumption", "Cons. Fertilizz. (q)"),
                ("Efficiency", "Efficienza"),
                ("Env_Sustain", "Sostenibilità"),
                ("Total_Cost", "Totale Costi (€)"),
                ("Total_Price", "Totale Ricavi (€)"),
                ("Gain", "Profitto (€)"),
                ("Profit_Margin", "Margine di Profitto (%)"),
            ]),
            report: label_map(&[
                ("Year", "Anno"),
                ("Temperature", "Temp. (°C)"),
                ("Humidity", "Umid. (%)"),
                ("Precipitation", "Precip. (cm)"),
                ("Growth_Days", "Crescita (gg)"),
                ("Yield", "Raccolto (q)"),
                ("Water_Consumption", "Acqua (dm3)"),
                ("Fertilizer_Consumption", "Fertil. (q)"),
                ("Efficiency", "Efficienza"),
                ("Env_Sustain", "Sostenibilità"),
                ("Total_Cost", "Costi (€)"),
                ("Total_Price", "Ricavi (€)"),
                ("Gain", "Profitto (€)"),
                ("Profit_Margin", "Margine (%)"),
            ]),
        }
    }
}

/// Bounds and starting position of one override slider.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SliderSpec {
    pub min: f64,
    pub max: f64,
    pub default: f64,
}

impl SliderSpec {
    pub const fn new(min: f64, max: f64, default: f64) -> Self {
        Self { min, max, default }
    }

    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

/// Override sliders; precipitation is in centimeters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SliderConfig {
    pub temperature: SliderSpec,
    pub humidity: SliderSpec,
    pub precipitation: SliderSpec,
}

impl Default for SliderConfig {
    fn default() -> Self {
        Self {
            temperature: SliderSpec::new(0.0, 50.0, 25.0),
            humidity: SliderSpec::new(0.0, 100.0, 50.0),
            precipitation: SliderSpec::new(20.0, 80.0, 35.0),
        }
    }
}

impl SliderConfig {
    pub fn get(&self, field: EnvField) -> SliderSpec {
        match field {
            EnvField::Temperature => self.temperature,
            EnvField::Humidity => self.humidity,
            EnvField::Precipitation => self.precipitation,
        }
    }
}

/// Everything a dashboard session needs; every field has a default.
///
/// Example:
/// ```yaml
/// area_hectares: 40
/// seed: 7
/// history_dir: data_src
/// crop:
///   kind: tomato
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub area_hectares: f64,
    pub horizon: usize,
    pub instability_factor: f64,
    /// Fixed seed for every random draw; a fresh one per session when absent.
    pub seed: Option<u64>,
    /// Years of synthetic history.
    pub history_years: RangeInclusive<Year>,
    /// Directory holding `data_env.csv` and `data_prod.csv`, read on page load.
    pub history_dir: Option<PathBuf>,
    pub crop: CropProfileConfig,
    pub labels: LabelTable,
    pub report: ReportHeader,
    pub sliders: SliderConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            area_hectares: 25.0,
            horizon: 5,
            instability_factor: 0.1,
            seed: None,
            history_years: 2020..=2024,
            history_dir: None,
            crop: CropProfileConfig::default(),
            labels: LabelTable::default(),
            report: ReportHeader::default(),
            sliders: SliderConfig::default(),
        }
    }
}

impl DashboardConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_yaml::from_str(text).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn forecast_params(&self) -> ForecastParams {
        ForecastParams {
            horizon: self.horizon,
            instability_factor: self.instability_factor,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        agro_core::validate_area(self.area_hectares).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        self.forecast_params()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        // The forecast fits a trend, which takes at least two years.
        if self.history_years.end().saturating_sub(*self.history_years.start()) < 1 {
            return Err(ConfigError::Invalid(format!(
                "history_years {}..={} must span at least 2 years",
                self.history_years.start(),
                self.history_years.end()
            )));
        }
        for field in [EnvField::Temperature, EnvField::Humidity, EnvField::Precipitation] {
            let s = self.sliders.get(field);
            if !(s.min <= s.max && s.contains(s.default)) {
                return Err(ConfigError::Invalid(format!(
                    "slider {field}: default {} outside {}..={}",
                    s.default, s.min, s.max
                )));
            }
        }
        self.crop
            .resolve()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_gives_defaults() {
        let cfg = DashboardConfig::from_yaml_str("{}").unwrap();
        assert_eq!(cfg, DashboardConfig::default());
        assert_eq!(cfg.forecast_params(), ForecastParams::default());
        assert_eq!(cfg.labels.display["Year"], "Anno");
        assert_eq!(cfg.labels.report["Precipitation"], "Precip. (cm)");
    }

    #[test]
    fn partial_yaml_overrides_fields() {
        let text = "area_hectares: 40\nseed: 7\nhistory_years:\n  start: 2015\n  end: 2024\ncrop:\n  kind: tomato\nsliders:\n  temperature: { min: 5, max: 45, default: 20 }\n";
        let cfg = DashboardConfig::from_yaml_str(text).unwrap();
        assert_eq!(cfg.area_hectares, 40.0);
        assert_eq!(cfg.seed, Some(7));
        assert_eq!(cfg.history_years, 2015..=2024);
        assert_eq!(cfg.crop, CropProfileConfig::Tomato);
        assert_eq!(cfg.sliders.temperature.default, 20.0);
        assert_eq!(cfg.sliders.humidity, SliderConfig::default().humidity);
        assert_eq!(cfg.horizon, 5);
    }

    #[test]
    fn invalid_values_rejected() {
        assert!(DashboardConfig::from_yaml_str("area_hectares: 0").is_err());
        assert!(DashboardConfig::from_yaml_str("horizon: 0").is_err());
        assert!(DashboardConfig::from_yaml_str("instability_factor: -1").is_err());
        assert!(DashboardConfig::from_yaml_str("sliders:\n  humidity: { min: 0, max: 100, default: 150 }").is_err());
        assert!(DashboardConfig::from_yaml_str("history_years: { start: 2024, end: 2020 }").is_err());
        assert!(DashboardConfig::from_yaml_str("history_years: { start: 2020, end: 2020 }").is_err());
        assert!(DashboardConfig::from_yaml_str("horizon: 4294967296").is_err());
        assert!(DashboardConfig::from_yaml_str("history_years: { start: 2023, end: 2024 }").is_ok());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = DashboardConfig::load(Path::new("/definitely/not/here.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
