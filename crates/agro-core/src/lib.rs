#![deny(warnings)]

//! Core domain models and invariants for the agricultural dashboard.
//!
//! Every table in the system is keyed by [`Year`]. Tables that carry
//! precipitation also carry the [`PrecipitationUnit`] their values are in, so
//! that model fitting (millimeters) and display surfaces (centimeters) can
//! never be confused silently.

pub mod profile;
pub mod sampling;

pub use profile::*;
pub use sampling::{NormalParams, UniformRange};

use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Calendar year used as the key of every table.
pub type Year = i32;

/// Millimeters in one centimeter.
pub const MM_PER_CM: f64 = 10.0;

/// Unit of the `Precipitation` column of a table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrecipitationUnit {
    /// Used by model fitting and physical calculations.
    Millimeters,
    /// Used by tables, charts and exports.
    Centimeters,
}

impl PrecipitationUnit {
    /// Convert a precipitation value expressed in `self` into `to`.
    pub fn convert(self, value: f64, to: PrecipitationUnit) -> f64 {
        match (self, to) {
            (PrecipitationUnit::Millimeters, PrecipitationUnit::Centimeters) => value / MM_PER_CM,
            (PrecipitationUnit::Centimeters, PrecipitationUnit::Millimeters) => value * MM_PER_CM,
            _ => value,
        }
    }

    /// Short unit suffix for labels.
    pub fn suffix(self) -> &'static str {
        match self {
            PrecipitationUnit::Millimeters => "mm",
            PrecipitationUnit::Centimeters => "cm",
        }
    }
}

/// Environmental variable that a user can override.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnvField {
    Temperature,
    Humidity,
    Precipitation,
}

impl EnvField {
    /// Column name of the field in serialized tables.
    pub fn column(self) -> &'static str {
        match self {
            EnvField::Temperature => "Temperature",
            EnvField::Humidity => "Humidity",
            EnvField::Precipitation => "Precipitation",
        }
    }
}

impl fmt::Display for EnvField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for EnvField {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "temperature" | "temp" | "t" => Ok(EnvField::Temperature),
            "humidity" | "hum" | "h" => Ok(EnvField::Humidity),
            "precipitation" | "precip" | "p" => Ok(EnvField::Precipitation),
            other => Err(ValidationError::UnknownField(other.to_string())),
        }
    }
}

/// Per-year climate observation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentRecord {
    #[serde(rename = "Year")]
    pub year: Year,
    /// Mean temperature in °C.
    #[serde(rename = "Temperature")]
    pub temperature: f64,
    /// Mean relative humidity in %.
    #[serde(rename = "Humidity")]
    pub humidity: f64,
    /// Precipitation in the unit of the owning table.
    #[serde(rename = "Precipitation")]
    pub precipitation: f64,
}

impl EnvironmentRecord {
    /// Value of one environmental field.
    pub fn get(&self, field: EnvField) -> f64 {
        match field {
            EnvField::Temperature => self.temperature,
            EnvField::Humidity => self.humidity,
            EnvField::Precipitation => self.precipitation,
        }
    }

    /// Overwrite one environmental field.
    pub fn set(&mut self, field: EnvField, value: f64) {
        match field {
            EnvField::Temperature => self.temperature = value,
            EnvField::Humidity => self.humidity = value,
            EnvField::Precipitation => self.precipitation = value,
        }
    }
}

/// Per-year agricultural output and resource consumption.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProductionRecord {
    #[serde(rename = "Year")]
    pub year: Year,
    #[serde(rename = "Growth_Days")]
    pub growth_days: f64,
    #[serde(rename = "Yield")]
    pub yield_total: f64,
    #[serde(rename = "Water_Consumption")]
    pub water_consumption: f64,
    #[serde(rename = "Fertilizer_Consumption")]
    pub fertilizer_consumption: f64,
}

/// Per-year economic and efficiency indicators.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    #[serde(rename = "Year")]
    pub year: Year,
    #[serde(rename = "Total_Cost")]
    pub total_cost: f64,
    #[serde(rename = "Total_Price")]
    pub total_price: f64,
    #[serde(rename = "Gain")]
    pub gain: f64,
    /// Percentage; `NaN` when revenue is zero.
    #[serde(rename = "Profit_Margin")]
    pub profit_margin: f64,
    /// Yield per unit of water; `NaN` when water consumption is zero.
    #[serde(rename = "Efficiency")]
    pub efficiency: f64,
    /// `NaN` when total resource consumption is zero.
    #[serde(rename = "Env_Sustain")]
    pub env_sustain: f64,
}

/// Future-year record combining extrapolated environment and production.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    #[serde(rename = "Year")]
    pub year: Year,
    #[serde(rename = "Temperature")]
    pub temperature: f64,
    #[serde(rename = "Humidity")]
    pub humidity: f64,
    #[serde(rename = "Precipitation")]
    pub precipitation: f64,
    #[serde(rename = "Growth_Days")]
    pub growth_days: f64,
    #[serde(rename = "Yield")]
    pub yield_total: f64,
    #[serde(rename = "Water_Consumption")]
    pub water_consumption: f64,
    #[serde(rename = "Fertilizer_Consumption")]
    pub fertilizer_consumption: f64,
}

impl ForecastRecord {
    /// Merge an environment and a production record of the same year.
    pub fn from_parts(env: &EnvironmentRecord, prod: &ProductionRecord) -> Self {
        Self {
            year: env.year,
            temperature: env.temperature,
            humidity: env.humidity,
            precipitation: env.precipitation,
            growth_days: prod.growth_days,
            yield_total: prod.yield_total,
            water_consumption: prod.water_consumption,
            fertilizer_consumption: prod.fertilizer_consumption,
        }
    }

    pub fn environment(&self) -> EnvironmentRecord {
        EnvironmentRecord {
            year: self.year,
            temperature: self.temperature,
            humidity: self.humidity,
            precipitation: self.precipitation,
        }
    }

    pub fn production(&self) -> ProductionRecord {
        ProductionRecord {
            year: self.year,
            growth_days: self.growth_days,
            yield_total: self.yield_total,
            water_consumption: self.water_consumption,
            fertilizer_consumption: self.fertilizer_consumption,
        }
    }
}

/// Anything keyed by a year.
pub trait YearKeyed {
    fn year(&self) -> Year;
}

/// A record that can be laid out as a row of named numeric columns.
///
/// `COLUMNS[0]` is always `"Year"`; [`TableRow::values`] returns the remaining
/// columns in order.
pub trait TableRow: YearKeyed {
    const COLUMNS: &'static [&'static str];

    fn values(&self) -> Vec<f64>;
}

impl YearKeyed for EnvironmentRecord {
    fn year(&self) -> Year {
        self.year
    }
}

impl YearKeyed for ProductionRecord {
    fn year(&self) -> Year {
        self.year
    }
}

impl YearKeyed for PerformanceRecord {
    fn year(&self) -> Year {
        self.year
    }
}

impl YearKeyed for ForecastRecord {
    fn year(&self) -> Year {
        self.year
    }
}

impl TableRow for EnvironmentRecord {
    const COLUMNS: &'static [&'static str] = &["Year", "Temperature", "Humidity", "Precipitation"];

    fn values(&self) -> Vec<f64> {
        vec![self.temperature, self.humidity, self.precipitation]
    }
}

impl TableRow for ProductionRecord {
    const COLUMNS: &'static [&'static str] = &[
        "Year",
        "Growth_Days",
        "Yield",
        "Water_Consumption",
        "Fertilizer_Consumption",
    ];

    fn values(&self) -> Vec<f64> {
        vec![
            self.growth_days,
            self.yield_total,
            self.water_consumption,
            self.fertilizer_consumption,
        ]
    }
}

impl TableRow for PerformanceRecord {
    const COLUMNS: &'static [&'static str] = &[
        "Year",
        "Total_Cost",
        "Total_Price",
        "Gain",
        "Profit_Margin",
        "Efficiency",
        "Env_Sustain",
    ];

    fn values(&self) -> Vec<f64> {
        vec![
            self.total_cost,
            self.total_price,
            self.gain,
            self.profit_margin,
            self.efficiency,
            self.env_sustain,
        ]
    }
}

impl TableRow for ForecastRecord {
    const COLUMNS: &'static [&'static str] = &[
        "Year",
        "Temperature",
        "Humidity",
        "Precipitation",
        "Growth_Days",
        "Yield",
        "Water_Consumption",
        "Fertilizer_Consumption",
    ];

    fn values(&self) -> Vec<f64> {
        vec![
            self.temperature,
            self.humidity,
            self.precipitation,
            self.growth_days,
            self.yield_total,
            self.water_consumption,
            self.fertilizer_consumption,
        ]
    }
}

/// Environment rows together with the unit of their precipitation column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentTable {
    pub unit: PrecipitationUnit,
    pub rows: Vec<EnvironmentRecord>,
}

impl EnvironmentTable {
    pub fn new(unit: PrecipitationUnit, rows: Vec<EnvironmentRecord>) -> Self {
        Self { unit, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn years(&self) -> Vec<Year> {
        self.rows.iter().map(|r| r.year).collect()
    }

    pub fn max_year(&self) -> Option<Year> {
        self.rows.iter().map(|r| r.year).max()
    }

    /// Copy of the table with precipitation expressed in `unit`.
    pub fn in_unit(&self, unit: PrecipitationUnit) -> Self {
        if unit == self.unit {
            return self.clone();
        }
        let rows = self
            .rows
            .iter()
            .map(|r| EnvironmentRecord {
                precipitation: self.unit.convert(r.precipitation, unit),
                ..r.clone()
            })
            .collect();
        Self { unit, rows }
    }
}

/// Forecast rows together with the unit of their precipitation column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForecastTable {
    pub unit: PrecipitationUnit,
    pub rows: Vec<ForecastRecord>,
}

impl ForecastTable {
    pub fn new(unit: PrecipitationUnit, rows: Vec<ForecastRecord>) -> Self {
        Self { unit, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn years(&self) -> Vec<Year> {
        self.rows.iter().map(|r| r.year).collect()
    }

    pub fn min_year(&self) -> Option<Year> {
        self.rows.iter().map(|r| r.year).min()
    }

    pub fn max_year(&self) -> Option<Year> {
        self.rows.iter().map(|r| r.year).max()
    }

    /// Copy of the table with precipitation expressed in `unit`.
    pub fn in_unit(&self, unit: PrecipitationUnit) -> Self {
        if unit == self.unit {
            return self.clone();
        }
        let rows = self
            .rows
            .iter()
            .map(|r| ForecastRecord {
                precipitation: self.unit.convert(r.precipitation, unit),
                ..r.clone()
            })
            .collect();
        Self { unit, rows }
    }

    /// Rows whose year lies in `min..=max`, order preserved.
    pub fn filter_years(&self, min: Year, max: Year) -> Self {
        Self {
            unit: self.unit,
            rows: self
                .rows
                .iter()
                .filter(|r| (min..=max).contains(&r.year))
                .cloned()
                .collect(),
        }
    }

    /// Rows of the earliest year in the table (the "next year" slice).
    pub fn earliest_year_slice(&self) -> Self {
        match self.min_year() {
            Some(y) => self.filter_years(y, y),
            None => self.clone(),
        }
    }

    /// Environment part of the table, same unit.
    pub fn environment(&self) -> EnvironmentTable {
        EnvironmentTable::new(self.unit, self.rows.iter().map(|r| r.environment()).collect())
    }
}

/// Validation errors for domain invariants.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    /// A table that must have rows is empty.
    #[error("{0} table is empty")]
    EmptyTable(&'static str),
    /// A year appears more than once in one table.
    #[error("year {year} appears more than once in {table} table")]
    DuplicateYear { table: &'static str, year: Year },
    /// Two tables that are joined on Year have different year sets.
    #[error(
        "year sets of {left} and {right} differ: only in {left}: {only_left:?}, only in {right}: {only_right:?}"
    )]
    YearMismatch {
        left: &'static str,
        right: &'static str,
        only_left: Vec<Year>,
        only_right: Vec<Year>,
    },
    /// Numeric field must be finite.
    #[error("non-finite value in {field} for year {year}")]
    NonFinite { field: &'static str, year: Year },
    /// Cultivated area must be strictly positive.
    #[error("area must be > 0 hectares, got {0}")]
    NonPositiveArea(f64),
    /// A distribution or model parameter is out of its domain.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },
    /// Unrecognized environmental field name.
    #[error("unknown environmental field: {0}")]
    UnknownField(String),
}

/// Validate a cultivated area in hectares.
pub fn validate_area(area_hectares: f64) -> Result<(), ValidationError> {
    if !area_hectares.is_finite() || area_hectares <= 0.0 {
        return Err(ValidationError::NonPositiveArea(area_hectares));
    }
    Ok(())
}

/// Fail on the first year that appears twice.
pub fn ensure_unique_years<T: YearKeyed>(
    table: &'static str,
    rows: &[T],
) -> Result<(), ValidationError> {
    let mut seen = BTreeSet::new();
    for r in rows {
        if !seen.insert(r.year()) {
            return Err(ValidationError::DuplicateYear {
                table,
                year: r.year(),
            });
        }
    }
    Ok(())
}

/// Validate that every column of every row is finite.
pub fn ensure_finite<T: TableRow>(table: &'static str, rows: &[T]) -> Result<(), ValidationError> {
    for r in rows {
        for (name, v) in T::COLUMNS[1..].iter().zip(r.values()) {
            if !v.is_finite() {
                debug!(table, column = name, year = r.year(), "non-finite input");
                return Err(ValidationError::NonFinite {
                    field: *name,
                    year: r.year(),
                });
            }
        }
    }
    Ok(())
}

/// Inner join on Year that refuses to drop rows.
///
/// Both sides must have unique years and identical year sets; pairs come back
/// in the order of `left`.
pub fn join_on_year<'a, L: YearKeyed, R: YearKeyed>(
    left_name: &'static str,
    left: &'a [L],
    right_name: &'static str,
    right: &'a [R],
) -> Result<Vec<(&'a L, &'a R)>, ValidationError> {
    ensure_unique_years(left_name, left)?;
    ensure_unique_years(right_name, right)?;
    let by_year: BTreeMap<Year, &R> = right.iter().map(|r| (r.year(), r)).collect();
    let left_years: BTreeSet<Year> = left.iter().map(|l| l.year()).collect();
    let only_left: Vec<Year> = left_years
        .iter()
        .filter(|y| !by_year.contains_key(y))
        .copied()
        .collect();
    let only_right: Vec<Year> = by_year
        .keys()
        .filter(|y| !left_years.contains(y))
        .copied()
        .collect();
    if !only_left.is_empty() || !only_right.is_empty() {
        return Err(ValidationError::YearMismatch {
            left: left_name,
            right: right_name,
            only_left,
            only_right,
        });
    }
    Ok(left
        .iter()
        .filter_map(|l| by_year.get(&l.year()).map(|r| (l, *r)))
        .collect())
}

/// Round to `dp` decimal places, half to even. Non-finite values pass through.
pub fn round_dp(value: f64, dp: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    Decimal::from_f64(value)
        .map(|d| d.round_dp(dp))
        .and_then(|d| d.to_f64())
        .unwrap_or(value)
}

/// Round to the three decimals used by every display surface.
pub fn round3(value: f64) -> f64 {
    round_dp(value, 3)
}

/// `num / den`, or `NaN` when the denominator is zero or either side is not finite.
pub fn ratio_or_nan(num: f64, den: f64) -> f64 {
    if den == 0.0 || !den.is_finite() || !num.is_finite() {
        return f64::NAN;
    }
    num / den
}

/// Population standard deviation (ddof = 0). Zero for fewer than two values.
pub fn population_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    var.sqrt()
}

impl PerformanceRecord {
    /// Copy with every indicator rounded to three decimals.
    pub fn rounded(&self) -> Self {
        Self {
            year: self.year,
            total_cost: round3(self.total_cost),
            total_price: round3(self.total_price),
            gain: round3(self.gain),
            profit_margin: round3(self.profit_margin),
            efficiency: round3(self.efficiency),
            env_sustain: round3(self.env_sustain),
        }
    }
}

impl ProductionRecord {
    pub fn rounded(&self) -> Self {
        Self {
            year: self.year,
            growth_days: round3(self.growth_days),
            yield_total: round3(self.yield_total),
            water_consumption: round3(self.water_consumption),
            fertilizer_consumption: round3(self.fertilizer_consumption),
        }
    }
}

impl EnvironmentRecord {
    pub fn rounded(&self) -> Self {
        Self {
            year: self.year,
            temperature: round3(self.temperature),
            humidity: round3(self.humidity),
            precipitation: round3(self.precipitation),
        }
    }
}

impl ForecastRecord {
    pub fn rounded(&self) -> Self {
        Self::from_parts(&self.environment().rounded(), &self.production().rounded())
    }
}
