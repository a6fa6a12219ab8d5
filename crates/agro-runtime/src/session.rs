//! Per-viewer dashboard state and event dispatch.

use crate::config::{DashboardConfig, SliderConfig};
use crate::DashboardError;
use agro_core::{
    CropProfile, EnvField, EnvironmentTable, ForecastTable, PerformanceRecord, PrecipitationUnit,
    ProductionRecord, ValidationError, Year,
};
use agro_forecast::EnvOverride;
use data_pipeline::export::{ENVIRONMENT_SHEET, PERFORMANCE_SHEET, PRODUCTION_SHEET};
use data_pipeline::{format_table, DataTable, LabelMap, ReportSection, Sheet};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Something the viewer did.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DashboardEvent {
    /// Initial load: history, indicators and forecast from scratch.
    PageLoad,
    /// "Generate random data": new synthetic history and a fresh forecast.
    RegenerateRequested,
    /// A climate slider moved; recompute the next-year slice.
    OverrideChanged { field: EnvField, value: f64 },
    /// The forecast year range changed.
    RangeFilterChanged { min: Year, max: Year },
}

/// Inclusive year interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearRange {
    pub min: Year,
    pub max: Year,
}

impl YearRange {
    fn span_of(table: &ForecastTable) -> Result<Self, ValidationError> {
        match (table.min_year(), table.max_year()) {
            (Some(min), Some(max)) => Ok(Self { min, max }),
            _ => Err(ValidationError::EmptyTable("forecast")),
        }
    }
}

/// Current slider positions; precipitation in centimeters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SliderPositions {
    pub temperature: f64,
    pub humidity: f64,
    pub precipitation: f64,
}

impl SliderPositions {
    fn set(&mut self, field: EnvField, value: f64) {
        match field {
            EnvField::Temperature => self.temperature = value,
            EnvField::Humidity => self.humidity = value,
            EnvField::Precipitation => self.precipitation = value,
        }
    }
}

impl From<&SliderConfig> for SliderPositions {
    fn from(c: &SliderConfig) -> Self {
        Self {
            temperature: c.temperature.default,
            humidity: c.humidity.default,
            precipitation: c.precipitation.default,
        }
    }
}

/// Everything the viewer sees after an event, rounded to 3 decimals,
/// precipitation in centimeters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DashboardView {
    pub environment: EnvironmentTable,
    pub production: Vec<ProductionRecord>,
    pub performance: Vec<PerformanceRecord>,
    /// Forecast restricted to `year_range`.
    pub forecast: ForecastTable,
    /// Earliest forecast year, with any overrides applied.
    pub next_year: ForecastTable,
    pub year_range: YearRange,
    /// Years covered by the full forecast.
    pub forecast_span: YearRange,
    pub sliders: SliderPositions,
}

impl DashboardView {
    /// Workbook sheets: environment, production and performance.
    pub fn workbook(&self) -> Vec<Sheet> {
        vec![
            Sheet::new(ENVIRONMENT_SHEET, DataTable::from_records(&self.environment.rows)),
            Sheet::new(PRODUCTION_SHEET, DataTable::from_records(&self.production)),
            Sheet::new(PERFORMANCE_SHEET, DataTable::from_records(&self.performance)),
        ]
    }

    /// Every table of the view, formatted under `labels`, in report order.
    pub fn sections(&self, labels: &LabelMap) -> Vec<ReportSection> {
        let section = |heading: &str, table: DataTable| ReportSection {
            heading: heading.to_string(),
            table: format_table(&table, labels),
        };
        vec![
            section(ENVIRONMENT_SHEET, DataTable::from_records(&self.environment.rows)),
            section(PRODUCTION_SHEET, DataTable::from_records(&self.production)),
            section(PERFORMANCE_SHEET, DataTable::from_records(&self.performance)),
            section("Dati di Previsionali", DataTable::from_records(&self.forecast.rows)),
            section(
                "Dati di Previsione in funzione delle condizioni ambientali",
                DataTable::from_records(&self.next_year.rows),
            ),
        ]
    }
}

#[derive(Clone, Debug)]
struct SessionState {
    /// Precipitation in millimeters.
    environment: EnvironmentTable,
    production: Vec<ProductionRecord>,
    performance: Vec<PerformanceRecord>,
    /// Full forecast, centimeters.
    forecast: ForecastTable,
    next_year: ForecastTable,
    year_range: YearRange,
    forecast_span: YearRange,
    sliders: SliderPositions,
}

/// One viewer's dashboard. `&mut self` on [`DashboardSession::handle`] makes
/// every read-modify-write of the cached forecast atomic for that viewer.
#[derive(Debug)]
pub struct DashboardSession {
    config: DashboardConfig,
    profile: CropProfile,
    seed: u64,
    rng: ChaCha8Rng,
    state: Option<SessionState>,
}

impl DashboardSession {
    pub fn new(config: DashboardConfig) -> Result<Self, DashboardError> {
        config.validate()?;
        let profile = config.crop.resolve()?;
        let seed = config.seed.unwrap_or_else(rand::random);
        debug!(seed, crop = %profile.name, "session created");
        Ok(Self {
            config,
            profile,
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            state: None,
        })
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Seed of this session's random stream.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Apply one event and return the refreshed view.
    ///
    /// A failed event leaves the session as it was.
    pub fn handle(&mut self, event: DashboardEvent) -> Result<DashboardView, DashboardError> {
        info!(?event, "dashboard event");
        match event {
            DashboardEvent::PageLoad => {
                let (environment, production) = match self.config.history_dir.clone() {
                    Some(dir) => {
                        let h = data_pipeline::load_history(&dir)?;
                        (h.environment, h.production)
                    }
                    None => self.synthetic_history()?,
                };
                let sliders = SliderPositions::from(&self.config.sliders);
                self.state = Some(self.build_state(environment, production, sliders)?);
            }
            DashboardEvent::RegenerateRequested => {
                let (environment, production) = self.synthetic_history()?;
                // Fresh next-year slice, so the sliders go back to their defaults.
                let sliders = SliderPositions::from(&self.config.sliders);
                self.state = Some(self.build_state(environment, production, sliders)?);
            }
            DashboardEvent::OverrideChanged { field, value } => {
                let slider = self.config.sliders.get(field);
                if !slider.contains(value) {
                    return Err(DashboardError::OverrideOutOfRange {
                        field,
                        value,
                        min: slider.min,
                        max: slider.max,
                    });
                }
                let state = self.state.as_mut().ok_or(DashboardError::NotInitialized)?;
                let next = agro_forecast::recompute_with_override(
                    &state.next_year,
                    EnvOverride { field, value },
                    self.config.area_hectares,
                    &self.profile,
                    &mut self.rng,
                )?;
                state.next_year = next;
                state.sliders.set(field, value);
            }
            DashboardEvent::RangeFilterChanged { min, max } => {
                let state = self.state.as_mut().ok_or(DashboardError::NotInitialized)?;
                if min > max {
                    return Err(DashboardError::InvalidRange { min, max });
                }
                state.year_range = YearRange { min, max };
            }
        }
        self.view()
    }

    /// The view for the current state.
    pub fn view(&self) -> Result<DashboardView, DashboardError> {
        let s = self.state.as_ref().ok_or(DashboardError::NotInitialized)?;
        let mut environment = s.environment.in_unit(PrecipitationUnit::Centimeters);
        environment.rows = environment.rows.iter().map(|r| r.rounded()).collect();
        let mut forecast = s.forecast.filter_years(s.year_range.min, s.year_range.max);
        forecast.rows = forecast.rows.iter().map(|r| r.rounded()).collect();
        let mut next_year = s.next_year.clone();
        next_year.rows = next_year.rows.iter().map(|r| r.rounded()).collect();
        Ok(DashboardView {
            environment,
            production: s.production.iter().map(|r| r.rounded()).collect(),
            performance: s.performance.iter().map(|r| r.rounded()).collect(),
            forecast,
            next_year,
            year_range: s.year_range,
            forecast_span: s.forecast_span,
            sliders: s.sliders,
        })
    }

    fn synthetic_history(&mut self) -> Result<(EnvironmentTable, Vec<ProductionRecord>), DashboardError> {
        let h = agro_sim::generate_history(
            self.config.history_years.clone(),
            self.config.area_hectares,
            &self.profile,
            &mut self.rng,
        )?;
        Ok((h.environment, h.production))
    }

    fn build_state(
        &mut self,
        environment: EnvironmentTable,
        production: Vec<ProductionRecord>,
        sliders: SliderPositions,
    ) -> Result<SessionState, DashboardError> {
        let performance = agro_econ::compute_performance(
            &production,
            &environment,
            self.config.area_hectares,
            &self.profile.economics,
            &mut self.rng,
        )?;
        let forecast = agro_forecast::forecast(
            &environment,
            &production,
            self.config.forecast_params(),
            &mut self.rng,
        )?;
        let span = YearRange::span_of(&forecast)?;
        let next_year = forecast.earliest_year_slice();
        debug!(history = environment.len(), from = span.min, to = span.max, "state rebuilt");
        Ok(SessionState {
            environment,
            production,
            performance,
            forecast,
            next_year,
            year_range: span,
            forecast_span: span,
            sliders,
        })
    }
}
