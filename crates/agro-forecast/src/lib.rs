#![deny(warnings)]

//! Two-stage forecast of environment and production.
//!
//! Stage A extrapolates each climate series against Year; stage B maps the
//! extrapolated climate to production through a model fitted on the joined
//! history. Both stages perturb their predictions with Gaussian noise scaled
//! by the instability factor.

pub mod regression;
pub mod scenario;

pub use regression::{LinearModel, Regressor};
pub use scenario::{recompute_with_override, EnvOverride};

use agro_core::{
    ensure_finite, ensure_unique_years, join_on_year, population_std, EnvironmentRecord,
    EnvironmentTable, ForecastRecord, ForecastTable, NormalParams, PrecipitationUnit,
    ProductionRecord, ValidationError, Year,
};
use agro_sim::SimError;
use nalgebra::{DMatrix, DVector};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Errors produced by the forecast engine and the scenario recompute.
#[derive(Debug, Error, PartialEq)]
pub enum ForecastError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Sim(#[from] SimError),
    #[error("forecast horizon must be between 1 and 100 years, got {0}")]
    InvalidHorizon(usize),
    #[error("instability factor must be finite and >= 0, got {0}")]
    InvalidInstability(f64),
    /// Fewer than two distinct years to fit on.
    #[error("need at least 2 years of history to fit, got {years}")]
    InsufficientHistory { years: usize },
    #[error("model fit failed: {reason}")]
    Fit { reason: String },
}

/// Longest horizon accepted by [`ForecastParams::validate`].
pub const MAX_HORIZON: usize = 100;

/// Forecast knobs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastParams {
    /// Number of future years to predict.
    pub horizon: usize,
    /// Noise scale, relative to the spread of each predicted series.
    pub instability_factor: f64,
}

impl Default for ForecastParams {
    fn default() -> Self {
        Self {
            horizon: 5,
            instability_factor: 0.1,
        }
    }
}

impl ForecastParams {
    pub fn validate(&self) -> Result<(), ForecastError> {
        if !(1..=MAX_HORIZON).contains(&self.horizon) {
            return Err(ForecastError::InvalidHorizon(self.horizon));
        }
        if !self.instability_factor.is_finite() || self.instability_factor < 0.0 {
            return Err(ForecastError::InvalidInstability(self.instability_factor));
        }
        Ok(())
    }
}

/// Forecast with ordinary least squares in both stages.
///
/// The environment history may be in either precipitation unit; the result
/// is always in centimeters and covers `max_year + 1 ..= max_year + horizon`.
pub fn forecast<R: Rng + ?Sized>(
    environment: &EnvironmentTable,
    production: &[ProductionRecord],
    params: ForecastParams,
    rng: &mut R,
) -> Result<ForecastTable, ForecastError> {
    forecast_with::<LinearModel, R>(environment, production, params, rng)
}

/// [`forecast`] with a dedicated seeded RNG.
pub fn forecast_seeded(
    environment: &EnvironmentTable,
    production: &[ProductionRecord],
    params: ForecastParams,
    seed: u64,
) -> Result<ForecastTable, ForecastError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    forecast(environment, production, params, &mut rng)
}

/// Forecast with any [`Regressor`] for every target series.
pub fn forecast_with<M: Regressor, R: Rng + ?Sized>(
    environment: &EnvironmentTable,
    production: &[ProductionRecord],
    params: ForecastParams,
    rng: &mut R,
) -> Result<ForecastTable, ForecastError> {
    params.validate()?;
    if environment.is_empty() {
        return Err(ValidationError::EmptyTable("environment").into());
    }
    if production.is_empty() {
        return Err(ValidationError::EmptyTable("production").into());
    }
    let env = environment.in_unit(PrecipitationUnit::Millimeters);
    ensure_unique_years("environment", &env.rows)?;
    ensure_unique_years("production", production)?;
    ensure_finite("environment", &env.rows)?;
    ensure_finite("production", production)?;
    let joined = join_on_year("environment", &env.rows, "production", production)?;
    let n = joined.len();
    if n < 2 {
        return Err(ForecastError::InsufficientHistory { years: n });
    }

    let last = joined.iter().map(|(e, _)| e.year).max().unwrap_or_default();
    let future = future_years(last, params.horizon)?;
    let h = future.len();

    // Stage A: each climate series against Year.
    let year_features = DMatrix::from_iterator(n, 1, joined.iter().map(|(e, _)| e.year as f64));
    let future_features = DMatrix::from_iterator(h, 1, future.iter().map(|y| *y as f64));
    let env_series = |f: fn(&EnvironmentRecord) -> f64| {
        DVector::from_iterator(n, joined.iter().map(|(e, _)| f(e)))
    };
    let mut climate = Vec::with_capacity(3);
    for target in [
        env_series(|e| e.temperature),
        env_series(|e| e.humidity),
        env_series(|e| e.precipitation),
    ] {
        let model = M::fit(&year_features, &target)?;
        let mut predicted = model.predict(&future_features);
        inject_noise(&mut predicted, params.instability_factor, rng)?;
        climate.push(predicted);
    }
    debug!(years = h, from = last + 1, "extrapolated climate");

    // Stage B: production against the three climate features.
    let env_features = DMatrix::from_fn(n, 3, |i, j| match j {
        0 => joined[i].0.temperature,
        1 => joined[i].0.humidity,
        _ => joined[i].0.precipitation,
    });
    let future_env = DMatrix::from_fn(h, 3, |i, j| climate[j][i]);
    let prod_series = |f: fn(&ProductionRecord) -> f64| {
        DVector::from_iterator(n, joined.iter().map(|(_, p)| f(p)))
    };
    let mut outputs = Vec::with_capacity(4);
    for target in [
        prod_series(|p| p.growth_days),
        prod_series(|p| p.yield_total),
        prod_series(|p| p.water_consumption),
        prod_series(|p| p.fertilizer_consumption),
    ] {
        let model = M::fit(&env_features, &target)?;
        let mut predicted = model.predict(&future_env);
        inject_noise(&mut predicted, params.instability_factor, rng)?;
        outputs.push(predicted);
    }

    let rows = future
        .iter()
        .enumerate()
        .map(|(i, &year)| ForecastRecord {
            year,
            temperature: climate[0][i],
            humidity: climate[1][i],
            precipitation: climate[2][i],
            growth_days: outputs[0][i],
            yield_total: outputs[1][i],
            water_consumption: outputs[2][i],
            fertilizer_consumption: outputs[3][i],
        })
        .collect();
    info!(
        history = n,
        horizon = h,
        instability = params.instability_factor,
        "forecast computed"
    );
    Ok(ForecastTable::new(PrecipitationUnit::Millimeters, rows).in_unit(PrecipitationUnit::Centimeters))
}

/// The `horizon` years following `last`.
fn future_years(last: Year, horizon: usize) -> Result<Vec<Year>, ForecastError> {
    let steps = Year::try_from(horizon).map_err(|_| ForecastError::InvalidHorizon(horizon))?;
    (1..=steps)
        .map(|k| last.checked_add(k).ok_or(ForecastError::InvalidHorizon(horizon)))
        .collect()
}

/// Add `N(0, factor * std(values))` to every value of one predicted series.
///
/// The scale uses the population standard deviation of the predictions
/// themselves. A zero scale leaves the series untouched and draws nothing.
fn inject_noise<R: Rng + ?Sized>(
    values: &mut DVector<f64>,
    factor: f64,
    rng: &mut R,
) -> Result<(), ForecastError> {
    let scale = factor * population_std(values.as_slice());
    let noise = NormalParams::new(0.0, scale);
    for v in values.iter_mut() {
        *v += noise.sample(rng)?;
    }
    Ok(())
}
