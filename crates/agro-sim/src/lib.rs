#![deny(warnings)]

//! Production estimation and synthetic history generation.
//!
//! Both halves are driven by a [`CropProfile`] and a caller-supplied RNG; a
//! seeded `ChaCha8Rng` makes every draw reproducible.

use agro_core::sampling::linspace;
use agro_core::{
    ensure_finite, ensure_unique_years, validate_area, CropProfile, EnvironmentRecord,
    EnvironmentTable, PrecipitationUnit, ProductionRecord, ValidationError, Year, YieldBands,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::ops::RangeInclusive;
use thiserror::Error;
use tracing::debug;

/// Errors produced by the estimator and generators.
#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// A generator was asked for an empty year range.
    #[error("year range {start}..={end} is empty")]
    EmptyYears { start: Year, end: Year },
}

/// Synthetic environment and production history.
#[derive(Clone, Debug, PartialEq)]
pub struct SyntheticHistory {
    /// Precipitation in millimeters.
    pub environment: EnvironmentTable,
    pub production: Vec<ProductionRecord>,
}

/// Yield per unit area under the given conditions.
///
/// The base draw depends on the temperature band, then is scaled by the
/// humidity and precipitation factors. `precipitation_mm` must be in mm.
pub fn yield_simulate<R: Rng + ?Sized>(
    temperature: f64,
    humidity: f64,
    precipitation_mm: f64,
    bands: &YieldBands,
    rng: &mut R,
) -> Result<f64, SimError> {
    let base = bands.band(temperature).sample(rng)?;
    Ok(base * bands.humidity_factor(humidity) * bands.precipitation_factor(precipitation_mm))
}

/// Production records for every year of `environment`.
///
/// Accepts either precipitation unit; the estimate always runs in mm. The
/// output has the same years in the same order as the input.
pub fn compute_production<R: Rng + ?Sized>(
    environment: &EnvironmentTable,
    area_hectares: f64,
    profile: &CropProfile,
    rng: &mut R,
) -> Result<Vec<ProductionRecord>, SimError> {
    validate_area(area_hectares)?;
    profile.validate()?;
    let env = environment.in_unit(PrecipitationUnit::Millimeters);
    ensure_unique_years("environment", &env.rows)?;
    ensure_finite("environment", &env.rows)?;

    let n = env.len();
    let growth_days = profile.growth_days.sample_n(rng, n)?;
    let waste_pct = profile.waste_pct.sample_n(rng, n)?;
    let yield_per_area = env
        .rows
        .iter()
        .map(|r| yield_simulate(r.temperature, r.humidity, r.precipitation, &profile.yield_bands, rng))
        .collect::<Result<Vec<f64>, SimError>>()?;
    let fertilizer = profile.fertilizer.sample_n(rng, n)?;

    let out: Vec<ProductionRecord> = env
        .rows
        .iter()
        .enumerate()
        .map(|(i, r)| ProductionRecord {
            year: r.year,
            growth_days: growth_days[i],
            yield_total: yield_per_area[i] * area_hectares * (100.0 - waste_pct[i]) / 100.0,
            water_consumption: profile
                .water
                .consumption(r.temperature, r.precipitation, area_hectares),
            fertilizer_consumption: fertilizer[i],
        })
        .collect();
    debug!(years = n, crop = %profile.name, "estimated production");
    Ok(out)
}

/// [`compute_production`] with a dedicated seeded RNG.
pub fn compute_production_seeded(
    environment: &EnvironmentTable,
    area_hectares: f64,
    profile: &CropProfile,
    seed: u64,
) -> Result<Vec<ProductionRecord>, SimError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    compute_production(environment, area_hectares, profile, &mut rng)
}

/// Random climate history for `years`, precipitation in mm.
///
/// Temperatures drift upward by the profile's trend across the range and are
/// clamped; precipitation drifts downward by the profile's decline.
pub fn generate_environment<R: Rng + ?Sized>(
    years: RangeInclusive<Year>,
    profile: &CropProfile,
    rng: &mut R,
) -> Result<EnvironmentTable, SimError> {
    if years.is_empty() {
        return Err(SimError::EmptyYears {
            start: *years.start(),
            end: *years.end(),
        });
    }
    profile.validate()?;
    let c = &profile.climate;
    let year_list: Vec<Year> = years.collect();
    let n = year_list.len();
    let temperatures = c.temperature.sample_n(rng, n)?;
    let humidities = c.humidity.sample_n(rng, n)?;
    let precipitations = c.precipitation_mm.sample_n(rng, n)?;
    let warming = linspace(0.0, c.temperature_trend, n);
    let drying = linspace(0.0, c.precipitation_decline_mm, n);

    let rows = year_list
        .into_iter()
        .enumerate()
        .map(|(i, year)| EnvironmentRecord {
            year,
            temperature: (temperatures[i] + warming[i])
                .clamp(c.temperature_clamp.low, c.temperature_clamp.high),
            humidity: humidities[i],
            precipitation: precipitations[i] - drying[i],
        })
        .collect();
    Ok(EnvironmentTable::new(PrecipitationUnit::Millimeters, rows))
}

/// Environment plus production for `years`: the "generate random data" action.
pub fn generate_history<R: Rng + ?Sized>(
    years: RangeInclusive<Year>,
    area_hectares: f64,
    profile: &CropProfile,
    rng: &mut R,
) -> Result<SyntheticHistory, SimError> {
    let environment = generate_environment(years, profile, rng)?;
    let production = compute_production(&environment, area_hectares, profile, rng)?;
    debug!(years = environment.len(), crop = %profile.name, "generated synthetic history");
    Ok(SyntheticHistory {
        environment,
        production,
    })
}
