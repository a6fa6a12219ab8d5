#![deny(warnings)]

//! Economic indicators: cost, revenue, margin, efficiency and sustainability.
//!
//! This module provides:
//! - Per-year unit price and cost draws from a crop's [`EconomicProfile`]
//! - The pure per-year indicator formula ([`indicators`])
//! - The Year-joined table computation ([`compute_performance`])

use agro_core::{
    ensure_finite, join_on_year, ratio_or_nan, validate_area, EconomicProfile, EnvironmentTable,
    PerformanceRecord, ProductionRecord, ValidationError,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use thiserror::Error;
use tracing::debug;

/// Errors produced by the indicator calculator.
#[derive(Debug, Error, PartialEq)]
pub enum EconError {
    /// Input tables or parameters failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Unit price and costs drawn for one year.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UnitPrices {
    /// Sale price per unit of yield.
    pub price: f64,
    /// Cost per unit of water.
    pub water_cost: f64,
    /// Cost per unit of fertilizer.
    pub fertilizer_cost: f64,
}

/// Draw `years` sets of unit prices, one per year, in order.
///
/// Prices are drawn first for every year, then water costs, then fertilizer
/// costs, so the sequence for a given seed does not depend on the formula.
pub fn draw_unit_prices<R: Rng + ?Sized>(
    years: usize,
    economics: &EconomicProfile,
    rng: &mut R,
) -> Result<Vec<UnitPrices>, EconError> {
    economics.validate()?;
    let prices = economics.price_per_unit.sample_n(rng, years)?;
    let water = economics.water_unit_cost.sample_n(rng, years)?;
    let fertilizer = economics.fertilizer_unit_cost.sample_n(rng, years)?;
    Ok(prices
        .into_iter()
        .zip(water)
        .zip(fertilizer)
        .map(|((price, water_cost), fertilizer_cost)| UnitPrices {
            price,
            water_cost,
            fertilizer_cost,
        })
        .collect())
}

/// Indicators for one year, unrounded.
///
/// Zero denominators produce `NaN` for the affected ratio instead of a fault:
/// `profit_margin` when revenue is zero, `efficiency` when water is zero,
/// `env_sustain` when water plus fertilizer is zero.
///
/// Example:
/// let p = ProductionRecord { year: 2020, growth_days: 160.0, yield_total: 10.0,
///     water_consumption: 5.0, fertilizer_consumption: 5.0 };
/// let u = UnitPrices { price: 2.0, water_cost: 1.0, fertilizer_cost: 1.0 };
/// let r = indicators(&p, u, 10.0);
/// assert_eq!(r.total_price, 200.0);
pub fn indicators(prod: &ProductionRecord, unit: UnitPrices, area_hectares: f64) -> PerformanceRecord {
    let revenue = prod.yield_total * unit.price * area_hectares;
    let cost = prod.water_consumption * unit.water_cost
        + prod.fertilizer_consumption * unit.fertilizer_cost;
    let profit = revenue - cost;
    PerformanceRecord {
        year: prod.year,
        total_cost: cost,
        total_price: revenue,
        gain: profit,
        profit_margin: ratio_or_nan(profit, revenue) * 100.0,
        efficiency: ratio_or_nan(prod.yield_total, prod.water_consumption),
        env_sustain: ratio_or_nan(
            prod.yield_total * 100.0 / area_hectares,
            prod.water_consumption + prod.fertilizer_consumption,
        ),
    }
}

/// Performance indicators for every year of `production`, rounded to 3 decimals.
///
/// `production` and `environment` are joined on Year and must cover exactly
/// the same years; the environment's precipitation unit is irrelevant here.
/// One set of unit prices is drawn per year, assigned in `production` order.
pub fn compute_performance<R: Rng + ?Sized>(
    production: &[ProductionRecord],
    environment: &EnvironmentTable,
    area_hectares: f64,
    economics: &EconomicProfile,
    rng: &mut R,
) -> Result<Vec<PerformanceRecord>, EconError> {
    validate_area(area_hectares)?;
    ensure_finite("production", production)?;
    let joined = join_on_year("production", production, "environment", &environment.rows)?;
    let prices = draw_unit_prices(joined.len(), economics, rng)?;
    let out: Vec<PerformanceRecord> = joined
        .iter()
        .zip(prices)
        .map(|((prod, _env), unit)| indicators(prod, unit, area_hectares).rounded())
        .collect();
    debug!(years = out.len(), area_hectares, "computed performance indicators");
    Ok(out)
}

/// [`compute_performance`] with a dedicated seeded RNG.
pub fn compute_performance_seeded(
    production: &[ProductionRecord],
    environment: &EnvironmentTable,
    area_hectares: f64,
    economics: &EconomicProfile,
    seed: u64,
) -> Result<Vec<PerformanceRecord>, EconError> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    compute_performance(production, environment, area_hectares, economics, &mut rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agro_core::{CropProfile, EnvironmentRecord, PrecipitationUnit, Year};
    use proptest::prelude::*;

    fn prod(year: Year, yield_total: f64, water: f64, fert: f64) -> ProductionRecord {
        ProductionRecord {
            year,
            growth_days: 160.0,
            yield_total,
            water_consumption: water,
            fertilizer_consumption: fert,
        }
    }

    fn env_table(years: &[Year]) -> EnvironmentTable {
        EnvironmentTable::new(
            PrecipitationUnit::Millimeters,
            years
                .iter()
                .map(|&year| EnvironmentRecord {
                    year,
                    temperature: 22.0,
                    humidity: 55.0,
                    precipitation: 600.0,
                })
                .collect(),
        )
    }

    #[test]
    fn formula_matches_definition() {
        let p = prod(2020, 70.0, 75.0, 80.0);
        let u = UnitPrices {
            price: 2.0,
            water_cost: 8.0,
            fertilizer_cost: 12.0,
        };
        let r = indicators(&p, u, 25.0);
        assert_eq!(r.total_price, 3500.0);
        assert_eq!(r.total_cost, 75.0 * 8.0 + 80.0 * 12.0);
        assert_eq!(r.gain, 3500.0 - 1560.0);
        assert!((r.profit_margin - (1940.0 / 3500.0 * 100.0)).abs() < 1e-12);
        assert!((r.efficiency - 70.0 / 75.0).abs() < 1e-12);
        assert!((r.env_sustain - (70.0 * 100.0 / 25.0) / 155.0).abs() < 1e-12);
    }

    #[test]
    fn zero_water_yields_nan_efficiency() {
        let p = prod(2020, 70.0, 0.0, 80.0);
        let u = UnitPrices {
            price: 2.0,
            water_cost: 8.0,
            fertilizer_cost: 12.0,
        };
        let r = indicators(&p, u, 25.0);
        assert!(r.efficiency.is_nan());
        assert!(r.env_sustain.is_finite());
    }

    #[test]
    fn zero_revenue_yields_nan_margin() {
        let p = prod(2020, 0.0, 0.0, 0.0);
        let u = UnitPrices {
            price: 2.0,
            water_cost: 8.0,
            fertilizer_cost: 12.0,
        };
        let r = indicators(&p, u, 25.0);
        assert!(r.profit_margin.is_nan());
        assert!(r.efficiency.is_nan());
        assert!(r.env_sustain.is_nan());
        assert_eq!(r.gain, 0.0);
    }

    #[test]
    fn mismatched_years_fail_loudly() {
        let production = vec![prod(2020, 1.0, 1.0, 1.0), prod(2021, 1.0, 1.0, 1.0)];
        let env = env_table(&[2020, 2022]);
        let err = compute_performance_seeded(
            &production,
            &env,
            25.0,
            &CropProfile::olive().economics,
            1,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            EconError::Validation(ValidationError::YearMismatch { .. })
        ));
    }

    #[test]
    fn non_positive_area_rejected() {
        let production = vec![prod(2020, 1.0, 1.0, 1.0)];
        let env = env_table(&[2020]);
        assert!(compute_performance_seeded(
            &production,
            &env,
            0.0,
            &CropProfile::olive().economics,
            1
        )
        .is_err());
    }

    #[test]
    fn seeded_runs_are_identical_and_rounded() {
        let production = vec![prod(2020, 70.123456, 75.0, 80.0), prod(2021, 65.0, 70.0, 82.0)];
        let env = env_table(&[2020, 2021]);
        let econ = CropProfile::olive().economics;
        let a = compute_performance_seeded(&production, &env, 25.0, &econ, 42).unwrap();
        let b = compute_performance_seeded(&production, &env, 25.0, &econ, 42).unwrap();
        assert_eq!(a, b);
        for r in &a {
            assert_eq!(r.total_price, agro_core::round3(r.total_price));
        }
    }

    #[test]
    fn unit_prices_follow_profile_ranges() {
        let econ = CropProfile::olive().economics;
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let prices = draw_unit_prices(50, &econ, &mut rng).unwrap();
        assert_eq!(prices.len(), 50);
        assert!(prices.iter().all(|u| (1.0..3.0).contains(&u.price)));
    }

    proptest! {
        #[test]
        fn output_years_equal_input_years(years in proptest::collection::btree_set(1990i32..2100, 1..12),
                                          seed in any::<u64>()) {
            let years: Vec<Year> = years.into_iter().rev().collect();
            let production: Vec<ProductionRecord> =
                years.iter().map(|&y| prod(y, 60.0, 70.0, 80.0)).collect();
            let mut env_years = years.clone();
            env_years.sort();
            let env = env_table(&env_years);
            let out = compute_performance_seeded(&production, &env, 25.0,
                &CropProfile::olive().economics, seed).unwrap();
            let out_years: Vec<Year> = out.iter().map(|r| r.year).collect();
            prop_assert_eq!(out_years, years);
        }
    }
}
