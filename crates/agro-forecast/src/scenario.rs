//! What-if recompute of a forecast slice under a user-chosen climate value.

use crate::ForecastError;
use agro_core::{
    join_on_year, round3, CropProfile, EnvField, ForecastRecord, ForecastTable, ValidationError,
};
use agro_sim::compute_production;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Replace one environment field with `value` on every row of a slice.
///
/// `value` is expressed in the slice's own precipitation unit.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnvOverride {
    pub field: EnvField,
    pub value: f64,
}

/// Re-estimate production for `slice` with one environment field overridden.
///
/// No model is refit: the production estimator runs directly on the
/// overridden climate. The result has the slice's unit, row count and year
/// order. Fields other than the overridden one are copied unchanged; the
/// production columns are rounded to 3 decimals.
///
/// Example:
/// let next = forecast.earliest_year_slice();
/// let o = EnvOverride { field: EnvField::Temperature, value: 32.0 };
/// let hot = recompute_with_override(&next, o, 25.0, &CropProfile::olive(), &mut rng)?;
pub fn recompute_with_override<R: Rng + ?Sized>(
    slice: &ForecastTable,
    over: EnvOverride,
    area_hectares: f64,
    profile: &CropProfile,
    rng: &mut R,
) -> Result<ForecastTable, ForecastError> {
    if slice.is_empty() {
        return Err(ValidationError::EmptyTable("forecast slice").into());
    }
    if !over.value.is_finite() {
        return Err(ValidationError::InvalidParameter {
            name: over.field.column().to_string(),
            reason: format!("override value must be finite, got {}", over.value),
        }
        .into());
    }

    let mut environment = slice.environment();
    for row in &mut environment.rows {
        row.set(over.field, over.value);
    }
    let production = compute_production(&environment, area_hectares, profile, rng)?;
    let rows = join_on_year("environment", &environment.rows, "production", &production)?
        .into_iter()
        .map(|(env, prod)| {
            let mut record = ForecastRecord::from_parts(env, prod);
            record.growth_days = round3(record.growth_days);
            record.yield_total = round3(record.yield_total);
            record.water_consumption = round3(record.water_consumption);
            record.fertilizer_consumption = round3(record.fertilizer_consumption);
            record
        })
        .collect();
    debug!(field = %over.field, value = over.value, rows = slice.len(), "recomputed scenario");
    Ok(ForecastTable::new(slice.unit, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agro_core::{PrecipitationUnit, Year};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn record(year: Year, t: f64, h: f64, p: f64) -> ForecastRecord {
        ForecastRecord {
            year,
            temperature: t,
            humidity: h,
            precipitation: p,
            growth_days: 160.0,
            yield_total: 70.0,
            water_consumption: 75.0,
            fertilizer_consumption: 80.0,
        }
    }

    fn slice() -> ForecastTable {
        ForecastTable::new(
            PrecipitationUnit::Centimeters,
            vec![record(2025, 24.7123456, 55.3, 60.3), record(2026, 24.9, 56.1, 61.7)],
        )
    }

    #[test]
    fn only_the_overridden_field_changes() {
        let input = slice();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let over = EnvOverride {
            field: EnvField::Temperature,
            value: 32.0,
        };
        let out = recompute_with_override(&input, over, 25.0, &CropProfile::olive(), &mut rng).unwrap();
        assert_eq!(out.unit, PrecipitationUnit::Centimeters);
        assert_eq!(out.len(), input.len());
        for (a, b) in out.rows.iter().zip(&input.rows) {
            assert_eq!(a.year, b.year);
            assert_eq!(a.temperature, 32.0);
            assert_eq!(a.humidity.to_bits(), b.humidity.to_bits());
            assert_eq!(a.precipitation.to_bits(), b.precipitation.to_bits());
            assert_eq!(a.yield_total, round3(a.yield_total));
        }
    }

    #[test]
    fn precipitation_override_uses_slice_unit() {
        let profile = CropProfile::olive();
        let over = EnvOverride {
            field: EnvField::Precipitation,
            value: 35.0,
        };
        let out = recompute_with_override(
            &slice(),
            over,
            25.0,
            &profile,
            &mut ChaCha8Rng::seed_from_u64(1),
        )
        .unwrap();
        assert!(out.rows.iter().all(|r| r.precipitation == 35.0));
        // 35 cm = 350 mm drives the water model, not 35 mm.
        let expected = round3(profile.water.consumption(24.7123456, 350.0, 25.0));
        assert_eq!(out.rows[0].water_consumption, expected);
        assert_eq!(
            out.rows[1].temperature.to_bits(),
            slice().rows[1].temperature.to_bits()
        );
    }

    #[test]
    fn seeded_recompute_is_reproducible() {
        let over = EnvOverride {
            field: EnvField::Humidity,
            value: 70.0,
        };
        let profile = CropProfile::tomato();
        let a = recompute_with_override(&slice(), over, 25.0, &profile, &mut ChaCha8Rng::seed_from_u64(8));
        let b = recompute_with_override(&slice(), over, 25.0, &profile, &mut ChaCha8Rng::seed_from_u64(8));
        assert_eq!(a.unwrap(), b.unwrap());
    }

    #[test]
    fn bad_inputs_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let over = EnvOverride {
            field: EnvField::Temperature,
            value: f64::NAN,
        };
        assert!(recompute_with_override(&slice(), over, 25.0, &CropProfile::olive(), &mut rng).is_err());
        let empty = ForecastTable::new(PrecipitationUnit::Centimeters, vec![]);
        let over = EnvOverride {
            field: EnvField::Temperature,
            value: 25.0,
        };
        assert!(matches!(
            recompute_with_override(&empty, over, 25.0, &CropProfile::olive(), &mut rng),
            Err(ForecastError::Validation(ValidationError::EmptyTable(_)))
        ));
    }
}
