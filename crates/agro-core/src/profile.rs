//! Crop-specific coefficient tables.
//!
//! A single [`CropProfile`] drives the synthetic environment generator, the
//! production estimator and the economic draws. Presets reproduce the olive
//! grove (default) and the tomato field the dashboard was first built for.

use crate::sampling::{NormalParams, UniformRange};
use crate::ValidationError;
use serde::{Deserialize, Serialize};

/// Ranges used to synthesize a climate history. Precipitation is in millimeters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClimateProfile {
    pub temperature: UniformRange,
    /// Added over the generated years, growing linearly from 0 to this value.
    pub temperature_trend: f64,
    /// Generated temperatures are clamped into `[min, max]`.
    pub temperature_clamp: UniformRange,
    pub humidity: UniformRange,
    pub precipitation_mm: UniformRange,
    /// Subtracted over the generated years, growing linearly from 0 to this value.
    pub precipitation_decline_mm: f64,
}

/// Yield-per-area distributions by temperature band.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct YieldBands {
    /// Temperatures strictly below this are "cold".
    pub cold_below: f64,
    /// Temperatures strictly above this are "hot".
    pub hot_above: f64,
    pub cold: NormalParams,
    pub optimal: NormalParams,
    pub hot: NormalParams,
    pub humidity_reference: f64,
    pub humidity_sensitivity: f64,
    pub precipitation_reference_mm: f64,
    pub precipitation_sensitivity: f64,
}

impl YieldBands {
    /// Distribution for the band that `temperature` falls into.
    pub fn band(&self, temperature: f64) -> NormalParams {
        if temperature < self.cold_below {
            self.cold
        } else if temperature <= self.hot_above {
            self.optimal
        } else {
            self.hot
        }
    }

    pub fn humidity_factor(&self, humidity: f64) -> f64 {
        1.0 + self.humidity_sensitivity * (humidity - self.humidity_reference)
    }

    pub fn precipitation_factor(&self, precipitation_mm: f64) -> f64 {
        1.0 - self.precipitation_sensitivity * (precipitation_mm - self.precipitation_reference_mm)
    }
}

/// Linear irrigation model, clipped, per 10 hectares.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaterModel {
    pub base: f64,
    pub temperature_coeff: f64,
    pub precipitation_coeff: f64,
    pub min: f64,
    pub max: f64,
}

impl WaterModel {
    /// Water requirement for one season over `area_hectares`.
    pub fn consumption(&self, temperature: f64, precipitation_mm: f64, area_hectares: f64) -> f64 {
        let per_unit = (self.base + self.temperature_coeff * temperature
            - self.precipitation_coeff * precipitation_mm)
            .clamp(self.min, self.max);
        per_unit * area_hectares / 10.0
    }
}

/// Distributions of unit prices and costs, drawn once per year.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EconomicProfile {
    pub price_per_unit: UniformRange,
    pub water_unit_cost: NormalParams,
    pub fertilizer_unit_cost: NormalParams,
}

impl EconomicProfile {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.price_per_unit.validate("price_per_unit")?;
        self.water_unit_cost.validate("water_unit_cost")?;
        self.fertilizer_unit_cost.validate("fertilizer_unit_cost")
    }
}

/// Full coefficient table for one crop.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CropProfile {
    pub name: String,
    pub climate: ClimateProfile,
    pub yield_bands: YieldBands,
    pub growth_days: NormalParams,
    pub waste_pct: NormalParams,
    pub water: WaterModel,
    pub fertilizer: NormalParams,
    pub economics: EconomicProfile,
}

impl CropProfile {
    /// Olive grove in eastern Sicily.
    pub fn olive() -> Self {
        Self {
            name: "olive".to_string(),
            climate: ClimateProfile {
                temperature: UniformRange::new(10.0, 35.0),
                temperature_trend: 3.0,
                temperature_clamp: UniformRange::new(5.0, 40.0),
                humidity: UniformRange::new(40.0, 75.0),
                precipitation_mm: UniformRange::new(300.0, 800.0),
                precipitation_decline_mm: 100.0,
            },
            yield_bands: YieldBands {
                cold_below: 10.0,
                hot_above: 30.0,
                cold: NormalParams::new(0.8, 0.2),
                optimal: NormalParams::new(3.0, 0.4),
                hot: NormalParams::new(1.5, 0.3),
                humidity_reference: 60.0,
                humidity_sensitivity: 0.02,
                precipitation_reference_mm: 500.0,
                precipitation_sensitivity: 0.001,
            },
            growth_days: NormalParams::new(160.0, 10.0),
            waste_pct: NormalParams::new(5.0, 1.0),
            water: WaterModel {
                base: 100.0,
                temperature_coeff: 0.3,
                precipitation_coeff: 0.2,
                min: 30.0,
                max: 250.0,
            },
            fertilizer: NormalParams::new(80.0, 15.0),
            economics: EconomicProfile {
                price_per_unit: UniformRange::new(1.0, 3.0),
                water_unit_cost: NormalParams::new(8.0, 2.0),
                fertilizer_unit_cost: NormalParams::new(12.0, 3.0),
            },
        }
    }

    /// Open-field tomatoes.
    pub fn tomato() -> Self {
        Self {
            name: "tomato".to_string(),
            climate: ClimateProfile {
                temperature: UniformRange::new(20.0, 35.0),
                temperature_trend: 5.0,
                temperature_clamp: UniformRange::new(4.0, 44.0),
                humidity: UniformRange::new(40.0, 80.0),
                precipitation_mm: UniformRange::new(500.0, 1000.0),
                precipitation_decline_mm: 200.0,
            },
            yield_bands: YieldBands {
                cold_below: 15.0,
                hot_above: 30.0,
                cold: NormalParams::new(1.0, 0.3),
                optimal: NormalParams::new(3.5, 0.5),
                hot: NormalParams::new(2.0, 0.5),
                humidity_reference: 60.0,
                humidity_sensitivity: 0.02,
                precipitation_reference_mm: 500.0,
                precipitation_sensitivity: 0.001,
            },
            growth_days: NormalParams::new(95.0, 5.0),
            waste_pct: NormalParams::new(5.0, 1.0),
            water: WaterModel {
                base: 250.0,
                temperature_coeff: 0.4,
                precipitation_coeff: 0.3,
                min: 50.0,
                max: 400.0,
            },
            fertilizer: NormalParams::new(100.0, 20.0),
            economics: EconomicProfile {
                price_per_unit: UniformRange::new(100.0, 200.0),
                water_unit_cost: NormalParams::new(10.0, 2.0),
                fertilizer_unit_cost: NormalParams::new(15.0, 3.0),
            },
        }
    }

    /// Validate every distribution and threshold of the profile.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let c = &self.climate;
        c.temperature.validate("climate.temperature")?;
        c.temperature_clamp.validate("climate.temperature_clamp")?;
        c.humidity.validate("climate.humidity")?;
        c.precipitation_mm.validate("climate.precipitation_mm")?;
        if !c.temperature_trend.is_finite() || !c.precipitation_decline_mm.is_finite() {
            return Err(ValidationError::InvalidParameter {
                name: "climate".to_string(),
                reason: "trend values must be finite".to_string(),
            });
        }
        let y = &self.yield_bands;
        y.cold.validate("yield_bands.cold")?;
        y.optimal.validate("yield_bands.optimal")?;
        y.hot.validate("yield_bands.hot")?;
        let coeffs = [
            y.cold_below,
            y.hot_above,
            y.humidity_reference,
            y.humidity_sensitivity,
            y.precipitation_reference_mm,
            y.precipitation_sensitivity,
        ];
        if coeffs.iter().any(|v| !v.is_finite()) {
            return Err(ValidationError::InvalidParameter {
                name: "yield_bands".to_string(),
                reason: "coefficients must be finite".to_string(),
            });
        }
        if y.cold_below > y.hot_above {
            return Err(ValidationError::InvalidParameter {
                name: "yield_bands".to_string(),
                reason: format!("cold_below {} exceeds hot_above {}", y.cold_below, y.hot_above),
            });
        }
        self.growth_days.validate("growth_days")?;
        self.waste_pct.validate("waste_pct")?;
        self.fertilizer.validate("fertilizer")?;
        let w = &self.water;
        if ![w.base, w.temperature_coeff, w.precipitation_coeff, w.min, w.max]
            .iter()
            .all(|v| v.is_finite())
            || w.min > w.max
        {
            return Err(ValidationError::InvalidParameter {
                name: "water".to_string(),
                reason: "coefficients must be finite with min <= max".to_string(),
            });
        }
        self.economics.validate()
    }
}

impl Default for CropProfile {
    fn default() -> Self {
        Self::olive()
    }
}

/// Crop selection as written in configuration files.
///
/// ```yaml
/// crop:
///   kind: tomato
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CropProfileConfig {
    #[default]
    Olive,
    Tomato,
    Custom(CropProfile),
}

impl CropProfileConfig {
    /// Resolve to a validated profile.
    pub fn resolve(&self) -> Result<CropProfile, ValidationError> {
        let profile = match self {
            CropProfileConfig::Olive => CropProfile::olive(),
            CropProfileConfig::Tomato => CropProfile::tomato(),
            CropProfileConfig::Custom(p) => p.clone(),
        };
        profile.validate()?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_validate() {
        CropProfile::olive().validate().unwrap();
        CropProfile::tomato().validate().unwrap();
    }

    #[test]
    fn olive_bands_match_thresholds() {
        let y = CropProfile::olive().yield_bands;
        assert_eq!(y.band(9.99), y.cold);
        assert_eq!(y.band(10.0), y.optimal);
        assert_eq!(y.band(30.0), y.optimal);
        assert_eq!(y.band(30.01), y.hot);
    }

    #[test]
    fn olive_factors() {
        let y = CropProfile::olive().yield_bands;
        assert!((y.humidity_factor(60.0) - 1.0).abs() < 1e-12);
        assert!((y.humidity_factor(70.0) - 1.2).abs() < 1e-12);
        assert!((y.precipitation_factor(600.0) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn water_is_clipped_and_scaled() {
        let w = CropProfile::olive().water;
        // 100 + 6 - 120 = -14 -> clipped to 30
        assert!((w.consumption(20.0, 600.0, 25.0) - 75.0).abs() < 1e-12);
        // 100 + 9 - 20 = 89
        assert!((w.consumption(30.0, 100.0, 10.0) - 89.0).abs() < 1e-12);
    }

    #[test]
    fn inverted_bands_rejected() {
        let mut p = CropProfile::olive();
        p.yield_bands.cold_below = 40.0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn config_tagged_variants() {
        let c: CropProfileConfig = serde_yaml::from_str("kind: tomato").unwrap();
        assert_eq!(c, CropProfileConfig::Tomato);
        assert_eq!(c.resolve().unwrap().name, "tomato");
        let custom = CropProfileConfig::Custom(CropProfile::olive());
        let text = serde_yaml::to_string(&custom).unwrap();
        let back: CropProfileConfig = serde_yaml::from_str(&text).unwrap();
        assert_eq!(back, custom);
    }
}
