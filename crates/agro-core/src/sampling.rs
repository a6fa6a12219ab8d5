//! Parameterized random draws shared by the generators and estimators.

use crate::ValidationError;
use rand::distributions::Distribution;
use rand::Rng;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;

/// Gaussian distribution parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalParams {
    pub mean: f64,
    pub std_dev: f64,
}

impl NormalParams {
    pub const fn new(mean: f64, std_dev: f64) -> Self {
        Self { mean, std_dev }
    }

    pub fn validate(&self, name: &str) -> Result<(), ValidationError> {
        if !self.mean.is_finite() || !self.std_dev.is_finite() {
            return Err(invalid(name, "mean and std_dev must be finite"));
        }
        if self.std_dev < 0.0 {
            return Err(invalid(name, "std_dev must be >= 0"));
        }
        Ok(())
    }

    /// One draw. A zero standard deviation returns the mean without touching the RNG.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64, ValidationError> {
        self.validate("normal")?;
        if self.std_dev == 0.0 {
            return Ok(self.mean);
        }
        let dist = Normal::new(self.mean, self.std_dev)
            .map_err(|e| invalid("normal", &e.to_string()))?;
        Ok(dist.sample(rng))
    }

    /// `n` independent draws.
    pub fn sample_n<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Result<Vec<f64>, ValidationError> {
        (0..n).map(|_| self.sample(rng)).collect()
    }
}

/// Continuous uniform range `[low, high)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct UniformRange {
    pub low: f64,
    pub high: f64,
}

impl UniformRange {
    pub const fn new(low: f64, high: f64) -> Self {
        Self { low, high }
    }

    pub fn validate(&self, name: &str) -> Result<(), ValidationError> {
        if !self.low.is_finite() || !self.high.is_finite() {
            return Err(invalid(name, "bounds must be finite"));
        }
        if self.low > self.high {
            return Err(invalid(name, "low must be <= high"));
        }
        Ok(())
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<f64, ValidationError> {
        self.validate("uniform")?;
        if self.low == self.high {
            return Ok(self.low);
        }
        Ok(rng.gen_range(self.low..self.high))
    }

    pub fn sample_n<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Result<Vec<f64>, ValidationError> {
        (0..n).map(|_| self.sample(rng)).collect()
    }
}

/// `n` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => vec![],
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            (0..n).map(|i| start + step * i as f64).collect()
        }
    }
}

fn invalid(name: &str, reason: &str) -> ValidationError {
    ValidationError::InvalidParameter {
        name: name.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn normal_is_seeded() {
        let p = NormalParams::new(160.0, 10.0);
        let a = p.sample_n(&mut ChaCha8Rng::seed_from_u64(7), 5).unwrap();
        let b = p.sample_n(&mut ChaCha8Rng::seed_from_u64(7), 5).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn zero_std_is_exact() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert_eq!(NormalParams::new(3.5, 0.0).sample(&mut rng).unwrap(), 3.5);
    }

    #[test]
    fn negative_std_rejected() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(NormalParams::new(1.0, -1.0).sample(&mut rng).is_err());
    }

    #[test]
    fn uniform_stays_in_range() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let r = UniformRange::new(1.0, 3.0);
        for v in r.sample_n(&mut rng, 200).unwrap() {
            assert!((1.0..3.0).contains(&v));
        }
        assert!(UniformRange::new(3.0, 1.0).validate("price").is_err());
    }

    #[test]
    fn linspace_endpoints() {
        assert_eq!(linspace(0.0, 100.0, 5), vec![0.0, 25.0, 50.0, 75.0, 100.0]);
        assert_eq!(linspace(0.0, 3.0, 1), vec![0.0]);
        assert!(linspace(0.0, 3.0, 0).is_empty());
    }
}
