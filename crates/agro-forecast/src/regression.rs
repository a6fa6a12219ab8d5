//! Least-squares regression models used by the forecast stages.

use crate::ForecastError;
use nalgebra::{DMatrix, DVector};
use tracing::warn;

/// A model that can be fitted on a feature matrix (one row per observation)
/// and then applied to new rows.
pub trait Regressor: Sized {
    fn fit(features: &DMatrix<f64>, target: &DVector<f64>) -> Result<Self, ForecastError>;

    fn predict(&self, features: &DMatrix<f64>) -> DVector<f64>;
}

/// Ordinary least squares with an intercept.
///
/// Solved on mean-centered data through an SVD, which yields the
/// minimum-norm solution: a constant feature column gets a zero coefficient
/// instead of failing the fit.
#[derive(Clone, Debug, PartialEq)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: DVector<f64>,
}

impl LinearModel {
    /// Prediction for a single observation.
    pub fn predict_one(&self, features: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(features)
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }
}

impl Regressor for LinearModel {
    fn fit(features: &DMatrix<f64>, target: &DVector<f64>) -> Result<Self, ForecastError> {
        let (n, p) = features.shape();
        if n != target.len() {
            return Err(ForecastError::Fit {
                reason: format!("{n} feature rows but {} targets", target.len()),
            });
        }
        if n < 2 || p == 0 {
            return Err(ForecastError::InsufficientHistory { years: n });
        }

        let means: Vec<f64> = features.column_iter().map(|c| c.mean()).collect();
        let mut centered = features.clone();
        for (j, mut col) in centered.column_iter_mut().enumerate() {
            col.add_scalar_mut(-means[j]);
        }
        let y_mean = target.mean();
        let y_centered = target.add_scalar(-y_mean);

        // Constant columns carry no information; they keep a zero slope.
        let active: Vec<usize> = (0..p)
            .filter(|&j| {
                let col = features.column(j);
                col.iter().any(|v| *v != col[0])
            })
            .collect();
        if active.len() < p {
            warn!(constant = p - active.len(), features = p, "constant feature column in fit");
        }
        let mut coefficients = DVector::zeros(p);
        if !active.is_empty() {
            let svd = centered.select_columns(&active).svd(true, true);
            let s_max = svd.singular_values.max();
            let eps = s_max * f64::EPSILON * n.max(p) as f64;
            let rank = svd.singular_values.iter().filter(|s| **s > eps).count();
            if rank < active.len() {
                warn!(rank, features = active.len(), "rank-deficient fit, using minimum-norm solution");
            }
            let solved = svd.solve(&y_centered, eps).map_err(|e| ForecastError::Fit {
                reason: e.to_string(),
            })?;
            for (k, &j) in active.iter().enumerate() {
                coefficients[j] = solved[k];
            }
        }
        let intercept = y_mean
            - coefficients
                .iter()
                .zip(&means)
                .map(|(c, m)| c * m)
                .sum::<f64>();
        Ok(Self {
            intercept,
            coefficients,
        })
    }

    fn predict(&self, features: &DMatrix<f64>) -> DVector<f64> {
        (features * &self.coefficients).add_scalar(self.intercept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recovers_a_line() {
        let x = DMatrix::from_column_slice(4, 1, &[2020.0, 2021.0, 2022.0, 2023.0]);
        let y = DVector::from_vec(vec![1.0, 3.0, 5.0, 7.0]);
        let m = LinearModel::fit(&x, &y).unwrap();
        assert!((m.coefficients[0] - 2.0).abs() < 1e-9);
        assert!((m.predict_one(&[2024.0]) - 9.0).abs() < 1e-7);
    }

    #[test]
    fn recovers_multiple_features() {
        // y = 1 + 2a - b + 0.5c
        let rows = [
            [1.0, 2.0, 3.0],
            [2.0, 1.0, 0.0],
            [0.0, 4.0, 1.0],
            [3.0, 3.0, 5.0],
            [5.0, 0.0, 2.0],
            [4.0, 2.0, 7.0],
        ];
        let x = DMatrix::from_fn(6, 3, |i, j| rows[i][j]);
        let y = DVector::from_iterator(6, rows.iter().map(|r| 1.0 + 2.0 * r[0] - r[1] + 0.5 * r[2]));
        let m = LinearModel::fit(&x, &y).unwrap();
        assert!((m.intercept - 1.0).abs() < 1e-9);
        assert!((m.coefficients[0] - 2.0).abs() < 1e-9);
        assert!((m.coefficients[1] + 1.0).abs() < 1e-9);
        assert!((m.coefficients[2] - 0.5).abs() < 1e-9);
        let pred = m.predict(&x);
        for (a, b) in pred.iter().zip(y.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn constant_feature_gets_zero_slope() {
        let x = DMatrix::from_column_slice(3, 1, &[7.0, 7.0, 7.0]);
        let y = DVector::from_vec(vec![1.0, 2.0, 3.0]);
        let m = LinearModel::fit(&x, &y).unwrap();
        assert_eq!(m.coefficients[0], 0.0);
        assert!((m.intercept - 2.0).abs() < 1e-12);
    }

    #[test]
    fn single_observation_rejected() {
        let x = DMatrix::from_column_slice(1, 1, &[2020.0]);
        let y = DVector::from_vec(vec![1.0]);
        assert!(matches!(
            LinearModel::fit(&x, &y),
            Err(ForecastError::InsufficientHistory { years: 1 })
        ));
    }
}
