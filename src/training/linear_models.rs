//! Ordinary least squares regression

use super::models::{check_lengths, check_width, Regressor};
use crate::error::{CarPriceError, Result};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

/// Relative diagonal jitter keeping X^T X positive definite when one-hot
/// blocks make it rank deficient
const RIDGE_JITTER: f64 = 1e-8;

/// Solve symmetric positive-definite system Ax = b using Cholesky decomposition.
fn cholesky_solve(a: &Array2<f64>, b: &Array1<f64>) -> Option<Array1<f64>> {
    let n = a.nrows();
    if n != a.ncols() || n != b.len() {
        return None;
    }

    // A = L * L^T
    let mut l = Array2::<f64>::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let mut sum = 0.0;
            for k in 0..j {
                sum += l[[i, k]] * l[[j, k]];
            }
            if i == j {
                let diag = a[[i, i]] - sum;
                if diag <= 0.0 {
                    return None;
                }
                l[[i, j]] = diag.sqrt();
            } else {
                l[[i, j]] = (a[[i, j]] - sum) / l[[j, j]];
            }
        }
    }

    // L * y = b
    let mut y = Array1::<f64>::zeros(n);
    for i in 0..n {
        let mut sum = 0.0;
        for j in 0..i {
            sum += l[[i, j]] * y[j];
        }
        y[i] = (b[i] - sum) / l[[i, i]];
    }

    // L^T * x = y
    let mut x = Array1::<f64>::zeros(n);
    for i in (0..n).rev() {
        let mut sum = 0.0;
        for j in (i + 1)..n {
            sum += l[[j, i]] * x[j];
        }
        x[i] = (y[i] - sum) / l[[i, i]];
    }

    Some(x)
}

/// Solve (X^T X + jitter * I) w = X^T y
fn solve_normal_equations(x: &Array2<f64>, y: &Array1<f64>) -> Option<Array1<f64>> {
    let mut xtx = x.t().dot(x);
    let xty = x.t().dot(y);
    let n = xtx.nrows();
    if n == 0 {
        return Some(Array1::zeros(0));
    }

    let mean_diag = xtx.diag().iter().map(|v| v.abs()).sum::<f64>() / n as f64;
    let mut ridge = RIDGE_JITTER * mean_diag.max(1.0);
    for _ in 0..6 {
        let mut regularized = xtx.clone();
        for k in 0..n {
            regularized[[k, k]] += ridge;
        }
        if let Some(w) = cholesky_solve(&regularized, &xty) {
            return Some(w);
        }
        ridge *= 100.0;
    }

    // Last resort: leave xtx as is but heavily damped
    for k in 0..n {
        xtx[[k, k]] += ridge;
    }
    cholesky_solve(&xtx, &xty)
}

/// Linear regression model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegression {
    /// Fitted coefficients (weights)
    pub coefficients: Option<Array1<f64>>,
    /// Fitted intercept (bias)
    pub intercept: f64,
    /// Whether to fit intercept
    pub fit_intercept: bool,
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl LinearRegression {
    /// Create a new linear regression model
    pub fn new() -> Self {
        Self {
            coefficients: None,
            intercept: 0.0,
            fit_intercept: true,
        }
    }

    /// Enable/disable fitting intercept
    pub fn with_fit_intercept(mut self, fit_intercept: bool) -> Self {
        self.fit_intercept = fit_intercept;
        self
    }
}

impl Regressor for LinearRegression {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_lengths(x, y)?;

        let (x_centered, y_centered, x_mean, y_mean) = if self.fit_intercept {
            let x_mean = x
                .mean_axis(Axis(0))
                .unwrap_or_else(|| Array1::zeros(x.ncols()));
            let y_mean = y.mean().unwrap_or(0.0);
            let x_centered = x - &x_mean.view().insert_axis(Axis(0));
            let y_centered = y - y_mean;
            (x_centered, y_centered, x_mean, y_mean)
        } else {
            (x.clone(), y.clone(), Array1::zeros(x.ncols()), 0.0)
        };

        let coefficients = solve_normal_equations(&x_centered, &y_centered).ok_or_else(|| {
            CarPriceError::Training("normal equations could not be solved".to_string())
        })?;

        self.intercept = y_mean - coefficients.dot(&x_mean);
        self.coefficients = Some(coefficients);
        Ok(())
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_width(self.n_features_in(), x, "LinearRegression")?;
        let coefficients = self
            .coefficients
            .as_ref()
            .ok_or_else(|| CarPriceError::NotFitted("LinearRegression".to_string()))?;
        Ok(x.dot(coefficients) + self.intercept)
    }

    fn n_features_in(&self) -> Option<usize> {
        self.coefficients.as_ref().map(|c| c.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_recovers_exact_linear_relation() {
        let x = array![[1.0, 0.0], [2.0, 1.0], [3.0, 0.0], [4.0, 1.0], [5.0, 3.0]];
        let y = x.column(0).mapv(|v| 2.0 * v) + x.column(1).mapv(|v| -3.0 * v) + 1.0;

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();

        let coef = model.coefficients.as_ref().unwrap();
        assert!((coef[0] - 2.0).abs() < 1e-4);
        assert!((coef[1] + 3.0).abs() < 1e-4);
        assert!((model.intercept - 1.0).abs() < 1e-4);
        assert_eq!(model.n_features_in(), Some(2));
    }

    #[test]
    fn test_collinear_columns_still_fit() {
        // Second column duplicates the first, as one-hot blocks do
        let x = array![[1.0, 1.0], [0.0, 0.0], [1.0, 1.0], [0.0, 0.0]];
        let y = array![10.0, 2.0, 10.0, 2.0];

        let mut model = LinearRegression::new();
        model.fit(&x, &y).unwrap();
        let preds = model.predict(&x).unwrap();

        for (p, t) in preds.iter().zip(y.iter()) {
            assert!((p - t).abs() < 1e-3, "prediction {} vs {}", p, t);
        }
    }

    #[test]
    fn test_width_mismatch() {
        let mut model = LinearRegression::new();
        model.fit(&array![[1.0], [2.0]], &array![1.0, 2.0]).unwrap();
        assert!(matches!(
            model.predict(&array![[1.0, 2.0]]),
            Err(CarPriceError::Shape { .. })
        ));
    }
}
