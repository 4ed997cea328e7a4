//! Epsilon-insensitive support vector regression
//!
//! The dual is solved by cyclic coordinate descent on `beta = alpha - alpha*`
//! with box constraints `[-C, C]`. Targets are centered so the bias is the
//! training mean.

use super::models::{check_lengths, check_width, Regressor};
use crate::error::{CarPriceError, Result};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Maximum number of samples for eager kernel matrix computation.
const MAX_KERNEL_MATRIX_SAMPLES: usize = 10_000;

/// RBF width
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Gamma {
    /// `1 / (n_features * var(X))`
    Scale,
    Value(f64),
}

/// Kernel function type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum KernelType {
    /// Linear kernel: K(x, y) = x · y
    Linear,
    /// Radial Basis Function (Gaussian): K(x, y) = exp(-γ * ||x - y||²)
    Rbf { gamma: Gamma },
}

/// SVM configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SVMConfig {
    /// Regularization parameter (C)
    pub c: f64,
    pub kernel: KernelType,
    /// Stop when no coefficient moves more than this in a sweep
    pub tol: f64,
    /// Maximum number of sweeps
    pub max_iter: usize,
    /// Tube width
    pub epsilon: f64,
}

impl Default for SVMConfig {
    fn default() -> Self {
        Self {
            c: 1.0,
            kernel: KernelType::Rbf { gamma: Gamma::Scale },
            tol: 1e-3,
            max_iter: 1000,
            epsilon: 0.1,
        }
    }
}

/// Support Vector Regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SVMRegressor {
    config: SVMConfig,
    /// Resolved RBF gamma after fit
    gamma: f64,
    support_vectors: Option<Array2<f64>>,
    dual_coef: Array1<f64>,
    bias: f64,
    n_features: usize,
}

impl SVMRegressor {
    /// Create a new SVM regressor
    pub fn new(config: SVMConfig) -> Self {
        Self {
            config,
            gamma: 1.0,
            support_vectors: None,
            dual_coef: Array1::zeros(0),
            bias: 0.0,
            n_features: 0,
        }
    }

    /// Get number of support vectors
    pub fn n_support_vectors(&self) -> usize {
        self.support_vectors.as_ref().map(|sv| sv.nrows()).unwrap_or(0)
    }

    fn resolve_gamma(&self, x: &Array2<f64>) -> f64 {
        match self.config.kernel {
            KernelType::Linear => 0.0,
            KernelType::Rbf {
                gamma: Gamma::Value(g),
            } => g,
            KernelType::Rbf { gamma: Gamma::Scale } => {
                let var = x.var(0.0);
                if var > 0.0 && x.ncols() > 0 {
                    1.0 / (x.ncols() as f64 * var)
                } else {
                    1.0
                }
            }
        }
    }

    fn kernel(&self, a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
        match self.config.kernel {
            KernelType::Linear => a.dot(&b),
            KernelType::Rbf { .. } => {
                let norm_sq: f64 = a.iter().zip(b.iter()).map(|(u, v)| (u - v).powi(2)).sum();
                (-self.gamma * norm_sq).exp()
            }
        }
    }

    fn compute_kernel_matrix(&self, x: &Array2<f64>) -> Array2<f64> {
        let n = x.nrows();
        let rows: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|i| (0..n).map(|j| self.kernel(x.row(i), x.row(j))).collect())
            .collect();

        let mut k = Array2::zeros((n, n));
        for (i, row) in rows.into_iter().enumerate() {
            for (j, v) in row.into_iter().enumerate() {
                k[[i, j]] = v;
            }
        }
        k
    }
}

fn soft_threshold(value: f64, threshold: f64) -> f64 {
    if value > threshold {
        value - threshold
    } else if value < -threshold {
        value + threshold
    } else {
        0.0
    }
}

impl Regressor for SVMRegressor {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        check_lengths(x, y)?;
        let n = x.nrows();

        if n > MAX_KERNEL_MATRIX_SAMPLES {
            return Err(CarPriceError::Training(format!(
                "Dataset has {} samples, exceeding the maximum {} for SVR kernel matrix",
                n, MAX_KERNEL_MATRIX_SAMPLES
            )));
        }

        self.gamma = self.resolve_gamma(x);
        let kernel_matrix = self.compute_kernel_matrix(x);

        let y_mean = y.mean().unwrap_or(0.0);
        let target = y - y_mean;
        let c = self.config.c;
        let eps = self.config.epsilon;

        let mut beta = Array1::<f64>::zeros(n);
        // f = K * beta
        let mut f = Array1::<f64>::zeros(n);

        for _ in 0..self.config.max_iter {
            let mut max_change: f64 = 0.0;

            for i in 0..n {
                let k_ii = kernel_matrix[[i, i]];
                if k_ii <= 0.0 {
                    continue;
                }
                let residual = target[i] - f[i] + k_ii * beta[i];
                let updated = (soft_threshold(residual, eps) / k_ii).clamp(-c, c);
                let delta = updated - beta[i];
                if delta != 0.0 {
                    f.scaled_add(delta, &kernel_matrix.row(i));
                    beta[i] = updated;
                    max_change = max_change.max(delta.abs());
                }
            }

            if max_change < self.config.tol {
                break;
            }
        }

        let support: Vec<usize> = (0..n).filter(|&i| beta[i].abs() > 1e-12).collect();
        self.support_vectors = Some(x.select(Axis(0), &support));
        self.dual_coef = support.iter().map(|&i| beta[i]).collect();
        self.bias = y_mean;
        self.n_features = x.ncols();
        Ok(())
    }

    /// Predict target values
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        check_width(self.n_features_in(), x, "SVMRegressor")?;
        let sv = self
            .support_vectors
            .as_ref()
            .ok_or_else(|| CarPriceError::NotFitted("SVMRegressor".to_string()))?;

        let predictions: Vec<f64> = (0..x.nrows())
            .into_par_iter()
            .map(|i| {
                let row = x.row(i);
                self.bias
                    + sv
                        .rows()
                        .into_iter()
                        .zip(self.dual_coef.iter())
                        .map(|(s, &coef)| coef * self.kernel(row, s))
                        .sum::<f64>()
            })
            .collect();

        Ok(Array1::from_vec(predictions))
    }

    fn n_features_in(&self) -> Option<usize> {
        self.support_vectors.as_ref().map(|_| self.n_features)
    }
}
