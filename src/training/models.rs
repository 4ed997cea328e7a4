//! Regressor trait, metrics and the candidate model set

use super::decision_tree::DecisionTreeRegressor;
use super::linear_models::LinearRegression;
use super::random_forest::RandomForestRegressor;
use super::svm::{SVMConfig, SVMRegressor};
use super::xgboost::{XGBoostConfig, XGBoostRegressor};
use crate::error::{CarPriceError, Result};
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Regression metrics on a held-out set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    /// Coefficient of determination; 0 when the targets have no variance
    pub r2: f64,
    pub n_samples: usize,
}

impl ModelMetrics {
    /// Compute regression metrics
    pub fn compute_regression(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Self {
        let n = y_true.len() as f64;
        let errors: Vec<f64> = y_true
            .iter()
            .zip(y_pred.iter())
            .map(|(t, p)| t - p)
            .collect();

        let mse: f64 = errors.iter().map(|e| e * e).sum::<f64>() / n;
        let mae: f64 = errors.iter().map(|e| e.abs()).sum::<f64>() / n;

        Self {
            mse,
            rmse: mse.sqrt(),
            mae,
            r2: r2_score(y_true, y_pred),
            n_samples: y_true.len(),
        }
    }
}

/// Coefficient of determination
pub fn r2_score(y_true: &Array1<f64>, y_pred: &Array1<f64>) -> f64 {
    let n = y_true.len() as f64;
    let y_mean: f64 = y_true.iter().sum::<f64>() / n;
    let ss_tot: f64 = y_true.iter().map(|y| (y - y_mean).powi(2)).sum();
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();

    if ss_tot > 0.0 {
        1.0 - ss_res / ss_tot
    } else if ss_res == 0.0 {
        1.0
    } else {
        0.0
    }
}

/// Common contract of every candidate estimator
pub trait Regressor: Send + Sync {
    /// Fit the model to training data
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()>;

    /// Make predictions
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;

    /// Input width seen during `fit`, `None` before fitting
    fn n_features_in(&self) -> Option<usize>;
}

/// Check that `x` matches the width the model was fitted on
pub(crate) fn check_width(expected: Option<usize>, x: &Array2<f64>, model: &str) -> Result<()> {
    match expected {
        None => Err(CarPriceError::NotFitted(model.to_string())),
        Some(n) if n != x.ncols() => Err(CarPriceError::Shape {
            expected: format!("{} features", n),
            actual: format!("{} features", x.ncols()),
        }),
        Some(_) => Ok(()),
    }
}

pub(crate) fn check_lengths(x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
    if x.nrows() != y.len() {
        return Err(CarPriceError::Shape {
            expected: format!("y length = {}", x.nrows()),
            actual: format!("y length = {}", y.len()),
        });
    }
    if x.nrows() == 0 {
        return Err(CarPriceError::Training("cannot fit on zero samples".to_string()));
    }
    Ok(())
}

/// Any of the built-in estimators, in a form that can be persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RegressionModel {
    RandomForest(RandomForestRegressor),
    DecisionTree(DecisionTreeRegressor),
    LinearRegression(LinearRegression),
    SupportVector(SVMRegressor),
    XGBoost(XGBoostRegressor),
}

impl RegressionModel {
    pub fn kind(&self) -> &'static str {
        match self {
            RegressionModel::RandomForest(_) => "random_forest",
            RegressionModel::DecisionTree(_) => "decision_tree",
            RegressionModel::LinearRegression(_) => "linear_regression",
            RegressionModel::SupportVector(_) => "svr",
            RegressionModel::XGBoost(_) => "xgboost",
        }
    }

    fn as_regressor(&self) -> &dyn Regressor {
        match self {
            RegressionModel::RandomForest(m) => m,
            RegressionModel::DecisionTree(m) => m,
            RegressionModel::LinearRegression(m) => m,
            RegressionModel::SupportVector(m) => m,
            RegressionModel::XGBoost(m) => m,
        }
    }

    fn as_regressor_mut(&mut self) -> &mut dyn Regressor {
        match self {
            RegressionModel::RandomForest(m) => m,
            RegressionModel::DecisionTree(m) => m,
            RegressionModel::LinearRegression(m) => m,
            RegressionModel::SupportVector(m) => m,
            RegressionModel::XGBoost(m) => m,
        }
    }
}

impl Regressor for RegressionModel {
    fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        self.as_regressor_mut().fit(x, y)
    }

    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        self.as_regressor().predict(x)
    }

    fn n_features_in(&self) -> Option<usize> {
        self.as_regressor().n_features_in()
    }
}

/// A named, unfitted estimator
#[derive(Debug, Clone)]
pub struct Candidate<M> {
    pub name: String,
    pub estimator: M,
}

impl<M> Candidate<M> {
    pub fn new(name: impl Into<String>, estimator: M) -> Self {
        Self {
            name: name.into(),
            estimator,
        }
    }
}

/// Reject candidate lists with repeated names
pub fn ensure_unique_names<M>(candidates: &[Candidate<M>]) -> Result<()> {
    let mut seen = HashSet::new();
    for candidate in candidates {
        if !seen.insert(candidate.name.as_str()) {
            return Err(CarPriceError::Config(format!(
                "duplicate candidate name '{}'",
                candidate.name
            )));
        }
    }
    Ok(())
}

/// The standard candidate set, in evaluation order
pub fn default_candidates(random_state: u64) -> Vec<Candidate<RegressionModel>> {
    vec![
        Candidate::new(
            "Random Forest",
            RegressionModel::RandomForest(
                RandomForestRegressor::new(100).with_random_state(random_state),
            ),
        ),
        Candidate::new(
            "Decision Tree",
            RegressionModel::DecisionTree(DecisionTreeRegressor::new().with_random_state(random_state)),
        ),
        Candidate::new(
            "Linear Regression",
            RegressionModel::LinearRegression(LinearRegression::new()),
        ),
        Candidate::new(
            "Support Vector Regressor",
            RegressionModel::SupportVector(SVMRegressor::new(SVMConfig::default())),
        ),
        Candidate::new(
            "XGBoost",
            RegressionModel::XGBoost(XGBoostRegressor::new(XGBoostConfig {
                random_state: Some(random_state),
                ..XGBoostConfig::default()
            })),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_regression_metrics() {
        let y_true = array![1.0, 2.0, 3.0, 4.0, 5.0];
        let y_pred = array![1.1, 2.0, 2.9, 4.1, 5.0];

        let metrics = ModelMetrics::compute_regression(&y_true, &y_pred);

        assert!((metrics.mse - 0.006).abs() < 1e-9);
        assert!((metrics.mae - 0.06).abs() < 1e-9);
        assert!(metrics.r2 > 0.99);
    }

    #[test]
    fn test_r2_constant_target_is_zero() {
        let y = array![3.0, 3.0, 3.0];
        assert_eq!(r2_score(&y, &array![1.0, 2.0, 3.0]), 0.0);
    }

    #[test]
    fn test_r2_constant_target_exact_fit_is_one() {
        let y = array![3.0, 3.0, 3.0];
        assert_eq!(r2_score(&y, &y.clone()), 1.0);
    }

    #[test]
    fn test_default_candidate_order() {
        let names: Vec<String> = default_candidates(42).into_iter().map(|c| c.name).collect();
        assert_eq!(
            names,
            vec![
                "Random Forest",
                "Decision Tree",
                "Linear Regression",
                "Support Vector Regressor",
                "XGBoost"
            ]
        );
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let candidates = vec![
            Candidate::new("A", LinearRegression::new()),
            Candidate::new("A", LinearRegression::new()),
        ];
        assert!(matches!(
            ensure_unique_names(&candidates),
            Err(CarPriceError::Config(_))
        ));
    }

    #[test]
    fn test_unfitted_model_reports_no_width() {
        let model = RegressionModel::LinearRegression(LinearRegression::new());
        assert_eq!(model.n_features_in(), None);
        assert!(matches!(
            model.predict(&array![[1.0]]),
            Err(CarPriceError::NotFitted(_))
        ));
    }
}
