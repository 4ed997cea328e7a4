//! Multi-model evaluation and best-model selection

use super::config::TrainerConfig;
use super::models::{ensure_unique_names, r2_score, Candidate, ModelMetrics, Regressor};
use crate::error::{CarPriceError, Result, Stage, StageContext};
use crate::tracking::{MetricsReporter, NoopReporter, RunHandle, RunStatus};
use ndarray::{s, Array1, Array2};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Held-out R² per candidate, in evaluation order
#[derive(Debug, Clone, Default, Serialize)]
pub struct EvaluationReport {
    entries: Vec<(String, f64)>,
}

impl EvaluationReport {
    pub fn push(&mut self, model: impl Into<String>, score: f64) {
        self.entries.push((model.into(), score));
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(name, score)| (name.as_str(), *score))
    }

    pub fn get(&self, model: &str) -> Option<f64> {
        self.iter().find(|(name, _)| *name == model).map(|(_, s)| s)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Index of the highest score; first wins ties and NaN never wins
    pub fn best_index(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (idx, (_, score)) in self.entries.iter().enumerate() {
            if score.is_nan() {
                continue;
            }
            if best.map_or(true, |(_, b)| *score > b) {
                best = Some((idx, *score));
            }
        }
        best.map(|(idx, _)| idx)
    }
}

/// Result of a successful selection
#[derive(Debug, Clone)]
pub struct TrainingOutcome<M> {
    pub best_model_name: String,
    pub best_model: M,
    pub best_score: f64,
    /// Held-out metrics of the selected model
    pub metrics: ModelMetrics,
    pub report: EvaluationReport,
}

/// Split a preprocessed array into features (all but last column) and target (last column)
pub fn split_features_target(arr: &Array2<f64>) -> Result<(Array2<f64>, Array1<f64>)> {
    if arr.ncols() < 2 {
        return Err(CarPriceError::Shape {
            expected: "at least one feature column plus the target".to_string(),
            actual: format!("{} columns", arr.ncols()),
        });
    }
    let last = arr.ncols() - 1;
    Ok((
        arr.slice(s![.., ..last]).to_owned(),
        arr.column(last).to_owned(),
    ))
}

/// Fits every candidate, scores it on held-out data and keeps the best
pub struct ModelTrainer {
    config: TrainerConfig,
    reporter: Arc<dyn MetricsReporter>,
}

impl ModelTrainer {
    pub fn new(config: TrainerConfig) -> Self {
        Self {
            config,
            reporter: Arc::new(NoopReporter),
        }
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn MetricsReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &TrainerConfig {
        &self.config
    }

    /// Train all candidates on `train_arr`, score on `test_arr` and apply the quality gate
    pub fn initiate_model_trainer<M: Regressor>(
        &self,
        train_arr: &Array2<f64>,
        test_arr: &Array2<f64>,
        candidates: Vec<Candidate<M>>,
    ) -> Result<TrainingOutcome<M>> {
        ensure_unique_names(&candidates)?;
        if candidates.is_empty() {
            return Err(CarPriceError::Config("no candidate models given".to_string()));
        }

        let run = self.start_run();
        let result = self.select(train_arr, test_arr, candidates, run.as_ref());

        if let Some(run) = &run {
            let status = if result.is_ok() {
                RunStatus::Finished
            } else {
                RunStatus::Failed
            };
            self.report("end_run", self.reporter.end_run(run, status));
        }
        result
    }

    fn select<M: Regressor>(
        &self,
        train_arr: &Array2<f64>,
        test_arr: &Array2<f64>,
        candidates: Vec<Candidate<M>>,
        run: Option<&RunHandle>,
    ) -> Result<TrainingOutcome<M>> {
        let (x_train, y_train) =
            split_features_target(train_arr).stage(Stage::Training, "splitting train array")?;
        let (x_test, y_test) =
            split_features_target(test_arr).stage(Stage::Training, "splitting test array")?;

        tracing::info!(
            train_rows = x_train.nrows(),
            test_rows = x_test.nrows(),
            n_features = x_train.ncols(),
            n_candidates = candidates.len(),
            "Evaluating candidate models"
        );

        let mut report = EvaluationReport::default();
        let mut fitted: Vec<(String, M, Array1<f64>)> = Vec::with_capacity(candidates.len());

        for Candidate { name, mut estimator } in candidates {
            let start = Instant::now();
            estimator
                .fit(&x_train, &y_train)
                .with_stage(Stage::Training, || format!("fitting '{}'", name))?;
            let y_pred = estimator
                .predict(&x_test)
                .with_stage(Stage::Training, || format!("scoring '{}'", name))?;

            let score = r2_score(&y_test, &y_pred);
            tracing::info!(
                model = %name,
                r2 = score,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Candidate evaluated"
            );
            if let Some(run) = run {
                self.report("log_metric", self.reporter.log_metric(run, &name, "r2", score));
            }

            report.push(name.clone(), score);
            fitted.push((name, estimator, y_pred));
        }

        let best_idx = report.best_index().ok_or_else(|| {
            CarPriceError::Training("no candidate produced a finite score".to_string())
        })?;
        let (best_model_name, best_model, y_pred) = fitted.swap_remove(best_idx);
        let metrics = ModelMetrics::compute_regression(&y_test, &y_pred);
        let best_score = metrics.r2;

        tracing::info!(
            model = %best_model_name,
            r2 = metrics.r2,
            rmse = metrics.rmse,
            mae = metrics.mae,
            "Best model selected"
        );

        if let Some(run) = run {
            self.report("log_param", self.reporter.log_param(run, "best_model", &best_model_name));
            for (key, value) in [("RMSE", metrics.rmse), ("MAE", metrics.mae), ("R2", metrics.r2)] {
                self.report("log_metric", self.reporter.log_metric(run, &best_model_name, key, value));
            }
        }

        let threshold = self.config.acceptance_threshold;
        if best_score < threshold {
            tracing::warn!(
                model = %best_model_name,
                r2 = best_score,
                threshold,
                "Best model below acceptance threshold"
            );
            return Err(CarPriceError::ModelQuality {
                model: best_model_name,
                score: best_score,
                threshold,
            });
        }

        Ok(TrainingOutcome {
            best_model_name,
            best_model,
            best_score,
            metrics,
            report,
        })
    }

    fn start_run(&self) -> Option<RunHandle> {
        match self.reporter.start_run("model_trainer") {
            Ok(run) => Some(run),
            Err(e) => {
                tracing::warn!(error = %e, "Could not start tracking run; continuing without tracking");
                None
            }
        }
    }

    /// Tracking failures never affect selection
    fn report(&self, call: &str, result: Result<()>) {
        if let Err(e) = result {
            tracing::warn!(call, error = %e, "Metrics reporter call failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::LinearRegression;
    use ndarray::array;

    #[test]
    fn test_best_index_first_wins_ties() {
        let mut report = EvaluationReport::default();
        report.push("A", 0.5);
        report.push("B", 0.82);
        report.push("C", 0.82);
        assert_eq!(report.best_index(), Some(1));
    }

    #[test]
    fn test_best_index_skips_nan() {
        let mut report = EvaluationReport::default();
        report.push("A", f64::NAN);
        report.push("B", -3.0);
        assert_eq!(report.best_index(), Some(1));

        let mut all_nan = EvaluationReport::default();
        all_nan.push("A", f64::NAN);
        assert_eq!(all_nan.best_index(), None);
    }

    #[test]
    fn test_split_features_target() {
        let arr = array![[1.0, 2.0, 10.0], [3.0, 4.0, 20.0]];
        let (x, y) = split_features_target(&arr).unwrap();
        assert_eq!(x, array![[1.0, 2.0], [3.0, 4.0]]);
        assert_eq!(y, array![10.0, 20.0]);

        assert!(split_features_target(&array![[1.0], [2.0]]).is_err());
    }

    #[test]
    fn test_linear_candidate_passes_gate() {
        // Column 0 is the feature, column 1 the target y = 3x + 1
        let row = |v: f64, j: usize| if j == 0 { v } else { 3.0 * v + 1.0 };
        let train = Array2::from_shape_fn((20, 2), |(i, j)| row(i as f64, j));
        let test = Array2::from_shape_fn((5, 2), |(i, j)| row(20.0 + i as f64, j));

        let trainer = ModelTrainer::new(TrainerConfig::default());
        let outcome = trainer
            .initiate_model_trainer(
                &train,
                &test,
                vec![Candidate::new("Linear Regression", LinearRegression::new())],
            )
            .unwrap();

        assert_eq!(outcome.best_model_name, "Linear Regression");
        assert!(outcome.best_score > 0.999);
        assert!(outcome.metrics.rmse < 1e-3);
        assert_eq!(outcome.report.len(), 1);
    }
}
