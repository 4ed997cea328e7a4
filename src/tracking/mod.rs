//! Experiment tracking
//!
//! Training runs report per-candidate scores and the selected model to a
//! [`MetricsReporter`]. Tracking is optional: without a [`TrackingConfig`]
//! every call goes to [`NoopReporter`].

mod mlflow;
mod storage;

pub use mlflow::MlflowReporter;
pub use storage::{LocalTracker, RunRecord};

use crate::error::{CarPriceError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Where and how to report training runs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// `http(s)://` for an MLflow server, `file://<dir>` or a plain path for local JSON runs
    pub tracking_uri: String,
    pub username: Option<String>,
    /// Name of the environment variable holding the password
    pub password_secret_ref: Option<String>,
}

impl TrackingConfig {
    pub fn new(tracking_uri: impl Into<String>) -> Self {
        Self {
            tracking_uri: tracking_uri.into(),
            ..Default::default()
        }
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password_secret_ref: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password_secret_ref = Some(password_secret_ref.into());
        self
    }

    /// Read the password from the environment variable named by `password_secret_ref`
    pub fn resolve_password(&self) -> Result<Option<String>> {
        match &self.password_secret_ref {
            None => Ok(None),
            Some(var) => std::env::var(var).map(Some).map_err(|_| {
                CarPriceError::Tracking(format!(
                    "password_secret_ref points to unset environment variable {}",
                    var
                ))
            }),
        }
    }
}

/// Terminal state of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

impl RunStatus {
    pub fn as_mlflow(&self) -> &'static str {
        match self {
            RunStatus::Running => "RUNNING",
            RunStatus::Finished => "FINISHED",
            RunStatus::Failed => "FAILED",
        }
    }
}

/// Identifies a run across reporter calls
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunHandle {
    pub run_id: String,
    pub run_name: String,
    pub started_at: DateTime<Utc>,
}

impl RunHandle {
    pub fn new(run_name: impl Into<String>) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            run_name: run_name.into(),
            started_at: Utc::now(),
        }
    }
}

/// Sink for run parameters and metrics
pub trait MetricsReporter: Send + Sync {
    fn start_run(&self, run_name: &str) -> Result<RunHandle>;

    fn log_param(&self, run: &RunHandle, key: &str, value: &str) -> Result<()>;

    /// Record `metric` for `model`; use an empty model name for run-level metrics
    fn log_metric(&self, run: &RunHandle, model: &str, metric: &str, value: f64) -> Result<()>;

    fn end_run(&self, run: &RunHandle, status: RunStatus) -> Result<()>;
}

/// Reporter that discards everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl MetricsReporter for NoopReporter {
    fn start_run(&self, run_name: &str) -> Result<RunHandle> {
        Ok(RunHandle::new(run_name))
    }

    fn log_param(&self, _run: &RunHandle, _key: &str, _value: &str) -> Result<()> {
        Ok(())
    }

    fn log_metric(&self, _run: &RunHandle, _model: &str, _metric: &str, _value: f64) -> Result<()> {
        Ok(())
    }

    fn end_run(&self, _run: &RunHandle, _status: RunStatus) -> Result<()> {
        Ok(())
    }
}

/// Pick a reporter implementation for the configured URI
pub fn build_reporter(config: Option<&TrackingConfig>) -> Result<Arc<dyn MetricsReporter>> {
    let Some(config) = config else {
        return Ok(Arc::new(NoopReporter));
    };

    let uri = config.tracking_uri.trim();
    if uri.starts_with("http://") || uri.starts_with("https://") {
        tracing::info!(uri, "Reporting runs to MLflow");
        Ok(Arc::new(MlflowReporter::new(config)?))
    } else if uri.is_empty() {
        Err(CarPriceError::Config("tracking_uri must not be empty".to_string()))
    } else {
        let dir = uri.strip_prefix("file://").unwrap_or(uri);
        tracing::info!(dir, "Recording runs locally");
        Ok(Arc::new(LocalTracker::new(dir)?))
    }
}

/// Metric key used for per-model metrics, e.g. `Random Forest/r2`
pub(crate) fn metric_key(model: &str, metric: &str) -> String {
    if model.is_empty() {
        metric.to_string()
    } else {
        format!("{}/{}", model, metric)
    }
}
