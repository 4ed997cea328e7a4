//! MLflow REST reporter

use super::{metric_key, MetricsReporter, RunHandle, RunStatus, TrackingConfig};
use crate::error::{CarPriceError, Result};
use chrono::Utc;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const DEFAULT_EXPERIMENT_ID: &str = "0";

#[derive(Debug, Deserialize)]
struct CreateRunResponse {
    run: CreatedRun,
}

#[derive(Debug, Deserialize)]
struct CreatedRun {
    info: CreatedRunInfo,
}

#[derive(Debug, Deserialize)]
struct CreatedRunInfo {
    run_id: String,
}

/// Reports runs to an MLflow tracking server over its REST API
pub struct MlflowReporter {
    client: Client,
    base_url: String,
    experiment_id: String,
    username: Option<String>,
    password: Option<String>,
}

impl MlflowReporter {
    pub fn new(config: &TrackingConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| CarPriceError::Tracking(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.tracking_uri.trim().trim_end_matches('/').to_string(),
            experiment_id: DEFAULT_EXPERIMENT_ID.to_string(),
            username: config.username.clone(),
            password: config.resolve_password()?,
        })
    }

    pub fn with_experiment_id(mut self, experiment_id: impl Into<String>) -> Self {
        self.experiment_id = experiment_id.into();
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/2.0/mlflow/{}", self.base_url, path)
    }

    fn post(&self, path: &str, body: Value) -> Result<reqwest::blocking::Response> {
        let mut request = self.client.post(self.endpoint(path)).json(&body);
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_deref());
        }

        let response = request
            .send()
            .map_err(|e| CarPriceError::Tracking(format!("{}: {}", path, e)))?;

        if !response.status().is_success() {
            return Err(CarPriceError::Tracking(format!(
                "{} returned HTTP {}",
                path,
                response.status()
            )));
        }
        Ok(response)
    }
}

impl MetricsReporter for MlflowReporter {
    fn start_run(&self, run_name: &str) -> Result<RunHandle> {
        let mut handle = RunHandle::new(run_name);
        let response = self.post(
            "runs/create",
            json!({
                "experiment_id": self.experiment_id,
                "run_name": run_name,
                "start_time": handle.started_at.timestamp_millis(),
            }),
        )?;
        let created: CreateRunResponse = response
            .json()
            .map_err(|e| CarPriceError::Tracking(format!("runs/create: {}", e)))?;

        handle.run_id = created.run.info.run_id;
        tracing::debug!(run_id = %handle.run_id, "MLflow run created");
        Ok(handle)
    }

    fn log_param(&self, run: &RunHandle, key: &str, value: &str) -> Result<()> {
        self.post(
            "runs/log-parameter",
            json!({ "run_id": run.run_id, "key": key, "value": value }),
        )?;
        Ok(())
    }

    fn log_metric(&self, run: &RunHandle, model: &str, metric: &str, value: f64) -> Result<()> {
        self.post(
            "runs/log-metric",
            json!({
                "run_id": run.run_id,
                "key": metric_key(model, metric),
                "value": value,
                "timestamp": Utc::now().timestamp_millis(),
                "step": 0,
            }),
        )?;
        Ok(())
    }

    fn end_run(&self, run: &RunHandle, status: RunStatus) -> Result<()> {
        self.post(
            "runs/update",
            json!({
                "run_id": run.run_id,
                "status": status.as_mlflow(),
                "end_time": Utc::now().timestamp_millis(),
            }),
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_strips_trailing_slash() {
        let reporter = MlflowReporter::new(&TrackingConfig::new("http://localhost:5000/")).unwrap();
        assert_eq!(
            reporter.endpoint("runs/create"),
            "http://localhost:5000/api/2.0/mlflow/runs/create"
        );
    }

    #[test]
    fn test_unreachable_server_is_tracking_error() {
        let reporter = MlflowReporter::new(&TrackingConfig::new("http://127.0.0.1:9")).unwrap();
        let err = reporter.start_run("unreachable").unwrap_err();
        assert!(matches!(err, CarPriceError::Tracking(_)));
    }
}
