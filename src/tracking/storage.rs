//! Local file backend for experiment tracking
//!
//! Each run is written as `<dir>/<run_id>.json` and rewritten on every update.

use super::{metric_key, MetricsReporter, RunHandle, RunStatus};
use crate::error::{CarPriceError, Result};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted state of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub run_name: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub status: RunStatus,
    pub params: BTreeMap<String, String>,
    pub metrics: BTreeMap<String, f64>,
}

/// Writes runs as JSON documents under a directory
pub struct LocalTracker {
    base_dir: PathBuf,
    runs: Mutex<HashMap<String, RunRecord>>,
}

impl LocalTracker {
    /// Create the tracker, creating `base_dir` if needed
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        fs::create_dir_all(&base_dir).map_err(|e| {
            CarPriceError::Tracking(format!(
                "cannot create tracking dir {}: {}",
                base_dir.display(),
                e
            ))
        })?;
        Ok(Self {
            base_dir,
            runs: Mutex::new(HashMap::new()),
        })
    }

    pub fn run_file(&self, run_id: &str) -> PathBuf {
        self.base_dir.join(format!("{}.json", run_id))
    }

    /// Read a previously written run back from disk
    pub fn load_run(&self, run_id: &str) -> Result<RunRecord> {
        let json = fs::read_to_string(self.run_file(run_id))
            .map_err(|e| CarPriceError::Tracking(format!("run {}: {}", run_id, e)))?;
        Ok(serde_json::from_str(&json)?)
    }

    fn update<F>(&self, run: &RunHandle, f: F) -> Result<()>
    where
        F: FnOnce(&mut RunRecord),
    {
        let mut runs = self.runs.lock();
        let record = runs
            .get_mut(&run.run_id)
            .ok_or_else(|| CarPriceError::Tracking(format!("unknown run {}", run.run_id)))?;
        f(record);
        self.persist(record)
    }

    fn persist(&self, record: &RunRecord) -> Result<()> {
        let json = serde_json::to_string_pretty(record)?;
        fs::write(self.run_file(&record.run_id), json)
            .map_err(|e| CarPriceError::Tracking(format!("writing run {}: {}", record.run_id, e)))
    }
}

impl MetricsReporter for LocalTracker {
    fn start_run(&self, run_name: &str) -> Result<RunHandle> {
        let handle = RunHandle::new(run_name);
        let record = RunRecord {
            run_id: handle.run_id.clone(),
            run_name: handle.run_name.clone(),
            started_at: handle.started_at,
            ended_at: None,
            status: RunStatus::Running,
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
        };
        self.persist(&record)?;
        self.runs.lock().insert(handle.run_id.clone(), record);
        Ok(handle)
    }

    fn log_param(&self, run: &RunHandle, key: &str, value: &str) -> Result<()> {
        self.update(run, |record| {
            record.params.insert(key.to_string(), value.to_string());
        })
    }

    fn log_metric(&self, run: &RunHandle, model: &str, metric: &str, value: f64) -> Result<()> {
        self.update(run, |record| {
            record.metrics.insert(metric_key(model, metric), value);
        })
    }

    fn end_run(&self, run: &RunHandle, status: RunStatus) -> Result<()> {
        self.update(run, |record| {
            record.status = status;
            record.ended_at = Some(Utc::now());
        })?;
        self.runs.lock().remove(&run.run_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_is_written_as_json() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = LocalTracker::new(dir.path()).unwrap();

        let run = tracker.start_run("model_trainer").unwrap();
        tracker.log_param(&run, "best_model", "Random Forest").unwrap();
        tracker.log_metric(&run, "Random Forest", "r2", 0.81).unwrap();
        tracker.log_metric(&run, "", "RMSE", 1200.0).unwrap();
        tracker.end_run(&run, RunStatus::Finished).unwrap();

        let record = tracker.load_run(&run.run_id).unwrap();
        assert_eq!(record.status, RunStatus::Finished);
        assert!(record.ended_at.is_some());
        assert_eq!(record.params["best_model"], "Random Forest");
        assert_eq!(record.metrics["Random Forest/r2"], 0.81);
        assert_eq!(record.metrics["RMSE"], 1200.0);
    }

    #[test]
    fn test_unknown_run_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = LocalTracker::new(dir.path()).unwrap();
        let stray = RunHandle::new("never started");
        assert!(tracker.log_param(&stray, "k", "v").is_err());
    }
}
