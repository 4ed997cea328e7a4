//! Application configuration
//!
//! Configuration is layered: built-in defaults, then an optional JSON file,
//! then `CARPRICE_*` environment variables.

use crate::error::{CarPriceError, Result};
use crate::training::TrainerConfig;
use crate::tracking::TrackingConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Reference year used to derive `age` from `year`
pub const DEFAULT_REFERENCE_YEAR: i32 = 2025;

/// Minimum held-out R² for a model to be persisted
pub const DEFAULT_ACCEPTANCE_THRESHOLD: f64 = 0.6;

/// Earliest manufacturing year accepted at the serving boundary
pub const MIN_MODEL_YEAR: i32 = 1990;

/// Raw data source and split settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// CSV file with the raw car table
    pub source_path: PathBuf,
    /// Fraction of rows held out for evaluation
    pub test_size: f64,
    /// Seed for the train/test shuffle
    pub random_state: u64,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            source_path: PathBuf::from("notebook/data/Cleaned_data.csv"),
            test_size: 0.2,
            random_state: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    pub reference_year: i32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            reference_year: DEFAULT_REFERENCE_YEAR,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtifactConfig {
    /// Directory holding `preprocessor.bin` and `model.bin`
    pub dir: PathBuf,
}

impl Default for ArtifactConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("artifacts"),
        }
    }
}

/// Top-level configuration for a training run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub features: FeatureConfig,
    pub training: TrainerConfig,
    pub artifacts: ArtifactConfig,
    /// Experiment tracking sink; `None` disables tracking
    pub tracking: Option<TrackingConfig>,
}

impl AppConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from an optional JSON file, apply environment overrides, validate
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Read a JSON configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            CarPriceError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&json)
            .map_err(|e| CarPriceError::Config(format!("invalid config {}: {}", path.display(), e)))
    }

    /// Apply `CARPRICE_*` environment variables on top of the current values
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup("CARPRICE_DATA_PATH") {
            self.data.source_path = PathBuf::from(path);
        }
        if let Some(value) = lookup("CARPRICE_TEST_SIZE") {
            self.data.test_size = parse_env("CARPRICE_TEST_SIZE", &value)?;
        }
        if let Some(value) = lookup("CARPRICE_REFERENCE_YEAR") {
            self.features.reference_year = parse_env("CARPRICE_REFERENCE_YEAR", &value)?;
        }
        if let Some(value) = lookup("CARPRICE_ACCEPTANCE_THRESHOLD") {
            self.training.acceptance_threshold =
                parse_env("CARPRICE_ACCEPTANCE_THRESHOLD", &value)?;
        }
        if let Some(dir) = lookup("CARPRICE_ARTIFACTS_DIR") {
            self.artifacts.dir = PathBuf::from(dir);
        }
        if let Some(uri) = lookup("CARPRICE_TRACKING_URI") {
            let tracking = self.tracking.get_or_insert_with(TrackingConfig::default);
            tracking.tracking_uri = uri;
        }
        if let Some(tracking) = self.tracking.as_mut() {
            if let Some(username) = lookup("CARPRICE_TRACKING_USERNAME") {
                tracking.username = Some(username);
            }
            if let Some(secret_ref) = lookup("CARPRICE_TRACKING_PASSWORD_REF") {
                tracking.password_secret_ref = Some(secret_ref);
            }
        }
        Ok(())
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.data.test_size > 0.0 && self.data.test_size < 1.0) {
            return Err(CarPriceError::Config(format!(
                "test_size must be in (0, 1), got {}",
                self.data.test_size
            )));
        }
        if !self.training.acceptance_threshold.is_finite() {
            return Err(CarPriceError::Config(
                "acceptance_threshold must be finite".to_string(),
            ));
        }
        if self.features.reference_year < MIN_MODEL_YEAR {
            return Err(CarPriceError::Config(format!(
                "reference_year must be >= {}, got {}",
                MIN_MODEL_YEAR, self.features.reference_year
            )));
        }
        if let Some(tracking) = &self.tracking {
            if tracking.tracking_uri.trim().is_empty() {
                return Err(CarPriceError::Config(
                    "tracking.tracking_uri must not be empty".to_string(),
                ));
            }
        }
        Ok(())
    }

    /// Builder method to set the data source
    pub fn with_data_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.data.source_path = path.into();
        self
    }

    /// Builder method to set the artifacts directory
    pub fn with_artifacts_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifacts.dir = dir.into();
        self
    }

    /// Builder method to set the reference year
    pub fn with_reference_year(mut self, year: i32) -> Self {
        self.features.reference_year = year;
        self
    }

    /// Builder method to set the acceptance threshold
    pub fn with_acceptance_threshold(mut self, threshold: f64) -> Self {
        self.training.acceptance_threshold = threshold;
        self
    }

    /// Builder method to enable experiment tracking
    pub fn with_tracking(mut self, tracking: TrackingConfig) -> Self {
        self.tracking = Some(tracking);
        self
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| CarPriceError::Config(format!("{}: cannot parse '{}'", key, value)))
}
