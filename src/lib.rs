//! carprice - used car price estimation
//!
//! A batch pipeline that ingests the raw car table, derives features, fits a
//! preprocessing transform, trains several regressors and persists the best
//! one; plus a prediction service that replays the same transform on single
//! requests.
//!
//! # Modules
//!
//! ## Pipeline
//! - [`ingestion`] - Dataset providers, schema checks, train/test split
//! - [`feature_engineering`] - `age` from `year`
//! - [`preprocessing`] - Imputation, scaling, one-hot encoding
//! - [`training`] - Candidate regressors and best-model selection
//! - [`artifacts`] - Persistence of the fitted preprocessor and model
//! - [`pipeline`] - End-to-end training run
//!
//! ## Serving
//! - [`inference`] - Request validation and single-row prediction
//! - [`server`] - HTTP server
//! - [`cli`] - Command-line interface
//!
//! ## Support
//! - [`config`] - Layered application configuration
//! - [`tracking`] - Experiment tracking sinks
//! - [`error`] - Error taxonomy

pub mod error;
pub mod config;

pub mod ingestion;
pub mod feature_engineering;
pub mod preprocessing;
pub mod training;
pub mod artifacts;
pub mod pipeline;

pub mod inference;
pub mod tracking;

pub mod server;
pub mod cli;

pub use error::{CarPriceError, Result, Stage};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::artifacts::{ArtifactKey, ArtifactStore, FileArtifactStore};
    pub use crate::config::AppConfig;
    pub use crate::error::{CarPriceError, Result, Stage, StageContext};
    pub use crate::feature_engineering::{FeatureEngineer, RawRecord};
    pub use crate::inference::{CarInput, PredictionService};
    pub use crate::ingestion::{CsvDatasetProvider, DatasetProvider, InMemoryProvider};
    pub use crate::pipeline::{DataTransformation, TrainingPipeline, TrainingSummary};
    pub use crate::preprocessing::{ColumnSpec, DataPreprocessor};
    pub use crate::tracking::{MetricsReporter, TrackingConfig};
    pub use crate::training::{
        default_candidates, Candidate, ModelTrainer, RegressionModel, Regressor, TrainerConfig,
    };
}
