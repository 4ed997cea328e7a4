//! Error types for the car price pipeline and prediction service

use std::fmt;
use thiserror::Error;

/// Result type alias for carprice operations
pub type Result<T> = std::result::Result<T, CarPriceError>;

/// Pipeline stage an error was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Stage {
    Ingestion,
    FeatureEngineering,
    Transformation,
    Training,
    Persistence,
    Tracking,
    Inference,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Ingestion => "ingestion",
            Stage::FeatureEngineering => "feature_engineering",
            Stage::Transformation => "transformation",
            Stage::Training => "training",
            Stage::Persistence => "persistence",
            Stage::Tracking => "tracking",
            Stage::Inference => "inference",
        };
        f.write_str(name)
    }
}

/// Main error type
#[derive(Error, Debug)]
pub enum CarPriceError {
    /// Raw data unreadable or missing required columns
    #[error("Ingestion error: {0}")]
    Ingestion(String),

    /// A stateful component was used before `fit`
    #[error("{0} is not fitted")]
    NotFitted(String),

    /// Best candidate scored below the acceptance threshold
    #[error("No suitable model found: best candidate '{model}' scored r2={score:.4}, below threshold {threshold}")]
    ModelQuality {
        model: String,
        score: f64,
        threshold: f64,
    },

    #[error("Artifact '{key}' not found at {path}")]
    ArtifactNotFound { key: String, path: String },

    #[error("Artifact '{key}' is corrupt: {reason}")]
    ArtifactCorrupt { key: String, reason: String },

    /// Preprocessor and model were written by different training runs
    #[error("Artifacts come from different runs: preprocessor {preprocessor_run}, model {model_run}")]
    ArtifactRunMismatch {
        preprocessor_run: String,
        model_run: String,
    },

    /// Preprocessor output width disagrees with model input width
    #[error("Schema mismatch: preprocessor produces {preprocessor_width} features, model expects {model_width}")]
    SchemaMismatch {
        preprocessor_width: usize,
        model_width: usize,
    },

    /// Serving would derive `age` against a different year than training did
    #[error("Reference year mismatch: artifacts were trained with {trained}, service configured with {configured}")]
    ReferenceYearMismatch { trained: i32, configured: i32 },

    /// Malformed single-record input at the serving boundary
    #[error("Validation error on '{field}': {message}")]
    Validation { field: String, message: String },

    #[error("Data error: {0}")]
    Data(String),

    #[error("Feature not found: {0}")]
    FeatureNotFound(String),

    #[error("Training error: {0}")]
    Training(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    Shape { expected: String, actual: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Tracking error: {0}")]
    Tracking(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Failure wrapped with the stage it happened in
    #[error("[{stage}] {message}: {source}")]
    Stage {
        stage: Stage,
        message: String,
        #[source]
        source: Box<CarPriceError>,
    },
}

impl CarPriceError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        CarPriceError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Innermost error, with all stage wrappers removed
    pub fn root_cause(&self) -> &CarPriceError {
        let mut current = self;
        while let CarPriceError::Stage { source, .. } = current {
            current = source;
        }
        current
    }

    /// Outermost stage this error was reported from, if any
    pub fn stage(&self) -> Option<Stage> {
        match self {
            CarPriceError::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }
}

/// Attach stage context to a fallible result
pub trait StageContext<T> {
    fn stage(self, stage: Stage, message: impl Into<String>) -> Result<T>;

    fn with_stage<F>(self, stage: Stage, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> StageContext<T> for std::result::Result<T, E>
where
    E: Into<CarPriceError>,
{
    fn stage(self, stage: Stage, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| CarPriceError::Stage {
            stage,
            message: message.into(),
            source: Box::new(e.into()),
        })
    }

    fn with_stage<F>(self, stage: Stage, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| CarPriceError::Stage {
            stage,
            message: f(),
            source: Box::new(e.into()),
        })
    }
}

impl From<polars::error::PolarsError> for CarPriceError {
    fn from(err: polars::error::PolarsError) -> Self {
        CarPriceError::Data(err.to_string())
    }
}

impl From<serde_json::Error> for CarPriceError {
    fn from(err: serde_json::Error) -> Self {
        CarPriceError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for CarPriceError {
    fn from(err: bincode::Error) -> Self {
        CarPriceError::Serialization(err.to_string())
    }
}

impl From<ndarray::ShapeError> for CarPriceError {
    fn from(err: ndarray::ShapeError) -> Self {
        CarPriceError::Shape {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CarPriceError::Data("test error".to_string());
        assert_eq!(err.to_string(), "Data error: test error");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: CarPriceError = io_err.into();
        assert!(matches!(err, CarPriceError::Io(_)));
    }

    #[test]
    fn test_stage_context_wraps_and_unwraps() {
        let failed: Result<()> = Err(CarPriceError::NotFitted("DataPreprocessor".to_string()));
        let err = failed
            .stage(Stage::Transformation, "transforming test partition")
            .unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Transformation));
        assert!(matches!(err.root_cause(), CarPriceError::NotFitted(_)));
        assert_eq!(
            err.to_string(),
            "[transformation] transforming test partition: DataPreprocessor is not fitted"
        );
    }

    #[test]
    fn test_nested_stages_keep_innermost_cause() {
        let failed: Result<()> = Err(CarPriceError::ModelQuality {
            model: "XGBoost".to_string(),
            score: 0.4,
            threshold: 0.6,
        });
        let err = failed
            .stage(Stage::Training, "selecting best model")
            .with_stage(Stage::Ingestion, || "outer".to_string())
            .unwrap_err();

        assert_eq!(err.stage(), Some(Stage::Ingestion));
        assert!(matches!(err.root_cause(), CarPriceError::ModelQuality { .. }));
    }
}
