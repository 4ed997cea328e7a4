//! Training run orchestration
//!
//! ingest → split → feature engineering → preprocessor fit → model selection
//! → artifact persistence. Artifacts are written only after the selected
//! model passes the quality gate.

use crate::artifacts::{ArtifactBatch, ArtifactKey, ArtifactStore, FileArtifactStore};
use crate::config::AppConfig;
use crate::error::{CarPriceError, Result, Stage, StageContext};
use crate::feature_engineering::FeatureEngineer;
use crate::ingestion::{read_raw_dataset, train_test_split, CsvDatasetProvider, DatasetProvider};
use crate::preprocessing::{ColumnSpec, DataPreprocessor};
use crate::tracking::{build_reporter, MetricsReporter, NoopReporter};
use crate::training::{
    default_candidates, Candidate, EvaluationReport, ModelMetrics, ModelTrainer, Regressor,
};
use ndarray::{concatenate, Array2, Axis};
use polars::prelude::*;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Preprocessed partitions plus the preprocessor fitted on the train one
#[derive(Debug, Clone)]
pub struct TransformedData {
    /// Features followed by the target as the last column
    pub train_arr: Array2<f64>,
    pub test_arr: Array2<f64>,
    pub preprocessor: DataPreprocessor,
}

/// Feature engineering and preprocessing of the split tables
#[derive(Debug, Clone)]
pub struct DataTransformation {
    engineer: FeatureEngineer,
    columns: ColumnSpec,
}

impl DataTransformation {
    pub fn new(reference_year: i32) -> Self {
        Self {
            engineer: FeatureEngineer::new(reference_year),
            columns: ColumnSpec::default(),
        }
    }

    pub fn with_columns(mut self, columns: ColumnSpec) -> Self {
        self.columns = columns;
        self
    }

    /// Fit the preprocessor on `train_df` and turn both tables into arrays
    pub fn initiate_data_transformation(
        &self,
        train_df: &DataFrame,
        test_df: &DataFrame,
    ) -> Result<TransformedData> {
        let train_df = self.engineer.transform(train_df)?;
        let test_df = self.engineer.transform(test_df)?;
        let train_df = self
            .labelled_rows(&train_df)
            .stage(Stage::Transformation, "filtering train rows")?;
        let test_df = self
            .labelled_rows(&test_df)
            .stage(Stage::Transformation, "filtering test rows")?;

        let mut preprocessor = DataPreprocessor::new(self.columns.clone())
            .with_reference_year(self.engineer.reference_year());
        let train_features = preprocessor
            .fit_transform(&train_df)
            .stage(Stage::Transformation, "fitting preprocessor on train partition")?;
        let test_features = preprocessor
            .transform(&test_df)
            .stage(Stage::Transformation, "transforming test partition")?;

        let train_arr = self
            .with_target(train_features, &train_df)
            .stage(Stage::Transformation, "attaching train target")?;
        let test_arr = self
            .with_target(test_features, &test_df)
            .stage(Stage::Transformation, "attaching test target")?;

        tracing::info!(
            train_shape = ?train_arr.dim(),
            test_shape = ?test_arr.dim(),
            "Data transformation complete"
        );
        Ok(TransformedData {
            train_arr,
            test_arr,
            preprocessor,
        })
    }

    /// Rows without a target cannot be used for fitting or scoring
    fn labelled_rows(&self, df: &DataFrame) -> Result<DataFrame> {
        let target = df
            .column(&self.columns.target)
            .map_err(|_| CarPriceError::FeatureNotFound(self.columns.target.clone()))?;
        if target.null_count() == 0 {
            return Ok(df.clone());
        }
        tracing::warn!(
            dropped = target.null_count(),
            "Dropping rows without a target value"
        );
        let mask = target.is_not_null();
        Ok(df.filter(&mask)?)
    }

    fn with_target(&self, features: Array2<f64>, df: &DataFrame) -> Result<Array2<f64>> {
        let target = df
            .column(&self.columns.target)
            .map_err(|_| CarPriceError::FeatureNotFound(self.columns.target.clone()))?
            .cast(&DataType::Float64)?;
        let values: Vec<f64> = target.f64()?.into_no_null_iter().collect();
        let target = Array2::from_shape_vec((values.len(), 1), values)?;
        Ok(concatenate(Axis(1), &[features.view(), target.view()])?)
    }
}

/// What a successful run produced
#[derive(Debug, Clone, Serialize)]
pub struct TrainingSummary {
    pub best_model_name: String,
    pub best_score: f64,
    pub metrics: ModelMetrics,
    pub report: EvaluationReport,
    pub n_features: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub artifacts_dir: PathBuf,
    /// Id stamped on both artifacts of this run
    pub run_id: String,
    pub elapsed_secs: f64,
}

/// One end-to-end training run
pub struct TrainingPipeline {
    config: AppConfig,
    provider: Box<dyn DatasetProvider>,
    reporter: Arc<dyn MetricsReporter>,
}

impl TrainingPipeline {
    pub fn new(config: AppConfig, provider: Box<dyn DatasetProvider>) -> Self {
        Self {
            config,
            provider,
            reporter: Arc::new(NoopReporter),
        }
    }

    /// CSV source and tracking sink taken from `config`
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let provider = Box::new(CsvDatasetProvider::new(&config.data.source_path));
        let reporter = build_reporter(config.tracking.as_ref()).stage(Stage::Tracking, "building reporter")?;
        Ok(Self::new(config, provider).with_reporter(reporter))
    }

    pub fn with_reporter(mut self, reporter: Arc<dyn MetricsReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run with the standard candidate set
    pub fn run(&self) -> Result<TrainingSummary> {
        self.run_with_candidates(default_candidates(self.config.training.random_state))
    }

    pub fn run_with_candidates<M>(&self, candidates: Vec<Candidate<M>>) -> Result<TrainingSummary>
    where
        M: Regressor + Serialize,
    {
        let start = Instant::now();
        let config = &self.config;

        let raw = read_raw_dataset(self.provider.as_ref())?;
        let (train_df, test_df) = train_test_split(&raw, config.data.test_size, config.data.random_state)
            .stage(Stage::Ingestion, "splitting train and test partitions")?;
        tracing::info!(
            train_rows = train_df.height(),
            test_rows = test_df.height(),
            "Ingestion complete"
        );

        let data = DataTransformation::new(config.features.reference_year)
            .initiate_data_transformation(&train_df, &test_df)?;

        let trainer = ModelTrainer::new(config.training.clone()).with_reporter(Arc::clone(&self.reporter));
        let outcome = trainer
            .initiate_model_trainer(&data.train_arr, &data.test_arr, candidates)
            .stage(Stage::Training, "selecting best model")?;

        let run_id = uuid::Uuid::new_v4().to_string();
        let mut batch = ArtifactBatch::new(run_id.clone());
        batch
            .add(ArtifactKey::Preprocessor, &data.preprocessor)
            .stage(Stage::Persistence, "serializing preprocessor")?;
        batch
            .add(ArtifactKey::Model, &outcome.best_model)
            .stage(Stage::Persistence, "serializing model")?;
        FileArtifactStore::new(&config.artifacts.dir)
            .commit(batch)
            .stage(Stage::Persistence, "saving artifacts")?;

        let summary = TrainingSummary {
            best_model_name: outcome.best_model_name,
            best_score: outcome.best_score,
            metrics: outcome.metrics,
            report: outcome.report,
            n_features: data.preprocessor.output_width()?,
            train_rows: data.train_arr.nrows(),
            test_rows: data.test_arr.nrows(),
            artifacts_dir: config.artifacts.dir.clone(),
            run_id,
            elapsed_secs: start.elapsed().as_secs_f64(),
        };
        tracing::info!(
            model = %summary.best_model_name,
            r2 = summary.best_score,
            artifacts = %summary.artifacts_dir.display(),
            run_id = %summary.run_id,
            elapsed_secs = summary.elapsed_secs,
            "Training pipeline finished"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion::{COMPANY, FUEL_TYPE, KMS_DRIVEN, NAME, PRICE, YEAR};

    fn split_tables() -> (DataFrame, DataFrame) {
        let train = df!(
            NAME => &["Swift", "i20", "City", "Swift"],
            COMPANY => &["Maruti", "Hyundai", "Honda", "Maruti"],
            FUEL_TYPE => &["Petrol", "Diesel", "Petrol", "Petrol"],
            YEAR => &[2015.0, 2012.0, 2019.0, 2018.0],
            KMS_DRIVEN => &[45000.0, 60000.0, 12000.0, 30000.0],
            PRICE => &[Some(350000.0), Some(290000.0), Some(900000.0), None]
        )
        .unwrap();
        let test = df!(
            NAME => &["Verna", "City"],
            COMPANY => &["Hyundai", "Honda"],
            FUEL_TYPE => &["Diesel", "CNG"],
            YEAR => &[2020.0, 2016.0],
            KMS_DRIVEN => &[20000.0, 50000.0],
            PRICE => &[800000.0, 600000.0]
        )
        .unwrap();
        (train, test)
    }

    #[test]
    fn test_arrays_carry_target_last() {
        let (train, test) = split_tables();
        let data = DataTransformation::new(2025)
            .initiate_data_transformation(&train, &test)
            .unwrap();

        let width = data.preprocessor.output_width().unwrap();
        assert_eq!(data.preprocessor.reference_year(), Some(2025));
        // the row without a price is dropped before fitting
        assert_eq!(data.train_arr.dim(), (3, width + 1));
        assert_eq!(data.test_arr.dim(), (2, width + 1));
        assert_eq!(data.test_arr[[0, width]], 800000.0);
    }

    #[test]
    fn test_unseen_test_category_encodes_to_zeros() {
        let (train, test) = split_tables();
        let data = DataTransformation::new(2025)
            .initiate_data_transformation(&train, &test)
            .unwrap();

        let names = data.preprocessor.feature_names().unwrap();
        let fuel_cols: Vec<usize> = names
            .iter()
            .enumerate()
            .filter(|(_, n)| n.starts_with("fuel_type_"))
            .map(|(i, _)| i)
            .collect();
        assert!(!fuel_cols.is_empty());
        assert!(fuel_cols.iter().all(|&j| data.test_arr[[1, j]] == 0.0));
    }

    #[test]
    fn test_missing_year_reports_feature_stage() {
        let (train, test) = split_tables();
        let err = DataTransformation::new(2025)
            .initiate_data_transformation(&train.drop(YEAR).unwrap(), &test)
            .unwrap_err();
        assert_eq!(err.stage(), Some(Stage::FeatureEngineering));
    }
}
