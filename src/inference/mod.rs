//! Prediction service
//!
//! Loads the persisted preprocessor and model once, then prices single cars
//! by replaying the training-time feature engineering and preprocessing.

mod input;

pub use input::{title_case, CarInput};

use crate::artifacts::{ArtifactKey, ArtifactStore, Stamped};
use crate::error::{CarPriceError, Result, Stage, StageContext};
use crate::feature_engineering::{FeatureEngineer, RawRecord};
use crate::preprocessing::DataPreprocessor;
use crate::training::{RegressionModel, Regressor};
use serde::de::DeserializeOwned;
use std::time::Instant;

/// Read-only pricing service over a fitted preprocessor and model
#[derive(Debug, Clone)]
pub struct PredictionService<M = RegressionModel> {
    engineer: FeatureEngineer,
    preprocessor: DataPreprocessor,
    model: M,
}

impl<M: Regressor> PredictionService<M> {
    /// Pair a fitted preprocessor with a fitted model
    ///
    /// Fails with `SchemaMismatch` when the model was trained on a different
    /// feature width than the preprocessor produces, and with
    /// `ReferenceYearMismatch` when the preprocessor was fitted on ages derived
    /// from another reference year.
    pub fn new(preprocessor: DataPreprocessor, model: M, reference_year: i32) -> Result<Self> {
        if let Some(trained) = preprocessor.reference_year() {
            if trained != reference_year {
                return Err(CarPriceError::ReferenceYearMismatch {
                    trained,
                    configured: reference_year,
                });
            }
        }

        let preprocessor_width = preprocessor.output_width()?;
        let model_width = model
            .n_features_in()
            .ok_or_else(|| CarPriceError::NotFitted("model".to_string()))?;
        if preprocessor_width != model_width {
            return Err(CarPriceError::SchemaMismatch {
                preprocessor_width,
                model_width,
            });
        }

        Ok(Self {
            engineer: FeatureEngineer::new(reference_year),
            preprocessor,
            model,
        })
    }

    pub fn reference_year(&self) -> i32 {
        self.engineer.reference_year()
    }

    pub fn preprocessor(&self) -> &DataPreprocessor {
        &self.preprocessor
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Validate one request and price it
    pub fn predict(&self, input: &CarInput) -> Result<f64> {
        let record = input.validate(self.reference_year())?;
        self.predict_record(&record)
    }

    /// Price an already validated record
    pub fn predict_record(&self, record: &RawRecord) -> Result<f64> {
        let start = Instant::now();
        let row = self.engineer.engineer_record(record).to_dataframe()?;
        let features = self
            .preprocessor
            .transform(&row)
            .stage(Stage::Inference, "preprocessing request")?;
        let predictions = self
            .model
            .predict(&features)
            .stage(Stage::Inference, "running model")?;

        let price = predictions
            .iter()
            .next()
            .copied()
            .ok_or_else(|| CarPriceError::Inference("model returned no prediction".to_string()))?;
        if !price.is_finite() {
            return Err(CarPriceError::Inference(format!(
                "model returned a non-finite price ({})",
                price
            )));
        }

        let price = price.max(0.0);
        tracing::debug!(
            company = %record.company,
            name = %record.name,
            price,
            micros = start.elapsed().as_micros() as u64,
            "Prediction served"
        );
        Ok(price)
    }
}

impl<M: Regressor + DeserializeOwned> PredictionService<M> {
    /// Load both artifacts from `store`
    ///
    /// The two artifacts must have been committed by the same training run.
    pub fn load<S: ArtifactStore>(store: &S, reference_year: i32) -> Result<Self> {
        let preprocessor: Stamped<DataPreprocessor> = store
            .load_stamped(ArtifactKey::Preprocessor)
            .stage(Stage::Persistence, "loading preprocessor")?;
        let model: Stamped<M> = store
            .load_stamped(ArtifactKey::Model)
            .stage(Stage::Persistence, "loading model")?;
        if preprocessor.run_id != model.run_id {
            return Err(CarPriceError::ArtifactRunMismatch {
                preprocessor_run: preprocessor.run_id,
                model_run: model.run_id,
            })
            .stage(Stage::Persistence, "pairing artifacts");
        }

        let run_id = model.run_id;
        let service = Self::new(preprocessor.value, model.value, reference_year)
            .stage(Stage::Inference, "pairing preprocessor and model")?;
        tracing::info!(
            features = service.preprocessor.output_width()?,
            reference_year,
            run_id = %run_id,
            "Prediction service ready"
        );
        Ok(service)
    }
}
