//! Data preprocessing pipeline

use super::{
    config::{ColumnSpec, PreprocessingConfig},
    encoder::OneHotEncoder,
    imputer::Imputer,
    scaler::StandardScaler,
};
use crate::error::{CarPriceError, Result};
use crate::ingestion::to_float;
use ndarray::{concatenate, Array2, Axis};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FittedState {
    numeric_imputer: Imputer,
    numeric_scaler: StandardScaler,
    categorical_imputer: Imputer,
    encoder: OneHotEncoder,
    categorical_scaler: Option<StandardScaler>,
}

/// Column transformer for the car table
///
/// Numeric branch: impute, then standardize. Categorical branch: impute,
/// one-hot encode, then scale without centering. The output matrix holds the
/// numeric block first, followed by one block per categorical column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPreprocessor {
    config: PreprocessingConfig,
    state: Option<FittedState>,
    /// Year the `age` column was derived against
    reference_year: Option<i32>,
    /// Seconds spent in the last fit call
    fit_time: Option<f64>,
}

impl DataPreprocessor {
    /// Create a new preprocessor for the given column layout
    pub fn new(columns: ColumnSpec) -> Self {
        Self::with_config(PreprocessingConfig::default().with_columns(columns))
    }

    pub fn with_config(config: PreprocessingConfig) -> Self {
        Self {
            config,
            state: None,
            reference_year: None,
            fit_time: None,
        }
    }

    /// Record the reference year of the feature engineering feeding this preprocessor
    pub fn with_reference_year(mut self, year: i32) -> Self {
        self.reference_year = Some(year);
        self
    }

    pub fn reference_year(&self) -> Option<i32> {
        self.reference_year
    }

    pub fn config(&self) -> &PreprocessingConfig {
        &self.config
    }

    pub fn columns(&self) -> &ColumnSpec {
        &self.config.columns
    }

    pub fn is_fitted(&self) -> bool {
        self.state.is_some()
    }

    pub fn fit_time(&self) -> Option<f64> {
        self.fit_time
    }

    fn numeric_names(&self) -> Vec<&str> {
        self.config.columns.numeric.iter().map(String::as_str).collect()
    }

    fn categorical_names(&self) -> Vec<&str> {
        self.config.columns.categorical.iter().map(String::as_str).collect()
    }

    /// Learn imputation values, scaling parameters and vocabularies
    pub fn fit(&mut self, df: &DataFrame) -> Result<&mut Self> {
        let start = Instant::now();
        let df = self.prepare(df)?;
        let numeric = self.numeric_names();
        let categorical = self.categorical_names();

        let mut numeric_imputer = Imputer::new(self.config.numeric_impute_strategy);
        numeric_imputer.fit(&df, &numeric)?;
        let filled = numeric_imputer.transform(&df)?;
        let mut numeric_scaler = StandardScaler::new();
        numeric_scaler.fit(&numeric_matrix(&filled, &numeric)?)?;

        let mut categorical_imputer = Imputer::new(self.config.categorical_impute_strategy);
        categorical_imputer.fit(&df, &categorical)?;
        let filled = categorical_imputer.transform(&df)?;
        let mut encoder = OneHotEncoder::new();
        encoder.fit(&filled, &categorical)?;
        let categorical_scaler = if self.config.scale_categorical {
            let mut scaler = StandardScaler::without_mean();
            scaler.fit(&encoder.transform(&filled)?)?;
            Some(scaler)
        } else {
            None
        };

        self.state = Some(FittedState {
            numeric_imputer,
            numeric_scaler,
            categorical_imputer,
            encoder,
            categorical_scaler,
        });

        let elapsed = start.elapsed().as_secs_f64();
        self.fit_time = Some(elapsed);
        tracing::debug!(
            rows = df.height(),
            width = self.output_width()?,
            secs = elapsed,
            "Preprocessor fitted"
        );
        Ok(self)
    }

    /// Map rows to the fitted feature matrix; row order is kept
    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        let state = self.fitted()?;
        let df = self.prepare(df)?;

        let numeric = self.numeric_names();
        let filled = state.numeric_imputer.transform(&df)?;
        let numeric_block = state
            .numeric_scaler
            .transform(&numeric_matrix(&filled, &numeric)?)?;

        let filled = state.categorical_imputer.transform(&df)?;
        let mut categorical_block = state.encoder.transform(&filled)?;
        if let Some(scaler) = &state.categorical_scaler {
            categorical_block = scaler.transform(&categorical_block)?;
        }

        Ok(concatenate(
            Axis(1),
            &[numeric_block.view(), categorical_block.view()],
        )?)
    }

    pub fn fit_transform(&mut self, df: &DataFrame) -> Result<Array2<f64>> {
        self.fit(df)?;
        self.transform(df)
    }

    /// Number of output columns; fixed once fitted
    pub fn output_width(&self) -> Result<usize> {
        let state = self.fitted()?;
        Ok(self.config.columns.numeric.len() + state.encoder.output_width())
    }

    /// Names of the output columns, in matrix order
    pub fn feature_names(&self) -> Result<Vec<String>> {
        let state = self.fitted()?;
        let mut names = self.config.columns.numeric.clone();
        names.extend(state.encoder.feature_names());
        Ok(names)
    }

    /// Fitted vocabulary of one categorical column
    pub fn categories(&self, column: &str) -> Option<&[String]> {
        self.state.as_ref().and_then(|s| {
            s.encoder
                .vocabularies()
                .iter()
                .find(|v| v.column == column)
                .map(|v| v.categories.as_slice())
        })
    }

    fn fitted(&self) -> Result<&FittedState> {
        self.state
            .as_ref()
            .ok_or_else(|| CarPriceError::NotFitted("DataPreprocessor".to_string()))
    }

    /// Check the feature columns and normalize their dtypes
    fn prepare(&self, df: &DataFrame) -> Result<DataFrame> {
        let columns = &self.config.columns;
        let mut out = df.clone();
        for name in &columns.numeric {
            let casted = to_float(column(df, name)?).map_err(|reason| {
                CarPriceError::Data(format!("column '{}' is not numeric: {}", name, reason))
            })?;
            out.with_column(casted)?;
        }
        for name in &columns.categorical {
            let casted = column(df, name)?.cast(&DataType::String)?;
            out.with_column(casted)?;
        }
        Ok(out)
    }
}

fn column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column> {
    df.column(name)
        .map_err(|_| CarPriceError::FeatureNotFound(name.to_string()))
}

/// Imputed numeric columns as a row-major matrix
fn numeric_matrix(df: &DataFrame, names: &[&str]) -> Result<Array2<f64>> {
    let mut out = Array2::<f64>::zeros((df.height(), names.len()));
    for (j, &name) in names.iter().enumerate() {
        let values = column(df, name)?.f64()?;
        for (i, v) in values.into_iter().enumerate() {
            out[[i, j]] = v.ok_or_else(|| {
                CarPriceError::Data(format!("column '{}' still has missing values", name))
            })?;
        }
    }
    Ok(out)
}
