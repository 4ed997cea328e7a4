//! Preprocessing configuration

use super::ImputeStrategy;
use crate::feature_engineering::AGE;
use crate::ingestion::{COMPANY, FUEL_TYPE, KMS_DRIVEN, NAME, PRICE};
use serde::{Deserialize, Serialize};

/// Which columns feed which branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSpec {
    /// Numeric features, in output order
    pub numeric: Vec<String>,
    /// Categorical features, in output order
    pub categorical: Vec<String>,
    pub target: String,
}

impl Default for ColumnSpec {
    fn default() -> Self {
        Self {
            numeric: vec![AGE.to_string(), KMS_DRIVEN.to_string()],
            categorical: vec![NAME.to_string(), COMPANY.to_string(), FUEL_TYPE.to_string()],
            target: PRICE.to_string(),
        }
    }
}

impl ColumnSpec {
    /// All feature columns, numeric first
    pub fn feature_columns(&self) -> impl Iterator<Item = &str> {
        self.numeric
            .iter()
            .chain(self.categorical.iter())
            .map(String::as_str)
    }
}

/// Configuration for data preprocessing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    pub columns: ColumnSpec,

    /// Strategy for handling missing numeric values
    pub numeric_impute_strategy: ImputeStrategy,

    /// Strategy for handling missing categorical values
    pub categorical_impute_strategy: ImputeStrategy,

    /// Divide one-hot columns by their standard deviation (no centering)
    pub scale_categorical: bool,
}

impl Default for PreprocessingConfig {
    fn default() -> Self {
        Self {
            columns: ColumnSpec::default(),
            numeric_impute_strategy: ImputeStrategy::Median,
            categorical_impute_strategy: ImputeStrategy::MostFrequent,
            scale_categorical: true,
        }
    }
}

impl PreprocessingConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the column layout
    pub fn with_columns(mut self, columns: ColumnSpec) -> Self {
        self.columns = columns;
        self
    }

    /// Builder method to set numeric impute strategy
    pub fn with_numeric_impute(mut self, strategy: ImputeStrategy) -> Self {
        self.numeric_impute_strategy = strategy;
        self
    }

    /// Builder method to toggle scaling of the one-hot block
    pub fn with_categorical_scaling(mut self, enabled: bool) -> Self {
        self.scale_categorical = enabled;
        self
    }
}
