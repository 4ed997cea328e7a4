//! Data preprocessing module
//!
//! Turns the engineered car table into a numeric feature matrix:
//! - Missing value imputation (median for numbers, most frequent for labels)
//! - Standard scaling
//! - One-hot encoding that ignores unseen categories

mod config;
mod encoder;
mod imputer;
mod pipeline;
mod scaler;

pub use config::{ColumnSpec, PreprocessingConfig};
pub use encoder::{CategoryVocabulary, OneHotEncoder};
pub use imputer::{FillValue, ImputeStrategy, Imputer};
pub use pipeline::DataPreprocessor;
pub use scaler::StandardScaler;
