//! Raw dataset loading
//!
//! A [`DatasetProvider`] yields the raw car table. [`read_raw_dataset`] checks
//! the required columns, drops everything else and normalizes dtypes.

mod split;

pub use split::train_test_split;

use crate::error::{CarPriceError, Result, Stage, StageContext};
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};

pub const NAME: &str = "name";
pub const COMPANY: &str = "company";
pub const FUEL_TYPE: &str = "fuel_type";
pub const YEAR: &str = "year";
pub const KMS_DRIVEN: &str = "kms_driven";
pub const PRICE: &str = "Price";

/// Columns of the raw table, in canonical order
pub const RAW_COLUMNS: [&str; 6] = [NAME, COMPANY, FUEL_TYPE, YEAR, KMS_DRIVEN, PRICE];

const STRING_COLUMNS: [&str; 3] = [NAME, COMPANY, FUEL_TYPE];
const NUMERIC_COLUMNS: [&str; 3] = [YEAR, KMS_DRIVEN, PRICE];

/// Source of the raw car table
pub trait DatasetProvider: Send + Sync {
    /// Load the full table
    fn load(&self) -> Result<DataFrame>;

    /// Human readable origin, used in logs
    fn describe(&self) -> String;
}

/// Reads the raw table from a CSV file with a header row
#[derive(Debug, Clone)]
pub struct CsvDatasetProvider {
    path: PathBuf,
    infer_schema_length: usize,
}

impl CsvDatasetProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            infer_schema_length: 1000,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DatasetProvider for CsvDatasetProvider {
    fn load(&self) -> Result<DataFrame> {
        let file = File::open(&self.path).map_err(|e| {
            CarPriceError::Ingestion(format!("cannot open {}: {}", self.path.display(), e))
        })?;

        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| {
                CarPriceError::Ingestion(format!("cannot parse {}: {}", self.path.display(), e))
            })
    }

    fn describe(&self) -> String {
        format!("csv:{}", self.path.display())
    }
}

/// Serves a table held in memory
#[derive(Debug, Clone)]
pub struct InMemoryProvider {
    df: DataFrame,
}

impl InMemoryProvider {
    pub fn new(df: DataFrame) -> Self {
        Self { df }
    }
}

impl DatasetProvider for InMemoryProvider {
    fn load(&self) -> Result<DataFrame> {
        Ok(self.df.clone())
    }

    fn describe(&self) -> String {
        format!("memory:{} rows", self.df.height())
    }
}

/// Load from `provider` and validate the schema
pub fn read_raw_dataset(provider: &dyn DatasetProvider) -> Result<DataFrame> {
    let source = provider.describe();
    tracing::info!(source = %source, "Reading raw dataset");

    let df = provider
        .load()
        .with_stage(Stage::Ingestion, || format!("loading {}", source))?;
    let df = validate_schema(&df)
        .with_stage(Stage::Ingestion, || format!("validating {}", source))?;

    tracing::info!(rows = df.height(), source = %source, "Raw dataset loaded");
    Ok(df)
}

/// Keep exactly the raw columns: strings as `String`, numbers as `Float64`
pub fn validate_schema(df: &DataFrame) -> Result<DataFrame> {
    let present: Vec<&str> = df.get_column_names().into_iter().map(|c| c.as_str()).collect();
    let missing: Vec<&str> = RAW_COLUMNS
        .iter()
        .copied()
        .filter(|c| !present.contains(c))
        .collect();
    if !missing.is_empty() {
        return Err(CarPriceError::Ingestion(format!(
            "missing required columns: {}",
            missing.join(", ")
        )));
    }

    let mut out = df.select(RAW_COLUMNS)?;
    for name in STRING_COLUMNS {
        let casted = out.column(name)?.cast(&DataType::String)?;
        out.with_column(casted)?;
    }
    for name in NUMERIC_COLUMNS {
        let casted = to_float(out.column(name)?).map_err(|reason| {
            CarPriceError::Ingestion(format!("column '{}' is not numeric: {}", name, reason))
        })?;
        out.with_column(casted)?;
    }
    Ok(out)
}

/// Cast to `Float64`, failing when a present value does not parse
pub(crate) fn to_float(column: &Column) -> std::result::Result<Column, String> {
    let casted = column.cast(&DataType::Float64).map_err(|e| e.to_string())?;
    let lost = casted.null_count().saturating_sub(column.null_count());
    if lost > 0 {
        return Err(format!("{} of {} values do not parse as numbers", lost, column.len()));
    }
    Ok(casted)
}
