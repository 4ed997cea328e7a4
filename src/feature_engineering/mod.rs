//! Feature engineering
//!
//! Replaces the manufacturing `year` with the vehicle `age` relative to a
//! reference year. The table path and the single-record path share
//! [`age_from_year`].

use crate::error::{CarPriceError, Result, Stage, StageContext};
use crate::ingestion::{COMPANY, FUEL_TYPE, KMS_DRIVEN, NAME, YEAR};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

pub const AGE: &str = "age";

/// `reference_year - year`
#[inline]
pub fn age_from_year(reference_year: i32, year: f64) -> f64 {
    reference_year as f64 - year
}

/// One raw car without its price
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub name: String,
    pub company: String,
    pub fuel_type: String,
    pub year: i32,
    pub kms_driven: f64,
}

/// One car after feature engineering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineeredRecord {
    pub name: String,
    pub company: String,
    pub fuel_type: String,
    pub age: f64,
    pub kms_driven: f64,
}

impl EngineeredRecord {
    /// Single-row table with the engineered feature columns
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        Ok(df!(
            NAME => &[self.name.as_str()],
            COMPANY => &[self.company.as_str()],
            FUEL_TYPE => &[self.fuel_type.as_str()],
            AGE => &[self.age],
            KMS_DRIVEN => &[self.kms_driven]
        )?)
    }
}

/// Derives `age` from `year`
#[derive(Debug, Clone, Copy)]
pub struct FeatureEngineer {
    reference_year: i32,
}

impl FeatureEngineer {
    pub fn new(reference_year: i32) -> Self {
        Self { reference_year }
    }

    pub fn reference_year(&self) -> i32 {
        self.reference_year
    }

    /// Replace `year` with `age`; other columns and row order are unchanged
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        self.add_age(df)
            .stage(Stage::FeatureEngineering, "deriving age from year")
    }

    fn add_age(&self, df: &DataFrame) -> Result<DataFrame> {
        let year = df.column(YEAR).map_err(|_| {
            CarPriceError::Ingestion(format!("column '{}' is required to derive age", YEAR))
        })?;
        let year = year.cast(&DataType::Float64)?;

        let age: Float64Chunked = year
            .f64()?
            .into_iter()
            .map(|opt| opt.map(|y| age_from_year(self.reference_year, y)))
            .collect();

        let mut out = df.drop(YEAR)?;
        out.with_column(age.with_name(AGE.into()).into_series())?;
        Ok(out)
    }

    /// Same rule as [`FeatureEngineer::transform`] for a single record
    pub fn engineer_record(&self, record: &RawRecord) -> EngineeredRecord {
        EngineeredRecord {
            name: record.name.clone(),
            company: record.company.clone(),
            fuel_type: record.fuel_type.clone(),
            age: age_from_year(self.reference_year, record.year as f64),
            kms_driven: record.kms_driven,
        }
    }
}
