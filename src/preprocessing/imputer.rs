//! Missing value imputation

use crate::error::{CarPriceError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How missing values are filled
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ImputeStrategy {
    Mean,
    Median,
    /// Most common value; ties go to the smallest value
    MostFrequent,
}

/// Learned fill value for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FillValue {
    Numeric(f64),
    Categorical(String),
}

/// Column-wise imputer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Imputer {
    strategy: ImputeStrategy,
    fill_values: Vec<(String, FillValue)>,
    is_fitted: bool,
}

impl Imputer {
    pub fn new(strategy: ImputeStrategy) -> Self {
        Self {
            strategy,
            fill_values: Vec::new(),
            is_fitted: false,
        }
    }

    /// Learn one fill value per column
    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        let mut fill_values = Vec::with_capacity(columns.len());
        for &col_name in columns {
            let column = df
                .column(col_name)
                .map_err(|_| CarPriceError::FeatureNotFound(col_name.to_string()))?;
            let value = self.compute_fill_value(col_name, column)?;
            fill_values.push((col_name.to_string(), value));
        }

        self.fill_values = fill_values;
        self.is_fitted = true;
        Ok(self)
    }

    pub fn fill_value(&self, column: &str) -> Option<&FillValue> {
        self.fill_values
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, v)| v)
    }

    /// Replace nulls in every fitted column
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        if !self.is_fitted {
            return Err(CarPriceError::NotFitted("Imputer".to_string()));
        }

        let mut result = df.clone();
        for (col_name, value) in &self.fill_values {
            let column = df
                .column(col_name)
                .map_err(|_| CarPriceError::FeatureNotFound(col_name.clone()))?;
            if column.null_count() == 0 {
                continue;
            }
            let filled = match value {
                FillValue::Numeric(v) => {
                    let ca: Float64Chunked = column
                        .cast(&DataType::Float64)?
                        .f64()?
                        .into_iter()
                        .map(|opt| Some(opt.unwrap_or(*v)))
                        .collect();
                    ca.with_name(col_name.as_str().into()).into_series()
                }
                FillValue::Categorical(v) => {
                    let ca: StringChunked = column
                        .cast(&DataType::String)?
                        .str()?
                        .into_iter()
                        .map(|opt| Some(opt.unwrap_or(v.as_str())))
                        .collect();
                    ca.with_name(col_name.as_str().into()).into_series()
                }
            };
            result.with_column(filled)?;
        }
        Ok(result)
    }

    fn compute_fill_value(&self, col_name: &str, column: &Column) -> Result<FillValue> {
        let empty = || CarPriceError::Data(format!("column '{}' has no values to impute from", col_name));

        match self.strategy {
            ImputeStrategy::Mean | ImputeStrategy::Median => {
                let values = column.cast(&DataType::Float64)?;
                let ca = values.f64()?;
                let stat = match self.strategy {
                    ImputeStrategy::Mean => ca.mean(),
                    _ => ca.median(),
                };
                stat.map(FillValue::Numeric).ok_or_else(empty)
            }
            ImputeStrategy::MostFrequent => {
                let values = column.cast(&DataType::String)?;
                let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
                for v in values.str()?.into_iter().flatten() {
                    *counts.entry(v).or_insert(0) += 1;
                }
                // BTreeMap iterates ascending, so strict > keeps the smallest on ties
                let mut best: Option<(&str, usize)> = None;
                for (value, count) in counts {
                    if best.map_or(true, |(_, c)| count > c) {
                        best = Some((value, count));
                    }
                }
                best.map(|(v, _)| FillValue::Categorical(v.to_string()))
                    .ok_or_else(empty)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median_imputation() {
        let df = df!("a" => &[Some(1.0), None, Some(3.0), Some(10.0)]).unwrap();
        let mut imputer = Imputer::new(ImputeStrategy::Median);
        imputer.fit(&df, &["a"]).unwrap();

        assert_eq!(imputer.fill_value("a"), Some(&FillValue::Numeric(3.0)));
        let out = imputer.transform(&df).unwrap();
        let col = out.column("a").unwrap().f64().unwrap();
        assert_eq!(col.null_count(), 0);
        assert_eq!(col.get(1), Some(3.0));
    }

    #[test]
    fn test_most_frequent_tie_takes_smallest() {
        let df = df!("c" => &[Some("Petrol"), Some("Diesel"), None, Some("Petrol"), Some("Diesel")]).unwrap();
        let mut imputer = Imputer::new(ImputeStrategy::MostFrequent);
        imputer.fit(&df, &["c"]).unwrap();

        assert_eq!(
            imputer.fill_value("c"),
            Some(&FillValue::Categorical("Diesel".to_string()))
        );
        let out = imputer.transform(&df).unwrap();
        assert_eq!(out.column("c").unwrap().str().unwrap().get(2), Some("Diesel"));
    }

    #[test]
    fn test_all_null_column_is_error() {
        let df = df!("a" => &[None::<f64>, None]).unwrap();
        let mut imputer = Imputer::new(ImputeStrategy::Median);
        assert!(matches!(imputer.fit(&df, &["a"]), Err(CarPriceError::Data(_))));
    }

    #[test]
    fn test_transform_before_fit() {
        let df = df!("a" => &[1.0]).unwrap();
        let imputer = Imputer::new(ImputeStrategy::Mean);
        assert!(matches!(imputer.transform(&df), Err(CarPriceError::NotFitted(_))));
    }
}
