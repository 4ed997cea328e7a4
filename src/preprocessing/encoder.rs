//! Categorical encoding

use crate::error::{CarPriceError, Result};
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Vocabulary learned for one categorical column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryVocabulary {
    pub column: String,
    /// Sorted, deduplicated
    pub categories: Vec<String>,
}

impl CategoryVocabulary {
    fn position(&self, value: &str) -> Option<usize> {
        self.categories
            .binary_search_by(|c| c.as_str().cmp(value))
            .ok()
    }
}

/// One-hot encoder that ignores categories not seen during fit
///
/// Output blocks follow the column order given to `fit`, and inside each
/// block the categories are sorted. An unseen value encodes as all zeros.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OneHotEncoder {
    vocabularies: Vec<CategoryVocabulary>,
    is_fitted: bool,
}

impl OneHotEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fit(&mut self, df: &DataFrame, columns: &[&str]) -> Result<&mut Self> {
        let mut vocabularies = Vec::with_capacity(columns.len());
        for &col_name in columns {
            let values = string_column(df, col_name)?;
            let categories: BTreeSet<String> = values
                .str()?
                .into_iter()
                .flatten()
                .map(str::to_string)
                .collect();
            vocabularies.push(CategoryVocabulary {
                column: col_name.to_string(),
                categories: categories.into_iter().collect(),
            });
        }

        self.vocabularies = vocabularies;
        self.is_fitted = true;
        Ok(self)
    }

    pub fn vocabularies(&self) -> &[CategoryVocabulary] {
        &self.vocabularies
    }

    /// Total number of indicator columns
    pub fn output_width(&self) -> usize {
        self.vocabularies.iter().map(|v| v.categories.len()).sum()
    }

    /// `column_category` for every indicator column
    pub fn feature_names(&self) -> Vec<String> {
        self.vocabularies
            .iter()
            .flat_map(|v| {
                v.categories
                    .iter()
                    .map(move |c| format!("{}_{}", v.column, c))
            })
            .collect()
    }

    pub fn transform(&self, df: &DataFrame) -> Result<Array2<f64>> {
        if !self.is_fitted {
            return Err(CarPriceError::NotFitted("OneHotEncoder".to_string()));
        }

        let mut out = Array2::<f64>::zeros((df.height(), self.output_width()));
        let mut offset = 0;
        for vocab in &self.vocabularies {
            let values = string_column(df, &vocab.column)?;
            for (row, value) in values.str()?.into_iter().enumerate() {
                if let Some(pos) = value.and_then(|v| vocab.position(v)) {
                    out[[row, offset + pos]] = 1.0;
                }
            }
            offset += vocab.categories.len();
        }
        Ok(out)
    }
}

fn string_column(df: &DataFrame, name: &str) -> Result<Column> {
    let column = df
        .column(name)
        .map_err(|_| CarPriceError::FeatureNotFound(name.to_string()))?;
    Ok(column.cast(&DataType::String)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn frame() -> DataFrame {
        df!(
            "fuel_type" => &["Petrol", "Diesel", "Petrol"],
            "company" => &["Maruti", "Hyundai", "Audi"]
        )
        .unwrap()
    }

    #[test]
    fn test_sorted_vocabulary_and_layout() {
        let mut encoder = OneHotEncoder::new();
        encoder.fit(&frame(), &["fuel_type", "company"]).unwrap();

        assert_eq!(encoder.output_width(), 5);
        assert_eq!(
            encoder.feature_names(),
            vec![
                "fuel_type_Diesel",
                "fuel_type_Petrol",
                "company_Audi",
                "company_Hyundai",
                "company_Maruti"
            ]
        );

        let out = encoder.transform(&frame()).unwrap();
        assert_eq!(out.row(0).to_vec(), vec![0.0, 1.0, 0.0, 0.0, 1.0]);
        assert_eq!(out.row(2).to_vec(), vec![0.0, 1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_unknown_category_is_all_zero() {
        let mut encoder = OneHotEncoder::new();
        encoder.fit(&frame(), &["fuel_type"]).unwrap();

        let unseen = df!("fuel_type" => &["Electric"]).unwrap();
        let out = encoder.transform(&unseen).unwrap();
        assert_eq!(out, array![[0.0, 0.0]]);
    }

    #[test]
    fn test_missing_column() {
        let mut encoder = OneHotEncoder::new();
        let result = encoder.fit(&frame(), &["name"]);
        assert!(matches!(result, Err(CarPriceError::FeatureNotFound(_))));
    }
}
