//! Prediction request validation

use crate::config::MIN_MODEL_YEAR;
use crate::error::{CarPriceError, Result};
use crate::feature_engineering::RawRecord;
use serde::{Deserialize, Serialize};

/// One car as submitted for pricing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CarInput {
    pub name: String,
    pub company: String,
    pub fuel_type: String,
    pub year: i32,
    pub kms_driven: i64,
}

impl CarInput {
    /// Check ranges and normalize text fields
    ///
    /// `reference_year` is the latest accepted manufacturing year. The
    /// company is trimmed and title-cased; name and fuel type are trimmed.
    pub fn validate(&self, reference_year: i32) -> Result<RawRecord> {
        if self.year < MIN_MODEL_YEAR || self.year > reference_year {
            return Err(CarPriceError::validation(
                "year",
                format!(
                    "must be between {} and {}, got {}",
                    MIN_MODEL_YEAR, reference_year, self.year
                ),
            ));
        }
        if self.kms_driven < 0 {
            return Err(CarPriceError::validation(
                "kms_driven",
                format!("must be non-negative, got {}", self.kms_driven),
            ));
        }

        let company = non_empty("company", &self.company)?;
        let name = non_empty("name", &self.name)?;
        let fuel_type = non_empty("fuel_type", &self.fuel_type)?;

        Ok(RawRecord {
            name: name.to_string(),
            company: title_case(company),
            fuel_type: fuel_type.to_string(),
            year: self.year,
            kms_driven: self.kms_driven as f64,
        })
    }
}

fn non_empty<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(CarPriceError::validation(field, "must not be empty"));
    }
    Ok(trimmed)
}

/// Uppercase the first letter of every word, lowercase the rest
///
/// A word starts at any letter that follows a non-letter.
pub fn title_case(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut prev_is_letter = false;
    for c in value.chars() {
        if c.is_alphabetic() {
            if prev_is_letter {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            prev_is_letter = true;
        } else {
            out.push(c);
            prev_is_letter = false;
        }
    }
    out
}
