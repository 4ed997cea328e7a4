//! Integration test: feature engineering and preprocessing

mod common;

use carprice::feature_engineering::{FeatureEngineer, AGE};
use carprice::inference::CarInput;
use carprice::ingestion::{validate_schema, COMPANY, PRICE};
use carprice::preprocessing::{ColumnSpec, DataPreprocessor};
use carprice::CarPriceError;
use polars::prelude::*;

fn engineered(n: usize) -> DataFrame {
    let raw = validate_schema(&common::car_table(n)).unwrap();
    FeatureEngineer::new(2025).transform(&raw).unwrap()
}

fn fitted(n: usize) -> DataPreprocessor {
    let mut preprocessor = DataPreprocessor::new(ColumnSpec::default());
    preprocessor.fit(&engineered(n)).unwrap();
    preprocessor
}

fn single_row(company: &str, name: &str, fuel: &str) -> DataFrame {
    df!(
        "name" => &[name],
        "company" => &[company],
        "fuel_type" => &[fuel],
        AGE => &[10.0],
        "kms_driven" => &[45000.0]
    )
    .unwrap()
}

#[test]
fn test_output_width_matches_vocabulary() {
    let preprocessor = fitted(64);
    // 2 numeric + 8 names + 4 companies + 2 fuel types
    assert_eq!(preprocessor.output_width().unwrap(), 16);

    let names = preprocessor.feature_names().unwrap();
    assert_eq!(&names[..2], &["age".to_string(), "kms_driven".to_string()]);
    assert!(names.contains(&"company_Maruti".to_string()));
    assert!(names.contains(&"fuel_type_Diesel".to_string()));
}

#[test]
fn test_transform_is_deterministic() {
    let preprocessor = fitted(64);
    let df = engineered(20);
    assert_eq!(
        preprocessor.transform(&df).unwrap(),
        preprocessor.transform(&df).unwrap()
    );
}

#[test]
fn test_refit_is_identical() {
    let first = fitted(64).transform(&engineered(20)).unwrap();
    let second = fitted(64).transform(&engineered(20)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_unknown_categories_do_not_fail() {
    let preprocessor = fitted(64);
    let known = preprocessor
        .transform(&single_row("Maruti", "Maruti Suzuki Swift", "Petrol"))
        .unwrap();
    let unknown = preprocessor
        .transform(&single_row("Tesla", "Tesla Model 3", "Electric"))
        .unwrap();

    assert_eq!(known.ncols(), unknown.ncols());
    // numeric block is identical, every indicator of the unknown row is zero
    assert_eq!(known[[0, 0]], unknown[[0, 0]]);
    assert_eq!(known[[0, 1]], unknown[[0, 1]]);
    assert!(unknown.row(0).iter().skip(2).all(|v| *v == 0.0));
}

#[test]
fn test_company_normalization_gives_same_features() {
    let preprocessor = fitted(64);
    let engineer = FeatureEngineer::new(2025);

    let features = |company: &str| {
        let input = CarInput {
            name: "Toyota Innova".to_string(),
            company: company.to_string(),
            fuel_type: "Diesel".to_string(),
            year: 2015,
            kms_driven: 45000,
        };
        let record = input.validate(2025).unwrap();
        let row = engineer.engineer_record(&record).to_dataframe().unwrap();
        preprocessor.transform(&row).unwrap()
    };

    assert_eq!(features("Toyota"), features(" toyota "));
}

#[test]
fn test_missing_categorical_column() {
    let df = engineered(32).drop(COMPANY).unwrap();
    let mut preprocessor = DataPreprocessor::new(ColumnSpec::default());
    assert!(matches!(
        preprocessor.fit(&df),
        Err(CarPriceError::FeatureNotFound(c)) if c == COMPANY
    ));
}

#[test]
fn test_target_is_not_a_feature() {
    let preprocessor = fitted(32);
    let names = preprocessor.feature_names().unwrap();
    assert!(names.iter().all(|n| !n.starts_with(PRICE)));
}
